use courier_http::Uri;

/// 已经重定向过的地址
///
/// 按照重定向的先后顺序记录，用于检测循环重定向
#[derive(Debug, Clone, Default)]
pub struct RedirectLocations {
    locations: Vec<Uri>,
}

impl RedirectLocations {
    /// 是否已经重定向到过指定地址
    #[inline]
    pub fn contains(&self, uri: &Uri) -> bool {
        self.locations.iter().any(|location| location == uri)
    }

    /// 记录重定向地址
    #[inline]
    pub fn add(&mut self, uri: Uri) {
        self.locations.push(uri);
    }

    /// 已经记录的重定向地址数量
    #[inline]
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// 是否没有任何记录
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// 最后一次重定向的地址
    #[inline]
    pub fn last(&self) -> Option<&Uri> {
        self.locations.last()
    }

    /// 按顺序遍历重定向地址
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Uri> {
        self.locations.iter()
    }

    #[inline]
    pub(crate) fn clear(&mut self) {
        self.locations.clear();
    }
}
