use http::uri::{Authority, Scheme, Uri};
use std::{fmt, net::IpAddr, str::FromStr};
use thiserror::Error;

/// HTTP 主机
///
/// 由协议、主机名和端口号组成，主机名统一转换为小写，
/// 未指定端口号时使用协议的默认端口号
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HttpHost {
    scheme: Box<str>,
    hostname: Box<str>,
    port: Option<u16>,
}

impl HttpHost {
    /// 创建 HTTP 主机
    pub fn new(scheme: &str, hostname: &str, port: Option<u16>) -> Self {
        let scheme = scheme.to_ascii_lowercase();
        let port = port.or_else(|| default_port(&scheme));
        Self {
            scheme: scheme.into(),
            hostname: hostname.to_ascii_lowercase().into(),
            port,
        }
    }

    /// 从绝对 URL 中提取 HTTP 主机
    ///
    /// 如果 URL 不包含主机名则返回 [`None`]，未指定协议时默认为 `http`
    pub fn from_uri(uri: &Uri) -> Option<Self> {
        let authority = uri.authority()?;
        let scheme = uri.scheme().unwrap_or(&Scheme::HTTP);
        Some(Self::new(scheme.as_str(), authority.host(), authority.port_u16()))
    }

    /// 获取协议
    #[inline]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// 获取主机名
    #[inline]
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// 获取端口号
    #[inline]
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// 是否使用加密协议
    #[inline]
    pub fn is_secure(&self) -> bool {
        self.scheme.as_ref() == "https"
    }

    /// 获取 `host:port` 形式的字符串
    pub fn to_host_string(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{}", self.hostname, port),
            None => self.hostname.to_string(),
        }
    }

    /// 获取 URL 和 `Host` 头中使用的 Authority 字符串
    ///
    /// 端口号与协议默认端口号相同时省略
    pub fn to_authority_string(&self) -> String {
        match self.port {
            Some(port) if Some(port) != default_port(&self.scheme) => format!("{}:{}", self.hostname, port),
            _ => self.hostname.to_string(),
        }
    }

    /// 转换为 URL 中的 Authority 部分
    pub fn to_authority(&self) -> Option<Authority> {
        Authority::from_str(&self.to_authority_string()).ok()
    }
}

impl fmt::Display for HttpHost {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.to_host_string())
    }
}

fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    }
}

/// 路由
///
/// 描述客户端到目标主机的完整路径：可以直连，也可以经过一个或多个代理，
/// 并且可以在代理上建立隧道。路由一旦开始执行请求就不再改变，
/// 连接管理器以此作为分配连接的依据
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Route {
    target: HttpHost,
    local_addr: Option<IpAddr>,
    proxies: Box<[HttpHost]>,
    tunnelled: bool,
    layered: bool,
    secure: bool,
}

impl Route {
    /// 创建直连路由
    #[inline]
    pub fn direct(target: HttpHost, secure: bool) -> Self {
        Self {
            target,
            local_addr: None,
            proxies: Default::default(),
            tunnelled: false,
            layered: false,
            secure,
        }
    }

    /// 创建经过单个代理的路由
    ///
    /// 加密路由会在代理上建立隧道并在隧道上叠加加密协议
    #[inline]
    pub fn proxied(target: HttpHost, proxy: HttpHost, secure: bool) -> Self {
        Self {
            target,
            local_addr: None,
            proxies: vec![proxy].into(),
            tunnelled: secure,
            layered: secure,
            secure,
        }
    }

    /// 创建路由构建器
    #[inline]
    pub fn builder(target: HttpHost) -> RouteBuilder {
        RouteBuilder::new(target)
    }

    /// 获取目标主机
    #[inline]
    pub fn target_host(&self) -> &HttpHost {
        &self.target
    }

    /// 获取本地地址
    #[inline]
    pub fn local_addr(&self) -> Option<IpAddr> {
        self.local_addr
    }

    /// 获取跳数，直连路由为 1
    #[inline]
    pub fn hop_count(&self) -> usize {
        self.proxies.len() + 1
    }

    /// 获取指定跳的目标
    ///
    /// 最后一跳总是目标主机，超出范围时返回 [`None`]
    pub fn hop_target(&self, hop: usize) -> Option<&HttpHost> {
        match hop {
            hop if hop < self.proxies.len() => Some(&self.proxies[hop]),
            hop if hop == self.proxies.len() => Some(&self.target),
            _ => None,
        }
    }

    /// 获取第一个代理
    #[inline]
    pub fn proxy_host(&self) -> Option<&HttpHost> {
        self.proxies.first()
    }

    /// 获取所有代理
    #[inline]
    pub fn proxies(&self) -> &[HttpHost] {
        &self.proxies
    }

    /// 是否建立隧道
    #[inline]
    pub fn is_tunnelled(&self) -> bool {
        self.tunnelled
    }

    /// 是否叠加协议
    #[inline]
    pub fn is_layered(&self) -> bool {
        self.layered
    }

    /// 是否加密
    #[inline]
    pub fn is_secure(&self) -> bool {
        self.secure
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(local_addr) = self.local_addr {
            write!(f, "{}->", local_addr)?;
        }
        f.write_str("{")?;
        if self.tunnelled {
            f.write_str("t")?;
        }
        if self.layered {
            f.write_str("l")?;
        }
        if self.secure {
            f.write_str("s")?;
        }
        f.write_str("}->")?;
        for proxy in self.proxies.iter() {
            write!(f, "{}->", proxy)?;
        }
        write!(f, "{}", self.target)
    }
}

/// 路由构建器
#[derive(Clone, Debug)]
pub struct RouteBuilder {
    inner: Route,
}

impl RouteBuilder {
    /// 创建路由构建器
    #[inline]
    pub fn new(target: HttpHost) -> Self {
        Self {
            inner: Route::direct(target, false),
        }
    }

    /// 设置本地地址
    #[inline]
    pub fn local_addr(&mut self, local_addr: IpAddr) -> &mut Self {
        self.inner.local_addr = Some(local_addr);
        self
    }

    /// 追加代理
    #[inline]
    pub fn proxy(&mut self, proxy: HttpHost) -> &mut Self {
        let mut proxies = self.inner.proxies.to_vec();
        proxies.push(proxy);
        self.inner.proxies = proxies.into();
        self
    }

    /// 设置是否建立隧道
    #[inline]
    pub fn tunnelled(&mut self, tunnelled: bool) -> &mut Self {
        self.inner.tunnelled = tunnelled;
        self
    }

    /// 设置是否叠加协议
    #[inline]
    pub fn layered(&mut self, layered: bool) -> &mut Self {
        self.inner.layered = layered;
        self
    }

    /// 设置是否加密
    #[inline]
    pub fn secure(&mut self, secure: bool) -> &mut Self {
        self.inner.secure = secure;
        self
    }

    /// 构建路由
    ///
    /// 隧道必须经过至少一个代理
    pub fn build(&self) -> Result<Route, InvalidRouteError> {
        if self.inner.tunnelled && self.inner.proxies.is_empty() {
            return Err(InvalidRouteError::TunnelWithoutProxy);
        }
        Ok(self.inner.to_owned())
    }
}

/// 非法路由错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum InvalidRouteError {
    /// 未经过代理的路由不能建立隧道
    #[error("Proxy required if tunnelled")]
    TunnelWithoutProxy,
}
