use courier_http::{HttpHost, Route};
use std::net::IpAddr;

/// 路由跟踪器
///
/// 记录连接在建立过程中已经到达的位置，用于和计划路由比较，决定下一步操作
#[derive(Debug, Clone)]
pub struct RouteTracker {
    target: HttpHost,
    local_addr: Option<IpAddr>,
    connected: bool,
    proxies: Vec<HttpHost>,
    tunnelled: bool,
    layered: bool,
    secure: bool,
}

impl RouteTracker {
    /// 创建路由跟踪器
    pub fn new(target: HttpHost, local_addr: Option<IpAddr>) -> Self {
        Self {
            target,
            local_addr,
            connected: false,
            proxies: Vec::new(),
            tunnelled: false,
            layered: false,
            secure: false,
        }
    }

    /// 为计划路由创建路由跟踪器
    #[inline]
    pub fn for_route(route: &Route) -> Self {
        Self::new(route.target_host().to_owned(), route.local_addr())
    }

    /// 记录已经直连到目标主机
    pub fn connect_target(&mut self, secure: bool) {
        self.connected = true;
        self.secure = secure;
    }

    /// 记录已经连接到第一个代理
    pub fn connect_proxy(&mut self, proxy: HttpHost, secure: bool) {
        self.connected = true;
        self.proxies = vec![proxy];
        self.secure = secure;
    }

    /// 记录已经建立到目标主机的隧道
    pub fn tunnel_target(&mut self, secure: bool) {
        self.tunnelled = true;
        self.secure = secure;
    }

    /// 记录已经建立到下一个代理的隧道
    pub fn tunnel_proxy(&mut self, proxy: HttpHost, secure: bool) {
        self.proxies.push(proxy);
        self.secure = secure;
    }

    /// 记录已经叠加协议
    pub fn layer_protocol(&mut self, secure: bool) {
        self.layered = true;
        self.secure = secure;
    }

    /// 是否已经连接
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// 转换为已经建立的路由
    ///
    /// 尚未连接时返回 [`None`]
    pub fn to_route(&self) -> Option<Route> {
        if !self.connected {
            return None;
        }
        let mut builder = Route::builder(self.target.to_owned());
        for proxy in self.proxies.iter() {
            builder.proxy(proxy.to_owned());
        }
        if let Some(local_addr) = self.local_addr {
            builder.local_addr(local_addr);
        }
        builder
            .tunnelled(self.tunnelled)
            .layered(self.layered)
            .secure(self.secure)
            .build()
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_tracker() {
        let target = HttpHost::new("https", "target.com", None);
        let proxy = HttpHost::new("http", "proxy.com", Some(3128));
        let planned = Route::proxied(target.to_owned(), proxy.to_owned(), true);

        let mut tracker = RouteTracker::for_route(&planned);
        assert_eq!(tracker.to_route(), None);
        tracker.connect_proxy(proxy, false);
        assert!(tracker.is_connected());
        assert_eq!(tracker.to_route().map(|route| route.hop_count()), Some(2));
        tracker.tunnel_target(false);
        tracker.layer_protocol(true);
        assert_eq!(tracker.to_route(), Some(planned));
    }
}
