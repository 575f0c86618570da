use super::super::ResponseResult;
use auto_impl::auto_impl;
use courier_http::{HttpHost, Route};
use std::fmt::Debug;

/// 路由规划器
///
/// 重定向到新的目标主机时，计算到达新目标主机的路由
#[auto_impl(&, Box, Arc)]
pub trait RoutePlanner: Debug + Send + Sync {
    /// 计算路由
    ///
    /// `original` 为本次请求执行开始时使用的路由
    fn determine_route(&self, target: &HttpHost, original: &Route) -> ResponseResult<Route>;
}

/// 默认路由规划器
///
/// 沿用原路由的本地地址和代理，新目标主机使用加密协议时在代理上建立隧道
#[derive(Debug, Copy, Clone, Default)]
pub struct DefaultRoutePlanner;

impl RoutePlanner for DefaultRoutePlanner {
    fn determine_route(&self, target: &HttpHost, original: &Route) -> ResponseResult<Route> {
        let secure = target.is_secure();
        let mut builder = Route::builder(target.to_owned());
        if let Some(local_addr) = original.local_addr() {
            builder.local_addr(local_addr);
        }
        for proxy in original.proxies() {
            builder.proxy(proxy.to_owned());
        }
        let proxied = !original.proxies().is_empty();
        Ok(builder
            .tunnelled(proxied && secure)
            .layered(proxied && secure)
            .secure(secure)
            .build()
            .unwrap_or_else(|_| Route::direct(target.to_owned(), secure)))
    }
}
