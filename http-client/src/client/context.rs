use super::{AuthState, RedirectLocations};
use courier_http::{Extensions, HttpHost, Route};

/// 请求执行上下文
///
/// 记录一次请求执行过程中的状态，执行结束后可以从中获取实际使用的路由、重定向和鉴权信息。
/// 每次执行开始时除扩展信息外的状态都会被重置
#[derive(Debug, Default)]
pub struct ExecutionContext {
    route: Option<Route>,
    target_host: Option<HttpHost>,
    redirect_count: usize,
    redirect_locations: RedirectLocations,
    target_auth_state: AuthState,
    proxy_auth_state: AuthState,
    requests_sent: usize,
    connection_reused: bool,
    extensions: Extensions,
}

impl ExecutionContext {
    /// 实际使用的路由
    ///
    /// 重定向到其他主机后与执行时传入的路由不同
    #[inline]
    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    /// 最终请求的目标主机
    #[inline]
    pub fn target_host(&self) -> Option<&HttpHost> {
        self.target_host.as_ref()
    }

    /// 重定向次数
    #[inline]
    pub fn redirect_count(&self) -> usize {
        self.redirect_count
    }

    /// 重定向过的地址
    #[inline]
    pub fn redirect_locations(&self) -> &RedirectLocations {
        &self.redirect_locations
    }

    /// 目标主机的鉴权状态
    #[inline]
    pub fn target_auth_state(&self) -> &AuthState {
        &self.target_auth_state
    }

    /// 代理的鉴权状态
    #[inline]
    pub fn proxy_auth_state(&self) -> &AuthState {
        &self.proxy_auth_state
    }

    /// 实际发送的请求数量
    #[inline]
    pub fn requests_sent(&self) -> usize {
        self.requests_sent
    }

    /// 最终响应所在的连接是否为复用的连接
    #[inline]
    pub fn is_connection_reused(&self) -> bool {
        self.connection_reused
    }

    /// 获取扩展信息
    #[inline]
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// 获取扩展信息的可变引用
    #[inline]
    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    pub(crate) fn reset(&mut self, route: &Route) {
        self.route = Some(route.to_owned());
        self.target_host = Some(route.target_host().to_owned());
        self.redirect_count = 0;
        self.redirect_locations.clear();
        self.target_auth_state.reset();
        self.proxy_auth_state.reset();
        self.requests_sent = 0;
        self.connection_reused = false;
    }

    pub(crate) fn set_route(&mut self, route: &Route) {
        self.route = Some(route.to_owned());
        self.target_host = Some(route.target_host().to_owned());
    }

    pub(crate) fn increase_redirect_count(&mut self) -> usize {
        self.redirect_count += 1;
        self.redirect_count
    }

    pub(crate) fn redirect_locations_mut(&mut self) -> &mut RedirectLocations {
        &mut self.redirect_locations
    }

    pub(crate) fn target_auth_state_mut(&mut self) -> &mut AuthState {
        &mut self.target_auth_state
    }

    pub(crate) fn proxy_auth_state_mut(&mut self) -> &mut AuthState {
        &mut self.proxy_auth_state
    }

    pub(crate) fn increase_requests_sent(&mut self) {
        self.requests_sent += 1;
    }

    pub(crate) fn set_connection_reused(&mut self, connection_reused: bool) {
        self.connection_reused = connection_reused;
    }
}
