mod establish;
mod exchange;
mod wrapper;

use super::{
    apply_authorization, handle_challenge, is_authentication_requested, is_response_body_empty, AbortHandle,
    AuthenticationStrategy, BasicCredentialsProvider, ConnectionHandle, CredentialsProvider,
    DefaultAuthenticationStrategy, DefaultKeepAliveStrategy, DefaultRedirectStrategy, DefaultReuseStrategy,
    DefaultRoutePlanner, DirectorConfig, ExecutionContext, KeepAliveStrategy, Lease, RedirectStrategy,
    ResponseError, ResponseErrorKind, ResponseResult, ReuseStrategy, RoutePlanner,
};
use assert_impl::assert_impl;
use courier_http::{
    ConnectionManager, ManagedConnection, OpenOptions, Request, RequestParts, Response, ResponseBody, ResponseParts,
    Route,
};
use exchange::{discard_response_body, exchange};
use log::{debug, warn};
use std::{sync::Arc, time::Duration};
use wrapper::RequestWrapper;

/// 请求执行器
///
/// 将一个逻辑请求转换为实际需要发送的一系列请求：跟随重定向，回应鉴权质询，
/// 从连接管理器租用连接并在合适的时机归还，最终只返回一个非中间状态的响应。
///
/// 最终响应的响应体需要从连接上读取时，连接由响应体负责归还，
/// 可以通过 [`RequestDirector::connection`] 获取该连接。
/// 其他任何情况下，连接都在 [`RequestDirector::execute`] 返回前被归还
#[derive(Debug)]
pub struct RequestDirector {
    manager: Arc<dyn ConnectionManager>,
    config: DirectorConfig,
    redirect_strategy: Box<dyn RedirectStrategy>,
    target_auth_strategy: Box<dyn AuthenticationStrategy>,
    proxy_auth_strategy: Box<dyn AuthenticationStrategy>,
    reuse_strategy: Box<dyn ReuseStrategy>,
    keep_alive_strategy: Box<dyn KeepAliveStrategy>,
    route_planner: Box<dyn RoutePlanner>,
    abort_handle: AbortHandle,
    held: Option<ConnectionHandle>,
}

impl RequestDirector {
    /// 创建请求执行器构建器
    #[inline]
    pub fn builder(manager: Arc<dyn ConnectionManager>) -> RequestDirectorBuilder {
        RequestDirectorBuilder::new(manager)
    }

    /// 使用默认策略创建请求执行器
    #[inline]
    pub fn new(manager: Arc<dyn ConnectionManager>) -> Self {
        Self::builder(manager).build()
    }

    /// 获取请求执行器配置
    #[inline]
    pub fn config(&self) -> &DirectorConfig {
        &self.config
    }

    /// 获取中断句柄
    ///
    /// 句柄可以发送到其他线程，用于中断正在进行的请求执行
    #[inline]
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort_handle.to_owned()
    }

    /// 上一次返回的响应所依赖的连接
    ///
    /// 响应体读取完毕或被丢弃后，连接已经归还，返回 [`None`]
    pub fn connection(&self) -> Option<&ConnectionHandle> {
        self.held.as_ref().filter(|handle| !handle.is_released())
    }

    /// 执行请求
    ///
    /// `route` 为请求目标主机的路由，请求地址为相对地址时基于路由的目标主机补全。
    /// 执行过程中的路由、重定向、鉴权等状态记录在 `ctx` 中
    pub fn execute(&mut self, request: Request, route: &Route, ctx: &mut ExecutionContext) -> ResponseResult<Response> {
        self.held = None;
        ctx.reset(route);

        let result = RequestWrapper::new(request, route).and_then(|wrapper| self.execute_rounds(wrapper, route, ctx));
        self.abort_handle.clear_canceller();

        match result {
            Ok((response, handle)) => {
                if let Some(handle) = handle.as_ref() {
                    debug!("Connection to {:?} is handed off to the response body", handle.remote_addr());
                }
                self.held = handle;
                Ok(response)
            }
            Err(err) => {
                let err = if self.abort_handle.is_aborted() && !err.is_interrupted() {
                    ResponseError::new(ResponseErrorKind::Interrupted, err)
                } else {
                    err
                };
                debug!("Request execution failed: {}", err);
                Err(err.redirect_count(ctx.redirect_count()))
            }
        }
    }

    fn execute_rounds(
        &self,
        mut wrapper: RequestWrapper,
        route: &Route,
        ctx: &mut ExecutionContext,
    ) -> ResponseResult<(Response, Option<ConnectionHandle>)> {
        let mut current_route = route.to_owned();
        let mut lease = self.lease_connection(&current_route)?;

        loop {
            if self.abort_handle.is_aborted() {
                return Err(ResponseError::interrupted());
            }

            if let Some(response) = self.establish_route(&mut lease, &current_route, ctx)? {
                ctx.set_connection_reused(lease.is_reused());
                lease.abort();
                return Ok((response, None));
            }
            lease.conn_mut().set_read_timeout(self.config.socket_timeout())?;

            wrapper.prepare_send()?;
            let mut parts = wrapper.wire_parts(&current_route)?;
            if self.config.handle_authentication() {
                if is_proxy_visible(&current_route) {
                    apply_authorization(&mut parts, self.proxy_auth_strategy.as_ref(), ctx.proxy_auth_state_mut());
                }
                apply_authorization(&mut parts, self.target_auth_strategy.as_ref(), ctx.target_auth_state_mut());
            }
            let expect_continue = if wrapper.expects_continue() {
                Some(self.config.wait_for_continue())
            } else {
                None
            };
            debug!("Executing request (attempt {}) over {}", wrapper.exec_count(), current_route);
            let response = exchange(lease.conn_mut(), &parts, wrapper.body_mut(), expect_continue, ctx)?;
            let valid_for = self.update_reuse(lease.conn_mut(), &parts, &response);

            match self.follow_up(&mut wrapper, &response, &current_route, route, ctx)? {
                Some(next_route) => {
                    if lease.conn().is_marked_reusable() {
                        discard_response_body(lease.conn_mut(), parts.method(), &response)?;
                    } else {
                        debug!("Connection can not be kept alive, closing");
                        lease.conn_mut().close()?;
                        restart_connection_based_auth(ctx);
                    }
                    if next_route != current_route {
                        debug!("Route changed from {} to {}, releasing connection", current_route, next_route);
                        lease.release(valid_for);
                        ctx.set_route(&next_route);
                        current_route = next_route;
                        lease = self.lease_connection(&current_route)?;
                    }
                }
                None => {
                    ctx.set_connection_reused(lease.is_reused());
                    if is_response_body_empty(parts.method(), &response) {
                        lease.release(valid_for);
                        return Ok((Response::from_parts(response, ResponseBody::default()), None));
                    }
                    let handle = lease.into_handle(valid_for);
                    let body = ResponseBody::from_reader(handle.to_owned().into_body_reader());
                    return Ok((Response::from_parts(response, body), Some(handle)));
                }
            }
        }
    }

    /// 从连接管理器租用连接
    ///
    /// 等待期间可以被中断，租用到的连接如果已经失效则先关闭
    fn lease_connection(&self, route: &Route) -> ResponseResult<Lease> {
        if self.abort_handle.is_aborted() {
            return Err(ResponseError::interrupted());
        }
        debug!("Requesting connection for {}", route);
        let request = self.manager.request_connection(route);
        self.abort_handle.set_connection_request(request.to_owned())?;
        let result = request.get(self.config.lease_timeout());
        self.abort_handle.clear_canceller();
        let mut conn = result.map_err(|err| match err.target_host() {
            Some(_) => err,
            None => err.host(route.target_host().to_owned()),
        })?;

        if self.config.stale_connection_check() && conn.is_open() && conn.is_stale() {
            debug!("Leased connection {:?} is stale, closing", conn.remote_addr());
            if let Err(err) = conn.close() {
                warn!("Failed to close stale connection {:?}: {}", conn.remote_addr(), err);
            }
        }

        let lease = Lease::new(self.manager.to_owned(), conn, route.to_owned());
        debug!(
            "Connection leased for {} (reused: {})",
            lease.route(),
            lease.is_reused()
        );
        self.abort_handle.set_canceller(lease.conn().abort_handle())?;
        Ok(lease)
    }

    /// 根据响应更新连接的复用标记，返回连接可以保持的时长
    fn update_reuse(
        &self,
        conn: &mut dyn ManagedConnection,
        request: &RequestParts,
        response: &ResponseParts,
    ) -> Option<Duration> {
        if self.reuse_strategy.keep_alive(request, response) {
            conn.mark_reusable();
            let valid_for = self.keep_alive_strategy.keep_alive_duration(response);
            debug!("Connection can be kept alive for {:?}", valid_for);
            valid_for
        } else {
            conn.unmark_reusable();
            None
        }
    }

    /// 判断是否需要再发送一轮请求
    ///
    /// 返回下一轮请求使用的路由，[`None`] 表示当前响应即为最终响应。
    /// 重定向优先于鉴权，代理鉴权优先于目标主机鉴权
    fn follow_up(
        &self,
        wrapper: &mut RequestWrapper,
        response: &ResponseParts,
        current_route: &Route,
        original_route: &Route,
        ctx: &mut ExecutionContext,
    ) -> ResponseResult<Option<Route>> {
        if self.config.handle_redirects() && self.redirect_strategy.is_redirected(wrapper.parts(), response) {
            if ctx.redirect_count() >= self.config.max_redirects() {
                return Err(ResponseError::new_with_msg(
                    ResponseErrorKind::TooManyRedirects,
                    format!("Maximum redirects ({}) exceeded", self.config.max_redirects()),
                )
                .host(current_route.target_host()));
            }
            ctx.increase_redirect_count();
            let previous_target = wrapper.target_host()?;
            let redirect = self
                .redirect_strategy
                .redirect(wrapper.parts(), response, ctx.redirect_locations_mut())?;
            wrapper.redirect(redirect);
            let next_target = wrapper.target_host()?;
            debug!(
                "Redirecting to {} ({} of {})",
                wrapper.parts().url(),
                ctx.redirect_count(),
                self.config.max_redirects()
            );
            if next_target != previous_target {
                debug!("Redirect target changed from {} to {}, resetting authentication", previous_target, next_target);
                ctx.target_auth_state_mut().reset();
                if ctx
                    .proxy_auth_state()
                    .scheme()
                    .map_or(false, |scheme| scheme.is_connection_based())
                {
                    ctx.proxy_auth_state_mut().reset();
                }
            }
            return self
                .route_planner
                .determine_route(&next_target, original_route)
                .map(Some);
        }

        if !self.config.handle_authentication() {
            return Ok(None);
        }

        if let Some(proxy) = current_route.proxy_host().filter(|_| is_proxy_visible(current_route)) {
            let strategy = self.proxy_auth_strategy.as_ref();
            if is_authentication_requested(proxy, response, strategy, ctx.proxy_auth_state_mut())
                && handle_challenge(
                    proxy,
                    response,
                    strategy,
                    ctx.proxy_auth_state_mut(),
                    self.config.max_auth_attempts(),
                )?
            {
                return Ok(Some(current_route.to_owned()));
            }
        }

        let target = wrapper.target_host()?;
        let strategy = self.target_auth_strategy.as_ref();
        if is_authentication_requested(&target, response, strategy, ctx.target_auth_state_mut())
            && handle_challenge(
                &target,
                response,
                strategy,
                ctx.target_auth_state_mut(),
                self.config.max_auth_attempts(),
            )?
        {
            return Ok(Some(current_route.to_owned()));
        }
        Ok(None)
    }

    fn open_options(&self) -> OpenOptions {
        OpenOptions::new(self.config.connect_timeout())
    }

    #[allow(dead_code)]
    fn assert() {
        assert_impl!(Send: Self);
        assert_impl!(Sync: Self);
    }
}

/// 连接关闭后，基于连接的鉴权需要在新连接上从头开始
fn restart_connection_based_auth(ctx: &mut ExecutionContext) {
    if ctx.proxy_auth_state_mut().restart_on_new_connection() {
        debug!("Connection closed, restarting proxy authentication");
    }
    if ctx.target_auth_state_mut().restart_on_new_connection() {
        debug!("Connection closed, restarting target authentication");
    }
}

/// 请求是否直接发送给代理，即经过代理且不建立隧道
fn is_proxy_visible(route: &Route) -> bool {
    route.proxy_host().is_some() && !route.is_tunnelled()
}

/// 请求执行器构建器
#[derive(Debug)]
pub struct RequestDirectorBuilder {
    manager: Arc<dyn ConnectionManager>,
    config: Option<DirectorConfig>,
    redirect_strategy: Option<Box<dyn RedirectStrategy>>,
    target_auth_strategy: Option<Box<dyn AuthenticationStrategy>>,
    proxy_auth_strategy: Option<Box<dyn AuthenticationStrategy>>,
    credentials_provider: Option<Arc<dyn CredentialsProvider>>,
    reuse_strategy: Option<Box<dyn ReuseStrategy>>,
    keep_alive_strategy: Option<Box<dyn KeepAliveStrategy>>,
    route_planner: Option<Box<dyn RoutePlanner>>,
}

impl RequestDirectorBuilder {
    /// 创建请求执行器构建器
    #[inline]
    pub fn new(manager: Arc<dyn ConnectionManager>) -> Self {
        Self {
            manager,
            config: None,
            redirect_strategy: None,
            target_auth_strategy: None,
            proxy_auth_strategy: None,
            credentials_provider: None,
            reuse_strategy: None,
            keep_alive_strategy: None,
            route_planner: None,
        }
    }

    /// 设置请求执行器配置
    #[inline]
    pub fn config(&mut self, config: DirectorConfig) -> &mut Self {
        self.config = Some(config);
        self
    }

    /// 设置重定向策略
    #[inline]
    pub fn redirect_strategy(&mut self, redirect_strategy: impl RedirectStrategy + 'static) -> &mut Self {
        self.redirect_strategy = Some(Box::new(redirect_strategy));
        self
    }

    /// 设置目标主机鉴权策略
    #[inline]
    pub fn target_auth_strategy(&mut self, strategy: impl AuthenticationStrategy + 'static) -> &mut Self {
        self.target_auth_strategy = Some(Box::new(strategy));
        self
    }

    /// 设置代理鉴权策略
    #[inline]
    pub fn proxy_auth_strategy(&mut self, strategy: impl AuthenticationStrategy + 'static) -> &mut Self {
        self.proxy_auth_strategy = Some(Box::new(strategy));
        self
    }

    /// 设置凭证提供者
    ///
    /// 未单独设置鉴权策略时，默认的目标主机和代理鉴权策略都从该提供者获取凭证
    #[inline]
    pub fn credentials_provider(&mut self, provider: impl CredentialsProvider + 'static) -> &mut Self {
        self.credentials_provider = Some(Arc::new(provider));
        self
    }

    /// 设置连接复用策略
    #[inline]
    pub fn reuse_strategy(&mut self, reuse_strategy: impl ReuseStrategy + 'static) -> &mut Self {
        self.reuse_strategy = Some(Box::new(reuse_strategy));
        self
    }

    /// 设置连接保持时长策略
    #[inline]
    pub fn keep_alive_strategy(&mut self, keep_alive_strategy: impl KeepAliveStrategy + 'static) -> &mut Self {
        self.keep_alive_strategy = Some(Box::new(keep_alive_strategy));
        self
    }

    /// 设置路由规划器
    #[inline]
    pub fn route_planner(&mut self, route_planner: impl RoutePlanner + 'static) -> &mut Self {
        self.route_planner = Some(Box::new(route_planner));
        self
    }

    /// 构建请求执行器
    pub fn build(&mut self) -> RequestDirector {
        let provider = self
            .credentials_provider
            .take()
            .unwrap_or_else(|| Arc::new(BasicCredentialsProvider::default()));
        RequestDirector {
            manager: self.manager.to_owned(),
            config: self.config.take().unwrap_or_default(),
            redirect_strategy: self
                .redirect_strategy
                .take()
                .unwrap_or_else(|| Box::new(DefaultRedirectStrategy::default())),
            target_auth_strategy: self
                .target_auth_strategy
                .take()
                .unwrap_or_else(|| Box::new(DefaultAuthenticationStrategy::target(provider.to_owned()))),
            proxy_auth_strategy: self
                .proxy_auth_strategy
                .take()
                .unwrap_or_else(|| Box::new(DefaultAuthenticationStrategy::proxy(provider))),
            reuse_strategy: self
                .reuse_strategy
                .take()
                .unwrap_or_else(|| Box::new(DefaultReuseStrategy)),
            keep_alive_strategy: self
                .keep_alive_strategy
                .take()
                .unwrap_or_else(|| Box::new(DefaultKeepAliveStrategy)),
            route_planner: self
                .route_planner
                .take()
                .unwrap_or_else(|| Box::new(DefaultRoutePlanner)),
            abort_handle: Default::default(),
            held: None,
        }
    }
}
