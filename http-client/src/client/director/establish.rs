use super::{
    super::{
        apply_authorization, handle_challenge, is_authentication_requested, BasicRouteDirector, ExecutionContext, Lease,
        ResponseError, ResponseErrorKind, ResponseResult, RouteStep,
    },
    exchange::{buffer_response_body, discard_response_body, exchange},
    RequestDirector,
};
use courier_http::{
    header::{HOST, USER_AGENT},
    user_agent, Error as HttpError, ErrorKind as HttpErrorKind, HeaderValue, Method, RequestBody, RequestParts,
    Response, ResponseBody, Route, Uri,
};
use log::debug;

impl RequestDirector {
    /// 按照路由建立连接
    ///
    /// 代理拒绝建立隧道时，返回代理的响应作为最终响应
    pub(super) fn establish_route(
        &self,
        lease: &mut Lease,
        route: &Route,
        ctx: &mut ExecutionContext,
    ) -> ResponseResult<Option<Response>> {
        let mut reopened = false;
        loop {
            let fact = if lease.conn().is_open() {
                lease.conn().route().cloned()
            } else {
                None
            };
            match BasicRouteDirector.next_step(route, fact.as_ref()) {
                RouteStep::ConnectTarget | RouteStep::ConnectProxy => self.open_connection(lease, route)?,
                RouteStep::TunnelTarget => {
                    if let Some(response) = self.create_tunnel_to_target(lease, route, ctx)? {
                        return Ok(Some(response));
                    }
                    debug!("Tunnel to {} created", route.target_host());
                    lease.conn_mut().tunnel_target(false)?;
                }
                RouteStep::TunnelProxy(hop) => {
                    return Err(HttpError::new(
                        HttpErrorKind::ProtocolError,
                        format!("Proxy chains are not supported (tunnel to hop {})", hop),
                    )
                    .into());
                }
                RouteStep::LayerProtocol => {
                    debug!("Layering protocol over tunnel to {}", route.target_host());
                    lease.conn_mut().layer_protocol(route.is_secure())?;
                }
                RouteStep::Unreachable if fact.is_some() && !reopened => {
                    debug!("Leased connection does not match route {}, reopening", route);
                    lease.conn_mut().close()?;
                    reopened = true;
                }
                RouteStep::Unreachable => {
                    return Err(ResponseError::new_with_msg(
                        ResponseErrorKind::UnreachableRoute,
                        format!(
                            "Unable to establish route: planned = {}; current = {}",
                            route,
                            fact.map_or_else(|| "none".to_owned(), |fact| fact.to_string())
                        ),
                    )
                    .host(route.target_host()));
                }
                RouteStep::Complete => return Ok(None),
            }
        }
    }

    fn open_connection(&self, lease: &mut Lease, route: &Route) -> ResponseResult<()> {
        debug!("Opening connection {}", route);
        lease
            .conn_mut()
            .open(route, &self.open_options())
            .map_err(|err| match err.target_host() {
                Some(_) => err,
                None => err.host(route.target_host().to_owned()),
            })?;
        Ok(())
    }

    /// 通过代理建立到目标主机的隧道
    ///
    /// 代理要求鉴权且有可用凭证时，在同一连接上重新发送 `CONNECT` 请求
    fn create_tunnel_to_target(
        &self,
        lease: &mut Lease,
        route: &Route,
        ctx: &mut ExecutionContext,
    ) -> ResponseResult<Option<Response>> {
        let proxy = route
            .proxy_host()
            .ok_or_else(|| HttpError::new(HttpErrorKind::ProtocolError, "Tunnel requires a proxy"))?;
        let authority = route.target_host().to_host_string();
        let strategy = self.proxy_auth_strategy.as_ref();

        loop {
            if !lease.conn().is_open() {
                self.open_connection(lease, route)?;
            }

            let mut parts = RequestParts::default();
            *parts.method_mut() = Method::CONNECT;
            *parts.url_mut() = authority
                .parse::<Uri>()
                .map_err(|err| ResponseError::new(HttpErrorKind::InvalidUrl.into(), err))?;
            parts.headers_mut().insert(HOST, header_value(&authority)?);
            parts.headers_mut().insert(USER_AGENT, header_value(user_agent())?);
            if self.config.handle_authentication() {
                apply_authorization(&mut parts, strategy, ctx.proxy_auth_state_mut());
            }

            debug!("Creating tunnel to {} through {}", authority, proxy);
            let response = exchange(lease.conn_mut(), &parts, &mut RequestBody::default(), None, ctx)?;
            let keep_alive = self.reuse_strategy.keep_alive(&parts, &response);

            if self.config.handle_authentication()
                && is_authentication_requested(proxy, &response, strategy, ctx.proxy_auth_state_mut())
                && handle_challenge(
                    proxy,
                    &response,
                    strategy,
                    ctx.proxy_auth_state_mut(),
                    self.config.max_auth_attempts(),
                )?
            {
                if keep_alive {
                    discard_response_body(lease.conn_mut(), &Method::CONNECT, &response)?;
                } else {
                    debug!("Connection to proxy {} can not be kept alive, closing", proxy);
                    lease.conn_mut().close()?;
                    if ctx.proxy_auth_state_mut().restart_on_new_connection() {
                        debug!("Restarting authentication with proxy {} on a new connection", proxy);
                    }
                }
                continue;
            }

            if response.status_code().as_u16() > 299 {
                debug!("Tunnel to {} refused: {}", authority, response.status_code());
                let body = buffer_response_body(lease.conn_mut(), &Method::CONNECT, &response)?;
                lease.conn_mut().close()?;
                return Ok(Some(Response::from_parts(response, ResponseBody::from_bytes(body))));
            }
            return Ok(None);
        }
    }
}

fn header_value(value: &str) -> ResponseResult<HeaderValue> {
    HeaderValue::from_str(value).map_err(|err| ResponseError::new(HttpErrorKind::InvalidHeader.into(), err))
}
