use super::super::{Redirect, ResponseError, ResponseErrorKind, ResponseResult};
use courier_http::{
    header::{EXPECT, HOST},
    ErrorKind as HttpErrorKind, HeaderValue, HttpHost, Request, RequestBody, RequestParts, Route, Uri, Version,
};

/// 请求执行期间对用户请求的封装
///
/// 保存用户请求的原始信息，以及经过重定向后的当前请求信息。当前请求信息的地址总是绝对地址，
/// 发送前再根据路由改写为线路上实际使用的形式
#[derive(Debug)]
pub(super) struct RequestWrapper {
    original: RequestParts,
    parts: RequestParts,
    body: RequestBody,
    exec_count: usize,
}

impl RequestWrapper {
    /// 封装用户请求，相对地址将基于路由的目标主机补全
    pub(super) fn new(request: Request, route: &Route) -> ResponseResult<Self> {
        let (mut parts, body) = request.into_parts();
        if parts.url().authority().is_none() {
            let target = route.target_host();
            let url = Uri::builder()
                .scheme(target.scheme())
                .authority(target.to_authority_string().as_str())
                .path_and_query(parts.url().path_and_query().map_or("/", |pq| pq.as_str()))
                .build()
                .map_err(|err| ResponseError::new(HttpErrorKind::InvalidUrl.into(), err))?;
            *parts.url_mut() = url;
        }
        Ok(Self {
            original: parts.to_owned(),
            parts,
            body,
            exec_count: 0,
        })
    }

    /// 用户请求的原始信息
    pub(super) fn original(&self) -> &RequestParts {
        &self.original
    }

    /// 当前请求信息
    pub(super) fn parts(&self) -> &RequestParts {
        &self.parts
    }

    pub(super) fn body_mut(&mut self) -> &mut RequestBody {
        &mut self.body
    }

    /// 当前请求的目标主机
    pub(super) fn target_host(&self) -> ResponseResult<HttpHost> {
        HttpHost::from_uri(self.parts.url()).ok_or_else(|| {
            ResponseError::new_with_msg(
                HttpErrorKind::InvalidUrl.into(),
                format!("URI does not specify a target host: {}", self.parts.url()),
            )
        })
    }

    /// 替换为重定向后的请求，不再保留请求体时清空请求体
    pub(super) fn redirect(&mut self, redirect: Redirect) {
        let keep_body = redirect.keep_body();
        self.parts = redirect.into_parts();
        if !keep_body {
            self.body = RequestBody::default();
        }
    }

    /// 在每次发送前调用
    ///
    /// 请求体不可重复发送时，只允许发送一次
    pub(super) fn prepare_send(&mut self) -> ResponseResult<()> {
        self.exec_count += 1;
        if self.exec_count > 1 {
            if !self.body.is_repeatable() {
                return Err(ResponseError::new_with_msg(
                    ResponseErrorKind::NonRepeatableRequest,
                    "Cannot retry request with a non-repeatable request entity",
                ));
            }
            self.body.reset()?;
        }
        Ok(())
    }

    /// 已经发送的次数
    pub(super) fn exec_count(&self) -> usize {
        self.exec_count
    }

    /// 是否在发送请求体前等待 `100 Continue`
    pub(super) fn expects_continue(&self) -> bool {
        self.parts.version() >= Version::HTTP_11
            && !self.body.is_empty()
            && self.parts.header(EXPECT).map_or(false, |value| {
                value
                    .to_str()
                    .map_or(false, |value| value.eq_ignore_ascii_case("100-continue"))
            })
    }

    /// 生成线路上实际发送的请求信息
    ///
    /// 经过代理且不建立隧道时使用绝对地址，否则只使用路径和查询参数
    pub(super) fn wire_parts(&self, route: &Route) -> ResponseResult<RequestParts> {
        let mut parts = self.parts.to_owned();
        if route.proxy_host().is_none() || route.is_tunnelled() {
            let url = self.parts.url();
            let origin = match url.query() {
                Some(query) => format!("{}?{}", url.path(), query),
                None => url.path().to_owned(),
            };
            *parts.url_mut() = origin
                .parse()
                .map_err(|err| ResponseError::new(HttpErrorKind::InvalidUrl.into(), err))?;
        }
        if !parts.headers().contains_key(HOST) {
            if let Some(authority) = self.parts.url().authority() {
                let host = HeaderValue::from_str(authority.as_str())
                    .map_err(|err| ResponseError::new(HttpErrorKind::InvalidHeader.into(), err))?;
                parts.headers_mut().insert(HOST, host);
            }
        }
        Ok(parts)
    }
}
