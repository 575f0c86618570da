use super::{
    super::{ResponseError, ResponseErrorKind, ResponseResult},
    Redirect, RedirectLocations, RedirectStrategy,
};
use courier_http::{
    header::{
        AUTHORIZATION, CONTENT_ENCODING, CONTENT_LANGUAGE, CONTENT_LENGTH, CONTENT_LOCATION, CONTENT_TYPE, COOKIE,
        HOST, LOCATION, TRANSFER_ENCODING,
    },
    HeaderMap, Method, RequestParts, ResponseParts, StatusCode, Uri,
};
use log::debug;
use url::{ParseError, Url};

/// 默认重定向策略
///
/// 301 / 302 / 307 / 308 只重定向 GET 和 HEAD 请求，303 重定向任意请求并改为 GET 请求，
/// 307 / 308 保留原请求的方法和请求体
#[derive(Debug, Clone, Default)]
pub struct DefaultRedirectStrategy {
    allow_circular_redirects: bool,
    reject_relative_redirects: bool,
}

impl DefaultRedirectStrategy {
    /// 创建默认重定向策略构建器
    #[inline]
    pub fn builder() -> DefaultRedirectStrategyBuilder {
        Default::default()
    }

    /// 是否允许循环重定向
    #[inline]
    pub fn allow_circular_redirects(&self) -> bool {
        self.allow_circular_redirects
    }

    /// 是否拒绝相对地址的重定向
    #[inline]
    pub fn reject_relative_redirects(&self) -> bool {
        self.reject_relative_redirects
    }

    fn location_uri(&self, request: &RequestParts, response: &ResponseParts) -> ResponseResult<Uri> {
        let location = response
            .header(LOCATION)
            .ok_or_else(|| {
                ResponseError::new_with_msg(
                    ResponseErrorKind::InvalidRedirect,
                    format!("Received redirect response {} but no location header", response.status_code()),
                )
            })?
            .to_str()
            .map_err(|err| ResponseError::new(ResponseErrorKind::InvalidRedirect, err))?;
        let mut next = match Url::parse(location) {
            Ok(next) => next,
            Err(ParseError::RelativeUrlWithoutBase) => {
                if self.reject_relative_redirects {
                    return Err(ResponseError::new_with_msg(
                        ResponseErrorKind::InvalidRedirect,
                        format!("Relative redirect location '{}' not allowed", location),
                    ));
                }
                Url::parse(&request.url().to_string())
                    .and_then(|base| base.join(location))
                    .map_err(|err| ResponseError::new(ResponseErrorKind::InvalidRedirect, err))?
            }
            Err(err) => return Err(ResponseError::new(ResponseErrorKind::InvalidRedirect, err)),
        };
        next.set_fragment(None);
        if !matches!(next.scheme(), "http" | "https") {
            return Err(ResponseError::new_with_msg(
                ResponseErrorKind::InvalidRedirect,
                format!("Unsupported redirect location '{}'", next),
            ));
        }
        next.as_str()
            .parse()
            .map_err(|err| ResponseError::new(ResponseErrorKind::InvalidRedirect, err))
    }
}

impl RedirectStrategy for DefaultRedirectStrategy {
    fn is_redirected(&self, request: &RequestParts, response: &ResponseParts) -> bool {
        match response.status_code() {
            StatusCode::SEE_OTHER => true,
            StatusCode::FOUND => is_redirectable(request.method()) && response.header(LOCATION).is_some(),
            StatusCode::MOVED_PERMANENTLY | StatusCode::TEMPORARY_REDIRECT | StatusCode::PERMANENT_REDIRECT => {
                is_redirectable(request.method())
            }
            _ => false,
        }
    }

    fn redirect(
        &self,
        request: &RequestParts,
        response: &ResponseParts,
        locations: &mut RedirectLocations,
    ) -> ResponseResult<Redirect> {
        let next = self.location_uri(request, response)?;
        if !self.allow_circular_redirects && locations.contains(&next) {
            return Err(ResponseError::new_with_msg(
                ResponseErrorKind::CircularRedirect,
                format!("Circular redirect to '{}'", next),
            ));
        }
        locations.add(next.to_owned());
        debug!("Redirect requested to location '{}'", next);

        let status_code = response.status_code();
        let keep_body = matches!(
            status_code,
            StatusCode::TEMPORARY_REDIRECT | StatusCode::PERMANENT_REDIRECT
        );
        let cross_host = !is_same_host(request.url(), &next);

        let mut parts = request.to_owned();
        *parts.url_mut() = next;
        if status_code == StatusCode::SEE_OTHER && *parts.method() != Method::HEAD {
            *parts.method_mut() = Method::GET;
        }
        if !keep_body {
            remove_content_headers(parts.headers_mut());
        }
        if cross_host {
            remove_sensitive_headers(parts.headers_mut());
        }
        Ok(Redirect::new(parts, keep_body))
    }
}

fn is_redirectable(method: &Method) -> bool {
    *method == Method::GET || *method == Method::HEAD
}

fn is_same_host(previous: &Uri, next: &Uri) -> bool {
    fn port_or_default(uri: &Uri) -> Option<u16> {
        uri.port_u16().or(match uri.scheme_str() {
            Some("http") => Some(80),
            Some("https") => Some(443),
            _ => None,
        })
    }
    previous.scheme_str() == next.scheme_str()
        && previous.host().map(|host| host.to_ascii_lowercase()) == next.host().map(|host| host.to_ascii_lowercase())
        && port_or_default(previous) == port_or_default(next)
}

fn remove_content_headers(headers: &mut HeaderMap) {
    for header_name in [
        CONTENT_LENGTH,
        CONTENT_TYPE,
        CONTENT_ENCODING,
        CONTENT_LANGUAGE,
        CONTENT_LOCATION,
        TRANSFER_ENCODING,
    ] {
        headers.remove(header_name);
    }
}

fn remove_sensitive_headers(headers: &mut HeaderMap) {
    headers.remove(AUTHORIZATION);
    headers.remove(COOKIE);
    headers.remove(HOST);
}

/// 默认重定向策略构建器
#[derive(Debug, Clone, Default)]
pub struct DefaultRedirectStrategyBuilder {
    inner: DefaultRedirectStrategy,
}

impl DefaultRedirectStrategyBuilder {
    /// 设置是否允许循环重定向
    ///
    /// 默认不允许
    #[inline]
    pub fn allow_circular_redirects(&mut self, allow_circular_redirects: bool) -> &mut Self {
        self.inner.allow_circular_redirects = allow_circular_redirects;
        self
    }

    /// 设置是否拒绝相对地址的重定向
    ///
    /// 默认允许，相对地址将基于原请求的地址解析
    #[inline]
    pub fn reject_relative_redirects(&mut self, reject_relative_redirects: bool) -> &mut Self {
        self.inner.reject_relative_redirects = reject_relative_redirects;
        self
    }

    /// 构建默认重定向策略
    #[inline]
    pub fn build(&self) -> DefaultRedirectStrategy {
        self.inner.to_owned()
    }
}
