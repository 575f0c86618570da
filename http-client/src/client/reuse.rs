use auto_impl::auto_impl;
use courier_http::{
    header::{CONNECTION, CONTENT_LENGTH, TRANSFER_ENCODING},
    HeaderMap, Method, RequestParts, ResponseParts, StatusCode, Version,
};
use std::{fmt::Debug, time::Duration};

/// 连接复用策略
///
/// 在收到最终响应后，决定连接是否可以在响应体读取完毕后被复用
#[auto_impl(&, Box, Arc)]
pub trait ReuseStrategy: Debug + Send + Sync {
    /// 连接是否可以被复用
    fn keep_alive(&self, request: &RequestParts, response: &ResponseParts) -> bool;
}

/// 默认连接复用策略
///
/// 按照 HTTP/1.x 的持久连接规则判断
#[derive(Debug, Copy, Clone, Default)]
pub struct DefaultReuseStrategy;

impl ReuseStrategy for DefaultReuseStrategy {
    fn keep_alive(&self, request: &RequestParts, response: &ResponseParts) -> bool {
        if has_connection_token(request.headers(), "close") {
            return false;
        }
        let headers = response.headers();
        if let Some(transfer_encoding) = headers.get(TRANSFER_ENCODING) {
            let is_chunked = transfer_encoding
                .to_str()
                .map_or(false, |value| value.trim().eq_ignore_ascii_case("chunked"));
            if !is_chunked {
                return false;
            }
        } else if can_response_have_body(request.method(), response.status_code())
            && content_length(headers).is_none()
        {
            return false;
        }
        if has_connection_token(headers, "close") {
            return false;
        }
        if has_connection_token(headers, "keep-alive") {
            return true;
        }
        response.version() >= Version::HTTP_11
    }
}

/// 连接保持时长策略
#[auto_impl(&, Box, Arc)]
pub trait KeepAliveStrategy: Debug + Send + Sync {
    /// 连接可以保持空闲的时长，[`None`] 表示不限
    fn keep_alive_duration(&self, response: &ResponseParts) -> Option<Duration>;
}

/// 默认连接保持时长策略
///
/// 解析 `Keep-Alive: timeout=N` 响应头
#[derive(Debug, Copy, Clone, Default)]
pub struct DefaultKeepAliveStrategy;

impl KeepAliveStrategy for DefaultKeepAliveStrategy {
    fn keep_alive_duration(&self, response: &ResponseParts) -> Option<Duration> {
        response
            .headers()
            .get_all("keep-alive")
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .filter_map(|element| {
                let (name, value) = element.split_once('=')?;
                if name.trim().eq_ignore_ascii_case("timeout") {
                    value.trim().trim_matches('"').parse::<u64>().ok()
                } else {
                    None
                }
            })
            .next()
            .map(Duration::from_secs)
    }
}

/// 响应是否可能携带响应体
///
/// `HEAD` 请求，`1xx`，`204`，`205`，`304` 响应，以及 `CONNECT` 请求的 `2xx` 响应没有响应体
pub fn can_response_have_body(method: &Method, status_code: StatusCode) -> bool {
    if *method == Method::HEAD {
        return false;
    }
    if *method == Method::CONNECT && status_code.is_success() {
        return false;
    }
    !(status_code.is_informational()
        || status_code == StatusCode::NO_CONTENT
        || status_code == StatusCode::RESET_CONTENT
        || status_code == StatusCode::NOT_MODIFIED)
}

/// 响应体是否一定为空
///
/// 除了协议规定没有响应体的情况，`Content-Length: 0` 也视为空响应体
pub fn is_response_body_empty(method: &Method, response: &ResponseParts) -> bool {
    !can_response_have_body(method, response.status_code()) || content_length(response.headers()) == Some(0)
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    let mut values = headers.get_all(CONTENT_LENGTH).iter();
    let value = values.next()?;
    if values.next().is_some() {
        return None;
    }
    value.to_str().ok()?.trim().parse().ok()
}

fn has_connection_token(headers: &HeaderMap, token: &str) -> bool {
    headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|element| element.trim().eq_ignore_ascii_case(token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_http::HeaderValue;

    fn response(version: Version, headers: &[(&'static str, &'static str)]) -> ResponseParts {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.append(*name, HeaderValue::from_static(*value));
        }
        ResponseParts::new(StatusCode::OK, version, map)
    }

    #[test]
    fn test_default_reuse_strategy() {
        let strategy = DefaultReuseStrategy;
        let request = RequestParts::default();

        assert!(strategy.keep_alive(&request, &response(Version::HTTP_11, &[("content-length", "10")])));
        assert!(!strategy.keep_alive(
            &request,
            &response(Version::HTTP_11, &[("content-length", "10"), ("connection", "close")])
        ));
        assert!(!strategy.keep_alive(&request, &response(Version::HTTP_10, &[("content-length", "10")])));
        assert!(strategy.keep_alive(
            &request,
            &response(Version::HTTP_10, &[("content-length", "10"), ("connection", "Keep-Alive")])
        ));
        assert!(strategy.keep_alive(&request, &response(Version::HTTP_11, &[("transfer-encoding", "chunked")])));
        assert!(!strategy.keep_alive(&request, &response(Version::HTTP_11, &[("transfer-encoding", "gzip")])));
        assert!(!strategy.keep_alive(&request, &response(Version::HTTP_11, &[])));
        assert!(!strategy.keep_alive(
            &request,
            &response(Version::HTTP_11, &[("content-length", "1"), ("content-length", "2")])
        ));

        let mut head = RequestParts::default();
        *head.method_mut() = Method::HEAD;
        assert!(strategy.keep_alive(&head, &response(Version::HTTP_11, &[])));
    }

    #[test]
    fn test_keep_alive_duration() {
        let strategy = DefaultKeepAliveStrategy;
        assert_eq!(
            strategy.keep_alive_duration(&response(Version::HTTP_11, &[("keep-alive", "timeout=5, max=100")])),
            Some(Duration::from_secs(5))
        );
        assert_eq!(
            strategy.keep_alive_duration(&response(Version::HTTP_11, &[("keep-alive", "max=100")])),
            None
        );
        assert_eq!(strategy.keep_alive_duration(&response(Version::HTTP_11, &[])), None);
    }

    #[test]
    fn test_response_body_presence() {
        assert!(!can_response_have_body(&Method::HEAD, StatusCode::OK));
        assert!(!can_response_have_body(&Method::GET, StatusCode::NO_CONTENT));
        assert!(!can_response_have_body(&Method::GET, StatusCode::NOT_MODIFIED));
        assert!(!can_response_have_body(&Method::CONNECT, StatusCode::OK));
        assert!(can_response_have_body(&Method::CONNECT, StatusCode::PROXY_AUTHENTICATION_REQUIRED));
        assert!(can_response_have_body(&Method::GET, StatusCode::OK));
        assert!(is_response_body_empty(
            &Method::GET,
            &response(Version::HTTP_11, &[("content-length", "0")])
        ));
    }
}
