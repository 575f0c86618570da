#![deny(unsafe_code)]

//! # courier-http
//!
//! ## HTTP 消息与连接接口层
//!
//! 定义请求执行器所依赖的 HTTP 消息类型，路由，传输层错误，
//! 以及连接管理器和受管理连接的接口，具体的连接实现由其他库提供

mod connection;
mod error;
mod request;
mod response;
mod route;

pub use connection::{Cancellable, ConnectionManager, ConnectionRequest, ManagedConnection, OpenOptions};
pub use error::{Error, ErrorKind, Result};
pub use http::{
    header::{self, HeaderMap, HeaderName, HeaderValue},
    method::Method,
    status::StatusCode,
    uri::{self, Uri},
    Extensions, Version,
};
pub use request::{Request, RequestBody, RequestBuilder, RequestParts};
pub use response::{Response, ResponseBody, ResponseBuilder, ResponseParts};
pub use route::{HttpHost, InvalidRouteError, Route, RouteBuilder};

use once_cell::sync::Lazy;

static FULL_USER_AGENT: Lazy<Box<str>> = Lazy::new(|| {
    format!(
        "Courier/courier-http-{}/rust-{}",
        env!("CARGO_PKG_VERSION"),
        env!("COURIER_RUSTC_VERSION"),
    )
    .into()
});

/// 获取默认的 UserAgent
#[inline]
pub fn user_agent() -> &'static str {
    &FULL_USER_AGENT
}
