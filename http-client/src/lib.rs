#![deny(unsafe_code)]

//! # courier-http-client
//!
//! ## 请求执行器
//!
//! 将一个逻辑 HTTP 请求转换为实际需要发送的一系列请求：
//! 跟随重定向，回应目标主机和代理的鉴权质询，跳过中间响应，
//! 从连接管理器租用连接，并保证每个租用的连接都恰好被归还一次。
//!
//! 最终响应的响应体需要从连接上读取时，连接随响应体一起返回，
//! 响应体读取完毕后自动归还，提前丢弃则关闭连接。

mod client;

#[cfg(test)]
mod test_utils;

pub extern crate courier_http as http;

pub use client::{
    can_response_have_body, is_response_body_empty, AbortHandle, AuthError, AuthOption, AuthPhase, AuthScheme,
    AuthSchemeFactory, AuthSchemeRegistry, AuthScope, AuthState, AuthenticationStrategy, Backoff, BackoffOptions,
    BasicCredentialsProvider, BasicRouteDirector, BasicScheme, BasicSchemeFactory, Challenge, ConnectionHandle,
    Credentials, CredentialsProvider, DefaultAuthenticationStrategy, DefaultKeepAliveStrategy,
    DefaultRedirectStrategy, DefaultRedirectStrategyBuilder, DefaultRetrier, DefaultReuseStrategy,
    DefaultRoutePlanner, DirectorConfig, DirectorConfigBuilder, ExecutionContext, ExponentialBackoff, FixedBackoff,
    GotBackoffDuration, Idempotent, KeepAliveStrategy, LimitedBackoff, LimitedRetrier, NeverRetrier,
    RandomizedBackoff, Ratio, Redirect, RedirectLocations, RedirectStrategy, RequestDirector, RequestDirectorBuilder,
    RequestRetrier, RequestRetrierOptions, ResponseError, ResponseErrorKind, ResponseResult, RetriedStatsInfo,
    RetryDecision, RetryResult, RetryingDirector, ReuseStrategy, RoutePlanner, RouteStep, RouteTracker, NO_BACKOFF,
};
