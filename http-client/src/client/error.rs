use super::RetriedStatsInfo;
use anyhow::Error as AnyError;
use assert_impl::assert_impl;
use courier_http::{Error as HttpError, ErrorKind as HttpErrorKind, HttpHost};
use std::{
    error::Error as StdError,
    fmt::{self, Debug, Display},
    io::Error as IoError,
    net::SocketAddr,
    result,
};

/// 请求执行错误类型
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// 传输层错误
    HttpError(HttpErrorKind),

    /// 重定向次数超过上限
    TooManyRedirects,

    /// 循环重定向
    CircularRedirect,

    /// 非法的重定向响应
    InvalidRedirect,

    /// 请求体无法重复发送
    NonRepeatableRequest,

    /// 鉴权次数超过上限
    AuthRetryLimitExceeded,

    /// 无法建立到目标主机的路由
    UnreachableRoute,

    /// 请求执行被中断
    Interrupted,
}

/// 请求执行错误
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    error: AnyError,
    host: Option<HttpHost>,
    remote_addr: Option<SocketAddr>,
    redirect_count: usize,
    retried: Option<RetriedStatsInfo>,
}

impl Error {
    /// 创建请求执行错误
    #[inline]
    pub fn new(kind: ErrorKind, err: impl Into<AnyError>) -> Self {
        Error {
            kind,
            error: err.into(),
            host: None,
            remote_addr: None,
            redirect_count: 0,
            retried: None,
        }
    }

    /// 创建请求执行错误
    #[inline]
    pub fn new_with_msg(kind: ErrorKind, msg: impl Display + Debug + Send + Sync + 'static) -> Self {
        Self::new(kind, AnyError::msg(msg))
    }

    /// 设置错误相关的主机
    #[inline]
    #[must_use]
    pub fn host(mut self, host: &HttpHost) -> Self {
        self.host = Some(host.to_owned());
        self
    }

    /// 设置错误相关的远端地址
    #[inline]
    #[must_use]
    pub fn remote_addr(mut self, remote_addr: SocketAddr) -> Self {
        self.remote_addr = Some(remote_addr);
        self
    }

    /// 设置发生错误时已经重定向的次数
    #[inline]
    #[must_use]
    pub fn redirect_count(mut self, redirect_count: usize) -> Self {
        self.redirect_count = redirect_count;
        self
    }

    /// 设置重试信息
    #[inline]
    #[must_use]
    pub fn retried(mut self, retried: &RetriedStatsInfo) -> Self {
        self.retried = Some(retried.to_owned());
        self
    }

    /// 获取错误类型
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// 获取错误相关的主机
    #[inline]
    pub fn target_host(&self) -> Option<&HttpHost> {
        self.host.as_ref()
    }

    /// 获取错误相关的远端地址
    #[inline]
    pub fn target_remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// 获取发生错误时已经重定向的次数
    #[inline]
    pub fn redirects(&self) -> usize {
        self.redirect_count
    }

    /// 获取重试信息
    #[inline]
    pub fn retried_stats(&self) -> Option<&RetriedStatsInfo> {
        self.retried.as_ref()
    }

    /// 是否为连接超时
    ///
    /// 包括建立连接超时和等待连接管理器分配连接超时
    #[inline]
    pub fn is_connect_timeout(&self) -> bool {
        self.kind == ErrorKind::HttpError(HttpErrorKind::ConnectTimeout)
    }

    /// 是否为获取连接后的传输失败
    pub fn is_io_failure(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::HttpError(
                HttpErrorKind::ConnectError
                    | HttpErrorKind::ProxyError
                    | HttpErrorKind::UnknownHostError
                    | HttpErrorKind::SendError
                    | HttpErrorKind::ReceiveError
                    | HttpErrorKind::ConnectionClosed
                    | HttpErrorKind::LocalIoError
                    | HttpErrorKind::TimeoutError
                    | HttpErrorKind::SslError
                    | HttpErrorKind::UnknownError
            )
        )
    }

    /// 是否为协议错误
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::HttpError(
                HttpErrorKind::ProtocolError | HttpErrorKind::InvalidUrl | HttpErrorKind::InvalidHeader
            ) | ErrorKind::InvalidRedirect
                | ErrorKind::CircularRedirect
                | ErrorKind::NonRepeatableRequest
                | ErrorKind::UnreachableRoute
        )
    }

    /// 是否被中断
    #[inline]
    pub fn is_interrupted(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Interrupted | ErrorKind::HttpError(HttpErrorKind::Interrupted)
        )
    }

    /// 是否因重定向或鉴权次数超过上限而放弃
    #[inline]
    pub fn is_loop_limit_exceeded(&self) -> bool {
        matches!(self.kind, ErrorKind::TooManyRedirects | ErrorKind::AuthRetryLimitExceeded)
    }

    /// 获取底层错误
    #[inline]
    pub fn into_inner(self) -> AnyError {
        self.error
    }

    pub(super) fn interrupted() -> Self {
        Self::new_with_msg(ErrorKind::Interrupted, "Request execution aborted")
    }

    #[allow(dead_code)]
    fn assert() {
        assert_impl!(Send: Self);
        assert_impl!(Sync: Self);
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{:?}]", self.kind)?;
        if let Some(retried) = self.retried.as_ref() {
            write!(f, "[{}]", retried)?;
        }
        if let Some(host) = self.host.as_ref() {
            write!(f, "[{}]", host)?;
        }
        if let Some(remote_addr) = self.remote_addr.as_ref() {
            write!(f, "[{}]", remote_addr)?;
        }
        write!(f, " {}", self.error)
    }
}

impl StdError for Error {
    #[inline]
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.error.as_ref())
    }
}

impl From<HttpError> for Error {
    fn from(err: HttpError) -> Self {
        let kind = ErrorKind::HttpError(err.kind());
        let host = err.target_host().cloned();
        let remote_addr = err.target_remote_addr();
        Self {
            kind,
            error: AnyError::new(err),
            host,
            remote_addr,
            redirect_count: 0,
            retried: None,
        }
    }
}

impl From<HttpErrorKind> for ErrorKind {
    #[inline]
    fn from(kind: HttpErrorKind) -> Self {
        ErrorKind::HttpError(kind)
    }
}

impl From<IoError> for Error {
    #[inline]
    fn from(error: IoError) -> Self {
        HttpError::from(error).into()
    }
}

/// 请求执行结果
pub type ResponseResult<T> = result::Result<T, Error>;
