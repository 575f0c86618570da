use super::HttpHost;
use assert_impl::assert_impl;
use std::{
    error::Error as StdError,
    fmt,
    io::{Error as IoError, ErrorKind as IoErrorKind},
    net::SocketAddr,
    result,
};

/// 传输层错误类型
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// 协议错误，响应格式非法或不符合预期
    ProtocolError,

    /// 非法的 URL
    InvalidUrl,

    /// 非法的 HTTP 头
    InvalidHeader,

    /// 网络连接失败
    ConnectError,

    /// 建立连接或等待连接池分配连接超时
    ConnectTimeout,

    /// 代理连接失败
    ProxyError,

    /// 域名解析失败
    UnknownHostError,

    /// 发送失败
    SendError,

    /// 接受失败
    ReceiveError,

    /// 连接在响应到达前被关闭
    ConnectionClosed,

    /// 本地 IO 失败
    LocalIoError,

    /// 读写超时
    TimeoutError,

    /// SSL 错误
    SslError,

    /// 阻塞操作被中断
    Interrupted,

    /// 未知错误
    UnknownError,
}

/// 传输层错误
///
/// 由连接管理器和连接实现返回，可以额外携带目标主机和远端地址
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    error: Box<dyn StdError + Send + Sync>,
    host: Option<HttpHost>,
    remote_addr: Option<SocketAddr>,
}

impl Error {
    /// 创建传输层错误
    #[inline]
    pub fn new(kind: ErrorKind, err: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Error {
            kind,
            error: err.into(),
            host: None,
            remote_addr: None,
        }
    }

    /// 创建连接超时错误
    ///
    /// 错误信息格式为 `Connect to {host} ({addr}) timed out`，
    /// 如果提供了底层错误，则为 `Connect to {host} ({addr}) failed: {cause}`
    pub fn connect_timeout(
        host: Option<HttpHost>,
        remote_addr: Option<SocketAddr>,
        cause: Option<IoError>,
    ) -> Self {
        let mut message = "Connect to ".to_owned();
        match &host {
            Some(host) => message.push_str(&host.to_host_string()),
            None => message.push_str("remote host"),
        }
        if let Some(remote_addr) = &remote_addr {
            message.push_str(&format!(" ({})", remote_addr.ip()));
        }
        match &cause {
            Some(cause) => message.push_str(&format!(" failed: {}", cause)),
            None => message.push_str(" timed out"),
        }
        Error {
            kind: ErrorKind::ConnectTimeout,
            error: message.into(),
            host,
            remote_addr,
        }
    }

    /// 设置错误相关的目标主机
    #[inline]
    #[must_use]
    pub fn host(mut self, host: HttpHost) -> Self {
        self.host = Some(host);
        self
    }

    /// 设置错误相关的远端地址
    #[inline]
    #[must_use]
    pub fn remote_addr(mut self, remote_addr: SocketAddr) -> Self {
        self.remote_addr = Some(remote_addr);
        self
    }

    /// 获取错误类型
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// 获取错误相关的目标主机
    #[inline]
    pub fn target_host(&self) -> Option<&HttpHost> {
        self.host.as_ref()
    }

    /// 获取错误相关的远端地址
    #[inline]
    pub fn target_remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// 修改错误相关的目标主机
    #[inline]
    pub fn target_host_mut(&mut self) -> &mut Option<HttpHost> {
        &mut self.host
    }

    /// 获取底层错误
    #[inline]
    pub fn into_inner(self) -> Box<dyn StdError + Send + Sync> {
        self.error
    }

    #[allow(dead_code)]
    fn assert() {
        assert_impl!(Send: Self);
        assert_impl!(Sync: Self);
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{:?}] ", self.kind)?;
        self.error.fmt(f)
    }
}

impl StdError for Error {
    #[inline]
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.error.as_ref())
    }
}

impl From<IoError> for Error {
    fn from(err: IoError) -> Self {
        let kind = match err.kind() {
            IoErrorKind::TimedOut | IoErrorKind::WouldBlock => ErrorKind::TimeoutError,
            IoErrorKind::Interrupted => ErrorKind::Interrupted,
            IoErrorKind::ConnectionRefused => ErrorKind::ConnectError,
            IoErrorKind::ConnectionReset
            | IoErrorKind::ConnectionAborted
            | IoErrorKind::UnexpectedEof => ErrorKind::ConnectionClosed,
            IoErrorKind::BrokenPipe => ErrorKind::SendError,
            IoErrorKind::InvalidData => ErrorKind::ProtocolError,
            _ => ErrorKind::LocalIoError,
        };
        Self::new(kind, err)
    }
}

/// 传输层结果
pub type Result<T> = result::Result<T, Error>;
