use super::{HttpHost, RequestBody, RequestParts, ResponseParts, Result, Route};
use auto_impl::auto_impl;
use std::{
    fmt::Debug,
    io::Result as IoResult,
    net::SocketAddr,
    sync::Arc,
    time::Duration,
};

/// 可取消的阻塞操作
///
/// 取消操作可以在任意线程上调用，被阻塞的线程应尽快返回错误
#[auto_impl(&, Box, Arc)]
pub trait Cancellable: Debug + Send + Sync {
    /// 取消阻塞操作
    fn cancel(&self);
}

/// 建立连接选项
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenOptions {
    connect_timeout: Option<Duration>,
}

impl OpenOptions {
    /// 创建建立连接选项
    #[inline]
    pub fn new(connect_timeout: Option<Duration>) -> Self {
        Self { connect_timeout }
    }

    /// 获取连接超时时长
    #[inline]
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }
}

/// 受管理的连接
///
/// 由连接管理器分配，在被归还之前由持有者独占使用。
/// 连接只负责传输 HTTP 消息，不负责重定向，鉴权等任何流程控制
pub trait ManagedConnection: Debug + Send {
    /// 连接是否已经打开
    fn is_open(&self) -> bool;

    /// 连接是否已经失效
    ///
    /// 对端可能已经关闭了空闲的连接
    fn is_stale(&self) -> bool;

    /// 连接当前打开的路由
    ///
    /// 连接未打开时返回 [`None`]
    fn route(&self) -> Option<&Route>;

    /// 远端套接字地址
    fn remote_addr(&self) -> Option<SocketAddr>;

    /// 打开连接到路由的第一跳
    ///
    /// 超时必须返回 [`super::ErrorKind::ConnectTimeout`] 错误
    fn open(&mut self, route: &Route, opts: &OpenOptions) -> Result<()>;

    /// 通知连接已经通过代理建立了到目标主机的隧道
    fn tunnel_target(&mut self, secure: bool) -> Result<()>;

    /// 通知连接已经通过代理建立了到下一个代理的隧道
    fn tunnel_proxy(&mut self, next: &HttpHost, secure: bool) -> Result<()>;

    /// 在已经建立的隧道上叠加协议
    fn layer_protocol(&mut self, secure: bool) -> Result<()>;

    /// 设置读取超时时长
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()>;

    /// 发送请求行和 HTTP Headers
    fn send_request_head(&mut self, parts: &RequestParts) -> Result<()>;

    /// 发送请求体
    fn send_request_body(&mut self, body: &mut RequestBody) -> Result<()>;

    /// 刷新发送缓冲区
    fn flush(&mut self) -> Result<()>;

    /// 在指定时长内是否有响应可以读取
    fn is_response_available(&mut self, timeout: Duration) -> Result<bool>;

    /// 接受状态行和 HTTP Headers
    fn receive_response_head(&mut self) -> Result<ResponseParts>;

    /// 读取响应体
    ///
    /// 返回 `0` 表示响应体已经读取完毕
    fn read_response_body(&mut self, buf: &mut [u8]) -> IoResult<usize>;

    /// 标记连接可以被复用
    fn mark_reusable(&mut self);

    /// 标记连接不能被复用
    fn unmark_reusable(&mut self);

    /// 连接是否被标记为可以复用
    fn is_marked_reusable(&self) -> bool;

    /// 获取用于中断阻塞 IO 的句柄
    fn abort_handle(&self) -> Arc<dyn Cancellable>;

    /// 正常关闭连接
    fn close(&mut self) -> Result<()>;

    /// 立即关闭连接，不等待未完成的数据
    fn shutdown(&mut self) -> Result<()>;
}

/// 等待中的连接请求
#[auto_impl(&, Box, Arc)]
pub trait ConnectionRequest: Debug + Send + Sync {
    /// 阻塞等待连接管理器分配连接
    ///
    /// 超时必须返回 [`super::ErrorKind::ConnectTimeout`] 错误，
    /// 被取消则返回 [`super::ErrorKind::Interrupted`] 错误
    fn get(&self, timeout: Option<Duration>) -> Result<Box<dyn ManagedConnection>>;

    /// 取消等待
    fn abort(&self);
}

/// 连接管理器
///
/// 按照路由分配连接，并回收使用完毕的连接。
/// 被回收的连接如果被标记为可复用，则可以在有效期内分配给同一路由的其他请求
#[auto_impl(&, Box, Arc)]
pub trait ConnectionManager: Debug + Send + Sync {
    /// 请求分配连接
    fn request_connection(&self, route: &Route) -> Arc<dyn ConnectionRequest>;

    /// 回收连接
    ///
    /// `valid_for` 为连接可以保持空闲的时长，[`None`] 表示不限
    fn release_connection(&self, conn: Box<dyn ManagedConnection>, valid_for: Option<Duration>);
}
