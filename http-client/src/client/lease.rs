use courier_http::{ConnectionManager, ManagedConnection, Route};
use log::{debug, warn};
use std::{
    fmt,
    io::{Error as IoError, ErrorKind as IoErrorKind, Read, Result as IoResult},
    net::SocketAddr,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

/// 请求执行期间独占的连接租约
///
/// 租约被丢弃时如果仍然持有连接，则立即关闭连接并以不可复用的状态归还给连接管理器。
///
/// 连接只会在 [`Lease::release`]，[`Lease::abort`]，[`Lease::into_handle`] 和 [`Drop`] 中被取出，
/// 这些方法都会消耗租约，因此在租约存活期间 `conn` 总是 [`Some`]
pub(super) struct Lease {
    manager: Arc<dyn ConnectionManager>,
    conn: Option<Box<dyn ManagedConnection>>,
    route: Route,
    reused: bool,
}

impl Lease {
    pub(super) fn new(manager: Arc<dyn ConnectionManager>, conn: Box<dyn ManagedConnection>, route: Route) -> Self {
        let reused = conn.is_open();
        Self {
            manager,
            conn: Some(conn),
            route,
            reused,
        }
    }

    pub(super) fn conn(&self) -> &dyn ManagedConnection {
        match self.conn.as_deref() {
            Some(conn) => conn,
            None => unreachable!("connection is only taken by methods consuming the lease"),
        }
    }

    pub(super) fn conn_mut(&mut self) -> &mut dyn ManagedConnection {
        match self.conn.as_deref_mut() {
            Some(conn) => conn,
            None => unreachable!("connection is only taken by methods consuming the lease"),
        }
    }

    /// 租约对应的路由
    pub(super) fn route(&self) -> &Route {
        &self.route
    }

    /// 分配的连接在分配时是否已经打开
    pub(super) fn is_reused(&self) -> bool {
        self.reused
    }

    /// 按照连接上的复用标记归还连接
    pub(super) fn release(mut self, valid_for: Option<Duration>) {
        if let Some(conn) = self.conn.take() {
            release_connection(self.manager.as_ref(), conn, valid_for);
        }
    }

    /// 关闭连接并归还
    pub(super) fn abort(mut self) {
        if let Some(conn) = self.conn.take() {
            abort_connection(self.manager.as_ref(), conn);
        }
    }

    /// 将连接的所有权转交给响应体
    pub(super) fn into_handle(mut self, valid_for: Option<Duration>) -> ConnectionHandle {
        let conn = self.conn.take();
        ConnectionHandle {
            inner: Arc::new(Mutex::new(HandleInner {
                manager: self.manager.to_owned(),
                remote_addr: conn.as_ref().and_then(|conn| conn.remote_addr()),
                route: self.route.to_owned(),
                conn,
                valid_for,
                body_consumed: false,
            })),
        }
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            debug!("Connection lease for {} dropped while still holding the connection", self.route);
            abort_connection(self.manager.as_ref(), conn);
        }
    }
}

impl fmt::Debug for Lease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease")
            .field("route", &self.route)
            .field("conn", &self.conn)
            .field("reused", &self.reused)
            .finish()
    }
}

fn release_connection(manager: &dyn ConnectionManager, conn: Box<dyn ManagedConnection>, valid_for: Option<Duration>) {
    debug!(
        "Releasing connection {:?} (reusable: {}, valid for: {:?})",
        conn.remote_addr(),
        conn.is_marked_reusable(),
        valid_for
    );
    manager.release_connection(conn, valid_for);
}

fn abort_connection(manager: &dyn ConnectionManager, mut conn: Box<dyn ManagedConnection>) {
    if let Err(err) = conn.shutdown() {
        warn!("Failed to shut down connection {:?}: {}", conn.remote_addr(), err);
    }
    conn.unmark_reusable();
    release_connection(manager, conn, None);
}

/// 响应持有的连接句柄
///
/// 最终响应的响应体需要从连接上读取时，连接的所有权从请求执行器转交给响应体。
/// 响应体读取完毕后连接自动归还，响应体在读取完毕前被丢弃则连接被关闭。
/// 无论通过何种方式，连接只会被归还给连接管理器一次
#[derive(Clone)]
pub struct ConnectionHandle {
    inner: Arc<Mutex<HandleInner>>,
}

struct HandleInner {
    manager: Arc<dyn ConnectionManager>,
    conn: Option<Box<dyn ManagedConnection>>,
    route: Route,
    remote_addr: Option<SocketAddr>,
    valid_for: Option<Duration>,
    body_consumed: bool,
}

impl ConnectionHandle {
    /// 连接的路由
    pub fn route(&self) -> Route {
        self.lock().route.to_owned()
    }

    /// 连接的远端地址
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.lock().remote_addr
    }

    /// 连接是否已经被归还
    pub fn is_released(&self) -> bool {
        self.lock().conn.is_none()
    }

    /// 访问尚未归还的连接
    pub fn with_connection<T>(&self, f: impl FnOnce(&mut dyn ManagedConnection) -> T) -> Option<T> {
        let mut inner = self.lock();
        match inner.conn.as_mut() {
            Some(conn) => Some(f(conn.as_mut())),
            None => None,
        }
    }

    /// 归还连接
    ///
    /// 响应体尚未读取完毕时，连接不能被复用，将被关闭后归还
    pub fn release(&self) {
        let mut inner = self.lock();
        if let Some(conn) = inner.conn.take() {
            if inner.body_consumed {
                release_connection(inner.manager.as_ref(), conn, inner.valid_for);
            } else {
                abort_connection(inner.manager.as_ref(), conn);
            }
        }
    }

    /// 关闭连接并归还
    pub fn abort(&self) {
        let mut inner = self.lock();
        if let Some(conn) = inner.conn.take() {
            abort_connection(inner.manager.as_ref(), conn);
        }
    }

    pub(super) fn into_body_reader(self) -> ConnectionBodyReader {
        ConnectionBodyReader { handle: self, eof: false }
    }

    fn lock(&self) -> MutexGuard<'_, HandleInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("ConnectionHandle")
            .field("route", &inner.route)
            .field("remote_addr", &inner.remote_addr)
            .field("released", &inner.conn.is_none())
            .field("body_consumed", &inner.body_consumed)
            .finish()
    }
}

/// 直接从连接上读取的响应体
///
/// 读取到末尾时归还连接，读取失败或提前丢弃时关闭连接
pub(super) struct ConnectionBodyReader {
    handle: ConnectionHandle,
    eof: bool,
}

impl Read for ConnectionBodyReader {
    fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        if self.eof || buf.is_empty() {
            return Ok(0);
        }
        let result = {
            let mut inner = self.handle.lock();
            match inner.conn.as_deref_mut() {
                Some(conn) => conn.read_response_body(buf),
                None => Err(IoError::new(
                    IoErrorKind::NotConnected,
                    "Connection has been released before the response body was consumed",
                )),
            }
        };
        match result {
            Ok(0) => {
                self.eof = true;
                self.handle.lock().body_consumed = true;
                self.handle.release();
                Ok(0)
            }
            Ok(have_read) => Ok(have_read),
            Err(err) => {
                self.eof = true;
                self.handle.abort();
                Err(err)
            }
        }
    }
}

impl Drop for ConnectionBodyReader {
    fn drop(&mut self) {
        if !self.eof {
            self.handle.abort();
        }
    }
}

impl fmt::Debug for ConnectionBodyReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionBodyReader")
            .field("handle", &self.handle)
            .field("eof", &self.eof)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FakeConnectionManager, RecordedRelease, RecordedRequest};
    use courier_http::{HttpHost, OpenOptions};
    use std::{error::Error, result::Result};

    fn lease(manager: &Arc<FakeConnectionManager>, route: &Route) -> Result<Lease, Box<dyn Error>> {
        let conn = manager.request_connection(route).get(None)?;
        Ok(Lease::new(manager.to_owned(), conn, route.to_owned()))
    }

    #[test]
    fn test_lease_returns_connection_once() -> Result<(), Box<dyn Error>> {
        env_logger::builder().is_test(true).try_init().ok();

        let manager = FakeConnectionManager::new(|_: &RecordedRequest| Vec::new());
        let route = Route::direct(HttpHost::new("http", "example.com", None), false);

        let mut first = lease(&manager, &route)?;
        assert!(!first.is_reused());
        assert!(!first.conn().is_open());
        first.conn_mut().open(&route, &OpenOptions::default())?;
        first.conn_mut().mark_reusable();
        first.release(Some(Duration::from_secs(5)));
        assert_eq!(manager.idle_connections(), 1);

        let second = lease(&manager, &route)?;
        assert!(second.is_reused());
        assert_eq!(second.route(), &route);
        drop(second);
        assert_eq!(manager.idle_connections(), 0);

        let handle = lease(&manager, &route)?.into_handle(None);
        assert!(!handle.is_released());
        handle.release();
        handle.release();
        handle.abort();
        assert!(handle.is_released());
        assert_eq!(handle.with_connection(|conn| conn.is_open()), None);

        assert_eq!(
            manager.releases(),
            vec![
                RecordedRelease {
                    conn_id: 1,
                    reusable: true,
                    open: true,
                    valid_for: Some(Duration::from_secs(5)),
                },
                RecordedRelease {
                    conn_id: 1,
                    reusable: false,
                    open: false,
                    valid_for: None,
                },
                RecordedRelease {
                    conn_id: 2,
                    reusable: false,
                    open: false,
                    valid_for: None,
                },
            ]
        );
        manager.assert_no_leak();
        Ok(())
    }
}
