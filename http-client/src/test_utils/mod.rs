use super::client::RouteTracker;
use courier_http::{
    header::CONTENT_LENGTH, Cancellable, ConnectionManager, ConnectionRequest, Error as HttpError,
    ErrorKind as HttpErrorKind, HeaderMap, HeaderValue, ManagedConnection, OpenOptions, RequestBody, RequestParts,
    ResponseParts, Result as HttpResult, Route, StatusCode, Version,
};
use std::{
    collections::VecDeque,
    fmt,
    io::{Cursor, Read, Result as IoResult},
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::{
        atomic::{AtomicUsize, Ordering::SeqCst},
        Arc, Condvar, Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};

const BASE_PORT: u16 = 10000;

pub(crate) type ScriptedResponse = (ResponseParts, Vec<u8>);

type Script = Box<dyn FnMut(&RecordedRequest) -> Vec<ScriptedResponse> + Send>;

/// 构造模拟服务器的响应，非中间响应自动补充 `Content-Length`
pub(crate) fn response(status_code: StatusCode, headers: &[(&'static str, &'static str)], body: &str) -> ScriptedResponse {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        map.append(*name, HeaderValue::from_static(*value));
    }
    if !status_code.is_informational() && !map.contains_key(CONTENT_LENGTH) {
        map.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
    }
    (ResponseParts::new(status_code, Version::HTTP_11, map), body.as_bytes().to_vec())
}

/// 模拟服务器收到的请求
#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub(crate) conn_id: usize,
    pub(crate) parts: RequestParts,
    pub(crate) body: Vec<u8>,
}

impl RecordedRequest {
    pub(crate) fn header(&self, name: &str) -> Option<&str> {
        self.parts.header(name).and_then(|value| value.to_str().ok())
    }
}

/// 连接被归还时的状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecordedRelease {
    pub(crate) conn_id: usize,
    pub(crate) reusable: bool,
    pub(crate) open: bool,
    pub(crate) valid_for: Option<Duration>,
}

#[derive(Default)]
struct FakeLog {
    leases: Vec<Route>,
    opens: Vec<(usize, Route)>,
    requests: Vec<RecordedRequest>,
    releases: Vec<RecordedRelease>,
}

struct Shared {
    script: Mutex<Script>,
    log: Mutex<FakeLog>,
    idle: Mutex<Vec<Box<dyn ManagedConnection>>>,
    next_id: AtomicUsize,
    block_leases: bool,
    refuse_connect: bool,
    stall_receive: bool,
}

/// 由脚本驱动的内存连接管理器
///
/// 记录每一次连接租用，连接打开，请求发送和连接归还。
/// 被标记为可复用且仍然打开的连接会被放入空闲池，供同一路由的下一次租用使用
pub(crate) struct FakeConnectionManager {
    shared: Arc<Shared>,
}

impl FakeConnectionManager {
    pub(crate) fn new(script: impl FnMut(&RecordedRequest) -> Vec<ScriptedResponse> + Send + 'static) -> Arc<Self> {
        Self::with_options(Box::new(script), false, false, false)
    }

    /// 租用连接总是阻塞，直到被取消
    pub(crate) fn blocking() -> Arc<Self> {
        Self::with_options(Box::new(|_: &RecordedRequest| Vec::new()), true, false, false)
    }

    /// 打开连接总是超时
    pub(crate) fn unreachable() -> Arc<Self> {
        Self::with_options(Box::new(|_: &RecordedRequest| Vec::new()), false, true, false)
    }

    /// 服务器从不响应，读取响应头总是阻塞，直到连接被取消
    pub(crate) fn stalling() -> Arc<Self> {
        Self::with_options(Box::new(|_: &RecordedRequest| Vec::new()), false, false, true)
    }

    fn with_options(script: Script, block_leases: bool, refuse_connect: bool, stall_receive: bool) -> Arc<Self> {
        Arc::new(Self {
            shared: Arc::new(Shared {
                script: Mutex::new(script),
                log: Default::default(),
                idle: Default::default(),
                next_id: AtomicUsize::new(0),
                block_leases,
                refuse_connect,
                stall_receive,
            }),
        })
    }

    pub(crate) fn leases(&self) -> Vec<Route> {
        lock(&self.shared.log).leases.to_owned()
    }

    pub(crate) fn opens(&self) -> Vec<(usize, Route)> {
        lock(&self.shared.log).opens.to_owned()
    }

    pub(crate) fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.shared.log).requests.to_owned()
    }

    pub(crate) fn releases(&self) -> Vec<RecordedRelease> {
        lock(&self.shared.log).releases.to_owned()
    }

    pub(crate) fn idle_connections(&self) -> usize {
        lock(&self.shared.idle).len()
    }

    /// 每次租用都恰好归还一次
    pub(crate) fn assert_no_leak(&self) {
        let log = lock(&self.shared.log);
        assert_eq!(log.leases.len(), log.releases.len(), "leases: {:?}", log.leases);
    }
}

impl fmt::Debug for FakeConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeConnectionManager")
            .field("block_leases", &self.shared.block_leases)
            .field("refuse_connect", &self.shared.refuse_connect)
            .field("stall_receive", &self.shared.stall_receive)
            .finish()
    }
}

impl ConnectionManager for FakeConnectionManager {
    fn request_connection(&self, route: &Route) -> Arc<dyn ConnectionRequest> {
        lock(&self.shared.log).leases.push(route.to_owned());
        Arc::new(FakeConnectionRequest {
            shared: self.shared.to_owned(),
            route: route.to_owned(),
            aborted: Mutex::new(false),
            condvar: Condvar::new(),
        })
    }

    fn release_connection(&self, conn: Box<dyn ManagedConnection>, valid_for: Option<Duration>) {
        let conn_id = conn
            .remote_addr()
            .map_or(0, |addr| usize::from(addr.port() - BASE_PORT));
        lock(&self.shared.log).releases.push(RecordedRelease {
            conn_id,
            reusable: conn.is_marked_reusable(),
            open: conn.is_open(),
            valid_for,
        });
        if conn.is_marked_reusable() && conn.is_open() {
            lock(&self.shared.idle).push(conn);
        }
    }
}

struct FakeConnectionRequest {
    shared: Arc<Shared>,
    route: Route,
    aborted: Mutex<bool>,
    condvar: Condvar,
}

impl fmt::Debug for FakeConnectionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeConnectionRequest").field("route", &self.route).finish()
    }
}

impl ConnectionRequest for FakeConnectionRequest {
    fn get(&self, _timeout: Option<Duration>) -> HttpResult<Box<dyn ManagedConnection>> {
        let mut aborted = lock(&self.aborted);
        if self.shared.block_leases {
            while !*aborted {
                aborted = self.condvar.wait(aborted).unwrap_or_else(PoisonError::into_inner);
            }
        }
        if *aborted {
            return Err(HttpError::new(HttpErrorKind::Interrupted, "Connection request aborted"));
        }
        drop(aborted);

        let mut idle = lock(&self.shared.idle);
        if let Some(pos) = idle.iter().position(|conn| conn.route() == Some(&self.route)) {
            return Ok(idle.remove(pos));
        }
        drop(idle);
        let id = self.shared.next_id.fetch_add(1, SeqCst) + 1;
        Ok(Box::new(FakeConnection::new(id, self.shared.to_owned())))
    }

    fn abort(&self) {
        *lock(&self.aborted) = true;
        self.condvar.notify_all();
    }
}

#[derive(Debug, Default)]
struct FakeCanceller {
    cancelled: Mutex<bool>,
    condvar: Condvar,
}

impl FakeCanceller {
    fn wait_cancelled(&self) {
        let mut cancelled = lock(&self.cancelled);
        while !*cancelled {
            cancelled = self.condvar.wait(cancelled).unwrap_or_else(PoisonError::into_inner);
        }
    }
}

impl Cancellable for FakeCanceller {
    fn cancel(&self) {
        *lock(&self.cancelled) = true;
        self.condvar.notify_all();
    }
}

struct FakeConnection {
    id: usize,
    shared: Arc<Shared>,
    tracker: Option<RouteTracker>,
    route: Option<Route>,
    reusable: bool,
    awaiting: bool,
    responses: VecDeque<ScriptedResponse>,
    body: Cursor<Vec<u8>>,
    canceller: Arc<FakeCanceller>,
}

impl FakeConnection {
    fn new(id: usize, shared: Arc<Shared>) -> Self {
        Self {
            id,
            shared,
            tracker: None,
            route: None,
            reusable: false,
            awaiting: false,
            responses: VecDeque::new(),
            body: Cursor::default(),
            canceller: Default::default(),
        }
    }

    fn update_tracker(&mut self, f: impl FnOnce(&mut RouteTracker)) -> HttpResult<()> {
        match self.tracker.as_mut() {
            Some(tracker) => {
                f(tracker);
                self.route = tracker.to_route();
                Ok(())
            }
            None => Err(not_open()),
        }
    }
}

impl fmt::Debug for FakeConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeConnection")
            .field("id", &self.id)
            .field("route", &self.route)
            .field("reusable", &self.reusable)
            .finish()
    }
}

impl ManagedConnection for FakeConnection {
    fn is_open(&self) -> bool {
        self.tracker.is_some()
    }

    fn is_stale(&self) -> bool {
        false
    }

    fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    fn remote_addr(&self) -> Option<SocketAddr> {
        Some(SocketAddr::new(
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            BASE_PORT + u16::try_from(self.id).unwrap_or(0),
        ))
    }

    fn open(&mut self, route: &Route, _opts: &OpenOptions) -> HttpResult<()> {
        let first_hop = route.proxy_host().unwrap_or_else(|| route.target_host());
        if self.shared.refuse_connect {
            return Err(HttpError::connect_timeout(
                Some(first_hop.to_owned()),
                self.remote_addr(),
                None,
            ));
        }
        lock(&self.shared.log).opens.push((self.id, route.to_owned()));
        let mut tracker = RouteTracker::for_route(route);
        match route.proxy_host() {
            Some(proxy) => tracker.connect_proxy(proxy.to_owned(), route.is_secure() && !route.is_tunnelled()),
            None => tracker.connect_target(route.is_secure()),
        }
        self.route = tracker.to_route();
        self.tracker = Some(tracker);
        Ok(())
    }

    fn tunnel_target(&mut self, secure: bool) -> HttpResult<()> {
        self.update_tracker(|tracker| tracker.tunnel_target(secure))
    }

    fn tunnel_proxy(&mut self, _next: &courier_http::HttpHost, _secure: bool) -> HttpResult<()> {
        Err(HttpError::new(HttpErrorKind::ProtocolError, "Proxy chains are not supported"))
    }

    fn layer_protocol(&mut self, secure: bool) -> HttpResult<()> {
        self.update_tracker(|tracker| tracker.layer_protocol(secure))
    }

    fn set_read_timeout(&mut self, _timeout: Option<Duration>) -> HttpResult<()> {
        Ok(())
    }

    fn send_request_head(&mut self, parts: &RequestParts) -> HttpResult<()> {
        if !self.is_open() {
            return Err(not_open());
        }
        lock(&self.shared.log).requests.push(RecordedRequest {
            conn_id: self.id,
            parts: parts.to_owned(),
            body: Vec::new(),
        });
        self.awaiting = true;
        Ok(())
    }

    fn send_request_body(&mut self, body: &mut RequestBody) -> HttpResult<()> {
        let mut buf = Vec::new();
        body.read_to_end(&mut buf)?;
        let mut log = lock(&self.shared.log);
        if let Some(request) = log.requests.iter_mut().rev().find(|request| request.conn_id == self.id) {
            request.body.extend_from_slice(&buf);
        }
        Ok(())
    }

    fn flush(&mut self) -> HttpResult<()> {
        if !self.awaiting {
            return Ok(());
        }
        let request = lock(&self.shared.log)
            .requests
            .iter()
            .rev()
            .find(|request| request.conn_id == self.id)
            .cloned();
        if let Some(request) = request {
            let responses = {
                let mut script = lock(&self.shared.script);
                (*script)(&request)
            };
            if !responses.is_empty() {
                self.awaiting = false;
                self.responses.extend(responses);
            }
        }
        Ok(())
    }

    fn is_response_available(&mut self, _timeout: Duration) -> HttpResult<bool> {
        Ok(!self.responses.is_empty())
    }

    fn receive_response_head(&mut self) -> HttpResult<ResponseParts> {
        match self.responses.pop_front() {
            Some((parts, body)) => {
                self.body = Cursor::new(body);
                Ok(parts)
            }
            None if self.shared.stall_receive => {
                self.canceller.wait_cancelled();
                Err(HttpError::new(HttpErrorKind::Interrupted, "Receiving response aborted"))
            }
            None => Err(HttpError::new(
                HttpErrorKind::ConnectionClosed,
                "Connection closed before a response was received",
            )),
        }
    }

    fn read_response_body(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        self.body.read(buf)
    }

    fn mark_reusable(&mut self) {
        self.reusable = true;
    }

    fn unmark_reusable(&mut self) {
        self.reusable = false;
    }

    fn is_marked_reusable(&self) -> bool {
        self.reusable
    }

    fn abort_handle(&self) -> Arc<dyn Cancellable> {
        self.canceller.to_owned()
    }

    fn close(&mut self) -> HttpResult<()> {
        self.tracker = None;
        self.route = None;
        self.awaiting = false;
        self.responses.clear();
        self.body = Cursor::default();
        Ok(())
    }

    fn shutdown(&mut self) -> HttpResult<()> {
        self.close()
    }
}

fn not_open() -> HttpError {
    HttpError::new(HttpErrorKind::SendError, "Connection is not open")
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
