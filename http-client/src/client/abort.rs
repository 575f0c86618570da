use super::{ResponseError, ResponseResult};
use courier_http::{Cancellable, ConnectionRequest};
use log::debug;
use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering::SeqCst},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

/// 请求中断句柄
///
/// 可以被克隆并发送到其他线程。调用 [`AbortHandle::abort`] 后，
/// 正在阻塞的连接分配或网络 IO 会被取消，请求执行以 `Interrupted` 错误结束，
/// 之后的请求执行也会立即失败
#[derive(Clone, Default)]
pub struct AbortHandle {
    inner: Arc<AbortHandleInner>,
}

#[derive(Default)]
struct AbortHandleInner {
    aborted: AtomicBool,
    canceller: Mutex<Option<Arc<dyn Cancellable>>>,
}

impl AbortHandle {
    /// 中断请求执行
    pub fn abort(&self) {
        self.inner.aborted.store(true, SeqCst);
        let canceller = self.lock().take();
        if let Some(canceller) = canceller {
            debug!("Cancelling blocking operation: {:?}", canceller);
            canceller.cancel();
        }
    }

    /// 是否已经中断
    #[inline]
    pub fn is_aborted(&self) -> bool {
        self.inner.aborted.load(SeqCst)
    }

    /// 设置当前阻塞操作的取消器
    ///
    /// 如果已经中断，则直接返回错误，不会设置取消器
    pub(super) fn set_canceller(&self, canceller: Arc<dyn Cancellable>) -> ResponseResult<()> {
        let mut guard = self.lock();
        if self.is_aborted() {
            return Err(ResponseError::interrupted());
        }
        *guard = Some(canceller);
        Ok(())
    }

    pub(super) fn set_connection_request(&self, request: Arc<dyn ConnectionRequest>) -> ResponseResult<()> {
        self.set_canceller(Arc::new(ConnectionRequestCanceller(request)))
    }

    pub(super) fn clear_canceller(&self) {
        self.lock().take();
    }

    fn lock(&self) -> MutexGuard<'_, Option<Arc<dyn Cancellable>>> {
        self.inner.canceller.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for AbortHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbortHandle")
            .field("aborted", &self.is_aborted())
            .finish()
    }
}

#[derive(Debug)]
struct ConnectionRequestCanceller(Arc<dyn ConnectionRequest>);

impl Cancellable for ConnectionRequestCanceller {
    #[inline]
    fn cancel(&self) {
        self.0.abort();
    }
}
