use super::{
    AbortHandle, Backoff, BackoffOptions, ConnectionHandle, ExecutionContext, Idempotent, LimitedRetrier,
    RequestDirector, RequestRetrier, RequestRetrierOptions, ResponseResult, RetriedStatsInfo, RetryDecision,
    DefaultRetrier, NO_BACKOFF,
};
use courier_http::{Request, Response, Route};
use log::{debug, info};
use std::thread::sleep;

/// 传输失败时自动重试的请求执行器
///
/// 包装 [`RequestDirector`]，执行失败后由 [`RequestRetrier`] 决定是否重新执行，
/// 重新执行前等待 [`Backoff`] 给出的时长。只有请求体可以重复读取的请求才能被重试
#[derive(Debug)]
pub struct RetryingDirector {
    director: RequestDirector,
    retrier: Box<dyn RequestRetrier>,
    backoff: Box<dyn Backoff>,
    idempotent: Idempotent,
}

impl RetryingDirector {
    /// 使用默认重试器包装请求执行器
    ///
    /// 默认最多重试两次，不进行退避
    #[inline]
    pub fn new(director: RequestDirector) -> Self {
        Self {
            director,
            retrier: Box::new(LimitedRetrier::<DefaultRetrier>::default()),
            backoff: Box::new(NO_BACKOFF),
            idempotent: Idempotent::default(),
        }
    }

    /// 设置重试器
    #[inline]
    #[must_use]
    pub fn with_retrier(mut self, retrier: impl RequestRetrier + 'static) -> Self {
        self.retrier = Box::new(retrier);
        self
    }

    /// 设置退避时长
    #[inline]
    #[must_use]
    pub fn with_backoff(mut self, backoff: impl Backoff + 'static) -> Self {
        self.backoff = Box::new(backoff);
        self
    }

    /// 设置请求是否幂等
    #[inline]
    #[must_use]
    pub fn with_idempotent(mut self, idempotent: Idempotent) -> Self {
        self.idempotent = idempotent;
        self
    }

    /// 获取被包装的请求执行器
    #[inline]
    pub fn director(&self) -> &RequestDirector {
        &self.director
    }

    /// 获取中断句柄
    #[inline]
    pub fn abort_handle(&self) -> AbortHandle {
        self.director.abort_handle()
    }

    /// 上一次返回的响应所依赖的连接
    #[inline]
    pub fn connection(&self) -> Option<&ConnectionHandle> {
        self.director.connection()
    }

    /// 执行请求，失败时按照重试器的决定重新执行
    ///
    /// 最终失败的错误中携带重试统计信息
    pub fn execute(&mut self, request: Request, route: &Route, ctx: &mut ExecutionContext) -> ResponseResult<Response> {
        let abort_handle = self.director.abort_handle();
        let mut retried = RetriedStatsInfo::default();
        let mut request = request;
        loop {
            let backup = request.try_clone();
            let err = match self.director.execute(request, route, ctx) {
                Ok(response) => return Ok(response),
                Err(err) => err,
            };
            let next = match backup {
                Some(next) => next,
                None => {
                    debug!("Request body is not repeatable, giving up: {}", err);
                    return Err(err.retried(&retried));
                }
            };
            let decision = self
                .retrier
                .retry(next.parts(), RequestRetrierOptions::new(self.idempotent, &err, &retried))
                .decision();
            if decision != RetryDecision::RetryRequest || abort_handle.is_aborted() {
                return Err(err.retried(&retried));
            }

            let delay = self
                .backoff
                .time(next.parts(), BackoffOptions::new(&err, &retried))
                .duration();
            if err.is_io_failure() {
                retried.abandon_connection();
            }
            retried.increase();
            info!(
                "Retrying request to {} in {:?} ({}): {}",
                next.url(),
                delay,
                retried,
                err
            );
            if !delay.is_zero() {
                sleep(delay);
            }
            request = next;
        }
    }
}
