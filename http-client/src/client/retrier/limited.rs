use super::{RequestRetrier, RequestRetrierOptions, RetryDecision, RetryResult};
use courier_http::RequestParts;

const DEFAULT_RETRIES: usize = 2;

/// 受限重试器
///
/// 在其他重试器的基础上限制最大重试次数
#[derive(Clone, Debug)]
pub struct LimitedRetrier<R> {
    retrier: R,
    retries: usize,
}

impl<R> LimitedRetrier<R> {
    /// 创建受限重试器
    #[inline]
    pub fn new(retrier: R, retries: usize) -> Self {
        Self { retrier, retries }
    }

    /// 获取最大重试次数
    #[inline]
    pub fn retries(&self) -> usize {
        self.retries
    }
}

impl<R: Default> Default for LimitedRetrier<R> {
    #[inline]
    fn default() -> Self {
        Self::new(R::default(), DEFAULT_RETRIES)
    }
}

impl<R: RequestRetrier + Clone> RequestRetrier for LimitedRetrier<R> {
    #[inline]
    fn retry(&self, request: &RequestParts, opts: RequestRetrierOptions<'_>) -> RetryResult {
        match self.retrier.retry(request, opts).decision() {
            RetryDecision::RetryRequest if opts.retried().retried_total() >= self.retries => RetryDecision::DontRetry,
            decision => decision,
        }
        .into()
    }
}
