use super::{Backoff, BackoffOptions, GotBackoffDuration};
use courier_http::RequestParts;
use std::time::Duration;

/// 指数退避
///
/// 退避时长为基础时长乘以 2 的已重试次数次方
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExponentialBackoff {
    base_delay: Duration,
}

impl ExponentialBackoff {
    /// 创建指数退避
    #[inline]
    pub const fn new(base_delay: Duration) -> Self {
        Self { base_delay }
    }

    /// 获取基础退避时长
    #[inline]
    pub const fn base_delay(&self) -> Duration {
        self.base_delay
    }
}

impl Backoff for ExponentialBackoff {
    fn time(&self, _request: &RequestParts, opts: BackoffOptions<'_>) -> GotBackoffDuration {
        let exponent = u32::try_from(opts.retried().retried_total()).unwrap_or(u32::MAX);
        let factor = 2u32.checked_pow(exponent).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(Duration::MAX)
            .into()
    }
}

impl Default for ExponentialBackoff {
    #[inline]
    fn default() -> Self {
        ExponentialBackoff::new(Duration::from_millis(100))
    }
}
