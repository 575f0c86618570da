use super::{Backoff, BackoffOptions, GotBackoffDuration};
use courier_http::RequestParts;
use std::time::Duration;

/// 限制范围的退避
///
/// 将其他退避的时长限制在最小值和最大值之间
#[derive(Debug, Clone)]
pub struct LimitedBackoff<P> {
    base_backoff: P,
    min_backoff: Duration,
    max_backoff: Duration,
}

impl<P> LimitedBackoff<P> {
    /// 创建限制范围的退避
    #[inline]
    pub const fn new(base_backoff: P, min_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            base_backoff,
            min_backoff,
            max_backoff,
        }
    }

    /// 获取基础退避
    #[inline]
    pub const fn base_backoff(&self) -> &P {
        &self.base_backoff
    }

    /// 获取最小退避时长
    #[inline]
    pub const fn min_backoff(&self) -> Duration {
        self.min_backoff
    }

    /// 获取最大退避时长
    #[inline]
    pub const fn max_backoff(&self) -> Duration {
        self.max_backoff
    }
}

impl<P: Backoff + Clone> Backoff for LimitedBackoff<P> {
    #[inline]
    fn time(&self, request: &RequestParts, opts: BackoffOptions<'_>) -> GotBackoffDuration {
        self.base_backoff
            .time(request, opts)
            .duration()
            .max(self.min_backoff)
            .min(self.max_backoff)
            .into()
    }
}

impl<P: Default> Default for LimitedBackoff<P> {
    #[inline]
    fn default() -> Self {
        LimitedBackoff::new(P::default(), Duration::from_secs(0), Duration::from_secs(300))
    }
}
