use super::{Backoff, BackoffOptions, GotBackoffDuration};
use courier_http::RequestParts;
use std::time::Duration;

/// 立即重试，不等待
pub const NO_BACKOFF: FixedBackoff = FixedBackoff::new(Duration::ZERO);

/// 每次重试前等待相同的时长
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FixedBackoff {
    delay: Duration,
}

impl FixedBackoff {
    /// 创建固定时长的退避
    #[inline]
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// 获取退避时长
    #[inline]
    pub const fn delay(&self) -> Duration {
        self.delay
    }
}

impl Backoff for FixedBackoff {
    #[inline]
    fn time(&self, _request: &RequestParts, _opts: BackoffOptions<'_>) -> GotBackoffDuration {
        self.delay.into()
    }
}

impl Default for FixedBackoff {
    #[inline]
    fn default() -> Self {
        NO_BACKOFF
    }
}
