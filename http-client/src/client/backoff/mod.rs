mod exponential;
mod fixed;
mod limited;
mod randomized;

use super::{ResponseError, RetriedStatsInfo};
use courier_http::RequestParts;
use dyn_clonable::clonable;
use std::{fmt::Debug, time::Duration};

/// 退避时长获取接口
///
/// 重试器决定重新执行请求后，在重新执行前等待的时长
#[clonable]
pub trait Backoff: Clone + Debug + Sync + Send {
    /// 获取退避时长
    fn time(&self, request: &RequestParts, opts: BackoffOptions<'_>) -> GotBackoffDuration;
}

/// 获取退避时长的选项
#[derive(Copy, Debug, Clone)]
pub struct BackoffOptions<'a> {
    error: &'a ResponseError,
    retried: &'a RetriedStatsInfo,
}

impl<'a> BackoffOptions<'a> {
    /// 创建获取退避时长的选项
    #[inline]
    pub fn new(error: &'a ResponseError, retried: &'a RetriedStatsInfo) -> Self {
        Self { error, retried }
    }

    /// 导致重试的错误
    #[inline]
    pub fn error(&self) -> &'a ResponseError {
        self.error
    }

    /// 获取重试统计信息
    #[inline]
    pub fn retried(&self) -> &'a RetriedStatsInfo {
        self.retried
    }
}

/// 退避时长
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GotBackoffDuration(Duration);

impl GotBackoffDuration {
    /// 获取退避时长
    #[inline]
    pub fn duration(self) -> Duration {
        self.0
    }
}

impl From<Duration> for GotBackoffDuration {
    #[inline]
    fn from(duration: Duration) -> Self {
        Self(duration)
    }
}

pub use exponential::ExponentialBackoff;
pub use fixed::{FixedBackoff, NO_BACKOFF};
pub use limited::LimitedBackoff;
pub use randomized::{RandomizedBackoff, Ratio};
