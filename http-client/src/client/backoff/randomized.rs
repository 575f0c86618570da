use super::{Backoff, BackoffOptions, GotBackoffDuration};
use courier_http::RequestParts;
use rand::{thread_rng, Rng};
use std::time::Duration;

pub use num_rational::Ratio;

/// 随机化的退避
///
/// 在其他退避时长的缩小倍数和放大倍数之间随机选择退避时长
#[derive(Debug, Clone)]
pub struct RandomizedBackoff<P> {
    base_backoff: P,
    minification: Ratio<u8>,
    magnification: Ratio<u8>,
}

impl<P> RandomizedBackoff<P> {
    /// 创建随机化的退避
    #[inline]
    pub fn new(base_backoff: P, minification: Ratio<u8>, magnification: Ratio<u8>) -> Self {
        Self {
            base_backoff,
            minification,
            magnification,
        }
    }

    /// 获取基础退避
    #[inline]
    pub fn base_backoff(&self) -> &P {
        &self.base_backoff
    }

    /// 获取缩小倍数
    #[inline]
    pub fn minification(&self) -> Ratio<u8> {
        self.minification
    }

    /// 获取放大倍数
    #[inline]
    pub fn magnification(&self) -> Ratio<u8> {
        self.magnification
    }
}

impl<P: Backoff + Clone> Backoff for RandomizedBackoff<P> {
    fn time(&self, request: &RequestParts, opts: BackoffOptions<'_>) -> GotBackoffDuration {
        let duration = self.base_backoff.time(request, opts).duration();
        let minified = scale(duration, self.minification);
        let magnified = scale(duration, self.magnification);
        if minified >= magnified {
            return Duration::from_nanos(minified).into();
        }
        Duration::from_nanos(thread_rng().gen_range(minified..magnified)).into()
    }
}

fn scale(duration: Duration, ratio: Ratio<u8>) -> u64 {
    let ratio: Ratio<u128> = Ratio::new_raw((*ratio.numer()).into(), (*ratio.denom()).into());
    (ratio * duration.as_nanos())
        .to_integer()
        .try_into()
        .unwrap_or(u64::MAX)
}

impl<P: Default> Default for RandomizedBackoff<P> {
    #[inline]
    fn default() -> Self {
        RandomizedBackoff::new(P::default(), Ratio::new_raw(1, 2), Ratio::new_raw(3, 2))
    }
}
