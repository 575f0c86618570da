use super::{RequestRetrier, RequestRetrierOptions, RetryDecision, RetryResult};
use courier_http::RequestParts;

/// 永不重试器
///
/// 总是返回不再重试的重试器
#[derive(Copy, Clone, Debug, Default)]
pub struct NeverRetrier;

impl RequestRetrier for NeverRetrier {
    #[inline]
    fn retry(&self, _request: &RequestParts, _opts: RequestRetrierOptions<'_>) -> RetryResult {
        RetryDecision::DontRetry.into()
    }
}
