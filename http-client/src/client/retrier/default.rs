use super::{super::ResponseErrorKind, RequestRetrier, RequestRetrierOptions, RetryDecision, RetryResult};
use courier_http::{ErrorKind as HttpErrorKind, RequestParts};

/// 根据传输层错误类型作出重试决定
///
/// 请求尚未发出的连接失败总是重试，请求可能已经发出的收发失败只对幂等请求重试。
/// 连接超时，中断，协议错误以及重定向和鉴权的次数超限都不会重试
#[derive(Copy, Clone, Debug, Default)]
pub struct DefaultRetrier;

impl RequestRetrier for DefaultRetrier {
    fn retry(&self, request: &RequestParts, opts: RequestRetrierOptions<'_>) -> RetryResult {
        match opts.response_error().kind() {
            ResponseErrorKind::HttpError(kind) => match kind {
                HttpErrorKind::ConnectError | HttpErrorKind::ProxyError | HttpErrorKind::UnknownHostError => {
                    RetryDecision::RetryRequest
                }
                HttpErrorKind::SendError
                | HttpErrorKind::ReceiveError
                | HttpErrorKind::ConnectionClosed
                | HttpErrorKind::TimeoutError
                | HttpErrorKind::UnknownError => {
                    if opts.idempotent().is_idempotent(request) {
                        RetryDecision::RetryRequest
                    } else {
                        RetryDecision::DontRetry
                    }
                }
                _ => RetryDecision::DontRetry,
            },
            _ => RetryDecision::DontRetry,
        }
        .into()
    }
}
