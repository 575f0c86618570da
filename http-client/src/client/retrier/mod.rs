mod default;
mod limited;
mod never;

use super::{ResponseError, RetriedStatsInfo};
use courier_http::{Method, RequestParts};
use dyn_clonable::clonable;
use std::{
    fmt::{self, Debug},
    ops::{Deref, DerefMut},
};

/// 请求重试器
///
/// 根据请求执行器返回的错误，决定是否重新执行请求，重试决定由 [`RetryDecision`] 定义
#[clonable]
pub trait RequestRetrier: Clone + Debug + Sync + Send {
    /// 作出重试决定
    fn retry(&self, request: &RequestParts, opts: RequestRetrierOptions<'_>) -> RetryResult;
}

/// 重试决定
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum RetryDecision {
    /// 不再重试
    DontRetry,

    /// 重新执行请求
    RetryRequest,
}

impl Default for RetryDecision {
    #[inline]
    fn default() -> Self {
        Self::DontRetry
    }
}

/// 重试器结果
#[derive(Clone)]
pub struct RetryResult(RetryDecision);

impl RetryResult {
    /// 获取重试决定
    #[inline]
    pub fn decision(&self) -> RetryDecision {
        self.0
    }

    /// 获取重试决定的可变引用
    #[inline]
    pub fn decision_mut(&mut self) -> &mut RetryDecision {
        &mut self.0
    }
}

impl From<RetryDecision> for RetryResult {
    #[inline]
    fn from(decision: RetryDecision) -> Self {
        Self(decision)
    }
}

impl From<RetryResult> for RetryDecision {
    #[inline]
    fn from(result: RetryResult) -> Self {
        result.0
    }
}

impl Deref for RetryResult {
    type Target = RetryDecision;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for RetryResult {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl Debug for RetryResult {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// 请求是否幂等
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Idempotent {
    /// 总是幂等
    Always,

    /// 根据 HTTP 方法判断，`POST`，`PATCH` 和 `CONNECT` 不幂等
    Default,

    /// 总是不幂等
    Never,
}

impl Default for Idempotent {
    #[inline]
    fn default() -> Self {
        Self::Default
    }
}

impl Idempotent {
    /// 判断请求是否可以安全地重新发送
    pub fn is_idempotent(self, request: &RequestParts) -> bool {
        match self {
            Idempotent::Always => true,
            Idempotent::Default => !matches!(*request.method(), Method::POST | Method::PATCH | Method::CONNECT),
            Idempotent::Never => false,
        }
    }
}

/// 请求重试器选项
#[derive(Copy, Debug, Clone)]
pub struct RequestRetrierOptions<'a> {
    idempotent: Idempotent,
    response_error: &'a ResponseError,
    retried: &'a RetriedStatsInfo,
}

impl<'a> RequestRetrierOptions<'a> {
    /// 创建请求重试器选项
    #[inline]
    pub fn new(idempotent: Idempotent, response_error: &'a ResponseError, retried: &'a RetriedStatsInfo) -> Self {
        Self {
            idempotent,
            response_error,
            retried,
        }
    }

    /// 获取请求幂等性
    #[inline]
    pub fn idempotent(&self) -> Idempotent {
        self.idempotent
    }

    /// 获取请求执行错误
    #[inline]
    pub fn response_error(&self) -> &ResponseError {
        self.response_error
    }

    /// 获取重试统计信息
    #[inline]
    pub fn retried(&self) -> &RetriedStatsInfo {
        self.retried
    }
}

pub use default::DefaultRetrier;
pub use limited::LimitedRetrier;
pub use never::NeverRetrier;
