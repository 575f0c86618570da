mod default;
mod locations;

pub use default::{DefaultRedirectStrategy, DefaultRedirectStrategyBuilder};
pub use locations::RedirectLocations;

use super::ResponseResult;
use auto_impl::auto_impl;
use courier_http::{RequestParts, ResponseParts};
use std::fmt::Debug;

/// 重定向策略
#[auto_impl(&, Box, Arc)]
pub trait RedirectStrategy: Debug + Send + Sync {
    /// 响应是否要求重定向
    fn is_redirected(&self, request: &RequestParts, response: &ResponseParts) -> bool;

    /// 计算重定向后的请求
    ///
    /// 传入的请求信息总是包含绝对地址，重定向地址会被记录到 `locations` 中
    fn redirect(
        &self,
        request: &RequestParts,
        response: &ResponseParts,
        locations: &mut RedirectLocations,
    ) -> ResponseResult<Redirect>;
}

/// 重定向后的请求
#[derive(Debug, Clone)]
pub struct Redirect {
    parts: RequestParts,
    keep_body: bool,
}

impl Redirect {
    /// 创建重定向后的请求
    #[inline]
    pub fn new(parts: RequestParts, keep_body: bool) -> Self {
        Self { parts, keep_body }
    }

    /// 重定向后的请求信息
    #[inline]
    pub fn parts(&self) -> &RequestParts {
        &self.parts
    }

    /// 是否继续发送原请求的请求体
    #[inline]
    pub fn keep_body(&self) -> bool {
        self.keep_body
    }

    /// 转换为请求信息
    #[inline]
    pub fn into_parts(self) -> RequestParts {
        self.parts
    }
}
