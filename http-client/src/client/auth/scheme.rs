use super::{AuthError, BasicSchemeFactory, Challenge, Credentials};
use auto_impl::auto_impl;
use courier_http::{HeaderValue, RequestParts};
use std::{fmt::Debug, sync::Arc};

/// 鉴权方案
///
/// 每轮鉴权都会创建新的鉴权方案实例，实例可以在处理多次质询的过程中保存握手状态
pub trait AuthScheme: Debug + Send + Sync {
    /// 方案名称
    fn scheme_name(&self) -> &str;

    /// 处理服务器发出的质询
    fn process_challenge(&mut self, challenge: &Challenge) -> Result<(), AuthError>;

    /// 质询中的 `realm`
    fn realm(&self) -> Option<&str>;

    /// 是否需要在同一连接上完成握手
    fn is_connection_based(&self) -> bool;

    /// 鉴权过程是否已经完成
    ///
    /// 已经完成的方案再次收到质询，表示鉴权失败
    fn is_complete(&self) -> bool;

    /// 为请求生成鉴权信息
    fn authenticate(&mut self, credentials: &Credentials, request: &RequestParts) -> Result<HeaderValue, AuthError>;
}

/// 鉴权方案工厂
#[auto_impl(&, Box, Arc)]
pub trait AuthSchemeFactory: Debug + Send + Sync {
    /// 创建鉴权方案实例
    fn new_scheme(&self) -> Box<dyn AuthScheme>;
}

/// 鉴权方案注册表
///
/// 按照注册顺序决定方案的优先级，方案名称不区分大小写
#[derive(Debug, Clone)]
pub struct AuthSchemeRegistry {
    factories: Vec<(String, Arc<dyn AuthSchemeFactory>)>,
}

impl Default for AuthSchemeRegistry {
    #[inline]
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("Basic", BasicSchemeFactory);
        registry
    }
}

impl AuthSchemeRegistry {
    /// 创建空的鉴权方案注册表
    #[inline]
    pub fn empty() -> Self {
        Self {
            factories: Vec::new(),
        }
    }

    /// 注册鉴权方案
    ///
    /// 已经注册的同名方案会被替换，但保持原有的优先级
    pub fn register(&mut self, name: &str, factory: impl AuthSchemeFactory + 'static) -> &mut Self {
        let name = name.to_ascii_lowercase();
        let factory: Arc<dyn AuthSchemeFactory> = Arc::new(factory);
        match self.factories.iter_mut().find(|(registered, _)| *registered == name) {
            Some((_, registered)) => *registered = factory,
            None => self.factories.push((name, factory)),
        }
        self
    }

    /// 注销鉴权方案
    pub fn unregister(&mut self, name: &str) -> &mut Self {
        self.factories.retain(|(registered, _)| !registered.eq_ignore_ascii_case(name));
        self
    }

    /// 创建指定名称的鉴权方案实例
    pub fn new_scheme(&self, name: &str) -> Option<Box<dyn AuthScheme>> {
        self.factories
            .iter()
            .find(|(registered, _)| registered.eq_ignore_ascii_case(name))
            .map(|(_, factory)| factory.new_scheme())
    }

    /// 按照优先级排列的方案名称
    pub fn scheme_names(&self) -> impl Iterator<Item = &str> {
        self.factories.iter().map(|(name, _)| name.as_str())
    }
}
