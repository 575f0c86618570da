use super::{AuthScheme, AuthSchemeRegistry, AuthScope, AuthState, Challenge, Credentials, CredentialsProvider};
use auto_impl::auto_impl;
use courier_http::{
    header::{AUTHORIZATION, PROXY_AUTHENTICATE, PROXY_AUTHORIZATION, WWW_AUTHENTICATE},
    HeaderName, HttpHost, ResponseParts, StatusCode,
};
use log::{debug, warn};
use std::{fmt::Debug, sync::Arc};

/// 鉴权选项
///
/// 由鉴权策略选出的方案实例和对应的凭证
#[derive(Debug)]
pub struct AuthOption {
    pub(crate) scheme: Box<dyn AuthScheme>,
    pub(crate) credentials: Credentials,
    pub(crate) scope: AuthScope,
}

impl AuthOption {
    /// 创建鉴权选项
    #[inline]
    pub fn new(scheme: Box<dyn AuthScheme>, credentials: Credentials, scope: AuthScope) -> Self {
        Self {
            scheme,
            credentials,
            scope,
        }
    }

    /// 鉴权方案
    #[inline]
    pub fn scheme(&self) -> &dyn AuthScheme {
        self.scheme.as_ref()
    }

    /// 凭证
    #[inline]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }
}

/// 鉴权策略
///
/// 分别用于目标主机（401）和代理（407）
#[auto_impl(&, Box, Arc)]
pub trait AuthenticationStrategy: Debug + Send + Sync {
    /// 响应是否为鉴权质询
    fn is_challenged(&self, host: &HttpHost, response: &ResponseParts) -> bool;

    /// 解析响应中的全部质询，非法的质询将被忽略
    fn challenges(&self, host: &HttpHost, response: &ResponseParts) -> Vec<Challenge>;

    /// 选择鉴权方案和凭证
    ///
    /// 没有可用的方案或凭证时返回 [`None`]
    fn select_scheme(&self, challenges: &[Challenge], host: &HttpHost, state: &AuthState) -> Option<AuthOption>;

    /// 承载鉴权信息的请求头
    fn authorization_header(&self) -> HeaderName;
}

/// 默认鉴权策略
///
/// 按照注册表中的方案优先级依次尝试，跳过已经失败过的方案和凭证组合
#[derive(Debug, Clone)]
pub struct DefaultAuthenticationStrategy {
    status_code: StatusCode,
    challenge_header: HeaderName,
    authorization_header: HeaderName,
    registry: AuthSchemeRegistry,
    provider: Arc<dyn CredentialsProvider>,
}

impl DefaultAuthenticationStrategy {
    /// 创建目标主机鉴权策略
    #[inline]
    pub fn target(provider: impl CredentialsProvider + 'static) -> Self {
        Self {
            status_code: StatusCode::UNAUTHORIZED,
            challenge_header: WWW_AUTHENTICATE,
            authorization_header: AUTHORIZATION,
            registry: Default::default(),
            provider: Arc::new(provider),
        }
    }

    /// 创建代理鉴权策略
    #[inline]
    pub fn proxy(provider: impl CredentialsProvider + 'static) -> Self {
        Self {
            status_code: StatusCode::PROXY_AUTHENTICATION_REQUIRED,
            challenge_header: PROXY_AUTHENTICATE,
            authorization_header: PROXY_AUTHORIZATION,
            registry: Default::default(),
            provider: Arc::new(provider),
        }
    }

    /// 设置鉴权方案注册表
    #[inline]
    #[must_use]
    pub fn with_registry(mut self, registry: AuthSchemeRegistry) -> Self {
        self.registry = registry;
        self
    }
}

impl AuthenticationStrategy for DefaultAuthenticationStrategy {
    #[inline]
    fn is_challenged(&self, _host: &HttpHost, response: &ResponseParts) -> bool {
        response.status_code() == self.status_code
    }

    fn challenges(&self, host: &HttpHost, response: &ResponseParts) -> Vec<Challenge> {
        response
            .headers()
            .get_all(&self.challenge_header)
            .iter()
            .filter_map(|value| match value.to_str() {
                Ok(value) => Some(value),
                Err(err) => {
                    warn!("Non-ASCII {} header from {}: {}", self.challenge_header, host, err);
                    None
                }
            })
            .filter_map(|value| match Challenge::parse(value) {
                Ok(challenge) => Some(challenge),
                Err(err) => {
                    warn!("Malformed challenge from {}: {}", host, err);
                    None
                }
            })
            .collect()
    }

    fn select_scheme(&self, challenges: &[Challenge], host: &HttpHost, state: &AuthState) -> Option<AuthOption> {
        for name in self.registry.scheme_names() {
            let challenge = match challenges.iter().find(|challenge| challenge.is_scheme(name)) {
                Some(challenge) => challenge,
                None => continue,
            };
            let mut scheme = match self.registry.new_scheme(name) {
                Some(scheme) => scheme,
                None => continue,
            };
            if let Err(err) = scheme.process_challenge(challenge) {
                warn!("Failed to process {} challenge from {}: {}", name, host, err);
                continue;
            }
            let scope = AuthScope::new(host.hostname(), host.port())
                .realm(scheme.realm())
                .scheme(Some(scheme.scheme_name()));
            let credentials = match self.provider.credentials(&scope) {
                Some(credentials) => credentials,
                None => {
                    debug!("No credentials for {}", scope);
                    continue;
                }
            };
            if state.has_failed(scheme.scheme_name(), &credentials) {
                debug!("Credentials for {} have been rejected before", scope);
                continue;
            }
            return Some(AuthOption::new(scheme, credentials, scope));
        }
        None
    }

    #[inline]
    fn authorization_header(&self) -> HeaderName {
        self.authorization_header.to_owned()
    }
}
