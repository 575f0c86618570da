use auto_impl::auto_impl;
use std::{
    fmt::{self, Debug},
    sync::{PoisonError, RwLock},
};

/// 用户名密码凭证
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credentials {
    user: String,
    password: String,
}

impl Credentials {
    /// 创建凭证
    #[inline]
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    /// 用户名
    #[inline]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// 密码
    #[inline]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// 鉴权范围
///
/// 未指定的字段可以匹配任意值
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AuthScope {
    host: Option<String>,
    port: Option<u16>,
    realm: Option<String>,
    scheme: Option<String>,
}

impl AuthScope {
    /// 匹配任意主机的鉴权范围
    #[inline]
    pub fn any() -> Self {
        Default::default()
    }

    /// 创建指定主机的鉴权范围
    #[inline]
    pub fn new(host: &str, port: Option<u16>) -> Self {
        Self {
            host: Some(host.to_ascii_lowercase()),
            port,
            realm: None,
            scheme: None,
        }
    }

    /// 设置 `realm`
    #[inline]
    #[must_use]
    pub fn realm(mut self, realm: Option<&str>) -> Self {
        self.realm = realm.map(|realm| realm.to_owned());
        self
    }

    /// 设置鉴权方案
    #[inline]
    #[must_use]
    pub fn scheme(mut self, scheme: Option<&str>) -> Self {
        self.scheme = scheme.map(|scheme| scheme.to_ascii_lowercase());
        self
    }

    /// 主机名
    #[inline]
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// 端口号
    #[inline]
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// 计算和另一个鉴权范围的匹配程度
    ///
    /// 不匹配时返回 [`None`]，否则分数越高匹配越精确
    pub fn match_score(&self, other: &AuthScope) -> Option<u32> {
        let mut score = 0;
        if let (Some(scheme), Some(other)) = (&self.scheme, &other.scheme) {
            if !scheme.eq_ignore_ascii_case(other) {
                return None;
            }
            score += 1;
        }
        if let (Some(realm), Some(other)) = (&self.realm, &other.realm) {
            if realm != other {
                return None;
            }
            score += 2;
        }
        if let (Some(port), Some(other)) = (self.port, other.port) {
            if port != other {
                return None;
            }
            score += 4;
        }
        if let (Some(host), Some(other)) = (&self.host, &other.host) {
            if !host.eq_ignore_ascii_case(other) {
                return None;
            }
            score += 8;
        }
        Some(score)
    }
}

impl fmt::Display for AuthScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scheme) = &self.scheme {
            write!(f, "{} ", scheme.to_ascii_uppercase())?;
        }
        if let Some(realm) = &self.realm {
            write!(f, "'{}'", realm)?;
        } else {
            f.write_str("<any realm>")?;
        }
        match (&self.host, self.port) {
            (Some(host), Some(port)) => write!(f, "@{}:{}", host, port),
            (Some(host), None) => write!(f, "@{}", host),
            _ => Ok(()),
        }
    }
}

/// 凭证提供者
#[auto_impl(&, Box, Arc)]
pub trait CredentialsProvider: Debug + Send + Sync {
    /// 获取鉴权范围对应的凭证
    fn credentials(&self, scope: &AuthScope) -> Option<Credentials>;
}

/// 基于内存的凭证提供者
///
/// 选择和查询范围匹配程度最高的凭证
#[derive(Debug, Default)]
pub struct BasicCredentialsProvider {
    entries: RwLock<Vec<(AuthScope, Credentials)>>,
}

impl BasicCredentialsProvider {
    /// 设置鉴权范围对应的凭证
    pub fn set_credentials(&self, scope: AuthScope, credentials: Credentials) -> &Self {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.iter_mut().find(|(registered, _)| *registered == scope) {
            Some((_, registered)) => *registered = credentials,
            None => entries.push((scope, credentials)),
        }
        self
    }

    /// 清空所有凭证
    pub fn clear(&self) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl CredentialsProvider for BasicCredentialsProvider {
    fn credentials(&self, scope: &AuthScope) -> Option<Credentials> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .iter()
            .filter_map(|(registered, credentials)| Some((registered.match_score(scope)?, credentials)))
            .max_by_key(|(score, _)| *score)
            .map(|(_, credentials)| credentials.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_provider_best_match() {
        let provider = BasicCredentialsProvider::default();
        provider
            .set_credentials(AuthScope::any(), Credentials::new("anyone", "pw0"))
            .set_credentials(AuthScope::new("example.com", Some(80)), Credentials::new("host", "pw1"))
            .set_credentials(
                AuthScope::new("example.com", Some(80)).realm(Some("admin")),
                Credentials::new("admin", "pw2"),
            );

        let scope = AuthScope::new("Example.com", Some(80)).realm(Some("admin")).scheme(Some("Basic"));
        assert_eq!(provider.credentials(&scope).map(|c| c.user().to_owned()), Some("admin".to_owned()));

        let scope = AuthScope::new("example.com", Some(80)).realm(Some("users"));
        assert_eq!(provider.credentials(&scope).map(|c| c.user().to_owned()), Some("host".to_owned()));

        let scope = AuthScope::new("other.com", Some(443));
        assert_eq!(provider.credentials(&scope).map(|c| c.user().to_owned()), Some("anyone".to_owned()));

        provider.clear();
        assert!(provider.credentials(&scope).is_none());
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let debug = format!("{:?}", Credentials::new("user", "secret"));
        assert!(debug.contains("user"));
        assert!(!debug.contains("secret"));
    }
}
