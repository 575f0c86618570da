mod authenticator;
mod basic;
mod challenge;
mod credentials;
mod scheme;
mod state;
mod strategy;

pub(crate) use authenticator::{apply_authorization, handle_challenge, is_authentication_requested};
pub use basic::{BasicScheme, BasicSchemeFactory};
pub use challenge::Challenge;
pub use credentials::{AuthScope, BasicCredentialsProvider, Credentials, CredentialsProvider};
pub use scheme::{AuthScheme, AuthSchemeFactory, AuthSchemeRegistry};
pub use state::{AuthPhase, AuthState};
pub use strategy::{AuthOption, AuthenticationStrategy, DefaultAuthenticationStrategy};

use thiserror::Error;

/// 鉴权错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AuthError {
    /// 无法解析的质询
    #[error("Malformed challenge: {0}")]
    MalformedChallenge(String),

    /// 鉴权方案无法处理的质询
    #[error("Invalid {scheme} challenge: {reason}")]
    InvalidChallenge {
        /// 方案名称
        scheme: String,
        /// 原因
        reason: String,
    },

    /// 无法根据凭证生成鉴权信息
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),
}
