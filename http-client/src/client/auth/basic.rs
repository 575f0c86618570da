use super::{AuthError, AuthScheme, AuthSchemeFactory, Challenge, Credentials};
use courier_http::{HeaderValue, RequestParts};

/// Basic 鉴权方案
///
/// 收到质询即视为完成，因此同一凭证只会被尝试一次
#[derive(Debug, Clone, Default)]
pub struct BasicScheme {
    realm: Option<String>,
    complete: bool,
}

impl AuthScheme for BasicScheme {
    #[inline]
    fn scheme_name(&self) -> &str {
        "Basic"
    }

    fn process_challenge(&mut self, challenge: &Challenge) -> Result<(), AuthError> {
        if !challenge.is_scheme(self.scheme_name()) {
            return Err(AuthError::InvalidChallenge {
                scheme: self.scheme_name().to_owned(),
                reason: format!("unexpected {} challenge", challenge.scheme()),
            });
        }
        self.realm = challenge.realm().map(|realm| realm.to_owned());
        self.complete = true;
        Ok(())
    }

    #[inline]
    fn realm(&self) -> Option<&str> {
        self.realm.as_deref()
    }

    #[inline]
    fn is_connection_based(&self) -> bool {
        false
    }

    #[inline]
    fn is_complete(&self) -> bool {
        self.complete
    }

    fn authenticate(&mut self, credentials: &Credentials, _request: &RequestParts) -> Result<HeaderValue, AuthError> {
        let token = base64::encode(format!("{}:{}", credentials.user(), credentials.password()));
        let mut value = HeaderValue::from_str(&format!("Basic {}", token))
            .map_err(|err| AuthError::InvalidCredentials(err.to_string()))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

/// Basic 鉴权方案工厂
#[derive(Debug, Copy, Clone, Default)]
pub struct BasicSchemeFactory;

impl AuthSchemeFactory for BasicSchemeFactory {
    #[inline]
    fn new_scheme(&self) -> Box<dyn AuthScheme> {
        Box::<BasicScheme>::default()
    }
}
