use super::{
    super::{ResponseError, ResponseErrorKind, ResponseResult},
    AuthPhase, AuthState, AuthenticationStrategy,
};
use courier_http::{HttpHost, RequestParts, ResponseParts};
use log::{debug, info, warn};

/// 判断响应是否要求鉴权，并根据结果推进鉴权阶段
///
/// 握手过程中收到非质询响应，视为鉴权成功
pub(crate) fn is_authentication_requested(
    host: &HttpHost,
    response: &ResponseParts,
    strategy: &dyn AuthenticationStrategy,
    state: &mut AuthState,
) -> bool {
    if strategy.is_challenged(host, response) {
        debug!("{} requested authentication", host);
        return true;
    }
    match state.phase() {
        AuthPhase::Challenged | AuthPhase::Handshake => {
            debug!("Authentication to {} succeeded", host);
            state.set_phase(AuthPhase::Success);
        }
        AuthPhase::Success => {}
        _ => state.set_phase(AuthPhase::Unchallenged),
    }
    false
}

/// 处理鉴权质询
///
/// 返回 `true` 表示需要携带新的鉴权信息重新发送请求，
/// 返回 `false` 表示放弃鉴权，将质询响应作为最终响应
pub(crate) fn handle_challenge(
    host: &HttpHost,
    response: &ResponseParts,
    strategy: &dyn AuthenticationStrategy,
    state: &mut AuthState,
    max_auth_attempts: usize,
) -> ResponseResult<bool> {
    let challenges = strategy.challenges(host, response);
    if challenges.is_empty() {
        debug!("Response from {} has no valid challenge", host);
        return Ok(false);
    }
    if state.phase() == AuthPhase::Failure {
        return Ok(false);
    }

    if let Some(scheme) = state.scheme_mut() {
        match challenges
            .iter()
            .find(|challenge| challenge.is_scheme(scheme.scheme_name()))
        {
            Some(challenge) => {
                if scheme.is_complete() {
                    debug!("{} authentication to {} has been rejected", scheme.scheme_name(), host);
                    state.fail_current();
                } else {
                    match scheme.process_challenge(challenge) {
                        Ok(()) if !scheme.is_complete() => {
                            debug!("Continuing {} handshake with {}", scheme.scheme_name(), host);
                            state.set_phase(AuthPhase::Handshake);
                            return next_round(host, state, max_auth_attempts);
                        }
                        Ok(()) => state.fail_current(),
                        Err(err) => {
                            warn!("Failed to process {} challenge from {}: {}", scheme.scheme_name(), host, err);
                            state.fail_current();
                        }
                    }
                }
            }
            None => state.clear_scheme(),
        }
    }

    match strategy.select_scheme(&challenges, host, state) {
        Some(option) => {
            debug!("Selected {} authentication for {}", option.scheme().scheme_name(), host);
            state.update(option);
            state.set_phase(AuthPhase::Challenged);
            next_round(host, state, max_auth_attempts)
        }
        None => {
            info!("No usable authentication scheme or credentials for {}, giving up", host);
            state.set_phase(AuthPhase::Failure);
            Ok(false)
        }
    }
}

fn next_round(host: &HttpHost, state: &mut AuthState, max_auth_attempts: usize) -> ResponseResult<bool> {
    let rounds = state.increase_rounds();
    if rounds > max_auth_attempts {
        return Err(ResponseError::new_with_msg(
            ResponseErrorKind::AuthRetryLimitExceeded,
            format!("Maximum authentication attempts ({}) exceeded", max_auth_attempts),
        )
        .host(host));
    }
    Ok(true)
}

/// 为请求添加鉴权信息
///
/// 鉴权成功后，基于连接的方案不再重复发送鉴权信息
pub(crate) fn apply_authorization(
    parts: &mut RequestParts,
    strategy: &dyn AuthenticationStrategy,
    state: &mut AuthState,
) {
    match state.phase() {
        AuthPhase::Unchallenged | AuthPhase::Failure => return,
        AuthPhase::Success if state.scheme().map_or(true, |scheme| scheme.is_connection_based()) => return,
        _ => {}
    }
    let header_name = strategy.authorization_header();
    if let Some((scheme, credentials)) = state.scheme_and_credentials_mut() {
        match scheme.authenticate(credentials, parts) {
            Ok(value) => {
                parts.headers_mut().insert(header_name, value);
            }
            Err(err) => warn!("{} authentication error: {}", scheme.scheme_name(), err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        super::{
            AuthError, AuthScheme, AuthSchemeFactory, AuthSchemeRegistry, AuthScope, BasicCredentialsProvider,
            Challenge, Credentials, DefaultAuthenticationStrategy,
        },
        *,
    };
    use courier_http::{
        header::{AUTHORIZATION, WWW_AUTHENTICATE},
        HeaderMap, HeaderValue, StatusCode, Version,
    };

    fn response(status_code: StatusCode, challenges: &[&'static str]) -> ResponseParts {
        let mut headers = HeaderMap::new();
        for challenge in challenges {
            headers.append(WWW_AUTHENTICATE, HeaderValue::from_static(*challenge));
        }
        ResponseParts::new(status_code, Version::HTTP_11, headers)
    }

    fn basic_strategy() -> DefaultAuthenticationStrategy {
        let provider = BasicCredentialsProvider::default();
        provider.set_credentials(AuthScope::any(), Credentials::new("user", "pass"));
        DefaultAuthenticationStrategy::target(provider)
    }

    #[test]
    fn test_basic_authentication_rounds() -> ResponseResult<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let host = HttpHost::new("http", "example.com", None);
        let strategy = basic_strategy();
        let mut state = AuthState::default();
        let challenge = response(StatusCode::UNAUTHORIZED, &["Basic realm=\"r\""]);

        let mut parts = RequestParts::default();
        apply_authorization(&mut parts, &strategy, &mut state);
        assert!(parts.header(AUTHORIZATION).is_none());

        assert!(is_authentication_requested(&host, &challenge, &strategy, &mut state));
        assert!(handle_challenge(&host, &challenge, &strategy, &mut state, 3)?);
        assert_eq!(state.phase(), AuthPhase::Challenged);

        apply_authorization(&mut parts, &strategy, &mut state);
        assert_eq!(
            parts.header(AUTHORIZATION).and_then(|value| value.to_str().ok()),
            Some("Basic dXNlcjpwYXNz")
        );

        // 相同凭证再次被拒绝
        assert!(is_authentication_requested(&host, &challenge, &strategy, &mut state));
        assert!(!handle_challenge(&host, &challenge, &strategy, &mut state, 3)?);
        assert_eq!(state.phase(), AuthPhase::Failure);
        Ok(())
    }

    #[test]
    fn test_authentication_success() -> ResponseResult<()> {
        let host = HttpHost::new("http", "example.com", None);
        let strategy = basic_strategy();
        let mut state = AuthState::default();
        let challenge = response(StatusCode::UNAUTHORIZED, &["Basic realm=\"r\""]);
        assert!(handle_challenge(&host, &challenge, &strategy, &mut state, 3)?);

        let ok = response(StatusCode::OK, &[]);
        assert!(!is_authentication_requested(&host, &ok, &strategy, &mut state));
        assert_eq!(state.phase(), AuthPhase::Success);

        // Basic 鉴权成功后继续主动发送鉴权信息
        let mut parts = RequestParts::default();
        apply_authorization(&mut parts, &strategy, &mut state);
        assert!(parts.header(AUTHORIZATION).is_some());
        Ok(())
    }

    #[test]
    fn test_no_challenge_gives_up() -> ResponseResult<()> {
        let host = HttpHost::new("http", "example.com", None);
        let strategy = basic_strategy();
        let mut state = AuthState::default();
        let challenge = response(StatusCode::UNAUTHORIZED, &[]);
        assert!(!handle_challenge(&host, &challenge, &strategy, &mut state, 3)?);

        let challenge = response(StatusCode::UNAUTHORIZED, &["Unknown realm=\"r\""]);
        assert!(!handle_challenge(&host, &challenge, &strategy, &mut state, 3)?);
        assert_eq!(state.phase(), AuthPhase::Failure);
        Ok(())
    }

    #[derive(Debug, Default)]
    struct EndlessScheme;

    impl AuthScheme for EndlessScheme {
        fn scheme_name(&self) -> &str {
            "Endless"
        }

        fn process_challenge(&mut self, _challenge: &Challenge) -> Result<(), AuthError> {
            Ok(())
        }

        fn realm(&self) -> Option<&str> {
            None
        }

        fn is_connection_based(&self) -> bool {
            true
        }

        fn is_complete(&self) -> bool {
            false
        }

        fn authenticate(&mut self, _credentials: &Credentials, _request: &RequestParts) -> Result<HeaderValue, AuthError> {
            Ok(HeaderValue::from_static("Endless token"))
        }
    }

    #[derive(Debug)]
    struct EndlessSchemeFactory;

    impl AuthSchemeFactory for EndlessSchemeFactory {
        fn new_scheme(&self) -> Box<dyn AuthScheme> {
            Box::new(EndlessScheme)
        }
    }

    #[test]
    fn test_handshake_round_limit() -> ResponseResult<()> {
        let host = HttpHost::new("http", "example.com", None);
        let mut registry = AuthSchemeRegistry::empty();
        registry.register("Endless", EndlessSchemeFactory);
        let provider = BasicCredentialsProvider::default();
        provider.set_credentials(AuthScope::any(), Credentials::new("user", "pass"));
        let strategy = DefaultAuthenticationStrategy::target(provider).with_registry(registry);

        let mut state = AuthState::default();
        let challenge = response(StatusCode::UNAUTHORIZED, &["Endless"]);
        assert!(handle_challenge(&host, &challenge, &strategy, &mut state, 2)?);
        assert_eq!(state.phase(), AuthPhase::Challenged);
        assert!(handle_challenge(&host, &challenge, &strategy, &mut state, 2)?);
        assert_eq!(state.phase(), AuthPhase::Handshake);

        let err = handle_challenge(&host, &challenge, &strategy, &mut state, 2)
            .err()
            .map(|err| err.kind());
        assert_eq!(err, Some(ResponseErrorKind::AuthRetryLimitExceeded));
        Ok(())
    }
}
