use super::{AuthOption, AuthScheme, AuthScope, Credentials};
use std::collections::HashSet;

/// 鉴权阶段
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum AuthPhase {
    /// 尚未收到质询
    #[default]
    Unchallenged,

    /// 已经收到质询，正在发送凭证
    Challenged,

    /// 正在进行多轮握手
    Handshake,

    /// 鉴权失败，不再尝试
    Failure,

    /// 鉴权成功
    Success,
}

/// 单个主机（目标主机或代理）的鉴权状态
///
/// 在同一次请求执行的多次往返之间保持，重定向到其他主机时重置
#[derive(Debug, Default)]
pub struct AuthState {
    phase: AuthPhase,
    scheme: Option<Box<dyn AuthScheme>>,
    credentials: Option<Credentials>,
    scope: Option<AuthScope>,
    failed: HashSet<(String, Credentials)>,
    rounds: usize,
}

impl AuthState {
    /// 当前鉴权阶段
    #[inline]
    pub fn phase(&self) -> AuthPhase {
        self.phase
    }

    #[inline]
    pub(crate) fn set_phase(&mut self, phase: AuthPhase) {
        self.phase = phase;
    }

    /// 当前选用的鉴权方案
    #[inline]
    pub fn scheme(&self) -> Option<&dyn AuthScheme> {
        self.scheme.as_deref()
    }

    /// 当前使用的凭证
    #[inline]
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// 当前凭证对应的鉴权范围
    #[inline]
    pub fn scope(&self) -> Option<&AuthScope> {
        self.scope.as_ref()
    }

    /// 已经进行的鉴权轮数
    #[inline]
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// 指定方案和凭证的组合是否已经失败过
    pub fn has_failed(&self, scheme: &str, credentials: &Credentials) -> bool {
        self.failed
            .contains(&(scheme.to_ascii_lowercase(), credentials.to_owned()))
    }

    /// 重置鉴权状态
    pub fn reset(&mut self) {
        *self = Default::default();
    }

    /// 连接被关闭后，重新开始进行中的基于连接的鉴权
    ///
    /// 只有处于握手阶段或已经成功的基于连接的方案才会被清除，已经进行的轮数和失败记录保留。
    /// 返回是否清除了鉴权方案
    pub(crate) fn restart_on_new_connection(&mut self) -> bool {
        let bound_to_connection = matches!(self.phase, AuthPhase::Handshake | AuthPhase::Success)
            && self.scheme().map_or(false, |scheme| scheme.is_connection_based());
        if bound_to_connection {
            self.clear_scheme();
            self.phase = AuthPhase::Unchallenged;
        }
        bound_to_connection
    }

    pub(crate) fn update(&mut self, option: AuthOption) {
        self.scheme = Some(option.scheme);
        self.credentials = Some(option.credentials);
        self.scope = Some(option.scope);
    }

    pub(crate) fn increase_rounds(&mut self) -> usize {
        self.rounds += 1;
        self.rounds
    }

    /// 将当前方案和凭证的组合记为失败，并清除当前方案
    pub(crate) fn fail_current(&mut self) {
        if let (Some(scheme), Some(credentials)) = (self.scheme.take(), self.credentials.take()) {
            self.failed
                .insert((scheme.scheme_name().to_ascii_lowercase(), credentials));
        }
        self.scope = None;
    }

    pub(crate) fn clear_scheme(&mut self) {
        self.scheme = None;
        self.credentials = None;
        self.scope = None;
    }

    pub(crate) fn scheme_mut(&mut self) -> Option<&mut Box<dyn AuthScheme>> {
        self.scheme.as_mut()
    }

    pub(crate) fn scheme_and_credentials_mut(&mut self) -> Option<(&mut Box<dyn AuthScheme>, &Credentials)> {
        match (self.scheme.as_mut(), self.credentials.as_ref()) {
            (Some(scheme), Some(credentials)) => Some((scheme, credentials)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{super::BasicScheme, *};

    #[test]
    fn test_auth_state_failure_tracking() {
        let mut state = AuthState::default();
        assert_eq!(state.phase(), AuthPhase::Unchallenged);
        assert!(state.scheme_and_credentials_mut().is_none());

        let credentials = Credentials::new("user", "pass");
        state.update(AuthOption {
            scheme: Box::<BasicScheme>::default(),
            credentials: credentials.to_owned(),
            scope: AuthScope::new("example.com", Some(80)),
        });
        state.set_phase(AuthPhase::Challenged);
        assert_eq!(state.scheme().map(|scheme| scheme.scheme_name()), Some("Basic"));
        assert!(!state.has_failed("basic", &credentials));

        state.fail_current();
        assert!(state.scheme().is_none());
        assert!(state.has_failed("BASIC", &credentials));
        assert_eq!(state.increase_rounds(), 1);

        state.reset();
        assert_eq!(state.phase(), AuthPhase::Unchallenged);
        assert!(!state.has_failed("basic", &credentials));
        assert_eq!(state.rounds(), 0);
    }

    #[test]
    fn test_restart_keeps_connection_independent_scheme() {
        let mut state = AuthState::default();
        state.update(AuthOption {
            scheme: Box::<BasicScheme>::default(),
            credentials: Credentials::new("user", "pass"),
            scope: AuthScope::any(),
        });
        state.set_phase(AuthPhase::Success);
        state.increase_rounds();

        assert!(!state.restart_on_new_connection());
        assert_eq!(state.phase(), AuthPhase::Success);
        assert!(state.scheme().is_some());
        assert_eq!(state.rounds(), 1);
    }
}
