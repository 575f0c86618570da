mod abort;
mod auth;
mod backoff;
mod config;
mod context;
mod director;
mod error;
mod lease;
mod redirect;
mod retried;
mod retrier;
mod retrying;
mod reuse;
mod route;

pub use abort::AbortHandle;
pub use auth::{
    AuthError, AuthOption, AuthPhase, AuthScheme, AuthSchemeFactory, AuthSchemeRegistry, AuthScope, AuthState,
    AuthenticationStrategy, BasicCredentialsProvider, BasicScheme, BasicSchemeFactory, Challenge, Credentials,
    CredentialsProvider, DefaultAuthenticationStrategy,
};
pub use backoff::{
    Backoff, BackoffOptions, ExponentialBackoff, FixedBackoff, GotBackoffDuration, LimitedBackoff, RandomizedBackoff,
    Ratio, NO_BACKOFF,
};
pub use config::{DirectorConfig, DirectorConfigBuilder};
pub use context::ExecutionContext;
pub use director::{RequestDirector, RequestDirectorBuilder};
pub use error::{Error as ResponseError, ErrorKind as ResponseErrorKind, ResponseResult};
pub use lease::ConnectionHandle;
pub use redirect::{DefaultRedirectStrategy, DefaultRedirectStrategyBuilder, Redirect, RedirectLocations, RedirectStrategy};
pub use retried::RetriedStatsInfo;
pub use retrier::{
    DefaultRetrier, Idempotent, LimitedRetrier, NeverRetrier, RequestRetrier, RequestRetrierOptions, RetryDecision,
    RetryResult,
};
pub use retrying::RetryingDirector;
pub use reuse::{
    can_response_have_body, is_response_body_empty, DefaultKeepAliveStrategy, DefaultReuseStrategy, KeepAliveStrategy,
    ReuseStrategy,
};
pub use route::{BasicRouteDirector, DefaultRoutePlanner, RoutePlanner, RouteStep, RouteTracker};

use auth::{apply_authorization, handle_challenge, is_authentication_requested};
use lease::Lease;
