mod state;
mod store;
mod validator;

pub use state::{AuthState, SessionCookie, ViewportSize, SESSION_COOKIE_SENTINEL};
pub use store::{AuthStateStore, StoreError, StoreResult};
pub use validator::{
    CookieSink, CookieWarning, ExpiredCookiePolicy, SessionError, SessionReport, SessionValidator,
    SinkError, DEFAULT_MAX_AGE_HOURS,
};
