pub mod auth;

use axum_extra::extract::CookieJar;

use crate::context::AppContext;
use crate::error::ApiError;
use crate::session::{AuthError, SESSION_COOKIE};

/// Verify the session cookie and return the caller's uid.
pub fn session_uid(ctx: &AppContext, jar: &CookieJar) -> Result<i64, ApiError> {
    let cookie = jar.get(SESSION_COOKIE).ok_or(AuthError::Invalid)?;
    Ok(ctx.sessions.verify(cookie.value())?)
}
