//! Login, logout and welcome: the authentication surface of the API.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::context::AppContext;
use crate::db::models::User;
use crate::db::Repository;
use crate::error::ApiError;
use crate::handlers::session_uid;
use crate::session::{self, password, SessionClaims};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginBody {
    pub user: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginInfo {
    pub uid: i64,
    pub name: String,
    pub admin: bool,
    pub logged_in: bool,
}

#[derive(Debug, Serialize)]
pub struct WelcomeInfo {
    pub uid: i64,
    pub admin: bool,
    pub logged_in: bool,
}

/// POST /api/login: verify credentials, issue a token, set the cookie.
///
/// A wrong user or wrong password gets the same 401 and no cookie.
pub async fn login(
    State(ctx): State<Arc<AppContext>>,
    jar: CookieJar,
    Json(body): Json<LoginBody>,
) -> Result<(CookieJar, Json<LoginInfo>), ApiError> {
    let users = Repository::<User>::new(ctx.db.clone())?;
    let found = users
        .select("\"name\" = $1 LIMIT 1", &[json!(body.user)])
        .await?;

    let user = match found.into_iter().next() {
        Some(user) if password::verify(&body.password, &user.password)? => user,
        _ => {
            warn!(user = %body.user, "login rejected");
            return Err(session::AuthError::BadCredentials.into());
        }
    };

    let token = ctx.sessions.issue(SessionClaims { uid: user.uid })?;
    let jar = jar.add(session::session_cookie(token, ctx.sessions.lifetime_secs()));

    info!(uid = user.uid, "login succeeded");
    Ok((
        jar,
        Json(LoginInfo {
            uid: user.uid,
            name: user.name,
            admin: user.admin,
            logged_in: true,
        }),
    ))
}

/// POST /api/logout: clear the cookie. Nothing happens server-side; the
/// token itself stays valid until its natural expiry.
pub async fn logout(jar: CookieJar) -> (CookieJar, StatusCode) {
    (jar.add(session::clear_session_cookie()), StatusCode::OK)
}

/// GET /api/welcome: who am I, re-read fresh from storage.
///
/// A valid token naming a user that no longer exists clears the cookie.
/// The admin flag is taken from the same fresh select rather than
/// [`session::is_admin`], since this handler needs the row anyway to
/// distinguish a vanished user from a non-admin one.
pub async fn welcome(
    State(ctx): State<Arc<AppContext>>,
    jar: CookieJar,
) -> Result<Response, ApiError> {
    let uid = session_uid(&ctx, &jar)?;

    let users = Repository::<User>::new(ctx.db.clone())?;
    let found = users.select("\"uid\" = $1 LIMIT 1", &[json!(uid)]).await?;

    match found.into_iter().next() {
        Some(user) => Ok(Json(WelcomeInfo {
            uid: user.uid,
            admin: user.admin,
            logged_in: true,
        })
        .into_response()),
        None => {
            warn!(uid, "session names an unknown user; clearing cookie");
            let jar = jar.add(session::clear_session_cookie());
            Ok((StatusCode::FORBIDDEN, jar, "unknown user").into_response())
        }
    }
}
