//! Cookie-backed sessions: a signed token maps the browser session to a user
//! id, and extractors resolve the principal once per request.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Request, State},
    http::{header::SET_COOKIE, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    auth::dto::{Claims, SessionKeys},
    config::SessionConfig,
    cookies, flash,
    state::AppState,
    users::repo::User,
};

pub const SESSION_COOKIE: &str = "session";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no session cookie")]
    Missing,
    #[error("invalid or expired session token")]
    Invalid(#[from] jsonwebtoken::errors::Error),
}

impl FromRef<AppState> for SessionKeys {
    fn from_ref(state: &AppState) -> Self {
        let SessionConfig {
            secret,
            issuer,
            audience,
            ttl_minutes,
            remember_ttl_minutes,
        } = state.config.session.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            audience,
            ttl: Duration::from_secs((ttl_minutes as u64) * 60),
            remember_ttl: Duration::from_secs((remember_ttl_minutes as u64) * 60),
        }
    }
}

impl SessionKeys {
    pub fn sign(&self, user_id: Uuid, remember: bool) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let ttl = if remember { self.remember_ttl } else { self.ttl };
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, remember, "session token signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, SessionError> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }

    /// Resolves the principal's id from the request's session cookie.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Uuid, SessionError> {
        let token = cookies::get(headers, SESSION_COOKIE).ok_or(SessionError::Missing)?;
        Ok(self.verify(&token)?.sub)
    }
}

/// `Set-Cookie` headers establishing a session. With `remember` the cookie
/// outlives the browser session via Max-Age; otherwise it is session-scoped.
pub fn login_headers(
    keys: &SessionKeys,
    user_id: Uuid,
    remember: bool,
) -> anyhow::Result<HeaderMap> {
    let token = keys.sign(user_id, remember)?;
    let max_age = remember.then(|| keys.remember_ttl.as_secs() as i64);
    let mut headers = HeaderMap::new();
    headers.insert(
        SET_COOKIE,
        cookies::set(SESSION_COOKIE, &token, max_age).parse()?,
    );
    Ok(headers)
}

/// `Set-Cookie` headers that drop the session.
pub fn logout_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, cookies::clear(SESSION_COOKIE).parse().unwrap());
    headers
}

/// Validates the post-login redirect target: only same-origin relative paths
/// are honored, anything carrying a scheme or network location falls back to
/// the home route.
pub fn resolve_next(next: Option<&str>) -> String {
    match next {
        Some(target) if is_safe_redirect(target) => target.to_string(),
        _ => "/".to_string(),
    }
}

fn is_safe_redirect(target: &str) -> bool {
    target.starts_with('/')
        && !target.starts_with("//")
        && !target.contains("://")
        && !target.contains('\\')
}

/// The authenticated principal, resolved once per request from the session
/// cookie. Anonymous requests are redirected to the login page with the
/// intended destination preserved.
pub struct CurrentUser(pub User);

pub struct AuthRedirect(String);

impl IntoResponse for AuthRedirect {
    fn into_response(self) -> Response {
        Redirect::to(&format!("/login?next={}", self.0)).into_response()
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AuthRedirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let intended = parts.uri.path().to_string();
        let keys = SessionKeys::from_ref(state);
        let user_id = match keys.authenticate(&parts.headers) {
            Ok(id) => id,
            Err(SessionError::Missing) => return Err(AuthRedirect(intended)),
            Err(SessionError::Invalid(e)) => {
                warn!(error = %e, "rejected session token");
                return Err(AuthRedirect(intended));
            }
        };
        let user = User::find_by_id(&state.db, user_id)
            .await
            .ok()
            .flatten()
            .ok_or(AuthRedirect(intended))?;
        Ok(CurrentUser(user))
    }
}

/// Admin precondition layered on top of authentication. Authentication is
/// always checked first; an authenticated non-admin gets a soft denial.
pub struct AdminUser(pub User);

pub enum AdminRejection {
    Unauthenticated(AuthRedirect),
    Forbidden,
}

impl IntoResponse for AdminRejection {
    fn into_response(self) -> Response {
        match self {
            AdminRejection::Unauthenticated(redirect) => redirect.into_response(),
            AdminRejection::Forbidden => {
                flash::redirect("/explore", "You do not have permission to access this page")
                    .into_response()
            }
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AdminRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state)
            .await
            .map_err(AdminRejection::Unauthenticated)?;
        if !user.is_admin() {
            return Err(AdminRejection::Forbidden);
        }
        Ok(AdminUser(user))
    }
}

/// The principal if present, `None` for anonymous. Never rejects; used by
/// routes open to everyone that branch on authentication.
pub struct MaybeUser(pub Option<User>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state)
            .await
            .ok()
            .map(|current| current.0);
        Ok(MaybeUser(user))
    }
}

/// Middleware run before every handler: stamps `last_seen` for authenticated
/// requests in its own small statement. Failures are logged, never surfaced.
pub async fn touch_last_seen(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let keys = SessionKeys::from_ref(&state);
    if let Ok(user_id) = keys.authenticate(request.headers()) {
        if let Err(e) = User::touch_last_seen(&state.db, user_id).await {
            warn!(error = %e, user_id = %user_id, "last_seen update failed");
        }
    }
    next.run(request).await
}

#[cfg(test)]
mod token_tests {
    use super::*;
    use axum::http::{header, HeaderValue};

    fn make_keys() -> SessionKeys {
        let state = AppState::fake();
        SessionKeys::from_ref(&state)
    }

    #[tokio::test]
    async fn sign_and_verify_roundtrip() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let token = keys.sign(user_id, false).expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
    }

    #[tokio::test]
    async fn verify_rejects_tampered_token() {
        let keys = make_keys();
        let mut token = keys.sign(Uuid::new_v4(), false).expect("sign");
        token.push('x');
        assert!(matches!(keys.verify(&token), Err(SessionError::Invalid(_))));
    }

    #[tokio::test]
    async fn authenticate_reads_the_session_cookie() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let token = keys.sign(user_id, true).expect("sign");

        let mut headers = HeaderMap::new();
        let raw = format!("other=1; {}={}", SESSION_COOKIE, token);
        headers.insert(header::COOKIE, HeaderValue::from_str(&raw).unwrap());
        assert_eq!(keys.authenticate(&headers).expect("authenticate"), user_id);

        assert!(matches!(
            keys.authenticate(&HeaderMap::new()),
            Err(SessionError::Missing)
        ));
    }

    #[tokio::test]
    async fn remember_controls_cookie_longevity() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();

        let headers = login_headers(&keys, user_id, true).expect("login headers");
        let cookie = headers.get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.contains("Max-Age="));

        let headers = login_headers(&keys, user_id, false).expect("login headers");
        let cookie = headers.get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(!cookie.contains("Max-Age="));
    }

    #[test]
    fn logout_drops_the_cookie() {
        let cookie = logout_headers();
        let value = cookie.get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(value.starts_with("session="));
        assert!(value.contains("Max-Age=0"));
    }
}

#[cfg(test)]
mod redirect_tests {
    use super::*;

    #[test]
    fn relative_paths_are_honored() {
        assert_eq!(resolve_next(Some("/explore")), "/explore");
        assert_eq!(resolve_next(Some("/posts/edit/abc")), "/posts/edit/abc");
    }

    #[test]
    fn network_locations_fall_back_to_home() {
        assert_eq!(resolve_next(Some("https://evil.example/x")), "/");
        assert_eq!(resolve_next(Some("//evil.example/x")), "/");
        assert_eq!(resolve_next(Some("http://evil.example")), "/");
        assert_eq!(resolve_next(Some(r"/\evil.example")), "/");
    }

    #[test]
    fn missing_or_odd_targets_fall_back_to_home() {
        assert_eq!(resolve_next(None), "/");
        assert_eq!(resolve_next(Some("")), "/");
        assert_eq!(resolve_next(Some("explore")), "/");
    }
}
