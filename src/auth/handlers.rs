use axum::{
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthPage, LoginForm, NextQuery, RegisterForm, SessionKeys},
        password::{hash_password, verify_password},
        session::{self, MaybeUser},
    },
    flash::{self, FlashMessages},
    state::AppState,
    users::repo::User,
};

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Field-level checks for a registration submission. Uniqueness is checked
/// separately against the store.
fn validate_registration(form: &RegisterForm) -> Result<(), &'static str> {
    if form.username.trim().is_empty() {
        return Err("Username is required");
    }
    if !is_valid_email(&form.email) {
        return Err("Invalid email address");
    }
    if form.password.len() < 8 {
        return Err("Password must be at least 8 characters");
    }
    if form.password != form.password2 {
        return Err("Passwords do not match");
    }
    Ok(())
}

#[instrument(skip_all)]
pub async fn login_page(MaybeUser(current): MaybeUser, messages: FlashMessages) -> Response {
    if current.is_some() {
        return Redirect::to("/").into_response();
    }
    let (headers, messages) = messages.take();
    (
        headers,
        Json(AuthPage {
            title: "Sign In",
            messages,
        }),
    )
        .into_response()
}

#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    MaybeUser(current): MaybeUser,
    Query(query): Query<NextQuery>,
    Form(form): Form<LoginForm>,
) -> Response {
    if current.is_some() {
        return Redirect::to("/").into_response();
    }

    let user = match User::find_by_username(&state.db, &form.username).await {
        Ok(u) => u,
        Err(e) => return internal(e).into_response(),
    };

    // Same message for unknown username and wrong password.
    let Some(user) = user else {
        warn!(username = %form.username, "login with unknown username");
        return flash::redirect("/login", "Invalid username or password").into_response();
    };
    let ok = match verify_password(&form.password, &user.password_hash) {
        Ok(v) => v,
        Err(e) => return internal(e).into_response(),
    };
    if !ok {
        warn!(user_id = %user.id, "login with invalid password");
        return flash::redirect("/login", "Invalid username or password").into_response();
    }

    if !user.is_approved {
        info!(user_id = %user.id, "login blocked, account pending approval");
        return flash::redirect("/login", "Your account is pending approval").into_response();
    }

    let keys = SessionKeys::from_ref(&state);
    let headers = match session::login_headers(&keys, user.id, form.remember_me.is_some()) {
        Ok(h) => h,
        Err(e) => return internal(e).into_response(),
    };

    info!(user_id = %user.id, username = %user.username, "user logged in");
    let dest = session::resolve_next(query.next.as_deref());
    (headers, Redirect::to(&dest)).into_response()
}

/// No precondition: clearing an absent session is fine.
#[instrument(skip_all)]
pub async fn logout() -> impl IntoResponse {
    (session::logout_headers(), Redirect::to("/"))
}

#[instrument(skip_all)]
pub async fn register_page(MaybeUser(current): MaybeUser, messages: FlashMessages) -> Response {
    if current.is_some() {
        return Redirect::to("/").into_response();
    }
    let (headers, messages) = messages.take();
    (
        headers,
        Json(AuthPage {
            title: "Register",
            messages,
        }),
    )
        .into_response()
}

#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    MaybeUser(current): MaybeUser,
    Form(form): Form<RegisterForm>,
) -> Response {
    if current.is_some() {
        return Redirect::to("/").into_response();
    }

    if let Err(reason) = validate_registration(&form) {
        return flash::redirect("/register", reason).into_response();
    }
    let username = form.username.trim();

    match User::username_taken(&state.db, username, None).await {
        Ok(true) => {
            return flash::redirect("/register", "Please use a different username.")
                .into_response()
        }
        Ok(false) => {}
        Err(e) => return internal(e).into_response(),
    }
    match User::email_taken(&state.db, &form.email).await {
        Ok(true) => {
            return flash::redirect("/register", "Please use a different email address.")
                .into_response()
        }
        Ok(false) => {}
        Err(e) => return internal(e).into_response(),
    }

    let hash = match hash_password(&form.password) {
        Ok(h) => h,
        Err(e) => return internal(e).into_response(),
    };

    // The account starts unapproved and is never auto-authenticated.
    let user = match User::create(&state.db, username, &form.email, &hash).await {
        Ok(u) => u,
        Err(e) => return internal(e).into_response(),
    };

    info!(user_id = %user.id, username = %user.username, "user registered, pending approval");
    flash::redirect(
        "/login",
        "Registration successful! Please wait for admin approval.",
    )
    .into_response()
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    error!(error = %e, "internal error");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> RegisterForm {
        RegisterForm {
            username: "alice".into(),
            email: "alice@example.com".into(),
            password: "longenough".into(),
            password2: "longenough".into(),
        }
    }

    #[test]
    fn valid_registration_passes() {
        assert!(validate_registration(&valid_form()).is_ok());
    }

    #[test]
    fn blank_username_is_rejected() {
        let mut form = valid_form();
        form.username = "   ".into();
        assert!(validate_registration(&form).is_err());
    }

    #[test]
    fn bad_email_is_rejected() {
        let mut form = valid_form();
        form.email = "not-an-email".into();
        assert!(validate_registration(&form).is_err());
    }

    #[test]
    fn short_password_is_rejected() {
        let mut form = valid_form();
        form.password = "short".into();
        form.password2 = "short".into();
        assert!(validate_registration(&form).is_err());
    }

    #[test]
    fn mismatched_confirmation_is_rejected() {
        let mut form = valid_form();
        form.password2 = "different-pass".into();
        assert_eq!(
            validate_registration(&form),
            Err("Passwords do not match")
        );
    }

    #[test]
    fn email_regex_accepts_common_shapes() {
        assert!(is_valid_email("a@b.co"));
        assert!(is_valid_email("first.last+tag@sub.domain.org"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.d"));
    }
}
