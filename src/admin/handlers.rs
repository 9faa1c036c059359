use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Form, Json,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    admin::dto::{SetRoleForm, UserListPage, UserRow},
    auth::session::AdminUser,
    flash::{self, FlashMessages},
    state::AppState,
    users::repo::{Role, User},
};

/// An admin may reassign anyone's role but their own.
fn role_change_allowed(target: &User, admin: &User) -> bool {
    target.id != admin.id
}

/// GET /admin/users — every account, unfiltered.
#[instrument(skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    messages: FlashMessages,
) -> Result<Response, (StatusCode, String)> {
    let users = User::list_all(&state.db).await.map_err(internal)?;
    let (headers, messages) = messages.take();
    Ok((
        headers,
        Json(UserListPage {
            users: users.into_iter().map(UserRow::from).collect(),
            messages,
        }),
    )
        .into_response())
}

/// POST /admin/approve/:id — flips the approval gate open. Idempotent.
#[instrument(skip_all)]
pub async fn approve_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Response, (StatusCode, String)> {
    let user = User::find_by_id(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "User not found".to_string()))?;

    User::approve(&state.db, user.id).await.map_err(internal)?;
    info!(user_id = %user.id, admin_id = %admin.id, "user approved");
    Ok(flash::redirect(
        "/admin/users",
        &format!("User {} has been approved.", user.username),
    )
    .into_response())
}

/// POST /admin/set-role/:id — assigns one of the two known roles. An admin
/// can never change their own role.
#[instrument(skip_all)]
pub async fn set_role(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Form(form): Form<SetRoleForm>,
) -> Result<Response, (StatusCode, String)> {
    let user = User::find_by_id(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "User not found".to_string()))?;

    if !role_change_allowed(&user, &admin) {
        warn!(admin_id = %admin.id, "admin attempted to change their own role");
        return Ok(
            flash::redirect("/admin/users", "You cannot change your own role").into_response(),
        );
    }

    match Role::parse(&form.role) {
        Some(role) => {
            User::set_role(&state.db, user.id, role)
                .await
                .map_err(internal)?;
            info!(user_id = %user.id, admin_id = %admin.id, role = role.as_str(), "role updated");
            Ok(flash::redirect(
                "/admin/users",
                &format!("{}'s role updated to {}.", user.username, role.as_str()),
            )
            .into_response())
        }
        None => {
            warn!(user_id = %user.id, requested = %form.role, "invalid role requested");
            Ok(flash::redirect("/admin/users", "Invalid role.").into_response())
        }
    }
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    error!(error = %e, "internal error");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn sample_user(role: &str) -> User {
        User {
            id: Uuid::new_v4(),
            username: "carol".into(),
            email: "carol@example.com".into(),
            password_hash: "x".into(),
            about_me: String::new(),
            last_seen: None,
            is_approved: true,
            role: role.into(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn admins_never_change_their_own_role() {
        let admin = sample_user("admin");
        assert!(!role_change_allowed(&admin, &admin));
    }

    #[test]
    fn other_accounts_can_be_reassigned() {
        let admin = sample_user("admin");
        let target = sample_user("user");
        assert!(role_change_allowed(&target, &admin));
    }
}
