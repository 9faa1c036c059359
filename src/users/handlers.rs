use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Form, Json,
};
use tracing::{error, info, instrument};

use crate::{
    auth::session::CurrentUser,
    flash::{self, FlashMessages},
    posts::dto::PostView,
    posts::repo::Post,
    sanitize::strip_markup,
    state::AppState,
    users::dto::{EditProfileForm, EditProfilePage, ProfilePage, PublicProfile},
    users::repo::User,
};

/// GET /user/:username — public profile view.
///
/// The post list is keyed on the viewer's id, not the profile's target, so
/// visiting someone else's profile shows the viewer's own posts. Kept as-is;
/// see DESIGN.md.
#[instrument(skip_all)]
pub async fn profile(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Path(username): Path<String>,
    messages: FlashMessages,
) -> Result<Response, (StatusCode, String)> {
    let target = User::find_by_username(&state.db, &username)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "User not found".to_string()))?;

    let posts = Post::list_by_author(&state.db, viewer.id)
        .await
        .map_err(internal)?;

    let (headers, messages) = messages.take();
    Ok((
        headers,
        Json(ProfilePage {
            user: PublicProfile::from(target),
            posts: posts.into_iter().map(PostView::from).collect(),
            messages,
        }),
    )
        .into_response())
}

/// GET /edit_profile — pre-filled form for the current principal.
#[instrument(skip_all)]
pub async fn edit_profile_page(
    CurrentUser(user): CurrentUser,
    messages: FlashMessages,
) -> Response {
    let (headers, messages) = messages.take();
    (
        headers,
        Json(EditProfilePage {
            username: user.username,
            about_me: user.about_me,
            messages,
        }),
    )
        .into_response()
}

/// POST /edit_profile — always edits the current principal.
#[instrument(skip_all)]
pub async fn edit_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<EditProfileForm>,
) -> Result<Response, (StatusCode, String)> {
    let username = form.username.trim();
    if username.is_empty() {
        return Ok(flash::redirect("/edit_profile", "Username is required").into_response());
    }

    match User::username_taken(&state.db, username, Some(user.id)).await {
        Ok(true) => {
            return Ok(
                flash::redirect("/edit_profile", "Please use a different username.")
                    .into_response(),
            )
        }
        Ok(false) => {}
        Err(e) => return Err(internal(e)),
    }

    let about_me = strip_markup(&form.about_me);
    User::update_profile(&state.db, user.id, username, &about_me)
        .await
        .map_err(internal)?;

    info!(user_id = %user.id, "profile updated");
    Ok(flash::redirect("/edit_profile", "Your changes have been saved.").into_response())
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    error!(error = %e, "internal error");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
