use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Form, Json,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::session::CurrentUser,
    flash::{self, FlashMessages},
    posts::dto::{EditPostPage, FeedPage, PostForm, PostPage, PostView, SearchForm, SearchPage},
    posts::repo::Post,
    sanitize::strip_markup,
    state::AppState,
    users::repo::User,
};

/// Only the author may edit a post.
fn may_edit(post: &Post, user: &User) -> bool {
    post.user_id == user.id
}

/// GET / — home feed plus the compose form context.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    messages: FlashMessages,
) -> Result<Response, (StatusCode, String)> {
    let posts = Post::list_all_desc(&state.db).await.map_err(internal)?;
    let (headers, messages) = messages.take();
    Ok((
        headers,
        Json(FeedPage {
            title: "Home Page",
            posts: posts.into_iter().map(PostView::from).collect(),
            messages,
        }),
    )
        .into_response())
}

/// POST / — create a post authored by the current principal.
#[instrument(skip_all)]
pub async fn compose(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<PostForm>,
) -> Result<Response, (StatusCode, String)> {
    let body = strip_markup(&form.body);
    if body.trim().is_empty() {
        return Ok(flash::redirect("/", "Post cannot be empty").into_response());
    }

    let post = Post::create(&state.db, user.id, &body)
        .await
        .map_err(internal)?;
    info!(post_id = %post.id, user_id = %user.id, "post created");
    Ok(flash::redirect("/", "Your post is now live!").into_response())
}

/// GET /explore — the global feed, most recent first.
#[instrument(skip_all)]
pub async fn explore(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    messages: FlashMessages,
) -> Result<Response, (StatusCode, String)> {
    let posts = Post::list_all_desc(&state.db).await.map_err(internal)?;
    let (headers, messages) = messages.take();
    Ok((
        headers,
        Json(FeedPage {
            title: "Explore",
            posts: posts.into_iter().map(PostView::from).collect(),
            messages,
        }),
    )
        .into_response())
}

/// GET /posts/:id — single post view.
#[instrument(skip_all)]
pub async fn show(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<Uuid>,
    messages: FlashMessages,
) -> Result<Response, (StatusCode, String)> {
    let post = Post::find_with_author(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Post not found".to_string()))?;
    let (headers, messages) = messages.take();
    Ok((
        headers,
        Json(PostPage {
            post: PostView::from(post),
            messages,
        }),
    )
        .into_response())
}

/// GET /posts/edit/:id — pre-filled edit form; non-authors get a soft denial.
#[instrument(skip_all)]
pub async fn edit_page(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    messages: FlashMessages,
) -> Result<Response, (StatusCode, String)> {
    let post = Post::find(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Post not found".to_string()))?;

    if !may_edit(&post, &user) {
        warn!(post_id = %post.id, user_id = %user.id, "edit form denied, not the author");
        return Ok(
            flash::redirect("/explore", "You are not authorized to edit this post...")
                .into_response(),
        );
    }

    let (headers, messages) = messages.take();
    Ok((
        headers,
        Json(EditPostPage {
            post_id: post.id,
            body: post.body,
            messages,
        }),
    )
        .into_response())
}

/// POST /posts/edit/:id — overwrite the body only; author and timestamp are
/// untouched.
#[instrument(skip_all)]
pub async fn edit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Form(form): Form<PostForm>,
) -> Result<Response, (StatusCode, String)> {
    let post = Post::find(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Post not found".to_string()))?;

    if !may_edit(&post, &user) {
        warn!(post_id = %post.id, user_id = %user.id, "edit denied, not the author");
        return Ok(
            flash::redirect("/explore", "You are not authorized to edit this post...")
                .into_response(),
        );
    }

    let body = strip_markup(&form.body);
    if body.trim().is_empty() {
        return Ok(
            flash::redirect(&format!("/posts/edit/{}", post.id), "Post cannot be empty")
                .into_response(),
        );
    }

    Post::update_body(&state.db, post.id, &body)
        .await
        .map_err(internal)?;
    info!(post_id = %post.id, user_id = %user.id, "post updated");
    Ok(
        flash::redirect(&format!("/posts/{}", post.id), "Your post has been updated!")
            .into_response(),
    )
}

/// GET /posts/delete/:id — any authenticated user may delete any post; a
/// persistence failure is recovered locally and the feed re-renders either
/// way.
#[instrument(skip_all)]
pub async fn delete(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Response, (StatusCode, String)> {
    let post = Post::find(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Post not found".to_string()))?;

    let message = match Post::delete(&state.db, post.id).await {
        Ok(()) => {
            info!(post_id = %post.id, user_id = %user.id, "post deleted");
            "Your post was deleted!"
        }
        Err(e) => {
            error!(error = %e, post_id = %post.id, "post delete failed");
            "Whoops, there was a problem deleting post, try again!"
        }
    };

    let posts = Post::list_all_desc(&state.db).await.map_err(internal)?;
    Ok(Json(FeedPage {
        title: "Explore",
        posts: posts.into_iter().map(PostView::from).collect(),
        messages: vec![message.to_string()],
    })
    .into_response())
}

/// POST /search — case-sensitive substring search over post bodies.
#[instrument(skip_all)]
pub async fn search(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Form(form): Form<SearchForm>,
) -> Result<Response, (StatusCode, String)> {
    if form.q.trim().is_empty() {
        return Ok(
            flash::redirect("/explore", "You must enter a value in the search box")
                .into_response(),
        );
    }

    let searched = strip_markup(&form.q);
    let posts = Post::search(&state.db, &searched).await.map_err(internal)?;
    Ok(Json(SearchPage {
        searched,
        posts: posts.into_iter().map(PostView::from).collect(),
        messages: Vec::new(),
    })
    .into_response())
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    error!(error = %e, "internal error");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: "x".into(),
            about_me: String::new(),
            last_seen: None,
            is_approved: true,
            role: "user".into(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    fn sample_post(user_id: Uuid) -> Post {
        Post {
            id: Uuid::new_v4(),
            user_id,
            body: "hello".into(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn authors_may_edit_their_own_posts() {
        let author = sample_user();
        let post = sample_post(author.id);
        assert!(may_edit(&post, &author));
    }

    #[test]
    fn non_authors_may_not_edit() {
        let post = sample_post(Uuid::new_v4());
        let other = sample_user();
        assert!(!may_edit(&post, &other));
    }

    #[test]
    fn an_admin_is_still_not_an_author() {
        let mut admin = sample_user();
        admin.role = "admin".into();
        let post = sample_post(Uuid::new_v4());
        assert!(!may_edit(&post, &admin));
    }
}
