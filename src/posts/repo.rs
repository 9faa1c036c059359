use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Post record in the database. Author and timestamp never change after
/// creation; only the body is mutable.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub body: String,
    pub created_at: OffsetDateTime,
}

/// Post joined with its author's username, the shape every listing renders.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PostWithAuthor {
    pub id: Uuid,
    pub user_id: Uuid,
    pub author: String,
    pub body: String,
    pub created_at: OffsetDateTime,
}

/// Escapes LIKE metacharacters so the query text matches literally.
fn escape_like(query: &str) -> String {
    query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

impl Post {
    pub async fn create(db: &PgPool, user_id: Uuid, body: &str) -> anyhow::Result<Post> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (user_id, body)
            VALUES ($1, $2)
            RETURNING id, user_id, body, created_at
            "#,
        )
        .bind(user_id)
        .bind(body)
        .fetch_one(db)
        .await?;
        Ok(post)
    }

    pub async fn find(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, user_id, body, created_at
            FROM posts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(post)
    }

    pub async fn find_with_author(db: &PgPool, id: Uuid) -> anyhow::Result<Option<PostWithAuthor>> {
        let post = sqlx::query_as::<_, PostWithAuthor>(
            r#"
            SELECT p.id, p.user_id, u.username AS author, p.body, p.created_at
            FROM posts p
            JOIN users u ON u.id = p.user_id
            WHERE p.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(post)
    }

    /// Global feed: every post, most recent first, materialized.
    pub async fn list_all_desc(db: &PgPool) -> anyhow::Result<Vec<PostWithAuthor>> {
        let posts = sqlx::query_as::<_, PostWithAuthor>(
            r#"
            SELECT p.id, p.user_id, u.username AS author, p.body, p.created_at
            FROM posts p
            JOIN users u ON u.id = p.user_id
            ORDER BY p.created_at DESC
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(posts)
    }

    pub async fn list_by_author(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<PostWithAuthor>> {
        let posts = sqlx::query_as::<_, PostWithAuthor>(
            r#"
            SELECT p.id, p.user_id, u.username AS author, p.body, p.created_at
            FROM posts p
            JOIN users u ON u.id = p.user_id
            WHERE p.user_id = $1
            ORDER BY p.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(posts)
    }

    /// Case-sensitive substring match on the body, oldest first.
    pub async fn search(db: &PgPool, query: &str) -> anyhow::Result<Vec<PostWithAuthor>> {
        let pattern = format!("%{}%", escape_like(query));
        let posts = sqlx::query_as::<_, PostWithAuthor>(
            r#"
            SELECT p.id, p.user_id, u.username AS author, p.body, p.created_at
            FROM posts p
            JOIN users u ON u.id = p.user_id
            WHERE p.body LIKE $1
            ORDER BY p.created_at
            "#,
        )
        .bind(pattern)
        .fetch_all(db)
        .await?;
        Ok(posts)
    }

    /// Body is the only mutable column.
    pub async fn update_body(db: &PgPool, id: Uuid, body: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE posts SET body = $2 WHERE id = $1")
            .bind(id)
            .bind(body)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_like_makes_metacharacters_literal() {
        assert_eq!(escape_like("plain words"), "plain words");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("under_score"), "under\\_score");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
    }
}
