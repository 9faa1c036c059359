use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// The two known roles. Stored as plain text in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub about_me: String,
    pub last_seen: Option<OffsetDateTime>,
    pub is_approved: bool,
    pub role: String,
    pub created_at: OffsetDateTime,
}

/// Registration never takes approval state or role from the caller: every new
/// account starts behind the approval gate with the plain user role.
const CREATE_USER_SQL: &str = r#"
    INSERT INTO users (username, email, password_hash, is_approved, role)
    VALUES ($1, $2, $3, FALSE, 'user')
    RETURNING id, username, email, password_hash, about_me, last_seen,
              is_approved, role, created_at
    "#;

impl User {
    pub fn is_admin(&self) -> bool {
        Role::parse(&self.role) == Some(Role::Admin)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, about_me, last_seen,
                   is_approved, role, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_username(db: &PgPool, username: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, about_me, last_seen,
                   is_approved, role, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Creates an account pending approval: `is_approved` false, role `user`.
    pub async fn create(
        db: &PgPool,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(CREATE_USER_SQL)
            .bind(username)
            .bind(email)
            .bind(password_hash)
            .fetch_one(db)
            .await?;
        Ok(user)
    }

    pub async fn username_taken(
        db: &PgPool,
        username: &str,
        exclude: Option<Uuid>,
    ) -> anyhow::Result<bool> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM users WHERE username = $1 AND ($2::uuid IS NULL OR id <> $2)",
        )
        .bind(username)
        .bind(exclude)
        .fetch_optional(db)
        .await?;
        Ok(row.is_some())
    }

    pub async fn email_taken(db: &PgPool, email: &str) -> anyhow::Result<bool> {
        let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(db)
            .await?;
        Ok(row.is_some())
    }

    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        username: &str,
        about_me: &str,
    ) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET username = $2, about_me = $3 WHERE id = $1")
            .bind(id)
            .bind(username)
            .bind(about_me)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Stamps the user's last activity. One small statement committed on its
    /// own, run before the main handler on every authenticated request.
    pub async fn touch_last_seen(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET last_seen = now() WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, about_me, last_seen,
                   is_approved, role, created_at
            FROM users
            ORDER BY created_at
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(users)
    }

    /// Idempotent: approving an already-approved account is a no-op in effect.
    pub async fn approve(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET is_approved = TRUE WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn set_role(db: &PgPool, id: Uuid, role: Role) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET role = $2 WHERE id = $1")
            .bind(id)
            .bind(role.as_str())
            .execute(db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_only_known_values() {
        assert_eq!(Role::parse("user"), Some(Role::User));
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("superuser"), None);
        assert_eq!(Role::parse(""), None);
        assert_eq!(Role::parse("Admin"), None);
    }

    #[test]
    fn role_round_trips_through_as_str() {
        for role in [Role::User, Role::Admin] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
    }

    #[test]
    fn new_accounts_start_unapproved_with_user_role() {
        // Registration input can never smuggle in approval or a role.
        assert!(CREATE_USER_SQL.contains("VALUES ($1, $2, $3, FALSE, 'user')"));
        assert_eq!(CREATE_USER_SQL.matches('$').count(), 3);
    }

    #[test]
    fn is_admin_follows_role_column() {
        let mut user = sample_user();
        assert!(!user.is_admin());
        user.role = "admin".into();
        assert!(user.is_admin());
        user.role = "superuser".into();
        assert!(!user.is_admin());
    }

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: "x".into(),
            about_me: String::new(),
            last_seen: None,
            is_approved: false,
            role: "user".into(),
            created_at: OffsetDateTime::now_utc(),
        }
    }
}
