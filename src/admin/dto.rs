use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::repo::User;

/// One row of the admin user list.
#[derive(Debug, Serialize)]
pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_approved: bool,
    pub role: String,
    pub last_seen: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

impl From<User> for UserRow {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            is_approved: user.is_approved,
            role: user.role,
            last_seen: user.last_seen,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserListPage {
    pub users: Vec<UserRow>,
    pub messages: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetRoleForm {
    pub role: String,
}
