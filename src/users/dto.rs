use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::posts::dto::PostView;
use crate::users::repo::User;

/// Public slice of a user shown on their profile.
#[derive(Debug, Serialize)]
pub struct PublicProfile {
    pub id: Uuid,
    pub username: String,
    pub about_me: String,
    pub last_seen: Option<OffsetDateTime>,
}

impl From<User> for PublicProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            about_me: user.about_me,
            last_seen: user.last_seen,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfilePage {
    pub user: PublicProfile,
    pub posts: Vec<PostView>,
    pub messages: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct EditProfileForm {
    pub username: String,
    #[serde(default)]
    pub about_me: String,
}

/// Pre-filled edit-profile form context.
#[derive(Debug, Serialize)]
pub struct EditProfilePage {
    pub username: String,
    pub about_me: String,
    pub messages: Vec<String>,
}
