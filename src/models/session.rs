use serde::{Deserialize, Serialize};

// Response of the backend's `/token` endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

pub fn default_token_type() -> String {
    "bearer".to_string()
}

// Response of the backend's `/user/me` endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// Explicit session context, created at login and dropped at logout.
///
/// Everything that used to be read from ambient browser storage (the user
/// id, the access token) travels through this value instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: UserProfile,
    pub access_token: String,
}

impl Session {
    pub fn new(user: UserProfile, access_token: String) -> Self {
        Self { user, access_token }
    }

    pub fn user_id(&self) -> i64 {
        self.user.id
    }
}
