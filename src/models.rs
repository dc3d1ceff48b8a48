use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// Auth API session format
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct Session {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub expires_at: Option<i64>, // unix seconds
    pub refresh_token: String,
    pub user: User,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl Session {
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(at) => at <= Utc::now().timestamp(),
            None => false,
        }
    }
}

// Auth API user format
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user_metadata: Value,
    #[serde(default)]
    pub app_metadata: Value,
}

// Email/password credentials sent to the auth API
#[derive(Serialize)]
pub(crate) struct Credentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Serialize)]
pub(crate) struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

// Sign-up returns a session when autoconfirm is on, a bare user otherwise
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum SignUpResponse {
    Session(Session),
    User(User),
}

// Storage object as listed or removed
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct FileObject {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct UploadResponse {
    #[serde(rename = "Key")]
    pub key: String,
}

#[derive(Serialize, Clone, Debug)]
pub struct ListOptions {
    pub prefix: String,
    pub limit: u32,
    pub offset: u32,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            limit: 100,
            offset: 0,
        }
    }
}

#[derive(Serialize)]
pub(crate) struct RemoveRequest<'a> {
    pub prefixes: &'a [&'a str],
}
