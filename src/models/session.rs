use serde::Serialize;

/// One authenticated UI session.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: i64,
    pub token: String,
    pub username: String,
    pub is_admin: bool,
    pub created_at: String,  // TEXT, ISO8601
    pub expires_at: String,  // TEXT, ISO8601
}
