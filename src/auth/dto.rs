use serde::{Deserialize, Serialize};

/// Request body for user registration. Fields are optional so presence can
/// be validated with field-specific messages instead of a serde reject.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub user_password: Option<String>,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub user_email: Option<String>,
    pub user_password: Option<String>,
}

/// Response returned after a successful login.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}
