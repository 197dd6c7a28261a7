use serde::{Deserialize, Serialize};

/// JWT payload used for authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    pub email: String,
    pub iat: i64,    // issued at (unix timestamp)
    pub iss: String, // issuer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>, // absent when expiry is disabled
}
