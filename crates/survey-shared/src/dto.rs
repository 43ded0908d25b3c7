//! Data Transfer Objects - request/response types for the API.

use serde::{Deserialize, Serialize};

/// Request to login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response containing authentication tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// The authenticated principal as seen by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrincipalResponse {
    pub id: String,
    pub kind: String,
    pub email: String,
}

/// One row of the rate limit policy table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitPolicyResponse {
    pub scope: String,
    pub max_attempts: u32,
    pub window_seconds: u64,
}

/// Query string for paginated listings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PageQuery {
    #[serde(default = "PageQuery::default_page")]
    pub page: u64,
    #[serde(default = "PageQuery::default_per_page")]
    pub per_page: u64,
}

impl PageQuery {
    pub const MAX_PER_PAGE: u64 = 100;

    fn default_page() -> u64 {
        1
    }

    fn default_per_page() -> u64 {
        15
    }
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: Self::default_page(),
            per_page: Self::default_per_page(),
        }
    }
}
