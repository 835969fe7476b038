pub mod extractors;
pub mod federation;
pub mod middleware;
pub mod password;
pub mod token;

use crate::models::User;
use serde::{Deserialize, Serialize};
use validator::Validate;

// Re-export necessary items
pub use extractors::AuthenticatedUserId;
pub use middleware::AuthMiddleware;
pub use password::{hash_password, verify_password};
pub use token::{generate_token, verify_token, Claims};

/// Represents the payload for a user login request.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// User's email address.
    /// Must be a valid email format.
    #[validate(email)]
    pub email: String,
    /// User's password.
    /// Must be at least 6 characters long.
    #[validate(length(min = 6))]
    pub password: String,
}

/// Represents the payload for a new user registration request.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Email address for the new account.
    /// Must be a valid email format. Stored lowercased.
    #[validate(email)]
    pub email: String,
    /// Display name for the new account, 2 to 50 characters.
    #[validate(length(min = 2, max = 50))]
    pub name: String,
    /// Password for the new account.
    /// Must be at least 6 characters long.
    #[validate(length(min = 6))]
    pub password: String,
}

/// Response structure after successful authentication (registration, login
/// or a completed federated handshake). Carries the bearer token and the
/// hash-excluded user view.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    /// The signed token for subsequent requests.
    pub token: String,
    /// The authenticated account.
    pub user: User,
}
