use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The public view of a user account.
///
/// The password hash is deliberately absent: every SELECT that produces this
/// struct lists the columns explicitly, so the hash can never leak through a
/// serialized response. Accounts created through federated sign-in have no
/// hash at all.
#[derive(Debug, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i32,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Column list matching [`User`], for use in SELECT/RETURNING clauses.
pub const USER_COLUMNS: &str = "id, email, name, created_at, updated_at";

/// Lowercases an email address so the (email) unique constraint is
/// case-insensitive regardless of which sign-in path created the account.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
