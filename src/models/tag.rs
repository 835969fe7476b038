use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Color assigned to tags created without an explicit color.
pub const DEFAULT_TAG_COLOR: &str = "#3B82F6";

lazy_static! {
    // 6-hex-digit RGB with leading '#', case-insensitive.
    static ref COLOR_REGEX: regex::Regex = regex::Regex::new(r"^#[0-9A-Fa-f]{6}$").unwrap();
}

/// A user-scoped label. (name, user_id) is unique: two users may both own a
/// "Work" tag, one user may not own two.
#[derive(Debug, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: i32,
    pub name: String,
    pub color: String,
    pub user_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a tag.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TagInput {
    /// Tag name, 1 to 50 characters.
    #[validate(length(min = 1, max = 50))]
    pub name: String,

    /// Optional color; defaults to [`DEFAULT_TAG_COLOR`] when omitted.
    #[validate(regex(path = "COLOR_REGEX", message = "Color must be a valid hex color"))]
    pub color: Option<String>,
}

/// Payload for updating a tag. Absent fields keep their current value.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TagUpdateInput {
    #[validate(length(min = 1, max = 50))]
    pub name: Option<String>,

    #[validate(regex(path = "COLOR_REGEX", message = "Color must be a valid hex color"))]
    pub color: Option<String>,
}
