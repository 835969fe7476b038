use crate::{
    auth::AuthenticatedUserId,
    error::AppError,
    models::{Tag, TagInput, TagUpdateInput, DEFAULT_TAG_COLOR},
};
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use sqlx::PgPool;
use validator::Validate;

const TAG_COLUMNS: &str = "id, name, color, user_id, created_at, updated_at";

/// Retrieves all tags owned by the authenticated user, ordered by name.
#[get("")]
pub async fn get_tags(
    pool: web::Data<PgPool>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let sql = format!(
        "SELECT {} FROM tags WHERE user_id = $1 ORDER BY name ASC",
        TAG_COLUMNS
    );
    let tags = sqlx::query_as::<_, Tag>(&sql)
        .bind(user_id.0)
        .fetch_all(&**pool)
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "tags": tags })))
}

/// Retrieves a single tag by id.
///
/// Another user's tag answers 404, the same as a nonexistent one.
#[get("/{id}")]
pub async fn get_tag(
    pool: web::Data<PgPool>,
    tag_id: web::Path<i32>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let sql = format!(
        "SELECT {} FROM tags WHERE id = $1 AND user_id = $2",
        TAG_COLUMNS
    );
    let tag = sqlx::query_as::<_, Tag>(&sql)
        .bind(tag_id.into_inner())
        .bind(user_id.0)
        .fetch_optional(&**pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Tag not found".into()))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "tag": tag })))
}

/// Creates a tag for the authenticated user.
///
/// The (name, user) pair must be unique; the color falls back to the
/// default when omitted.
#[post("")]
pub async fn create_tag(
    pool: web::Data<PgPool>,
    tag_data: web::Json<TagInput>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    tag_data.validate()?;

    let existing: Option<(i32,)> =
        sqlx::query_as("SELECT id FROM tags WHERE name = $1 AND user_id = $2")
            .bind(&tag_data.name)
            .bind(user_id.0)
            .fetch_optional(&**pool)
            .await?;

    if existing.is_some() {
        return Err(AppError::DuplicateName(
            "Tag with this name already exists".into(),
        ));
    }

    let color = tag_data
        .color
        .clone()
        .unwrap_or_else(|| DEFAULT_TAG_COLOR.to_string());

    let sql = format!(
        "INSERT INTO tags (name, color, user_id) VALUES ($1, $2, $3) RETURNING {}",
        TAG_COLUMNS
    );
    let tag = sqlx::query_as::<_, Tag>(&sql)
        .bind(&tag_data.name)
        .bind(&color)
        .bind(user_id.0)
        .fetch_one(&**pool)
        .await?;

    Ok(HttpResponse::Created().json(serde_json::json!({ "tag": tag })))
}

/// Updates a tag's name and/or color.
///
/// Absent fields keep their current value. Renaming onto another existing
/// tag of the same user fails; renaming a tag to its own current name is
/// not a collision.
#[put("/{id}")]
pub async fn update_tag(
    pool: web::Data<PgPool>,
    tag_id: web::Path<i32>,
    tag_data: web::Json<TagUpdateInput>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    tag_data.validate()?;
    let tag_id = tag_id.into_inner();

    let existing: Option<(String,)> =
        sqlx::query_as("SELECT name FROM tags WHERE id = $1 AND user_id = $2")
            .bind(tag_id)
            .bind(user_id.0)
            .fetch_optional(&**pool)
            .await?;

    let current_name = match existing {
        Some((name,)) => name,
        None => return Err(AppError::NotFound("Tag not found".into())),
    };

    if let Some(new_name) = &tag_data.name {
        if *new_name != current_name {
            let conflict: Option<(i32,)> = sqlx::query_as(
                "SELECT id FROM tags WHERE name = $1 AND user_id = $2 AND id <> $3",
            )
            .bind(new_name)
            .bind(user_id.0)
            .bind(tag_id)
            .fetch_optional(&**pool)
            .await?;

            if conflict.is_some() {
                return Err(AppError::DuplicateName(
                    "Tag with this name already exists".into(),
                ));
            }
        }
    }

    let sql = format!(
        "UPDATE tags
         SET name = COALESCE($1, name), color = COALESCE($2, color), updated_at = now()
         WHERE id = $3 AND user_id = $4
         RETURNING {}",
        TAG_COLUMNS
    );
    let tag = sqlx::query_as::<_, Tag>(&sql)
        .bind(&tag_data.name)
        .bind(&tag_data.color)
        .bind(tag_id)
        .bind(user_id.0)
        .fetch_one(&**pool)
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "tag": tag })))
}

/// Deletes a tag.
///
/// Association rows referencing the tag are removed by the store's cascade.
#[delete("/{id}")]
pub async fn delete_tag(
    pool: web::Data<PgPool>,
    tag_id: web::Path<i32>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let result = sqlx::query("DELETE FROM tags WHERE id = $1 AND user_id = $2")
        .bind(tag_id.into_inner())
        .bind(user_id.0)
        .execute(&**pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Tag not found".into()));
    }

    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use crate::models::{TagInput, TagUpdateInput};
    use validator::Validate;

    #[test]
    fn test_tag_input_boundaries() {
        let ok = TagInput {
            name: "Errand".to_string(),
            color: None,
        };
        assert!(ok.validate().is_ok());

        let bad_color = TagInput {
            name: "Errand".to_string(),
            color: Some("blue".to_string()),
        };
        assert!(bad_color.validate().is_err());
    }

    #[test]
    fn test_tag_update_partial_payload() {
        let color_only = TagUpdateInput {
            name: None,
            color: Some("#EF4444".to_string()),
        };
        assert!(color_only.validate().is_ok());
    }
}
