use crate::{
    auth::AuthenticatedUserId,
    error::AppError,
    models::{
        Pagination, Tag, Task, TaskInput, TaskPriority, TaskQuery, TaskStatus, TaskUpdateInput,
        TaskWithTags, TASK_COLUMNS,
    },
};
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

/// One row of the task/tag join used to resolve tag lists. Clients only
/// ever see resolved tags, never the raw association rows.
#[derive(sqlx::FromRow)]
struct TaskTagRow {
    task_id: Uuid,
    id: i32,
    name: String,
    color: String,
    user_id: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Fetches the tags for a set of tasks in one round trip, grouped by task.
async fn load_tags_for(
    pool: &PgPool,
    task_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<Tag>>, AppError> {
    let mut grouped: HashMap<Uuid, Vec<Tag>> = HashMap::new();
    if task_ids.is_empty() {
        return Ok(grouped);
    }

    let rows = sqlx::query_as::<_, TaskTagRow>(
        "SELECT tt.task_id, t.id, t.name, t.color, t.user_id, t.created_at, t.updated_at
         FROM task_tags tt
         JOIN tags t ON t.id = tt.tag_id
         WHERE tt.task_id = ANY($1)
         ORDER BY t.name ASC",
    )
    .bind(task_ids)
    .fetch_all(pool)
    .await?;

    for row in rows {
        grouped.entry(row.task_id).or_default().push(Tag {
            id: row.id,
            name: row.name,
            color: row.color,
            user_id: row.user_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        });
    }

    Ok(grouped)
}

fn dedup_tag_ids(tag_ids: &[i32]) -> Vec<i32> {
    let mut unique = tag_ids.to_vec();
    unique.sort_unstable();
    unique.dedup();
    unique
}

/// Fails the whole operation when any supplied tag id does not resolve to a
/// tag owned by the caller. Foreign tags answer the same way as missing
/// ones, so nothing about other users' tags is revealed.
async fn assert_tags_owned(
    tx: &mut Transaction<'_, Postgres>,
    user_id: i32,
    tag_ids: &[i32],
) -> Result<(), AppError> {
    if tag_ids.is_empty() {
        return Ok(());
    }

    let owned: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM tags WHERE id = ANY($1) AND user_id = $2")
            .bind(tag_ids)
            .bind(user_id)
            .fetch_one(&mut **tx)
            .await?;

    if owned != tag_ids.len() as i64 {
        return Err(AppError::BadRequest("One or more tags do not exist".into()));
    }

    Ok(())
}

/// Replaces a task's full association set: delete-all, insert-new. Callers
/// run this inside the same transaction as the task write, so a crash can
/// never leave a half-replaced set. Last write wins; there is no merging.
async fn replace_task_tags(
    tx: &mut Transaction<'_, Postgres>,
    task_id: Uuid,
    tag_ids: &[i32],
) -> Result<(), AppError> {
    sqlx::query("DELETE FROM task_tags WHERE task_id = $1")
        .bind(task_id)
        .execute(&mut **tx)
        .await?;

    if !tag_ids.is_empty() {
        sqlx::query("INSERT INTO task_tags (task_id, tag_id) SELECT $1, unnest($2::int4[])")
            .bind(task_id)
            .bind(tag_ids)
            .execute(&mut **tx)
            .await?;
    }

    Ok(())
}

/// Retrieves a page of the authenticated user's tasks.
///
/// Supports filtering by `priority` and `status` (an enum literal or the
/// sentinel `all` for unfiltered) and a case-insensitive `search` over
/// titles and descriptions. Tasks are ordered by creation date descending
/// and paginated with `page`/`limit` (defaults 1/10); the response carries
/// the resolved tag list per task and the pre-pagination total so clients
/// can compute page counts.
#[get("")]
pub async fn get_tasks(
    pool: web::Data<PgPool>,
    query_params: web::Query<TaskQuery>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let priority = match &query_params.priority {
        Some(value) => TaskPriority::from_filter(value)?,
        None => None,
    };
    let status = match &query_params.status {
        Some(value) => TaskStatus::from_filter(value)?,
        None => None,
    };

    // Conditions for priority, status and search are appended dynamically;
    // the count query shares the same WHERE clause so `total` always
    // matches the filters.
    let mut conditions: Vec<String> = Vec::new();
    let mut param_count = 2;

    if priority.is_some() {
        conditions.push(format!("priority = ${}", param_count));
        param_count += 1;
    }
    if status.is_some() {
        conditions.push(format!("status = ${}", param_count));
        param_count += 1;
    }
    if query_params.search.is_some() {
        conditions.push(format!(
            "(title ILIKE ${} OR description ILIKE ${})",
            param_count,
            param_count + 1
        ));
        param_count += 2;
    }

    let mut where_sql = String::from("WHERE user_id = $1");
    if !conditions.is_empty() {
        where_sql.push_str(" AND ");
        where_sql.push_str(&conditions.join(" AND "));
    }

    let list_sql = format!(
        "SELECT {} FROM tasks {} ORDER BY created_at DESC LIMIT ${} OFFSET ${}",
        TASK_COLUMNS,
        where_sql,
        param_count,
        param_count + 1
    );
    let count_sql = format!("SELECT COUNT(*) FROM tasks {}", where_sql);

    let mut list_query = sqlx::query_as::<_, Task>(&list_sql).bind(user_id.0);
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql).bind(user_id.0);

    if let Some(priority) = priority {
        list_query = list_query.bind(priority);
        count_query = count_query.bind(priority);
    }
    if let Some(status) = status {
        list_query = list_query.bind(status);
        count_query = count_query.bind(status);
    }
    if let Some(search) = &query_params.search {
        let pattern = format!("%{}%", search);
        list_query = list_query.bind(pattern.clone()).bind(pattern.clone());
        count_query = count_query.bind(pattern.clone()).bind(pattern);
    }

    let page = query_params.page();
    let limit = query_params.limit();

    let tasks = list_query
        .bind(limit)
        .bind(query_params.offset())
        .fetch_all(&**pool)
        .await?;
    let total = count_query.fetch_one(&**pool).await?;

    let task_ids: Vec<Uuid> = tasks.iter().map(|task| task.id).collect();
    let mut tag_map = load_tags_for(&pool, &task_ids).await?;

    let tasks: Vec<TaskWithTags> = tasks
        .into_iter()
        .map(|task| {
            let tags = tag_map.remove(&task.id).unwrap_or_default();
            TaskWithTags { task, tags }
        })
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "tasks": tasks,
        "pagination": Pagination::new(page, limit, total)
    })))
}

/// Retrieves a single task with its resolved tags.
///
/// A task owned by another user answers 404, the same as a missing one.
#[get("/{id}")]
pub async fn get_task(
    pool: web::Data<PgPool>,
    task_id: web::Path<Uuid>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let sql = format!(
        "SELECT {} FROM tasks WHERE id = $1 AND user_id = $2",
        TASK_COLUMNS
    );
    let task = sqlx::query_as::<_, Task>(&sql)
        .bind(task_id.into_inner())
        .bind(user_id.0)
        .fetch_optional(&**pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))?;

    let mut tag_map = load_tags_for(&pool, &[task.id]).await?;
    let tags = tag_map.remove(&task.id).unwrap_or_default();

    Ok(HttpResponse::Ok().json(json!({ "task": TaskWithTags { task, tags } })))
}

/// Creates a task for the authenticated user.
///
/// Priority defaults to MEDIUM and status to PENDING. When `tagIds` is
/// supplied, every id must reference a tag owned by the caller, and the
/// task insert plus its associations commit atomically.
#[post("")]
pub async fn create_task(
    pool: web::Data<PgPool>,
    task_data: web::Json<TaskInput>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;

    let task = Task::new(&task_data, user_id.0);
    let tag_ids = dedup_tag_ids(task_data.tag_ids.as_deref().unwrap_or(&[]));

    let mut tx = pool.begin().await?;

    assert_tags_owned(&mut tx, user_id.0, &tag_ids).await?;

    let sql = format!(
        "INSERT INTO tasks (id, title, description, priority, status, due_date, user_id)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING {}",
        TASK_COLUMNS
    );
    let task = sqlx::query_as::<_, Task>(&sql)
        .bind(task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.priority)
        .bind(task.status)
        .bind(task.due_date)
        .bind(task.user_id)
        .fetch_one(&mut *tx)
        .await?;

    if !tag_ids.is_empty() {
        replace_task_tags(&mut tx, task.id, &tag_ids).await?;
    }

    tx.commit().await?;

    let mut tag_map = load_tags_for(&pool, &[task.id]).await?;
    let tags = tag_map.remove(&task.id).unwrap_or_default();

    Ok(HttpResponse::Created().json(json!({ "task": TaskWithTags { task, tags } })))
}

/// Updates a task. Partial semantics: absent fields keep their current
/// value. A supplied `tagIds` (even an empty list) replaces the full
/// association set; an absent `tagIds` leaves associations untouched.
#[put("/{id}")]
pub async fn update_task(
    pool: web::Data<PgPool>,
    task_id: web::Path<Uuid>,
    task_data: web::Json<TaskUpdateInput>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;
    let task_uuid = task_id.into_inner();

    let mut tx = pool.begin().await?;

    let sql = format!(
        "UPDATE tasks
         SET title = COALESCE($1, title),
             description = COALESCE($2, description),
             priority = COALESCE($3, priority),
             status = COALESCE($4, status),
             due_date = COALESCE($5, due_date),
             updated_at = now()
         WHERE id = $6 AND user_id = $7
         RETURNING {}",
        TASK_COLUMNS
    );
    let task = sqlx::query_as::<_, Task>(&sql)
        .bind(&task_data.title)
        .bind(&task_data.description)
        .bind(task_data.priority)
        .bind(task_data.status)
        .bind(task_data.due_date)
        .bind(task_uuid)
        .bind(user_id.0)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))?;

    if let Some(tag_ids) = &task_data.tag_ids {
        let tag_ids = dedup_tag_ids(tag_ids);
        assert_tags_owned(&mut tx, user_id.0, &tag_ids).await?;
        replace_task_tags(&mut tx, task.id, &tag_ids).await?;
    }

    tx.commit().await?;

    let mut tag_map = load_tags_for(&pool, &[task.id]).await?;
    let tags = tag_map.remove(&task.id).unwrap_or_default();

    Ok(HttpResponse::Ok().json(json!({ "task": TaskWithTags { task, tags } })))
}

/// Deletes a task. Association rows are removed by the store's cascade.
#[delete("/{id}")]
pub async fn delete_task(
    pool: web::Data<PgPool>,
    task_id: web::Path<Uuid>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
        .bind(task_id.into_inner())
        .bind(user_id.0)
        .execute(&**pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Task not found".into()));
    }

    Ok(HttpResponse::NoContent().finish())
}
