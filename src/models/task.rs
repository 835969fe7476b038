use crate::error::AppError;
use crate::models::tag::Tag;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Represents the priority of a task.
/// Corresponds to the `task_priority` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskPriority {
    /// Needs attention first.
    High,
    /// Default priority.
    Medium,
    /// Can wait.
    Low,
}

/// Represents the status of a task.
/// Corresponds to the `task_status` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Task is yet to be started.
    Pending,
    /// Task is currently being worked on.
    InProgress,
    /// Task is finished.
    Completed,
    /// Task was abandoned.
    Cancelled,
}

impl TaskPriority {
    /// Parses a list-filter value. The sentinel `all` means unfiltered.
    pub fn from_filter(value: &str) -> Result<Option<Self>, AppError> {
        match value {
            "all" => Ok(None),
            "HIGH" => Ok(Some(TaskPriority::High)),
            "MEDIUM" => Ok(Some(TaskPriority::Medium)),
            "LOW" => Ok(Some(TaskPriority::Low)),
            other => Err(AppError::BadRequest(format!(
                "Invalid priority filter: {}",
                other
            ))),
        }
    }
}

impl TaskStatus {
    /// Parses a list-filter value. The sentinel `all` means unfiltered.
    pub fn from_filter(value: &str) -> Result<Option<Self>, AppError> {
        match value {
            "all" => Ok(None),
            "PENDING" => Ok(Some(TaskStatus::Pending)),
            "IN_PROGRESS" => Ok(Some(TaskStatus::InProgress)),
            "COMPLETED" => Ok(Some(TaskStatus::Completed)),
            "CANCELLED" => Ok(Some(TaskStatus::Cancelled)),
            other => Err(AppError::BadRequest(format!(
                "Invalid status filter: {}",
                other
            ))),
        }
    }
}

/// Input structure for creating a task.
/// Contains validation rules for its fields.
#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TaskInput {
    /// The title of the task.
    /// Must be between 1 and 255 characters.
    #[validate(length(min = 1, max = 255))]
    pub title: String,

    /// An optional description for the task.
    /// Maximum length of 1000 characters if provided.
    #[validate(length(max = 1000))]
    pub description: Option<String>,

    /// The priority of the task. Defaults to MEDIUM when omitted.
    pub priority: Option<TaskPriority>,

    /// The status of the task. Defaults to PENDING when omitted.
    pub status: Option<TaskStatus>,

    /// Optional due date for the task.
    pub due_date: Option<DateTime<Utc>>,

    /// Tags to associate with the task. Every id must reference a tag owned
    /// by the caller; otherwise the whole creation is rejected.
    pub tag_ids: Option<Vec<i32>>,
}

/// Input structure for updating a task. All fields are optional: absent
/// fields keep their current value. `tag_ids` is special: when present
/// (even as an empty list) it replaces the full association set, when
/// absent the associations are left untouched.
#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdateInput {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,

    #[validate(length(max = 1000))]
    pub description: Option<String>,

    pub priority: Option<TaskPriority>,

    pub status: Option<TaskStatus>,

    pub due_date: Option<DateTime<Utc>>,

    pub tag_ids: Option<Vec<i32>>,
}

/// Represents a task entity as stored in the database.
#[derive(Debug, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier for the task (UUID v4).
    pub id: Uuid,
    /// The title of the task.
    pub title: String,
    /// An optional description for the task.
    pub description: Option<String>,
    /// The priority of the task.
    pub priority: TaskPriority,
    /// The current status of the task.
    pub status: TaskStatus,
    /// Optional due date for the task.
    pub due_date: Option<DateTime<Utc>>,
    /// Timestamp of when the task was created.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last update to the task.
    pub updated_at: DateTime<Utc>,
    /// Identifier of the user who owns the task.
    pub user_id: i32,
}

/// Column list matching [`Task`], for use in SELECT/RETURNING clauses.
pub const TASK_COLUMNS: &str =
    "id, title, description, priority, status, due_date, created_at, updated_at, user_id";

/// A task together with its resolved tags, the shape every task response
/// carries (clients never see raw association rows).
#[derive(Debug, Serialize)]
pub struct TaskWithTags {
    #[serde(flatten)]
    pub task: Task,
    pub tags: Vec<Tag>,
}

/// Represents query parameters for filtering and paginating the task list.
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskQuery {
    /// Filter by priority: an enum literal or `all` for unfiltered.
    pub priority: Option<String>,
    /// Filter by status: an enum literal or `all` for unfiltered.
    pub status: Option<String>,
    /// Case-insensitive substring match against title or description.
    pub search: Option<String>,
    /// 1-indexed page number, defaults to 1.
    pub page: Option<i64>,
    /// Page size, defaults to 10.
    pub limit: Option<i64>,
}

impl TaskQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    // Capped so a single request cannot ask for an unbounded page.
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(10).clamp(1, 100)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.limit()
    }
}

/// Pagination envelope returned alongside every task list.
#[derive(Debug, Serialize, Deserialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    /// Count of all rows matching the filters, before pagination.
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        Self {
            page,
            limit,
            total,
            pages: (total + limit - 1) / limit,
        }
    }
}

impl Task {
    /// Creates a new `Task` from `TaskInput` and the owner's `user_id`,
    /// applying the MEDIUM/PENDING defaults and stamping both timestamps.
    pub fn new(input: &TaskInput, user_id: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: input.title.clone(),
            description: input.description.clone(),
            priority: input.priority.unwrap_or(TaskPriority::Medium),
            status: input.status.unwrap_or(TaskStatus::Pending),
            due_date: input.due_date,
            created_at: now,
            updated_at: now,
            user_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_creation_defaults() {
        let input = TaskInput {
            title: "Buy milk".to_string(),
            description: None,
            priority: None,
            status: None,
            due_date: None,
            tag_ids: None,
        };

        let task = Task::new(&input, 1);
        assert_eq!(task.title, "Buy milk");
        assert_eq!(task.user_id, 1);
        assert_eq!(task.priority, TaskPriority::Medium);
        assert_eq!(task.status, TaskStatus::Pending);
    }

    #[test]
    fn test_task_input_validation() {
        let valid_input = TaskInput {
            title: "Valid Task".to_string(),
            description: Some("Valid Description".to_string()),
            priority: Some(TaskPriority::High),
            status: Some(TaskStatus::Pending),
            due_date: Some(Utc::now()),
            tag_ids: None,
        };
        assert!(valid_input.validate().is_ok());

        let empty_title = TaskInput {
            title: "".to_string(),
            description: None,
            priority: None,
            status: None,
            due_date: None,
            tag_ids: None,
        };
        assert!(empty_title.validate().is_err());

        let long_title = TaskInput {
            title: "a".repeat(256),
            description: None,
            priority: None,
            status: None,
            due_date: None,
            tag_ids: None,
        };
        assert!(long_title.validate().is_err());

        let long_description = TaskInput {
            title: "Valid".to_string(),
            description: Some("b".repeat(1001)),
            priority: None,
            status: None,
            due_date: None,
            tag_ids: None,
        };
        assert!(long_description.validate().is_err());
    }

    #[test]
    fn test_filter_parsing() {
        assert_eq!(TaskPriority::from_filter("all").unwrap(), None);
        assert_eq!(
            TaskPriority::from_filter("HIGH").unwrap(),
            Some(TaskPriority::High)
        );
        assert!(TaskPriority::from_filter("urgent").is_err());

        assert_eq!(TaskStatus::from_filter("all").unwrap(), None);
        assert_eq!(
            TaskStatus::from_filter("IN_PROGRESS").unwrap(),
            Some(TaskStatus::InProgress)
        );
        // Literals are case-sensitive, matching the stored enum values.
        assert!(TaskStatus::from_filter("pending").is_err());
    }

    #[test]
    fn test_enum_serialization_matches_store_literals() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::InProgress).unwrap(),
            "\"IN_PROGRESS\""
        );
        assert_eq!(
            serde_json::to_string(&TaskPriority::Low).unwrap(),
            "\"LOW\""
        );
    }

    #[test]
    fn test_pagination_math() {
        let query = TaskQuery {
            priority: None,
            status: None,
            search: None,
            page: None,
            limit: None,
        };
        assert_eq!(query.page(), 1);
        assert_eq!(query.limit(), 10);
        assert_eq!(query.offset(), 0);

        let query = TaskQuery {
            priority: None,
            status: None,
            search: None,
            page: Some(3),
            limit: Some(25),
        };
        assert_eq!(query.offset(), 50);

        // Nonsense values fall back to the first sane page.
        let query = TaskQuery {
            priority: None,
            status: None,
            search: None,
            page: Some(0),
            limit: Some(-5),
        };
        assert_eq!(query.page(), 1);
        assert_eq!(query.limit(), 1);

        assert_eq!(Pagination::new(1, 10, 0).pages, 0);
        assert_eq!(Pagination::new(1, 10, 10).pages, 1);
        assert_eq!(Pagination::new(1, 10, 11).pages, 2);
        assert_eq!(Pagination::new(2, 25, 51).pages, 3);
    }
}
