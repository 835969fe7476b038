pub mod tag;
pub mod task;
pub mod user;

pub use tag::{Tag, TagInput, TagUpdateInput, DEFAULT_TAG_COLOR};
pub use task::{
    Pagination, Task, TaskInput, TaskPriority, TaskQuery, TaskStatus, TaskUpdateInput,
    TaskWithTags, TASK_COLUMNS,
};
pub use user::{normalize_email, User, USER_COLUMNS};
