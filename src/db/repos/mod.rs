pub mod cursor;
mod group_inbox;
mod group_owners;
mod groups;
mod organizations;
mod projects;

pub use cursor::*;
pub use group_inbox::*;
pub use group_owners::*;
pub use groups::*;
pub use organizations::*;
pub use projects::*;

/// Pagination parameters for keyset-paged lists.
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    /// Maximum number of records to return.
    pub limit: Option<i64>,
    /// Resume after this position; None starts from the newest row.
    pub cursor: Option<Cursor>,
}

/// Result of a paginated list query.
#[derive(Debug, Clone)]
pub struct ListResult<T> {
    /// The items returned for this page, newest first.
    pub items: Vec<T>,
    /// Whether more rows exist past this page.
    pub has_more: bool,
    /// Position to resume from; set exactly when `has_more`.
    pub next_cursor: Option<Cursor>,
}
