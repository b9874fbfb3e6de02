mod common;
mod group_inbox;
mod group_owners;
mod groups;
mod organizations;
mod projects;

pub use group_inbox::SqliteGroupInboxRepo;
pub use group_owners::SqliteGroupOwnerRepo;
pub use groups::SqliteGroupRepo;
pub use organizations::SqliteOrganizationRepo;
pub use projects::SqliteProjectRepo;
