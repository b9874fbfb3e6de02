mod group_inbox;
mod group_owners;
mod groups;
mod organizations;
mod projects;

pub use group_inbox::PostgresGroupInboxRepo;
pub use group_owners::PostgresGroupOwnerRepo;
pub use groups::PostgresGroupRepo;
pub use organizations::PostgresOrganizationRepo;
pub use projects::PostgresProjectRepo;
