mod group;
mod group_inbox;
mod group_owner;
mod organization;
mod project;

pub use group::*;
pub use group_inbox::*;
pub use group_owner::*;
pub use organization::*;
pub use project::*;
