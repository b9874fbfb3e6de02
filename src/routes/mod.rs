pub mod debug;
mod error;
pub mod health;
pub mod inbox;

pub use inbox::inbox_routes;
