mod project;
mod serde_helpers;
mod time_entry;
mod user;
mod workspace;

pub use project::*;
pub use serde_helpers::format_instant;
pub use time_entry::*;
pub use user::*;
pub use workspace::*;
