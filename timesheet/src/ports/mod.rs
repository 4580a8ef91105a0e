mod time_tracking;

#[cfg(test)]
pub(crate) mod mock;

pub use time_tracking::*;
