//! Keeps a local timer, batch submissions and cached entry views consistent
//! with the Clockify time-tracking service.

pub mod adapters;
pub mod batch;
pub mod config;
pub mod context;
pub mod duration;
pub mod entries;
mod error;
pub mod ports;
pub mod projects;
pub mod ticker;
pub mod time_utils;
pub mod timer;

pub use error::TimesheetError;
