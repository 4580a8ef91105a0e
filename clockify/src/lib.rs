//! Typed client for the Clockify time-tracking REST API.

mod client;
mod clockify_url;
pub mod domain;

pub use client::*;
pub use clockify_url::*;
pub use domain::*;
