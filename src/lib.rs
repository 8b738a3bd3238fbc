//! Messaging client state for the Pitchlink creator/investor platform.

pub mod api;
pub mod app;
pub mod error;
pub mod inbox;
pub mod storage;
pub mod utils;

#[cfg(test)]
mod testing;

pub use error::{Error, Result, ValidationError};
pub use inbox::{CurrentUser, Inbox};
