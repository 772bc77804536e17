//! Database repositories and pool setup.

pub mod setup;
pub mod video;
