//! Infrastructure layer - Storage backends, hashing and logging

pub mod identity;
pub mod logging;
