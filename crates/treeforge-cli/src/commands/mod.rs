//! CLI command implementations

pub mod compile;
pub mod init;
pub mod score;
pub mod validate;
