//! Service layer for the Pool Gateway.
//!
//! # Components
//!
//! - `directory` - User, group and membership operations on the user pool

pub mod directory;

pub use directory::DirectoryService;
