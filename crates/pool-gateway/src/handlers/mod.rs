//! HTTP request handlers for the Pool Gateway.

pub mod groups;
pub mod health;
pub mod me;
pub mod metrics;
pub mod users;

pub use groups::{add_group_member, list_group_members, list_groups, remove_group_member};
pub use health::{health_check, readiness_check};
pub use me::get_me;
pub use metrics::metrics_handler;
pub use users::{get_user, list_users};
