pub mod auth;
pub mod fallback;
pub mod health;
pub mod logs;
pub mod metrics;
pub mod users;
