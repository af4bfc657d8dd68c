// Order lifecycle core, no I/O
pub mod order_status;

// Persistence-backed services
pub mod analytics;
pub mod catalog;
pub mod orders;
pub mod users;
