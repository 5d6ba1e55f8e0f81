pub mod aggregate;
pub mod handler;
pub mod models;
pub mod range;
