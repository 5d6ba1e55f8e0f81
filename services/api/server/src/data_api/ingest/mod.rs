pub mod batch;
pub mod handler;
pub mod models;
