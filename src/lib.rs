// Library exports for inkwell
// This allows integration tests and external code to use inkwell modules

pub mod auth;
pub mod comments;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod posts;
pub mod reactions;
pub mod routes;
pub mod state;
pub mod uploads;

pub use routes::app;
