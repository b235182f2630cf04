pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod platform;
pub mod services;
pub mod state;
pub mod testing;
pub mod types;
