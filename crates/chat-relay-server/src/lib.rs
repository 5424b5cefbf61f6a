pub mod app;
pub mod config;
pub mod document;
pub mod handlers;
pub mod models;
pub mod services;
pub mod session;
pub mod utils;
