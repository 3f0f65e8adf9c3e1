pub mod api;
pub mod client;
pub mod config;
pub mod converters;
pub mod database;
pub mod error;
pub mod middleware;
pub mod models;
pub mod monitoring;
pub mod services;
