pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod note_models;
pub mod repositories;
pub mod routes;
pub mod server;
pub mod services;
pub mod views;
