pub mod app;
pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod errors;
pub mod goals;
pub mod state;
