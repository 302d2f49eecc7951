pub mod api;
pub mod config;
pub mod conflict;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
