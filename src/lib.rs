pub mod admin;
pub mod bot;
pub mod commands;
pub mod config;
pub mod db;
pub mod dedup;
pub mod error;
pub mod feed;
pub mod models;
pub mod pipeline;
pub mod scheduler;
pub mod services;
pub mod transport;
