pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod logging;
pub mod models;
pub mod progress;
pub mod report;
pub mod roster;
pub mod tasks;
pub mod timeline;
