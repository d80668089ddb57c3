pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod files;
pub mod handlers;
pub mod sandbox;
pub mod session;
