pub mod config;
pub mod health;
pub mod server;
pub mod shared;
pub mod urls;
