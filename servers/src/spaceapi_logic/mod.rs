pub mod config;
pub mod downstream;
pub mod health;
pub mod logger;
pub mod picture;
