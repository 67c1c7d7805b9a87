pub mod admin;
pub mod browse;
pub mod config;
pub mod play;
pub mod resolve;
pub mod session;
pub mod watchlist;
