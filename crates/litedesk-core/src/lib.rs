pub mod error;
pub mod types;
pub mod config;
pub mod util;
pub mod api;
pub mod balance;
pub mod provider;
pub mod chat;
pub mod session;
pub mod desk;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const LOGO: &str = "🧪";
