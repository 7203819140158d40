pub mod app;
pub mod config;

pub use app::app;
pub use config::ServerConfig;
