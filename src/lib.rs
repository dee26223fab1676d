pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod models;
pub mod server;
pub mod services;
pub mod state;

pub use config::Config;
pub use error::{AppError, Result};
pub use state::AppState;
