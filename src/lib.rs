pub mod bot;
pub mod catalog;
pub mod config;
pub mod error;
pub mod playback;
pub mod voice;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
