pub mod audio;
pub mod capture;
pub mod config;
pub mod error;
pub mod gui;
pub mod keymap;
pub mod mux;
pub mod navigator;
pub mod scrubber;
pub mod session;
pub mod video;

pub use config::AppConfig;
pub use error::CoverError;
