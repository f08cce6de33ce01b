pub mod actions;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod navigator;
pub mod repos;
pub mod sanitize;
pub mod ui;

pub use error::{Error, Result};
