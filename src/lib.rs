pub mod command;
pub mod config;
pub mod error;
pub mod kube_api;
pub mod system;

pub use error::{Error, Result};
