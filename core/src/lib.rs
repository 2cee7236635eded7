pub mod action;
pub mod annotation;
pub mod config;
pub mod metadata;
pub mod style;
pub mod testing;

pub use crate::config::Config;
