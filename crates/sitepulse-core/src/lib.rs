pub mod analytics;
pub mod config;
pub mod error;
pub mod event;
pub mod range;
pub mod site;
