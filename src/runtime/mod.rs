pub mod config;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod extension;
pub mod registry;
