// Main library entry point for the global trace builder.

pub mod api;
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod ports;
