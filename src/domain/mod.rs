// Domain module - Protocol data types, errors and configuration
pub mod command;
pub mod config;
pub mod error;
pub mod response;
