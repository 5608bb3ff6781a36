// Core module - Protocol engine
pub mod classifier;
pub mod framer;
pub mod gc100;
pub mod modules;
pub mod serial;
pub mod session;
