// src/lib.rs
pub mod artifact;
pub mod cli;
pub mod compile;
pub mod coverage;
pub mod instrument;
pub mod loader;
pub mod resolve;
pub mod runner;
pub mod script;
pub mod session;
pub mod types;
pub mod utils;

pub use types::errors::Error;
pub use types::models::*;
