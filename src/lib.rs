pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod store;
pub mod utils;
pub mod vcs;

pub use errors::RippleError;
