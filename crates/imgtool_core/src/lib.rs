pub mod config;
pub mod discover;
pub mod extract;
pub mod fetch;
pub mod pipeline;
pub mod relocate;
pub mod resolve;
pub mod runtime;
