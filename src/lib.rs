pub mod cache;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod fs;
pub mod model;
pub mod parser;
pub mod relocate;
pub mod resolver;
pub mod rewrite;
