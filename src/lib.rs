pub mod cli;
pub mod commands;
pub mod concat;
pub mod config;
pub mod error;
pub mod filename;
pub mod flight;
pub mod pipeline;
pub mod probe;
pub mod storage;
pub mod subtitle;
