pub mod merger;
pub mod parser;
pub mod timestamp;
