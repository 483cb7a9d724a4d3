pub mod analyze;
pub mod cache;
pub mod completion;
pub mod config;
pub mod favorites;
pub mod history;
