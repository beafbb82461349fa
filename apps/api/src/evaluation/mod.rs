pub mod handlers;
pub mod parser;
pub mod prompts;
pub mod repository;
pub mod runner;
