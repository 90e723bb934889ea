pub mod config;
pub mod generate;
pub mod index;
pub mod search;
