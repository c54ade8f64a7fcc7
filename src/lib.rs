pub mod command;
pub mod config;
pub mod input;
pub mod motor;
pub mod runtime;
