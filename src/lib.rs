pub mod action;
pub mod app;
pub mod cli;
pub mod components;
pub mod config;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod mode;
pub mod runner;
pub mod tui;
pub mod utils;
