pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod people;
pub mod state;
pub mod storage;
pub mod tables;
