// src/lib.rs

pub mod authoring;
pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod models;
pub mod provider;
pub mod repository;
pub mod routes;
pub mod state;
pub mod utils;

pub use routes::create_router;
