// src/handlers/mod.rs

pub mod admin;
pub mod auth;
pub mod discussions;
pub mod exams;
pub mod profile;
pub mod quiz;
