// src/models/mod.rs

pub mod discussion;
pub mod exam;
pub mod question;
pub mod user;
