// src/repositories/postgres/mod.rs

pub mod catalog;
pub mod enrollment;
