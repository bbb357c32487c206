// src/lib.rs

pub mod db;
pub mod reference;
pub mod repositories;
pub mod services;
pub mod tasks;
pub mod test_utils;
pub mod utils;

pub use db::Database;
pub use olivia_common::error::Error;
pub use reference::ReferenceData;
