//! SQLite persistence through diesel.

mod models;
mod repository;
mod schema; // Mirrors the embedded migrations - internal use only

pub use repository::{MIGRATIONS, SqliteStore};
