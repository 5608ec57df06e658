//! SQLite backend for the Mesa engine.

mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
