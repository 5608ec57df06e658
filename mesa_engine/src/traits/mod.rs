//! Backend behaviour contracts for the Mesa engine.
//!
//! Persistence is an external collaborator. The engine only requires that a backend implement these traits; the
//! repository ships two implementations: [`crate::SqliteDatabase`] (durable) and [`crate::MemoryDatabase`]
//! (process-local, for fixtures and tests). The adapter is chosen once at startup and never branched on inline.

mod marketplace_database;

pub use marketplace_database::{
    EstablishmentManagement,
    MarketplaceDatabase,
    OrderApiError,
    OrderBackend,
    OrderManagement,
};
