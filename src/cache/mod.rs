//! # Caché de Respuestas
//!
//! Caché acotada y sensible al tiempo que los workers consultan antes de ir
//! al sistema de archivos.
//!
//! - `entry`: entrada individual y vista de solo lectura del payload
//! - `store`: `ResponseCache` (lookup, insert con desalojo, sweep por TTL)
//! - `sweeper`: barrido periódico opcional en su propio thread

pub mod entry;
pub mod store;
pub mod sweeper;


pub use entry::{CacheEntry, CachedPayload};
pub use store::{CacheError, CacheStats, InsertOutcome, ResponseCache, MAX_KEY_LENGTH};
pub use sweeper::spawn_sweeper;
