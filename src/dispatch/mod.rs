//! # Pipeline de Despacho
//!
//! Piezas que conectan el acceptor con el pool de workers:
//!
//! - `queue`: `DispatchQueue`, buzón FIFO acotado con espera bloqueante
//! - `admission`: techo opcional de conexiones en vuelo

pub mod admission;
pub mod queue;

pub use admission::{AdmissionGate, AdmissionMode, AdmissionPermit};
pub use queue::{DispatchQueue, QueueStats, RejectReason, Rejected};
