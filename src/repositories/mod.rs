//! # Repository Layer
//!
//! Repository implementations that encapsulate SeaORM operations for the
//! connection and recap tables, providing a clean API for data access.

pub mod connection;
pub mod recap;
pub mod recap_script;

pub use connection::{ConnectionPatch, ConnectionRepository};
pub use recap::{RecapFields, RecapRepository, RecapStatus, RecapTransition, day_of};
pub use recap_script::RecapScriptRepository;
