//! Application layer: typed repositories, the ledger transaction engine and
//! the dispatcher that routes named invocations to it.
//!
//! Every operation runs to completion inside one call; nothing is spawned
//! and no lock is held between operations.

pub mod dispatcher;
pub mod engine;
pub mod repository;
