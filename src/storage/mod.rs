//! World-state storage.
//!
//! The in-memory [`state_db::StateDb`] is the only backend; its public
//! surface (reads-as-copies, snapshot handles, deterministic root) is the
//! contract a persistent adapter would implement in its place.

pub mod state_db;
