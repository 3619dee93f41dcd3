//! JSON wire formats exchanged with the ingress and gossip collaborators.
//!
//! The core defines the payload shapes and their conversions to the typed
//! model; the HTTP layer that carries them lives outside this crate.

pub mod payload;
