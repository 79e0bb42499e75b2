//! Music service integration, reached through the forwarding proxy.
//!
//! Provides keyword search, playable URL resolution, album art and
//! time-coded lyrics for remote tracks.

pub mod dto;
mod adapter;
mod client;

pub use client::NeteaseClient;
