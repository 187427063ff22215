//! Price-gap backend library
//!
//! Exposes the pair finder, the HTTP API and its upstream clients for use
//! by the binaries and tests.

pub mod api;
pub mod config;
pub mod middleware;
pub mod movies;
pub mod price_gap;
pub mod w2;

pub use price_gap::{find_price_gap_pair, Gap, GapPair};
