//! Beacon construction and delivery.
//!
//! A beacon is a single tracking request describing the current playback
//! position. This module computes the reportable position (`position`),
//! serializes the vendor URL (`encoder`) and hands it to a fire-and-forget
//! transport (`dispatcher`).

pub mod dispatcher;
pub mod encoder;
pub mod position;

pub use dispatcher::{BeaconDispatcher, HttpDispatcher, LogDispatcher};
pub use encoder::{BeaconParams, BeaconTarget, Scheme};
pub use position::{reportable_position, round_position};
