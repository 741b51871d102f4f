//! LoRa collision simulation core module.
//!
//! Devices transmit towards a set of receiver stations at random intervals;
//! every station checks each arriving packet against the packets it is
//! already receiving. It integrates:
//! - A log-distance link budget with directional antenna gain
//! - LoRa airtime and measured receiver sensitivities
//! - Staged collision checks with the capture effect
//! - A discrete-event loop over a virtual clock
//!
//! ## Module Organization
//!
//! - `types`: Entities, radio modes and the error type
//! - `signal_calculations`: Radio signal and timing calculations
//! - `geometry`: Distances, antenna angles and placement sampling
//! - `collision`: Pairwise collision tests and the arrival check
//! - `scheduler`: Virtual clock and wake-up queue
//! - `network`: Scenario build and the device cycle loop
//! - `stats`: Counters, run summary and result files
//!
//! ## Public API
//!
//! The main entry point is [`Network::build`] followed by [`Network::run`].

pub mod collision;
pub mod geometry;
pub mod network;
pub mod scheduler;
pub mod signal_calculations;
pub mod stats;
pub mod types;

pub use network::Network;
pub use types::SimulationError;
