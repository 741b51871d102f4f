//! Collision detection at a receiving station.
//!
//! A packet arriving at a station is tested against every packet already in
//! flight there. Each pair goes through a cascade of tests:
//!
//! 1. frequency overlap, with a tolerance set by the wider bandwidth
//! 2. equal spreading factor (different SFs are treated as orthogonal)
//! 3. full fidelity only: preamble timing, then the capture effect in the
//!    power domain
//!
//! All pairwise verdicts are collected before anything is marked, so the
//! outcome does not depend on the order of the in-flight set.

use std::time::Duration;

use super::scheduler::VirtualInstant;
use super::signal_calculations::symbol_time;
use super::types::{CAPTURE_THRESHOLD, CollisionFidelity, InFlightPacket, PREAMBLE_LOCK_SYMBOLS, PREAMBLE_SYMBOLS, Packet, RadioSettings};

/// Carrier tolerance in Hz when either packet uses 500 kHz.
const FREQUENCY_TOLERANCE_BW500: u64 = 120_000;
/// Carrier tolerance in Hz when either packet uses 250 kHz.
const FREQUENCY_TOLERANCE_BW250: u64 = 60_000;
/// Carrier tolerance in Hz otherwise.
const FREQUENCY_TOLERANCE_BW125: u64 = 30_000;

/// True if the two carriers are close enough to interfere.
pub fn frequency_collision(a: &RadioSettings, b: &RadioSettings) -> bool {
    let separation = a.carrier_frequency.abs_diff(b.carrier_frequency);
    if separation <= FREQUENCY_TOLERANCE_BW500 && (a.bandwidth == 500 || b.bandwidth == 500) {
        true
    } else if separation <= FREQUENCY_TOLERANCE_BW250 && (a.bandwidth == 250 || b.bandwidth == 250) {
        true
    } else {
        separation <= FREQUENCY_TOLERANCE_BW125
    }
}

pub fn spreading_factor_collision(a: &RadioSettings, b: &RadioSettings) -> bool {
    a.spreading_factor == b.spreading_factor
}

/// Time the arriving packet may lose at the start of its preamble while still
/// locking on: `(N_pre − N_lock) × T_sym`.
pub fn capture_window(settings: &RadioSettings) -> Duration {
    let millis = symbol_time(settings.spreading_factor, settings.bandwidth) * (PREAMBLE_SYMBOLS - PREAMBLE_LOCK_SYMBOLS);
    Duration::from_secs_f64(millis / 1000.0)
}

/// True if `other` is still on air when the arriving packet's capture window
/// closes, i.e. the overlap reaches into the part of the preamble the
/// receiver needs.
pub fn timing_collision(candidate: &RadioSettings, now: VirtualInstant, other: &InFlightPacket) -> bool {
    now + capture_window(candidate) < other.reception_end()
}

/// Which packets of an overlapping pair are destroyed in the power domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerVerdict {
    /// Signals too close to each other, neither can be decoded.
    Both,
    /// The other packet is stronger by at least the capture threshold.
    Candidate,
    /// The candidate is stronger by at least the capture threshold.
    Other,
}

pub fn power_collision(candidate_rssi: f64, other_rssi: f64) -> PowerVerdict {
    if (candidate_rssi - other_rssi).abs() < CAPTURE_THRESHOLD {
        PowerVerdict::Both
    } else if candidate_rssi < other_rssi {
        PowerVerdict::Candidate
    } else {
        PowerVerdict::Other
    }
}

/// Verdict of one candidate/in-flight pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PairVerdict {
    pub candidate_collided: bool,
    pub other_collided: bool,
}

/// Run the test cascade for one pair. Pure: reads both packets, marks nothing.
pub fn pair_verdict(candidate: &Packet, now: VirtualInstant, other: &InFlightPacket, fidelity: CollisionFidelity) -> PairVerdict {
    if candidate.lost || candidate.device_id == other.device_id {
        return PairVerdict::default();
    }
    if !frequency_collision(&candidate.settings, &other.packet.settings) || !spreading_factor_collision(&candidate.settings, &other.packet.settings) {
        return PairVerdict::default();
    }
    match fidelity {
        CollisionFidelity::Simplified => PairVerdict {
            candidate_collided: true,
            other_collided: true,
        },
        CollisionFidelity::Full => {
            if !timing_collision(&candidate.settings, now, other) {
                return PairVerdict::default();
            }
            match power_collision(candidate.rssi, other.packet.rssi) {
                PowerVerdict::Both => PairVerdict {
                    candidate_collided: true,
                    other_collided: true,
                },
                PowerVerdict::Candidate => PairVerdict {
                    candidate_collided: true,
                    other_collided: false,
                },
                PowerVerdict::Other => PairVerdict {
                    candidate_collided: false,
                    other_collided: true,
                },
            }
        }
    }
}

/// Result of checking an arriving packet against a station's in-flight set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollisionOutcome {
    /// The arriving packet is destroyed.
    pub collided: bool,
    /// Indices into the in-flight set of packets destroyed by the arrival.
    pub casualties: Vec<usize>,
}

impl CollisionOutcome {
    /// Mark every casualty as collided.
    pub fn apply(&self, in_flight: &mut [InFlightPacket]) {
        for &index in &self.casualties {
            if let Some(packet) = in_flight.get_mut(index) {
                packet.collided = true;
            }
        }
    }
}

/// Test `candidate` against every packet of `in_flight`.
///
/// The candidate's verdict is the OR over all pairs. A lost candidate never
/// collides and never destroys anything.
pub fn check_collision(candidate: &Packet, now: VirtualInstant, in_flight: &[InFlightPacket], fidelity: CollisionFidelity) -> CollisionOutcome {
    let mut outcome = CollisionOutcome::default();
    if candidate.lost {
        return outcome;
    }
    for (index, other) in in_flight.iter().enumerate() {
        let verdict = pair_verdict(candidate, now, other, fidelity);
        outcome.collided |= verdict.candidate_collided;
        if verdict.other_collided {
            outcome.casualties.push(index);
        }
    }
    outcome
}
