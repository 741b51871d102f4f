//! Type definitions for the simulation.
//!
//! Contains the data structures shared across the simulation:
//! - Geometry primitives and station/device entities
//! - Static per-link packet parameters and per-attempt in-flight records
//! - Radio settings modes and collision check fidelity
//! - The error type for fatal run conditions

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::scheduler::VirtualInstant;

/// Minimum RSSI dominance (dB) for the capture effect. When two overlapping
/// packets are within this margin of each other both are destroyed; otherwise
/// only the weaker one is.
pub const CAPTURE_THRESHOLD: f64 = 6.0;

/// Number of preamble symbols of every transmitted packet.
pub const PREAMBLE_SYMBOLS: f64 = 8.0;

/// Preamble symbols a receiver must see intact to lock onto a packet. Only
/// the first `PREAMBLE_SYMBOLS - PREAMBLE_LOCK_SYMBOLS` symbols may overlap.
pub const PREAMBLE_LOCK_SYMBOLS: f64 = 5.0;

/// Simple 2D point in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Radio settings mode applied to every device of a run.
///
/// The numeric index (see [`RadioMode::index`]) is used to key result files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RadioMode {
    /// SF12, BW125, CR4/8 on a single carrier.
    FixedSlow,
    /// Same as `FixedSlow`, carrier picked at random among three.
    SlowRandomCarrier,
    /// SF6, BW500, CR4/5 on a single carrier.
    FixedFast,
    /// Fastest SF/BW that still closes the link to the home station.
    DistanceOptimized,
    /// SF12, BW125, CR4/5 as used by public networks.
    NetworkStandard,
    /// `DistanceOptimized` plus transmit power reduced to the remaining margin.
    PowerOptimized,
}

impl RadioMode {
    pub fn index(self) -> u8 {
        match self {
            RadioMode::FixedSlow => 0,
            RadioMode::SlowRandomCarrier => 1,
            RadioMode::FixedFast => 2,
            RadioMode::DistanceOptimized => 3,
            RadioMode::NetworkStandard => 4,
            RadioMode::PowerOptimized => 5,
        }
    }

    /// Whether each device picks its own SF/BW combination.
    pub fn allows_free_choice(self) -> bool {
        matches!(self, RadioMode::DistanceOptimized | RadioMode::PowerOptimized)
    }
}

/// Collision check fidelity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionFidelity {
    /// Same frequency and spreading factor at the same time always collides.
    Simplified,
    /// Adds the preamble timing test and the capture effect.
    Full,
}

/// Static radio parameters of a device's transmissions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RadioSettings {
    pub spreading_factor: u8,
    /// Bandwidth in kHz (125, 250 or 500).
    pub bandwidth: u32,
    /// Coding rate index 1..=4 meaning 4/5..4/8.
    pub coding_rate: u8,
    /// Carrier frequency in Hz.
    pub carrier_frequency: u64,
    /// Transmit power in dBm.
    pub tx_power: f64,
    /// Payload length in bytes.
    pub payload_length: usize,
}

/// Receiver station.
#[derive(Debug, Clone, Serialize)]
pub struct Station {
    pub station_id: u32,
    pub position: Point,
}

/// The virtual packet a device sends towards one particular station.
///
/// Everything here is decided when the device is created and never changes
/// during a run, including `lost`.
#[derive(Debug, Clone, Copy)]
pub struct Packet {
    pub device_id: u32,
    pub station_id: u32,
    pub settings: RadioSettings,
    /// Distance between device and station in meters.
    pub distance: f64,
    /// Received signal strength at the station in dBm, antenna gain included.
    pub rssi: f64,
    pub airtime: Duration,
    /// Received power is below the sensitivity of the active mode.
    pub lost: bool,
}

/// End device with one packet per station.
#[derive(Debug, Clone)]
pub struct Device {
    pub device_id: u32,
    pub home_station: u32,
    pub position: Point,
    /// Mean of the exponentially distributed time between transmissions.
    pub mean_send_interval: Duration,
    /// Indexed by station id.
    pub packets: Vec<Packet>,
    /// Transmissions started during the run.
    pub sent: u64,
}

impl Device {
    pub fn home_packet(&self) -> &Packet {
        &self.packets[self.home_station as usize]
    }
}

/// One attempt of one device currently arriving at one station.
///
/// A new record is created for every attempt, so nothing carries over from a
/// previous cycle.
#[derive(Debug, Clone)]
pub struct InFlightPacket {
    pub device_id: u32,
    pub packet: Packet,
    pub sequence: u64,
    pub arrival: VirtualInstant,
    pub collided: bool,
}

impl InFlightPacket {
    pub fn reception_end(&self) -> VirtualInstant {
        self.arrival + self.packet.airtime
    }
}

/// Fatal conditions that abort a run.
///
/// Collisions and sensitivity losses are not errors; they end up in the
/// statistics.
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// No valid position found for a device within the retry bound.
    PlacementFailed { device_id: u32, station_id: u32, attempts: u32 },
    /// No spreading factor/bandwidth combination closes the device's home link.
    NoFeasibleSettings { device_id: u32, station_id: u32, received_power: f64 },
    /// A device was about to enter an in-flight set it is already part of.
    DuplicateInFlight { device_id: u32, station_id: u32 },
    /// A completing device was not found in an in-flight set it entered.
    MissingInFlight { device_id: u32, station_id: u32 },
    /// No preset layout for this station count and no coordinates supplied.
    MissingTopology { station_count: usize },
    /// Supplied coordinates do not match the station count.
    TopologyMismatch { expected: usize, found: usize },
    /// Parameters that slipped past configuration validation.
    InvalidParameters(String),
}

impl SimulationError {
    /// Process exit status reported for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            SimulationError::PlacementFailed { .. } => 2,
            SimulationError::NoFeasibleSettings { .. } => 3,
            SimulationError::MissingTopology { .. } | SimulationError::TopologyMismatch { .. } => 4,
            SimulationError::InvalidParameters(_) => 5,
            SimulationError::DuplicateInFlight { .. } | SimulationError::MissingInFlight { .. } => 70,
        }
    }
}

impl std::fmt::Display for SimulationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimulationError::PlacementFailed {
                device_id,
                station_id,
                attempts,
            } => write!(
                f,
                "Could not place device {} around station {} after {} attempts",
                device_id, station_id, attempts
            ),
            SimulationError::NoFeasibleSettings {
                device_id,
                station_id,
                received_power,
            } => write!(
                f,
                "Device {} cannot reach station {}: received power {:.2} dBm is below every sensitivity",
                device_id, station_id, received_power
            ),
            SimulationError::DuplicateInFlight { device_id, station_id } => {
                write!(f, "Device {} is already in flight at station {}", device_id, station_id)
            }
            SimulationError::MissingInFlight { device_id, station_id } => {
                write!(f, "Device {} is missing from the in-flight set of station {}", device_id, station_id)
            }
            SimulationError::MissingTopology { station_count } => write!(
                f,
                "No preset layout for {} stations, explicit station positions are required",
                station_count
            ),
            SimulationError::TopologyMismatch { expected, found } => {
                write!(f, "Expected {} station positions, found {}", expected, found)
            }
            SimulationError::InvalidParameters(msg) => write!(f, "Invalid parameters: {}", msg),
        }
    }
}

impl std::error::Error for SimulationError {}
