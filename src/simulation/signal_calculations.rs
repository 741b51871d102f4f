//! Radio signal and timing calculations.
//!
//! Contains helpers for:
//! - Log-distance path loss and received power
//! - LoRa airtime following the SX127x design guide formula
//! - Directional antenna gain as a step function of the off-axis angle
//! - Measured per-(SF, BW) receiver sensitivities and mode thresholds
//! - Placement radius and per-device settings derived from the link budget
//!
//! Units:
//! - Power: dBm, gains and losses in dB
//! - Time: milliseconds (f64) for formulas, `std::time::Duration` for the engine
//! - Bandwidth: kHz
//! - Distance: meters

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::types::{PREAMBLE_SYMBOLS, RadioMode};

/// Default transmit power of every device in dBm.
pub const DEFAULT_TX_POWER: f64 = 14.0;

/// Lowest transmit power the power-reducing mode may select, in dBm.
pub const MIN_TX_POWER: f64 = 2.0;

/// Datasheet sensitivity used for the fast SF6/BW500 mode, which has no
/// measured entry.
pub const FAST_MODE_SENSITIVITY: f64 = -112.0;

/// Bandwidths with measured sensitivities, in kHz.
pub const BANDWIDTHS: [u32; 3] = [125, 250, 500];

/// Measured sensitivities in dBm: one row per spreading factor 7..=12, one
/// column per entry of [`BANDWIDTHS`].
pub const SENSITIVITY_TABLE: [(u8, [f64; 3]); 6] = [
    (7, [-126.5, -124.25, -120.75]),
    (8, [-127.25, -126.75, -124.0]),
    (9, [-131.25, -128.25, -127.5]),
    (10, [-132.75, -130.25, -128.75]),
    (11, [-134.5, -132.75, -128.75]),
    (12, [-133.25, -132.25, -132.25]),
];

/// Parameters of the log-distance path loss model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathLossParameters {
    /// Path loss exponent (γ).
    pub path_loss_exponent: f64,
    /// Reference distance d₀ in meters.
    pub reference_distance: f64,
    /// Path loss at the reference distance in dB.
    pub path_loss_at_reference_distance: f64,
    /// Additional fixed loss (cables, antenna) in dB.
    pub fixed_loss: f64,
}

impl Default for PathLossParameters {
    fn default() -> Self {
        Self {
            path_loss_exponent: 2.08,
            reference_distance: 40.0,
            path_loss_at_reference_distance: 127.41,
            fixed_loss: 0.0,
        }
    }
}

/// Gains of a directional antenna pointed at the home station, per angular
/// sector between the home direction and the target direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectionalGains {
    /// Up to 30° off axis.
    pub within_30: f64,
    /// Up to 90° off axis.
    pub within_90: f64,
    /// Up to 150° off axis.
    pub within_150: f64,
    /// Beyond 150°.
    pub beyond_150: f64,
}

impl Default for DirectionalGains {
    fn default() -> Self {
        Self {
            within_30: 4.0,
            within_90: 2.0,
            within_150: -4.0,
            beyond_150: -3.0,
        }
    }
}

/// Symbol duration in milliseconds: `T_sym = 2^SF / BW`.
pub fn symbol_time(spreading_factor: u8, bandwidth: u32) -> f64 {
    2.0_f64.powi(spreading_factor as i32) / bandwidth as f64
}

/// Packet airtime in milliseconds.
///
/// ```text
/// T_pre = (N_pre + 4.25) × T_sym
/// N_pl  = 8 + max(ceil((8·PL − 4·SF + 28 + 16 − 20·H) / (4·(SF − 2·DE))) × (CR + 4), 0)
/// ```
///
/// Low data rate optimization (DE) is forced for BW125 with SF11/SF12, the
/// implicit header (H) for SF6. CRC is always on.
pub fn calculate_air_time(spreading_factor: u8, coding_rate: u8, payload_length: usize, bandwidth: u32) -> f64 {
    let de = if bandwidth == 125 && (spreading_factor == 11 || spreading_factor == 12) { 1.0 } else { 0.0 };
    let ih = if spreading_factor == 6 { 1.0 } else { 0.0 };

    let symbol_time = symbol_time(spreading_factor, bandwidth);
    let preamble_time = (PREAMBLE_SYMBOLS + 4.25) * symbol_time;

    let sf = spreading_factor as f64;
    let numerator = 8.0 * payload_length as f64 - 4.0 * sf + 28.0 + 16.0 - 20.0 * ih;
    let denom = 4.0 * (sf - 2.0 * de);
    let payload_symbols = 8.0 + ((numerator / denom).ceil() * (coding_rate as f64 + 4.0)).max(0.0);

    preamble_time + payload_symbols * symbol_time
}

/// Airtime as a `Duration` for the event engine.
pub fn air_time_duration(spreading_factor: u8, coding_rate: u8, payload_length: usize, bandwidth: u32) -> Duration {
    Duration::from_secs_f64(calculate_air_time(spreading_factor, coding_rate, payload_length, bandwidth) / 1000.0)
}

/// Path loss in dB at `distance` meters.
///
/// ```text
/// PL(d) = PL(d₀) + 10 × γ × log₁₀(d / d₀)
/// ```
///
/// Distances under one meter are evaluated at one meter.
pub fn calculate_path_loss(distance: f64, params: &PathLossParameters) -> f64 {
    let distance = distance.max(1.0);
    params.path_loss_at_reference_distance + 10.0 * params.path_loss_exponent * (distance / params.reference_distance).log10()
}

/// Received power in dBm without antenna gain: `P_rx = P_tx − GL − PL(d)`.
pub fn calculate_received_power(tx_power_dbm: f64, distance: f64, params: &PathLossParameters) -> f64 {
    tx_power_dbm - params.fixed_loss - calculate_path_loss(distance, params)
}

/// Antenna gain in dB for a target `angle` degrees away from the home
/// direction.
pub fn directional_gain(angle: f64, gains: &DirectionalGains) -> f64 {
    if angle <= 30.0 {
        gains.within_30
    } else if angle <= 90.0 {
        gains.within_90
    } else if angle <= 150.0 {
        gains.within_150
    } else {
        gains.beyond_150
    }
}

/// Measured sensitivity for a spreading factor/bandwidth pair.
pub fn sensitivity(spreading_factor: u8, bandwidth: u32) -> Option<f64> {
    let column = BANDWIDTHS.iter().position(|&bw| bw == bandwidth)?;
    SENSITIVITY_TABLE
        .iter()
        .find(|(sf, _)| *sf == spreading_factor)
        .map(|(_, row)| row[column])
}

/// Receive threshold deciding whether a link is lost, per radio mode.
///
/// Modes with a fixed setting use that setting's sensitivity; modes that let
/// each device choose use the lowest sensitivity in the table.
pub fn min_sensitivity(mode: RadioMode) -> f64 {
    if mode.allows_free_choice() {
        return SENSITIVITY_TABLE
            .iter()
            .flat_map(|(_, row)| row.iter().copied())
            .fold(f64::INFINITY, f64::min);
    }
    let (spreading_factor, bandwidth) = match mode {
        RadioMode::FixedFast => (6, 500),
        _ => (12, 125),
    };
    // SF6 has no measured entry
    sensitivity(spreading_factor, bandwidth).unwrap_or(FAST_MODE_SENSITIVITY)
}

/// Radius of the disc devices are placed in around their home station.
///
/// Solves the link budget for distance with a natural exponential,
/// `d = d₀ · e^x` with `x = (P_tx − GL − S_min − PL(d₀)) / (10 γ)`. The exact
/// threshold distance is `d₀ · 10^x`. When the budget at `d₀` is negative
/// (`x < 0`) the natural exponential overshoots it, so the smaller of the
/// two is used and every point of the disc closes the link.
pub fn calculate_max_distance(tx_power_dbm: f64, min_sensitivity: f64, params: &PathLossParameters) -> f64 {
    let link_budget = tx_power_dbm - params.fixed_loss - min_sensitivity;
    let exponent = (link_budget - params.path_loss_at_reference_distance) / (10.0 * params.path_loss_exponent);
    params.reference_distance * exponent.exp().min(10f64.powf(exponent))
}

/// Spreading factor/bandwidth choice for a distance-optimized device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkSettings {
    pub spreading_factor: u8,
    pub bandwidth: u32,
    pub sensitivity: f64,
    /// Airtime in milliseconds.
    pub airtime: f64,
}

/// Pick the combination with the shortest airtime whose sensitivity is
/// below `received_power`. Ties keep the first match in table order.
///
/// Returns `None` when no combination can decode the link.
pub fn select_fastest_settings(received_power: f64, coding_rate: u8, payload_length: usize) -> Option<LinkSettings> {
    let mut best: Option<LinkSettings> = None;
    for (spreading_factor, row) in SENSITIVITY_TABLE.iter() {
        for (column, &bandwidth) in BANDWIDTHS.iter().enumerate() {
            let sensitivity = row[column];
            if sensitivity >= received_power {
                continue;
            }
            let airtime = calculate_air_time(*spreading_factor, coding_rate, payload_length, bandwidth);
            if best.is_none_or(|current| airtime < current.airtime) {
                best = Some(LinkSettings {
                    spreading_factor: *spreading_factor,
                    bandwidth,
                    sensitivity,
                    airtime,
                });
            }
        }
    }
    best
}

/// Lower the transmit power by the whole-dB margin left above `sensitivity`,
/// never below [`MIN_TX_POWER`].
pub fn reduced_tx_power(tx_power_dbm: f64, received_power: f64, sensitivity: f64) -> f64 {
    (tx_power_dbm - (received_power - sensitivity).floor()).max(MIN_TX_POWER)
}
