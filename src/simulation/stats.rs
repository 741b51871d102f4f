//! Run statistics and result output.
//!
//! `NetworkStatistics` is owned by the engine and updated at SEND and
//! COMPLETE. At the end of a run it is folded into a `RunSummary`, which is
//! appended as one line to the per-experiment results file and optionally
//! embedded in a JSON run report.

use anyhow::Context;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::types::{Point, RadioMode, RadioSettings};

/// Header of a freshly created results file.
const RESULTS_HEADER: &str = "# devices ratio collisions";

/// How one station saw one completed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceptionOutcome {
    /// Below the sensitivity of the station, never decodable.
    Lost,
    /// Destroyed by an overlapping transmission.
    Collided,
    Received,
}

/// Tallies kept over a run.
#[derive(Debug, Clone)]
pub struct NetworkStatistics {
    /// All stations belong to one network and count every device.
    shared_network: bool,
    total_sent: u64,
    sent_per_station: Vec<u64>,
    received_per_station: Vec<u64>,
    /// Candidate verdicts at SEND.
    collisions: u64,
    lost_receptions: u64,
    collided_receptions: u64,
    received_sequences: BTreeSet<u64>,
}

impl NetworkStatistics {
    pub fn new(station_count: usize, shared_network: bool) -> Self {
        Self {
            shared_network,
            total_sent: 0,
            sent_per_station: vec![0; station_count],
            received_per_station: vec![0; station_count],
            collisions: 0,
            lost_receptions: 0,
            collided_receptions: 0,
            received_sequences: BTreeSet::new(),
        }
    }

    /// Whether `station` accounts for attempts of a device homed at `home`.
    fn counts_for(&self, station: usize, home: usize) -> bool {
        self.shared_network || station == home
    }

    /// A device homed at `home` started a transmission.
    pub fn record_transmission(&mut self, home: usize) {
        self.total_sent += 1;
        for station in 0..self.sent_per_station.len() {
            if self.counts_for(station, home) {
                self.sent_per_station[station] += 1;
            }
        }
    }

    /// The arriving packet was found collided at one station.
    pub fn record_collision(&mut self) {
        self.collisions += 1;
    }

    /// Result of one attempt at one station.
    pub fn record_completion(&mut self, station: usize, home: usize, outcome: ReceptionOutcome, sequence: u64) {
        match outcome {
            ReceptionOutcome::Lost => self.lost_receptions += 1,
            ReceptionOutcome::Collided => self.collided_receptions += 1,
            ReceptionOutcome::Received => {
                if self.counts_for(station, home) {
                    if let Some(received) = self.received_per_station.get_mut(station) {
                        *received += 1;
                    }
                }
                self.received_sequences.insert(sequence);
            }
        }
    }

    pub fn total_sent(&self) -> u64 {
        self.total_sent
    }

    pub fn collisions(&self) -> u64 {
        self.collisions
    }

    pub fn lost_receptions(&self) -> u64 {
        self.lost_receptions
    }

    pub fn collided_receptions(&self) -> u64 {
        self.collided_receptions
    }

    pub fn sent_at(&self, station: usize) -> u64 {
        self.sent_per_station.get(station).copied().unwrap_or(0)
    }

    pub fn received_at(&self, station: usize) -> u64 {
        self.received_per_station.get(station).copied().unwrap_or(0)
    }

    /// Attempts decoded by at least one station.
    pub fn distinct_received(&self) -> u64 {
        self.received_sequences.len() as u64
    }

    pub fn station_ratio(&self, station: usize) -> f64 {
        ratio(self.received_at(station), self.sent_at(station))
    }

    /// `(distinct received − collisions) / total sent`, never negative.
    pub fn overall_ratio(&self) -> f64 {
        ratio(self.distinct_received().saturating_sub(self.collisions), self.total_sent)
    }

    pub fn raw_ratio(&self) -> f64 {
        ratio(self.distinct_received(), self.total_sent)
    }

    pub fn average_station_ratio(&self) -> f64 {
        let stations = self.sent_per_station.len();
        if stations == 0 || self.total_sent == 0 {
            return 0.0;
        }
        (0..stations).map(|s| self.station_ratio(s)).sum::<f64>() / stations as f64
    }

    pub fn summarize(&self, mode: RadioMode, device_count: usize) -> RunSummary {
        let stations = (0..self.sent_per_station.len())
            .map(|station| StationSummary {
                station_id: station as u32,
                sent: self.sent_at(station),
                received: self.received_at(station),
                ratio: self.station_ratio(station),
            })
            .collect();

        RunSummary {
            radio_mode: mode,
            device_count,
            station_count: self.sent_per_station.len(),
            total_sent: self.total_sent,
            distinct_received: self.distinct_received(),
            collisions: self.collisions,
            lost_receptions: self.lost_receptions,
            collided_receptions: self.collided_receptions,
            overall_ratio: self.overall_ratio(),
            raw_ratio: self.raw_ratio(),
            average_station_ratio: self.average_station_ratio(),
            stations,
        }
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 { 0.0 } else { numerator as f64 / denominator as f64 }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationSummary {
    pub station_id: u32,
    pub sent: u64,
    pub received: u64,
    pub ratio: f64,
}

/// Final figures of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub radio_mode: RadioMode,
    pub device_count: usize,
    pub station_count: usize,
    pub total_sent: u64,
    pub distinct_received: u64,
    pub collisions: u64,
    pub lost_receptions: u64,
    pub collided_receptions: u64,
    pub overall_ratio: f64,
    pub raw_ratio: f64,
    pub average_station_ratio: f64,
    pub stations: Vec<StationSummary>,
}

impl RunSummary {
    /// Row of the results file: `devices ratio collisions`.
    pub fn results_line(&self) -> String {
        format!("{} {} {}", self.device_count, self.overall_ratio, self.collisions)
    }
}

/// Results file collecting one line per run of the same mode and station count.
pub fn results_file_name(mode: RadioMode, station_count: usize) -> String {
    format!("exp{}BS{}.dat", mode.index(), station_count)
}

/// Append the summary line to its results file in `dir`, creating the
/// directory and the file header as needed.
pub fn append_summary_line(dir: &Path, summary: &RunSummary) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create results directory {}", dir.display()))?;

    let path = dir.join(results_file_name(summary.radio_mode, summary.station_count));
    let is_new = !path.exists();
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open results file {}", path.display()))?;

    if is_new {
        writeln!(file, "{}", RESULTS_HEADER).with_context(|| format!("Failed to write header to {}", path.display()))?;
    }
    writeln!(file, "{}", summary.results_line()).with_context(|| format!("Failed to append to {}", path.display()))?;

    Ok(path)
}

/// Per-device entry of the JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceReport {
    pub device_id: u32,
    pub home_station: u32,
    pub position: Point,
    pub settings: RadioSettings,
    /// Distance to the home station (m).
    pub home_distance: f64,
    pub sent: u64,
    /// Stations whose sensitivity this device never reaches.
    pub lost_at: Vec<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StationReport {
    pub station_id: u32,
    pub position: Point,
}

/// Full report of a run: layout, per-device settings and the summary.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// RFC 3339 timestamp of report creation.
    pub generated_at: String,
    pub seed: u64,
    pub duration_ms: u64,
    pub summary: RunSummary,
    pub stations: Vec<StationReport>,
    pub devices: Vec<DeviceReport>,
}

pub fn write_report(path: &Path, report: &RunReport) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create report directory {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(report).context("Failed to serialize run report")?;
    fs::write(path, json).with_context(|| format!("Failed to write run report {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("lora-sim-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn empty_run_reports_zero_ratios() {
        let stats = NetworkStatistics::new(3, true);
        assert_eq!(stats.overall_ratio(), 0.0);
        assert_eq!(stats.raw_ratio(), 0.0);
        assert_eq!(stats.average_station_ratio(), 0.0);
        assert_eq!(stats.station_ratio(2), 0.0);
    }

    #[test]
    fn shared_network_counts_every_attempt_at_every_station() {
        let mut stats = NetworkStatistics::new(2, true);
        stats.record_transmission(0);
        stats.record_completion(0, 0, ReceptionOutcome::Received, 1);
        stats.record_completion(1, 0, ReceptionOutcome::Received, 1);

        assert_eq!(stats.sent_at(0), 1);
        assert_eq!(stats.sent_at(1), 1);
        assert_eq!(stats.received_at(1), 1);
        // The same attempt heard twice is one delivery
        assert_eq!(stats.distinct_received(), 1);
        assert_eq!(stats.overall_ratio(), 1.0);
    }

    #[test]
    fn separate_networks_only_count_home_devices() {
        let mut stats = NetworkStatistics::new(2, false);
        stats.record_transmission(0);
        stats.record_completion(0, 0, ReceptionOutcome::Received, 1);
        stats.record_completion(1, 0, ReceptionOutcome::Received, 1);

        assert_eq!(stats.sent_at(1), 0);
        assert_eq!(stats.received_at(1), 0);
        for station in 0..2 {
            assert!(stats.received_at(station) <= stats.sent_at(station));
        }
        assert_eq!(stats.average_station_ratio(), 0.5);
    }

    #[test]
    fn overall_ratio_subtracts_collisions_without_going_negative() {
        let mut stats = NetworkStatistics::new(1, true);
        for sequence in 1..=4 {
            stats.record_transmission(0);
            if sequence <= 3 {
                stats.record_collision();
            }
            let outcome = if sequence == 4 { ReceptionOutcome::Received } else { ReceptionOutcome::Collided };
            stats.record_completion(0, 0, outcome, sequence);
        }
        assert_eq!(stats.overall_ratio(), 0.0);
        assert_eq!(stats.raw_ratio(), 0.25);
        assert_eq!(stats.collided_receptions(), 3);
    }

    #[test]
    fn results_file_gets_header_once() {
        let dir = temp_dir("results");
        let mut stats = NetworkStatistics::new(1, true);
        stats.record_transmission(0);
        stats.record_completion(0, 0, ReceptionOutcome::Received, 1);
        let summary = stats.summarize(RadioMode::DistanceOptimized, 10);

        let path = append_summary_line(&dir, &summary).unwrap();
        append_summary_line(&dir, &summary).unwrap();

        assert!(path.ends_with("exp3BS1.dat"));
        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec![RESULTS_HEADER, "10 1 0", "10 1 0"]);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn report_is_written_as_json() {
        let dir = temp_dir("report");
        let path = dir.join("nested").join("report.json");
        let stats = NetworkStatistics::new(1, true);
        let report = RunReport {
            generated_at: chrono::Utc::now().to_rfc3339(),
            seed: 42,
            duration_ms: 1000,
            summary: stats.summarize(RadioMode::FixedSlow, 0),
            stations: vec![StationReport {
                station_id: 0,
                position: Point::new(1.0, 2.0),
            }],
            devices: Vec::new(),
        };
        write_report(&path, &report).unwrap();

        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["seed"], 42);
        assert_eq!(value["summary"]["radio_mode"], "fixed-slow");
        assert_eq!(value["stations"][0]["position"]["y"], 2.0);
        let _ = fs::remove_dir_all(&dir);
    }
}
