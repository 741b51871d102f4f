//! Station layouts.
//!
//! Layouts are produced by [`TopologyGenerator`]s registered per station
//! count in a [`TopologyRegistry`]. Explicit coordinates from the run
//! configuration take precedence over any preset.

use std::collections::BTreeMap;

use crate::simulation::types::{Point, SimulationError};

/// Dimensions of the simulated area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaLayout {
    /// Placement radius around each station (m).
    pub max_distance: f64,
    pub station_spacing: f64,
    pub width: f64,
    pub height: f64,
}

impl AreaLayout {
    pub fn new(max_distance: f64, station_spacing: f64, station_count: usize) -> Self {
        Self {
            max_distance,
            station_spacing,
            width: max_distance + station_spacing * station_count as f64,
            height: max_distance,
        }
    }
}

/// Produces station positions for a fixed number of stations.
pub trait TopologyGenerator {
    fn name(&self) -> &str;
    fn station_count(&self) -> usize;
    /// One position per station, indexed by station id.
    fn positions(&self, layout: &AreaLayout) -> Vec<Point>;
}

/// Small clusters laid out on a spacing grid anchored at
/// `(max_distance, height)`. Offsets are in units of the station spacing.
pub struct ClusterTopology {
    name: String,
    offsets: Vec<(f64, f64)>,
}

impl ClusterTopology {
    pub fn new(name: impl Into<String>, offsets: Vec<(f64, f64)>) -> Self {
        Self { name: name.into(), offsets }
    }

    /// Cluster presets for one to five stations.
    pub fn preset(station_count: usize) -> Option<Self> {
        let offsets = match station_count {
            1 => vec![(0.0, 0.0)],
            2 => vec![(0.0, 0.0), (1.0, 0.0)],
            // The middle station gets id 0
            3 => vec![(1.0, 0.0), (0.0, 0.0), (2.0, 0.0)],
            4 => vec![(1.0, 0.0), (0.0, 0.0), (2.0, 0.0), (1.0, 1.0)],
            5 => vec![(1.0, 1.0), (0.0, 1.0), (2.0, 1.0), (1.0, 0.0), (1.0, 2.0)],
            _ => return None,
        };
        Some(Self::new(format!("cluster-{}", station_count), offsets))
    }
}

impl TopologyGenerator for ClusterTopology {
    fn name(&self) -> &str {
        &self.name
    }

    fn station_count(&self) -> usize {
        self.offsets.len()
    }

    fn positions(&self, layout: &AreaLayout) -> Vec<Point> {
        self.offsets
            .iter()
            .map(|(dx, dy)| Point::new(layout.max_distance + dx * layout.station_spacing, layout.height + dy * layout.station_spacing))
            .collect()
    }
}

/// Stations spread evenly over the area in rows, filled row by row.
pub struct GridTopology {
    pub columns: usize,
    pub rows: usize,
}

impl TopologyGenerator for GridTopology {
    fn name(&self) -> &str {
        "grid"
    }

    fn station_count(&self) -> usize {
        self.columns * self.rows
    }

    fn positions(&self, layout: &AreaLayout) -> Vec<Point> {
        let x_step = layout.width / (self.columns + 1) as f64;
        let y_step = layout.height / (self.rows + 1) as f64;
        (0..self.rows)
            .flat_map(|row| (0..self.columns).map(move |column| Point::new((column + 1) as f64 * x_step, (row + 1) as f64 * y_step)))
            .collect()
    }
}

/// Station layouts keyed by station count.
#[derive(Default)]
pub struct TopologyRegistry {
    generators: BTreeMap<usize, Box<dyn TopologyGenerator>>,
}

impl TopologyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the cluster layouts for 1-5 stations and the grids for
    /// 6, 8, 24 and 96 stations.
    pub fn with_presets() -> Self {
        let mut registry = Self::new();
        for count in 1..=5 {
            if let Some(cluster) = ClusterTopology::preset(count) {
                registry.register(Box::new(cluster));
            }
        }
        for (columns, rows) in [(3, 2), (4, 2), (8, 3), (24, 4)] {
            registry.register(Box::new(GridTopology { columns, rows }));
        }
        registry
    }

    /// Add a generator, replacing any earlier one for the same station count.
    pub fn register(&mut self, generator: Box<dyn TopologyGenerator>) {
        let count = generator.station_count();
        if let Some(previous) = self.generators.insert(count, generator) {
            log::debug!("Replaced topology '{}' for {} stations", previous.name(), count);
        }
    }

    /// Station positions for a run. `explicit` coordinates win over presets
    /// and must list exactly `station_count` positions.
    pub fn resolve(&self, station_count: usize, layout: &AreaLayout, explicit: Option<&[Point]>) -> Result<Vec<Point>, SimulationError> {
        if let Some(positions) = explicit {
            if positions.len() != station_count {
                return Err(SimulationError::TopologyMismatch {
                    expected: station_count,
                    found: positions.len(),
                });
            }
            return Ok(positions.to_vec());
        }

        let generator = self
            .generators
            .get(&station_count)
            .ok_or(SimulationError::MissingTopology { station_count })?;
        let positions = generator.positions(layout);
        if positions.len() != station_count {
            return Err(SimulationError::TopologyMismatch {
                expected: station_count,
                found: positions.len(),
            });
        }
        log::debug!("Using topology '{}' for {} stations", generator.name(), station_count);
        Ok(positions)
    }
}
