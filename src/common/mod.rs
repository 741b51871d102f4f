//! Configuration and station layouts shared by the simulation and the binary.

pub mod config;
pub mod topology;
