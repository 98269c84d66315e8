//! Devices: the flattened graph and per-device runtime state.

pub mod graph;
pub mod state;

pub use graph::{DeviceGraph, Edge, Node};
pub use state::{DeviceState, DeviceStates};
