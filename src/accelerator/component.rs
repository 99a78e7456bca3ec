//! Contracts of the device-level models the chip is built from.
//!
//! Every model is initialized once per run and then re-evaluated for every
//! call; the `calculate_*` methods overwrite the state read back through
//! [`Component`], so one instance must never be shared between concurrent
//! evaluations.

use std::fmt::Debug;

use serde::Serialize;

use crate::{floorplan::mapping::MappingMode, floorplan::replication::TileLocation, matrix::MatrixView};

/// the result of the last `calculate_*` call
pub trait Component: Debug {
    fn area(&self) -> f64;
    fn read_latency(&self) -> f64;
    fn read_dynamic_energy(&self) -> f64;
}

/// global buffer holding the input feature maps
pub trait BufferModel: Component {
    fn initialize(&mut self, num_bit: usize, interface_width: usize);
    /// `height_target` in metres, 0 for a square macro
    fn calculate_area(&mut self, height_target: f64);
    fn calculate_latency(&mut self, bits_read: f64, num_read: f64, bits_write: f64, num_write: f64);
    fn calculate_power(&mut self, bits_read: f64, num_read: f64, bits_write: f64, num_write: f64);
    fn write_latency(&self) -> f64;
    fn write_dynamic_energy(&self) -> f64;
    fn height(&self) -> f64;
    fn width(&self) -> f64;
}

/// H-tree connecting the global buffer to every tile
pub trait InterconnectModel: Component {
    fn initialize(&mut self, num_tile_row: usize, num_tile_col: usize, bus_width: usize);
    fn calculate_area(&mut self, unit_height: f64, unit_width: f64);
    fn calculate_latency(
        &mut self,
        location: TileLocation,
        unit_height: f64,
        unit_width: f64,
        num_read: f64,
    );
    fn calculate_power(
        &mut self,
        location: TileLocation,
        unit_height: f64,
        unit_width: f64,
        num_bit_access: f64,
        num_read: f64,
    );
    fn bus_width(&self) -> usize;
}

/// accumulation of partial sums coming from several tiles
pub trait AdderTreeModel: Component {
    fn initialize(&mut self, num_inputs: usize, num_bit: usize, num_lanes: usize);
    fn calculate_area(&mut self, height_target: f64);
    fn calculate_latency(&mut self, num_read: f64, num_unit_add: usize);
    fn calculate_power(&mut self, num_read: f64, num_unit_add: usize);
}

/// chip-level activation function, ReLU or sigmoid
pub trait ActivationModel: Component {
    fn initialize(&mut self, num_unit: usize, num_bit_in: usize, num_bit_out: usize);
    fn calculate_area(&mut self, width_target: f64);
    fn calculate_latency(&mut self, num_read: f64);
    fn calculate_power(&mut self, num_read: f64);
    fn num_unit(&self) -> usize;
    /// tile outputs one read activates, the divisor of the read count
    fn outputs_per_read(&self) -> usize;
}

pub trait MaxPoolModel: Component {
    fn initialize(&mut self, num_bit: usize, window: usize, num_unit: usize);
    fn calculate_area(&mut self, width_target: f64);
    fn calculate_latency(&mut self, num_read: f64);
    fn calculate_power(&mut self, num_read: f64);
    fn window(&self) -> usize;
}

/// PE arrangement of one tile kind
/// * `num_pe`: PEs in the tile, `ceil(tile/pe)^2` for conventional tiles
/// * `pe_size`: edge of one PE in synapse cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TileGeometry {
    pub mode: MappingMode,
    pub num_pe: usize,
    pub pe_size: usize,
}

/// area of one tile in square metres, split into reporting buckets
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TileArea {
    pub total: f64,
    pub ic: f64,
    pub adc: f64,
    pub accum: f64,
    pub other: f64,
    pub height: f64,
    pub width: f64,
}

/// the slice of one layer computed by one tile
#[derive(Debug, Clone, Copy)]
pub struct TileWork<'a> {
    /// conductance mapped weights, one row per input line
    pub weights: MatrixView<'a>,
    /// one row per input line, one column per bit-serial input vector
    pub inputs: MatrixView<'a>,
    pub speed_up_row: usize,
    pub speed_up_col: usize,
    pub num_input_vectors: usize,
}

/// latency (s) and energy (J) of a tile, a layer or the chip
///
/// `leakage` is a power (W) of one tile
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Performance {
    pub read_latency: f64,
    pub read_dynamic_energy: f64,
    pub leakage: f64,
    pub buffer_latency: f64,
    pub buffer_energy: f64,
    pub ic_latency: f64,
    pub ic_energy: f64,
    pub latency_adc: f64,
    pub latency_accum: f64,
    pub latency_other: f64,
    pub energy_adc: f64,
    pub energy_accum: f64,
    pub energy_other: f64,
}

pub trait TileModel: Debug {
    fn calculate_area(&mut self, geometry: &TileGeometry) -> TileArea;
    fn calculate_performance(&mut self, geometry: &TileGeometry, work: &TileWork) -> Performance;
}
