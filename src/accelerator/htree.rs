//! First-order H-tree bus between the global buffer and the tile grid.

use super::component::{Component, InterconnectModel};
use crate::{floorplan::replication::TileLocation, settings::Settings};

#[derive(Debug, Clone)]
pub struct HTree {
    delay_tolerance: f64,
    folded_ratio: f64,
    clk_freq: f64,
    wire_resistance: f64,
    wire_capacitance: f64,
    wire_pitch: f64,
    vdd: f64,

    num_tile_row: usize,
    num_tile_col: usize,
    bus_width: usize,

    area: f64,
    read_latency: f64,
    read_dynamic_energy: f64,
}

impl HTree {
    pub fn new(settings: &Settings) -> Self {
        HTree {
            delay_tolerance: settings.chip.global_bus_delay_tolerance,
            folded_ratio: settings.chip.tree_folded_ratio,
            clk_freq: settings.chip.clk_freq,
            wire_resistance: settings.chip.unit_length_wire_resistance,
            wire_capacitance: settings.technology.wire_capacitance,
            wire_pitch: settings.technology.wire_pitch,
            vdd: settings.technology.vdd,
            num_tile_row: 0,
            num_tile_col: 0,
            bus_width: 0,
            area: 0.0,
            read_latency: 0.0,
            read_dynamic_energy: 0.0,
        }
    }

    /// wire length from the buffer at the grid origin to the far corner of a tile
    fn distance(location: TileLocation, unit_height: f64, unit_width: f64) -> f64 {
        (location.row + 1) as f64 * unit_height + (location.col + 1) as f64 * unit_width
    }
}

impl Component for HTree {
    fn area(&self) -> f64 {
        self.area
    }

    fn read_latency(&self) -> f64 {
        self.read_latency
    }

    fn read_dynamic_energy(&self) -> f64 {
        self.read_dynamic_energy
    }
}

impl InterconnectModel for HTree {
    fn initialize(&mut self, num_tile_row: usize, num_tile_col: usize, bus_width: usize) {
        self.num_tile_row = num_tile_row;
        self.num_tile_col = num_tile_col;
        self.bus_width = bus_width;
    }

    fn calculate_area(&mut self, unit_height: f64, unit_width: f64) {
        // every level of the tree spans half of the previous one, the sum stays
        // within the grid extent in each direction
        let length = self.num_tile_row as f64 * unit_height + self.num_tile_col as f64 * unit_width;
        let wire_area = length * self.bus_width as f64 * self.wire_pitch;
        self.area = wire_area * (1.0 - self.folded_ratio);
    }

    fn calculate_latency(
        &mut self,
        location: TileLocation,
        unit_height: f64,
        unit_width: f64,
        num_read: f64,
    ) {
        let length = Self::distance(location, unit_height, unit_width);
        let wire_delay = 0.38 * self.wire_resistance * self.wire_capacitance * length * length;
        let transfer = wire_delay.max(1.0 / self.clk_freq) * (1.0 + self.delay_tolerance);
        self.read_latency = num_read * transfer;
    }

    fn calculate_power(
        &mut self,
        location: TileLocation,
        unit_height: f64,
        unit_width: f64,
        num_bit_access: f64,
        num_read: f64,
    ) {
        let length = Self::distance(location, unit_height, unit_width);
        self.read_dynamic_energy =
            num_read * num_bit_access * self.wire_capacitance * length * self.vdd * self.vdd;
    }

    fn bus_width(&self) -> usize {
        self.bus_width
    }
}
