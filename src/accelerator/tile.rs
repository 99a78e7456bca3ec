//! First-order model of one tile: PEs of sub-arrays with column-muxed ADCs,
//! a shift-add accumulation path and a small tile buffer.
//!
//! Array energy follows the data: every active input bit drives one row and
//! dissipates `V^2 * t_pulse * sum(G)` over the conductances of that row.

use log::trace;

use super::{
    adder_tree::log2_ceil,
    assembler::sqrt_ceil,
    component::{Performance, TileArea, TileGeometry, TileModel, TileWork},
};
use crate::{
    floorplan::replication::ceil_div,
    settings::{Precision, Settings, TechnologySettings},
};

#[derive(Debug, Clone)]
pub struct AnalyticTile {
    tech: TechnologySettings,
    num_row_sub_array: usize,
    num_col_sub_array: usize,
    num_col_muxed: usize,
    parallel_read: bool,
    chip_activation: bool,
    clk_freq: f64,
    num_bit_input: usize,
    /// width of the partial sums leaving a sub-array
    psum_bits: usize,
}

impl AnalyticTile {
    pub fn new(settings: &Settings, precision: &Precision) -> Self {
        let array = &settings.array;
        let psum_bits = if array.parallel_read {
            log2_ceil(array.level_output) + precision.num_bit_input as usize + 1
        } else {
            log2_ceil(array.num_row_sub_array) + precision.cell_bit as usize - 1
                + precision.num_bit_input as usize
                + 1
        };
        AnalyticTile {
            tech: settings.technology.clone(),
            num_row_sub_array: array.num_row_sub_array,
            num_col_sub_array: array.num_col_sub_array,
            num_col_muxed: array.num_col_muxed.max(1),
            parallel_read: array.parallel_read,
            chip_activation: settings.chip.chip_activation,
            clk_freq: settings.chip.clk_freq,
            num_bit_input: precision.num_bit_input as usize,
            psum_bits,
        }
    }

    fn sub_arrays_per_pe(&self, pe_size: usize) -> usize {
        ceil_div(pe_size, self.num_row_sub_array) * ceil_div(pe_size, self.num_col_sub_array)
    }

    fn cell_area(&self) -> f64 {
        self.tech.feature_size * self.tech.feature_size * self.tech.cell_area_f2
    }

    /// bits the tile buffer moves per cycle
    fn bandwidth(geometry: &TileGeometry) -> f64 {
        (geometry.pe_size * sqrt_ceil(geometry.num_pe)) as f64
    }
}

impl TileModel for AnalyticTile {
    fn calculate_area(&mut self, geometry: &TileGeometry) -> TileArea {
        let sub_arrays = geometry.num_pe * self.sub_arrays_per_pe(geometry.pe_size);
        let array = (sub_arrays * self.num_row_sub_array * self.num_col_sub_array) as f64
            * self.cell_area();
        let adc_per_sub_array = ceil_div(self.num_col_sub_array, self.num_col_muxed);
        let adc = (sub_arrays * adc_per_sub_array) as f64 * self.tech.adc_area;
        let accum = (sub_arrays * adc_per_sub_array * self.psum_bits) as f64
            * self.tech.adder_area_per_bit;

        // input and output staging for every PE
        let buffer_bits = 2 * geometry.num_pe * geometry.pe_size * self.num_bit_input;
        let mut other = array * self.tech.periphery_ratio
            + buffer_bits as f64 * self.tech.sram_bit_area;
        if !self.chip_activation {
            other += (geometry.num_pe * geometry.pe_size * self.num_bit_input) as f64
                * self.tech.dff_bit_area;
        }

        let pe_edge = ((array + adc + accum) / geometry.num_pe as f64).sqrt();
        let ic = Self::bandwidth(geometry) * self.tech.wire_pitch
            * pe_edge
            * sqrt_ceil(geometry.num_pe) as f64;

        let total = array + adc + accum + other + ic;
        let height = total.sqrt();
        TileArea {
            total,
            ic,
            adc,
            accum,
            other,
            height,
            width: total / height,
        }
    }

    fn calculate_performance(&mut self, geometry: &TileGeometry, work: &TileWork) -> Performance {
        let rows = work.weights.rows();
        let cols = work.weights.cols();
        let vectors = work.num_input_vectors;
        let speed_up = (work.speed_up_row * work.speed_up_col).max(1);
        let passes = ceil_div(vectors, speed_up) as f64;
        let row_blocks = ceil_div(rows, self.num_row_sub_array).max(1);

        // number of active input bits per row and the conductance drawn by that row
        let mut active_bits = 0usize;
        let mut array_conductance = 0.0;
        for r in 0..rows {
            let active = work
                .inputs
                .row(r)
                .iter()
                .take(vectors)
                .filter(|&&bit| bit != 0.0)
                .count();
            let conductance: f64 = work.weights.row(r).iter().sum();
            active_bits += active;
            array_conductance += active as f64 * conductance;
        }
        trace!(
            "tile slice {}x{}, {} vectors, {} active bits",
            rows,
            cols,
            vectors,
            active_bits
        );

        // row-by-row sensing reads every row of a sub-array on its own
        let reads_per_pass = if self.parallel_read {
            self.num_col_muxed as f64
        } else {
            (self.num_col_muxed * rows.min(self.num_row_sub_array)) as f64
        };
        let array_latency = passes * reads_per_pass * self.tech.read_pulse_width;
        let latency_adc = passes * reads_per_pass * self.tech.adc_latency;
        let latency_accum = passes * log2_ceil(row_blocks).max(1) as f64 * self.tech.adder_delay;

        let bandwidth = Self::bandwidth(geometry);
        let buffer_bits = ((rows + cols) * vectors) as f64;
        let buffer_latency = (buffer_bits / bandwidth).ceil() / self.clk_freq;
        let ic_latency = (buffer_bits / bandwidth / speed_up as f64).ceil() / self.clk_freq;
        let latency_other = buffer_latency + ic_latency;

        let v = self.tech.read_voltage;
        let array_energy = v * v * self.tech.read_pulse_width * array_conductance;
        let conversions = if self.parallel_read {
            (vectors * cols * row_blocks) as f64
        } else {
            (active_bits * cols) as f64
        };
        let energy_adc = conversions * self.tech.adc_energy;
        let energy_accum = (vectors * cols * row_blocks * self.psum_bits) as f64
            * self.tech.adder_energy_per_bit;

        let buffer_energy = buffer_bits * self.tech.sram_energy_per_bit;
        let tile_edge = (self.calculate_area(geometry).total).sqrt();
        let ic_energy = buffer_bits * self.tech.wire_capacitance * tile_edge * self.tech.vdd * self.tech.vdd;
        let mut energy_other = buffer_energy + ic_energy;
        if !self.chip_activation {
            energy_other += (ceil_div(vectors, self.num_bit_input) * cols * self.num_bit_input)
                as f64
                * self.tech.dff_energy_per_bit;
        }

        Performance {
            read_latency: array_latency + latency_adc + latency_accum + latency_other,
            read_dynamic_energy: array_energy + energy_adc + energy_accum + energy_other,
            leakage: (geometry.num_pe * self.sub_arrays_per_pe(geometry.pe_size)) as f64
                * self.tech.sub_array_leakage,
            buffer_latency,
            buffer_energy,
            ic_latency,
            ic_energy,
            latency_adc,
            latency_accum,
            latency_other,
            energy_adc,
            energy_accum,
            energy_other,
        }
    }
}
