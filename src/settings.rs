use config::{Config, ConfigError, File};
use log::warn;
use serde::{Deserialize, Serialize};
use std::string::String;

use crate::error::{NeuroSimError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub mapping: MappingSettings,
    pub array: ArraySettings,
    pub chip: ChipSettings,
    pub technology: TechnologySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingSettings {
    /// place layers sharing the dominant kernel geometry on novel-mapped tiles
    pub novel_mapping: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArraySettings {
    pub num_row_sub_array: usize,
    pub num_col_sub_array: usize,
    /// bits stored per device
    pub cell_bit: u32,
    /// siemens
    pub max_conductance: f64,
    pub min_conductance: f64,
    /// columns sharing one ADC
    pub num_col_muxed: usize,
    /// analog (multi-row) read instead of row-by-row digital read
    pub parallel_read: bool,
    /// ADC output levels when `parallel_read` is on
    pub level_output: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationKind {
    Relu,
    Sigmoid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferType {
    Sram,
    RegisterFile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChipSettings {
    /// activation and inter-tile accumulation happen outside the tiles
    pub chip_activation: bool,
    pub activation: ActivationKind,
    pub max_global_bus_width: usize,
    pub global_bus_delay_tolerance: f64,
    pub tree_folded_ratio: f64,
    pub global_buffer_type: BufferType,
    /// hertz
    pub clk_freq: f64,
    /// ohm per metre
    pub unit_length_wire_resistance: f64,
}

/// First-order constants for the analytic device models, all in SI units
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnologySettings {
    pub feature_size: f64,
    pub cell_area_f2: f64,
    pub periphery_ratio: f64,
    pub read_voltage: f64,
    pub read_pulse_width: f64,
    pub adc_area: f64,
    pub adc_energy: f64,
    pub adc_latency: f64,
    pub sram_bit_area: f64,
    pub sram_energy_per_bit: f64,
    pub dff_bit_area: f64,
    pub dff_energy_per_bit: f64,
    pub adder_area_per_bit: f64,
    pub adder_energy_per_bit: f64,
    pub adder_delay: f64,
    pub wire_capacitance: f64,
    pub wire_pitch: f64,
    pub vdd: f64,
    pub sub_array_leakage: f64,
}

impl Settings {
    /// later files override earlier ones
    pub fn new(config_path: Vec<String>) -> std::result::Result<Self, ConfigError> {
        let mut builder = Config::builder();
        for i in config_path {
            builder = builder.add_source(File::with_name(&i));
        }
        builder.build()?.try_deserialize()
    }
}

/// Weight/input precision of one run and the cell replication it implies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Precision {
    pub synapse_bit: u32,
    pub num_bit_input: u32,
    pub cell_bit: u32,
    pub num_row_per_synapse: usize,
    pub num_col_per_synapse: usize,
}

impl Precision {
    pub fn new(synapse_bit: u32, num_bit_input: u32, cell_bit: u32) -> Result<Self> {
        if synapse_bit == 0 || num_bit_input == 0 || cell_bit == 0 {
            return Err(NeuroSimError::infeasible(
                "synapse, input and cell precision must all be at least one bit",
            ));
        }
        // codewords and activation look-up tables are indexed by a u64
        if synapse_bit >= u64::BITS || num_bit_input >= u64::BITS {
            return Err(NeuroSimError::infeasible(format!(
                "synapse ({} bit) and input ({} bit) precision must stay below {} bit",
                synapse_bit,
                num_bit_input,
                u64::BITS
            )));
        }
        let cell_bit = if cell_bit > synapse_bit {
            warn!(
                "memory precision ({} bit) is higher than synapse precision ({} bit), using {} bit cells",
                cell_bit, synapse_bit, synapse_bit
            );
            synapse_bit
        } else {
            cell_bit
        };
        let num_col_per_synapse = ((synapse_bit + cell_bit - 1) / cell_bit) as usize;
        Ok(Precision {
            synapse_bit,
            num_bit_input,
            cell_bit,
            num_row_per_synapse: 1,
            num_col_per_synapse,
        })
    }
}
