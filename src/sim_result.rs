use std::fmt;

use serde::Serialize;

use crate::{
    accelerator::{ChipArea, ChipInit, Performance},
    floorplan::{mapping::MappingMode, FloorPlan},
    settings::Settings,
};

/// the record written for every run
#[derive(Debug, Serialize, Default)]
pub struct SimResult {
    pub settings: Option<Settings>,
    pub stats: Option<SimStatistics>,
}

impl SimResult {
    pub fn new() -> Self {
        SimResult {
            settings: None,
            stats: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LayerStatistics {
    /// 1-based, as in the network file
    pub layer: usize,
    pub mode: MappingMode,
    pub num_tiles: usize,
    pub speed_up_row: usize,
    pub speed_up_col: usize,
    pub utilization: f64,
    pub performance: Performance,
    /// joules leaked by the idle tiles of the other layers
    pub leakage_energy: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ChipStatistics {
    pub performance: Performance,
    pub leakage_energy: f64,
    /// watts
    pub leakage_power: f64,
    pub operations: f64,
    pub tops_per_watt: f64,
    pub fps: f64,
}

impl ChipStatistics {
    /// # Description
    /// fill in the energy efficiency and the throughput of a
    /// layer-by-layer run from the accumulated totals
    pub fn finish(&mut self, operations: f64) {
        self.operations = operations;
        let energy_pj =
            self.performance.read_dynamic_energy * 1e12 + self.leakage_energy * 1e12;
        self.tops_per_watt = operations / energy_pj;
        self.fps = 1.0 / self.performance.read_latency;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SimStatistics {
    pub floor_plan: FloorPlan,
    pub chip_utilization: f64,
    pub resources: ChipInit,
    pub area: ChipArea,
    pub layers: Vec<LayerStatistics>,
    pub chip: ChipStatistics,
    pub simulation_time: String,
}

impl fmt::Display for SimStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let h = &self.floor_plan.hierarchy;
        writeln!(f, "==================== floor plan ====================")?;
        writeln!(
            f,
            "conventional tile: {}x{}, PE {}x{}",
            h.tile_size_cm, h.tile_size_cm, h.pe_size_cm, h.pe_size_cm
        )?;
        if h.num_pe_nm > 0 {
            writeln!(
                f,
                "novel tile: {}x{}x{}",
                h.num_pe_nm, h.pe_size_nm, h.pe_size_nm
            )?;
        }
        writeln!(f, "tile grid: {}x{}", h.num_tile_row, h.num_tile_col)?;
        for l in &self.layers {
            writeln!(
                f,
                "layer{}: {:?}, {} tiles, speed-up ({}, {}), utilization {:.4}",
                l.layer, l.mode, l.num_tiles, l.speed_up_row, l.speed_up_col, l.utilization
            )?;
        }
        writeln!(f, "memory utilization of the chip: {:.4}", self.chip_utilization)?;

        writeln!(f, "==================== area ====================")?;
        let a = &self.area;
        writeln!(f, "chip area: {:.3} um^2", a.total * 1e12)?;
        writeln!(
            f,
            "chip size: {:.3} um x {:.3} um",
            a.height * 1e6,
            a.width * 1e6
        )?;
        writeln!(f, "interconnect: {:.3} um^2", a.ic * 1e12)?;
        writeln!(f, "ADC: {:.3} um^2", a.adc * 1e12)?;
        writeln!(f, "accumulation: {:.3} um^2", a.accum * 1e12)?;
        writeln!(f, "other: {:.3} um^2", a.other * 1e12)?;

        writeln!(f, "==================== performance ====================")?;
        for l in &self.layers {
            let p = &l.performance;
            writeln!(
                f,
                "layer{}: read latency {:.3} ns, dynamic energy {:.3} pJ, leakage energy {:.3} pJ",
                l.layer,
                p.read_latency * 1e9,
                p.read_dynamic_energy * 1e12,
                l.leakage_energy * 1e12
            )?;
            writeln!(
                f,
                "    buffer {:.3} ns / {:.3} pJ, interconnect {:.3} ns / {:.3} pJ",
                p.buffer_latency * 1e9,
                p.buffer_energy * 1e12,
                p.ic_latency * 1e9,
                p.ic_energy * 1e12
            )?;
        }
        let c = &self.chip;
        let p = &c.performance;
        writeln!(f, "chip read latency: {:.3} ns", p.read_latency * 1e9)?;
        writeln!(f, "chip dynamic energy: {:.3} pJ", p.read_dynamic_energy * 1e12)?;
        writeln!(f, "chip leakage energy: {:.3} pJ", c.leakage_energy * 1e12)?;
        writeln!(f, "chip leakage power: {:.3} uW", c.leakage_power * 1e6)?;
        writeln!(
            f,
            "chip buffer: {:.3} ns / {:.3} pJ",
            p.buffer_latency * 1e9,
            p.buffer_energy * 1e12
        )?;
        writeln!(
            f,
            "chip interconnect: {:.3} ns / {:.3} pJ",
            p.ic_latency * 1e9,
            p.ic_energy * 1e12
        )?;
        writeln!(
            f,
            "latency ADC / accumulation / other: {:.3} / {:.3} / {:.3} ns",
            p.latency_adc * 1e9,
            p.latency_accum * 1e9,
            p.latency_other * 1e9
        )?;
        writeln!(
            f,
            "energy ADC / accumulation / other: {:.3} / {:.3} / {:.3} pJ",
            p.energy_adc * 1e12,
            p.energy_accum * 1e12,
            p.energy_other * 1e12
        )?;
        writeln!(f, "energy efficiency: {:.3} TOPS/W", c.tops_per_watt)?;
        write!(f, "throughput: {:.3} FPS", c.fps)
    }
}
