//! Chip-level activation units.

use super::component::{ActivationModel, Component};
use crate::settings::{ActivationKind, Settings};

/// one comparator and one register per unit
#[derive(Debug, Clone)]
pub struct Relu {
    dff_bit_area: f64,
    dff_energy_per_bit: f64,
    adder_area_per_bit: f64,
    clk_freq: f64,

    num_unit: usize,
    num_bit: usize,

    area: f64,
    read_latency: f64,
    read_dynamic_energy: f64,
}

impl Relu {
    pub fn new(settings: &Settings) -> Self {
        Relu {
            dff_bit_area: settings.technology.dff_bit_area,
            dff_energy_per_bit: settings.technology.dff_energy_per_bit,
            adder_area_per_bit: settings.technology.adder_area_per_bit,
            clk_freq: settings.chip.clk_freq,
            num_unit: 0,
            num_bit: 0,
            area: 0.0,
            read_latency: 0.0,
            read_dynamic_energy: 0.0,
        }
    }
}

impl Component for Relu {
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

impl ActivationModel for Relu {
    fn initialize(&mut self, num_unit: usize, num_bit_in: usize, _num_bit_out: usize) {
        self.num_unit = num_unit.max(1);
        self.num_bit = num_bit_in;
    }

    fn calculate_area(&mut self, _width_target: f64) {
        self.area = (self.num_unit * self.num_bit) as f64
            * (self.dff_bit_area + self.adder_area_per_bit);
    }

    fn calculate_latency(&mut self, num_read: f64) {
        self.read_latency = num_read / self.clk_freq;
    }

    fn calculate_power(&mut self, num_read: f64) {
        self.read_dynamic_energy =
            num_read * (self.num_unit * self.num_bit) as f64 * self.dff_energy_per_bit;
    }

    fn num_unit(&self) -> usize {
        self.num_unit
    }

    fn outputs_per_read(&self) -> usize {
        self.num_unit
    }
}

/// look-up table with one entry per output level
#[derive(Debug, Clone)]
pub struct Sigmoid {
    sram_bit_area: f64,
    sram_energy_per_bit: f64,
    adder_area_per_bit: f64,
    clk_freq: f64,

    num_unit: usize,
    num_bit_in: usize,
    num_bit_out: usize,

    area: f64,
    read_latency: f64,
    read_dynamic_energy: f64,
}

impl Sigmoid {
    pub fn new(settings: &Settings) -> Self {
        Sigmoid {
            sram_bit_area: settings.technology.sram_bit_area,
            sram_energy_per_bit: settings.technology.sram_energy_per_bit,
            adder_area_per_bit: settings.technology.adder_area_per_bit,
            clk_freq: settings.chip.clk_freq,
            num_unit: 0,
            num_bit_in: 0,
            num_bit_out: 0,
            area: 0.0,
            read_latency: 0.0,
            read_dynamic_energy: 0.0,
        }
    }

    fn num_entry(&self) -> usize {
        1 << self.num_bit_out
    }
}

impl Component for Sigmoid {
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

impl ActivationModel for Sigmoid {
    fn initialize(&mut self, num_unit: usize, num_bit_in: usize, num_bit_out: usize) {
        self.num_unit = num_unit.max(1);
        self.num_bit_in = num_bit_in;
        self.num_bit_out = num_bit_out;
    }

    fn calculate_area(&mut self, _width_target: f64) {
        let table = (self.num_entry() * self.num_bit_out) as f64 * self.sram_bit_area;
        // entry search compares the full input word
        let compare = self.num_bit_in as f64 * self.adder_area_per_bit;
        self.area = self.num_unit as f64 * (table + compare);
    }

    fn calculate_latency(&mut self, num_read: f64) {
        // compare, then read the table
        self.read_latency = 2.0 * num_read / self.clk_freq;
    }

    fn calculate_power(&mut self, num_read: f64) {
        self.read_dynamic_energy =
            num_read * (self.num_unit * self.num_bit_out) as f64 * self.sram_energy_per_bit;
    }

    fn num_unit(&self) -> usize {
        self.num_unit
    }

    /// the whole table is swept once per read
    fn outputs_per_read(&self) -> usize {
        self.num_entry()
    }
}

pub fn activation_unit(settings: &Settings) -> Box<dyn ActivationModel> {
    match settings.chip.activation {
        ActivationKind::Relu => Box::new(Relu::new(settings)),
        ActivationKind::Sigmoid => Box::new(Sigmoid::new(settings)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activation_selection() {
        let settings = Settings::new(vec!["configs/default.toml".into()]).unwrap();
        let relu = format!("{:?}", activation_unit(&settings));
        assert!(relu.starts_with("Relu"));

        let settings = Settings::new(vec![
            "configs/default.toml".into(),
            "configs/optional_configs/sigmoid.toml".into(),
        ])
        .unwrap();
        let mut sigmoid = activation_unit(&settings);
        assert!(format!("{:?}", sigmoid).starts_with("Sigmoid"));
        sigmoid.initialize(64, 20, 8);
        sigmoid.calculate_latency(3.0);
        assert!((sigmoid.read_latency() - 6e-9).abs() < 1e-15);
        assert_eq!(sigmoid.num_unit(), 64);
        assert_eq!(sigmoid.outputs_per_read(), 256);
    }

    #[test]
    fn test_relu() {
        let settings = Settings::new(vec!["configs/default.toml".into()]).unwrap();
        let mut relu = Relu::new(&settings);
        relu.initialize(64, 8, 8);
        relu.calculate_area(0.0);
        assert!(relu.area() > 0.0);
        relu.calculate_latency(4.0);
        relu.calculate_power(4.0);
        assert!((relu.read_latency() - 4e-9).abs() < 1e-15);
        assert!((relu.read_dynamic_energy() - 4.0 * 512.0 * 2e-15).abs() < 1e-20);
        assert_eq!(relu.outputs_per_read(), 64);
    }
}
