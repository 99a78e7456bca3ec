use super::{
    adder_tree::log2_ceil,
    component::{Component, MaxPoolModel},
};
use crate::settings::Settings;

/// comparator tree over one pooling window per unit
#[derive(Debug, Clone)]
pub struct MaxPool {
    comparator_area_per_bit: f64,
    comparator_energy_per_bit: f64,
    comparator_delay: f64,

    num_bit: usize,
    window: usize,
    num_unit: usize,

    area: f64,
    read_latency: f64,
    read_dynamic_energy: f64,
}

impl MaxPool {
    pub fn new(settings: &Settings) -> Self {
        let tech = &settings.technology;
        MaxPool {
            comparator_area_per_bit: tech.adder_area_per_bit,
            comparator_energy_per_bit: tech.adder_energy_per_bit,
            comparator_delay: tech.adder_delay,
            num_bit: 0,
            window: 1,
            num_unit: 0,
            area: 0.0,
            read_latency: 0.0,
            read_dynamic_energy: 0.0,
        }
    }

    fn comparators(&self) -> usize {
        self.window.saturating_sub(1).max(1)
    }
}

impl Component for MaxPool {
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

impl MaxPoolModel for MaxPool {
    fn initialize(&mut self, num_bit: usize, window: usize, num_unit: usize) {
        self.num_bit = num_bit;
        self.window = window.max(1);
        self.num_unit = num_unit;
    }

    fn calculate_area(&mut self, _width_target: f64) {
        self.area = (self.num_unit * self.comparators() * self.num_bit) as f64
            * self.comparator_area_per_bit;
    }

    fn calculate_latency(&mut self, num_read: f64) {
        self.read_latency =
            num_read * log2_ceil(self.window).max(1) as f64 * self.comparator_delay;
    }

    fn calculate_power(&mut self, num_read: f64) {
        self.read_dynamic_energy = num_read
            * (self.num_unit * self.comparators() * self.num_bit) as f64
            * self.comparator_energy_per_bit;
    }

    fn window(&self) -> usize {
        self.window
    }
}
