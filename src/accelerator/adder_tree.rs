use super::component::{AdderTreeModel, Component};
use crate::settings::Settings;

pub(crate) fn log2_ceil(n: usize) -> usize {
    if n <= 1 {
        0
    } else {
        (usize::BITS - (n - 1).leading_zeros()) as usize
    }
}

/// `num_lanes` parallel trees, each adding `num_inputs` operands of `num_bit` bits
#[derive(Debug, Clone)]
pub struct AdderTree {
    area_per_bit: f64,
    energy_per_bit: f64,
    delay: f64,

    num_inputs: usize,
    num_bit: usize,
    num_lanes: usize,

    area: f64,
    read_latency: f64,
    read_dynamic_energy: f64,
}

impl AdderTree {
    pub fn new(settings: &Settings) -> Self {
        let tech = &settings.technology;
        AdderTree {
            area_per_bit: tech.adder_area_per_bit,
            energy_per_bit: tech.adder_energy_per_bit,
            delay: tech.adder_delay,
            num_inputs: 0,
            num_bit: 0,
            num_lanes: 0,
            area: 0.0,
            read_latency: 0.0,
            read_dynamic_energy: 0.0,
        }
    }
}

impl Component for AdderTree {
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

impl AdderTreeModel for AdderTree {
    fn initialize(&mut self, num_inputs: usize, num_bit: usize, num_lanes: usize) {
        self.num_inputs = num_inputs;
        self.num_bit = num_bit;
        self.num_lanes = num_lanes.max(1);
    }

    fn calculate_area(&mut self, _height_target: f64) {
        // the sum grows one bit per level
        let adders = self.num_inputs.saturating_sub(1).max(1);
        let width = self.num_bit + log2_ceil(self.num_inputs);
        self.area = (adders * self.num_lanes * width) as f64 * self.area_per_bit;
    }

    fn calculate_latency(&mut self, num_read: f64, num_unit_add: usize) {
        let levels = log2_ceil(num_unit_add).max(1);
        self.read_latency = (num_read / self.num_lanes as f64).ceil() * levels as f64 * self.delay;
    }

    fn calculate_power(&mut self, num_read: f64, num_unit_add: usize) {
        let adders = num_unit_add.saturating_sub(1).max(1);
        self.read_dynamic_energy = num_read * (adders * self.num_bit) as f64 * self.energy_per_bit;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log2_ceil() {
        assert_eq!(log2_ceil(0), 0);
        assert_eq!(log2_ceil(1), 0);
        assert_eq!(log2_ceil(2), 1);
        assert_eq!(log2_ceil(5), 3);
        assert_eq!(log2_ceil(8), 3);
        assert_eq!(log2_ceil(9), 4);
    }

    #[test]
    fn test_adder_tree() {
        let settings = Settings::new(vec!["configs/default.toml".into()]).unwrap();
        let mut tree = AdderTree::new(&settings);
        tree.initialize(4, 10, 16);
        tree.calculate_area(0.0);
        assert!((tree.area() - (3 * 16 * 12) as f64 * 2e-12).abs() < 1e-20);

        // 32 reads over 16 lanes, two levels for four operands
        tree.calculate_latency(32.0, 4);
        assert!((tree.read_latency() - 2.0 * 2.0 * 1e-10).abs() < 1e-18);
        tree.calculate_power(32.0, 4);
        assert!((tree.read_dynamic_energy() - 32.0 * 30.0 * 1e-14).abs() < 1e-20);
    }
}
