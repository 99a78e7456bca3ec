//! First-order global buffer: area and energy per stored/moved bit, latency
//! from the interface width and the clock.

use super::component::{BufferModel, Component};
use crate::settings::{BufferType, Settings};

#[derive(Debug, Clone)]
pub struct GlobalBuffer {
    bit_area: f64,
    energy_per_bit: f64,
    periphery_ratio: f64,
    clk_freq: f64,
    wire_resistance: f64,
    wire_capacitance: f64,

    num_bit: usize,
    interface_width: usize,

    area: f64,
    height: f64,
    width: f64,
    read_latency: f64,
    write_latency: f64,
    read_dynamic_energy: f64,
    write_dynamic_energy: f64,
}

impl GlobalBuffer {
    pub fn new(settings: &Settings) -> Self {
        let tech = &settings.technology;
        let (bit_area, energy_per_bit) = match settings.chip.global_buffer_type {
            BufferType::Sram => (tech.sram_bit_area, tech.sram_energy_per_bit),
            BufferType::RegisterFile => (tech.dff_bit_area, tech.dff_energy_per_bit),
        };
        GlobalBuffer {
            bit_area,
            energy_per_bit,
            periphery_ratio: tech.periphery_ratio,
            clk_freq: settings.chip.clk_freq,
            wire_resistance: settings.chip.unit_length_wire_resistance,
            wire_capacitance: tech.wire_capacitance,
            num_bit: 0,
            interface_width: 1,
            area: 0.0,
            height: 0.0,
            width: 0.0,
            read_latency: 0.0,
            write_latency: 0.0,
            read_dynamic_energy: 0.0,
            write_dynamic_energy: 0.0,
        }
    }

    /// cycles to move `bits` once through the interface
    fn cycles(&self, bits: f64) -> f64 {
        (bits / self.interface_width as f64).ceil()
    }

    /// RC delay across the macro
    fn wire_delay(&self) -> f64 {
        0.38 * self.wire_resistance * self.wire_capacitance * self.height.max(self.width).powi(2)
    }
}

impl Component for GlobalBuffer {
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

impl BufferModel for GlobalBuffer {
    fn initialize(&mut self, num_bit: usize, interface_width: usize) {
        self.num_bit = num_bit;
        self.interface_width = interface_width.max(1);
    }

    fn calculate_area(&mut self, height_target: f64) {
        self.area = self.num_bit as f64 * self.bit_area * (1.0 + self.periphery_ratio);
        if height_target > 0.0 {
            self.height = height_target;
            self.width = self.area / height_target;
        } else {
            self.height = self.area.sqrt();
            self.width = self.height;
        }
    }

    fn calculate_latency(&mut self, bits_read: f64, num_read: f64, bits_write: f64, num_write: f64) {
        let cycle = 1.0 / self.clk_freq + self.wire_delay();
        self.read_latency = self.cycles(bits_read) * num_read * cycle;
        self.write_latency = self.cycles(bits_write) * num_write * cycle;
    }

    fn calculate_power(&mut self, bits_read: f64, num_read: f64, bits_write: f64, num_write: f64) {
        self.read_dynamic_energy = bits_read * num_read * self.energy_per_bit;
        self.write_dynamic_energy = bits_write * num_write * self.energy_per_bit;
    }

    fn write_latency(&self) -> f64 {
        self.write_latency
    }

    fn write_dynamic_energy(&self) -> f64 {
        self.write_dynamic_energy
    }

    fn height(&self) -> f64 {
        self.height
    }

    fn width(&self) -> f64 {
        self.width
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer() {
        let mut settings = Settings::new(vec!["configs/default.toml".into()]).unwrap();
        settings.chip.unit_length_wire_resistance = 0.0;
        let mut buffer = GlobalBuffer::new(&settings);
        buffer.initialize(1024, 32);
        buffer.calculate_area(0.0);
        assert!((buffer.height() * buffer.width() - buffer.area()).abs() < 1e-24);

        // 64 bits over a 32 bit interface take two cycles, ten times
        buffer.calculate_latency(64.0, 10.0, 32.0, 1.0);
        assert!((buffer.read_latency() - 20e-9).abs() < 1e-15);
        assert!((buffer.write_latency() - 1e-9).abs() < 1e-15);

        buffer.calculate_power(64.0, 10.0, 0.0, 0.0);
        assert!((buffer.read_dynamic_energy() - 640.0 * 5e-15).abs() < 1e-20);
        assert_eq!(buffer.write_dynamic_energy(), 0.0);
    }
}
