//! Mapping of real-valued weights onto device conductances.
//!
//! A weight in `[-1, 1]` becomes an integer codeword in `[0, 2^synapseBit - 1]`,
//! the codeword is split into `numColPerSynapse` base `2^cellBit` digits (most
//! significant first) and every digit is stored as one conductance between
//! `minConductance` and `maxConductance`.

use std::path::Path;

use log::debug;

use crate::{
    error::Result,
    matrix::Matrix,
    settings::{ArraySettings, Precision},
};

const REAL_MAX: f64 = 1.0;
const REAL_MIN: f64 = -1.0;

#[derive(Debug, Clone, Copy)]
pub struct WeightQuantizer {
    synapse_bit: u32,
    cell_bit: u32,
    num_col_per_synapse: usize,
    max_conductance: f64,
    min_conductance: f64,
}

impl WeightQuantizer {
    pub fn new(precision: &Precision, array: &ArraySettings) -> Self {
        WeightQuantizer {
            synapse_bit: precision.synapse_bit,
            cell_bit: precision.cell_bit,
            num_col_per_synapse: precision.num_col_per_synapse,
            max_conductance: array.max_conductance,
            min_conductance: array.min_conductance,
        }
    }

    pub fn max_codeword(&self) -> u64 {
        (1u64 << self.synapse_bit) - 1
    }

    fn cell_range(&self) -> u64 {
        1u64 << self.cell_bit
    }

    /// linear rescale to the integer range, rounding half away from zero
    pub fn codeword(&self, weight: f64) -> u64 {
        let normalized_max = self.max_codeword() as f64;
        let scaled =
            normalized_max / (REAL_MAX - REAL_MIN) * (weight - REAL_MAX) + normalized_max;
        // f64::round rounds half away from zero
        scaled.round().clamp(0.0, normalized_max) as u64
    }

    /// base `2^cellBit` digits, most significant first
    pub fn digits(&self, codeword: u64) -> Vec<u64> {
        let range = self.cell_range();
        let mut value = codeword;
        let mut digits = vec![0; self.num_col_per_synapse];
        for digit in digits.iter_mut().rev() {
            *digit = value % range;
            value /= range;
        }
        digits
    }

    pub fn conductance(&self, digit: u64) -> f64 {
        let levels = (self.cell_range() - 1) as f64;
        digit as f64 / levels * (self.max_conductance - self.min_conductance) + self.min_conductance
    }

    /// inverse of [`conductance`](Self::conductance), snapped to the nearest level
    pub fn digit(&self, conductance: f64) -> u64 {
        let levels = (self.cell_range() - 1) as f64;
        let level = (conductance - self.min_conductance) / (self.max_conductance - self.min_conductance)
            * levels;
        level.round().clamp(0.0, levels) as u64
    }

    pub fn conductances(&self, weight: f64) -> Vec<f64> {
        self.digits(self.codeword(weight))
            .into_iter()
            .map(|digit| self.conductance(digit))
            .collect()
    }

    /// rebuild the codeword stored in the cells of one synapse
    pub fn codeword_from_conductances(&self, cells: &[f64]) -> u64 {
        let range = self.cell_range();
        cells
            .iter()
            .fold(0, |acc, &conductance| acc * range + self.digit(conductance))
    }

    /// every weight expands into `numColPerSynapse` adjacent columns
    pub fn quantize(&self, weights: &Matrix) -> Result<Matrix> {
        let cols = weights.cols() * self.num_col_per_synapse;
        let mut data = Vec::with_capacity(weights.rows() * cols);
        for r in 0..weights.rows() {
            for &weight in weights.row(r) {
                data.extend(self.conductances(weight));
            }
        }
        debug!(
            "quantized {}x{} weights into {}x{} cells",
            weights.rows(),
            weights.cols(),
            weights.rows(),
            cols
        );
        Matrix::new(weights.rows(), cols, data)
    }

    /// load a weight file and map it onto conductances
    pub fn load(&self, file_name: impl AsRef<Path>) -> Result<Matrix> {
        self.quantize(&Matrix::load(file_name)?)
    }
}
