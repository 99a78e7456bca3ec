use std::path::PathBuf;

use log::{debug, error, info};

use super::{
    assembler::{ChipAssembler, ChipResources},
    replay::PerformanceReplayer,
};
use crate::{
    error::{NeuroSimError, Result},
    floorplan::FloorPlan,
    matrix::Matrix,
    network::Network,
    quantize::WeightQuantizer,
    settings::{Precision, Settings},
    sim_result::{ChipStatistics, LayerStatistics, SimStatistics},
};

/// # Description
/// the source of the weight and input matrices of every layer
/// * `weights` are the real valued weights, `synapse_rows x output_depth`
/// * `inputs` are the input bits, `synapse_rows x num_input_vectors`
pub trait LayerData {
    fn num_layers(&self) -> usize;
    fn weights(&self, layer: usize) -> Result<Matrix>;
    fn inputs(&self, layer: usize) -> Result<Matrix>;
}

/// weight and input csv files, one pair per layer
#[derive(Debug, Clone)]
pub struct LayerFiles {
    pairs: Vec<(PathBuf, PathBuf)>,
}

impl LayerFiles {
    /// # Arguments
    /// * `files` - `weight1 input1 weight2 input2 ...`
    pub fn new(files: Vec<String>) -> Result<Self> {
        if files.len() % 2 != 0 {
            return Err(NeuroSimError::MissingLayerData {
                layer: files.len() / 2 + 1,
            });
        }
        let pairs = files
            .chunks(2)
            .map(|pair| (PathBuf::from(&pair[0]), PathBuf::from(&pair[1])))
            .collect();
        Ok(LayerFiles { pairs })
    }

    fn pair(&self, layer: usize) -> Result<&(PathBuf, PathBuf)> {
        self.pairs
            .get(layer)
            .ok_or(NeuroSimError::MissingLayerData { layer: layer + 1 })
    }
}

impl LayerData for LayerFiles {
    fn num_layers(&self) -> usize {
        self.pairs.len()
    }

    fn weights(&self, layer: usize) -> Result<Matrix> {
        Matrix::load(&self.pair(layer)?.0)
    }

    fn inputs(&self, layer: usize) -> Result<Matrix> {
        Matrix::load(&self.pair(layer)?.1)
    }
}

/// in-memory layer data, `(weights, inputs)` per layer
impl LayerData for Vec<(Matrix, Matrix)> {
    fn num_layers(&self) -> usize {
        self.len()
    }

    fn weights(&self, layer: usize) -> Result<Matrix> {
        self.get(layer)
            .map(|(weights, _)| weights.clone())
            .ok_or(NeuroSimError::MissingLayerData { layer: layer + 1 })
    }

    fn inputs(&self, layer: usize) -> Result<Matrix> {
        self.get(layer)
            .map(|(_, inputs)| inputs.clone())
            .ok_or(NeuroSimError::MissingLayerData { layer: layer + 1 })
    }
}

/// # Description
/// the whole estimation flow of one chip:
/// floor plan, shared resource sizing, area, then the layer by layer replay
#[derive(Debug)]
pub struct System<'a> {
    network: &'a Network,
    settings: &'a Settings,
    precision: Precision,
    resources: ChipResources,
}

impl<'a> System<'a> {
    /// a system built on the analytic device models
    pub fn new(network: &'a Network, settings: &'a Settings, precision: Precision) -> Self {
        let resources = ChipResources::analytic(settings, &precision);
        Self::with_resources(network, settings, precision, resources)
    }

    pub fn with_resources(
        network: &'a Network,
        settings: &'a Settings,
        precision: Precision,
        resources: ChipResources,
    ) -> Self {
        System {
            network,
            settings,
            precision,
            resources,
        }
    }

    /// # Description
    /// run the estimation, the device models are reused by every layer
    /// # Errors
    /// * `ConfigurationInfeasible` when no hierarchy fits the network
    /// * `MissingLayerData` when `data` has fewer layers than the network
    /// * loading and shape errors of the layer matrices
    pub fn run(&mut self, data: &dyn LayerData) -> Result<SimStatistics> {
        if data.num_layers() < self.network.len() {
            error!(
                "{} layers in the network but data for only {}",
                self.network.len(),
                data.num_layers()
            );
            return Err(NeuroSimError::MissingLayerData {
                layer: data.num_layers() + 1,
            });
        }
        let precision = self.precision;
        let floor_plan = FloorPlan::build(self.network, &precision, self.settings)?;

        let assembler = ChipAssembler::new(self.network, &floor_plan, self.settings, &precision);
        let resources = assembler.initialize(&mut self.resources);
        let area = assembler.calculate_area(&mut self.resources);

        let quantizer = WeightQuantizer::new(&precision, &self.settings.array);
        let replayer =
            PerformanceReplayer::new(self.network, &floor_plan, self.settings, &precision, &area);
        let total_tiles = floor_plan.total_tiles();

        let mut chip = ChipStatistics::default();
        let mut layers = Vec::with_capacity(self.network.len());
        for (index, (layer, tiles)) in self.network.iter().zip(&floor_plan.layers).enumerate() {
            let raw = data.weights(index)?;
            let rows = layer.synapse_rows(&precision);
            if raw.rows() != rows || raw.cols() != layer.output_depth {
                return Err(NeuroSimError::shape_mismatch(
                    format!("layer {} weights", index + 1),
                    format!("{}x{}", rows, layer.output_depth),
                    format!("{}x{}", raw.rows(), raw.cols()),
                ));
            }
            let weights = quantizer.quantize(&raw)?;
            let inputs = data.inputs(index)?;
            debug!("replaying layer {} on {} tiles", index + 1, tiles.num_tiles());

            let performance =
                replayer.layer_performance(&mut self.resources, index, &weights, &inputs)?;
            // the tiles of the other layers sit idle while this one runs
            let idle_tiles = total_tiles - tiles.num_tiles();
            let leakage_energy =
                idle_tiles as f64 * performance.read_latency * performance.leakage;

            chip.performance.add_layer(&performance);
            chip.leakage_energy += leakage_energy;
            chip.leakage_power += performance.leakage * tiles.num_tiles() as f64;
            layers.push(LayerStatistics {
                layer: index + 1,
                mode: tiles.mode,
                num_tiles: tiles.num_tiles(),
                speed_up_row: tiles.speed_up_row,
                speed_up_col: tiles.speed_up_col,
                utilization: tiles.utilization,
                performance,
                leakage_energy,
            });
        }
        chip.performance.leakage = chip.leakage_power;
        chip.finish(self.network.operations());
        info!(
            "chip read latency {:.3} ns, {:.3} TOPS/W",
            chip.performance.read_latency * 1e9,
            chip.tops_per_watt
        );

        Ok(SimStatistics {
            chip_utilization: floor_plan.chip_utilization(),
            floor_plan,
            resources,
            area,
            layers,
            chip,
            simulation_time: String::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_files_pairs() {
        let files = LayerFiles::new(vec![
            "w1.csv".into(),
            "i1.csv".into(),
            "w2.csv".into(),
            "i2.csv".into(),
        ])
        .unwrap();
        assert_eq!(files.num_layers(), 2);
        assert!(matches!(
            files.weights(2),
            Err(NeuroSimError::MissingLayerData { layer: 3 })
        ));
        assert!(matches!(
            files.weights(0),
            Err(NeuroSimError::FileNotFound { .. })
        ));

        let odd = LayerFiles::new(vec!["w1.csv".into(), "i1.csv".into(), "w2.csv".into()]);
        assert!(matches!(
            odd,
            Err(NeuroSimError::MissingLayerData { layer: 2 })
        ));
    }
}
