//! Floor planning: mapping classification, hierarchy sizing and replication.

pub mod mapping;
pub mod replication;
pub mod sizer;

use log::error;
use serde::Serialize;

use crate::{
    error::{NeuroSimError, Result},
    network::Network,
    settings::{Precision, Settings},
};
use mapping::{MappingClassifier, MappingPlan};
use replication::{LayerTilePlan, ReplicationPlanner};
use sizer::{HierarchySize, HierarchySizer};

/// everything decided before any performance is estimated
#[derive(Debug, Clone, Serialize)]
pub struct FloorPlan {
    pub mapping: MappingPlan,
    pub hierarchy: HierarchySize,
    pub layers: Vec<LayerTilePlan>,
}

impl FloorPlan {
    pub fn build(network: &Network, precision: &Precision, settings: &Settings) -> Result<Self> {
        let array = &settings.array;
        if array.num_row_sub_array == 0 || array.num_col_sub_array == 0 {
            let reason = format!(
                "sub-array of {}x{} cells can not hold a weight",
                array.num_row_sub_array, array.num_col_sub_array
            );
            error!("{}", reason);
            return Err(NeuroSimError::infeasible(reason));
        }
        let mapping = MappingClassifier::new(
            network,
            precision,
            settings.mapping.novel_mapping,
            settings.array.num_row_sub_array,
        )
        .classify();
        let hierarchy = HierarchySizer::new(
            network,
            &mapping,
            precision,
            settings.mapping.novel_mapping,
            settings.array.num_row_sub_array,
        )
        .size()?;
        let layers = ReplicationPlanner::new(
            network,
            &mapping,
            &hierarchy,
            precision,
            settings.array.num_row_sub_array,
            settings.array.num_col_sub_array,
        )
        .plan();
        Ok(FloorPlan {
            mapping,
            hierarchy,
            layers,
        })
    }

    pub fn total_tiles(&self) -> usize {
        self.layers.iter().map(LayerTilePlan::num_tiles).sum()
    }

    /// tile-weighted mean of the layer utilizations
    pub fn chip_utilization(&self) -> f64 {
        let weighted: f64 = self
            .layers
            .iter()
            .map(|l| l.num_tiles() as f64 * l.utilization)
            .sum();
        weighted / self.total_tiles() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::NetworkLayer;

    fn layer(input: usize, depth: usize, kernel: usize, output: usize) -> NetworkLayer {
        NetworkLayer {
            input_rows: input,
            input_cols: input,
            input_depth: depth,
            kernel_rows: kernel,
            kernel_cols: kernel,
            output_depth: output,
            followed_by_max_pool: false,
        }
    }

    #[test]
    fn test_tile_counts_match_hierarchy() {
        let mut settings = Settings::new(vec!["configs/default.toml".into()]).unwrap();
        let precision = Precision::new(8, 8, 8).unwrap();
        let network = Network::from_layers(vec![
            layer(32, 3, 3, 64),
            layer(30, 64, 3, 128),
            layer(28, 128, 3, 256),
            layer(26, 256, 3, 256),
            layer(24, 256, 1, 10),
        ])
        .unwrap();
        for novel in [false, true] {
            settings.mapping.novel_mapping = novel;
            let plan = FloorPlan::build(&network, &precision, &settings).unwrap();
            assert_eq!(plan.total_tiles(), plan.hierarchy.total_tiles());
            let grid = plan.hierarchy.num_tile_row * plan.hierarchy.num_tile_col;
            assert!(grid >= plan.total_tiles());
            for layer in &plan.layers {
                assert!(layer.utilization > 0.0 && layer.utilization <= 1.0);
                assert!(layer.location.row < plan.hierarchy.num_tile_row);
                assert!(layer.location.col < plan.hierarchy.num_tile_col);
            }
            let util = plan.chip_utilization();
            assert!(util > 0.0 && util <= 1.0);
        }
    }

    #[test]
    fn test_empty_sub_array() {
        let precision = Precision::new(8, 8, 4).unwrap();
        let network = Network::from_layers(vec![layer(28, 1, 5, 8)]).unwrap();
        for (rows, cols) in [(128, 0), (0, 128)] {
            let mut settings = Settings::new(vec!["configs/default.toml".into()]).unwrap();
            settings.array.num_row_sub_array = rows;
            settings.array.num_col_sub_array = cols;
            assert!(matches!(
                FloorPlan::build(&network, &precision, &settings),
                Err(NeuroSimError::ConfigurationInfeasible { .. })
            ));
        }
    }
}
