//! Decide for every layer whether it is placed with conventional or novel mapping.

use log::debug;
use serde::Serialize;

use crate::{network::Network, settings::Precision};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MappingMode {
    Conventional,
    Novel,
}

/// # Description
/// the classification of one network
/// * `marks`: one mode per layer, in layer order
/// * `max_pe_size_nm`: the largest minimum cube over novel-mapped layers (0 when there is none)
/// * `max_tile_size_cm`: the largest minimum cube over conventional layers (0 when there is none)
/// * `num_pe_nm`: PEs in a novel-mapped tile, the dominant kernel area (0 when novel mapping is off)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingPlan {
    pub marks: Vec<MappingMode>,
    pub max_pe_size_nm: usize,
    pub max_tile_size_cm: usize,
    pub num_pe_nm: usize,
}

impl MappingPlan {
    pub fn mode(&self, layer: usize) -> MappingMode {
        self.marks[layer]
    }

    pub fn has_novel(&self) -> bool {
        self.marks.contains(&MappingMode::Novel)
    }

    pub fn has_conventional(&self) -> bool {
        self.marks.contains(&MappingMode::Conventional)
    }
}

/// the kernel area shared by the most layers
///
/// scans all pairs and keeps the first product whose running count beats
/// the best so far, so among equally common products the lowest layer index wins
pub fn dominant_kernel_area(network: &Network) -> usize {
    let mut most = 0;
    let mut num_pe = 0;
    for layer in network.iter() {
        let area = layer.kernel_area();
        let mut count = 1;
        for other in network.iter() {
            if area == other.kernel_area() {
                count += 1;
            }
            if most < count {
                most = count;
                num_pe = area;
            }
        }
    }
    num_pe
}

pub struct MappingClassifier<'a> {
    network: &'a Network,
    precision: &'a Precision,
    novel_mapping: bool,
    num_row_sub_array: usize,
}

impl<'a> MappingClassifier<'a> {
    pub fn new(
        network: &'a Network,
        precision: &'a Precision,
        novel_mapping: bool,
        num_row_sub_array: usize,
    ) -> Self {
        MappingClassifier {
            network,
            precision,
            novel_mapping,
            num_row_sub_array,
        }
    }

    pub fn classify(&self) -> MappingPlan {
        let num_pe_nm = if self.novel_mapping {
            dominant_kernel_area(self.network)
        } else {
            0
        };
        let mut plan = MappingPlan {
            marks: Vec::with_capacity(self.network.len()),
            max_pe_size_nm: 0,
            max_tile_size_cm: 0,
            num_pe_nm,
        };

        for (index, layer) in self.network.iter().enumerate() {
            let min_cube = layer.synapse_cols(self.precision).next_power_of_two();
            let novel = self.novel_mapping
                && layer.kernel_area() == num_pe_nm
                // large conv layers use novel mapping
                && layer.synapse_rows(self.precision) >= self.num_row_sub_array;
            if novel {
                plan.marks.push(MappingMode::Novel);
                plan.max_pe_size_nm = plan.max_pe_size_nm.max(min_cube);
            } else {
                // small conv layers and fc layers use conventional mapping
                plan.marks.push(MappingMode::Conventional);
                plan.max_tile_size_cm = plan.max_tile_size_cm.max(min_cube);
            }
            debug!(
                "layer {}: {:?}, minimum cube {}",
                index + 1,
                plan.marks[index],
                min_cube
            );
        }
        plan
    }
}
