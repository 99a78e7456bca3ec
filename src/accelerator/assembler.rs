//! Sizing of the shared chip resources and the chip area.

use log::{debug, info};
use serde::Serialize;

use super::{
    activation::activation_unit,
    adder_tree::{log2_ceil, AdderTree},
    buffer::GlobalBuffer,
    component::{
        ActivationModel, AdderTreeModel, BufferModel, Component, InterconnectModel, MaxPoolModel,
        TileArea, TileGeometry, TileModel,
    },
    htree::HTree,
    max_pool::MaxPool,
    tile::AnalyticTile,
};
use crate::{
    floorplan::{mapping::MappingMode, replication::ceil_div, FloorPlan},
    network::Network,
    settings::{ActivationKind, Precision, Settings},
};

/// pooling window of the max-pool unit, 2x2
pub const MAX_POOL_WINDOW: usize = 4;

/// the device models of one chip, owned by the run that uses them
#[derive(Debug)]
pub struct ChipResources {
    pub global_buffer: Box<dyn BufferModel>,
    pub htree: Box<dyn InterconnectModel>,
    pub accumulation: Box<dyn AdderTreeModel>,
    pub activation: Box<dyn ActivationModel>,
    pub max_pool: Box<dyn MaxPoolModel>,
    pub tile: Box<dyn TileModel>,
}

impl ChipResources {
    /// the first-order models shipped with the crate
    pub fn analytic(settings: &Settings, precision: &Precision) -> Self {
        ChipResources {
            global_buffer: Box::new(GlobalBuffer::new(settings)),
            htree: Box::new(HTree::new(settings)),
            accumulation: Box::new(AdderTree::new(settings)),
            activation: activation_unit(settings),
            max_pool: Box::new(MaxPool::new(settings)),
            tile: Box::new(AnalyticTile::new(settings, precision)),
        }
    }
}

/// the shared resource dimensions chosen from the floor plan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChipInit {
    pub global_bus_width: usize,
    pub max_layer_input: usize,
    pub max_tile_added: usize,
    pub max_throughput_tile: usize,
    pub max_add_from_sub_array: usize,
    pub accumulation_bits: usize,
    /// input width of the chip-level activation unit, 0 inside the tiles
    pub activation_bits: usize,
}

/// chip area in square metres
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ChipArea {
    pub total: f64,
    pub ic: f64,
    pub adc: f64,
    pub accum: f64,
    pub other: f64,
    pub height: f64,
    pub width: f64,
    pub cm_tile: TileArea,
    pub nm_tile: Option<TileArea>,
}

pub struct ChipAssembler<'a> {
    network: &'a Network,
    plan: &'a FloorPlan,
    settings: &'a Settings,
    precision: &'a Precision,
}

impl<'a> ChipAssembler<'a> {
    pub fn new(
        network: &'a Network,
        plan: &'a FloorPlan,
        settings: &'a Settings,
        precision: &'a Precision,
    ) -> Self {
        ChipAssembler {
            network,
            plan,
            settings,
            precision,
        }
    }

    pub fn cm_geometry(&self) -> TileGeometry {
        let h = &self.plan.hierarchy;
        let pe_per_side = ceil_div(h.tile_size_cm, h.pe_size_cm);
        TileGeometry {
            mode: MappingMode::Conventional,
            num_pe: pe_per_side * pe_per_side,
            pe_size: h.pe_size_cm,
        }
    }

    pub fn nm_geometry(&self) -> Option<TileGeometry> {
        let h = &self.plan.hierarchy;
        self.settings.mapping.novel_mapping.then(|| TileGeometry {
            mode: MappingMode::Novel,
            num_pe: h.num_pe_nm,
            pe_size: h.pe_size_nm,
        })
    }

    /// bus bits of one tile kind: its column width plus the muxed ADC outputs
    fn global_bus_width(&self) -> usize {
        let h = &self.plan.hierarchy;
        let muxed = self.settings.array.num_col_muxed.max(1);
        let mut width: usize = self
            .plan
            .mapping
            .marks
            .iter()
            .map(|mode| match mode {
                MappingMode::Conventional => h.tile_size_cm + h.tile_size_cm / muxed,
                MappingMode::Novel => {
                    let edge = h.pe_size_nm * sqrt_ceil(h.num_pe_nm);
                    edge + edge / muxed
                }
            })
            .sum();
        while width > self.settings.chip.max_global_bus_width {
            width /= 2;
        }
        width
    }

    /// # Description
    /// initialize the global buffer, the H-tree, the max-pool unit, the
    /// accumulation tree and (with chip activation) the activation unit
    pub fn initialize(&self, resources: &mut ChipResources) -> ChipInit {
        let h = &self.plan.hierarchy;
        let array = &self.settings.array;
        let num_bit_input = self.precision.num_bit_input as usize;
        let muxed = array.num_col_muxed.max(1);

        let max_layer_input = self
            .network
            .iter()
            .map(|layer| layer.input_volume())
            .max()
            .unwrap_or(0);
        let max_tile_added = self
            .plan
            .layers
            .iter()
            .map(|layer| layer.num_tiles_row)
            .max()
            .unwrap_or(0);
        let global_bus_width = self.global_bus_width();

        let buffer_bits = num_bit_input * max_layer_input;
        resources
            .global_buffer
            .initialize(buffer_bits, sqrt_ceil(buffer_bits));
        resources
            .max_pool
            .initialize(num_bit_input, MAX_POOL_WINDOW, h.tile_size_cm);
        resources
            .htree
            .initialize(h.num_tile_row, h.num_tile_col, global_bus_width);

        let novel = self.settings.mapping.novel_mapping;
        let max_throughput_tile = if novel {
            h.tile_size_cm.max(sqrt_ceil(h.num_pe_nm) * h.pe_size_nm)
        } else {
            h.tile_size_cm
        };
        // from sub-array to PE, then from PE to tile
        let mut max_add_from_sub_array = ceil_div(h.pe_size_cm, array.num_row_sub_array);
        let mut pe_per_tile = ceil_div(h.tile_size_cm, h.pe_size_cm);
        if novel {
            max_add_from_sub_array =
                max_add_from_sub_array.max(ceil_div(h.pe_size_nm, array.num_row_sub_array));
            pe_per_tile = pe_per_tile.max(sqrt_ceil(h.num_pe_nm));
        }
        max_add_from_sub_array *= pe_per_tile;
        let lanes = ceil_div(max_throughput_tile, muxed);

        let sequential_bits =
            log2_ceil(array.num_row_sub_array) + self.precision.cell_bit as usize - 1;
        let sensing_bits = if array.parallel_read {
            log2_ceil(array.level_output)
        } else {
            sequential_bits
        };
        let add_bits = num_bit_input + 1 + log2_ceil(max_add_from_sub_array);
        let psum_bits = sensing_bits + add_bits;

        let (accumulation_bits, activation_bits) = if self.settings.chip.chip_activation {
            resources
                .accumulation
                .initialize(max_tile_added, psum_bits, lanes);
            // the sigmoid table is always addressed by the row-by-row sum width
            let activation_in = match self.settings.chip.activation {
                ActivationKind::Relu => psum_bits,
                ActivationKind::Sigmoid => sequential_bits + add_bits,
            } + log2_ceil(max_tile_added);
            resources
                .activation
                .initialize(lanes, activation_in, num_bit_input);
            (psum_bits, activation_in)
        } else {
            // tiles already deliver activated outputs
            resources
                .accumulation
                .initialize(max_tile_added, num_bit_input, lanes);
            (num_bit_input, 0)
        };

        let init = ChipInit {
            global_bus_width,
            max_layer_input,
            max_tile_added,
            max_throughput_tile,
            max_add_from_sub_array,
            accumulation_bits,
            activation_bits,
        };
        debug!("{:?}", init);
        init
    }

    /// # Description
    /// sum the tile areas and the shared resources, `initialize` must run first
    pub fn calculate_area(&self, resources: &mut ChipResources) -> ChipArea {
        let h = &self.plan.hierarchy;
        let mut chip = ChipArea::default();

        let mut add_tiles = |tile: &TileArea, count: usize| {
            let count = count as f64;
            chip.total += tile.total * count;
            chip.ic += tile.ic * count;
            chip.adc += tile.adc * count;
            chip.accum += tile.accum * count;
            chip.other += tile.other * count;
        };

        let nm_tile = self
            .nm_geometry()
            .map(|geometry| resources.tile.calculate_area(&geometry));
        if let Some(ref tile) = nm_tile {
            add_tiles(tile, h.num_tiles_nm);
        }
        let cm_tile = resources.tile.calculate_area(&self.cm_geometry());
        add_tiles(&cm_tile, h.num_tiles_cm);

        let unit_height = cm_tile.height.max(nm_tile.map_or(0.0, |t| t.height));
        let unit_width = cm_tile.width.max(nm_tile.map_or(0.0, |t| t.width));

        resources
            .global_buffer
            .calculate_area(h.num_tile_row as f64 * unit_height);
        resources.htree.calculate_area(unit_height, unit_width);
        resources
            .max_pool
            .calculate_area(resources.global_buffer.width());
        resources
            .accumulation
            .calculate_area(resources.global_buffer.height() / 3.0);
        if self.settings.chip.chip_activation {
            resources
                .activation
                .calculate_area(resources.global_buffer.width() / 3.0);
            chip.total += resources.activation.area();
        }

        let buffer = resources.global_buffer.area();
        let htree = resources.htree.area();
        let max_pool = resources.max_pool.area();
        let accumulation = resources.accumulation.area();
        chip.total += buffer + htree + max_pool + accumulation;
        chip.ic += htree;
        chip.accum += accumulation;
        chip.other += buffer + htree + max_pool;

        chip.height = chip.total.sqrt();
        chip.width = chip.total / chip.height;
        chip.cm_tile = cm_tile;
        chip.nm_tile = nm_tile;
        info!(
            "chip area {:.2} um^2 ({:.2} x {:.2} um)",
            chip.total * 1e12,
            chip.height * 1e6,
            chip.width * 1e6
        );
        chip
    }
}

pub(crate) fn sqrt_ceil(n: usize) -> usize {
    (n as f64).sqrt().ceil() as usize
}
