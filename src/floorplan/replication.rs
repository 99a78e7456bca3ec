//! Weight duplication inside tiles and PEs, and the per-layer tables
//! (tile count, utilization, speed-up, grid location) derived from it.

use serde::Serialize;

use super::{
    mapping::{MappingMode, MappingPlan},
    sizer::HierarchySize,
};
use crate::{
    network::{Network, NetworkLayer},
    settings::Precision,
};

pub(crate) fn ceil_div(a: usize, b: usize) -> usize {
    (a + b - 1) / b
}

/// how many copies of a weight matrix are placed side by side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Duplication {
    pub row: usize,
    pub col: usize,
}

impl Duplication {
    pub const SINGLE: Duplication = Duplication { row: 1, col: 1 };

    pub fn copies(&self) -> usize {
        self.row * self.col
    }
}

/// whole copies of a matrix needing `needed_for_one` units that fit in `available` units
///
/// rounded down, a partial copy would push utilization above 1; equal to
/// `ceil(available / needed_for_one)` whenever the division is exact
fn copies_that_fit(available: usize, needed_for_one: usize) -> usize {
    (available / needed_for_one).max(1)
}

/// duplication of a conventional layer across the PEs of one tile
///
/// a matrix that overflows the tile in both dimensions is not duplicated,
/// novel-mapped layers never are
pub fn pe_duplication(
    layer: &NetworkLayer,
    mode: MappingMode,
    pe_size: usize,
    tile_size: usize,
    precision: &Precision,
) -> Duplication {
    if mode == MappingMode::Novel {
        return Duplication::SINGLE;
    }
    let rows = layer.synapse_rows(precision);
    let cols = layer.synapse_cols(precision);
    if rows > tile_size && cols > tile_size {
        return Duplication::SINGLE;
    }
    let num_pe = ceil_div(tile_size, pe_size);
    Duplication {
        row: copies_that_fit(num_pe, ceil_div(rows, pe_size)),
        col: copies_that_fit(num_pe, ceil_div(cols, pe_size)),
    }
}

/// duplication across the sub-arrays of one PE, `pe_size` being the PE
/// size of the layer's own mapping mode
pub fn sub_array_duplication(
    layer: &NetworkLayer,
    mode: MappingMode,
    pe_size: usize,
    precision: &Precision,
    num_row_sub_array: usize,
    num_col_sub_array: usize,
) -> Duplication {
    let rows = match mode {
        MappingMode::Conventional => layer.synapse_rows(precision),
        MappingMode::Novel => layer.novel_rows(precision),
    };
    let cols = layer.synapse_cols(precision);
    if rows > pe_size && cols > pe_size {
        return Duplication::SINGLE;
    }
    Duplication {
        row: copies_that_fit(
            ceil_div(pe_size, num_row_sub_array),
            ceil_div(rows, num_row_sub_array),
        ),
        col: copies_that_fit(
            ceil_div(pe_size, num_col_sub_array),
            ceil_div(cols, num_col_sub_array),
        ),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TileLocation {
    pub row: usize,
    pub col: usize,
}

/// # Description
/// the tile plan of one layer
/// * `num_tiles_row`/`num_tiles_col`: tiles covering the weight matrix
/// * `utilization`: live weight cells over allocated cells, in (0, 1]
/// * `speed_up_row`/`speed_up_col`: PE duplication times sub-array duplication
/// * `location`: grid position of the layer's first tile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerTilePlan {
    pub mode: MappingMode,
    pub num_tiles_row: usize,
    pub num_tiles_col: usize,
    pub pe_duplication: Duplication,
    pub sub_array_duplication: Duplication,
    pub utilization: f64,
    pub speed_up_row: usize,
    pub speed_up_col: usize,
    pub location: TileLocation,
}

impl LayerTilePlan {
    pub fn num_tiles(&self) -> usize {
        self.num_tiles_row * self.num_tiles_col
    }
}

/// lay the layers' tiles out row-major, each layer starting after the
/// tiles of all previous layers
pub fn place_layers(tile_counts: &[usize], num_tile_col: usize) -> Vec<TileLocation> {
    let mut start = 0;
    tile_counts
        .iter()
        .map(|&count| {
            let location = TileLocation {
                row: start / num_tile_col,
                col: start % num_tile_col,
            };
            start += count;
            location
        })
        .collect()
}

pub struct ReplicationPlanner<'a> {
    network: &'a Network,
    mapping: &'a MappingPlan,
    hierarchy: &'a HierarchySize,
    precision: &'a Precision,
    num_row_sub_array: usize,
    num_col_sub_array: usize,
}

impl<'a> ReplicationPlanner<'a> {
    pub fn new(
        network: &'a Network,
        mapping: &'a MappingPlan,
        hierarchy: &'a HierarchySize,
        precision: &'a Precision,
        num_row_sub_array: usize,
        num_col_sub_array: usize,
    ) -> Self {
        ReplicationPlanner {
            network,
            mapping,
            hierarchy,
            precision,
            num_row_sub_array,
            num_col_sub_array,
        }
    }

    fn layer_plan(&self, layer: &NetworkLayer, mode: MappingMode) -> LayerTilePlan {
        let h = self.hierarchy;
        let rows = layer.synapse_rows(self.precision);
        let cols = layer.synapse_cols(self.precision);
        let pe_duplication =
            pe_duplication(layer, mode, h.pe_size_cm, h.tile_size_cm, self.precision);

        let (num_tiles_row, num_tiles_col, allocated, pe_size) = match mode {
            MappingMode::Conventional => {
                let tile = h.tile_size_cm;
                let tiles_row = ceil_div(rows, tile);
                let tiles_col = ceil_div(cols, tile);
                (
                    tiles_row,
                    tiles_col,
                    (tiles_row * tiles_col * tile * tile) as f64,
                    h.pe_size_cm,
                )
            }
            MappingMode::Novel => {
                let pe = h.pe_size_nm;
                let tiles_row = ceil_div(layer.novel_rows(self.precision), pe);
                let tiles_col = ceil_div(cols, pe);
                (
                    tiles_row,
                    tiles_col,
                    (tiles_row * tiles_col * pe * pe * h.num_pe_nm) as f64,
                    pe,
                )
            }
        };
        let sub_array_duplication = sub_array_duplication(
            layer,
            mode,
            pe_size,
            self.precision,
            self.num_row_sub_array,
            self.num_col_sub_array,
        );
        let live = match mode {
            MappingMode::Conventional => (rows * cols) as f64,
            MappingMode::Novel => (layer.novel_rows(self.precision) * h.num_pe_nm * cols) as f64,
        };
        let utilization =
            (pe_duplication.copies() * sub_array_duplication.copies()) as f64 * live / allocated;

        LayerTilePlan {
            mode,
            num_tiles_row,
            num_tiles_col,
            pe_duplication,
            sub_array_duplication,
            utilization,
            speed_up_row: pe_duplication.row * sub_array_duplication.row,
            speed_up_col: pe_duplication.col * sub_array_duplication.col,
            location: TileLocation { row: 0, col: 0 },
        }
    }

    pub fn plan(&self) -> Vec<LayerTilePlan> {
        let mut layers: Vec<LayerTilePlan> = self
            .network
            .iter()
            .zip(self.mapping.marks.iter())
            .map(|(layer, &mode)| self.layer_plan(layer, mode))
            .collect();
        let counts: Vec<usize> = layers.iter().map(LayerTilePlan::num_tiles).collect();
        for (plan, location) in layers
            .iter_mut()
            .zip(place_layers(&counts, self.hierarchy.num_tile_col))
        {
            plan.location = location;
        }
        layers
    }
}
