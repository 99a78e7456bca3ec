//! Tile and PE size search.
//!
//! Every search enumerates a halving sequence of power-of-two sizes and keeps
//! the size with the best array utilization.

use log::{debug, error, info, warn};
use serde::Serialize;

use super::{
    mapping::{MappingMode, MappingPlan},
    replication::{ceil_div, pe_duplication},
};
use crate::{
    error::{NeuroSimError, Result},
    network::{Network, NetworkLayer},
    settings::Precision,
};

/// `ceiling, ceiling/2, ...` down to and including `floor`
pub fn candidate_sizes(ceiling: usize, floor: usize) -> Vec<usize> {
    std::iter::successors(Some(ceiling), |&size| Some(size / 2))
        .take_while(|&size| size >= floor && size > 0)
        .collect()
}

/// one evaluated candidate size
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TileDesign {
    pub size: usize,
    pub num_tiles: usize,
    /// synapse cells that hold a weight
    pub matrix_total: usize,
    pub utilization: f64,
}

fn layers_in_mode<'a>(
    network: &'a Network,
    mapping: &'a MappingPlan,
    mode: MappingMode,
) -> impl Iterator<Item = &'a NetworkLayer> + 'a {
    network
        .iter()
        .zip(mapping.marks.iter())
        .filter(move |(_, &m)| m == mode)
        .map(|(layer, _)| layer)
}

/// conventional tiles of size `tile` needed by every conventional layer
pub fn tile_design_cm(
    tile: usize,
    network: &Network,
    mapping: &MappingPlan,
    precision: &Precision,
) -> TileDesign {
    let mut num_tiles = 0;
    let mut matrix_total = 0;
    for layer in layers_in_mode(network, mapping, MappingMode::Conventional) {
        let rows = layer.synapse_rows(precision);
        let cols = layer.synapse_cols(precision);
        num_tiles += ceil_div(rows, tile) * ceil_div(cols, tile);
        matrix_total += rows * cols;
    }
    TileDesign {
        size: tile,
        num_tiles,
        matrix_total,
        utilization: matrix_total as f64 / (num_tiles * tile * tile) as f64,
    }
}

/// novel tiles of `num_pe_nm` PEs of size `pe` needed by every novel layer
pub fn tile_design_nm(
    pe: usize,
    network: &Network,
    mapping: &MappingPlan,
    precision: &Precision,
) -> TileDesign {
    let mut num_tiles = 0;
    let mut matrix_total = 0;
    for layer in layers_in_mode(network, mapping, MappingMode::Novel) {
        let rows = layer.synapse_rows(precision);
        let cols = layer.synapse_cols(precision);
        num_tiles += ceil_div(layer.novel_rows(precision), pe) * ceil_div(cols, pe);
        matrix_total += rows * cols;
    }
    TileDesign {
        size: pe,
        num_tiles,
        matrix_total,
        utilization: matrix_total as f64
            / (num_tiles * pe * pe * mapping.num_pe_nm.max(1)) as f64,
    }
}

/// utilization of conventional tiles of size `tile` split into PEs of size `pe`
pub fn pe_design(
    pe: usize,
    tile: usize,
    num_tiles: usize,
    network: &Network,
    mapping: &MappingPlan,
    precision: &Precision,
) -> TileDesign {
    let mut matrix_total = 0;
    for layer in layers_in_mode(network, mapping, MappingMode::Conventional) {
        let dup = pe_duplication(layer, MappingMode::Conventional, pe, tile, precision);
        matrix_total += dup.copies() * layer.synapse_rows(precision) * layer.synapse_cols(precision);
    }
    TileDesign {
        size: pe,
        num_tiles,
        matrix_total,
        utilization: matrix_total as f64 / (num_tiles * tile * tile) as f64,
    }
}

/// first candidate with the strictly highest utilization, candidates above 1 are skipped
fn best_candidate(
    what: &str,
    candidates: Vec<usize>,
    design: impl Fn(usize) -> TileDesign,
) -> Option<TileDesign> {
    let mut best: Option<TileDesign> = None;
    for size in candidates {
        let candidate = design(size);
        debug!(
            "{} {}: {} tiles, utilization {:.4}",
            what, candidate.size, candidate.num_tiles, candidate.utilization
        );
        if candidate.utilization > 1.0 + 1e-9 {
            warn!(
                "{} {} reaches utilization {}, skipped",
                what, candidate.size, candidate.utilization
            );
            continue;
        }
        match best {
            Some(ref b) if candidate.utilization <= b.utilization => {}
            _ => best = Some(candidate),
        }
    }
    best
}

/// # Description
/// the chosen hierarchy of one run
/// * `tile_size_cm`/`pe_size_cm`: conventional tile and PE edge
/// * `pe_size_nm`/`num_pe_nm`: novel PE edge and PEs per novel tile (0 when novel mapping is off)
/// * `num_tile_row`/`num_tile_col`: the chip grid, large enough for every tile
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HierarchySize {
    pub tile_size_cm: usize,
    pub pe_size_cm: usize,
    pub pe_size_nm: usize,
    pub num_pe_nm: usize,
    pub num_tiles_cm: usize,
    pub num_tiles_nm: usize,
    pub num_tile_row: usize,
    pub num_tile_col: usize,
}

impl HierarchySize {
    pub fn total_tiles(&self) -> usize {
        self.num_tiles_cm + self.num_tiles_nm
    }
}

pub struct HierarchySizer<'a> {
    network: &'a Network,
    mapping: &'a MappingPlan,
    precision: &'a Precision,
    novel_mapping: bool,
    num_row_sub_array: usize,
}

impl<'a> HierarchySizer<'a> {
    pub fn new(
        network: &'a Network,
        mapping: &'a MappingPlan,
        precision: &'a Precision,
        novel_mapping: bool,
        num_row_sub_array: usize,
    ) -> Self {
        HierarchySizer {
            network,
            mapping,
            precision,
            novel_mapping,
            num_row_sub_array,
        }
    }

    fn infeasible(reason: String) -> NeuroSimError {
        error!("{}", reason);
        NeuroSimError::infeasible(reason)
    }

    /// # Description
    /// search the conventional tile size, the PE size inside it and, with
    /// novel mapping, the novel PE size
    /// # Errors
    /// `ConfigurationInfeasible` when a mode has no layer to size or no
    /// candidate satisfies the hierarchy constraints
    pub fn size(&self) -> Result<HierarchySize> {
        let sub = self.num_row_sub_array;
        if sub == 0 {
            return Err(Self::infeasible("sub-array has no row".to_string()));
        }
        if !self.mapping.has_conventional() {
            return Err(Self::infeasible(
                "no layer is conventionally mapped, the conventional tile can not be sized"
                    .to_string(),
            ));
        }
        if self.novel_mapping && !self.mapping.has_novel() {
            return Err(Self::infeasible(
                "novel mapping is enabled but no layer qualifies for it".to_string(),
            ));
        }

        let tile = best_candidate(
            "conventional tile",
            candidate_sizes(self.mapping.max_tile_size_cm.max(4 * sub), 4 * sub),
            |t| tile_design_cm(t, self.network, self.mapping, self.precision),
        )
        .ok_or_else(|| {
            Self::infeasible(format!(
                "no conventional tile size of at least {} fits",
                4 * sub
            ))
        })?;

        let pe = best_candidate(
            "conventional PE",
            candidate_sizes(tile.size / 2, 2 * sub),
            |p| {
                pe_design(
                    p,
                    tile.size,
                    tile.num_tiles,
                    self.network,
                    self.mapping,
                    self.precision,
                )
            },
        )
        .ok_or_else(|| {
            Self::infeasible(format!(
                "tile {} can not hold a PE of at least {}",
                tile.size,
                2 * sub
            ))
        })?;

        let (pe_size_nm, num_pe_nm, num_tiles_nm) = if self.novel_mapping {
            let pe_nm = best_candidate(
                "novel PE",
                candidate_sizes(self.mapping.max_pe_size_nm.max(2 * sub), 2 * sub),
                |p| tile_design_nm(p, self.network, self.mapping, self.precision),
            )
            .ok_or_else(|| {
                Self::infeasible(format!("no novel PE size of at least {} fits", 2 * sub))
            })?;
            (pe_nm.size, self.mapping.num_pe_nm, pe_nm.num_tiles)
        } else {
            (0, 0, 0)
        };

        let total = tile.num_tiles + num_tiles_nm;
        let num_tile_row = (total as f64).sqrt().ceil() as usize;
        let num_tile_col = ceil_div(total, num_tile_row);

        let size = HierarchySize {
            tile_size_cm: tile.size,
            pe_size_cm: pe.size,
            pe_size_nm,
            num_pe_nm,
            num_tiles_cm: tile.num_tiles,
            num_tiles_nm,
            num_tile_row,
            num_tile_col,
        };
        info!(
            "tile {}x{} ({} tiles), PE {}x{}, novel PE {}x{}x{} ({} tiles), grid {}x{}",
            size.tile_size_cm,
            size.tile_size_cm,
            size.num_tiles_cm,
            size.pe_size_cm,
            size.pe_size_cm,
            size.num_pe_nm,
            size.pe_size_nm,
            size.pe_size_nm,
            size.num_tiles_nm,
            size.num_tile_row,
            size.num_tile_col
        );
        Ok(size)
    }
}
