//! Per-layer replay of the tiled computation through the device models.

use log::{debug, info};

use super::{
    assembler::{ChipArea, ChipResources},
    component::{
        ActivationModel, AdderTreeModel, BufferModel, Component, InterconnectModel, MaxPoolModel,
        Performance, TileGeometry, TileModel, TileWork,
    },
};
use crate::{
    error::{NeuroSimError, Result},
    floorplan::{
        mapping::MappingMode,
        replication::{ceil_div, LayerTilePlan},
        FloorPlan,
    },
    matrix::Matrix,
    network::{Network, NetworkLayer},
    settings::{Precision, Settings},
};

impl Performance {
    /// tiles of a layer run side by side: latencies take the slowest tile,
    /// energies add up, leakage is the power of one tile
    pub fn fold_tile(&mut self, tile: &Performance) {
        self.read_latency = self.read_latency.max(tile.read_latency);
        self.read_dynamic_energy += tile.read_dynamic_energy;
        self.leakage = tile.leakage;
        self.buffer_latency = self.buffer_latency.max(tile.buffer_latency);
        self.buffer_energy += tile.buffer_energy;
        self.ic_latency = self.ic_latency.max(tile.ic_latency);
        self.ic_energy += tile.ic_energy;
        self.latency_adc = self.latency_adc.max(tile.latency_adc);
        self.latency_accum = self.latency_accum.max(tile.latency_accum);
        self.latency_other = self.latency_other.max(tile.latency_other);
        self.energy_adc += tile.energy_adc;
        self.energy_accum += tile.energy_accum;
        self.energy_other += tile.energy_other;
    }

    /// layers run one after another, everything adds up
    pub fn add_layer(&mut self, layer: &Performance) {
        self.read_latency += layer.read_latency;
        self.read_dynamic_energy += layer.read_dynamic_energy;
        self.buffer_latency += layer.buffer_latency;
        self.buffer_energy += layer.buffer_energy;
        self.ic_latency += layer.ic_latency;
        self.ic_energy += layer.ic_energy;
        self.latency_adc += layer.latency_adc;
        self.latency_accum += layer.latency_accum;
        self.latency_other += layer.latency_other;
        self.energy_adc += layer.energy_adc;
        self.energy_accum += layer.energy_accum;
        self.energy_other += layer.energy_other;
    }

    fn add_other(&mut self, latency: f64, energy: f64) {
        self.read_latency += latency;
        self.read_dynamic_energy += energy;
        self.latency_other += latency;
        self.energy_other += energy;
    }

    fn add_accum(&mut self, latency: f64, energy: f64) {
        self.read_latency += latency;
        self.read_dynamic_energy += energy;
        self.latency_accum += latency;
        self.energy_accum += energy;
    }
}

/// what the shared resources see after each tile of a layer
struct SharedLoad {
    /// tiles that consume this layer's output
    next_tiles: usize,
    /// output plane the max-pool unit reduces
    pool_plane: f64,
    /// output columns one tile delivers to the max-pool unit
    pool_extent: f64,
}

pub struct PerformanceReplayer<'a> {
    network: &'a Network,
    plan: &'a FloorPlan,
    settings: &'a Settings,
    precision: &'a Precision,
    area: &'a ChipArea,
}

impl<'a> PerformanceReplayer<'a> {
    pub fn new(
        network: &'a Network,
        plan: &'a FloorPlan,
        settings: &'a Settings,
        precision: &'a Precision,
        area: &'a ChipArea,
    ) -> Self {
        PerformanceReplayer {
            network,
            plan,
            settings,
            precision,
            area,
        }
    }

    fn check_shapes(
        &self,
        index: usize,
        layer: &NetworkLayer,
        weights: &Matrix,
        inputs: &Matrix,
    ) -> Result<()> {
        let rows = layer.synapse_rows(self.precision);
        let cols = layer.synapse_cols(self.precision);
        let vectors = layer.num_input_vectors(self.precision);
        if weights.rows() != rows || weights.cols() != cols {
            return Err(NeuroSimError::shape_mismatch(
                format!("layer {} weights", index + 1),
                format!("{}x{}", rows, cols),
                format!("{}x{}", weights.rows(), weights.cols()),
            ));
        }
        if inputs.rows() != rows || inputs.cols() != vectors {
            return Err(NeuroSimError::shape_mismatch(
                format!("layer {} inputs", index + 1),
                format!("{}x{}", rows, vectors),
                format!("{}x{}", inputs.rows(), inputs.cols()),
            ));
        }
        Ok(())
    }

    /// the next layer decides how much the shared units process, the last
    /// layer falls back to its own tiles and output plane
    fn shared_load(&self, index: usize, extent: f64) -> SharedLoad {
        let layer = &self.network[index];
        let (next_tiles, pool_plane) = match self.network.layers().get(index + 1) {
            Some(next) => (
                self.plan.layers[index + 1].num_tiles(),
                (next.input_rows * next.input_cols) as f64,
            ),
            None => (
                self.plan.layers[index].num_tiles(),
                layer.output_positions() as f64,
            ),
        };
        SharedLoad {
            next_tiles,
            pool_plane,
            pool_extent: extent,
        }
    }

    /// activation, inter-tile accumulation and max pooling for one tile
    fn shared_per_tile(
        &self,
        resources: &mut ChipResources,
        perf: &mut Performance,
        layer: &NetworkLayer,
        tiles: &LayerTilePlan,
        load: &SharedLoad,
    ) {
        if self.settings.chip.chip_activation {
            let activation = &mut resources.activation;
            let num_read =
                (load.next_tiles as f64 / activation.outputs_per_read() as f64).ceil();
            activation.calculate_latency(num_read);
            activation.calculate_power(num_read);
            perf.add_other(activation.read_latency(), activation.read_dynamic_energy());
        }

        if tiles.num_tiles_row > 1 {
            let accumulation = &mut resources.accumulation;
            let num_read = (tiles.num_tiles_col
                * self.settings.array.num_col_muxed
                * load.next_tiles) as f64;
            accumulation.calculate_latency(num_read, tiles.num_tiles_row);
            accumulation.calculate_power(num_read, tiles.num_tiles_row);
            perf.add_accum(accumulation.read_latency(), accumulation.read_dynamic_energy());
        }

        if layer.followed_by_max_pool {
            let max_pool = &mut resources.max_pool;
            let num_read = (load.pool_extent
                / (load.pool_plane / max_pool.window() as f64))
                .ceil();
            max_pool.calculate_latency(num_read);
            max_pool.calculate_power(num_read);
            perf.add_other(max_pool.read_latency(), max_pool.read_dynamic_energy());
        }
    }

    /// # Description
    /// replay one layer tile by tile
    /// # Arguments
    /// * `weights` - conductance mapped weights, `synapse_rows x synapse_cols`
    /// * `inputs` - input bits, `synapse_rows x num_input_vectors`
    /// # Errors
    /// `ShapeMismatch` when the matrices do not match the layer
    pub fn layer_performance(
        &self,
        resources: &mut ChipResources,
        index: usize,
        weights: &Matrix,
        inputs: &Matrix,
    ) -> Result<Performance> {
        let layer = &self.network[index];
        self.check_shapes(index, layer, weights, inputs)?;
        let perf = match self.plan.mapping.mode(index) {
            MappingMode::Conventional => {
                self.conventional_layer(resources, index, layer, weights, inputs)?
            }
            MappingMode::Novel => self.novel_layer(resources, index, layer, weights, inputs)?,
        };
        info!(
            "layer {}: read latency {:.3} ns, dynamic energy {:.3} pJ",
            index + 1,
            perf.read_latency * 1e9,
            perf.read_dynamic_energy * 1e12
        );
        Ok(perf)
    }

    fn conventional_layer(
        &self,
        resources: &mut ChipResources,
        index: usize,
        layer: &NetworkLayer,
        weights: &Matrix,
        inputs: &Matrix,
    ) -> Result<Performance> {
        let h = &self.plan.hierarchy;
        let tiles = &self.plan.layers[index];
        let tile = h.tile_size_cm;
        let pe_per_side = ceil_div(tile, h.pe_size_cm);
        let geometry = TileGeometry {
            mode: MappingMode::Conventional,
            num_pe: pe_per_side * pe_per_side,
            pe_size: h.pe_size_cm,
        };
        let vectors = layer.num_input_vectors(self.precision);
        let load = self.shared_load(index, tile as f64);

        let mut perf = Performance::default();
        for i in 0..tiles.num_tiles_row {
            let row = i * tile;
            let rows = tile.min(weights.rows() - row);
            for j in 0..tiles.num_tiles_col {
                let col = j * tile;
                let cols = tile.min(weights.cols() - col);
                let work = TileWork {
                    weights: weights.block(row, col, rows, cols)?,
                    inputs: inputs.block(row, 0, rows, vectors)?,
                    speed_up_row: tiles.speed_up_row,
                    speed_up_col: tiles.speed_up_col,
                    num_input_vectors: vectors,
                };
                let cost = resources.tile.calculate_performance(&geometry, &work);
                debug!("layer {} tile ({}, {}): {:?}", index + 1, i, j, cost);
                perf.fold_tile(&cost);
                self.shared_per_tile(resources, &mut perf, layer, tiles, &load);
            }
        }

        let matrix_lines = (weights.rows() + weights.cols()) as f64;
        let positions = layer.output_positions() as f64;
        let unit = &self.area.cm_tile;
        let bus = resources.htree.bus_width() as f64;
        resources.htree.calculate_latency(
            tiles.location,
            unit.height,
            unit.width,
            matrix_lines * positions / bus,
        );
        resources.htree.calculate_power(
            tiles.location,
            unit.height,
            unit.width,
            bus,
            matrix_lines / h.pe_size_cm as f64 * positions / bus,
        );
        let num_bit_input = self.precision.num_bit_input as f64;
        let buffer = &mut resources.global_buffer;
        let bits_read = weights.rows() as f64 * num_bit_input;
        let bits_write = weights.cols() as f64 * num_bit_input;
        buffer.calculate_latency(bits_read, positions, bits_write, positions);
        buffer.calculate_power(bits_read, positions, bits_write, positions);

        let buffer_latency = buffer.read_latency() + buffer.write_latency();
        let buffer_energy = buffer.read_dynamic_energy() + buffer.write_dynamic_energy();
        let ic_latency = resources.htree.read_latency();
        let ic_energy = resources.htree.read_dynamic_energy();
        perf.buffer_latency += buffer_latency;
        perf.buffer_energy += buffer_energy;
        perf.ic_latency += ic_latency;
        perf.ic_energy += ic_energy;
        perf.add_other(buffer_latency + ic_latency, buffer_energy + ic_energy);
        Ok(perf)
    }

    fn novel_layer(
        &self,
        resources: &mut ChipResources,
        index: usize,
        layer: &NetworkLayer,
        weights: &Matrix,
        inputs: &Matrix,
    ) -> Result<Performance> {
        let h = &self.plan.hierarchy;
        let tiles = &self.plan.layers[index];
        let pe = h.pe_size_nm;
        let geometry = TileGeometry {
            mode: MappingMode::Novel,
            num_pe: h.num_pe_nm,
            pe_size: pe,
        };
        // one kernel position per PE, `group` rows apart in the unrolled matrix
        let group = layer.novel_rows(self.precision);
        let vectors = layer.num_input_vectors(self.precision);
        let load = self.shared_load(index, pe as f64 * (h.num_pe_nm as f64).sqrt());

        let mut perf = Performance::default();
        for i in 0..tiles.num_tiles_row {
            let row = i * pe;
            let rows = pe.min(group - row);
            for j in 0..tiles.num_tiles_col {
                let col = j * pe;
                let cols = pe.min(weights.cols() - col);
                let work = TileWork {
                    weights: weights.strided(row, col, rows, cols, group, h.num_pe_nm)?,
                    inputs: inputs.strided(row, 0, rows, vectors, group, h.num_pe_nm)?,
                    speed_up_row: tiles.speed_up_row,
                    speed_up_col: tiles.speed_up_col,
                    num_input_vectors: vectors,
                };
                let cost = resources.tile.calculate_performance(&geometry, &work);
                debug!("layer {} tile ({}, {}): {:?}", index + 1, i, j, cost);
                perf.fold_tile(&cost);
                self.shared_per_tile(resources, &mut perf, layer, tiles, &load);
            }
        }
        // buffer and interconnect are re-added below at the novel rate
        perf.latency_other -= perf.buffer_latency;
        perf.latency_other -= perf.ic_latency;
        perf.read_latency -= perf.buffer_latency + perf.ic_latency;

        let kernel_rows = layer.kernel_rows as f64;
        let matrix_lines = (weights.rows() + weights.cols()) as f64;
        let positions = layer.output_positions() as f64;
        let unit = self.area.nm_tile.unwrap_or(self.area.cm_tile);
        let bus = resources.htree.bus_width() as f64;
        resources.htree.calculate_latency(
            tiles.location,
            unit.height,
            unit.width,
            matrix_lines * positions / bus / kernel_rows,
        );
        resources.htree.calculate_power(
            tiles.location,
            unit.height,
            unit.width,
            bus,
            matrix_lines / h.pe_size_cm as f64 * positions / bus / kernel_rows,
        );
        let num_bit_input = self.precision.num_bit_input as f64;
        let buffer = &mut resources.global_buffer;
        let bits_read = weights.rows() as f64 * num_bit_input;
        let bits_write = weights.cols() as f64 * num_bit_input;
        let num_access = positions / kernel_rows;
        buffer.calculate_latency(bits_read, num_access, bits_write, num_access);
        buffer.calculate_power(bits_read, num_access, bits_write, num_access);

        let buffer_energy = buffer.read_dynamic_energy() + buffer.write_dynamic_energy();
        let ic_energy = resources.htree.read_dynamic_energy();
        perf.buffer_latency += buffer.read_latency() + buffer.write_latency();
        perf.buffer_energy += buffer_energy;
        perf.ic_latency += resources.htree.read_latency();
        perf.ic_energy += ic_energy;

        perf.buffer_latency /= kernel_rows;
        perf.ic_latency /= kernel_rows;

        let latency = perf.buffer_latency + perf.ic_latency;
        perf.add_other(latency, buffer_energy + ic_energy);
        Ok(perf)
    }
}
