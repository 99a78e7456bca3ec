use std::{cell::RefCell, fs::File, io::Write, rc::Rc};

use neurosim_chip::{
    accelerator::{
        component::{
            ActivationModel, AdderTreeModel, BufferModel, Component, InterconnectModel,
            MaxPoolModel, Performance, TileArea, TileGeometry, TileModel, TileWork,
        },
        ChipResources, LayerData,
    },
    floorplan::{mapping::MappingMode, replication::TileLocation},
    network::NetworkLayer,
    settings::{Precision, Settings},
    sim_result::{SimResult, SimStatistics},
    LayerFiles, Matrix, NeuroSimError, Network, System,
};

fn init_logger() {
    simple_logger::init_with_level(log::Level::Warn).unwrap_or_default();
}

fn write_csv(
    file_name: &str,
    rows: usize,
    cols: usize,
    value: impl Fn(usize, usize) -> f64,
) -> std::io::Result<()> {
    let mut f = File::create(file_name)?;
    for r in 0..rows {
        let line: Vec<String> = (0..cols).map(|c| value(r, c).to_string()).collect();
        writeln!(f, "{}", line.join(","))?;
    }
    Ok(())
}

/// weights in [-1, 1] and a sparse pattern of input bits
fn write_layer_data(prefix: &str, rows: usize, out_depth: usize, vectors: usize) -> Vec<String> {
    let weight_file = format!("test_data/{}_weight.csv", prefix);
    let input_file = format!("test_data/{}_input.csv", prefix);
    write_csv(&weight_file, rows, out_depth, |r, c| {
        ((r * 7 + c * 3) % 17) as f64 / 8.0 - 1.0
    })
    .unwrap();
    write_csv(&input_file, rows, vectors, |r, c| {
        if (r + c) % 3 == 0 {
            1.0
        } else {
            0.0
        }
    })
    .unwrap();
    vec![weight_file, input_file]
}

/// two 3x3 convolutions and a classifier, 8 bit weights and inputs
fn small_network(name: &str) -> (Network, LayerFiles) {
    std::fs::create_dir_all("test_data").unwrap();
    let network_file = format!("test_data/{}_network.csv", name);
    let mut f = File::create(&network_file).unwrap();
    f.write_all(b"6,6,16,3,3,8,0\n4,4,8,3,3,4,1\n1,1,16,1,1,10,0\n")
        .unwrap();
    let network = Network::new(&network_file).unwrap();

    let mut files = write_layer_data(&format!("{}_l1", name), 144, 8, 128);
    files.extend(write_layer_data(&format!("{}_l2", name), 72, 4, 32));
    files.extend(write_layer_data(&format!("{}_l3", name), 16, 10, 8));
    (network, LayerFiles::new(files).unwrap())
}

fn conv(input: usize, depth: usize, kernel: usize, output: usize, pool: bool) -> NetworkLayer {
    NetworkLayer {
        input_rows: input,
        input_cols: input,
        input_depth: depth,
        kernel_rows: kernel,
        kernel_cols: kernel,
        output_depth: output,
        followed_by_max_pool: pool,
    }
}

/// one fully connected layer on a 1x1 input
fn fully_connected(input_depth: usize, output_depth: usize) -> Network {
    Network::from_layers(vec![conv(1, input_depth, 1, output_depth, false)]).unwrap()
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() <= expected.abs() * 1e-9 + 1e-24,
        "{} != {}",
        actual,
        expected
    );
}

#[test]
fn test_system() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let start_time = std::time::Instant::now();
    let mut results = SimResult::new();

    let settings = Settings::new(vec!["configs/default.toml".into()])?;
    results.settings = Some(settings.clone());
    let precision = Precision::new(8, 8, settings.array.cell_bit)?;
    let (network, files) = small_network("default");

    let mut system = System::new(&network, &settings, precision);
    let mut stat = system.run(&files)?;

    assert_eq!(stat.layers.len(), 3);
    assert!(stat
        .layers
        .iter()
        .all(|layer| layer.mode == MappingMode::Conventional));
    let tiles: usize = stat.layers.iter().map(|layer| layer.num_tiles).sum();
    assert_eq!(tiles, stat.floor_plan.total_tiles());
    assert_eq!(tiles, stat.floor_plan.hierarchy.total_tiles());

    assert!(stat.chip_utilization > 0.0 && stat.chip_utilization <= 1.0);
    for layer in &stat.layers {
        assert!(layer.utilization > 0.0 && layer.utilization <= 1.0);
        assert!(layer.performance.read_latency > 0.0);
        assert!(layer.performance.read_dynamic_energy > 0.0);
    }

    // layers run one after another
    let latency: f64 = stat
        .layers
        .iter()
        .map(|layer| layer.performance.read_latency)
        .sum();
    let chip = &stat.chip;
    assert!((chip.performance.read_latency - latency).abs() < latency * 1e-12);
    assert!((chip.fps * chip.performance.read_latency - 1.0).abs() < 1e-9);
    assert!(chip.tops_per_watt > 0.0);
    assert_eq!(chip.operations, network.operations());

    assert!(stat.area.total > 0.0);
    assert!(stat.area.adc > 0.0 && stat.area.adc < stat.area.total);

    let simulation_time = start_time.elapsed().as_secs();
    stat.simulation_time = format!(
        "{}:{}:{}",
        simulation_time / 3600,
        (simulation_time / 60) % 60,
        simulation_time % 60
    );
    assert!(!stat.to_string().is_empty());
    results.stats = Some(stat);
    std::fs::write(
        "test_data/default_result.json",
        serde_json::to_string_pretty(&results)?,
    )?;
    Ok(())
}

#[test]
fn test_novel_mapping() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let settings = Settings::new(vec![
        "configs/default.toml".into(),
        "configs/optional_configs/novel.toml".into(),
    ])?;
    let precision = Precision::new(8, 8, settings.array.cell_bit)?;
    let (network, files) = small_network("novel");

    let mut system = System::new(&network, &settings, precision);
    let stat = system.run(&files)?;

    // only the first 3x3 layer has enough rows for the novel tile
    assert_eq!(stat.layers[0].mode, MappingMode::Novel);
    assert_eq!(stat.layers[1].mode, MappingMode::Conventional);
    assert_eq!(stat.layers[2].mode, MappingMode::Conventional);
    assert_eq!(stat.floor_plan.hierarchy.num_pe_nm, 9);
    assert!(stat.area.nm_tile.is_some());
    assert!(stat.chip.performance.read_latency > 0.0);
    assert!(stat.chip_utilization > 0.0 && stat.chip_utilization <= 1.0);
    Ok(())
}

#[test]
fn test_missing_layer_data() {
    init_logger();
    let settings = Settings::new(vec!["configs/default.toml".into()]).unwrap();
    let precision = Precision::new(8, 8, settings.array.cell_bit).unwrap();
    let (network, _) = small_network("missing");
    let files = LayerFiles::new(write_layer_data("missing_l1", 144, 8, 128)).unwrap();

    let mut system = System::new(&network, &settings, precision);
    let result = system.run(&files);
    assert!(matches!(
        result,
        Err(NeuroSimError::MissingLayerData { layer: 2 })
    ));
}

#[test]
fn test_weight_shape_mismatch() {
    init_logger();
    let settings = Settings::new(vec!["configs/default.toml".into()]).unwrap();
    let precision = Precision::new(8, 8, settings.array.cell_bit).unwrap();
    let network = fully_connected(16, 10);
    let data = vec![(
        Matrix::from_fn(16, 9, |_, _| 0.5),
        Matrix::from_fn(16, 8, |_, _| 1.0),
    )];
    let mut system = System::new(&network, &settings, precision);
    assert!(matches!(
        system.run(&data),
        Err(NeuroSimError::ShapeMismatch { .. })
    ));
}

/// a tile that replays a fixed list of results and keeps the inputs it was given
#[derive(Debug)]
struct ScriptedTile {
    script: Vec<Performance>,
    next: usize,
    inputs: Rc<RefCell<Vec<Matrix>>>,
}

impl ScriptedTile {
    fn new(script: Vec<Performance>) -> Self {
        ScriptedTile {
            script,
            next: 0,
            inputs: Rc::default(),
        }
    }
}

impl TileModel for ScriptedTile {
    fn calculate_area(&mut self, _geometry: &TileGeometry) -> TileArea {
        TileArea {
            total: 1e-8,
            ic: 1e-9,
            adc: 1e-9,
            accum: 1e-9,
            other: 1e-9,
            height: 1e-4,
            width: 1e-4,
        }
    }

    fn calculate_performance(&mut self, _geometry: &TileGeometry, work: &TileWork) -> Performance {
        self.inputs.borrow_mut().push(work.inputs.to_matrix());
        let cost = self.script[self.next % self.script.len()];
        self.next += 1;
        cost
    }
}

/// a shared unit with a fixed cost per call, it records `(num_read, num_unit_add)`
/// of every latency evaluation; clones share the record
#[derive(Debug, Clone, Default)]
struct ScriptedUnit {
    latency: f64,
    energy: f64,
    calls: Rc<RefCell<Vec<(f64, usize)>>>,
    read_latency: f64,
    read_dynamic_energy: f64,
}

impl ScriptedUnit {
    fn new(latency: f64, energy: f64) -> Self {
        ScriptedUnit {
            latency,
            energy,
            ..Default::default()
        }
    }

    fn latency_of(&mut self, num_read: f64, num_unit_add: usize) {
        self.calls.borrow_mut().push((num_read, num_unit_add));
        self.read_latency = self.latency;
    }

    fn power_of(&mut self) {
        self.read_dynamic_energy = self.energy;
    }

    fn calls(&self) -> Vec<(f64, usize)> {
        self.calls.borrow().clone()
    }
}

impl Component for ScriptedUnit {
    fn area(&self) -> f64 {
        1e-10
    }

    fn read_latency(&self) -> f64 {
        self.read_latency
    }

    fn read_dynamic_energy(&self) -> f64 {
        self.read_dynamic_energy
    }
}

impl BufferModel for ScriptedUnit {
    fn initialize(&mut self, _num_bit: usize, _interface_width: usize) {}
    fn calculate_area(&mut self, _height_target: f64) {}

    fn calculate_latency(
        &mut self,
        _bits_read: f64,
        num_read: f64,
        _bits_write: f64,
        _num_write: f64,
    ) {
        self.latency_of(num_read, 0);
    }

    fn calculate_power(
        &mut self,
        _bits_read: f64,
        _num_read: f64,
        _bits_write: f64,
        _num_write: f64,
    ) {
        self.power_of();
    }

    fn write_latency(&self) -> f64 {
        0.0
    }

    fn write_dynamic_energy(&self) -> f64 {
        0.0
    }

    fn height(&self) -> f64 {
        1e-5
    }

    fn width(&self) -> f64 {
        1e-5
    }
}

impl InterconnectModel for ScriptedUnit {
    fn initialize(&mut self, _num_tile_row: usize, _num_tile_col: usize, _bus_width: usize) {}
    fn calculate_area(&mut self, _unit_height: f64, _unit_width: f64) {}

    fn calculate_latency(
        &mut self,
        _location: TileLocation,
        _unit_height: f64,
        _unit_width: f64,
        num_read: f64,
    ) {
        self.latency_of(num_read, 0);
    }

    fn calculate_power(
        &mut self,
        _location: TileLocation,
        _unit_height: f64,
        _unit_width: f64,
        _num_bit_access: f64,
        _num_read: f64,
    ) {
        self.power_of();
    }

    fn bus_width(&self) -> usize {
        64
    }
}

impl AdderTreeModel for ScriptedUnit {
    fn initialize(&mut self, _num_inputs: usize, _num_bit: usize, _num_lanes: usize) {}
    fn calculate_area(&mut self, _height_target: f64) {}

    fn calculate_latency(&mut self, num_read: f64, num_unit_add: usize) {
        self.latency_of(num_read, num_unit_add);
    }

    fn calculate_power(&mut self, _num_read: f64, _num_unit_add: usize) {
        self.power_of();
    }
}

impl ActivationModel for ScriptedUnit {
    fn initialize(&mut self, _num_unit: usize, _num_bit_in: usize, _num_bit_out: usize) {}
    fn calculate_area(&mut self, _width_target: f64) {}

    fn calculate_latency(&mut self, num_read: f64) {
        self.latency_of(num_read, 0);
    }

    fn calculate_power(&mut self, _num_read: f64) {
        self.power_of();
    }

    fn num_unit(&self) -> usize {
        64
    }

    fn outputs_per_read(&self) -> usize {
        1
    }
}

impl MaxPoolModel for ScriptedUnit {
    fn initialize(&mut self, _num_bit: usize, _window: usize, _num_unit: usize) {}
    fn calculate_area(&mut self, _width_target: f64) {}

    fn calculate_latency(&mut self, num_read: f64) {
        self.latency_of(num_read, 0);
    }

    fn calculate_power(&mut self, _num_read: f64) {
        self.power_of();
    }

    fn window(&self) -> usize {
        4
    }
}

/// the shared units of a chip, free unless a test gives them a cost
#[derive(Debug, Default)]
struct SharedUnits {
    global_buffer: ScriptedUnit,
    htree: ScriptedUnit,
    accumulation: ScriptedUnit,
    activation: ScriptedUnit,
    max_pool: ScriptedUnit,
}

impl SharedUnits {
    fn resources(&self, tile: ScriptedTile) -> ChipResources {
        ChipResources {
            global_buffer: Box::new(self.global_buffer.clone()),
            htree: Box::new(self.htree.clone()),
            accumulation: Box::new(self.accumulation.clone()),
            activation: Box::new(self.activation.clone()),
            max_pool: Box::new(self.max_pool.clone()),
            tile: Box::new(tile),
        }
    }
}

fn run_scripted(
    network: &Network,
    settings: &Settings,
    data: &dyn LayerData,
    resources: ChipResources,
) -> SimStatistics {
    let precision = Precision::new(8, 8, settings.array.cell_bit).unwrap();
    let mut system = System::with_resources(network, settings, precision, resources);
    system.run(data).unwrap()
}

fn scripted_run(
    network: &Network,
    settings: &Settings,
    precision: Precision,
    data: &dyn LayerData,
    script: Vec<Performance>,
) -> Performance {
    let mut resources = ChipResources::analytic(settings, &precision);
    resources.tile = Box::new(ScriptedTile::new(script));
    let mut system = System::with_resources(network, settings, precision, resources);
    let stat = system.run(data).unwrap();
    assert_eq!(stat.layers[0].num_tiles, 2);
    stat.layers[0].performance
}

#[test]
fn test_tiles_of_a_layer_run_in_parallel() {
    init_logger();
    // no shared activation between the tiles
    let settings = Settings::new(vec![
        "configs/default.toml".into(),
        "configs/optional_configs/tile_activation.toml".into(),
    ])
    .unwrap();
    let precision = Precision::new(8, 8, settings.array.cell_bit).unwrap();
    // 600 synapse columns need two 512 wide tiles
    let network = fully_connected(16, 300);
    let data = vec![(
        Matrix::from_fn(16, 300, |r, c| ((r + c) % 5) as f64 / 4.0 - 0.5),
        Matrix::from_fn(16, 8, |r, c| ((r + c) % 2) as f64),
    )];

    let idle = Performance::default();
    let baseline = scripted_run(&network, &settings, precision, &data, vec![idle]);
    let script = vec![
        Performance {
            read_latency: 3e-9,
            read_dynamic_energy: 2e-12,
            ..Default::default()
        },
        Performance {
            read_latency: 5e-9,
            read_dynamic_energy: 2e-12,
            ..Default::default()
        },
    ];
    let layer = scripted_run(&network, &settings, precision, &data, script);

    // the slowest tile sets the latency, the energies add up
    assert!((layer.read_latency - baseline.read_latency - 5e-9).abs() < 1e-15);
    assert!((layer.read_dynamic_energy - baseline.read_dynamic_energy - 4e-12).abs() < 1e-18);
}

#[test]
fn test_novel_layer_gathers_kernel_positions() {
    init_logger();
    let settings = Settings::new(vec![
        "configs/default.toml".into(),
        "configs/optional_configs/novel.toml".into(),
    ])
    .unwrap();
    // 300 rows per kernel position need two 256 row novel PEs
    let network =
        Network::from_layers(vec![conv(3, 300, 3, 8, false), conv(1, 16, 1, 10, false)]).unwrap();
    let data = vec![
        (
            Matrix::from_fn(2700, 8, |r, c| ((r + c) % 5) as f64 / 4.0 - 0.5),
            Matrix::from_fn(2700, 8, |r, _| r as f64),
        ),
        (
            Matrix::from_fn(16, 10, |_, _| 0.5),
            Matrix::from_fn(16, 8, |_, _| 1.0),
        ),
    ];
    let units = SharedUnits {
        global_buffer: ScriptedUnit::new(3e-9, 0.0),
        htree: ScriptedUnit::new(1.5e-9, 0.0),
        ..Default::default()
    };
    // the tile reports its own buffer and interconnect share
    let tile = ScriptedTile::new(vec![Performance {
        read_latency: 9e-9,
        read_dynamic_energy: 2e-12,
        buffer_latency: 3e-9,
        ic_latency: 1.5e-9,
        latency_other: 4.5e-9,
        ..Default::default()
    }]);
    let inputs = tile.inputs.clone();
    let stat = run_scripted(&network, &settings, &data, units.resources(tile));

    let h = &stat.floor_plan.hierarchy;
    assert_eq!((h.num_pe_nm, h.pe_size_nm), (9, 256));
    assert_eq!(stat.layers[0].mode, MappingMode::Novel);
    assert_eq!(stat.layers[0].num_tiles, 2);

    // every PE of a tile holds the same rows of its own kernel position
    let inputs = inputs.borrow();
    assert_eq!(inputs.len(), 3);
    let (first, second) = (&inputs[0], &inputs[1]);
    assert_eq!((first.rows(), first.cols()), (256 * 9, 8));
    assert_eq!((second.rows(), second.cols()), (44 * 9, 8));
    for g in 0..9 {
        for r in 0..256 {
            assert_eq!(first.get(g * 256 + r, 0), (g * 300 + r) as f64);
        }
        for r in 0..44 {
            assert_eq!(second.get(g * 44 + r, 7), (256 + g * 300 + r) as f64);
        }
    }

    // buffer and interconnect: (slowest tile + global) / kernel rows
    let layer = &stat.layers[0].performance;
    assert_close(layer.buffer_latency, (3e-9 + 3e-9) / 3.0);
    assert_close(layer.ic_latency, (1.5e-9 + 1.5e-9) / 3.0);
    assert_close(layer.read_latency, 9e-9 - 4.5e-9 + 2e-9 + 1e-9);
    assert_close(layer.latency_other, 3e-9);
    assert_close(layer.read_dynamic_energy, 4e-12);
}

#[test]
fn test_partial_sums_of_tall_layer_are_accumulated() {
    init_logger();
    let settings = Settings::new(vec![
        "configs/default.toml".into(),
        "configs/optional_configs/tile_activation.toml".into(),
    ])
    .unwrap();
    // 600 synapse rows need two 512 row tiles
    let network = fully_connected(600, 10);
    let data = vec![(
        Matrix::from_fn(600, 10, |r, c| ((r + c) % 5) as f64 / 4.0 - 0.5),
        Matrix::from_fn(600, 8, |r, c| ((r + c) % 2) as f64),
    )];
    let units = SharedUnits {
        accumulation: ScriptedUnit::new(1e-9, 0.5e-12),
        ..Default::default()
    };
    let tile = ScriptedTile::new(vec![Performance::default()]);
    let stat = run_scripted(&network, &settings, &data, units.resources(tile));

    assert_eq!(stat.floor_plan.hierarchy.tile_size_cm, 512);
    assert_eq!(stat.floor_plan.layers[0].num_tiles_row, 2);
    assert_eq!(stat.floor_plan.layers[0].num_tiles_col, 1);
    // one column of tiles, 8 muxed columns, 2 tiles of output, 2 tiles to add
    assert_eq!(units.accumulation.calls(), vec![(16.0, 2), (16.0, 2)]);
    assert!(units.activation.calls().is_empty());
    assert!(units.max_pool.calls().is_empty());

    let layer = &stat.layers[0].performance;
    assert_close(layer.latency_accum, 2e-9);
    assert_close(layer.energy_accum, 1e-12);
    assert_close(layer.read_latency, 2e-9);
    assert_close(layer.read_dynamic_energy, 1e-12);
}

#[test]
fn test_pooling_and_activation_follow_the_next_layer() {
    init_logger();
    let settings = Settings::new(vec!["configs/default.toml".into()]).unwrap();
    // the second layer has 600 synapse columns, two 512 wide tiles
    let network =
        Network::from_layers(vec![conv(4, 16, 1, 8, true), conv(3, 8, 2, 300, true)]).unwrap();
    let data = vec![
        (
            Matrix::from_fn(16, 8, |r, c| ((r + c) % 5) as f64 / 4.0 - 0.5),
            Matrix::from_fn(16, 128, |r, c| ((r + c) % 2) as f64),
        ),
        (
            Matrix::from_fn(32, 300, |r, c| ((r * c) % 7) as f64 / 6.0 - 0.5),
            Matrix::from_fn(32, 32, |r, c| ((r + c) % 3 == 0) as u8 as f64),
        ),
    ];
    let units = SharedUnits {
        activation: ScriptedUnit::new(1e-9, 1e-12),
        max_pool: ScriptedUnit::new(2e-9, 2e-12),
        ..Default::default()
    };
    let tile = ScriptedTile::new(vec![Performance::default()]);
    let stat = run_scripted(&network, &settings, &data, units.resources(tile));

    assert_eq!(stat.floor_plan.hierarchy.tile_size_cm, 512);
    assert_eq!(stat.layers[0].num_tiles, 1);
    assert_eq!(stat.layers[1].num_tiles, 2);
    assert!(units.accumulation.calls().is_empty());

    // the first layer feeds the 2 tiles of the next one, the last layer
    // falls back to its own 2 tiles
    assert_eq!(units.activation.calls(), vec![(2.0, 0), (2.0, 0), (2.0, 0)]);
    // ceil(512 / (3x3 next input / 4)) then ceil(512 / (2x2 own output / 4))
    assert_eq!(
        units.max_pool.calls(),
        vec![(228.0, 0), (512.0, 0), (512.0, 0)]
    );

    let first = &stat.layers[0].performance;
    assert_close(first.read_latency, 3e-9);
    let last = &stat.layers[1].performance;
    assert_close(last.read_latency, 6e-9);
    assert_close(last.latency_other, 6e-9);
    assert_close(last.read_dynamic_energy, 6e-12);
    assert_close(last.energy_other, 6e-12);
    assert_close(stat.chip.performance.read_latency, 9e-9);
}
