use chrono::Local;
use clap::{Command, CommandFactory, Parser};
use clap_complete::{generate, Generator};
use neurosim_chip::{
    cmd_args::Args,
    settings::{Precision, Settings},
    LayerFiles, Network, SimResult, System,
};
use std::io;
fn print_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
}
fn main() -> Result<(), Box<dyn std::error::Error>> {
    simple_logger::init_with_level(log::Level::Info)?;
    let start_time = std::time::Instant::now();

    let mut config_names = vec![String::from("configs/default.toml")];
    let args = Args::parse();
    if let Some(generator) = args.generator {
        let mut cmd = Args::command();
        eprintln!("Generating completion file for {:?}...", generator);
        print_completions(generator, &mut cmd);
        return Ok(());
    }
    println!("{:?}", args);

    // config_names append args
    config_names.extend(args.config_names);

    let mut results = SimResult::new();
    let settings = Settings::new(config_names)?;
    results.settings = Some(settings.clone());
    println!("{}", serde_json::to_string_pretty(&settings)?);
    // create the folder for output
    std::fs::create_dir_all(&args.output)?;

    let network_name = args.network.ok_or("the network file is required")?;
    let synapse_bit = args.synapse_bit.ok_or("the synapse precision is required")?;
    let input_bit = args.input_bit.ok_or("the input precision is required")?;
    let precision = Precision::new(synapse_bit, input_bit, settings.array.cell_bit)?;

    let network = Network::new(network_name.as_str())?;
    let layer_files = LayerFiles::new(args.layer_files)?;

    let mut system = System::new(&network, &settings, precision);

    // run the system
    let mut stat = system.run(&layer_files)?;

    // record the simulation time
    let simulation_time = start_time.elapsed().as_secs();
    // record the result
    let seconds = simulation_time % 60;
    let minutes = (simulation_time / 60) % 60;
    let hours = (simulation_time / 60) / 60;
    let time_str = format!("{}:{}:{}", hours, minutes, seconds);
    stat.simulation_time = time_str;
    println!("{}", stat);

    results.stats = Some(stat);
    let current_time: String = Local::now().format("%Y-%m-%d-%H-%M-%S%.6f").to_string();
    let output_path = format!("{}/{}.json", args.output, current_time);

    println!("{}", serde_json::to_string_pretty(&results)?);
    // write json of results to output_path
    std::fs::write(output_path, serde_json::to_string_pretty(&results)?)?;
    Ok(())
}
