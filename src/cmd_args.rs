use clap::Parser;
use clap_complete::Shell;

/// Floor-plan a compute-in-memory chip for a network and estimate its area,
/// latency and energy
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// the network description, one layer per line
    #[clap(required_unless_present = "generator")]
    pub network: Option<String>,

    /// weight precision in bits
    #[clap(required_unless_present = "generator")]
    pub synapse_bit: Option<u32>,

    /// input activation precision in bits
    #[clap(required_unless_present = "generator")]
    pub input_bit: Option<u32>,

    /// weight and input files, one pair per layer
    pub layer_files: Vec<String>,

    /// config files overlaid on configs/default.toml, in order
    #[clap(short = 'c', long = "config")]
    pub config_names: Vec<String>,

    /// directory for the json result
    #[clap(long, default_value = "output")]
    pub output: String,

    /// print the shell completion script and exit
    #[clap(long = "generate", arg_enum)]
    pub generator: Option<Shell>,
}
