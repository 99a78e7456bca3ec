//! the crate neurosim_chip floor-plans a compute-in-memory neural network chip
//! and estimates its area, latency and energy.
//! there are 4 parts in the crate:
//!
//! - floorplan: decide the mapping of every layer, the tile/PE sizes and the replication.
//! - accelerator: the device models, the chip assembly and the layer by layer replay.
//! - network, matrix and quantize: the network description and the layer data.
//! - sim_result: the result record and the report.
//!

pub mod accelerator;
pub mod cmd_args;
pub mod error;
pub mod floorplan;
pub mod matrix;
pub mod network;
pub mod quantize;
pub mod settings;
pub mod sim_result;

pub use accelerator::{LayerFiles, System};
pub use error::{NeuroSimError, Result};
pub use matrix::Matrix;
pub use network::Network;
pub use sim_result::SimResult;
