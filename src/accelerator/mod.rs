//! # Description
//! - this module is the chip model
//! - the main sub module is system, it drives the floor plan, the assembler and the replay
//! - read system.rs for more details
//!
//! # Components
//! - component: the device model traits every chip resource implements
//! - buffer, htree, adder_tree, activation, max_pool, tile: the analytic device models
//! - assembler: sizes the shared resources and adds up the chip area
//! - replay: walks every layer tile by tile through the device models

pub mod activation;
pub mod adder_tree;
pub mod assembler;
pub mod buffer;
pub mod component;
pub mod htree;
pub mod max_pool;
pub mod replay;
pub mod system;
pub mod tile;

pub use assembler::{ChipArea, ChipInit, ChipResources};
pub use component::Performance;
pub use system::{LayerData, LayerFiles, System};
