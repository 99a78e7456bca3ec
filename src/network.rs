use std::{fs::File, io::Read, path::Path};

use log::debug;
use serde::Serialize;

use crate::{
    error::{NeuroSimError, Result},
    matrix::parse_csv,
    settings::Precision,
};

/// one row of the network description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NetworkLayer {
    pub input_rows: usize,
    pub input_cols: usize,
    pub input_depth: usize,
    pub kernel_rows: usize,
    pub kernel_cols: usize,
    pub output_depth: usize,
    pub followed_by_max_pool: bool,
}

impl NetworkLayer {
    pub fn kernel_area(&self) -> usize {
        self.kernel_rows * self.kernel_cols
    }

    /// rows of the unrolled weight matrix
    pub fn synapse_rows(&self, precision: &Precision) -> usize {
        self.input_depth * self.kernel_area() * precision.num_row_per_synapse
    }

    /// columns of the unrolled weight matrix
    pub fn synapse_cols(&self, precision: &Precision) -> usize {
        self.output_depth * precision.num_col_per_synapse
    }

    /// rows held by one PE of a novel-mapped tile (one kernel position)
    pub fn novel_rows(&self, precision: &Precision) -> usize {
        self.input_depth * precision.num_row_per_synapse
    }

    pub fn output_rows(&self) -> usize {
        self.input_rows - self.kernel_rows + 1
    }

    pub fn output_cols(&self) -> usize {
        self.input_cols - self.kernel_cols + 1
    }

    /// sliding window positions, one input vector each
    pub fn output_positions(&self) -> usize {
        self.output_rows() * self.output_cols()
    }

    /// bit-serial input vectors fed to the array
    pub fn num_input_vectors(&self, precision: &Precision) -> usize {
        self.output_positions() * precision.num_bit_input as usize
    }

    /// input feature map volume
    pub fn input_volume(&self) -> usize {
        self.input_rows * self.input_cols * self.input_depth
    }

    /// operation count used for the energy efficiency figure
    pub fn operations(&self) -> f64 {
        (self.input_volume() * self.kernel_area() * self.output_depth) as f64
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Network {
    layers: Vec<NetworkLayer>,
}

impl Network {
    /// read the network description from the file
    /// # Arguments
    /// * `file_name` - the path of the file
    /// # Return
    /// * `Network` - the layers in execution order
    ///
    /// the file format is one layer per line, no header:
    /// inputRows,inputCols,inputDepth,kernelRows,kernelCols,outputDepth,followedByMaxPool
    /// ```
    /// use neurosim_chip::network::Network;
    /// use std::{fs::File, io::Write};
    /// std::fs::create_dir_all("test_data").unwrap();
    /// let file_name = "test_data/doc_network.csv";
    /// let mut f = File::create(file_name).unwrap();
    /// f.write_all(b"32,32,3,3,3,64,0\n30,30,64,3,3,64,1\n").unwrap();
    /// let network = Network::new(file_name).unwrap();
    /// assert_eq!(network.len(), 2);
    /// assert_eq!(network[1].input_depth, 64);
    /// assert!(network[1].followed_by_max_pool);
    /// std::fs::remove_file(file_name).unwrap();
    /// ```
    pub fn new(file_name: impl AsRef<Path>) -> Result<Self> {
        let path = file_name.as_ref();
        let mut f = File::open(path).map_err(|_| NeuroSimError::FileNotFound {
            path: path.to_path_buf(),
        })?;
        let mut contents = String::new();
        f.read_to_string(&mut contents)?;
        let rows = parse_csv(&contents, path)?;

        let mut layers = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            if row.len() != 7 {
                return Err(NeuroSimError::invalid_network(format!(
                    "layer {} has {} columns, expected 7",
                    index + 1,
                    row.len()
                )));
            }
            let mut dims = [0usize; 6];
            for (dim, &value) in dims.iter_mut().zip(row.iter()) {
                if value < 1.0 || value.fract() != 0.0 {
                    return Err(NeuroSimError::invalid_network(format!(
                        "layer {} has a non positive-integer dimension {}",
                        index + 1,
                        value
                    )));
                }
                *dim = value as usize;
            }
            layers.push(NetworkLayer {
                input_rows: dims[0],
                input_cols: dims[1],
                input_depth: dims[2],
                kernel_rows: dims[3],
                kernel_cols: dims[4],
                output_depth: dims[5],
                followed_by_max_pool: row[6] != 0.0,
            });
        }
        debug!("read {} layers from {}", layers.len(), path.display());
        Self::from_layers(layers)
    }

    pub fn from_layers(layers: Vec<NetworkLayer>) -> Result<Self> {
        if layers.is_empty() {
            return Err(NeuroSimError::invalid_network("the network has no layer"));
        }
        for (index, layer) in layers.iter().enumerate() {
            if layer.kernel_rows > layer.input_rows || layer.kernel_cols > layer.input_cols {
                return Err(NeuroSimError::invalid_network(format!(
                    "layer {} kernel {}x{} is larger than its input {}x{}",
                    index + 1,
                    layer.kernel_rows,
                    layer.kernel_cols,
                    layer.input_rows,
                    layer.input_cols
                )));
            }
        }
        Ok(Network { layers })
    }

    pub fn layers(&self) -> &[NetworkLayer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NetworkLayer> {
        self.layers.iter()
    }

    pub fn operations(&self) -> f64 {
        self.layers.iter().map(NetworkLayer::operations).sum()
    }
}

impl std::ops::Index<usize> for Network {
    type Output = NetworkLayer;
    fn index(&self, index: usize) -> &Self::Output {
        &self.layers[index]
    }
}
