use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use memmap2::Mmap;
use ndarray::{s, Array1, Array2, ArrayView2, Axis};
use rand::Rng;
use rayon::prelude::*;
use tracing::info;

use super::ForwardPass;
use crate::gguf::{is_gguf_file, GGUFError, GGUFReader, GGUFValue, GGUFWriter};
use crate::predictor::error::PredictionError;

/// Value of `general.architecture` for this network
pub const ARCHITECTURE: &str = "nextword-lstm";

const TOKEN_EMBEDDING: &str = "token_embd.weight";
const LSTM_KERNEL: &str = "lstm.kernel";
const LSTM_RECURRENT_KERNEL: &str = "lstm.recurrent_kernel";
const LSTM_BIAS: &str = "lstm.bias";
const OUTPUT_WEIGHT: &str = "output.weight";
const OUTPUT_BIAS: &str = "output.bias";

/// Sizes of the network, mirrored in the artifact metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LstmConfig {
    pub context_length: usize,
    pub vocab_size: usize,
    pub embedding_length: usize,
    pub hidden_size: usize,
}

/// Embedding -> single LSTM layer -> dense softmax over the vocabulary.
///
/// Gate blocks in the kernels are ordered input, forget, cell, output.
pub struct LstmModel {
    config: LstmConfig,
    /// [vocab, embedding]
    embedding: Array2<f32>,
    /// [embedding, 4 * hidden]
    kernel: Array2<f32>,
    /// [hidden, 4 * hidden]
    recurrent_kernel: Array2<f32>,
    /// [4 * hidden]
    bias: Array1<f32>,
    /// [vocab, hidden], one row per output word
    output: Array2<f32>,
    /// [vocab]
    output_bias: Array1<f32>,
}

impl LstmModel {
    /// Loads the network from a GGUF artifact.
    ///
    /// The file is memory mapped only while the weights are copied out; both
    /// the handle and the mapping are gone when this returns.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PredictionError> {
        let path = path.as_ref();

        let mmap = {
            let file = File::open(path).map_err(|e| {
                PredictionError::resource_load(format!("Cannot open model {}: {}", path.display(), e))
            })?;
            if !is_gguf_file(path) {
                return Err(PredictionError::resource_load(format!(
                    "{} is not a GGUF file",
                    path.display()
                )));
            }
            // The artifact is treated as read-only for the lifetime of the map.
            unsafe { Mmap::map(&file) }.map_err(|e| {
                PredictionError::resource_load(format!("Cannot map model {}: {}", path.display(), e))
            })?
        };

        let model = Self::from_gguf_bytes(&mmap).map_err(|e| match e {
            PredictionError::ResourceLoad(msg) => {
                PredictionError::resource_load(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;

        info!(
            "Loaded {} model from {} ({} bytes): context {}, vocab {}, embedding {}, hidden {}",
            ARCHITECTURE,
            path.display(),
            mmap.len(),
            model.config.context_length,
            model.config.vocab_size,
            model.config.embedding_length,
            model.config.hidden_size
        );
        Ok(model)
    }

    /// Parses a whole GGUF file held in memory.
    pub fn from_gguf_bytes(bytes: &[u8]) -> Result<Self, PredictionError> {
        let reader = GGUFReader::from_bytes(bytes)?;

        let architecture = reader.get_metadata_value("general.architecture")?;
        if architecture.as_str() != Some(ARCHITECTURE) {
            return Err(PredictionError::resource_load(format!(
                "Unsupported architecture {}, expected {}",
                architecture, ARCHITECTURE
            )));
        }

        let config = LstmConfig {
            context_length: reader.get_metadata_usize("nextword.context_length")?,
            vocab_size: reader.get_metadata_usize("nextword.vocab_size")?,
            embedding_length: reader.get_metadata_usize("nextword.embedding_length")?,
            hidden_size: reader.get_metadata_usize("nextword.hidden_size")?,
        };
        let LstmConfig { vocab_size, embedding_length, hidden_size, .. } = config;
        let gates = hidden_size.checked_mul(4).ok_or_else(|| {
            PredictionError::resource_load(format!("hidden_size {} is too large", hidden_size))
        })?;

        Ok(Self {
            config,
            embedding: matrix(&reader, bytes, TOKEN_EMBEDDING, vocab_size, embedding_length)?,
            kernel: matrix(&reader, bytes, LSTM_KERNEL, embedding_length, gates)?,
            recurrent_kernel: matrix(&reader, bytes, LSTM_RECURRENT_KERNEL, hidden_size, gates)?,
            bias: vector(&reader, bytes, LSTM_BIAS, gates)?,
            output: matrix(&reader, bytes, OUTPUT_WEIGHT, vocab_size, hidden_size)?,
            output_bias: vector(&reader, bytes, OUTPUT_BIAS, vocab_size)?,
        })
    }

    /// Small random weights, for demo artifacts and tests.
    pub fn random<R: Rng>(config: LstmConfig, rng: &mut R) -> Self {
        let gates = 4 * config.hidden_size;
        let mut uniform = |shape: (usize, usize)| {
            Array2::from_shape_simple_fn(shape, || rng.random_range(-0.1f32..0.1))
        };

        let embedding = uniform((config.vocab_size, config.embedding_length));
        let kernel = uniform((config.embedding_length, gates));
        let recurrent_kernel = uniform((config.hidden_size, gates));
        let output = uniform((config.vocab_size, config.hidden_size));

        // forget gate starts open
        let mut bias = Array1::zeros(gates);
        bias.slice_mut(s![config.hidden_size..2 * config.hidden_size]).fill(1.0);

        Self {
            config,
            embedding,
            kernel,
            recurrent_kernel,
            bias,
            output,
            output_bias: Array1::zeros(config.vocab_size),
        }
    }

    /// Writes the network as a GGUF artifact that [`LstmModel::load`] accepts.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), GGUFError> {
        let as_int = |v: usize| GGUFValue::Int(v as i64);
        let flat = |a: &Array2<f32>| a.iter().copied().collect::<Vec<_>>();

        let mut writer = GGUFWriter::new();
        writer
            .add_metadata("general.architecture", GGUFValue::String(ARCHITECTURE.to_string()))
            .add_metadata("nextword.context_length", as_int(self.config.context_length))
            .add_metadata("nextword.vocab_size", as_int(self.config.vocab_size))
            .add_metadata("nextword.embedding_length", as_int(self.config.embedding_length))
            .add_metadata("nextword.hidden_size", as_int(self.config.hidden_size));

        writer.add_tensor(TOKEN_EMBEDDING, self.embedding.shape(), flat(&self.embedding))?;
        writer.add_tensor(LSTM_KERNEL, self.kernel.shape(), flat(&self.kernel))?;
        writer.add_tensor(LSTM_RECURRENT_KERNEL, self.recurrent_kernel.shape(), flat(&self.recurrent_kernel))?;
        writer.add_tensor(LSTM_BIAS, self.bias.shape(), self.bias.to_vec())?;
        writer.add_tensor(OUTPUT_WEIGHT, self.output.shape(), flat(&self.output))?;
        writer.add_tensor(OUTPUT_BIAS, self.output_bias.shape(), self.output_bias.to_vec())?;

        writer.write_to_path(path)
    }

    pub fn config(&self) -> LstmConfig {
        self.config
    }

    fn token_index(&self, value: f32) -> Result<usize, PredictionError> {
        if !value.is_finite() || value < 0.0 || value.fract() != 0.0 {
            return Err(PredictionError::inference(format!("Input {} is not a token index", value)));
        }
        let index = value as usize;
        if index >= self.config.vocab_size {
            return Err(PredictionError::inference(format!(
                "Token index {} is outside the embedding table ({} rows)",
                index, self.config.vocab_size
            )));
        }
        Ok(index)
    }
}

impl ForwardPass for LstmModel {
    fn architecture(&self) -> &str {
        ARCHITECTURE
    }

    fn input_len(&self) -> usize {
        self.config.context_length
    }

    fn output_len(&self) -> usize {
        self.config.vocab_size
    }

    fn hyperparameters(&self) -> BTreeMap<String, usize> {
        BTreeMap::from([
            ("context_length".to_string(), self.config.context_length),
            ("vocab_size".to_string(), self.config.vocab_size),
            ("embedding_length".to_string(), self.config.embedding_length),
            ("hidden_size".to_string(), self.config.hidden_size),
        ])
    }

    fn forward(&self, input: ArrayView2<'_, f32>) -> Result<Array2<f32>, PredictionError> {
        if input.shape() != [1, self.config.context_length] {
            return Err(PredictionError::inference(format!(
                "Expected input of shape [1, {}], got {:?}",
                self.config.context_length,
                input.shape()
            )));
        }

        let hs = self.config.hidden_size;
        let mut hidden = Array1::<f32>::zeros(hs);
        let mut cell = Array1::<f32>::zeros(hs);

        for &value in input.row(0).iter() {
            let x = self.embedding.row(self.token_index(value)?);
            let z = x.dot(&self.kernel) + hidden.dot(&self.recurrent_kernel) + &self.bias;

            let input_gate = z.slice(s![0..hs]).mapv(sigmoid);
            let forget_gate = z.slice(s![hs..2 * hs]).mapv(sigmoid);
            let candidate = z.slice(s![2 * hs..3 * hs]).mapv(f32::tanh);
            let output_gate = z.slice(s![3 * hs..]).mapv(sigmoid);

            cell = &forget_gate * &cell + &input_gate * &candidate;
            hidden = &output_gate * &cell.mapv(f32::tanh);
        }

        // the projection dominates the cost at a vocabulary of ~13k rows
        let logits: Vec<f32> = self
            .output
            .axis_iter(Axis(0))
            .into_par_iter()
            .map(|row| row.dot(&hidden))
            .collect();
        let mut scores = Array1::from(logits) + &self.output_bias;
        softmax(&mut scores);

        if scores.iter().any(|v| !v.is_finite()) {
            return Err(PredictionError::inference("Forward pass produced non-finite scores"));
        }

        Ok(scores.insert_axis(Axis(0)))
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

fn softmax(values: &mut Array1<f32>) {
    let max = values.fold(f32::NEG_INFINITY, |acc, &v| acc.max(v));
    values.mapv_inplace(|v| (v - max).exp());
    let sum = values.sum();
    values.mapv_inplace(|v| v / sum);
}

fn matrix(
    reader: &GGUFReader,
    bytes: &[u8],
    name: &str,
    rows: usize,
    cols: usize,
) -> Result<Array2<f32>, PredictionError> {
    let (shape, values) = reader.read_f32_tensor(bytes, name)?;
    if shape != [rows, cols] {
        return Err(PredictionError::resource_load(format!(
            "Tensor {} has shape {:?}, expected [{}, {}]",
            name, shape, rows, cols
        )));
    }
    Array2::from_shape_vec((rows, cols), values)
        .map_err(|e| PredictionError::resource_load(format!("Tensor {}: {}", name, e)))
}

fn vector(reader: &GGUFReader, bytes: &[u8], name: &str, len: usize) -> Result<Array1<f32>, PredictionError> {
    let (shape, values) = reader.read_f32_tensor(bytes, name)?;
    if shape != [len] {
        return Err(PredictionError::resource_load(format!(
            "Tensor {} has shape {:?}, expected [{}]",
            name, shape, len
        )));
    }
    Ok(Array1::from(values))
}
