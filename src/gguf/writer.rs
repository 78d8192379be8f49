use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use byteorder::{LittleEndian, WriteBytesExt};
use super::types::{GGUFValue, GGUFError, GGUFValueType, TensorType};
use super::gguf_utils::{align_up, GGUF_MAGIC, DEFAULT_ALIGNMENT};

const VERSION: u32 = 3;

struct PendingTensor {
    name: String,
    shape: Vec<usize>,
    data: Vec<f32>,
}

/// Builds a version 3 GGUF file holding metadata and F32 tensors.
pub struct GGUFWriter {
    metadata: Vec<(String, GGUFValue)>,
    tensors: Vec<PendingTensor>,
    alignment: u64,
}

impl Default for GGUFWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl GGUFWriter {
    pub fn new() -> Self {
        Self {
            metadata: Vec::new(),
            tensors: Vec::new(),
            alignment: DEFAULT_ALIGNMENT,
        }
    }

    pub fn add_metadata(&mut self, key: &str, value: GGUFValue) -> &mut Self {
        self.metadata.push((key.to_string(), value));
        self
    }

    /// Adds a tensor given its row-major `shape` (outermost dimension first).
    pub fn add_tensor(&mut self, name: &str, shape: &[usize], data: Vec<f32>) -> Result<&mut Self, GGUFError> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(GGUFError::InvalidFormat(format!(
                "Tensor {} has {} values but shape {:?} needs {}",
                name, data.len(), shape, expected
            )));
        }
        self.tensors.push(PendingTensor {
            name: name.to_string(),
            shape: shape.to_vec(),
            data,
        });
        Ok(self)
    }

    pub fn write_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), GGUFError> {
        let mut out = BufWriter::new(File::create(path)?);
        self.write(&mut out)?;
        out.flush()?;
        Ok(())
    }

    pub fn write<W: Write>(&self, out: &mut W) -> Result<(), GGUFError> {
        let mut header = Vec::new();
        header.write_u32::<LittleEndian>(GGUF_MAGIC)?;
        header.write_u32::<LittleEndian>(VERSION)?;
        header.write_u64::<LittleEndian>(self.tensors.len() as u64)?;
        header.write_u64::<LittleEndian>(self.metadata.len() as u64)?;

        for (key, value) in &self.metadata {
            write_string(&mut header, key)?;
            write_value(&mut header, value)?;
        }

        let mut offset = 0u64;
        for tensor in &self.tensors {
            write_string(&mut header, &tensor.name)?;
            header.write_u32::<LittleEndian>(tensor.shape.len() as u32)?;
            for &dim in tensor.shape.iter().rev() {
                header.write_u64::<LittleEndian>(dim as u64)?;
            }
            header.write_u32::<LittleEndian>(TensorType::F32.id())?;
            header.write_u64::<LittleEndian>(offset)?;
            offset = align_up(offset + tensor.data.len() as u64 * 4, self.alignment);
        }

        let padded = align_up(header.len() as u64, self.alignment) as usize;
        header.resize(padded, 0);
        out.write_all(&header)?;

        for tensor in &self.tensors {
            let mut payload = Vec::with_capacity(tensor.data.len() * 4);
            for &v in &tensor.data {
                payload.write_f32::<LittleEndian>(v)?;
            }
            let padded = align_up(payload.len() as u64, self.alignment) as usize;
            payload.resize(padded, 0);
            out.write_all(&payload)?;
        }

        Ok(())
    }
}

fn write_string<W: Write>(out: &mut W, s: &str) -> Result<(), GGUFError> {
    out.write_u64::<LittleEndian>(s.len() as u64)?;
    out.write_all(s.as_bytes())?;
    Ok(())
}

fn value_type(value: &GGUFValue) -> GGUFValueType {
    match value {
        GGUFValue::String(_) => GGUFValueType::STRING,
        GGUFValue::Int(i) if (0..=u32::MAX as i64).contains(i) => GGUFValueType::UINT32,
        GGUFValue::Int(_) => GGUFValueType::INT64,
        GGUFValue::Float(_) => GGUFValueType::FLOAT32,
        GGUFValue::Bool(_) => GGUFValueType::BOOL,
        GGUFValue::Array(_) => GGUFValueType::ARRAY,
    }
}

fn write_value<W: Write>(out: &mut W, value: &GGUFValue) -> Result<(), GGUFError> {
    out.write_u32::<LittleEndian>(value_type(value) as u32)?;
    match value {
        GGUFValue::Array(items) => {
            let element_type = items.first().map(value_type).unwrap_or(GGUFValueType::INT64);
            if items.iter().any(|v| value_type(v) != element_type) {
                return Err(GGUFError::InvalidFormat("Array elements must share one type".into()));
            }
            out.write_u32::<LittleEndian>(element_type as u32)?;
            out.write_u64::<LittleEndian>(items.len() as u64)?;
            for item in items {
                write_scalar(out, item)?;
            }
            Ok(())
        }
        scalar => write_scalar(out, scalar),
    }
}

fn write_scalar<W: Write>(out: &mut W, value: &GGUFValue) -> Result<(), GGUFError> {
    match value {
        GGUFValue::String(s) => write_string(out, s)?,
        GGUFValue::Int(i) if (0..=u32::MAX as i64).contains(i) => out.write_u32::<LittleEndian>(*i as u32)?,
        GGUFValue::Int(i) => out.write_i64::<LittleEndian>(*i)?,
        GGUFValue::Float(f) => out.write_f32::<LittleEndian>(*f)?,
        GGUFValue::Bool(b) => out.write_u8(u8::from(*b))?,
        GGUFValue::Array(_) => {
            return Err(GGUFError::InvalidFormat("Nested arrays are not supported".into()))
        }
    }
    Ok(())
}
