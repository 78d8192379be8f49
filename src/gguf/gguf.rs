use std::collections::BTreeMap;
use std::io::{Cursor, Read, Seek};
use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use super::types::{GGUFValue, GGUFError, GGUFValueType, TensorInfo, TensorType};
use super::gguf_utils::{self, GGUF_MAGIC, DEFAULT_ALIGNMENT};
use tracing::debug;

/// Parsed header of a GGUF container: metadata, tensor directory and the
/// position of the tensor data section.
///
/// The reader never holds on to the underlying bytes; payloads are sliced
/// out of a caller-owned buffer with [`GGUFReader::tensor_data`].
#[derive(Debug, Clone)]
pub struct GGUFReader {
    /// Format version from the header
    pub version: u32,
    /// Number of tensors in the file
    pub tensor_count: u64,
    /// Metadata key-value pairs with their type names
    pub metadata: BTreeMap<String, (String, GGUFValue)>,
    /// Information about each tensor
    pub tensors: Vec<TensorInfo>,
    /// Alignment of the data section and of each tensor payload
    pub alignment: u64,
    /// Absolute offset of the tensor data section
    pub data_offset: u64,
}

impl GGUFReader {
    /// Parses the header of an in-memory (typically memory mapped) GGUF file.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, GGUFError> {
        let mut cursor = Cursor::new(bytes);
        Self::read(&mut cursor)
    }

    /// Parses a GGUF header from any seekable reader.
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self, GGUFError> {
        let magic = reader.read_u32::<LittleEndian>()?;
        if magic != GGUF_MAGIC {
            return Err(GGUFError::InvalidFormat("Invalid magic number".into()));
        }

        let version = reader.read_u32::<LittleEndian>()?;
        if version == 0 || version > 3 {
            return Err(GGUFError::InvalidFormat(format!("Unsupported version: {}", version)));
        }

        let tensor_count = gguf_utils::read_len(reader, version)?;
        let metadata_count = gguf_utils::read_len(reader, version)?;

        debug!("Reading GGUF file: {} tensors, {} metadata entries", tensor_count, metadata_count);

        let mut metadata: BTreeMap<String, (String, GGUFValue)> = BTreeMap::new();
        for _ in 0..metadata_count {
            let (key, type_str, value) = read_metadata_kv(reader, version)?;
            metadata.insert(key, (type_str, value));
        }

        let alignment = match metadata.get("general.alignment").and_then(|(_, v)| v.as_int()) {
            Some(a) if a > 0 && (a as u64).is_power_of_two() => a as u64,
            Some(a) => {
                return Err(GGUFError::InvalidFormat(format!("Invalid alignment: {}", a)))
            }
            None => DEFAULT_ALIGNMENT,
        };

        let tensors = read_tensor_info(reader, tensor_count, version)?;
        let header_end = reader.stream_position()?;

        Ok(Self {
            version,
            tensor_count,
            metadata,
            tensors,
            alignment,
            data_offset: gguf_utils::align_up(header_end, alignment),
        })
    }

    pub fn get_metadata_value(&self, key: &str) -> Result<GGUFValue, GGUFError> {
        match self.metadata.get(key) {
            Some((_, value)) => Ok(value.clone()),
            None => Err(GGUFError::MetadataNotFound(key.to_string())),
        }
    }

    /// Integer metadata lookup that fails for missing or non-numeric keys
    pub fn get_metadata_usize(&self, key: &str) -> Result<usize, GGUFError> {
        let value = self.get_metadata_value(key)?;
        match value.as_int() {
            Some(v) if v >= 0 => Ok(v as usize),
            _ => Err(GGUFError::InvalidFormat(format!("{} is not a non-negative integer: {}", key, value))),
        }
    }

    /// Get a tensor by name
    pub fn get_tensor_by_name(&self, name: &str) -> Option<&TensorInfo> {
        self.tensors.iter().find(|t| t.name == name)
    }

    /// Slices the raw payload of `info` out of the whole-file buffer.
    pub fn tensor_data<'a>(&self, bytes: &'a [u8], info: &TensorInfo) -> Result<&'a [u8], GGUFError> {
        let element_size: usize = match info.data_type {
            TensorType::F32 => 4,
            other => {
                return Err(GGUFError::UnsupportedTensorType(info.name.clone(), other.id()))
            }
        };

        let overflow = || GGUFError::InvalidFormat(format!("Offset overflow for {}", info.name));
        let start = self.data_offset.checked_add(info.offset).ok_or_else(overflow)? as usize;
        let end = info
            .dims
            .iter()
            .try_fold(element_size, |acc, &d| acc.checked_mul(d as usize))
            .and_then(|len| start.checked_add(len))
            .ok_or_else(overflow)?;
        if end > bytes.len() {
            return Err(GGUFError::InvalidFormat(format!(
                "Not enough data for tensor {}: need bytes {}..{}, file has {}",
                info.name, start, end, bytes.len()
            )));
        }

        Ok(&bytes[start..end])
    }

    /// Decodes an F32 tensor into a flat row-major vector.
    pub fn read_f32_tensor(&self, bytes: &[u8], name: &str) -> Result<(Vec<usize>, Vec<f32>), GGUFError> {
        let info = self
            .get_tensor_by_name(name)
            .ok_or_else(|| GGUFError::TensorNotFound(name.to_string()))?;
        if info.data_type != TensorType::F32 {
            return Err(GGUFError::UnsupportedTensorType(name.to_string(), info.data_type.id()));
        }

        let raw = self.tensor_data(bytes, info)?;
        // tensor_data has already bounded the payload by the buffer length
        let mut values = vec![0.0f32; raw.len() / 4];
        LittleEndian::read_f32_into(raw, &mut values);

        Ok((info.shape(), values))
    }
}

fn read_metadata_kv<R: Read>(reader: &mut R, version: u32) -> Result<(String, String, GGUFValue), GGUFError> {
    let key = gguf_utils::read_string(reader, version)?;

    let value_type = GGUFValueType::try_from(reader.read_u32::<LittleEndian>()?)?;
    let type_str = value_type.type_string();

    match value_type {
        GGUFValueType::ARRAY => {
            let element_type = GGUFValueType::try_from(reader.read_u32::<LittleEndian>()?)?;
            let arr_len = gguf_utils::read_len(reader, version)?;

            let mut array = Vec::with_capacity(arr_len.min(1 << 16) as usize);
            for _ in 0..arr_len {
                array.push(gguf_utils::read_value_by_type(reader, element_type, version)?);
            }

            Ok((key, type_str, GGUFValue::Array(array)))
        },
        _ => {
            let value = gguf_utils::read_value_by_type(reader, value_type, version)?;
            Ok((key, type_str, value))
        }
    }
}

fn read_tensor_info<R: Read>(reader: &mut R, tensor_count: u64, version: u32) -> Result<Vec<TensorInfo>, GGUFError> {
    let mut tensors = Vec::with_capacity(tensor_count.min(1 << 12) as usize);

    for _ in 0..tensor_count {
        let name = gguf_utils::read_string(reader, version)?;

        let n_dims = reader.read_u32::<LittleEndian>()?;
        if n_dims == 0 || n_dims > 4 {
            return Err(GGUFError::InvalidFormat(format!("Tensor {} has {} dimensions", name, n_dims)));
        }

        let mut dims = Vec::with_capacity(n_dims as usize);
        for _ in 0..n_dims {
            dims.push(gguf_utils::read_len(reader, version)?);
        }

        let data_type = TensorType::from(reader.read_u32::<LittleEndian>()?);
        let offset = reader.read_u64::<LittleEndian>()?;

        tensors.push(TensorInfo {
            name,
            dims,
            data_type,
            offset,
        });
    }

    Ok(tensors)
}
