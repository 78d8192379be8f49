use std::fs::File;
use std::path::Path;
use std::io::Read;
use byteorder::{LittleEndian, ReadBytesExt};
use super::types::{GGUFValue, GGUFValueType, GGUFError};

/// The magic number that identifies GGUF files
pub const GGUF_MAGIC: u32 = 0x46554747; // "GGUF" in ASCII

/// Alignment of the tensor data section when the file does not declare one
pub const DEFAULT_ALIGNMENT: u64 = 32;

/// Version 1 files used 32-bit lengths and counts, later versions use 64-bit ones.
pub fn read_len<R: Read>(reader: &mut R, version: u32) -> Result<u64, GGUFError> {
    if version >= 2 {
        Ok(reader.read_u64::<LittleEndian>()?)
    } else {
        Ok(reader.read_u32::<LittleEndian>()? as u64)
    }
}

/// Read a length-prefixed UTF-8 string.
///
/// The buffer only grows with bytes actually present, so a corrupt length
/// prefix fails as a short read instead of a huge allocation.
pub fn read_string<R: Read>(reader: &mut R, version: u32) -> Result<String, GGUFError> {
    let str_len = read_len(reader, version)?;

    let mut buffer = Vec::new();
    reader.by_ref().take(str_len).read_to_end(&mut buffer)?;
    if buffer.len() as u64 != str_len {
        return Err(GGUFError::InvalidFormat(format!(
            "String of {} bytes runs past the end of the data ({} available)",
            str_len,
            buffer.len()
        )));
    }

    String::from_utf8(buffer)
        .map_err(|e| GGUFError::InvalidFormat(format!("Invalid UTF-8 in string: {}", e)))
}

/// Read a scalar GGUF value of the specified type
pub fn read_value_by_type<R: Read>(
    reader: &mut R,
    value_type: GGUFValueType,
    version: u32,
) -> Result<GGUFValue, GGUFError> {
    match value_type {
        GGUFValueType::UINT8 => Ok(GGUFValue::Int(reader.read_u8()? as i64)),
        GGUFValueType::INT8 => Ok(GGUFValue::Int(reader.read_i8()? as i64)),
        GGUFValueType::UINT16 => Ok(GGUFValue::Int(reader.read_u16::<LittleEndian>()? as i64)),
        GGUFValueType::INT16 => Ok(GGUFValue::Int(reader.read_i16::<LittleEndian>()? as i64)),
        GGUFValueType::UINT32 => Ok(GGUFValue::Int(reader.read_u32::<LittleEndian>()? as i64)),
        GGUFValueType::INT32 => Ok(GGUFValue::Int(reader.read_i32::<LittleEndian>()? as i64)),
        GGUFValueType::FLOAT32 => Ok(GGUFValue::Float(reader.read_f32::<LittleEndian>()?)),
        GGUFValueType::BOOL => Ok(GGUFValue::Bool(reader.read_u8()? != 0)),
        GGUFValueType::STRING => Ok(GGUFValue::String(read_string(reader, version)?)),
        GGUFValueType::UINT64 => Ok(GGUFValue::Int(reader.read_u64::<LittleEndian>()? as i64)),
        GGUFValueType::INT64 => Ok(GGUFValue::Int(reader.read_i64::<LittleEndian>()?)),
        // Stored as f32 since there is no dedicated f64 variant
        GGUFValueType::FLOAT64 => Ok(GGUFValue::Float(reader.read_f64::<LittleEndian>()? as f32)),
        GGUFValueType::ARRAY => Err(GGUFError::InvalidFormat(
            "Nested arrays are not supported".to_string(),
        )),
    }
}

/// Checks if a file at the given path is a GGUF format file by verifying its magic number.
///
/// # Arguments
///
/// * `path` - Path to the file to check
///
/// # Returns
///
/// `true` if the file exists and has a valid GGUF magic number, `false` otherwise
pub fn is_gguf_file<P: AsRef<Path>>(path: P) -> bool {
    if let Ok(mut file) = File::open(path) {
        if let Ok(magic) = file.read_u32::<LittleEndian>() {
            return magic == GGUF_MAGIC;
        }
    }
    false
}

/// Rounds `offset` up to the next multiple of `alignment`.
pub fn align_up(offset: u64, alignment: u64) -> u64 {
    offset.div_ceil(alignment) * alignment
}
