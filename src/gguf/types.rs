use std::fmt::{self};
use std::error::Error;
use serde::{Serialize, Deserialize};

/// GGUF metadata value types that can be stored in a GGUF file
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub enum GGUFValue {
    /// String value type for text data
    String(String),
    /// Integer value type for whole numbers, stored as i64
    Int(i64),
    /// Float value type for decimal numbers, stored as f32
    Float(f32),
    /// Boolean value type for true/false values
    Bool(bool),
    /// Array value type for sequences of other GGUF values
    Array(Vec<GGUFValue>),
}

impl GGUFValue {
    /// Attempts to convert the value to an integer
    ///
    /// # Returns
    /// Some(i64) if the value can be converted to an integer, None otherwise
    pub fn as_int(&self) -> Option<i64> {
        match self {
            GGUFValue::Int(i) => Some(*i),
            GGUFValue::Float(f) => Some(*f as i64),
            GGUFValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Returns the string payload, if this is a string value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            GGUFValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Debug for GGUFValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GGUFValue::String(s) => write!(f, "String({:?})", s),
            GGUFValue::Int(i) => write!(f, "Int({})", i),
            GGUFValue::Float(fl) => write!(f, "Float({})", fl),
            GGUFValue::Bool(b) => write!(f, "Bool({})", b),
            GGUFValue::Array(arr) => {
                if arr.len() <= 3 {
                    write!(f, "Array({:?})", arr)
                } else {
                    write!(f, "Array([{:?}, {:?}, {:?}, ...and {} more])",
                           &arr[0], &arr[1], &arr[2], arr.len() - 3)
                }
            },
        }
    }
}

impl fmt::Display for GGUFValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GGUFValue::String(s) => write!(f, "{}", s),
            GGUFValue::Int(i) => write!(f, "{}", i),
            GGUFValue::Float(fl) => write!(f, "{}", fl),
            GGUFValue::Bool(b) => write!(f, "{}", b),
            GGUFValue::Array(arr) => {
                write!(f, "[")?;
                for (i, value) in arr.iter().enumerate() {
                    if i > 0 { write!(f, ", ")? }
                    write!(f, "{}", value)?;
                }
                write!(f, "]")
            },
        }
    }
}

/// Custom error types for GGUF operations
#[derive(Debug)]
pub enum GGUFError {
    /// Wraps std::io::Error for file operations
    IoError(std::io::Error),
    /// Invalid format errors with a message
    InvalidFormat(String),
    /// Missing metadata key errors
    MetadataNotFound(String),
    /// Missing tensor errors
    TensorNotFound(String),
    /// Tensor stored in a type this crate cannot decode
    UnsupportedTensorType(String, u32),
}

impl fmt::Display for GGUFError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GGUFError::IoError(e) => write!(f, "I/O error: {}", e),
            GGUFError::InvalidFormat(msg) => write!(f, "Invalid GGUF format: {}", msg),
            GGUFError::MetadataNotFound(key) => write!(f, "Metadata key not found: {}", key),
            GGUFError::TensorNotFound(name) => write!(f, "Tensor not found: {}", name),
            GGUFError::UnsupportedTensorType(name, ty) => {
                write!(f, "Tensor {} has unsupported type id {}", name, ty)
            }
        }
    }
}

impl Error for GGUFError {}

impl From<std::io::Error> for GGUFError {
    fn from(err: std::io::Error) -> Self {
        GGUFError::IoError(err)
    }
}

/// Metadata value type identifiers from the GGUF format specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GGUFValueType {
    UINT8 = 0,
    INT8 = 1,
    UINT16 = 2,
    INT16 = 3,
    UINT32 = 4,
    INT32 = 5,
    FLOAT32 = 6,
    BOOL = 7,
    STRING = 8,
    ARRAY = 9,
    UINT64 = 10,
    INT64 = 11,
    FLOAT64 = 12,
}

impl GGUFValueType {
    /// Convert the value type to a string representation
    pub fn type_string(&self) -> String {
        match self {
            GGUFValueType::STRING => "String",
            GGUFValueType::ARRAY => "Array",
            GGUFValueType::BOOL => "Bool",
            GGUFValueType::FLOAT32 | GGUFValueType::FLOAT64 => "Float",
            _ => "Int",
        }.to_string()
    }
}

impl TryFrom<u32> for GGUFValueType {
    type Error = GGUFError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => GGUFValueType::UINT8,
            1 => GGUFValueType::INT8,
            2 => GGUFValueType::UINT16,
            3 => GGUFValueType::INT16,
            4 => GGUFValueType::UINT32,
            5 => GGUFValueType::INT32,
            6 => GGUFValueType::FLOAT32,
            7 => GGUFValueType::BOOL,
            8 => GGUFValueType::STRING,
            9 => GGUFValueType::ARRAY,
            10 => GGUFValueType::UINT64,
            11 => GGUFValueType::INT64,
            12 => GGUFValueType::FLOAT64,
            other => {
                return Err(GGUFError::InvalidFormat(format!("Unknown value type: {}", other)))
            }
        })
    }
}

/// Element type of a tensor payload.
///
/// Only `F32` payloads are decoded; the other ids are kept so that the
/// loader can name them in its error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TensorType {
    F32,
    F16,
    Other(u32),
}

impl TensorType {
    pub fn id(&self) -> u32 {
        match self {
            TensorType::F32 => 0,
            TensorType::F16 => 1,
            TensorType::Other(id) => *id,
        }
    }
}

impl From<u32> for TensorType {
    fn from(value: u32) -> Self {
        match value {
            0 => TensorType::F32,
            1 => TensorType::F16,
            other => TensorType::Other(other),
        }
    }
}

impl fmt::Display for TensorType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TensorType::F32 => write!(f, "F32"),
            TensorType::F16 => write!(f, "F16"),
            TensorType::Other(id) => write!(f, "type#{}", id),
        }
    }
}

/// Information about a tensor in the GGUF file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TensorInfo {
    /// Name/label of the tensor
    pub name: String,
    /// Size of each dimension, innermost first (GGUF order)
    pub dims: Vec<u64>,
    /// Data type of the tensor
    pub data_type: TensorType,
    /// Offset of the payload relative to the start of the data section
    pub offset: u64,
}

impl TensorInfo {
    /// Row-major shape, outermost dimension first.
    pub fn shape(&self) -> Vec<usize> {
        self.dims.iter().rev().map(|&d| d as usize).collect()
    }

    /// Total number of elements, `None` when the declared dims overflow.
    pub fn element_count(&self) -> Option<usize> {
        self.dims
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(usize::try_from(d).ok()?))
    }
}

impl fmt::Display for TensorInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} [{}] {}", self.name, self.shape().iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(" x "), self.data_type)
    }
}
