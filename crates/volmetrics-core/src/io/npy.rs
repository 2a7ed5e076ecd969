use std::path::Path;

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::error::{EvalError, Result};

pub const NPY_MAGIC: &[u8; 6] = b"\x93NUMPY";

/// Magic + version + u16 header length.
const PREAMBLE_V1: usize = 10;
/// Magic + version + u32 header length.
const PREAMBLE_V2: usize = 12;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl ElementType {
    /// Size of one element in bytes.
    pub fn size(self) -> usize {
        match self {
            Self::Bool | Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
        }
    }

    fn kind_char(self) -> char {
        match self {
            Self::Bool => 'b',
            Self::I8 | Self::I16 | Self::I32 | Self::I64 => 'i',
            Self::U8 | Self::U16 | Self::U32 | Self::U64 => 'u',
            Self::F32 | Self::F64 => 'f',
        }
    }
}

/// Element type plus byte order, as carried by the NPY `descr` field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dtype {
    pub element: ElementType,
    pub endianness: Endianness,
}

impl Dtype {
    pub fn new(element: ElementType, endianness: Endianness) -> Self {
        Self {
            element,
            endianness,
        }
    }

    /// Parse a NumPy type string such as `<f8`, `>i2` or `|u1`.
    pub fn parse(descr: &str) -> Result<Self> {
        let unsupported = || EvalError::UnsupportedDtype(descr.to_string());
        let mut chars = descr.chars();
        let order = chars.next().ok_or_else(unsupported)?;
        let kind = chars.next().ok_or_else(unsupported)?;
        let size: usize = chars.as_str().parse().map_err(|_| unsupported())?;

        let element = match (kind, size) {
            ('b', 1) => ElementType::Bool,
            ('i', 1) => ElementType::I8,
            ('i', 2) => ElementType::I16,
            ('i', 4) => ElementType::I32,
            ('i', 8) => ElementType::I64,
            ('u', 1) => ElementType::U8,
            ('u', 2) => ElementType::U16,
            ('u', 4) => ElementType::U32,
            ('u', 8) => ElementType::U64,
            ('f', 4) => ElementType::F32,
            ('f', 8) => ElementType::F64,
            _ => return Err(unsupported()),
        };

        let endianness = match order {
            '<' => Endianness::Little,
            '>' => Endianness::Big,
            // Single-byte types carry no order; '=' is host order.
            '|' if size == 1 => Endianness::Little,
            '=' if cfg!(target_endian = "big") => Endianness::Big,
            '=' => Endianness::Little,
            _ => return Err(unsupported()),
        };

        Ok(Self {
            element,
            endianness,
        })
    }

    /// The NumPy type string for this dtype.
    pub fn descr(&self) -> String {
        let size = self.element.size();
        let order = if size == 1 {
            '|'
        } else {
            match self.endianness {
                Endianness::Little => '<',
                Endianness::Big => '>',
            }
        };
        format!("{}{}{}", order, self.element.kind_char(), size)
    }

    pub fn size(&self) -> usize {
        self.element.size()
    }

    /// Decode one element from the front of `bytes` as f64.
    ///
    /// 64-bit integers beyond 2^53 lose precision.
    pub fn decode(&self, bytes: &[u8]) -> f64 {
        match self.endianness {
            Endianness::Little => decode_with::<LittleEndian>(self.element, bytes),
            Endianness::Big => decode_with::<BigEndian>(self.element, bytes),
        }
    }
}

fn decode_with<B: ByteOrder>(element: ElementType, bytes: &[u8]) -> f64 {
    match element {
        ElementType::Bool => f64::from(u8::from(bytes[0] != 0)),
        ElementType::I8 => f64::from(bytes[0] as i8),
        ElementType::U8 => f64::from(bytes[0]),
        ElementType::I16 => f64::from(B::read_i16(bytes)),
        ElementType::U16 => f64::from(B::read_u16(bytes)),
        ElementType::I32 => f64::from(B::read_i32(bytes)),
        ElementType::U32 => f64::from(B::read_u32(bytes)),
        ElementType::I64 => B::read_i64(bytes) as f64,
        ElementType::U64 => B::read_u64(bytes) as f64,
        ElementType::F32 => f64::from(B::read_f32(bytes)),
        ElementType::F64 => B::read_f64(bytes),
    }
}

/// Parsed NPY header.
#[derive(Clone, Debug, PartialEq)]
pub struct NpyHeader {
    pub version: (u8, u8),
    pub dtype: Dtype,
    pub fortran_order: bool,
    pub shape: Vec<usize>,
    /// Byte offset of the first element.
    pub data_offset: usize,
}

impl NpyHeader {
    /// Headers from [`parse_header`] are guaranteed not to overflow here.
    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }

    /// Size of the data section in bytes.
    pub fn data_len(&self) -> usize {
        self.element_count() * self.dtype.size()
    }

    /// Per-axis strides in elements for the stored memory order.
    pub fn strides(&self) -> Vec<usize> {
        let n = self.shape.len();
        let mut strides = vec![1usize; n];
        if self.fortran_order {
            for axis in 1..n {
                strides[axis] = strides[axis - 1] * self.shape[axis - 1];
            }
        } else {
            for axis in (0..n.saturating_sub(1)).rev() {
                strides[axis] = strides[axis + 1] * self.shape[axis + 1];
            }
        }
        strides
    }
}

/// Parse the magic, version and header dict at the start of `buf`.
pub fn parse_header(buf: &[u8], path: &Path) -> Result<NpyHeader> {
    let invalid = |reason: String| EvalError::InvalidNpy {
        path: path.to_path_buf(),
        reason,
    };

    if buf.len() < PREAMBLE_V1 {
        return Err(invalid("file too small for NPY preamble".into()));
    }
    if &buf[..6] != NPY_MAGIC {
        return Err(invalid("missing \\x93NUMPY magic".into()));
    }

    let version = (buf[6], buf[7]);
    let (preamble, header_len) = match version.0 {
        1 => (PREAMBLE_V1, LittleEndian::read_u16(&buf[8..10]) as usize),
        2 | 3 => {
            if buf.len() < PREAMBLE_V2 {
                return Err(invalid("file too small for NPY preamble".into()));
            }
            (PREAMBLE_V2, LittleEndian::read_u32(&buf[8..12]) as usize)
        }
        major => return Err(invalid(format!("unsupported format version {major}.{}", version.1))),
    };

    let data_offset = preamble + header_len;
    if buf.len() < data_offset {
        return Err(invalid(format!(
            "header claims {header_len} bytes but file has {}",
            buf.len() - preamble
        )));
    }

    let text = std::str::from_utf8(&buf[preamble..data_offset])
        .map_err(|_| invalid("header is not valid UTF-8".into()))?;

    let descr = dict_value(text, "descr")
        .and_then(parse_quoted)
        .ok_or_else(|| invalid("missing or non-string 'descr'".into()))?;
    let dtype = Dtype::parse(descr)?;

    let fortran_order = match dict_value(text, "fortran_order") {
        Some(v) if v.starts_with("True") => true,
        Some(v) if v.starts_with("False") => false,
        _ => return Err(invalid("missing 'fortran_order'".into())),
    };

    let shape = dict_value(text, "shape")
        .and_then(parse_shape)
        .ok_or_else(|| invalid("missing or malformed 'shape'".into()))?;

    // Every stride and the data end are bounded by this product, so
    // element_count, data_len and strides cannot overflow afterwards.
    let extent = shape
        .iter()
        .filter(|&&dim| dim != 0)
        .try_fold(dtype.size(), |acc, &dim| acc.checked_mul(dim))
        .and_then(|len| len.checked_add(data_offset));
    if extent.is_none() {
        return Err(invalid(format!("shape {shape:?} exceeds the addressable size")));
    }

    Ok(NpyHeader {
        version,
        dtype,
        fortran_order,
        shape,
        data_offset,
    })
}

/// Text following `'key':` in the header dict, left-trimmed.
fn dict_value<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    for quote in ['\'', '"'] {
        let needle = format!("{quote}{key}{quote}");
        if let Some(pos) = text.find(&needle) {
            let rest = text[pos + needle.len()..].trim_start();
            return rest.strip_prefix(':').map(str::trim_start);
        }
    }
    None
}

fn parse_quoted(value: &str) -> Option<&str> {
    let quote = value.chars().next().filter(|c| *c == '\'' || *c == '"')?;
    let inner = &value[1..];
    inner.find(quote).map(|end| &inner[..end])
}

fn parse_shape(value: &str) -> Option<Vec<usize>> {
    let inner = value.strip_prefix('(')?;
    let inner = &inner[..inner.find(')')?];
    inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.trim_end_matches('L').parse().ok())
        .collect()
}
