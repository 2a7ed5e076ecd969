use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, WriteBytesExt};
use ndarray::{ArrayBase, Data, Dimension};

use crate::error::{EvalError, Result};
use crate::io::npy::{Dtype, ElementType, Endianness, NPY_MAGIC};

/// Header (preamble included) is padded to a multiple of this many bytes.
const HEADER_ALIGNMENT: usize = 64;

/// Writes a version 1.0 NPY file, little-endian, element by element.
///
/// Values are supplied in the file's storage order (row-major unless
/// `fortran_order` was requested).
pub struct NpyWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    element: ElementType,
    expected: usize,
    written: usize,
}

impl NpyWriter {
    pub fn create(path: &Path, shape: &[usize], element: ElementType) -> Result<Self> {
        Self::create_with_order(path, shape, element, false)
    }

    pub fn create_with_order(
        path: &Path,
        shape: &[usize],
        element: ElementType,
        fortran_order: bool,
    ) -> Result<Self> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        let dtype = Dtype::new(element, Endianness::Little);
        writer.write_all(&format_header(&dtype, fortran_order, shape))?;
        Ok(Self {
            writer,
            path: path.to_path_buf(),
            element,
            expected: shape.iter().product(),
            written: 0,
        })
    }

    /// Append values, casting each to the file's element type.
    pub fn write_values(&mut self, values: impl IntoIterator<Item = f64>) -> Result<()> {
        for v in values {
            let w = &mut self.writer;
            match self.element {
                ElementType::Bool => w.write_u8(u8::from(v != 0.0))?,
                ElementType::I8 => w.write_i8(v as i8)?,
                ElementType::U8 => w.write_u8(v as u8)?,
                ElementType::I16 => w.write_i16::<LittleEndian>(v as i16)?,
                ElementType::U16 => w.write_u16::<LittleEndian>(v as u16)?,
                ElementType::I32 => w.write_i32::<LittleEndian>(v as i32)?,
                ElementType::U32 => w.write_u32::<LittleEndian>(v as u32)?,
                ElementType::I64 => w.write_i64::<LittleEndian>(v as i64)?,
                ElementType::U64 => w.write_u64::<LittleEndian>(v as u64)?,
                ElementType::F32 => w.write_f32::<LittleEndian>(v as f32)?,
                ElementType::F64 => w.write_f64::<LittleEndian>(v)?,
            }
            self.written += 1;
        }
        Ok(())
    }

    /// Flush and check that exactly `product(shape)` values were written.
    pub fn finalize(mut self) -> Result<()> {
        if self.written != self.expected {
            return Err(EvalError::InvalidNpy {
                path: self.path,
                reason: format!(
                    "wrote {} elements, shape requires {}",
                    self.written, self.expected
                ),
            });
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// Write an array of any rank to `path` with the given element type.
pub fn write_array<S, D>(
    path: &Path,
    array: &ArrayBase<S, D>,
    element: ElementType,
    fortran_order: bool,
) -> Result<()>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    let mut writer = NpyWriter::create_with_order(path, array.shape(), element, fortran_order)?;
    if fortran_order {
        // Reversed axes iterate the source in column-major order.
        writer.write_values(array.t().iter().copied())?;
    } else {
        writer.write_values(array.iter().copied())?;
    }
    writer.finalize()
}

/// Build the magic, version, length and padded dict.
pub fn format_header(dtype: &Dtype, fortran_order: bool, shape: &[usize]) -> Vec<u8> {
    let dims: Vec<String> = shape.iter().map(|d| d.to_string()).collect();
    let shape_str = if dims.len() == 1 {
        format!("({},)", dims[0])
    } else {
        format!("({})", dims.join(", "))
    };
    let dict = format!(
        "{{'descr': '{}', 'fortran_order': {}, 'shape': {}, }}",
        dtype.descr(),
        if fortran_order { "True" } else { "False" },
        shape_str
    );

    // 10-byte preamble + dict + trailing newline, rounded up.
    let unpadded = 10 + dict.len() + 1;
    let pad = (HEADER_ALIGNMENT - unpadded % HEADER_ALIGNMENT) % HEADER_ALIGNMENT;
    let header_len = dict.len() + pad + 1;

    let mut buf = Vec::with_capacity(10 + header_len);
    buf.extend_from_slice(NPY_MAGIC);
    buf.extend_from_slice(&[1, 0]);
    buf.extend_from_slice(&(header_len as u16).to_le_bytes());
    buf.extend_from_slice(dict.as_bytes());
    buf.extend(std::iter::repeat(b' ').take(pad));
    buf.push(b'\n');
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::npy::parse_header;

    #[test]
    fn header_is_aligned_and_parseable() {
        let dtype = Dtype::new(ElementType::F64, Endianness::Little);
        let buf = format_header(&dtype, false, &[64, 64, 3, 3]);
        assert_eq!(buf.len() % HEADER_ALIGNMENT, 0);
        assert_eq!(*buf.last().unwrap(), b'\n');

        let header = parse_header(&buf, Path::new("mem.npy")).unwrap();
        assert_eq!(header.shape, vec![64, 64, 3, 3]);
        assert_eq!(header.dtype, dtype);
        assert!(!header.fortran_order);
        assert_eq!(header.data_offset, buf.len());
    }

    #[test]
    fn one_dimensional_shape_keeps_trailing_comma() {
        let dtype = Dtype::new(ElementType::U8, Endianness::Little);
        let buf = format_header(&dtype, true, &[7]);
        let text = String::from_utf8_lossy(&buf);
        assert!(text.contains("'shape': (7,)"));
        assert!(text.contains("'fortran_order': True"));
        assert!(text.contains("'descr': '|u1'"));
    }
}
