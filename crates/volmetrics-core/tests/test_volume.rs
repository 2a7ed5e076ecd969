mod common;

use std::io::Write;

use ndarray::{s, Array4};
use tempfile::NamedTempFile;

use volmetrics_core::error::{ErrorKind, EvalError};
use volmetrics_core::io::npy::{Dtype, ElementType, Endianness};
use volmetrics_core::io::npy_writer::format_header;
use volmetrics_core::io::{SliceAxes, Volume};

use common::{write_volume, write_volume_as};

fn counting_volume(shape: (usize, usize, usize, usize)) -> Array4<f64> {
    let (_, b, c, d) = shape;
    Array4::from_shape_fn(shape, |(p, q, r, t)| (((p * b + q) * c + r) * d + t) as f64)
}

fn write_raw(bytes: &[u8]) -> NamedTempFile {
    let mut f = NamedTempFile::new().unwrap();
    f.write_all(bytes).unwrap();
    f.flush().unwrap();
    f
}

#[test]
fn test_open_reports_shape_and_dtype() {
    let vol = counting_volume((4, 5, 2, 3));
    let file = write_volume(&vol);

    let volume = Volume::open(file.path()).unwrap();
    assert_eq!(volume.shape(), &[4, 5, 2, 3]);
    assert_eq!(volume.len(), 120);
    assert_eq!(volume.dtype(), Dtype::new(ElementType::F64, Endianness::Little));
    assert!(!volume.header().fortran_order);
    assert_eq!(volume.grid_dims(SliceAxes::default()), (2, 3));
    assert_eq!(volume.slice_dims(SliceAxes::default()), (4, 5));
}

#[test]
fn test_slice_matches_source_array() {
    let vol = counting_volume((4, 5, 2, 3));
    let file = write_volume(&vol);
    let volume = Volume::open(file.path()).unwrap();

    for i in 0..2 {
        for j in 0..3 {
            let slice = volume.slice(SliceAxes::default(), i, j).unwrap();
            assert_eq!(slice, vol.slice(s![.., .., i, j]));
        }
    }
}

#[test]
fn test_alternate_axes() {
    let vol = counting_volume((3, 4, 5, 6));
    let file = write_volume(&vol);
    let volume = Volume::open(file.path()).unwrap();

    // Slice plane (2, 3), iterating (0, 1).
    let axes = SliceAxes { rows: 2, cols: 3 };
    assert_eq!(volume.grid_dims(axes), (3, 4));
    let slice = volume.slice(axes, 1, 2).unwrap();
    assert_eq!(slice, vol.slice(s![1, 2, .., ..]));

    // Transposed plane: rows from axis 3, cols from axis 0, iterating (1, 2).
    let axes = SliceAxes { rows: 3, cols: 0 };
    let slice = volume.slice(axes, 3, 4).unwrap();
    assert_eq!(slice, vol.slice(s![.., 3, 4, ..]).t());
}

#[test]
fn test_fortran_order_reads_same_values() {
    let vol = counting_volume((4, 3, 2, 5));
    let c_file = write_volume(&vol);
    let f_file = write_volume_as(&vol, ElementType::F64, true);

    let c_vol = Volume::open(c_file.path()).unwrap();
    let f_vol = Volume::open(f_file.path()).unwrap();
    assert!(f_vol.header().fortran_order);

    for (i, j) in [(0, 0), (1, 4), (0, 3)] {
        assert_eq!(
            c_vol.slice(SliceAxes::default(), i, j).unwrap(),
            f_vol.slice(SliceAxes::default(), i, j).unwrap()
        );
    }
}

#[test]
fn test_integer_and_f32_dtypes_decode() {
    let vol = counting_volume((2, 2, 2, 2));
    for element in [
        ElementType::U8,
        ElementType::I16,
        ElementType::U16,
        ElementType::I32,
        ElementType::F32,
        ElementType::I64,
    ] {
        let file = write_volume_as(&vol, element, false);
        let volume = Volume::open(file.path()).unwrap();
        assert_eq!(volume.dtype().element, element);
        let slice = volume.slice(SliceAxes::default(), 1, 1).unwrap();
        assert_eq!(slice, vol.slice(s![.., .., 1, 1]), "dtype {:?}", element);
    }
}

#[test]
fn test_big_endian_volume() {
    let dtype = Dtype::new(ElementType::I16, Endianness::Big);
    let mut bytes = format_header(&dtype, false, &[1, 2, 1, 1]);
    bytes.extend_from_slice(&(-3i16).to_be_bytes());
    bytes.extend_from_slice(&(300i16).to_be_bytes());
    let file = write_raw(&bytes);

    let volume = Volume::open(file.path()).unwrap();
    let slice = volume.slice(SliceAxes::default(), 0, 0).unwrap();
    assert_eq!(slice.as_slice().unwrap(), &[-3.0, 300.0]);
}

#[test]
fn test_global_max_skips_nan() {
    let mut vol = counting_volume((3, 3, 2, 2));
    vol[[0, 0, 0, 0]] = f64::NAN;
    vol[[2, 1, 1, 0]] = 1000.0;
    let file = write_volume(&vol);
    let volume = Volume::open(file.path()).unwrap();
    assert_eq!(volume.global_max().unwrap(), 1000.0);
}

#[test]
fn test_global_max_all_nan_is_empty() {
    let vol = Array4::<f64>::from_elem((2, 2, 1, 1), f64::NAN);
    let file = write_volume(&vol);
    let volume = Volume::open(file.path()).unwrap();
    let err = volume.global_max().unwrap_err();
    assert!(matches!(err, EvalError::EmptyVolume(_)));
    assert_eq!(err.kind(), ErrorKind::Storage);
}

#[test]
fn test_slice_out_of_range() {
    let file = write_volume(&counting_volume((2, 2, 2, 3)));
    let volume = Volume::open(file.path()).unwrap();
    let err = volume.slice(SliceAxes::default(), 2, 0).unwrap_err();
    assert!(matches!(
        err,
        EvalError::SliceIndexOutOfRange { i: 2, j: 0, outer: 2, inner: 3 }
    ));
}

#[test]
fn test_missing_file_is_storage_error() {
    let err = Volume::open(std::path::Path::new("/nonexistent/volume.npy"))
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::Storage);
    assert!(matches!(err, EvalError::Open { .. }));
    assert!(err.to_string().contains("/nonexistent/volume.npy"));
}

#[test]
fn test_bad_magic_rejected() {
    let file = write_raw(b"NOTNUMPY\x01\x00\x00\x00");
    let err = Volume::open(file.path()).err().unwrap();
    assert!(matches!(err, EvalError::InvalidNpy { .. }));
}

#[test]
fn test_truncated_data_rejected() {
    let dtype = Dtype::new(ElementType::F64, Endianness::Little);
    let mut bytes = format_header(&dtype, false, &[2, 2, 2, 2]);
    bytes.extend_from_slice(&[0u8; 8 * 15]);
    let file = write_raw(&bytes);

    let err = Volume::open(file.path()).err().unwrap();
    match err {
        EvalError::InvalidNpy { reason, .. } => assert!(reason.contains("truncated")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_overflowing_shape_rejected() {
    let header =
        b"{'descr': '<f8', 'fortran_order': False, 'shape': (4294967296, 4294967296, 2, 1), }\n";
    let mut bytes = b"\x93NUMPY\x01\x00".to_vec();
    bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
    bytes.extend_from_slice(header);
    bytes.extend_from_slice(&[0u8; 64]);
    let file = write_raw(&bytes);

    let err = Volume::open(file.path()).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Storage);
    assert!(matches!(err, EvalError::InvalidNpy { .. }));
}

#[test]
fn test_wrong_rank_rejected() {
    let dtype = Dtype::new(ElementType::F64, Endianness::Little);
    let mut bytes = format_header(&dtype, false, &[4, 4, 4]);
    bytes.extend_from_slice(&[0u8; 8 * 64]);
    let file = write_raw(&bytes);

    let err = Volume::open(file.path()).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Storage);
}

#[test]
fn test_unsupported_dtype_rejected() {
    let header = b"{'descr': '<c16', 'fortran_order': False, 'shape': (1, 1, 1, 1), }\n";
    let mut bytes = b"\x93NUMPY\x01\x00".to_vec();
    bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
    bytes.extend_from_slice(header);
    bytes.extend_from_slice(&[0u8; 16]);
    let file = write_raw(&bytes);

    let err = Volume::open(file.path()).err().unwrap();
    assert!(matches!(err, EvalError::UnsupportedDtype(ref d) if d == "<c16"));
}

#[test]
fn test_version_two_header() {
    let header = b"{'descr': '<f8', 'fortran_order': False, 'shape': (1, 1, 1, 2), }\n";
    let mut bytes = b"\x93NUMPY\x02\x00".to_vec();
    bytes.extend_from_slice(&(header.len() as u32).to_le_bytes());
    bytes.extend_from_slice(header);
    bytes.extend_from_slice(&1.5f64.to_le_bytes());
    bytes.extend_from_slice(&2.5f64.to_le_bytes());
    let file = write_raw(&bytes);

    let volume = Volume::open(file.path()).unwrap();
    assert_eq!(volume.header().version, (2, 0));
    assert_eq!(volume.slice(SliceAxes::default(), 0, 1).unwrap()[[0, 0]], 2.5);
}

#[test]
fn test_shape_mismatch_between_volumes() {
    let a = write_volume(&counting_volume((2, 2, 2, 2)));
    let b = write_volume(&counting_volume((2, 2, 2, 3)));
    let va = Volume::open(a.path()).unwrap();
    let vb = Volume::open(b.path()).unwrap();

    let err = va.ensure_same_shape(&vb).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);
    let msg = err.to_string();
    assert!(msg.contains("[2, 2, 2, 2]") && msg.contains("[2, 2, 2, 3]"));
}
