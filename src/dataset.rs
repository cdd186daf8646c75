//! Dense dataset, catalog and error-history types plus their JSON and binary forms.
//!
//! A dataset is a `dims × n` matrix whose column j is point j. Both the JSON and
//! binary representations store the payload column-major, so one point's
//! coordinates are contiguous.

use crate::error::{ClusterError, Result};
use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use ndarray::{Array1, Array2, ShapeBuilder};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Points as columns: shape `(dims, n)`.
pub type DataSet = Array2<f64>;

/// Cluster id of every point, `catalog[j]` in `[0, k)`.
pub type Catalog = Array1<u32>;

/// `(k, mse)` pairs in evaluation order.
///
/// Serializes to JSON as `[[k, mse], ...]`.
pub type MseHistory = Vec<(usize, f64)>;

/// JSON form of a matrix: `{ "rows": r, "cols": c, "data": [...] }` with
/// `data` stored column-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixJson<T> {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<T>,
}

impl<T> MatrixJson<T> {
    fn check_len(&self) -> Result<()> {
        if self.rows.checked_mul(self.cols) != Some(self.data.len()) {
            return Err(ClusterError::InvalidDimensions(format!(
                "incorrect data length for JSON matrix: {}x{} needs {} values, got {}",
                self.rows,
                self.cols,
                self.rows.saturating_mul(self.cols),
                self.data.len()
            )));
        }
        Ok(())
    }
}

/// Convert a dataset into its JSON matrix form.
pub fn dataset_to_json(data: &DataSet) -> MatrixJson<f64> {
    MatrixJson {
        rows: data.nrows(),
        cols: data.ncols(),
        data: data.t().iter().copied().collect(),
    }
}

/// Rebuild a dataset from its JSON matrix form.
pub fn dataset_from_json(json: MatrixJson<f64>) -> Result<DataSet> {
    json.check_len()?;
    Array2::from_shape_vec((json.rows, json.cols).f(), json.data)
        .map_err(|e| ClusterError::InvalidDimensions(e.to_string()))
}

/// Convert a catalog into an `n × 1` JSON matrix.
pub fn catalog_to_json(catalog: &Catalog) -> MatrixJson<u32> {
    MatrixJson {
        rows: catalog.len(),
        cols: 1,
        data: catalog.to_vec(),
    }
}

/// Rebuild a catalog from an `n × 1` JSON matrix.
pub fn catalog_from_json(json: MatrixJson<u32>) -> Result<Catalog> {
    json.check_len()?;
    if json.cols != 1 {
        return Err(ClusterError::InvalidDimensions(format!(
            "catalog must have exactly one column, got {}",
            json.cols
        )));
    }
    Ok(Array1::from_vec(json.data))
}

fn header_dim(value: usize, what: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| {
        ClusterError::InvalidDimensions(format!("{} {} does not fit a 32-bit header", what, value))
    })
}

/// Write a dataset in the binary layout: `u32 rows`, `u32 cols`, then
/// `rows * cols` column-major `f64`, all little-endian.
pub fn write_dataset<W: Write>(mut writer: W, data: &DataSet) -> Result<()> {
    writer.write_u32::<LittleEndian>(header_dim(data.nrows(), "rows")?)?;
    writer.write_u32::<LittleEndian>(header_dim(data.ncols(), "cols")?)?;
    for &value in data.t().iter() {
        writer.write_f64::<LittleEndian>(value)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a dataset written by [`write_dataset`].
pub fn read_dataset<R: Read>(mut reader: R) -> Result<DataSet> {
    let rows = reader.read_u32::<LittleEndian>()? as usize;
    let cols = reader.read_u32::<LittleEndian>()? as usize;
    let len = rows.checked_mul(cols).ok_or_else(|| {
        ClusterError::InvalidDimensions(format!("{}x{} overflows", rows, cols))
    })?;

    let bytes = read_payload(reader, len, 8)?;
    let payload = bytes.chunks_exact(8).map(LittleEndian::read_f64).collect();

    Array2::from_shape_vec((rows, cols).f(), payload)
        .map_err(|e| ClusterError::InvalidDimensions(e.to_string()))
}

/// Write a catalog in the binary layout: `u32 count`, then `count` `u32` labels.
pub fn write_catalog<W: Write>(mut writer: W, catalog: &Catalog) -> Result<()> {
    writer.write_u32::<LittleEndian>(header_dim(catalog.len(), "count")?)?;
    for &label in catalog.iter() {
        writer.write_u32::<LittleEndian>(label)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a catalog written by [`write_catalog`].
pub fn read_catalog<R: Read>(mut reader: R) -> Result<Catalog> {
    let count = reader.read_u32::<LittleEndian>()? as usize;
    let bytes = read_payload(reader, count, 4)?;
    Ok(bytes.chunks_exact(4).map(LittleEndian::read_u32).collect())
}

/// Read exactly `len` values of `width` bytes each.
///
/// The buffer grows with the bytes actually read, so a corrupt header cannot
/// force a huge allocation up front.
fn read_payload<R: Read>(reader: R, len: usize, width: usize) -> Result<Vec<u8>> {
    let byte_len = len.checked_mul(width).ok_or_else(|| {
        ClusterError::InvalidDimensions(format!("payload of {} values overflows", len))
    })?;

    let mut bytes = Vec::new();
    reader.take(byte_len as u64).read_to_end(&mut bytes)?;
    if bytes.len() < byte_len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("expected {} payload bytes, found {}", byte_len, bytes.len()),
        )
        .into());
    }
    Ok(bytes)
}

/// Dump a dataset to a binary file.
pub fn dump_dataset<P: AsRef<Path>>(data: &DataSet, path: P) -> Result<()> {
    write_dataset(BufWriter::new(File::create(path)?), data)
}

/// Load a dataset from a binary file.
pub fn load_dataset<P: AsRef<Path>>(path: P) -> Result<DataSet> {
    read_dataset(BufReader::new(File::open(path)?))
}

/// Dump a catalog to a binary file.
pub fn dump_catalog<P: AsRef<Path>>(catalog: &Catalog, path: P) -> Result<()> {
    write_catalog(BufWriter::new(File::create(path)?), catalog)
}

/// Load a catalog from a binary file.
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<Catalog> {
    read_catalog(BufReader::new(File::open(path)?))
}
