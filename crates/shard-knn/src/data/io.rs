//! Reading and writing flat binary files of little-endian `f64` values.
//!
//! The files have no header. Row counts are known from the configuration
//! (or inferred from the file length), and a file that is shorter or longer
//! than expected is an error.

use std::{
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::Path,
};

use crate::{KnnError, Partition, Result};

use super::Table;

/// Number of bytes in one stored value.
const VALUE_BYTES: usize = core::mem::size_of::<f64>();

/// Reads exactly `count` values starting `offset` values into the file.
///
/// # Errors
///
/// * If the file cannot be opened or read.
/// * If the file ends before `offset + count` values.
pub fn load_binary<P: AsRef<Path>>(path: P, count: usize, offset: usize) -> Result<Vec<f64>> {
    let path = path.as_ref();
    let mut file = File::open(path).map_err(|e| KnnError::io("open", path, e))?;

    let available = file_values(&file, path)?;
    if available < offset + count {
        return Err(KnnError::size(
            format!("{}", path.display()),
            offset + count,
            available,
        ));
    }

    file.seek(SeekFrom::Start((offset * VALUE_BYTES) as u64))
        .map_err(|e| KnnError::io("seek", path, e))?;

    let mut bytes = vec![0_u8; count * VALUE_BYTES];
    file.read_exact(&mut bytes).map_err(|e| KnnError::io("read", path, e))?;

    Ok(bytes
        .chunks_exact(VALUE_BYTES)
        .map(|b| {
            let mut le = [0_u8; VALUE_BYTES];
            le.copy_from_slice(b);
            f64::from_le_bytes(le)
        })
        .collect())
}

/// Writes `data` as the entire contents of the file, replacing anything there.
///
/// # Errors
///
/// If the file cannot be created or written.
pub fn store_binary<P: AsRef<Path>>(path: P, data: &[f64]) -> Result<()> {
    let path = path.as_ref();
    let mut file = File::create(path).map_err(|e| KnnError::io("create", path, e))?;
    file.write_all(&to_bytes(data))
        .map_err(|e| KnnError::io("write", path, e))?;
    file.flush().map_err(|e| KnnError::io("flush", path, e))
}

/// Writes `data` starting `offset` values into the file, creating the file if
/// needed and leaving other bytes untouched.
///
/// # Errors
///
/// If the file cannot be opened or written.
pub fn store_binary_at<P: AsRef<Path>>(path: P, data: &[f64], offset: usize) -> Result<()> {
    write_bytes_at(path, &to_bytes(data), (offset * VALUE_BYTES) as u64, None)
}

/// Writes raw bytes at a byte offset, creating the file if needed.
///
/// When `truncate_to` is given, the file length is then set to that many
/// bytes.
///
/// # Errors
///
/// If the file cannot be opened, written, or resized.
pub fn write_bytes_at<P: AsRef<Path>>(path: P, bytes: &[u8], offset: u64, truncate_to: Option<u64>) -> Result<()> {
    let path = path.as_ref();
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|e| KnnError::io("open", path, e))?;
    file.seek(SeekFrom::Start(offset))
        .map_err(|e| KnnError::io("seek", path, e))?;
    file.write_all(bytes).map_err(|e| KnnError::io("write", path, e))?;
    if let Some(len) = truncate_to {
        file.set_len(len).map_err(|e| KnnError::io("resize", path, e))?;
    }
    file.flush().map_err(|e| KnnError::io("flush", path, e))
}

/// Number of rows of `stride` values in the file.
///
/// # Errors
///
/// * If the file cannot be opened.
/// * If the file length is not a whole number of rows.
pub fn count_rows<P: AsRef<Path>>(path: P, stride: usize) -> Result<usize> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| KnnError::io("open", path, e))?;
    let values = file_values(&file, path)?;
    if stride == 0 || values % stride != 0 {
        return Err(KnnError::size(
            format!("rows of {stride} values in {}", path.display()),
            (values / stride.max(1) + 1) * stride,
            values,
        ));
    }
    Ok(values / stride)
}

/// Checks that the file holds exactly `rows` rows of `stride` values.
///
/// # Errors
///
/// * If the file cannot be opened.
/// * If the file holds more or fewer values.
pub fn check_rows<P: AsRef<Path>>(path: P, rows: usize, stride: usize) -> Result<()> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| KnnError::io("open", path, e))?;
    let values = file_values(&file, path)?;
    if values == rows * stride {
        Ok(())
    } else {
        Err(KnnError::size(format!("{}", path.display()), rows * stride, values))
    }
}

/// Reads the rows of `partition` from a file of `dim`-dimensional rows.
///
/// # Errors
///
/// See [`load_binary`].
pub fn load_rows<P: AsRef<Path>>(path: P, dim: usize, has_outputs: bool, partition: Partition) -> Result<Table> {
    let stride = dim + usize::from(has_outputs);
    let buffer = load_binary(path, partition.count * stride, partition.offset * stride)?;
    Table::new(buffer, dim, has_outputs)
}

/// Number of whole values in an open file.
fn file_values(file: &File, path: &Path) -> Result<usize> {
    let len = file.metadata().map_err(|e| KnnError::io("stat", path, e))?.len();
    let len = usize::try_from(len).map_err(|_| KnnError::size(format!("{}", path.display()), usize::MAX, usize::MAX))?;
    if len % VALUE_BYTES == 0 {
        Ok(len / VALUE_BYTES)
    } else {
        Err(KnnError::size(
            format!("bytes in {}", path.display()),
            (len / VALUE_BYTES + 1) * VALUE_BYTES,
            len,
        ))
    }
}

/// Little-endian bytes of every value.
fn to_bytes(data: &[f64]) -> Vec<u8> {
    data.iter().flat_map(|v| v.to_le_bytes()).collect()
}
