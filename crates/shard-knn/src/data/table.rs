//! Rows of points stored in one contiguous buffer.

use crate::{KnnError, Partition, Result};

/// Rows of `dim` features, each optionally followed by one output value,
/// stored row-major in a single buffer.
///
/// Rows are addressed by index; row `i` starts at `i * stride`.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    /// The flat row-major values.
    buffer: Vec<f64>,
    /// Number of features per row.
    dim: usize,
    /// Whether each row ends with an output value.
    has_outputs: bool,
}

impl Table {
    /// Wraps a flat buffer of rows.
    ///
    /// # Errors
    ///
    /// * If `dim` is zero.
    /// * If the buffer length is not a multiple of the row width.
    pub fn new(buffer: Vec<f64>, dim: usize, has_outputs: bool) -> Result<Self> {
        if dim == 0 {
            return Err(KnnError::Config("dim must be positive".to_string()));
        }
        let stride = dim + usize::from(has_outputs);
        if buffer.len() % stride != 0 {
            let rows = buffer.len() / stride;
            return Err(KnnError::size("row buffer", (rows + 1) * stride, buffer.len()));
        }
        Ok(Self {
            buffer,
            dim,
            has_outputs,
        })
    }

    /// Builds a table from separate points and, optionally, their outputs.
    ///
    /// # Errors
    ///
    /// * If there are no points.
    /// * If the points differ in dimensionality.
    /// * If the number of outputs differs from the number of points.
    pub fn from_rows(points: &[Vec<f64>], outputs: Option<&[f64]>) -> Result<Self> {
        let dim = points.first().map_or(0, Vec::len);
        if dim == 0 {
            return Err(KnnError::Config("points must be non-empty".to_string()));
        }
        if let Some(outputs) = outputs {
            if outputs.len() != points.len() {
                return Err(KnnError::size("outputs", points.len(), outputs.len()));
            }
        }

        let stride = dim + usize::from(outputs.is_some());
        let mut buffer = Vec::with_capacity(points.len() * stride);
        for (i, p) in points.iter().enumerate() {
            if p.len() != dim {
                return Err(KnnError::size(format!("point {i}"), dim, p.len()));
            }
            buffer.extend_from_slice(p);
            if let Some(outputs) = outputs {
                buffer.push(outputs[i]);
            }
        }
        Self::new(buffer, dim, outputs.is_some())
    }

    /// Number of features per row.
    #[must_use]
    pub const fn dim(&self) -> usize {
        self.dim
    }

    /// Whether rows carry an output value.
    #[must_use]
    pub const fn has_outputs(&self) -> bool {
        self.has_outputs
    }

    /// Number of `f64` values per row.
    #[must_use]
    pub const fn stride(&self) -> usize {
        self.dim + if self.has_outputs { 1 } else { 0 }
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len() / self.stride()
    }

    /// Whether there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// The features of row `i`.
    ///
    /// # Panics
    ///
    /// If `i` is out of range.
    #[must_use]
    pub fn point(&self, i: usize) -> &[f64] {
        let start = i * self.stride();
        &self.buffer[start..start + self.dim]
    }

    /// The output value of row `i`, or zero when rows carry no outputs.
    ///
    /// # Panics
    ///
    /// If `i` is out of range.
    #[must_use]
    pub fn output(&self, i: usize) -> f64 {
        if self.has_outputs {
            self.buffer[i * self.stride() + self.dim]
        } else {
            0.0
        }
    }

    /// The features of every row, in order.
    pub fn points(&self) -> impl ExactSizeIterator<Item = &[f64]> + '_ {
        self.buffer.chunks_exact(self.stride()).map(|row| &row[..self.dim])
    }

    /// The output value of every row, in order.
    #[must_use]
    pub fn outputs(&self) -> Vec<f64> {
        (0..self.len()).map(|i| self.output(i)).collect()
    }

    /// The raw row-major buffer.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.buffer
    }

    /// A copy of the rows in `partition`.
    ///
    /// # Errors
    ///
    /// If `partition` runs past the last row.
    pub fn slice(&self, partition: Partition) -> Result<Self> {
        if partition.end() > self.len() {
            return Err(KnnError::size("table slice", partition.end(), self.len()));
        }
        let stride = self.stride();
        let buffer = self.buffer[partition.offset * stride..partition.end() * stride].to_vec();
        Ok(Self {
            buffer,
            dim: self.dim,
            has_outputs: self.has_outputs,
        })
    }
}
