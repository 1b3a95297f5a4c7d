//! Tile addressing.

use std::fmt;

use thiserror::Error;

/// Highest zoom level accepted.
pub const MAX_ZOOM: u8 = 24;

/// Errors for tile addresses that cannot exist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordError {
    #[error("Invalid zoom level {0} (expected 0..={max})", max = MAX_ZOOM)]
    InvalidZoom(i64),

    #[error("Column {column} out of range for zoom {zoom}")]
    ColumnOutOfRange { column: i64, zoom: u8 },

    #[error("Row {row} out of range for zoom {zoom}")]
    RowOutOfRange { row: i64, zoom: u8 },
}

/// A validated `(zoom, column, row)` tile address.
///
/// Column and row are always below `2^zoom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoordinate {
    zoom: u8,
    column: u32,
    row: u32,
}

impl TileCoordinate {
    /// Validate and build a coordinate.
    pub fn new(zoom: u32, column: u32, row: u32) -> Result<Self, CoordError> {
        Self::from_signed(zoom as i64, column as i64, row as i64)
    }

    /// Validate and build a coordinate from untyped input such as path
    /// parameters, rejecting negative values.
    pub fn from_signed(zoom: i64, column: i64, row: i64) -> Result<Self, CoordError> {
        if !(0..=MAX_ZOOM as i64).contains(&zoom) {
            return Err(CoordError::InvalidZoom(zoom));
        }
        let zoom = zoom as u8;
        let side = tiles_per_side(zoom) as i64;

        if !(0..side).contains(&column) {
            return Err(CoordError::ColumnOutOfRange { column, zoom });
        }
        if !(0..side).contains(&row) {
            return Err(CoordError::RowOutOfRange { row, zoom });
        }

        Ok(Self {
            zoom,
            column: column as u32,
            row: row as u32,
        })
    }

    /// Zoom level.
    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    /// Column (x).
    pub fn column(&self) -> u32 {
        self.column
    }

    /// Row (y), counted from the top (XYZ scheme).
    pub fn row(&self) -> u32 {
        self.row
    }

    /// Row counted from the bottom (TMS scheme, as used by MBTiles).
    pub fn tms_row(&self) -> u32 {
        (tiles_per_side(self.zoom) - 1 - self.row as u64) as u32
    }
}

impl fmt::Display for TileCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.column, self.row)
    }
}

/// Number of tiles along one axis at `zoom`.
#[inline]
pub fn tiles_per_side(zoom: u8) -> u64 {
    1u64 << zoom
}
