use crate::error::FormatError;
use crate::DotGrid;

/// Immutable monochrome raster, row-major, `true` = inked dot.
///
/// Both dimensions are always positive and every row holds exactly
/// `width` bits; the validating constructors are the only way to build
/// one, so downstream code never re-checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl Bitmap {
    /// Build a bitmap from row-major bits.
    ///
    /// Fails when a dimension is zero or `bits.len() != width * height`.
    pub fn from_bits(width: u32, height: u32, bits: Vec<bool>) -> Result<Self, FormatError> {
        if width == 0 || height == 0 {
            return Err(FormatError::ZeroDimension { width, height });
        }
        let expected = width as usize * height as usize;
        if bits.len() != expected {
            return Err(FormatError::BitCount {
                expected,
                found: bits.len(),
            });
        }
        Ok(Bitmap {
            width,
            height,
            bits,
        })
    }

    /// Build a bitmap from a grid of rows, e.g. thresholded image data.
    ///
    /// Fails when the grid is empty or any row differs in length from the
    /// first.
    pub fn from_rows(rows: DotGrid) -> Result<Self, FormatError> {
        let height = rows.len() as u32;
        let width = rows.first().map_or(0, |r| r.len()) as u32;
        if width == 0 || height == 0 {
            return Err(FormatError::ZeroDimension { width, height });
        }
        let mut bits = Vec::with_capacity(width as usize * height as usize);
        for (row, dots) in rows.iter().enumerate() {
            if dots.len() != width as usize {
                return Err(FormatError::RaggedRow {
                    row,
                    expected: width as usize,
                    found: dots.len(),
                });
            }
            bits.extend_from_slice(dots);
        }
        Ok(Bitmap {
            width,
            height,
            bits,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Dot at column `x`, row `y`. Panics when out of range.
    pub fn get(&self, x: u32, y: u32) -> bool {
        assert!(x < self.width && y < self.height, "dot index out of range");
        self.bits[y as usize * self.width as usize + x as usize]
    }

    /// One row of dots, top row is 0.
    pub fn row(&self, y: u32) -> &[bool] {
        assert!(y < self.height, "row index out of range");
        let start = y as usize * self.width as usize;
        &self.bits[start..start + self.width as usize]
    }

    /// Rows top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[bool]> {
        self.bits.chunks_exact(self.width as usize)
    }

    /// Number of inked dots in the whole image.
    pub fn dot_count(&self) -> usize {
        self.bits.iter().filter(|b| **b).count()
    }
}
