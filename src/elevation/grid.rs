use crate::{MapError, Result};
use serde::{Deserialize, Serialize};

/// Row-major grid of `i16` height samples with cached extremes.
///
/// Row 0 is the northern edge, column 0 the western edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeightGrid {
    width: usize,
    height: usize,
    data: Vec<i16>,
    min: i16,
    max: i16,
}

impl HeightGrid {
    pub fn new(width: usize, height: usize, data: Vec<i16>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(MapError::Decode("height grid must not be empty".to_string()));
        }
        if data.len() != width * height {
            return Err(MapError::Decode(format!(
                "expected {} height samples for {}x{}, got {}",
                width * height,
                width,
                height,
                data.len()
            )));
        }
        let (min, max) = extremes(&data);
        Ok(Self {
            width,
            height,
            data,
            min,
            max,
        })
    }

    pub fn filled(width: usize, height: usize, value: i16) -> Result<Self> {
        Self::new(width, height, vec![value; width * height])
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[i16] {
        &self.data
    }

    pub fn min(&self) -> i16 {
        self.min
    }

    pub fn max(&self) -> i16 {
        self.max
    }

    pub fn get(&self, x: usize, y: usize) -> Option<i16> {
        if x < self.width && y < self.height {
            Some(self.data[y * self.width + x])
        } else {
            None
        }
    }

    pub fn set(&mut self, x: usize, y: usize, value: i16) {
        if x < self.width && y < self.height {
            self.data[y * self.width + x] = value;
            let (min, max) = extremes(&self.data);
            self.min = min;
            self.max = max;
        }
    }

    /// Bilinear sample at a normalized position, clamped to `[0, 1]` on both axes.
    ///
    /// `(0, 0)` is the first sample and `(1, 1)` the last, so the edges return the
    /// boundary samples exactly.
    pub fn sample(&self, nx: f64, ny: f64) -> f32 {
        let rx = nx.clamp(0.0, 1.0) * (self.width - 1) as f64;
        let ry = ny.clamp(0.0, 1.0) * (self.height - 1) as f64;

        let x0 = (rx.floor() as usize).min(self.width - 1);
        let y0 = (ry.floor() as usize).min(self.height - 1);
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let fx = (rx - x0 as f64) as f32;
        let fy = (ry - y0 as f64) as f32;

        let at = |x: usize, y: usize| self.data[y * self.width + x] as f32;
        let top = at(x0, y0) + (at(x1, y0) - at(x0, y0)) * fx;
        let bottom = at(x0, y1) + (at(x1, y1) - at(x0, y1)) * fx;
        top + (bottom - top) * fy
    }

    /// Serializes the grid for a cache store
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let grid: HeightGrid = bincode::deserialize(bytes)?;
        Self::new(grid.width, grid.height, grid.data)
    }
}

fn extremes(data: &[i16]) -> (i16, i16) {
    data.iter().fold((i16::MAX, i16::MIN), |(lo, hi), &v| {
        (lo.min(v), hi.max(v))
    })
}
