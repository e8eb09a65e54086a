use num_complex::Complex32;
use std::f32::consts::PI;

use crate::blocks::ofdm::OfdmError;

/// Constellation table with a nearest-point slicer.
///
/// Point `i` carries the bit pattern `values[i]`, which uses the lower
/// [`nbits`](Self::nbits) bits of the byte.
#[derive(Clone, Debug, PartialEq)]
pub struct Constellation {
    points: Vec<Complex32>,
    values: Vec<u8>,
    nbits: usize,
}

impl Constellation {
    /// Create constellation from parallel point and value tables.
    pub fn new(points: Vec<Complex32>, values: Vec<u8>) -> Result<Self, OfdmError> {
        if points.len() != values.len() {
            return Err(OfdmError::ConstellationMismatch {
                points: points.len(),
                values: values.len(),
            });
        }
        if points.is_empty() {
            return Err(OfdmError::EmptyConstellation);
        }
        if points.len() < 2 || points.len() > 256 {
            return Err(OfdmError::InvalidParameter(format!(
                "constellation with {} points",
                points.len()
            )));
        }

        let nbits = points.len().next_power_of_two().trailing_zeros() as usize;
        if let Some(&value) = values.iter().find(|&&v| (v as usize) >> nbits != 0) {
            return Err(OfdmError::ConstellationValue { value, nbits });
        }

        Ok(Constellation {
            points,
            values,
            nbits,
        })
    }

    /// Binary phase shift keying
    pub fn bpsk() -> Self {
        Self::from_gray(
            vec![Complex32::new(-1.0, 0.0), Complex32::new(1.0, 0.0)],
            1,
        )
    }

    /// Quadrature phase shift keying, Gray coded
    pub fn qpsk() -> Self {
        let points = (0..4)
            .map(|k| Complex32::from_polar(1.0, PI / 4.0 + k as f32 * PI / 2.0))
            .collect();
        Self::from_gray(points, 2)
    }

    /// 8-PSK, Gray coded
    pub fn psk8() -> Self {
        let points = (0..8)
            .map(|k| Complex32::from_polar(1.0, k as f32 * PI / 4.0))
            .collect();
        Self::from_gray(points, 3)
    }

    /// 16-QAM with unit average power, Gray coded per axis
    pub fn qam16() -> Self {
        let scale = 1.0 / 10.0f32.sqrt();
        let levels = [-3.0, -1.0, 1.0, 3.0];
        let mut points = Vec::with_capacity(16);
        let mut values = Vec::with_capacity(16);
        for (i, re) in levels.iter().enumerate() {
            for (q, im) in levels.iter().enumerate() {
                points.push(Complex32::new(re * scale, im * scale));
                values.push((gray(i as u8) << 2) | gray(q as u8));
            }
        }
        Constellation {
            points,
            values,
            nbits: 4,
        }
    }

    fn from_gray(points: Vec<Complex32>, nbits: usize) -> Self {
        let values = (0..points.len() as u8).map(gray).collect();
        Constellation {
            points,
            values,
            nbits,
        }
    }

    /// Bits per symbol
    pub fn nbits(&self) -> usize {
        self.nbits
    }

    /// Reference points
    pub fn points(&self) -> &[Complex32] {
        &self.points
    }

    /// Bit patterns
    pub fn values(&self) -> &[u8] {
        &self.values
    }

    /// Index of the nearest point. Ties go to the lower index.
    pub fn slice(&self, x: Complex32) -> usize {
        let mut min_index = 0;
        let mut min_dist = (x - self.points[0]).norm_sqr();
        for (i, p) in self.points.iter().enumerate().skip(1) {
            let d = (x - p).norm_sqr();
            if d < min_dist {
                min_dist = d;
                min_index = i;
            }
        }
        min_index
    }

    /// Point carrying the bit pattern `value`.
    pub fn point(&self, value: u8) -> Option<Complex32> {
        self.values
            .iter()
            .position(|&v| v == value)
            .map(|i| self.points[i])
    }

    /// Every bit pattern of [`nbits`](Self::nbits) bits has a point.
    pub fn is_complete(&self) -> bool {
        (0..1usize << self.nbits).all(|v| self.values.contains(&(v as u8)))
    }
}

fn gray(x: u8) -> u8 {
    x ^ (x >> 1)
}
