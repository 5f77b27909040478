//! Interpolation Functions

use crate::pbrt::*;
use smallvec::{smallvec, SmallVec};

/// Number of coefficients an `InterpolatedSeries` keeps inline before it
/// spills to the heap. Covers 3 channels of order 85.
const INLINE_COEFFICIENTS: usize = 256;

/// Returns the index of the lower node of the interval containing `x` and the
/// linear blend factor towards the upper node.
///
/// Values outside `[nodes[0], nodes[n - 1]]` are clamped to the nearest end of
/// the table, so `x <= nodes[0]` returns `(0, 0.0)` and `x >= nodes[n - 1]`
/// returns `(n - 2, 1.0)`. A value exactly on a node `k` returns weight `0`
/// for the interval starting at `k`.
///
/// * `nodes` - Strictly increasing interpolation nodes (at least 2).
/// * `x`     - Value to locate.
pub fn locate(nodes: &[Float], x: Float) -> (usize, Float) {
    let size = nodes.len();
    debug_assert!(size >= 2);

    if !(x > nodes[0]) {
        // Also catches NaN.
        return (0, 0.0);
    }
    if x >= nodes[size - 1] {
        return (size - 2, 1.0);
    }

    let idx = find_interval(size, |i| nodes[i] <= x);
    let x0 = nodes[idx];
    let x1 = nodes[idx + 1];
    (idx, clamp((x - x0) / (x1 - x0), 0.0, 1.0))
}

/// Interpolation weights for one angle: the lower node index and the weights
/// of the lower and upper nodes.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AngleWeights {
    /// Index of the lower node.
    pub offset: usize,

    /// Weights of nodes `offset` and `offset + 1`.
    pub weights: [Float; 2],
}

impl AngleWeights {
    /// Locates `x` on `nodes` and returns the two node weights.
    ///
    /// * `nodes` - Strictly increasing interpolation nodes.
    /// * `x`     - Value to locate.
    pub fn new(nodes: &[Float], x: Float) -> Self {
        let (offset, t) = locate(nodes, x);
        Self {
            offset,
            weights: [1.0 - t, t],
        }
    }
}

/// Fourier coefficient series blended from the four grid cells surrounding a
/// pair of elevation cosines.
///
/// Coefficients of channel `c` start at `c * stride`. Only the first `order`
/// coefficients of each channel are meaningful; shorter cell series are zero
/// padded.
#[derive(Clone, Debug)]
pub struct InterpolatedSeries {
    /// Channel-major coefficients.
    coefficients: SmallVec<[Float; INLINE_COEFFICIENTS]>,

    /// Capacity of one channel (maximum order of the table).
    stride: usize,

    /// Number of channels.
    n_channels: usize,

    /// Effective order: maximum order of the contributing cells.
    order: usize,

    /// Normalized weights that were applied, indexed `2 * outgoing + incoming`.
    /// Skipped cells have weight 0.
    weights: [Float; 4],
}

impl InterpolatedSeries {
    /// Returns an all-zero series with room for `m_max` coefficients in each
    /// of `n_channels` channels.
    ///
    /// * `m_max`      - Maximum order.
    /// * `n_channels` - Number of channels.
    pub fn zero(m_max: usize, n_channels: usize) -> Self {
        Self {
            coefficients: smallvec![0.0; m_max * n_channels],
            stride: m_max,
            n_channels,
            order: 0,
            weights: [0.0; 4],
        }
    }

    /// Blends the coefficient series of the 2x2 cells around the incoming and
    /// outgoing angle weights.
    ///
    /// Cells whose bilinear weight is below `threshold` are skipped; the
    /// remaining weights are renormalized to sum to 1 so that a value on a
    /// grid node reproduces the tabulated series exactly.
    ///
    /// * `wi`         - Weights for the incoming elevation cosine.
    /// * `wo`         - Weights for the outgoing elevation cosine.
    /// * `m_max`      - Maximum order of any cell.
    /// * `n_channels` - Number of channels.
    /// * `threshold`  - Minimum bilinear weight for a cell to contribute.
    /// * `cell`       - Returns the order `m` and the `m * n_channels`
    ///                  coefficients of cell `(i, o)`.
    pub fn interpolate<'a, F>(
        wi: &AngleWeights,
        wo: &AngleWeights,
        m_max: usize,
        n_channels: usize,
        threshold: Float,
        cell: F,
    ) -> Self
    where
        F: Fn(usize, usize) -> (usize, &'a [Float]),
    {
        let mut series = Self::zero(m_max, n_channels);

        let mut total = 0.0;
        for (b, wtob) in wo.weights.iter().enumerate() {
            for (a, wtia) in wi.weights.iter().enumerate() {
                let weight = wtia * wtob;
                if weight >= threshold && weight > 0.0 {
                    series.weights[2 * b + a] = weight;
                    total += weight;
                }
            }
        }
        if total <= 0.0 {
            return series;
        }

        for (idx, weight) in series.weights.iter_mut().enumerate() {
            if *weight == 0.0 {
                continue;
            }
            *weight /= total;

            // Add contribution of `(a, b)` to the blended coefficients.
            let (a, b) = (idx % 2, idx / 2);
            let (m, ap) = cell(wi.offset + a, wo.offset + b);
            series.order = max(series.order, m);
            for c in 0..n_channels {
                let dst = &mut series.coefficients[c * m_max..c * m_max + m];
                for (d, s) in dst.iter_mut().zip(&ap[c * m..(c + 1) * m]) {
                    *d += *weight * s;
                }
            }
        }

        series
    }

    /// Returns the effective order.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Returns the number of channels.
    pub fn n_channels(&self) -> usize {
        self.n_channels
    }

    /// Returns true if no cell contributed coefficients.
    pub fn is_empty(&self) -> bool {
        self.order == 0
    }

    /// Returns the weights that were applied to the four cells, indexed
    /// `2 * outgoing + incoming`.
    pub fn weights(&self) -> [Float; 4] {
        self.weights
    }

    /// Returns the first `order` coefficients of a channel.
    ///
    /// * `c` - Channel index.
    pub fn channel(&self, c: usize) -> &[Float] {
        debug_assert!(c < self.n_channels);
        let start = c * self.stride;
        &self.coefficients[start..start + self.order]
    }

    /// Returns the luminance coefficients (channel 0).
    pub fn luminance(&self) -> &[Float] {
        self.channel(0)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
