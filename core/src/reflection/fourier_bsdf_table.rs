//! Fourier BSDF Table

use super::bsdf_reader::*;
use crate::error::{LoadError, ScatterError};
use crate::fourier::FourierConfig;
use crate::interpolation::*;
use crate::pbrt::*;
use std::fs;
use std::io::{self, Cursor, Write};
use std::path::Path;

/// Allowed deviation of a CDF row's first entry from 0 and last entry from 1.
const CDF_TOLERANCE: Float = 1e-3;

/// Unvalidated table contents as stored in a resource.
///
/// Cells are addressed `(i, o)` with `i` the incoming and `o` the outgoing
/// elevation index and stored at `o * mu.len() + i`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawFourierTable {
    /// Relative index of refraction.
    pub eta: Float,

    /// Upper bound on the order of any cell.
    pub m_max: usize,

    /// Number of channels (1 or 3).
    pub n_channels: usize,

    /// Elevation cosines.
    pub mu: Vec<Float>,

    /// Order of each cell.
    pub orders: Vec<i32>,

    /// Offset of each cell's coefficients.
    pub offsets: Vec<i32>,

    /// Flat coefficient buffer.
    pub coefficients: Vec<Float>,

    /// One CDF row over incoming elevation per outgoing elevation.
    pub cdf: Vec<Float>,
}

/// Stores the measured Fourier BSDF data.
///
/// The table is validated on construction and immutable afterwards, so it can
/// be shared between threads behind an `Arc` without locking.
#[derive(Clone, Debug)]
pub struct FourierBSDFTable {
    /// Relative index of refraction over the surface boundary between two media.
    eta: Float,

    /// Maximum order `m` for any pair of μi, μo directions used to allocate
    /// ak coefficients.
    m_max: usize,

    /// Number of spectral channels available:
    /// 1: Monochromatic BSDF
    /// 3: BSDF with RGB colors (stored as luminance, red, blue values)
    n_channels: usize,

    /// Elevation cosines stored in sorted order from low to high.
    mu: Vec<Float>,

    /// The order, m, of the Fourier representation bounded by `m_max` for each
    /// pair of incoming and outgoing elevation cosines.
    m: Vec<usize>,

    /// Stores offsets into `a`. The `m * n_channels` coefficients starting at
    /// `a[offset]` give ak values for the corresponding pair of directions.
    ///
    /// For the 3 color channel case, the first `m` coefficients after
    /// `a[offset]` encode coefficients for luminance, the next `m` correspond
    /// to the red channel, and then blue follows.
    a_offset: Vec<usize>,

    /// The coefficients for all pairs of discretized direction `mu`.
    a: Vec<Float>,

    /// First luminance coefficient a0 of each cell.
    a0: Vec<Float>,

    /// CDF values.
    cdf: Vec<Float>,

    /// Contains 1 / i for i in [0..`m_max`], with 0 for i = 0.
    recip: Vec<Float>,
}

impl FourierBSDFTable {
    /// Loads a `FourierBSDFTable` from a binary file.
    ///
    /// * `path` - The path to the BSDF binary file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let table = Self::from_bytes(&bytes)?;
        info!(
            "Loaded Fourier BSDF '{}': {} elevations, max order {}, {} channel(s), eta {}",
            path.display(),
            table.mu.len(),
            table.m_max,
            table.n_channels,
            table.eta
        );
        Ok(table)
    }

    /// Decodes and validates a `FourierBSDFTable` from an in-memory resource.
    ///
    /// * `bytes` - The resource bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LoadError> {
        let actual = bytes.len();
        let mut reader = Cursor::new(bytes);
        reader.check_header()?;
        if actual < FOURIER_BSDF_HEADER_SIZE {
            return Err(LoadError::Truncated {
                expected: FOURIER_BSDF_HEADER_SIZE,
                actual,
            });
        }

        let version = reader.read_u32_le()?;
        let eta = reader.read_f32_le()?;
        let m_max = reader.read_u32_le()? as usize;
        let n_channels = reader.read_u32_le()? as usize;
        let n_mu = reader.read_u32_le()? as usize;
        let n_coeffs = reader.read_u32_le()? as usize;

        if version != FOURIER_BSDF_VERSION {
            return Err(LoadError::BadHeader(format!(
                "unsupported version {version}, expected {FOURIER_BSDF_VERSION}"
            )));
        }
        check_header_fields(eta, n_channels)?;
        if m_max > n_coeffs {
            return Err(LoadError::InvalidGrid(format!(
                "maximum order {m_max} exceeds coefficient count {n_coeffs}"
            )));
        }

        // Validate the declared sizes before allocating anything.
        let expected = resource_size(n_mu, n_coeffs).ok_or(LoadError::Truncated {
            expected: usize::MAX,
            actual,
        })?;
        if actual < expected {
            return Err(LoadError::Truncated { expected, actual });
        }
        if actual > expected {
            warn!(
                "Ignoring {} trailing bytes after Fourier BSDF data",
                actual - expected
            );
        }

        let n_cells = n_mu * n_mu;
        let mu = reader.read_f32_vec(n_mu)?;
        let orders = reader.read_i32_vec(n_cells)?;
        let offsets = reader.read_i32_vec(n_cells)?;
        let coefficients = reader.read_f32_vec(n_coeffs)?;
        let cdf = reader.read_f32_vec(n_cells)?;

        Self::try_from(RawFourierTable {
            eta,
            m_max,
            n_channels,
            mu,
            orders,
            offsets,
            coefficients,
            cdf,
        })
    }

    /// Serializes the table in the binary resource format.
    ///
    /// * `writer` - The destination.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let to_u32 = |v: usize| {
            u32::try_from(v).map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "value too large"))
        };
        let to_i32 = |v: &usize| {
            i32::try_from(*v).map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "value too large"))
        };
        let orders = self.m.iter().map(to_i32).collect::<io::Result<Vec<_>>>()?;
        let offsets = self.a_offset.iter().map(to_i32).collect::<io::Result<Vec<_>>>()?;

        writer.write_all(&FOURIER_BSDF_TAG)?;
        writer.write_u32_le(FOURIER_BSDF_VERSION)?;
        writer.write_f32_le(self.eta)?;
        writer.write_u32_le(to_u32(self.m_max)?)?;
        writer.write_u32_le(to_u32(self.n_channels)?)?;
        writer.write_u32_le(to_u32(self.mu.len())?)?;
        writer.write_u32_le(to_u32(self.a.len())?)?;
        writer.write_f32_slice(&self.mu)?;
        writer.write_i32_slice(&orders)?;
        writer.write_i32_slice(&offsets)?;
        writer.write_f32_slice(&self.a)?;
        writer.write_f32_slice(&self.cdf)
    }

    /// Returns the table in the binary resource format.
    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(self.resource_len());
        self.write_to(&mut bytes)?;
        Ok(bytes)
    }

    /// Returns the size of the binary resource in bytes.
    fn resource_len(&self) -> usize {
        resource_size(self.mu.len(), self.a.len()).unwrap_or(0)
    }

    /// Returns the relative index of refraction.
    pub fn eta(&self) -> Float {
        self.eta
    }

    /// Returns the upper bound on the order of any cell.
    pub fn m_max(&self) -> usize {
        self.m_max
    }

    /// Returns the number of channels.
    pub fn n_channels(&self) -> usize {
        self.n_channels
    }

    /// Returns the tabulated elevation cosines.
    pub fn mu(&self) -> &[Float] {
        &self.mu
    }

    /// Returns 1 / k for k in [0..`m_max`] with 0 at index 0.
    pub fn recip(&self) -> &[Float] {
        &self.recip
    }

    /// Returns the number of stored coefficients.
    pub fn coefficient_count(&self) -> usize {
        self.a.len()
    }

    /// Returns `true` if some tabulated direction lies below the surface.
    pub fn has_transmission(&self) -> bool {
        self.mu[0] < 0.0
    }

    /// Returns `true` if some tabulated direction lies above the surface.
    pub fn is_reflective(&self) -> bool {
        self.mu[self.mu.len() - 1] > 0.0
    }

    /// Returns the order of a cell.
    ///
    /// * `i` - Incoming elevation index.
    /// * `o` - Outgoing elevation index.
    pub fn order(&self, i: usize, o: usize) -> usize {
        self.m[o * self.mu.len() + i]
    }

    /// Returns the zeroth luminance coefficient of a cell.
    ///
    /// * `i` - Incoming elevation index.
    /// * `o` - Outgoing elevation index.
    pub fn a0(&self, i: usize, o: usize) -> Float {
        self.a0[o * self.mu.len() + i]
    }

    /// For offsets into the `mu` array for incident and outgoing direction
    /// cosines, returns the order `m` of coefficients for them and their
    /// `m * n_channels` coefficients in `a`.
    ///
    /// * `i` - Offset for incident direction.
    /// * `o` - Offset for outgoing direction.
    pub fn cell_coefficients(&self, i: usize, o: usize) -> (usize, &[Float]) {
        let cell = o * self.mu.len() + i;
        let m = self.m[cell];
        let start = self.a_offset[cell];
        (m, &self.a[start..start + m * self.n_channels])
    }

    /// Returns the CDF over incoming elevation for an outgoing node.
    ///
    /// * `o` - Outgoing elevation index.
    pub fn cdf_row(&self, o: usize) -> &[Float] {
        let n = self.mu.len();
        &self.cdf[o * n..(o + 1) * n]
    }

    /// Blends the coefficient series of the cells around `(mu_i, mu_o)`.
    /// Elevations outside the table are clamped to its ends.
    ///
    /// * `mu_i`      - Incoming elevation cosine.
    /// * `mu_o`      - Outgoing elevation cosine.
    /// * `threshold` - Minimum bilinear weight for a cell to contribute.
    pub fn interpolate(&self, mu_i: Float, mu_o: Float, threshold: Float) -> InterpolatedSeries {
        let wi = AngleWeights::new(&self.mu, mu_i);
        let wo = AngleWeights::new(&self.mu, mu_o);
        InterpolatedSeries::interpolate(
            &wi,
            &wo,
            self.m_max,
            self.n_channels,
            threshold,
            |i, o| self.cell_coefficients(i, o),
        )
    }

    /// Samples an incoming elevation cosine from the marginal for `mu_o`.
    /// Returns the cosine and its density.
    ///
    /// * `mu_o`   - Outgoing elevation cosine.
    /// * `u`      - Uniform random variate in [0, 1).
    /// * `config` - Weight threshold and degenerate mass.
    pub fn sample_elevation(
        &self,
        mu_o: Float,
        u: Float,
        config: &FourierConfig,
    ) -> Result<(Float, Float), ScatterError> {
        let marginal = self.marginal(mu_o, config.weight_threshold);
        let n = self.mu.len();
        let total = marginal.at(n - 1);
        if !(total as f64 > config.degenerate_mass) {
            return Err(ScatterError::Degenerate);
        }

        // Find the interval of the blended CDF containing `u * total`.
        let target = u * total;
        let mut k = find_interval(n, |k| marginal.at(k) <= target);

        // A target at the top of the CDF can land on a flat tail.
        while k > 0 && !(marginal.at(k + 1) > marginal.at(k)) {
            k -= 1;
        }
        let (c0, c1) = (marginal.at(k), marginal.at(k + 1));
        if !(c1 > c0) {
            return Err(ScatterError::Degenerate);
        }

        // Invert the linear segment.
        let width = self.mu[k + 1] - self.mu[k];
        let t = clamp((target - c0) / (c1 - c0), 0.0, 1.0);
        let mu_i = min(self.mu[k] + t * width, self.mu[k + 1]);
        Ok((mu_i, (c1 - c0) / (total * width)))
    }

    /// Returns the density with which `sample_elevation` samples `mu_i` for
    /// `mu_o`. Zero outside the tabulated range or for a zero-mass marginal.
    ///
    /// * `mu_o`   - Outgoing elevation cosine.
    /// * `mu_i`   - Incoming elevation cosine.
    /// * `config` - Weight threshold and degenerate mass.
    pub fn elevation_pdf(&self, mu_o: Float, mu_i: Float, config: &FourierConfig) -> Float {
        let n = self.mu.len();
        if !(mu_i >= self.mu[0] && mu_i <= self.mu[n - 1]) {
            return 0.0;
        }

        let marginal = self.marginal(mu_o, config.weight_threshold);
        let total = marginal.at(n - 1);
        if !(total as f64 > config.degenerate_mass) {
            return 0.0;
        }

        let mut k = find_interval(n, |k| self.mu[k] <= mu_i);
        if k > 0 && mu_i <= self.mu[k] && !(marginal.at(k + 1) > marginal.at(k)) {
            k -= 1;
        }
        let width = self.mu[k + 1] - self.mu[k];
        max(0.0, marginal.at(k + 1) - marginal.at(k)) / (total * width)
    }

    /// Returns the CDF rows around `mu_o` with their renormalized weights.
    ///
    /// * `mu_o`      - Outgoing elevation cosine.
    /// * `threshold` - Minimum weight for a row to contribute.
    fn marginal(&self, mu_o: Float, threshold: Float) -> Marginal<'_> {
        let wo = AngleWeights::new(&self.mu, mu_o);
        let mut weights = [0.0; 2];
        for (w, wt) in weights.iter_mut().zip(wo.weights.iter()) {
            if *wt >= threshold && *wt > 0.0 {
                *w = *wt;
            }
        }
        let sum = weights[0] + weights[1];
        if sum > 0.0 {
            weights[0] /= sum;
            weights[1] /= sum;
        }
        Marginal {
            rows: [self.cdf_row(wo.offset), self.cdf_row(wo.offset + 1)],
            weights,
        }
    }
}

/// Two CDF rows blended by the outgoing elevation weights.
struct Marginal<'a> {
    rows: [&'a [Float]; 2],
    weights: [Float; 2],
}

impl Marginal<'_> {
    /// Returns the blended CDF at node `k`.
    fn at(&self, k: usize) -> Float {
        self.weights[0] * self.rows[0][k] + self.weights[1] * self.rows[1][k]
    }
}

impl TryFrom<RawFourierTable> for FourierBSDFTable {
    type Error = LoadError;

    /// Validates the raw contents and builds the table.
    ///
    /// * `raw` - The raw table contents.
    fn try_from(raw: RawFourierTable) -> Result<Self, Self::Error> {
        let RawFourierTable {
            eta,
            m_max,
            n_channels,
            mu,
            orders,
            offsets,
            coefficients: a,
            cdf,
        } = raw;

        check_header_fields(eta, n_channels)?;

        let n = mu.len();
        if n < 2 {
            return Err(LoadError::InvalidGrid(format!(
                "need at least 2 elevations, found {n}"
            )));
        }
        if let Some(v) = mu.iter().find(|v| !(v.is_finite() && abs(**v) <= 1.0)) {
            return Err(LoadError::InvalidGrid(format!(
                "elevation cosine {v} is outside [-1, 1]"
            )));
        }
        if let Some(k) = (1..n).find(|k| !(mu[*k] > mu[k - 1])) {
            return Err(LoadError::InvalidGrid(format!(
                "elevation cosines are not strictly increasing at index {k}"
            )));
        }

        let n_cells = n * n;
        if orders.len() != n_cells || offsets.len() != n_cells || cdf.len() != n_cells {
            return Err(LoadError::InvalidGrid(format!(
                "expected {n_cells} cells, found {} orders, {} offsets and {} CDF entries",
                orders.len(),
                offsets.len(),
                cdf.len()
            )));
        }

        let mut m = Vec::with_capacity(n_cells);
        let mut a_offset = Vec::with_capacity(n_cells);
        let mut a0 = Vec::with_capacity(n_cells);
        for (cell, (order, offset)) in orders.iter().zip(offsets.iter()).enumerate() {
            let (i, o) = (cell % n, cell / n);
            if *order < 0 || *offset < 0 {
                return Err(LoadError::InvalidGrid(format!(
                    "cell ({i}, {o}) has negative order {order} or offset {offset}"
                )));
            }
            let (order, offset) = (*order as usize, *offset as usize);
            if order > m_max {
                return Err(LoadError::InvalidGrid(format!(
                    "cell ({i}, {o}) has order {order} above maximum {m_max}"
                )));
            }
            let end = order
                .checked_mul(n_channels)
                .and_then(|len| len.checked_add(offset));
            if !matches!(end, Some(end) if end <= a.len()) {
                return Err(LoadError::InvalidGrid(format!(
                    "cell ({i}, {o}) coefficients at {offset} with order {order} exceed buffer of {}",
                    a.len()
                )));
            }
            m.push(order);
            a_offset.push(offset);
            a0.push(if order > 0 { a[offset] } else { 0.0 });
        }

        let largest = m.iter().copied().max().unwrap_or(0);
        if largest != m_max {
            return Err(LoadError::InvalidGrid(format!(
                "maximum order {m_max} does not match largest cell order {largest}"
            )));
        }

        if let Some(idx) = a.iter().position(|v| !v.is_finite()) {
            return Err(LoadError::InvalidGrid(format!(
                "coefficient {idx} is not finite"
            )));
        }

        for (o, row) in cdf.chunks(n).enumerate() {
            check_cdf_row(o, row)?;
        }

        let recip = (0..=m_max)
            .map(|k| if k == 0 { 0.0 } else { 1.0 / k as Float })
            .collect();

        Ok(Self {
            eta,
            m_max,
            n_channels,
            mu,
            m,
            a_offset,
            a,
            a0,
            cdf,
            recip,
        })
    }
}

/// Checks the header fields that are shared by decoded and built tables.
///
/// * `eta`        - Relative index of refraction.
/// * `n_channels` - Number of channels.
fn check_header_fields(eta: Float, n_channels: usize) -> Result<(), LoadError> {
    if n_channels != 1 && n_channels != 3 {
        return Err(LoadError::BadHeader(format!(
            "unsupported channel count {n_channels}"
        )));
    }
    if !(eta.is_finite() && eta > 0.0) {
        return Err(LoadError::BadHeader(format!("invalid eta {eta}")));
    }
    Ok(())
}

/// Checks that a CDF row is all zero or non-decreasing from 0 to 1.
///
/// * `o`   - Outgoing elevation index of the row.
/// * `row` - The row.
fn check_cdf_row(o: usize, row: &[Float]) -> Result<(), LoadError> {
    if row.iter().any(|v| !v.is_finite()) {
        return Err(LoadError::InvalidGrid(format!(
            "CDF row {o} is not finite"
        )));
    }
    if row.iter().all(|v| *v == 0.0) {
        return Ok(());
    }
    if abs(row[0]) > CDF_TOLERANCE {
        return Err(LoadError::InvalidGrid(format!(
            "CDF row {o} starts at {} instead of 0",
            row[0]
        )));
    }
    if row.windows(2).any(|w| w[1] < w[0]) {
        return Err(LoadError::InvalidGrid(format!(
            "CDF row {o} is decreasing"
        )));
    }
    let last = row[row.len() - 1];
    if abs(last - 1.0) > CDF_TOLERANCE {
        return Err(LoadError::InvalidGrid(format!(
            "CDF row {o} ends at {last} instead of 1"
        )));
    }
    Ok(())
}

/// Returns the resource size in bytes for the given counts, or `None` on
/// overflow.
///
/// * `n_mu`     - Number of elevations.
/// * `n_coeffs` - Number of coefficients.
fn resource_size(n_mu: usize, n_coeffs: usize) -> Option<usize> {
    let n_cells = n_mu.checked_mul(n_mu)?;
    let words = n_cells
        .checked_mul(3)?
        .checked_add(n_mu)?
        .checked_add(n_coeffs)?;
    words.checked_mul(4)?.checked_add(FOURIER_BSDF_HEADER_SIZE)
}

/// Assembles a validated `FourierBSDFTable` from per-cell coefficient series.
///
/// Offsets, the maximum order and the elevation marginal are derived from the
/// cells. The marginal integrates `max(0, a0)` over incoming elevation with
/// the trapezoid rule and is normalized per outgoing elevation.
#[derive(Clone, Debug)]
pub struct FourierTableBuilder {
    eta: Float,
    n_channels: usize,
    mu: Vec<Float>,
    cells: Vec<Vec<Float>>,
}

impl FourierTableBuilder {
    /// Creates a builder with all cells empty and `eta = 1`.
    ///
    /// * `mu`         - Elevation cosines.
    /// * `n_channels` - Number of channels (1 or 3).
    pub fn new(mu: Vec<Float>, n_channels: usize) -> Self {
        let n = mu.len();
        Self {
            eta: 1.0,
            n_channels,
            mu,
            cells: vec![vec![]; n * n],
        }
    }

    /// Sets the relative index of refraction.
    ///
    /// * `eta` - Relative index of refraction.
    pub fn with_eta(mut self, eta: Float) -> Self {
        self.eta = eta;
        self
    }

    /// Sets the coefficients of one cell, channel-major.
    ///
    /// * `i`            - Incoming elevation index.
    /// * `o`            - Outgoing elevation index.
    /// * `coefficients` - `m * n_channels` coefficients.
    pub fn set_cell(&mut self, i: usize, o: usize, coefficients: &[Float]) -> Result<(), LoadError> {
        let n = self.mu.len();
        if i >= n || o >= n {
            return Err(LoadError::InvalidGrid(format!(
                "cell ({i}, {o}) is outside a {n}x{n} grid"
            )));
        }
        if self.n_channels == 0 || coefficients.len() % self.n_channels != 0 {
            return Err(LoadError::InvalidGrid(format!(
                "cell ({i}, {o}) has {} coefficients for {} channels",
                coefficients.len(),
                self.n_channels
            )));
        }
        self.cells[o * n + i] = coefficients.to_vec();
        Ok(())
    }

    /// Sets every cell from a function of `(i, o)`.
    ///
    /// * `f` - Returns the channel-major coefficients of cell `(i, o)`.
    pub fn fill<F>(mut self, f: F) -> Result<Self, LoadError>
    where
        F: Fn(usize, usize) -> Vec<Float>,
    {
        let n = self.mu.len();
        for o in 0..n {
            for i in 0..n {
                self.set_cell(i, o, &f(i, o))?;
            }
        }
        Ok(self)
    }

    /// Validates and builds the table.
    pub fn build(self) -> Result<FourierBSDFTable, LoadError> {
        let n = self.mu.len();
        let n_channels = max(self.n_channels, 1);

        let mut orders = Vec::with_capacity(n * n);
        let mut offsets = Vec::with_capacity(n * n);
        let mut coefficients = vec![];
        let mut m_max = 0;
        for cell in self.cells.iter() {
            let m = cell.len() / n_channels;
            m_max = max(m_max, m);
            orders.push(to_i32(m)?);
            offsets.push(to_i32(coefficients.len())?);
            coefficients.extend_from_slice(cell);
        }

        let a0 = |i: usize, o: usize| self.cells[o * n + i].first().map_or(0.0, |v| max(0.0, *v));
        let mut cdf = vec![0.0; n * n];
        for o in 0..n {
            let row = &mut cdf[o * n..(o + 1) * n];
            let mut sum = 0.0;
            for k in 1..n {
                let width = self.mu[k] - self.mu[k - 1];
                sum += 0.5 * (a0(k - 1, o) + a0(k, o)) * width;
                row[k] = sum;
            }
            if sum > 0.0 {
                row.iter_mut().for_each(|v| *v /= sum);
            }
        }

        FourierBSDFTable::try_from(RawFourierTable {
            eta: self.eta,
            m_max,
            n_channels: self.n_channels,
            mu: self.mu,
            orders,
            offsets,
            coefficients,
            cdf,
        })
    }
}

/// Converts a count to the resource's signed integer type.
fn to_i32(v: usize) -> Result<i32, LoadError> {
    i32::try_from(v).map_err(|_| LoadError::InvalidGrid(format!("{v} does not fit the resource format")))
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::*;
    use proptest::prelude::*;

    fn constant_table() -> FourierBSDFTable {
        FourierTableBuilder::new(vec![0.0, 1.0], 1)
            .fill(|_, _| vec![1.0])
            .unwrap()
            .build()
            .unwrap()
    }

    /// Three channel table on 4 elevations with orders varying per cell.
    fn rgb_table() -> FourierBSDFTable {
        FourierTableBuilder::new(vec![-1.0, -0.2, 0.4, 1.0], 3)
            .with_eta(1.5)
            .fill(|i, o| {
                let m = 1 + (i + o) % 3;
                let mut c = vec![];
                for ch in 0..3 {
                    for k in 0..m {
                        c.push(1.0 + ch as Float * 0.1 + i as Float * 0.05 - k as Float * 0.2);
                    }
                }
                c
            })
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn builder_derives_layout() {
        let table = rgb_table();
        assert_eq!(table.m_max(), 3);
        assert_eq!(table.n_channels(), 3);
        assert_eq!(table.eta(), 1.5);
        assert!(table.has_transmission());
        assert!(table.is_reflective());
        assert_eq!(table.recip().len(), 4);
        assert_eq!(table.recip()[0], 0.0);
        assert_eq!(table.recip()[2], 0.5);

        let (m, ap) = table.cell_coefficients(2, 1);
        assert_eq!(m, 1 + (2 + 1) % 3);
        assert_eq!(ap.len(), 3 * m);
        assert_eq!(table.a0(2, 1), ap[0]);
        assert_eq!(table.order(2, 1), m);
    }

    #[test]
    fn builder_normalizes_cdf_rows() {
        let table = rgb_table();
        for o in 0..4 {
            let row = table.cdf_row(o);
            assert_eq!(row[0], 0.0);
            assert!(approx_eq!(Float, row[3], 1.0, epsilon = 1e-6));
            assert!(row.windows(2).all(|w| w[1] >= w[0]));
        }
    }

    #[test]
    fn bytes_round_trip() {
        let table = rgb_table();
        let bytes = table.to_bytes().unwrap();
        assert_eq!(bytes.len(), table.resource_len());

        let copy = FourierBSDFTable::from_bytes(&bytes).unwrap();
        assert_eq!(copy.mu(), table.mu());
        assert_eq!(copy.eta(), table.eta());
        assert_eq!(copy.m_max(), table.m_max());
        for o in 0..4 {
            assert_eq!(copy.cdf_row(o), table.cdf_row(o));
            for i in 0..4 {
                assert_eq!(copy.cell_coefficients(i, o), table.cell_coefficients(i, o));
            }
        }
    }

    #[test]
    fn file_round_trip() {
        let table = constant_table();
        let path = std::env::temp_dir().join(format!("fourier-table-{}.bsdf", std::process::id()));
        std::fs::write(&path, table.to_bytes().unwrap()).unwrap();
        let copy = FourierBSDFTable::from_file(&path);
        std::fs::remove_file(&path).unwrap();
        assert_eq!(copy.unwrap().cell_coefficients(1, 1), (1, &[1.0][..]));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = FourierBSDFTable::from_file("/nonexistent/table.bsdf").unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn wrong_tag_is_bad_header() {
        let mut bytes = constant_table().to_bytes().unwrap();
        bytes[0] = b'X';
        assert!(matches!(
            FourierBSDFTable::from_bytes(&bytes),
            Err(LoadError::BadHeader(_))
        ));
    }

    #[test]
    fn wrong_version_is_bad_header() {
        let mut bytes = constant_table().to_bytes().unwrap();
        bytes[8] = 2;
        assert!(matches!(
            FourierBSDFTable::from_bytes(&bytes),
            Err(LoadError::BadHeader(_))
        ));
    }

    #[test]
    fn unsupported_channels_is_bad_header() {
        let mut bytes = constant_table().to_bytes().unwrap();
        bytes[20] = 2;
        assert!(matches!(
            FourierBSDFTable::from_bytes(&bytes),
            Err(LoadError::BadHeader(_))
        ));
    }

    #[test]
    fn short_resources_are_truncated() {
        let bytes = constant_table().to_bytes().unwrap();
        assert!(matches!(
            FourierBSDFTable::from_bytes(&bytes[0..4]),
            Err(LoadError::Truncated { expected: 8, actual: 4 })
        ));
        assert!(matches!(
            FourierBSDFTable::from_bytes(&bytes[0..20]),
            Err(LoadError::Truncated { expected: 32, actual: 20 })
        ));
        let n = bytes.len();
        assert!(matches!(
            FourierBSDFTable::from_bytes(&bytes[0..n - 1]),
            Err(LoadError::Truncated { expected, actual }) if expected == n && actual == n - 1
        ));
    }

    #[test]
    fn huge_declared_counts_are_truncated() {
        let mut bytes = constant_table().to_bytes().unwrap();
        bytes[24..28].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            FourierBSDFTable::from_bytes(&bytes),
            Err(LoadError::Truncated { .. })
        ));
    }

    #[test]
    fn inconsistent_maximum_order_is_invalid_grid() {
        for m_max in [0, 2, 50_000_000, u32::MAX] {
            let mut bytes = constant_table().to_bytes().unwrap();
            bytes[16..20].copy_from_slice(&m_max.to_le_bytes());
            assert!(matches!(
                FourierBSDFTable::from_bytes(&bytes),
                Err(LoadError::InvalidGrid(_))
            ));
        }
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let mut bytes = constant_table().to_bytes().unwrap();
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        assert!(FourierBSDFTable::from_bytes(&bytes).is_ok());
    }

    fn raw_constant() -> RawFourierTable {
        RawFourierTable {
            eta: 1.0,
            m_max: 1,
            n_channels: 1,
            mu: vec![0.0, 1.0],
            orders: vec![1; 4],
            offsets: vec![0, 1, 2, 3],
            coefficients: vec![1.0; 4],
            cdf: vec![0.0, 1.0, 0.0, 1.0],
        }
    }

    #[test]
    fn raw_constant_is_valid() {
        let table = FourierBSDFTable::try_from(raw_constant()).unwrap();
        assert_eq!(table.coefficient_count(), 4);
    }

    #[test]
    fn non_increasing_mu_is_invalid_grid() {
        let raw = RawFourierTable {
            mu: vec![0.5, 0.5],
            ..raw_constant()
        };
        assert!(matches!(
            FourierBSDFTable::try_from(raw),
            Err(LoadError::InvalidGrid(_))
        ));
    }

    #[test]
    fn negative_order_is_invalid_grid() {
        let raw = RawFourierTable {
            orders: vec![1, -1, 1, 1],
            ..raw_constant()
        };
        assert!(matches!(
            FourierBSDFTable::try_from(raw),
            Err(LoadError::InvalidGrid(_))
        ));
    }

    #[test]
    fn unreachable_cell_is_invalid_grid() {
        let raw = RawFourierTable {
            offsets: vec![0, 1, 2, 4],
            ..raw_constant()
        };
        assert!(matches!(
            FourierBSDFTable::try_from(raw),
            Err(LoadError::InvalidGrid(_))
        ));
    }

    #[test]
    fn order_above_maximum_is_invalid_grid() {
        let raw = RawFourierTable {
            orders: vec![2, 1, 0, 0],
            ..raw_constant()
        };
        assert!(matches!(
            FourierBSDFTable::try_from(raw),
            Err(LoadError::InvalidGrid(_))
        ));
    }

    #[test]
    fn maximum_order_above_cells_is_invalid_grid() {
        let raw = RawFourierTable {
            m_max: 3,
            ..raw_constant()
        };
        assert!(matches!(
            FourierBSDFTable::try_from(raw),
            Err(LoadError::InvalidGrid(_))
        ));
    }

    #[test]
    fn unnormalized_cdf_is_invalid_grid() {
        let raw = RawFourierTable {
            cdf: vec![0.0, 0.5, 0.0, 1.0],
            ..raw_constant()
        };
        assert!(matches!(
            FourierBSDFTable::try_from(raw),
            Err(LoadError::InvalidGrid(_))
        ));
    }

    #[test]
    fn interpolate_at_nodes_is_exact() {
        let table = rgb_table();
        for (o, mu_o) in table.mu().iter().enumerate() {
            for (i, mu_i) in table.mu().iter().enumerate() {
                let series = table.interpolate(*mu_i, *mu_o, 1e-4);
                let (m, ap) = table.cell_coefficients(i, o);
                assert_eq!(series.order(), m);
                for c in 0..3 {
                    assert_eq!(series.channel(c), &ap[c * m..(c + 1) * m]);
                }
            }
        }
    }

    #[test]
    fn constant_table_elevation_is_uniform() {
        let table = constant_table();
        let config = FourierConfig::default();
        for u in [0.0, 0.3, 0.7, 0.99] {
            let (mu_i, pdf) = table.sample_elevation(0.5, u, &config).unwrap();
            assert!(approx_eq!(Float, mu_i, u, epsilon = 1e-6));
            assert!(approx_eq!(Float, pdf, 1.0, epsilon = 1e-6));
        }
        assert_eq!(table.elevation_pdf(0.5, -0.5, &config), 0.0);
        assert!(approx_eq!(Float, table.elevation_pdf(0.5, 0.5, &config), 1.0, epsilon = 1e-6));
    }

    #[test]
    fn zero_mass_marginal_is_degenerate() {
        let table = FourierTableBuilder::new(vec![0.0, 0.5, 1.0], 1)
            .fill(|_, o| if o == 0 { vec![0.0, 1.0] } else { vec![1.0] })
            .unwrap()
            .build()
            .unwrap();
        let config = FourierConfig::default();
        assert_eq!(
            table.sample_elevation(0.0, 0.5, &config),
            Err(ScatterError::Degenerate)
        );
        assert_eq!(table.elevation_pdf(0.0, 0.5, &config), 0.0);
        assert!(table.sample_elevation(1.0, 0.5, &config).is_ok());
    }

    #[test]
    fn flat_tail_samples_last_rising_interval() {
        let table = FourierTableBuilder::new(vec![0.0, 1.0 / 3.0, 2.0 / 3.0, 1.0], 1)
            .fill(|i, _| if i < 2 { vec![1.0] } else { vec![] })
            .unwrap()
            .build()
            .unwrap();
        let config = FourierConfig::default();
        let (mu_i, pdf) = table.sample_elevation(0.5, 1.0, &config).unwrap();
        assert!(approx_eq!(Float, mu_i, 2.0 / 3.0, epsilon = 1e-6));
        assert!(pdf > 0.0);
        assert!(approx_eq!(Float, pdf, 1.0, epsilon = 1e-4));
        let expected = table.elevation_pdf(0.5, mu_i, &config);
        assert!(approx_eq!(Float, pdf, expected, epsilon = 1e-4));
    }

    proptest! {
        #[test]
        fn sampled_elevation_pdf_matches(u in 0.0..1.0f32, mu_o in -1.0..1.0f32) {
            let table = rgb_table();
            let config = FourierConfig::default();
            let (mu_i, pdf) = table.sample_elevation(mu_o, u, &config).unwrap();
            prop_assert!(pdf > 0.0);
            prop_assert!((-1.0..=1.0).contains(&mu_i));
            let expected = table.elevation_pdf(mu_o, mu_i, &config);
            prop_assert!(approx_eq!(Float, pdf, expected, epsilon = 1e-3, ulps = 4));
        }
    }
}
