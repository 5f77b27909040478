//! BSDF Reader

use crate::error::LoadError;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Cursor, Read, Write};

/// The first 8 bytes of a Fourier BSDF resource.
pub const FOURIER_BSDF_TAG: [u8; 8] = *b"FOURBRDF";

/// Supported resource version.
pub const FOURIER_BSDF_VERSION: u32 = 1;

/// Size of the fixed header in bytes.
pub const FOURIER_BSDF_HEADER_SIZE: usize = 32;

/// Interface to add custom helpers for reading little-endian BSDF resources
/// that are already fully in memory.
///
/// Callers validate the total size against the header before reading arrays
/// so a short read here means the declared sizes were wrong.
pub trait BSDFReader {
    /// Reads the tag bytes and compares them to the expected tag.
    fn check_header(&mut self) -> Result<(), LoadError>;

    /// Reads one 32-bit unsigned value.
    fn read_u32_le(&mut self) -> Result<u32, LoadError>;

    /// Reads one 32-bit floating point value.
    fn read_f32_le(&mut self) -> Result<f32, LoadError>;

    /// Reads given number of 32-bit signed values.
    ///
    /// * `count` - Number of values to read.
    fn read_i32_vec(&mut self, count: usize) -> Result<Vec<i32>, LoadError>;

    /// Reads given number of 32-bit floating point values.
    ///
    /// * `count` - Number of values to read.
    fn read_f32_vec(&mut self, count: usize) -> Result<Vec<f32>, LoadError>;
}

impl BSDFReader for Cursor<&[u8]> {
    fn check_header(&mut self) -> Result<(), LoadError> {
        let start = self.position();
        let mut tag = [0_u8; 8];
        self.read_exact(&mut tag)
            .map_err(|_| truncated(self, start, 8))?;
        if tag == FOURIER_BSDF_TAG {
            Ok(())
        } else {
            Err(LoadError::BadHeader(format!(
                "invalid tag '{}', expected '{}'",
                String::from_utf8_lossy(&tag),
                String::from_utf8_lossy(&FOURIER_BSDF_TAG),
            )))
        }
    }

    fn read_u32_le(&mut self) -> Result<u32, LoadError> {
        let start = self.position();
        ReadBytesExt::read_u32::<LittleEndian>(self).map_err(|_| truncated(self, start, 4))
    }

    fn read_f32_le(&mut self) -> Result<f32, LoadError> {
        let start = self.position();
        ReadBytesExt::read_f32::<LittleEndian>(self).map_err(|_| truncated(self, start, 4))
    }

    fn read_i32_vec(&mut self, count: usize) -> Result<Vec<i32>, LoadError> {
        let start = self.position();
        let mut buffer = vec![0_i32; count];
        ReadBytesExt::read_i32_into::<LittleEndian>(self, &mut buffer)
            .map_err(|_| truncated(self, start, 4 * count))?;
        Ok(buffer)
    }

    fn read_f32_vec(&mut self, count: usize) -> Result<Vec<f32>, LoadError> {
        let start = self.position();
        let mut buffer = vec![0.0_f32; count];
        ReadBytesExt::read_f32_into::<LittleEndian>(self, &mut buffer)
            .map_err(|_| truncated(self, start, 4 * count))?;
        Ok(buffer)
    }
}

/// Returns the error for a failed read of `wanted` bytes at `start`.
///
/// * `cursor` - The cursor.
/// * `start`  - Position of the failed read.
/// * `wanted` - Number of bytes requested.
fn truncated(cursor: &Cursor<&[u8]>, start: u64, wanted: usize) -> LoadError {
    LoadError::Truncated {
        expected: start as usize + wanted,
        actual: cursor.get_ref().len(),
    }
}

/// Interface for writing little-endian BSDF resources.
pub trait BSDFWriter {
    /// Writes one 32-bit unsigned value.
    ///
    /// * `v` - The value.
    fn write_u32_le(&mut self, v: u32) -> io::Result<()>;

    /// Writes one 32-bit floating point value.
    ///
    /// * `v` - The value.
    fn write_f32_le(&mut self, v: f32) -> io::Result<()>;

    /// Writes a slice of 32-bit signed values.
    ///
    /// * `values` - The values.
    fn write_i32_slice(&mut self, values: &[i32]) -> io::Result<()>;

    /// Writes a slice of 32-bit floating point values.
    ///
    /// * `values` - The values.
    fn write_f32_slice(&mut self, values: &[f32]) -> io::Result<()>;
}

impl<W: Write> BSDFWriter for W {
    fn write_u32_le(&mut self, v: u32) -> io::Result<()> {
        WriteBytesExt::write_u32::<LittleEndian>(self, v)
    }

    fn write_f32_le(&mut self, v: f32) -> io::Result<()> {
        WriteBytesExt::write_f32::<LittleEndian>(self, v)
    }

    fn write_i32_slice(&mut self, values: &[i32]) -> io::Result<()> {
        values
            .iter()
            .try_for_each(|v| WriteBytesExt::write_i32::<LittleEndian>(self, *v))
    }

    fn write_f32_slice(&mut self, values: &[f32]) -> io::Result<()> {
        values
            .iter()
            .try_for_each(|v| WriteBytesExt::write_f32::<LittleEndian>(self, *v))
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_written_are_read_back() {
        let mut bytes = FOURIER_BSDF_TAG.to_vec();
        bytes.write_u32_le(7).unwrap();
        bytes.write_f32_le(1.5).unwrap();
        bytes.write_i32_slice(&[-1, 2]).unwrap();
        bytes.write_f32_slice(&[0.25]).unwrap();

        let mut cursor = Cursor::new(bytes.as_slice());
        cursor.check_header().unwrap();
        assert_eq!(cursor.read_u32_le().unwrap(), 7);
        assert_eq!(cursor.read_f32_le().unwrap(), 1.5);
        assert_eq!(cursor.read_i32_vec(2).unwrap(), vec![-1, 2]);
        assert_eq!(cursor.read_f32_vec(1).unwrap(), vec![0.25]);
    }

    #[test]
    fn wrong_tag_is_bad_header() {
        let bytes = b"SCATFUN\x01".to_vec();
        let mut cursor = Cursor::new(bytes.as_slice());
        assert!(matches!(cursor.check_header(), Err(LoadError::BadHeader(_))));
    }

    #[test]
    fn short_read_is_truncated() {
        let bytes = [0_u8; 6];
        let mut cursor = Cursor::new(&bytes[..]);
        assert!(matches!(
            cursor.read_f32_vec(2),
            Err(LoadError::Truncated {
                expected: 8,
                actual: 6
            })
        ));
    }
}
