//! BxDF Type

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Stores combinations of reflection models.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct BxDFType: u8 {
        /// Scatters into the hemisphere of the outgoing direction.
        const BSDF_REFLECTION = 0b00000001;

        /// Scatters into the opposite hemisphere.
        const BSDF_TRANSMISSION = 0b00000010;

        /// Diffuse lobe.
        const BSDF_DIFFUSE = 0b00000100;

        /// Glossy lobe.
        const BSDF_GLOSSY = 0b00001000;

        /// Perfectly specular lobe.
        const BSDF_SPECULAR = 0b00010000;
    }
}

impl BxDFType {
    /// Tests a single type flag and returns whether it is set or not.
    ///
    /// * `flag` - BxDFType flag.
    pub fn matches(&self, flag: BxDFType) -> bool {
        self.intersects(flag)
    }
}

impl fmt::Display for BxDFType {
    /// Formats the value using the given formatter.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter_names().map(|(name, _)| name).collect();
        if names.is_empty() {
            write!(f, "BSDF_NONE")
        } else {
            write!(f, "{}", names.join(" | "))
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
