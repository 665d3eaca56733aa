//! Beam identification: mass number and element symbol, e.g. `10Be`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Element symbols indexed by `Z - 1`, hydrogen through uranium.
const ELEMENTS: [&str; 92] = [
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S",
    "Cl", "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga",
    "Ge", "As", "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd",
    "Ag", "Cd", "In", "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm",
    "Sm", "Eu", "Gd", "Tb", "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os",
    "Ir", "Pt", "Au", "Hg", "Tl", "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", "Pa",
    "U",
];

/// Atomic number for an element symbol.
pub fn atomic_number(symbol: &str) -> Option<u32> {
    ELEMENTS
        .iter()
        .position(|&s| s == symbol)
        .map(|i| i as u32 + 1)
}

/// Element symbol for an atomic number.
pub fn element_symbol(z: u32) -> Option<&'static str> {
    ELEMENTS.get((z as usize).checked_sub(1)?).copied()
}

/// A beam nucleus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Beam {
    /// Charge number.
    pub z: u32,
    /// Mass number.
    pub a: u32,
}

impl Beam {
    /// Parse `"<A><symbol>"`, e.g. `"10Be"` or `"12C"`.
    pub fn parse(label: &str) -> Result<Self, CoreError> {
        let label = label.trim();
        let split = label
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| CoreError::BeamParse(label.to_string()))?;
        let (mass, symbol) = label.split_at(split);

        let a: u32 = mass
            .parse()
            .map_err(|_| CoreError::BeamParse(label.to_string()))?;
        let z = atomic_number(symbol).ok_or_else(|| CoreError::BeamParse(label.to_string()))?;
        if a < z {
            return Err(CoreError::BeamParse(label.to_string()));
        }
        Ok(Self { z, a })
    }
}

impl fmt::Display for Beam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match element_symbol(self.z) {
            Some(symbol) => write!(f, "{}{}", self.a, symbol),
            None => write!(f, "{}(Z={})", self.a, self.z),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_light_ions() {
        assert_eq!(Beam::parse("10Be").unwrap(), Beam { z: 4, a: 10 });
        assert_eq!(Beam::parse("11B").unwrap(), Beam { z: 5, a: 11 });
        assert_eq!(Beam::parse("12C").unwrap(), Beam { z: 6, a: 12 });
        assert_eq!(Beam::parse("238U").unwrap(), Beam { z: 92, a: 238 });
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["Be", "10", "", "10Xx", "10be", "1C"] {
            assert!(Beam::parse(bad).is_err(), "accepted '{}'", bad);
        }
    }

    #[test]
    fn test_display_roundtrip() {
        let beam = Beam::parse("10Be").unwrap();
        assert_eq!(beam.to_string(), "10Be");
    }
}
