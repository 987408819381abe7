//! Target sequence for the matching step.
//!
//! The built-in table holds the imaginary parts of the first fifty
//! non-trivial zeros of the Riemann zeta function, rounded to six decimals.

use std::fs;
use std::path::{Path, PathBuf};

pub const ZETA_ZERO_ORDINATES: [f64; 50] = [
    14.134725, 21.022040, 25.010858, 30.424876, 32.935062, 37.586178, 40.918719, 43.327073,
    48.005151, 49.773832, 52.970321, 56.446248, 59.347044, 60.831779, 65.112544, 67.079811,
    69.546402, 72.067158, 75.704691, 77.144840, 79.337375, 82.910381, 84.735493, 87.425275,
    88.809111, 92.491899, 94.651344, 95.870634, 98.831194, 101.317851, 103.725538, 105.446623,
    107.168611, 111.029536, 111.874659, 114.320221, 116.226680, 118.790783, 121.370125,
    122.946829, 124.256819, 127.516684, 129.578704, 131.087689, 133.497737, 134.756510,
    138.116042, 139.736209, 141.123707, 143.111846,
];

#[derive(Debug, thiserror::Error)]
pub enum ReferenceError {
    #[error("reference sequence must not be empty")]
    Empty,
    #[error("reference value at index {index} is not finite")]
    NonFinite { index: usize },
    #[error("requested {requested} zeta zeros but only {available} are tabulated")]
    TableTooShort { requested: usize, available: usize },
    #[error("failed to read reference file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse reference file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceSequence {
    values: Vec<f64>,
}

impl ReferenceSequence {
    pub fn new(values: Vec<f64>) -> Result<Self, ReferenceError> {
        if values.is_empty() {
            return Err(ReferenceError::Empty);
        }
        if let Some(index) = values.iter().position(|value| !value.is_finite()) {
            return Err(ReferenceError::NonFinite { index });
        }
        Ok(Self { values })
    }

    pub fn first_zeta_zeros(count: usize) -> Result<Self, ReferenceError> {
        if count > ZETA_ZERO_ORDINATES.len() {
            return Err(ReferenceError::TableTooShort {
                requested: count,
                available: ZETA_ZERO_ORDINATES.len(),
            });
        }
        Self::new(ZETA_ZERO_ORDINATES[..count].to_vec())
    }

    /// Reads a JSON array of numbers.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ReferenceError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| ReferenceError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let values: Vec<f64> =
            serde_json::from_str(&source).map_err(|source| ReferenceError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Self::new(values)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{ReferenceError, ReferenceSequence, ZETA_ZERO_ORDINATES};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn tabulated_ordinates_are_strictly_increasing() {
        assert!(ZETA_ZERO_ORDINATES.windows(2).all(|pair| pair[1] > pair[0]));
        assert_eq!(ZETA_ZERO_ORDINATES[0], 14.134725);
        assert_eq!(ZETA_ZERO_ORDINATES[49], 143.111846);
    }

    #[test]
    fn prefix_selection_respects_table_length() {
        let thirty = ReferenceSequence::first_zeta_zeros(30).expect("thirty zeros");
        assert_eq!(thirty.len(), 30);
        assert_eq!(thirty.values()[29], 101.317851);

        assert!(matches!(
            ReferenceSequence::first_zeta_zeros(51),
            Err(ReferenceError::TableTooShort {
                requested: 51,
                available: 50
            })
        ));
        assert!(matches!(
            ReferenceSequence::first_zeta_zeros(0),
            Err(ReferenceError::Empty)
        ));
    }

    #[test]
    fn json_reference_file_is_loaded_and_validated() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("zeros.json");
        fs::write(&path, "[14.1, 21.0, 25.0]").expect("write reference");
        let sequence = ReferenceSequence::from_json_file(&path).expect("load");
        assert_eq!(sequence.values(), &[14.1, 21.0, 25.0]);

        fs::write(&path, "{\"not\": \"an array\"}").expect("write reference");
        assert!(matches!(
            ReferenceSequence::from_json_file(&path),
            Err(ReferenceError::Parse { .. })
        ));
        assert!(matches!(
            ReferenceSequence::from_json_file(temp.path().join("missing.json")),
            Err(ReferenceError::Read { .. })
        ));
    }
}
