//! Forest persistence via bincode.

use std::path::Path;

use tracing::{debug, info, instrument};

use crate::config::TreeType;
use crate::error::ForestError;
use crate::forest::Forest;

/// Current binary format version.
const FORMAT_VERSION: u32 = 1;

/// Versioned envelope for a serialized forest.
#[derive(serde::Serialize, serde::Deserialize)]
struct ForestEnvelope {
    /// Format version for compatibility checking.
    format_version: u32,
    tree_type: TreeType,
    n_trees: usize,
    n_features: usize,
    forest: Forest,
}

/// Borrowing twin of [`ForestEnvelope`]; bincode writes both identically.
#[derive(serde::Serialize)]
struct ForestEnvelopeRef<'a> {
    format_version: u32,
    tree_type: TreeType,
    n_trees: usize,
    n_features: usize,
    forest: &'a Forest,
}

impl Forest {
    /// Encode the forest as bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::SerializeModel`] if bincode encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ForestError> {
        let envelope = ForestEnvelopeRef {
            format_version: FORMAT_VERSION,
            tree_type: self.tree_type,
            n_trees: self.trees.len(),
            n_features: self.n_features,
            forest: self,
        };
        bincode::serialize(&envelope).map_err(|e| ForestError::SerializeModel { source: e })
    }

    /// Decode a forest written by [`to_bytes`](Self::to_bytes).
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::DeserializeModel`] | bincode decoding failed |
    /// | [`ForestError::IncompatibleModelVersion`] | format version mismatch |
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ForestError> {
        // The version leads the payload, so it can be checked before decoding the rest.
        let format_version: u32 = bincode::deserialize(bytes)
            .map_err(|e| ForestError::DeserializeModel { source: e })?;
        if format_version != FORMAT_VERSION {
            return Err(ForestError::IncompatibleModelVersion {
                expected: FORMAT_VERSION,
                found: format_version,
            });
        }

        let envelope: ForestEnvelope = bincode::deserialize(bytes)
            .map_err(|e| ForestError::DeserializeModel { source: e })?;
        debug!(
            tree_type = ?envelope.tree_type,
            n_trees = envelope.n_trees,
            n_features = envelope.n_features,
            "forest decoded"
        );
        Ok(envelope.forest)
    }

    /// Save the forest to a binary file.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::SerializeModel`] | bincode encoding failed |
    /// | [`ForestError::WriteModel`] | file write failed |
    #[instrument(skip(self), fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ForestError> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        std::fs::write(path, &bytes).map_err(|e| ForestError::WriteModel {
            path: path.to_path_buf(),
            source: e,
        })?;

        info!(
            size_bytes = bytes.len(),
            n_trees = self.trees.len(),
            "forest saved"
        );
        Ok(())
    }

    /// Load a forest from a binary file.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::ReadModel`] | file read failed |
    /// | [`ForestError::DeserializeModel`] | bincode decoding failed |
    /// | [`ForestError::IncompatibleModelVersion`] | format version mismatch |
    #[instrument(fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ForestError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| ForestError::ReadModel {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use crate::config::ForestConfig;
    use crate::error::{ErrorKind, ForestError};
    use crate::forest::Forest;
    use crate::matrix::Matrix;
    use crate::predict::PredictionRequest;
    use crate::request::{Target, TrainingRequest};

    fn train_simple_forest() -> Forest {
        let x = vec![1.0, 2.0, 3.0, 4.0, 10.0, 11.0, 12.0, 13.0];
        let z = vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0];
        TrainingRequest::new(
            Matrix::from_columns(&[x, z]).unwrap(),
            Target::Classification(vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0]),
            ForestConfig::new(5).unwrap().with_seed(42),
        )
        .fit()
        .unwrap()
    }

    #[test]
    fn round_trip_identical_predictions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("forest.bin");
        let forest = train_simple_forest();

        forest.save(&path).unwrap();
        let loaded = Forest::load(&path).unwrap();

        let rows = Matrix::from_rows(&[vec![1.5, 0.0], vec![11.0, 1.0], vec![6.0, f64::NAN]]).unwrap();
        let request = PredictionRequest::new(rows);
        assert_eq!(
            forest.predict(&request).unwrap(),
            loaded.predict(&request).unwrap()
        );
        assert_eq!(forest.trees(), loaded.trees());
    }

    #[test]
    fn bytes_round_trip() {
        let forest = train_simple_forest();
        let bytes = forest.to_bytes().unwrap();
        let restored = Forest::from_bytes(&bytes).unwrap();
        assert_eq!(restored.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn version_mismatch_is_rejected() {
        let mut bytes = train_simple_forest().to_bytes().unwrap();
        bytes[..4].copy_from_slice(&99_u32.to_le_bytes());
        let err = Forest::from_bytes(&bytes).unwrap_err();
        assert!(matches!(
            err,
            ForestError::IncompatibleModelVersion {
                expected: 1,
                found: 99
            }
        ));
        assert_eq!(err.kind(), ErrorKind::Persistence);
    }

    #[test]
    fn load_nonexistent_file_error() {
        let dir = TempDir::new().unwrap();
        let err = Forest::load(dir.path().join("missing.bin")).unwrap_err();
        assert!(matches!(err, ForestError::ReadModel { .. }));
    }

    #[test]
    fn load_corrupt_file_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corrupt.bin");
        std::fs::write(&path, [1_u8, 0, 0, 0, 7]).unwrap();
        let err = Forest::load(&path).unwrap_err();
        assert!(matches!(err, ForestError::DeserializeModel { .. }));
    }
}
