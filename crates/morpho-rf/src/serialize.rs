//! Model persistence via bincode.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::ForestError;
use crate::forest::RandomForest;

/// Bumped whenever the serialized layout of [`RandomForest`] changes.
const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    format_version: u32,
    forest: &'a RandomForest,
}

#[derive(Deserialize)]
struct Envelope {
    format_version: u32,
    forest: RandomForest,
}

/// Decode only the leading version field so a layout change is reported as
/// a version mismatch rather than a decode error.
#[derive(Deserialize)]
struct VersionProbe {
    format_version: u32,
}

impl RandomForest {
    /// Write the model to a binary file.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::SerializeModel`] | bincode encoding failed |
    /// | [`ForestError::WriteModel`] | the file could not be written |
    #[instrument(skip(self), fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ForestError> {
        let path = path.as_ref();
        let envelope = EnvelopeRef {
            format_version: FORMAT_VERSION,
            forest: self,
        };
        let bytes = bincode::serialize(&envelope).map_err(|source| ForestError::SerializeModel { source })?;
        std::fs::write(path, &bytes).map_err(|source| ForestError::WriteModel {
            path: path.to_path_buf(),
            source,
        })?;
        info!(size_bytes = bytes.len(), n_trees = self.trees.len(), "model saved");
        Ok(())
    }

    /// Read a model written by [`RandomForest::save`].
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::ReadModel`] | the file could not be read |
    /// | [`ForestError::DeserializeModel`] | bincode decoding failed |
    /// | [`ForestError::IncompatibleModelVersion`] | the file was written by another format version |
    #[instrument(fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ForestError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| ForestError::ReadModel {
            path: path.to_path_buf(),
            source,
        })?;
        let decode_error = |source| ForestError::DeserializeModel {
            path: path.to_path_buf(),
            source,
        };

        let probe: VersionProbe = bincode::deserialize(&bytes).map_err(decode_error)?;
        if probe.format_version != FORMAT_VERSION {
            return Err(ForestError::IncompatibleModelVersion {
                expected: FORMAT_VERSION,
                found: probe.format_version,
                path: path.to_path_buf(),
            });
        }
        let envelope: Envelope = bincode::deserialize(&bytes).map_err(decode_error)?;

        debug!(
            format_version = envelope.format_version,
            n_trees = envelope.forest.n_trees(),
            n_classes = envelope.forest.n_classes(),
            "model loaded"
        );
        Ok(envelope.forest)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::config::RandomForestConfig;

    fn small_forest() -> RandomForest {
        let features = vec![
            vec![1.0, 0.0],
            vec![2.0, 0.0],
            vec![3.0, 0.0],
            vec![10.0, 0.0],
            vec![11.0, 0.0],
            vec![12.0, 0.0],
        ];
        RandomForestConfig::new(5)
            .unwrap()
            .fit(&features, &[0, 0, 0, 1, 1, 1], &["x".to_string(), "y".to_string()])
            .unwrap()
            .into_forest()
            .with_class_names(vec!["elliptical".into(), "spiral".into()])
            .unwrap()
    }

    #[test]
    fn saved_model_predicts_identically() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.bin");
        let forest = small_forest();
        forest.save(&path).unwrap();
        let loaded = RandomForest::load(&path).unwrap();

        assert_eq!(loaded.class_names(), forest.class_names());
        assert_eq!(loaded.feature_names(), forest.feature_names());
        for sample in [[1.5, 0.0], [11.0, 0.0], [6.0, 0.0]] {
            assert_eq!(
                forest.predict_proba(&sample).unwrap(),
                loaded.predict_proba(&sample).unwrap()
            );
        }
    }

    #[test]
    fn saved_file_leads_with_format_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.bin");
        small_forest().save(&path).unwrap();
        let envelope: Envelope = bincode::deserialize(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(envelope.format_version, FORMAT_VERSION);
        assert_eq!(envelope.forest.n_trees(), 5);
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = TempDir::new().unwrap();
        let err = RandomForest::load(dir.path().join("absent.bin")).unwrap_err();
        assert!(matches!(err, ForestError::ReadModel { .. }));
    }

    #[test]
    fn truncated_file_is_decode_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("short.bin");
        std::fs::write(&path, [1u8, 0]).unwrap();
        let err = RandomForest::load(&path).unwrap_err();
        assert!(matches!(err, ForestError::DeserializeModel { .. }));
    }

    #[test]
    fn foreign_version_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("future.bin");
        std::fs::write(&path, 99u32.to_le_bytes()).unwrap();
        let err = RandomForest::load(&path).unwrap_err();
        assert!(matches!(err, ForestError::IncompatibleModelVersion { found: 99, .. }));
    }
}
