//! Segment manifest: schema and format metadata carried in every strata
//! file footer.
//!
//! The manifest is what distinguishes a strata segment from a foreign
//! Parquet file. It is written once by [`crate::io::writer::SegmentWriter`],
//! parsed once per source by [`crate::io::reader::SegmentReader`], and from
//! then on treated as immutable and shared via `Arc`.
use arrow::datatypes::{Schema, SchemaRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::schema::{LogicalSchema, SchemaConvertError};

/// Footer key/value entry that holds the JSON-encoded manifest.
pub const MANIFEST_METADATA_KEY: &str = "strata.manifest";

/// Current manifest format version.
///
/// Bumped only when we make a breaking change to the JSON layout. Readers
/// refuse manifests written by a newer version.
pub const FORMAT_VERSION: u32 = 1;

/// Errors raised while encoding or decoding a manifest.
#[derive(Debug, Snafu)]
pub enum ManifestError {
    /// Serializing the manifest to JSON failed.
    #[snafu(display("failed to encode manifest: {source}"))]
    Encode {
        /// Underlying serde error.
        source: serde_json::Error,
    },

    /// The footer entry was present but did not parse as a manifest.
    #[snafu(display("failed to decode manifest: {source}"))]
    Decode {
        /// Underlying serde error.
        source: serde_json::Error,
    },

    /// The segment was written by a newer, incompatible format version.
    #[snafu(display("unsupported manifest format version {version}"))]
    UnsupportedVersion {
        /// The version recorded in the segment footer.
        version: u32,
    },
}

/// Resolved schema and format metadata for one strata segment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Manifest {
    format_version: u32,
    created_at: DateTime<Utc>,
    schema: LogicalSchema,
}

impl Manifest {
    /// Create a manifest for a freshly written segment.
    ///
    /// Fills `created_at` with the current time and `format_version` with
    /// [`FORMAT_VERSION`].
    pub fn new(schema: LogicalSchema) -> Self {
        Manifest {
            format_version: FORMAT_VERSION,
            created_at: Utc::now(),
            schema,
        }
    }

    /// Create a manifest from an Arrow schema.
    ///
    /// Fails if the schema contains types outside the supported lattice.
    pub fn from_arrow_schema(schema: &Schema) -> Result<Self, SchemaConvertError> {
        Ok(Manifest::new(LogicalSchema::from_arrow(schema)?))
    }

    /// The on-disk manifest format version.
    pub fn format_version(&self) -> u32 {
        self.format_version
    }

    /// UTC timestamp recorded when the segment was written.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The logical schema of the segment.
    pub fn schema(&self) -> &LogicalSchema {
        &self.schema
    }

    /// Convert the manifest schema to the host-native Arrow representation.
    pub fn arrow_schema_ref(&self) -> Result<SchemaRef, SchemaConvertError> {
        self.schema.to_arrow_schema_ref()
    }

    /// Encode the manifest as the JSON payload stored in the footer.
    pub fn to_json(&self) -> Result<String, ManifestError> {
        serde_json::to_string(self).context(EncodeSnafu)
    }

    /// Decode a manifest from its footer JSON payload.
    ///
    /// Rejects payloads whose `format_version` is newer than
    /// [`FORMAT_VERSION`].
    pub fn from_json(json: &str) -> Result<Self, ManifestError> {
        let manifest: Manifest = serde_json::from_str(json).context(DecodeSnafu)?;
        ensure!(
            manifest.format_version <= FORMAT_VERSION,
            UnsupportedVersionSnafu {
                version: manifest.format_version,
            }
        );
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{LogicalDataType, LogicalField};
    use arrow::datatypes::{DataType, Field};

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn sample_logical_schema() -> LogicalSchema {
        LogicalSchema::new(vec![
            LogicalField {
                name: "id".to_string(),
                data_type: LogicalDataType::Int64,
                nullable: false,
            },
            LogicalField {
                name: "val".to_string(),
                data_type: LogicalDataType::Utf8,
                nullable: true,
            },
        ])
        .expect("valid logical schema")
    }

    #[test]
    fn json_roundtrip_preserves_manifest() -> TestResult {
        let manifest = Manifest::new(sample_logical_schema());
        let json = manifest.to_json()?;
        let back = Manifest::from_json(&json)?;
        assert_eq!(back, manifest);
        Ok(())
    }

    #[test]
    fn from_json_rejects_newer_format_version() -> TestResult {
        let manifest = Manifest::new(sample_logical_schema());
        let mut value: serde_json::Value = serde_json::from_str(&manifest.to_json()?)?;
        value["format_version"] = serde_json::json!(FORMAT_VERSION + 1);

        let err = Manifest::from_json(&value.to_string()).unwrap_err();
        assert!(
            matches!(err, ManifestError::UnsupportedVersion { version } if version == FORMAT_VERSION + 1),
            "unexpected error: {err:?}"
        );
        Ok(())
    }

    #[test]
    fn from_json_rejects_garbage_payload() {
        let err = Manifest::from_json("{not json").unwrap_err();
        assert!(matches!(err, ManifestError::Decode { .. }));
    }

    #[test]
    fn from_arrow_schema_fills_version_and_schema() -> TestResult {
        let arrow = Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("val", DataType::Utf8, true),
        ]);
        let manifest = Manifest::from_arrow_schema(&arrow)?;

        assert_eq!(manifest.format_version(), FORMAT_VERSION);
        assert_eq!(manifest.schema(), &sample_logical_schema());
        assert_eq!(manifest.arrow_schema_ref()?.as_ref(), &arrow);
        Ok(())
    }

    #[test]
    fn from_arrow_schema_rejects_unsupported_types() {
        let arrow = Schema::new(vec![Field::new(
            "tags",
            DataType::List(std::sync::Arc::new(Field::new(
                "item",
                DataType::Utf8,
                true,
            ))),
            true,
        )]);
        let err = Manifest::from_arrow_schema(&arrow).unwrap_err();
        assert!(matches!(err, SchemaConvertError::Unsupported { .. }));
    }
}
