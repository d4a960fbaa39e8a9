//! Logical schema model embedded in strata manifests.
//!
//! A manifest records the logical shape of a segment independently of the
//! physical Parquet encoding. This module models that shape as an ordered
//! list of fields over a closed set of data types, validates it on
//! construction, and converts it to and from Arrow schemas. Conversion is
//! total on the supported type lattice and fails with a per-column error
//! for anything outside it; that failure is what makes writer construction
//! reject schemas the format cannot represent.
use std::{collections::HashSet, fmt, sync::Arc};

use arrow::datatypes::{DataType, Field, FieldRef, Schema, SchemaRef, TimeUnit};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

/// Units for logical timestamps recorded in the manifest.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LogicalTimestampUnit {
    /// Second precision timestamps.
    Seconds,
    /// Millisecond precision timestamps.
    Millis,
    /// Microsecond precision timestamps.
    Micros,
    /// Nanosecond precision timestamps.
    Nanos,
}

impl LogicalTimestampUnit {
    fn to_arrow_time_unit(self) -> TimeUnit {
        match self {
            LogicalTimestampUnit::Seconds => TimeUnit::Second,
            LogicalTimestampUnit::Millis => TimeUnit::Millisecond,
            LogicalTimestampUnit::Micros => TimeUnit::Microsecond,
            LogicalTimestampUnit::Nanos => TimeUnit::Nanosecond,
        }
    }

    fn from_arrow_time_unit(unit: TimeUnit) -> Self {
        match unit {
            TimeUnit::Second => LogicalTimestampUnit::Seconds,
            TimeUnit::Millisecond => LogicalTimestampUnit::Millis,
            TimeUnit::Microsecond => LogicalTimestampUnit::Micros,
            TimeUnit::Nanosecond => LogicalTimestampUnit::Nanos,
        }
    }
}

impl fmt::Display for LogicalTimestampUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalTimestampUnit::Seconds => write!(f, "s"),
            LogicalTimestampUnit::Millis => write!(f, "ms"),
            LogicalTimestampUnit::Micros => write!(f, "us"),
            LogicalTimestampUnit::Nanos => write!(f, "ns"),
        }
    }
}

/// Structural errors raised when assembling a logical schema.
#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum LogicalSchemaError {
    /// The field list was empty; a segment must have at least one column.
    #[snafu(display("logical schema must contain at least one column"))]
    Empty,

    /// Two fields share the same column name.
    #[snafu(display("duplicate column name {name} in logical schema"))]
    DuplicateColumn {
        /// The column name that appeared more than once.
        name: String,
    },
}

/// Errors raised while converting between logical and Arrow schemas.
#[derive(Debug, Snafu)]
pub enum SchemaConvertError {
    /// The Arrow data type has no counterpart in the supported lattice.
    #[snafu(display("column {column} has unsupported data type {datatype:?}"))]
    Unsupported {
        /// Name of the offending column.
        column: String,
        /// The Arrow data type that could not be mapped.
        datatype: DataType,
    },

    /// A fixed-size binary column declared a non-positive byte width.
    #[snafu(display("column {column} has invalid fixed binary width {byte_width}"))]
    FixedBinaryInvalidWidth {
        /// Name of the offending column.
        column: String,
        /// The declared byte width.
        byte_width: i32,
    },

    /// The converted field list is itself structurally invalid.
    #[snafu(transparent)]
    Invalid {
        /// Underlying structural error.
        source: LogicalSchemaError,
    },
}

/// Logical column definition in a manifest schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogicalField {
    /// Column name as stored in the manifest.
    pub name: String,
    /// Logical data type for the column.
    pub data_type: LogicalDataType,
    /// Whether the column allows null values.
    pub nullable: bool,
}

impl LogicalField {
    fn from_arrow(field: &Field) -> Result<Self, SchemaConvertError> {
        let data_type = LogicalDataType::from_arrow(field.name(), field.data_type())?;
        Ok(LogicalField {
            name: field.name().clone(),
            data_type,
            nullable: field.is_nullable(),
        })
    }

    fn to_arrow_field_ref(&self) -> Result<FieldRef, SchemaConvertError> {
        let dt = self.data_type.to_arrow_datatype(&self.name)?;
        Ok(Arc::new(Field::new(self.name.clone(), dt, self.nullable)))
    }
}

impl fmt::Display for LogicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nullable {
            write!(f, "{}?: {}", self.name, self.data_type)
        } else {
            write!(f, "{}: {}", self.name, self.data_type)
        }
    }
}

/// Logical data types representable in a strata manifest.
///
/// This is a deliberately closed lattice: every variant round-trips through
/// both the JSON manifest encoding and the physical Parquet encoding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum LogicalDataType {
    /// Boolean value.
    Bool,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// 32-bit floating point.
    Float32,
    /// 64-bit floating point.
    Float64,
    /// UTF-8 encoded string.
    Utf8,
    /// Variable-length binary data.
    Binary,
    /// Fixed-length binary data.
    FixedBinary {
        /// Fixed byte width for each value.
        byte_width: i32,
    },
    /// Days since the UNIX epoch.
    Date32,
    /// Timestamp value with a precision unit and optional timezone.
    Timestamp {
        /// Timestamp precision unit.
        unit: LogicalTimestampUnit,
        /// Optional IANA timezone identifier.
        timezone: Option<String>,
    },
}

impl LogicalDataType {
    fn from_arrow(column: &str, datatype: &DataType) -> Result<Self, SchemaConvertError> {
        Ok(match datatype {
            DataType::Boolean => LogicalDataType::Bool,
            DataType::Int32 => LogicalDataType::Int32,
            DataType::Int64 => LogicalDataType::Int64,
            DataType::Float32 => LogicalDataType::Float32,
            DataType::Float64 => LogicalDataType::Float64,
            DataType::Utf8 => LogicalDataType::Utf8,
            DataType::Binary => LogicalDataType::Binary,
            DataType::Date32 => LogicalDataType::Date32,

            DataType::FixedSizeBinary(byte_width) => {
                ensure!(
                    *byte_width > 0,
                    FixedBinaryInvalidWidthSnafu {
                        column,
                        byte_width: *byte_width,
                    }
                );
                LogicalDataType::FixedBinary {
                    byte_width: *byte_width,
                }
            }

            DataType::Timestamp(unit, timezone) => LogicalDataType::Timestamp {
                unit: LogicalTimestampUnit::from_arrow_time_unit(*unit),
                timezone: timezone.as_ref().map(|tz| tz.to_string()),
            },

            other => {
                return UnsupportedSnafu {
                    column,
                    datatype: other.clone(),
                }
                .fail();
            }
        })
    }

    fn to_arrow_datatype(&self, column: &str) -> Result<DataType, SchemaConvertError> {
        Ok(match self {
            LogicalDataType::Bool => DataType::Boolean,
            LogicalDataType::Int32 => DataType::Int32,
            LogicalDataType::Int64 => DataType::Int64,
            LogicalDataType::Float32 => DataType::Float32,
            LogicalDataType::Float64 => DataType::Float64,
            LogicalDataType::Utf8 => DataType::Utf8,
            LogicalDataType::Binary => DataType::Binary,
            LogicalDataType::Date32 => DataType::Date32,

            LogicalDataType::FixedBinary { byte_width } => {
                ensure!(
                    *byte_width > 0,
                    FixedBinaryInvalidWidthSnafu {
                        column,
                        byte_width: *byte_width,
                    }
                );
                DataType::FixedSizeBinary(*byte_width)
            }

            LogicalDataType::Timestamp { unit, timezone } => {
                let tz: Option<Arc<str>> = timezone.as_ref().map(|s| Arc::<str>::from(s.as_str()));
                DataType::Timestamp(unit.to_arrow_time_unit(), tz)
            }
        })
    }
}

impl fmt::Display for LogicalDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalDataType::Bool => write!(f, "bool"),
            LogicalDataType::Int32 => write!(f, "int32"),
            LogicalDataType::Int64 => write!(f, "int64"),
            LogicalDataType::Float32 => write!(f, "float32"),
            LogicalDataType::Float64 => write!(f, "float64"),
            LogicalDataType::Utf8 => write!(f, "utf8"),
            LogicalDataType::Binary => write!(f, "binary"),
            LogicalDataType::FixedBinary { byte_width } => {
                write!(f, "fixed_binary[{byte_width}]")
            }
            LogicalDataType::Date32 => write!(f, "date32"),
            LogicalDataType::Timestamp { unit, timezone } => match timezone {
                Some(tz) => write!(f, "timestamp[{unit}, {tz}]"),
                None => write!(f, "timestamp[{unit}]"),
            },
        }
    }
}

/// Ordered, validated set of logical fields describing one segment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogicalSchema {
    fields: Vec<LogicalField>,
}

impl LogicalSchema {
    /// Build a schema from a field list, rejecting empty lists and
    /// duplicate column names.
    pub fn new(fields: Vec<LogicalField>) -> Result<Self, LogicalSchemaError> {
        ensure!(!fields.is_empty(), EmptySnafu);

        let mut seen = HashSet::with_capacity(fields.len());
        for field in &fields {
            ensure!(
                seen.insert(field.name.as_str()),
                DuplicateColumnSnafu {
                    name: field.name.clone(),
                }
            );
        }

        Ok(LogicalSchema { fields })
    }

    /// The fields of this schema, in declaration order.
    pub fn fields(&self) -> &[LogicalField] {
        &self.fields
    }

    /// Derive a logical schema from an Arrow schema.
    ///
    /// Fails with [`SchemaConvertError::Unsupported`] for any column whose
    /// Arrow type lies outside the supported lattice.
    pub fn from_arrow(schema: &Schema) -> Result<Self, SchemaConvertError> {
        let mut fields = Vec::with_capacity(schema.fields().len());
        for field in schema.fields() {
            fields.push(LogicalField::from_arrow(field)?);
        }
        Ok(LogicalSchema::new(fields)?)
    }

    /// Convert this schema to a shared Arrow [`SchemaRef`].
    pub fn to_arrow_schema_ref(&self) -> Result<SchemaRef, SchemaConvertError> {
        let fields = self
            .fields
            .iter()
            .map(LogicalField::to_arrow_field_ref)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Arc::new(Schema::new(fields)))
    }
}
