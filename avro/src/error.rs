// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use crate::schema::{Name, SchemaKind};
use std::{error::Error as _, fmt};
use strum_macros::Display;

/// Errors encountered by the codec.
///
/// To inspect the details of the error use [`details`](Self::details) or [`into_details`](Self::into_details)
/// to get a [`Details`] which contains more precise error information.
///
/// Every error is fatal to the encode/decode call that produced it. Avro binary data has no
/// resynchronization points, so nothing is retried or recovered internally.
#[derive(thiserror::Error, Debug)]
#[repr(transparent)]
#[error(transparent)]
pub struct Error {
    details: Box<Details>,
}

impl Error {
    pub fn new(details: Details) -> Self {
        Self {
            details: Box::new(details),
        }
    }

    pub fn details(&self) -> &Details {
        &self.details
    }

    pub fn into_details(self) -> Details {
        *self.details
    }

    /// The class of failure, see [`ErrorCategory`].
    pub fn category(&self) -> ErrorCategory {
        self.details.category()
    }
}

impl From<Details> for Error {
    fn from(details: Details) -> Self {
        Self::new(details)
    }
}

/// The coarse classification of a [`Details`] variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
pub enum ErrorCategory {
    /// The writer schema and the target shape cannot be reconciled.
    SchemaResolution,
    /// A value's kind has no compatible branch or target kind.
    TypeMismatch,
    /// The bytes on the wire violate the Avro binary encoding.
    MalformedWireData,
    /// The source ended before the schema-mandated number of bytes was read.
    TruncatedStream,
    /// Bytes were left over after a complete top-level datum.
    TrailingData,
    /// The schema itself is invalid.
    Schema,
    /// The underlying sink or source failed.
    Io,
}

#[derive(thiserror::Error)]
pub enum Details {
    #[error("Failed to parse schema from JSON")]
    ParseSchemaJson(#[source] serde_json::Error),

    #[error("Must be a JSON string, object or array")]
    ParseSchemaFromValidJson,

    #[error("Unknown primitive type or undefined named type: {0}")]
    ParsePrimitive(String),

    #[error("No `name` field")]
    GetNameField,

    #[error("No `name` in record field")]
    GetNameFieldFromRecord,

    #[error("No `type` field found in complex type")]
    GetComplexTypeField,

    #[error("Unknown complex type: {0}")]
    GetComplexType(serde_json::Value),

    #[error("No `fields` in record")]
    GetRecordFieldsJson,

    #[error("No `symbols` field in enum")]
    GetEnumSymbolsField,

    #[error("Unable to parse `symbols` in enum")]
    GetEnumSymbols,

    #[error("Duplicate enum symbol {0}")]
    EnumSymbolDuplicate(String),

    #[error("Invalid enum symbol name {0}")]
    EnumSymbolName(String),

    #[error("Default symbol {symbol} is not one of the enum symbols {symbols:?}")]
    GetEnumDefault {
        symbol: String,
        symbols: Vec<String>,
    },

    #[error("No `size` in fixed or it is not a non-negative integer: {0:?}")]
    GetFixedSizeField(Option<serde_json::Value>),

    #[error("No `items` in array")]
    GetArrayItemsField,

    #[error("No `values` in map")]
    GetMapValuesField,

    #[error("Invalid field name {0}")]
    FieldName(String),

    #[error("Duplicate field name {0}")]
    FieldNameDuplicate(String),

    #[error("Invalid schema name {0}. It must match the regex '{1}'")]
    InvalidSchemaName(String, &'static str),

    #[error("Invalid namespace {0}. It must match the regex '{1}'")]
    InvalidNamespace(String, &'static str),

    #[error("Two named schema defined for same fullname: {0}.")]
    AmbiguousSchemaDefinition(Name),

    #[error("Unions cannot contain duplicate types, found more than one {0}")]
    GetUnionDuplicate(SchemaKind),

    #[error("Unions must contain at least one type")]
    EmptyUnion,

    #[error("Schema node {index} does not exist in a graph of {len} nodes")]
    UnknownNode { index: usize, len: usize },

    #[error("Default value {default} of field {field} in record {record} is not valid for schema {schema}: {reason}")]
    GetDefaultRecordField {
        field: String,
        record: String,
        default: serde_json::Value,
        schema: SchemaKind,
        reason: String,
    },

    #[error("Target shape {shape} declares the name or alias {name} more than once")]
    DuplicateShapeField { shape: String, name: String },

    #[error(
        "Writer fields {first} and {second} of record {record} both resolve to target field {target}"
    )]
    AmbiguousAliasCollision {
        record: String,
        target: String,
        first: String,
        second: String,
    },

    #[error(
        "Target field {field} (index {target_index}) has no counterpart in writer record {record} and no default value"
    )]
    MissingRequiredField {
        record: String,
        field: String,
        target_index: usize,
    },

    #[error(
        "Writer fields {fields:?} of record {record} have no counterpart in the target shape and no default value"
    )]
    MissingWriterFields { record: String, fields: Vec<String> },

    #[error("Only record schemas can be resolved against a target shape, got {0}")]
    ResolveNonRecord(SchemaKind),

    #[error("Target field index {index} is out of bounds for shape {shape} with {len} fields")]
    UnknownTargetIndex {
        shape: String,
        index: usize,
        len: usize,
    },

    #[error("Target field {field} (index {target_index}) was encoded more than once")]
    FieldEncodedTwice { field: String, target_index: usize },

    #[error("Target field {field} (index {target_index}) was never encoded")]
    FieldNotEncoded { field: String, target_index: usize },

    #[error("Requested a field value while no field is pending")]
    NoPendingField,

    #[error("Can only encode value type {value_kind} as one of {supported_schema:?}")]
    EncodeValueAsSchema {
        value_kind: String,
        supported_schema: Vec<SchemaKind>,
    },

    #[error("Value type {value_kind} matches several union branches {branches:?}")]
    AmbiguousUnionBranch {
        value_kind: String,
        branches: Vec<usize>,
    },

    #[error("Cannot decode a {requested} from data written as {writer}")]
    DecodeAsKind {
        requested: &'static str,
        writer: SchemaKind,
    },

    #[error("Cannot decode a {requested} from a default value of type {value_kind}")]
    DecodeDefaultAsKind {
        requested: &'static str,
        value_kind: String,
    },

    #[error("Value {value} does not fit in a {target}")]
    IntegerOutOfRange { value: i64, target: &'static str },

    #[error("Symbol {symbol} is not part of enum {name}")]
    UnknownEnumSymbol { symbol: String, name: String },

    #[error("Expected fixed of size {expected}, got {actual} bytes")]
    FixedSizeMismatch { expected: usize, actual: usize },

    #[error("Written union branch {name} is not one of the expected variants {expected:?}")]
    UnknownUnionVariant {
        name: String,
        expected: Vec<String>,
    },

    #[error("Invalid utf-8 string")]
    ConvertToUtf8(#[source] std::string::FromUtf8Error),

    #[error("Variable-length integer at byte {offset} is longer than {max_bytes} bytes")]
    CorruptVarint { offset: u64, max_bytes: usize },

    #[error("Int value {value} at byte {offset} does not fit in 32 bits")]
    ZagI32 { value: i64, offset: u64 },

    #[error("Invalid u8 for bool at byte {offset}: {value}")]
    BoolValue { value: u8, offset: u64 },

    #[error("Negative length {length} at byte {offset}")]
    NegativeLength { length: i64, offset: u64 },

    #[error("Union index {index} at byte {offset} out of bounds: {num_variants}")]
    GetUnionVariant {
        index: i64,
        num_variants: usize,
        offset: u64,
    },

    #[error("Enum ordinal {ordinal} at byte {offset} out of bounds: {num_symbols}")]
    EnumOrdinalOutOfRange {
        ordinal: i64,
        num_symbols: usize,
        offset: u64,
    },

    #[error("Unable to allocate {desired} bytes (maximum allowed: {maximum})")]
    MemoryAllocation { desired: usize, maximum: usize },

    #[error("Source ended at byte {offset} while {needed} more bytes were required")]
    TruncatedStream { offset: u64, needed: usize },

    #[error("Decoded a complete datum from {consumed} bytes but {remaining} bytes remain")]
    TrailingData { consumed: u64, remaining: usize },

    #[error("Failed to read bytes: {0}")]
    ReadBytes(#[source] std::io::Error),

    #[error("Failed to write bytes: {0}")]
    WriteBytes(#[source] std::io::Error),

    #[error("Failed to process field {field} (target index {target_index:?}) of record {record}")]
    RecordField {
        record: String,
        field: String,
        target_index: Option<usize>,
        #[source]
        error: Box<Error>,
    },
}

impl Details {
    /// The class of failure this variant belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Details::ParseSchemaJson(_)
            | Details::ParseSchemaFromValidJson
            | Details::ParsePrimitive(_)
            | Details::GetNameField
            | Details::GetNameFieldFromRecord
            | Details::GetComplexTypeField
            | Details::GetComplexType(_)
            | Details::GetRecordFieldsJson
            | Details::GetEnumSymbolsField
            | Details::GetEnumSymbols
            | Details::EnumSymbolDuplicate(_)
            | Details::EnumSymbolName(_)
            | Details::GetEnumDefault { .. }
            | Details::GetFixedSizeField(_)
            | Details::GetArrayItemsField
            | Details::GetMapValuesField
            | Details::FieldName(_)
            | Details::FieldNameDuplicate(_)
            | Details::InvalidSchemaName(_, _)
            | Details::InvalidNamespace(_, _)
            | Details::AmbiguousSchemaDefinition(_)
            | Details::GetUnionDuplicate(_)
            | Details::EmptyUnion
            | Details::UnknownNode { .. }
            | Details::GetDefaultRecordField { .. } => ErrorCategory::Schema,

            Details::DuplicateShapeField { .. }
            | Details::AmbiguousAliasCollision { .. }
            | Details::MissingRequiredField { .. }
            | Details::MissingWriterFields { .. }
            | Details::ResolveNonRecord(_)
            | Details::UnknownTargetIndex { .. }
            | Details::FieldEncodedTwice { .. }
            | Details::FieldNotEncoded { .. }
            | Details::NoPendingField => ErrorCategory::SchemaResolution,

            Details::EncodeValueAsSchema { .. }
            | Details::AmbiguousUnionBranch { .. }
            | Details::DecodeAsKind { .. }
            | Details::DecodeDefaultAsKind { .. }
            | Details::IntegerOutOfRange { .. }
            | Details::UnknownEnumSymbol { .. }
            | Details::FixedSizeMismatch { .. }
            | Details::UnknownUnionVariant { .. } => ErrorCategory::TypeMismatch,

            Details::ConvertToUtf8(_)
            | Details::CorruptVarint { .. }
            | Details::ZagI32 { .. }
            | Details::BoolValue { .. }
            | Details::NegativeLength { .. }
            | Details::GetUnionVariant { .. }
            | Details::EnumOrdinalOutOfRange { .. }
            | Details::MemoryAllocation { .. } => ErrorCategory::MalformedWireData,

            Details::TruncatedStream { .. } => ErrorCategory::TruncatedStream,
            Details::TrailingData { .. } => ErrorCategory::TrailingData,
            Details::ReadBytes(_) | Details::WriteBytes(_) => ErrorCategory::Io,

            Details::RecordField { error, .. } => error.category(),
        }
    }

    /// Strip [`Details::RecordField`] wrappers and return the innermost failure.
    pub fn root_cause(&self) -> &Details {
        match self {
            Details::RecordField { error, .. } => error.details().root_cause(),
            other => other,
        }
    }
}

impl fmt::Debug for Details {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut msg = self.to_string();
        if let Some(e) = self.source() {
            msg.extend([": ", &e.to_string()]);
        }
        write!(f, "{msg}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn record_field_wrapper_keeps_inner_category() {
        let inner = Error::new(Details::TruncatedStream {
            offset: 3,
            needed: 4,
        });
        let wrapped = Error::new(Details::RecordField {
            record: "test.Outer".to_string(),
            field: "payload".to_string(),
            target_index: Some(1),
            error: Box::new(inner),
        });

        assert_eq!(wrapped.category(), ErrorCategory::TruncatedStream);
        assert!(matches!(
            wrapped.details().root_cause(),
            Details::TruncatedStream { offset: 3, .. }
        ));
        assert!(format!("{:?}", wrapped.details()).contains("payload"));
    }

    #[test]
    fn categories_follow_the_taxonomy() {
        assert_eq!(
            Details::CorruptVarint {
                offset: 0,
                max_bytes: 5
            }
            .category(),
            ErrorCategory::MalformedWireData
        );
        assert_eq!(
            Details::TrailingData {
                consumed: 1,
                remaining: 2
            }
            .category(),
            ErrorCategory::TrailingData
        );
        assert_eq!(
            Details::NoPendingField.category(),
            ErrorCategory::SchemaResolution
        );
    }
}
