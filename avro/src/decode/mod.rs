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

//! Reading values from the Avro binary encoding.
//!
//! A type implementing [`AvroDecode`] asks a [`Decoder`] for the kind of value it wants. The
//! [`BinaryDecoder`] reads the bytes as the writer schema dictates and converts them to the
//! requested kind where the conversion is allowed (an `int` read as an `i64`, an `enum` read as a
//! `String`, ...). Record fields are delivered by their index in the [`TargetShape`]; fields the
//! writer did not write come from the default recorded in the shape, decoded through a
//! [`ValueDecoder`].
mod binary;
mod impls;
mod source;
mod value;

pub use binary::{BinaryDecoder, BinaryRecord};
pub use value::{ValueDecoder, ValueRecord};

pub(crate) use source::Source;

use crate::{AvroResult, error::Details, shape::TargetShape};

/// A type that can be read with a [`Decoder`].
pub trait AvroDecode: Sized {
    fn decode<D: Decoder>(decoder: D) -> AvroResult<Self>;
}

/// A source of one value, positioned at one schema node.
///
/// Every method consumes the decoder and fails when the value found cannot be converted to the
/// requested kind.
pub trait Decoder: Sized {
    type Record: RecordAccess;

    fn decode_null(self) -> AvroResult<()>;
    fn decode_bool(self) -> AvroResult<bool>;
    fn decode_int(self) -> AvroResult<i32>;
    fn decode_long(self) -> AvroResult<i64>;
    fn decode_float(self) -> AvroResult<f32>;
    fn decode_double(self) -> AvroResult<f64>;
    fn decode_bytes(self) -> AvroResult<Vec<u8>>;
    fn decode_string(self) -> AvroResult<String>;

    /// Read exactly `size` bytes written as `fixed` (or as `bytes` of that length).
    fn decode_fixed(self, size: usize) -> AvroResult<Vec<u8>>;

    /// Read an enum symbol and return its position in `symbols`, the symbols of the target enum
    /// type `name`.
    fn decode_enum(self, name: &str, symbols: &[&str]) -> AvroResult<usize>;

    /// `None` when the value is `null`, else the decoded value.
    fn decode_option<T: AvroDecode>(self) -> AvroResult<Option<T>>;

    fn decode_array<T: AvroDecode>(self) -> AvroResult<Vec<T>>;

    /// Map entries, in the order they were written.
    fn decode_map<T: AvroDecode>(self) -> AvroResult<Vec<(String, T)>>;

    /// Decode a record laid out as `shape`.
    ///
    /// `fields` pulls the fields through the [`RecordAccess`]. Fields it does not pull are
    /// consumed once it returns.
    fn decode_record<T, F>(self, shape: &'static TargetShape, fields: F) -> AvroResult<T>
    where
        F: FnOnce(&mut Self::Record) -> AvroResult<T>;

    /// Find out which of the named alternatives `names` was written.
    ///
    /// Returns its position in `names` and a decoder for the alternative's value. A name is
    /// either the full name (or an alias) of a named type or the name of a primitive type.
    fn decode_variant(self, names: &[&str]) -> AvroResult<(usize, Self)>;
}

/// Field by field access to a record being decoded.
pub trait RecordAccess {
    /// Index in the shape of the next available field, `None` once all fields were delivered.
    fn next_field(&mut self) -> AvroResult<Option<usize>>;

    /// The value of the field last returned by [`next_field`](Self::next_field).
    fn field_value<T: AvroDecode>(&mut self) -> AvroResult<T>;

    fn shape(&self) -> &'static TargetShape;
}

/// Unwrap a field that must have been delivered while decoding a record laid out as `shape`.
pub fn required<T>(value: Option<T>, shape: &TargetShape, index: usize) -> AvroResult<T> {
    value.ok_or_else(|| {
        Details::MissingRequiredField {
            record: shape.name.clone(),
            field: shape
                .field(index)
                .map(|f| f.name.clone())
                .unwrap_or_default(),
            target_index: index,
        }
        .into()
    })
}
