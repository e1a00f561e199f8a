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

use crate::{
    AvroResult, Error,
    decode::{AvroDecode, Decoder, RecordAccess},
    encode::field_error,
    error::Details,
    shape::TargetShape,
    types::Value,
};

/// Reads a field default that was recorded as a [`Value`].
///
/// Applies the same kind conversions as the binary decoder. A record value is matched against
/// the target shape by field name or alias, with the shape's own defaults for what it lacks.
pub struct ValueDecoder<'v> {
    value: &'v Value,
}

impl<'v> ValueDecoder<'v> {
    pub fn new(value: &'v Value) -> Self {
        Self { value }
    }

    fn mismatch(&self, requested: &'static str) -> Error {
        Details::DecodeDefaultAsKind {
            requested,
            value_kind: self.value.kind().to_string(),
        }
        .into()
    }
}

fn narrow<T: TryFrom<i64>>(value: i64, target: &'static str) -> AvroResult<T> {
    T::try_from(value).map_err(|_| Details::IntegerOutOfRange { value, target }.into())
}

impl<'v> Decoder for ValueDecoder<'v> {
    type Record = ValueRecord<'v>;

    fn decode_null(self) -> AvroResult<()> {
        match self.value {
            Value::Null => Ok(()),
            _ => Err(self.mismatch("null")),
        }
    }

    fn decode_bool(self) -> AvroResult<bool> {
        match self.value {
            Value::Boolean(b) => Ok(*b),
            _ => Err(self.mismatch("boolean")),
        }
    }

    fn decode_int(self) -> AvroResult<i32> {
        match self.value {
            Value::Int(i) => Ok(*i),
            Value::Long(l) => narrow(*l, "int"),
            _ => Err(self.mismatch("int")),
        }
    }

    fn decode_long(self) -> AvroResult<i64> {
        match self.value {
            Value::Int(i) => Ok(i64::from(*i)),
            Value::Long(l) => Ok(*l),
            _ => Err(self.mismatch("long")),
        }
    }

    fn decode_float(self) -> AvroResult<f32> {
        match self.value {
            Value::Int(i) => Ok(*i as f32),
            Value::Long(l) => Ok(*l as f32),
            Value::Float(f) => Ok(*f),
            _ => Err(self.mismatch("float")),
        }
    }

    fn decode_double(self) -> AvroResult<f64> {
        match self.value {
            Value::Int(i) => Ok(f64::from(*i)),
            Value::Long(l) => Ok(*l as f64),
            Value::Float(f) => Ok(f64::from(*f)),
            Value::Double(d) => Ok(*d),
            _ => Err(self.mismatch("double")),
        }
    }

    fn decode_bytes(self) -> AvroResult<Vec<u8>> {
        match self.value {
            Value::Bytes(bytes) | Value::Fixed(_, bytes) => Ok(bytes.clone()),
            Value::String(s) => Ok(s.as_bytes().to_vec()),
            _ => Err(self.mismatch("bytes")),
        }
    }

    fn decode_string(self) -> AvroResult<String> {
        match self.value {
            Value::String(s) | Value::Enum(_, s) => Ok(s.clone()),
            Value::Bytes(bytes) => {
                String::from_utf8(bytes.clone()).map_err(|e| Details::ConvertToUtf8(e).into())
            }
            Value::Int(i) => Ok(i.to_string()),
            Value::Long(l) => Ok(l.to_string()),
            Value::Float(f) => Ok(f.to_string()),
            Value::Double(d) => Ok(d.to_string()),
            _ => Err(self.mismatch("string")),
        }
    }

    fn decode_fixed(self, size: usize) -> AvroResult<Vec<u8>> {
        match self.value {
            Value::Fixed(_, bytes) | Value::Bytes(bytes) if bytes.len() == size => Ok(bytes.clone()),
            Value::Fixed(_, bytes) | Value::Bytes(bytes) => Err(Details::FixedSizeMismatch {
                expected: size,
                actual: bytes.len(),
            }
            .into()),
            _ => Err(self.mismatch("fixed")),
        }
    }

    fn decode_enum(self, name: &str, symbols: &[&str]) -> AvroResult<usize> {
        match self.value {
            Value::Enum(_, symbol) | Value::String(symbol) => symbols
                .iter()
                .position(|s| *s == symbol.as_str())
                .ok_or_else(|| {
                    Details::UnknownEnumSymbol {
                        symbol: symbol.clone(),
                        name: name.to_string(),
                    }
                    .into()
                }),
            _ => Err(self.mismatch("enum")),
        }
    }

    fn decode_option<T: AvroDecode>(self) -> AvroResult<Option<T>> {
        match self.value {
            Value::Null => Ok(None),
            _ => T::decode(self).map(Some),
        }
    }

    fn decode_array<T: AvroDecode>(self) -> AvroResult<Vec<T>> {
        match self.value {
            Value::Array(items) => items.iter().map(|v| T::decode(ValueDecoder::new(v))).collect(),
            _ => Err(self.mismatch("array")),
        }
    }

    fn decode_map<T: AvroDecode>(self) -> AvroResult<Vec<(String, T)>> {
        match self.value {
            Value::Map(entries) => entries
                .iter()
                .map(|(k, v)| Ok((k.clone(), T::decode(ValueDecoder::new(v))?)))
                .collect(),
            _ => Err(self.mismatch("map")),
        }
    }

    fn decode_record<T, F>(self, shape: &'static TargetShape, fields: F) -> AvroResult<T>
    where
        F: FnOnce(&mut Self::Record) -> AvroResult<T>,
    {
        let Value::Record(values) = self.value else {
            return Err(self.mismatch("record"));
        };
        let mut access = ValueRecord {
            shape,
            values,
            next: 0,
            pending: None,
        };
        fields(&mut access)
    }

    /// Primitive defaults pick the variant named after their kind. Any other default, or one whose
    /// kind no variant is named after, goes to the first variant.
    fn decode_variant(self, names: &[&str]) -> AvroResult<(usize, Self)> {
        let value = self.value;
        let by_kind = primitive_name(value).and_then(|kind| names.iter().position(|n| *n == kind));
        let index = match value {
            Value::Null => by_kind,
            _ => by_kind.or_else(|| (!names.is_empty()).then_some(0)),
        };
        index.map(|index| (index, self)).ok_or_else(|| {
            Details::UnknownUnionVariant {
                name: value.kind().to_string(),
                expected: names.iter().map(|n| n.to_string()).collect(),
            }
            .into()
        })
    }
}

/// The union branch name of a default that carries no type name of its own.
fn primitive_name(value: &Value) -> Option<&'static str> {
    Some(match value {
        Value::Null => "null",
        Value::Boolean(_) => "boolean",
        Value::Int(_) => "int",
        Value::Long(_) => "long",
        Value::Float(_) => "float",
        Value::Double(_) => "double",
        Value::Bytes(_) => "bytes",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Map(_) => "map",
        Value::Fixed(..) | Value::Enum(..) | Value::Record(_) => return None,
    })
}

/// The fields of a record default, in the order of the target shape.
pub struct ValueRecord<'v> {
    shape: &'static TargetShape,
    values: &'v [(String, Value)],
    next: usize,
    pending: Option<(usize, &'v Value)>,
}

impl<'v> ValueRecord<'v> {
    fn lookup(&self, index: usize) -> Option<&'v Value> {
        let field = self.shape.field(index)?;
        let values = self.values;
        values
            .iter()
            .find(|(name, _)| *name == field.name || field.aliases.contains(name))
            .map(|(_, value)| value)
    }
}

impl RecordAccess for ValueRecord<'_> {
    fn next_field(&mut self) -> AvroResult<Option<usize>> {
        self.pending = None;
        while let Some(field) = self.shape.field(self.next) {
            let index = self.next;
            self.next += 1;
            if let Some(value) = self.lookup(index).or(field.default.as_ref()) {
                self.pending = Some((index, value));
                return Ok(Some(index));
            }
            if !field.has_builtin_default {
                return Err(Details::MissingRequiredField {
                    record: self.shape.name.clone(),
                    field: field.name.clone(),
                    target_index: index,
                }
                .into());
            }
        }
        Ok(None)
    }

    fn field_value<T: AvroDecode>(&mut self) -> AvroResult<T> {
        let (index, value) = self.pending.take().ok_or(Details::NoPendingField)?;
        T::decode(ValueDecoder::new(value)).map_err(|e| {
            field_error(&self.shape.name, &self.shape.fields[index].name, Some(index), e)
        })
    }

    fn shape(&self) -> &'static TargetShape {
        self.shape
    }
}
