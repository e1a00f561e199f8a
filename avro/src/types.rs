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

//! Logic handling the intermediate representation of Avro values.
use crate::schema::{NodeId, Schema};
use serde_json::{Map, Number, Value as JsonValue};
use std::collections::HashMap;
use strum_macros::{Display, EnumDiscriminants};

/// A self-describing Avro value.
///
/// Used for record field defaults (in a writer schema or a target shape) and for encoding data
/// whose layout is only known at runtime.
#[derive(Clone, Debug, PartialEq, EnumDiscriminants)]
#[strum_discriminants(name(ValueKind), derive(Hash, Display))]
pub enum Value {
    Null,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bytes(Vec<u8>),
    String(String),
    /// `(size, bytes)`
    Fixed(usize, Vec<u8>),
    /// `(ordinal, symbol)`
    Enum(u32, String),
    Array(Vec<Value>),
    Map(HashMap<String, Value>),
    /// Fields in declaration order.
    Record(Vec<(String, Value)>),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        ValueKind::from(self)
    }

    /// Look up a field of a [`Value::Record`] by name.
    pub fn record_field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Record(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Convert a JSON default value to a `Value`, guided by the schema at `node`.
    ///
    /// Follows the Avro rules for field defaults: `bytes` and `fixed` defaults are strings whose
    /// code points are the byte values, enum defaults are symbols and a union default belongs to
    /// the first branch of the union.
    pub(crate) fn from_json_default(
        nodes: &[Schema],
        node: NodeId,
        json: &JsonValue,
    ) -> Result<Value, String> {
        let schema = nodes
            .get(node.index())
            .ok_or_else(|| format!("unknown schema node {node}"))?;
        let mismatch = || format!("{json} is not a valid default for {}", schema_kind_name(schema));

        match (schema, json) {
            (Schema::Null, JsonValue::Null) => Ok(Value::Null),
            (Schema::Boolean, JsonValue::Bool(b)) => Ok(Value::Boolean(*b)),
            (Schema::Int, JsonValue::Number(n)) => n
                .as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .map(Value::Int)
                .ok_or_else(mismatch),
            (Schema::Long, JsonValue::Number(n)) => n.as_i64().map(Value::Long).ok_or_else(mismatch),
            (Schema::Float, JsonValue::Number(n)) => {
                n.as_f64().map(|f| Value::Float(f as f32)).ok_or_else(mismatch)
            }
            (Schema::Double, JsonValue::Number(n)) => n.as_f64().map(Value::Double).ok_or_else(mismatch),
            (Schema::Bytes, JsonValue::String(s)) => code_points_to_bytes(s).map(Value::Bytes),
            (Schema::String, JsonValue::String(s)) => Ok(Value::String(s.clone())),
            (Schema::Fixed(fixed), JsonValue::String(s)) => {
                let bytes = code_points_to_bytes(s)?;
                if bytes.len() == fixed.size {
                    Ok(Value::Fixed(fixed.size, bytes))
                } else {
                    Err(format!(
                        "fixed {} expects {} bytes, the default has {}",
                        fixed.name,
                        fixed.size,
                        bytes.len()
                    ))
                }
            }
            (Schema::Enum(enum_schema), JsonValue::String(s)) => enum_schema
                .ordinal(s)
                .map(|ordinal| Value::Enum(ordinal, s.clone()))
                .ok_or_else(|| format!("{s} is not a symbol of enum {}", enum_schema.name)),
            (Schema::Array(items), JsonValue::Array(elements)) => elements
                .iter()
                .map(|element| Value::from_json_default(nodes, *items, element))
                .collect::<Result<_, _>>()
                .map(Value::Array),
            (Schema::Map(values), JsonValue::Object(entries)) => entries
                .iter()
                .map(|(key, value)| {
                    Value::from_json_default(nodes, *values, value).map(|v| (key.clone(), v))
                })
                .collect::<Result<_, _>>()
                .map(Value::Map),
            (Schema::Record(record), JsonValue::Object(entries)) => record
                .fields
                .iter()
                .map(|field| {
                    let value = match entries.get(&field.name) {
                        Some(json) => Value::from_json_default(nodes, field.schema, json)?,
                        None => field.default.clone().ok_or_else(|| {
                            format!("field {} of record {} is missing", field.name, record.name)
                        })?,
                    };
                    Ok((field.name.clone(), value))
                })
                .collect::<Result<_, String>>()
                .map(Value::Record),
            (Schema::Union(union), _) => match union.variants().first() {
                Some(first) => Value::from_json_default(nodes, *first, json),
                None => Err("an empty union has no default".to_string()),
            },
            _ => Err(mismatch()),
        }
    }

    /// Whether this value is a valid default for the schema at `node`.
    pub(crate) fn conforms_to(&self, nodes: &[Schema], node: NodeId) -> bool {
        let Some(schema) = nodes.get(node.index()) else {
            return false;
        };
        match (schema, self) {
            (Schema::Null, Value::Null)
            | (Schema::Boolean, Value::Boolean(_))
            | (Schema::Int, Value::Int(_))
            | (Schema::Long, Value::Long(_) | Value::Int(_))
            | (Schema::Float, Value::Float(_))
            | (Schema::Double, Value::Double(_) | Value::Float(_))
            | (Schema::Bytes, Value::Bytes(_))
            | (Schema::String, Value::String(_)) => true,
            (Schema::Fixed(fixed), Value::Fixed(size, bytes)) => {
                *size == fixed.size && bytes.len() == fixed.size
            }
            (Schema::Enum(enum_schema), Value::Enum(ordinal, symbol)) => {
                enum_schema.ordinal(symbol) == Some(*ordinal)
            }
            (Schema::Array(items), Value::Array(elements)) => {
                elements.iter().all(|e| e.conforms_to(nodes, *items))
            }
            (Schema::Map(values), Value::Map(entries)) => {
                entries.values().all(|v| v.conforms_to(nodes, *values))
            }
            (Schema::Record(record), Value::Record(entries)) => {
                record.fields.iter().all(|field| {
                    match entries.iter().find(|(name, _)| *name == field.name) {
                        Some((_, value)) => value.conforms_to(nodes, field.schema),
                        None => field.default.is_some(),
                    }
                })
            }
            (Schema::Union(union), value) => union
                .variants()
                .first()
                .is_some_and(|first| value.conforms_to(nodes, *first)),
            _ => false,
        }
    }

    /// The JSON form of this value, as it appears in a schema's `default` attribute.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Boolean(b) => JsonValue::Bool(*b),
            Value::Int(i) => JsonValue::from(*i),
            Value::Long(l) => JsonValue::from(*l),
            Value::Float(f) => Number::from_f64(f64::from(*f)).map_or(JsonValue::Null, JsonValue::Number),
            Value::Double(d) => Number::from_f64(*d).map_or(JsonValue::Null, JsonValue::Number),
            Value::Bytes(bytes) | Value::Fixed(_, bytes) => {
                JsonValue::String(bytes.iter().map(|b| char::from(*b)).collect())
            }
            Value::String(s) | Value::Enum(_, s) => JsonValue::String(s.clone()),
            Value::Array(items) => JsonValue::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(entries) => JsonValue::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect::<Map<_, _>>(),
            ),
            Value::Record(fields) => JsonValue::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect::<Map<_, _>>(),
            ),
        }
    }
}

fn schema_kind_name(schema: &Schema) -> String {
    crate::schema::SchemaKind::from(schema).to_string()
}

fn code_points_to_bytes(s: &str) -> Result<Vec<u8>, String> {
    s.chars()
        .map(|c| u8::try_from(u32::from(c)).map_err(|_| format!("code point {c:?} is above 255")))
        .collect()
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Self::Null
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
