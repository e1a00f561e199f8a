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

//! Writing values in the Avro binary encoding.
//!
//! An [`Encoder`] is positioned at one schema node. Calling one of its `encode_*` methods
//! consumes it: the value kind picks the union branch (see [`crate::matcher`]), the branch index
//! is written, then the value itself, converted to the chosen schema where the conversion is
//! allowed (an `i32` written to a `long` branch, a `&str` written to an `enum`, ...).
mod impls;
mod record;

pub use record::RecordEncoder;

use crate::{
    AvroResult, Error,
    error::Details,
    matcher::{Probe, select_branch},
    resolution::PlanCache,
    schema::{NodeId, Schema, SchemaGraph},
    shape::TargetShape,
    types::Value,
    util::{zig_i32, zig_i64},
};
use std::io::Write;

/// A type that can be written with an [`Encoder`].
pub trait AvroEncode {
    fn encode<W: Write>(&self, encoder: Encoder<'_, W>) -> AvroResult<()>;
}

pub(crate) fn encode_long<W: Write>(i: i64, writer: W) -> AvroResult<usize> {
    zig_i64(i, writer)
}

pub(crate) fn encode_int<W: Write>(i: i32, writer: W) -> AvroResult<usize> {
    zig_i32(i, writer)
}

pub(crate) fn encode_raw<W: Write>(bytes: &[u8], mut writer: W) -> AvroResult<usize> {
    writer.write_all(bytes).map_err(Details::WriteBytes)?;
    Ok(bytes.len())
}

pub(crate) fn encode_bytes<B: AsRef<[u8]> + ?Sized, W: Write>(s: &B, mut writer: W) -> AvroResult<usize> {
    let bytes = s.as_ref();
    let prefix = encode_long(bytes.len() as i64, &mut writer)?;
    Ok(prefix + encode_raw(bytes, writer)?)
}

/// Writes one value against one schema node.
pub struct Encoder<'a, W: Write> {
    graph: &'a SchemaGraph,
    plans: &'a PlanCache,
    writer: &'a mut W,
    schema: NodeId,
}

impl<'a, W: Write> Encoder<'a, W> {
    pub(crate) fn new(
        graph: &'a SchemaGraph,
        plans: &'a PlanCache,
        writer: &'a mut W,
        schema: NodeId,
    ) -> Self {
        Self {
            graph,
            plans,
            writer,
            schema,
        }
    }

    /// The schema node this encoder writes against.
    pub fn schema(&self) -> NodeId {
        self.schema
    }

    pub fn graph(&self) -> &'a SchemaGraph {
        self.graph
    }

    fn child(&mut self, schema: NodeId) -> Encoder<'_, W> {
        Encoder {
            graph: self.graph,
            plans: self.plans,
            writer: &mut *self.writer,
            schema,
        }
    }

    /// Pick the schema for `probe` and write the union branch index if there is one.
    fn select(&mut self, probe: &Probe<'_>) -> AvroResult<(NodeId, &'a Schema)> {
        let selection = select_branch(self.graph, self.schema, probe)?;
        if let Some(branch) = selection.branch {
            encode_long(branch as i64, &mut *self.writer)?;
        }
        Ok((selection.schema, self.graph.node(selection.schema)))
    }

    pub fn encode_null(mut self) -> AvroResult<()> {
        self.select(&Probe::Null)?;
        Ok(())
    }

    pub fn encode_bool(mut self, value: bool) -> AvroResult<()> {
        self.select(&Probe::Boolean)?;
        encode_raw(&[u8::from(value)], self.writer)?;
        Ok(())
    }

    pub fn encode_int(mut self, value: i32) -> AvroResult<()> {
        let (_, schema) = self.select(&Probe::Int)?;
        match schema {
            Schema::Int => encode_int(value, self.writer),
            Schema::Long => encode_long(i64::from(value), self.writer),
            Schema::Float => encode_raw(&(value as f32).to_le_bytes(), self.writer),
            Schema::Double => encode_raw(&f64::from(value).to_le_bytes(), self.writer),
            Schema::String => encode_bytes(&value.to_string(), self.writer),
            other => Err(unexpected(&Probe::Int, other)),
        }?;
        Ok(())
    }

    pub fn encode_long(mut self, value: i64) -> AvroResult<()> {
        let (_, schema) = self.select(&Probe::Long)?;
        match schema {
            Schema::Long => encode_long(value, self.writer),
            Schema::Float => encode_raw(&(value as f32).to_le_bytes(), self.writer),
            Schema::Double => encode_raw(&(value as f64).to_le_bytes(), self.writer),
            Schema::String => encode_bytes(&value.to_string(), self.writer),
            other => Err(unexpected(&Probe::Long, other)),
        }?;
        Ok(())
    }

    pub fn encode_float(mut self, value: f32) -> AvroResult<()> {
        let (_, schema) = self.select(&Probe::Float)?;
        match schema {
            Schema::Float => encode_raw(&value.to_le_bytes(), self.writer),
            Schema::Double => encode_raw(&f64::from(value).to_le_bytes(), self.writer),
            Schema::String => encode_bytes(&value.to_string(), self.writer),
            other => Err(unexpected(&Probe::Float, other)),
        }?;
        Ok(())
    }

    pub fn encode_double(mut self, value: f64) -> AvroResult<()> {
        let (_, schema) = self.select(&Probe::Double)?;
        match schema {
            Schema::Double => encode_raw(&value.to_le_bytes(), self.writer),
            Schema::String => encode_bytes(&value.to_string(), self.writer),
            other => Err(unexpected(&Probe::Double, other)),
        }?;
        Ok(())
    }

    pub fn encode_bytes(mut self, value: &[u8]) -> AvroResult<()> {
        let probe = Probe::Bytes(value);
        let (_, schema) = self.select(&probe)?;
        match schema {
            Schema::Bytes | Schema::String => encode_bytes(value, self.writer),
            Schema::Fixed(_) => encode_raw(value, self.writer),
            other => Err(unexpected(&probe, other)),
        }?;
        Ok(())
    }

    pub fn encode_str(mut self, value: &str) -> AvroResult<()> {
        let probe = Probe::String(value);
        let (_, schema) = self.select(&probe)?;
        match schema {
            Schema::String | Schema::Bytes => encode_bytes(value, self.writer),
            Schema::Fixed(_) => encode_raw(value.as_bytes(), self.writer),
            Schema::Enum(enum_schema) => {
                let ordinal = enum_schema.ordinal(value).ok_or_else(|| Details::UnknownEnumSymbol {
                    symbol: value.to_string(),
                    name: enum_schema.name.to_string(),
                })?;
                encode_long(i64::from(ordinal), self.writer)
            }
            other => Err(unexpected(&probe, other)),
        }?;
        Ok(())
    }

    /// Write a fixed-size byte sequence, optionally declaring the full name of its type.
    pub fn encode_fixed(mut self, name: Option<&str>, value: &[u8]) -> AvroResult<()> {
        let probe = Probe::Fixed {
            name,
            size: value.len(),
        };
        let (_, schema) = self.select(&probe)?;
        match schema {
            Schema::Fixed(fixed) if fixed.size == value.len() => encode_raw(value, self.writer),
            Schema::Fixed(fixed) => Err(Details::FixedSizeMismatch {
                expected: fixed.size,
                actual: value.len(),
            }
            .into()),
            Schema::Bytes => encode_bytes(value, self.writer),
            other => Err(unexpected(&probe, other)),
        }?;
        Ok(())
    }

    /// Write an enum symbol, optionally declaring the full name of its type.
    pub fn encode_enum(mut self, name: Option<&str>, symbol: &str) -> AvroResult<()> {
        let probe = Probe::Enum { name, symbol };
        let (_, schema) = self.select(&probe)?;
        match schema {
            Schema::Enum(enum_schema) => {
                let ordinal = enum_schema.ordinal(symbol).ok_or_else(|| Details::UnknownEnumSymbol {
                    symbol: symbol.to_string(),
                    name: enum_schema.name.to_string(),
                })?;
                encode_long(i64::from(ordinal), self.writer)
            }
            Schema::String => encode_bytes(symbol, self.writer),
            other => Err(unexpected(&probe, other)),
        }?;
        Ok(())
    }

    /// Write all `items` as a single block followed by the terminating empty block.
    pub fn encode_array<'v, T, I>(mut self, items: I) -> AvroResult<()>
    where
        T: AvroEncode + ?Sized + 'v,
        I: IntoIterator<Item = &'v T>,
        I::IntoIter: ExactSizeIterator,
    {
        let (_, schema) = self.select(&Probe::Array)?;
        let Schema::Array(item_schema) = schema else {
            return Err(unexpected(&Probe::Array, schema));
        };
        let items = items.into_iter();
        if items.len() > 0 {
            encode_long(items.len() as i64, &mut *self.writer)?;
            for item in items {
                item.encode(self.child(*item_schema))?;
            }
        }
        encode_long(0, self.writer)?;
        Ok(())
    }

    /// Write all `entries` as a single block followed by the terminating empty block.
    pub fn encode_map<'v, T, I>(mut self, entries: I) -> AvroResult<()>
    where
        T: AvroEncode + ?Sized + 'v,
        I: IntoIterator<Item = (&'v str, &'v T)>,
        I::IntoIter: ExactSizeIterator,
    {
        let (_, schema) = self.select(&Probe::Map)?;
        let Schema::Map(value_schema) = schema else {
            return Err(unexpected(&Probe::Map, schema));
        };
        let entries = entries.into_iter();
        if entries.len() > 0 {
            encode_long(entries.len() as i64, &mut *self.writer)?;
            for (key, value) in entries {
                encode_bytes(key, &mut *self.writer)?;
                value.encode(self.child(*value_schema))?;
            }
        }
        encode_long(0, self.writer)?;
        Ok(())
    }

    /// Write a record whose fields are described by `shape`.
    ///
    /// `fields` pushes every field by its index in `shape` through the [`RecordEncoder`]; the
    /// bytes reach the writer in the order of the writer schema.
    pub fn encode_record<F>(mut self, shape: &'static TargetShape, fields: F) -> AvroResult<()>
    where
        F: FnOnce(&mut RecordEncoder<'_, W>) -> AvroResult<()>,
    {
        let probe = Probe::Record {
            name: Some(&shape.name),
            aliases: &shape.aliases,
        };
        let (node, schema) = self.select(&probe)?;
        let Schema::Record(record) = schema else {
            return Err(unexpected(&probe, schema));
        };
        let plan = self.plans.get_or_resolve(self.graph, node, shape)?;
        plan.ensure_encodable()?;

        let mut encoder = RecordEncoder::new(self.graph, self.plans, self.writer, record, plan)?;
        fields(&mut encoder)?;
        encoder.finish()
    }

    /// Write a self-describing [`Value`].
    pub fn encode_value(mut self, value: &Value) -> AvroResult<()> {
        match value {
            Value::Null => self.encode_null(),
            Value::Boolean(b) => self.encode_bool(*b),
            Value::Int(i) => self.encode_int(*i),
            Value::Long(l) => self.encode_long(*l),
            Value::Float(f) => self.encode_float(*f),
            Value::Double(d) => self.encode_double(*d),
            Value::Bytes(bytes) => self.encode_bytes(bytes),
            Value::String(s) => self.encode_str(s),
            Value::Fixed(_, bytes) => self.encode_fixed(None, bytes),
            Value::Enum(_, symbol) => self.encode_enum(None, symbol),
            Value::Array(items) => self.encode_array(items),
            Value::Map(entries) => self.encode_map(entries.iter().map(|(k, v)| (k.as_str(), v))),
            Value::Record(fields) => {
                let probe = Probe::Record {
                    name: None,
                    aliases: &[],
                };
                let (_, schema) = self.select(&probe)?;
                let Schema::Record(record) = schema else {
                    return Err(unexpected(&probe, schema));
                };
                for field in &record.fields {
                    let value = fields
                        .iter()
                        .find(|(name, _)| *name == field.name || field.aliases.contains(name))
                        .map(|(_, value)| value)
                        .or(field.default.as_ref())
                        .ok_or_else(|| Details::MissingWriterFields {
                            record: record.name.to_string(),
                            fields: vec![field.name.clone()],
                        })?;
                    self.child(field.schema)
                        .encode_value(value)
                        .map_err(|e| field_error(&record.name.to_string(), &field.name, None, e))?;
                }
                Ok(())
            }
        }
    }
}

fn unexpected(probe: &Probe<'_>, schema: &Schema) -> Error {
    Details::EncodeValueAsSchema {
        value_kind: probe.to_string(),
        supported_schema: vec![schema.into()],
    }
    .into()
}

pub(crate) fn field_error(record: &str, field: &str, target_index: Option<usize>, error: Error) -> Error {
    Details::RecordField {
        record: record.to_string(),
        field: field.to_string(),
        target_index,
        error: Box::new(error),
    }
    .into()
}
