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
    decode::{AvroDecode, Decoder, RecordAccess, Source, ValueDecoder},
    encode::field_error,
    error::Details,
    resolution::{DecodingStep, PlanCache, ResolutionPlan},
    schema::{NodeId, RecordSchema, Schema, SchemaGraph, SchemaKind},
    shape::TargetShape,
    util::safe_len,
};
use log::trace;
use std::{io::Read, mem::size_of, sync::Arc};

/// Items reserved up front for one block; larger blocks grow as items arrive.
const MAX_PREALLOCATED_ITEMS: usize = 1024;

/// Reads one value written with the schema at one node of a [`SchemaGraph`].
pub struct BinaryDecoder<'a, R> {
    graph: &'a SchemaGraph,
    plans: &'a PlanCache,
    source: &'a mut Source<R>,
    schema: NodeId,
}

impl<'a, R: Read> BinaryDecoder<'a, R> {
    pub(crate) fn new(
        graph: &'a SchemaGraph,
        plans: &'a PlanCache,
        source: &'a mut Source<R>,
        schema: NodeId,
    ) -> Self {
        Self {
            graph,
            plans,
            source,
            schema,
        }
    }

    /// The writer schema node this decoder reads.
    pub fn schema(&self) -> NodeId {
        self.schema
    }

    fn child(&mut self, schema: NodeId) -> BinaryDecoder<'_, R> {
        BinaryDecoder {
            graph: self.graph,
            plans: self.plans,
            source: &mut *self.source,
            schema,
        }
    }

    /// Read the union branch index if the node is a union and return the schema of the value.
    fn resolve(&mut self) -> AvroResult<(NodeId, &'a Schema)> {
        let graph = self.graph;
        match graph.check(self.schema)? {
            Schema::Union(union) => {
                let offset = self.source.offset();
                let index = self.source.read_long()?;
                let node = usize::try_from(index)
                    .ok()
                    .and_then(|i| union.variants().get(i))
                    .ok_or(Details::GetUnionVariant {
                        index,
                        num_variants: union.variants().len(),
                        offset,
                    })?;
                trace!("Reading branch {index} of {}", self.schema);
                Ok((*node, graph.check(*node)?))
            }
            schema => Ok((self.schema, schema)),
        }
    }

    fn read_enum_symbol(&mut self, schema: &'a Schema) -> AvroResult<&'a str> {
        let Schema::Enum(enum_schema) = schema else {
            return Err(mismatch("enum", schema));
        };
        let offset = self.source.offset();
        let ordinal = self.source.read_int()?;
        usize::try_from(ordinal)
            .ok()
            .and_then(|i| enum_schema.symbols.get(i))
            .map(String::as_str)
            .ok_or_else(|| {
                Details::EnumOrdinalOutOfRange {
                    ordinal: i64::from(ordinal),
                    num_symbols: enum_schema.symbols.len(),
                    offset,
                }
                .into()
            })
    }
}

fn mismatch(requested: &'static str, writer: &Schema) -> Error {
    Details::DecodeAsKind {
        requested,
        writer: SchemaKind::from(writer),
    }
    .into()
}

/// Check that a block of `count` items fits in the allocation limit before making room for it.
fn reserve_block<T>(items: &mut Vec<T>, count: usize) -> AvroResult<()> {
    safe_len(count.saturating_mul(size_of::<T>()))?;
    items.reserve(count.min(MAX_PREALLOCATED_ITEMS));
    Ok(())
}

fn narrow<T: TryFrom<i64>>(value: i64, target: &'static str) -> AvroResult<T> {
    T::try_from(value).map_err(|_| Details::IntegerOutOfRange { value, target }.into())
}

/// The name a variant of a Rust enum uses for a union branch.
fn branch_name(schema: &Schema) -> &str {
    match schema {
        Schema::Null => "null",
        Schema::Boolean => "boolean",
        Schema::Int => "int",
        Schema::Long => "long",
        Schema::Float => "float",
        Schema::Double => "double",
        Schema::Bytes => "bytes",
        Schema::String => "string",
        Schema::Array(_) => "array",
        Schema::Map(_) => "map",
        Schema::Union(_) => "union",
        Schema::Fixed(_) | Schema::Enum(_) | Schema::Record(_) => {
            schema.name().map(|n| n.fullname()).unwrap_or_default()
        }
    }
}

impl<'a, R: Read> Decoder for BinaryDecoder<'a, R> {
    type Record = BinaryRecord<'a, R>;

    fn decode_null(mut self) -> AvroResult<()> {
        match self.resolve()?.1 {
            Schema::Null => Ok(()),
            other => Err(mismatch("null", other)),
        }
    }

    fn decode_bool(mut self) -> AvroResult<bool> {
        match self.resolve()?.1 {
            Schema::Boolean => self.source.read_bool(),
            other => Err(mismatch("boolean", other)),
        }
    }

    fn decode_int(mut self) -> AvroResult<i32> {
        match self.resolve()?.1 {
            Schema::Int => self.source.read_int(),
            Schema::Long => narrow(self.source.read_long()?, "int"),
            other => Err(mismatch("int", other)),
        }
    }

    fn decode_long(mut self) -> AvroResult<i64> {
        match self.resolve()?.1 {
            Schema::Int => self.source.read_int().map(i64::from),
            Schema::Long => self.source.read_long(),
            other => Err(mismatch("long", other)),
        }
    }

    fn decode_float(mut self) -> AvroResult<f32> {
        match self.resolve()?.1 {
            Schema::Int => Ok(self.source.read_int()? as f32),
            Schema::Long => Ok(self.source.read_long()? as f32),
            Schema::Float => self.source.read_float(),
            other => Err(mismatch("float", other)),
        }
    }

    fn decode_double(mut self) -> AvroResult<f64> {
        match self.resolve()?.1 {
            Schema::Int => Ok(f64::from(self.source.read_int()?)),
            Schema::Long => Ok(self.source.read_long()? as f64),
            Schema::Float => Ok(f64::from(self.source.read_float()?)),
            Schema::Double => self.source.read_double(),
            other => Err(mismatch("double", other)),
        }
    }

    fn decode_bytes(mut self) -> AvroResult<Vec<u8>> {
        match self.resolve()?.1 {
            Schema::Bytes | Schema::String => self.source.read_bytes(),
            Schema::Fixed(fixed) => self.source.read_fixed(fixed.size),
            other => Err(mismatch("bytes", other)),
        }
    }

    fn decode_string(mut self) -> AvroResult<String> {
        let schema = self.resolve()?.1;
        match schema {
            Schema::String | Schema::Bytes => self.source.read_string(),
            Schema::Int => Ok(self.source.read_int()?.to_string()),
            Schema::Long => Ok(self.source.read_long()?.to_string()),
            Schema::Float => Ok(self.source.read_float()?.to_string()),
            Schema::Double => Ok(self.source.read_double()?.to_string()),
            Schema::Enum(_) => self.read_enum_symbol(schema).map(str::to_string),
            other => Err(mismatch("string", other)),
        }
    }

    fn decode_fixed(mut self, size: usize) -> AvroResult<Vec<u8>> {
        let bytes = match self.resolve()?.1 {
            Schema::Fixed(fixed) if fixed.size != size => {
                return Err(Details::FixedSizeMismatch {
                    expected: size,
                    actual: fixed.size,
                }
                .into());
            }
            Schema::Fixed(_) => self.source.read_fixed(size)?,
            Schema::Bytes => self.source.read_bytes()?,
            other => return Err(mismatch("fixed", other)),
        };
        if bytes.len() == size {
            Ok(bytes)
        } else {
            Err(Details::FixedSizeMismatch {
                expected: size,
                actual: bytes.len(),
            }
            .into())
        }
    }

    fn decode_enum(mut self, name: &str, symbols: &[&str]) -> AvroResult<usize> {
        let schema = self.resolve()?.1;
        let symbol = match schema {
            Schema::Enum(enum_schema) => {
                let symbol = self.read_enum_symbol(schema)?;
                match enum_schema.default.as_deref() {
                    // Unknown to the reader: fall back to the writer's default symbol.
                    Some(default) if !symbols.contains(&symbol) && symbols.contains(&default) => {
                        default.to_string()
                    }
                    _ => symbol.to_string(),
                }
            }
            Schema::String => self.source.read_string()?,
            other => return Err(mismatch("enum", other)),
        };
        symbols
            .iter()
            .position(|s| *s == symbol)
            .ok_or_else(|| {
                Details::UnknownEnumSymbol {
                    symbol,
                    name: name.to_string(),
                }
                .into()
            })
    }

    fn decode_option<T: AvroDecode>(mut self) -> AvroResult<Option<T>> {
        let (node, schema) = self.resolve()?;
        if matches!(schema, Schema::Null) {
            return Ok(None);
        }
        T::decode(BinaryDecoder {
            schema: node,
            ..self
        })
        .map(Some)
    }

    fn decode_array<T: AvroDecode>(mut self) -> AvroResult<Vec<T>> {
        let schema = self.resolve()?.1;
        let Schema::Array(items) = schema else {
            return Err(mismatch("array", schema));
        };
        let mut values = Vec::new();
        loop {
            let (count, _) = self.source.read_block_header()?;
            if count == 0 {
                break;
            }
            reserve_block(&mut values, count)?;
            for _ in 0..count {
                values.push(T::decode(self.child(*items))?);
            }
        }
        Ok(values)
    }

    fn decode_map<T: AvroDecode>(mut self) -> AvroResult<Vec<(String, T)>> {
        let schema = self.resolve()?.1;
        let Schema::Map(values) = schema else {
            return Err(mismatch("map", schema));
        };
        let mut entries = Vec::new();
        loop {
            let (count, _) = self.source.read_block_header()?;
            if count == 0 {
                break;
            }
            reserve_block(&mut entries, count)?;
            for _ in 0..count {
                let key = self.source.read_string()?;
                let value = T::decode(self.child(*values))?;
                entries.push((key, value));
            }
        }
        Ok(entries)
    }

    fn decode_record<T, F>(mut self, shape: &'static TargetShape, fields: F) -> AvroResult<T>
    where
        F: FnOnce(&mut Self::Record) -> AvroResult<T>,
    {
        let (node, schema) = self.resolve()?;
        let Schema::Record(record) = schema else {
            return Err(mismatch("record", schema));
        };
        let plan = self.plans.get_or_resolve(self.graph, node, shape)?;
        plan.ensure_decodable()?;

        let mut access = BinaryRecord {
            graph: self.graph,
            plans: self.plans,
            source: self.source,
            record,
            plan,
            step: 0,
            pending: None,
        };
        let value = fields(&mut access)?;
        access.finish()?;
        Ok(value)
    }

    fn decode_variant(mut self, names: &[&str]) -> AvroResult<(usize, Self)> {
        let (node, schema) = self.resolve()?;
        let name = branch_name(schema);
        let index = names
            .iter()
            .position(|n| *n == name || schema.answers_to(n))
            .ok_or_else(|| Details::UnknownUnionVariant {
                name: name.to_string(),
                expected: names.iter().map(|n| n.to_string()).collect(),
            })?;
        Ok((
            index,
            BinaryDecoder {
                schema: node,
                ..self
            },
        ))
    }
}

/// The fields of a record being read, in the order the writer wrote them.
pub struct BinaryRecord<'a, R> {
    graph: &'a SchemaGraph,
    plans: &'a PlanCache,
    source: &'a mut Source<R>,
    record: &'a RecordSchema,
    plan: Arc<ResolutionPlan>,
    /// Position of the next step of the plan.
    step: usize,
    /// Step whose value was announced by `next_field` and not taken yet.
    pending: Option<usize>,
}

impl<R: Read> BinaryRecord<'_, R> {
    /// Consume the bytes of a field that was announced but not taken.
    fn discard_pending(&mut self) -> AvroResult<()> {
        let Some(step) = self.pending.take() else {
            return Ok(());
        };
        let plan = Arc::clone(&self.plan);
        if let DecodingStep::DeserializeWriterField {
            writer_index,
            schema,
            ..
        } = plan.decoding_steps()[step]
        {
            self.skip_writer_field(writer_index, schema)?;
        }
        Ok(())
    }

    fn skip_writer_field(&mut self, writer_index: usize, schema: NodeId) -> AvroResult<()> {
        skip_value(self.graph, self.source, schema).map_err(|e| {
            field_error(
                self.plan.record(),
                &self.record.fields[writer_index].name,
                None,
                e,
            )
        })
    }

    fn finish(mut self) -> AvroResult<()> {
        while self.next_field()?.is_some() {}
        Ok(())
    }
}

impl<R: Read> RecordAccess for BinaryRecord<'_, R> {
    fn next_field(&mut self) -> AvroResult<Option<usize>> {
        self.discard_pending()?;
        let plan = Arc::clone(&self.plan);
        while let Some(step) = plan.decoding_steps().get(self.step) {
            let current = self.step;
            self.step += 1;
            match step {
                DecodingStep::SkipWriterField {
                    writer_index,
                    schema,
                } => self.skip_writer_field(*writer_index, *schema)?,
                DecodingStep::DeserializeWriterField { target_index, .. }
                | DecodingStep::GetDefaultValue { target_index, .. } => {
                    self.pending = Some(current);
                    return Ok(Some(*target_index));
                }
                DecodingStep::IgnoreMissingElement { .. } => {}
                DecodingStep::MissingElementValueFailure { target_index, name } => {
                    return Err(Details::MissingRequiredField {
                        record: plan.record().to_string(),
                        field: name.clone(),
                        target_index: *target_index,
                    }
                    .into());
                }
            }
        }
        Ok(None)
    }

    fn field_value<T: AvroDecode>(&mut self) -> AvroResult<T> {
        let step = self.pending.take().ok_or(Details::NoPendingField)?;
        let plan = Arc::clone(&self.plan);
        match &plan.decoding_steps()[step] {
            DecodingStep::DeserializeWriterField {
                target_index,
                schema,
                ..
            } => T::decode(BinaryDecoder::new(
                self.graph,
                self.plans,
                &mut *self.source,
                *schema,
            ))
            .map_err(|e| {
                let field = &plan.shape().fields[*target_index].name;
                field_error(plan.record(), field, Some(*target_index), e)
            }),
            DecodingStep::GetDefaultValue {
                target_index,
                default,
            } => T::decode(ValueDecoder::new(default)).map_err(|e| {
                let field = &plan.shape().fields[*target_index].name;
                field_error(plan.record(), field, Some(*target_index), e)
            }),
            _ => Err(Details::NoPendingField.into()),
        }
    }

    fn shape(&self) -> &'static TargetShape {
        self.plan.shape()
    }
}

/// Consume one value written with the schema at `node` without materializing it.
pub(crate) fn skip_value<R: Read>(
    graph: &SchemaGraph,
    source: &mut Source<R>,
    node: NodeId,
) -> AvroResult<()> {
    match graph.check(node)? {
        Schema::Null => Ok(()),
        Schema::Boolean => source.read_bool().map(drop),
        Schema::Int | Schema::Enum(_) => source.read_int().map(drop),
        Schema::Long => source.read_long().map(drop),
        Schema::Float => source.skip(4),
        Schema::Double => source.skip(8),
        Schema::Bytes | Schema::String => {
            let len = source.read_len()?;
            source.skip(len)
        }
        Schema::Fixed(fixed) => source.skip(fixed.size),
        Schema::Array(items) => skip_blocks(source, |source| skip_value(graph, source, *items)),
        Schema::Map(values) => skip_blocks(source, |source| {
            let len = source.read_len()?;
            source.skip(len)?;
            skip_value(graph, source, *values)
        }),
        Schema::Record(record) => record
            .fields
            .iter()
            .try_for_each(|field| skip_value(graph, source, field.schema)),
        Schema::Union(union) => {
            let offset = source.offset();
            let index = source.read_long()?;
            let node = usize::try_from(index)
                .ok()
                .and_then(|i| union.variants().get(i))
                .ok_or(Details::GetUnionVariant {
                    index,
                    num_variants: union.variants().len(),
                    offset,
                })?;
            skip_value(graph, source, *node)
        }
    }
}

fn skip_blocks<R, F>(source: &mut Source<R>, mut skip_item: F) -> AvroResult<()>
where
    R: Read,
    F: FnMut(&mut Source<R>) -> AvroResult<()>,
{
    loop {
        match source.read_block_header()? {
            (0, _) => return Ok(()),
            // The writer recorded the size of the block, no need to look at the items.
            (_, Some(size)) => source.skip(size)?,
            (count, None) => {
                for _ in 0..count {
                    skip_item(source)?;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    type TestResult = anyhow::Result<()>;

    fn decode_with<T: AvroDecode>(schema: &str, bytes: &[u8]) -> AvroResult<T> {
        let graph = SchemaGraph::parse_str(schema)?;
        let plans = PlanCache::new();
        let mut source = Source::new(bytes);
        T::decode(BinaryDecoder::new(&graph, &plans, &mut source, graph.root()))
    }

    #[test]
    fn widening_coercions() -> TestResult {
        assert_eq!(decode_with::<i64>(r#""int""#, &[0x03])?, -2);
        assert_eq!(decode_with::<f64>(r#""float""#, &1.5f32.to_le_bytes())?, 1.5);
        assert_eq!(decode_with::<String>(r#""long""#, &[0x80, 0x01])?, "64");
        assert_eq!(decode_with::<String>(r#""bytes""#, &[0x02, b'a'])?, "a");
        Ok(())
    }

    #[test]
    fn long_to_int_is_range_checked() -> TestResult {
        assert_eq!(decode_with::<i32>(r#""long""#, &[0x04])?, 2);
        // zigzag(2^31) = 2^32
        let error = decode_with::<i32>(r#""long""#, &[0x80, 0x80, 0x80, 0x80, 0x10])
            .map_err(Error::into_details);
        assert!(matches!(error, Err(Details::IntegerOutOfRange { value: 2_147_483_648, .. })));
        Ok(())
    }

    #[test]
    fn union_index_out_of_range() {
        let error = decode_with::<Option<String>>(r#"["null", "string"]"#, &[0x04])
            .map_err(Error::into_details);
        assert!(matches!(
            error,
            Err(Details::GetUnionVariant {
                index: 2,
                num_variants: 2,
                offset: 0
            })
        ));
    }

    #[test]
    fn enum_falls_back_to_writer_default() -> TestResult {
        let schema = r#"{"type": "enum", "name": "Suit", "symbols": ["SPADES", "JOKER"], "default": "SPADES"}"#;
        let graph = SchemaGraph::parse_str(schema)?;
        let plans = PlanCache::new();
        let mut source = Source::new(&[0x02][..]);
        let index = BinaryDecoder::new(&graph, &plans, &mut source, graph.root())
            .decode_enum("Suit", &["HEARTS", "SPADES"])?;
        assert_eq!(index, 1);
        Ok(())
    }

    #[test]
    fn enum_ordinal_out_of_range() {
        let schema = r#"{"type": "enum", "name": "Suit", "symbols": ["SPADES"]}"#;
        let error = decode_with::<String>(schema, &[0x02]).map_err(Error::into_details);
        assert!(matches!(
            error,
            Err(Details::EnumOrdinalOutOfRange {
                ordinal: 1,
                num_symbols: 1,
                ..
            })
        ));
    }

    #[test]
    fn arrays_span_several_blocks() -> TestResult {
        let schema = r#"{"type": "array", "items": "int"}"#;
        // [1] in a block, then [2, 3] in a block with its byte size, then the end.
        let bytes = [0x02, 0x02, 0x03, 0x04, 0x04, 0x06, 0x00];
        assert_eq!(decode_with::<Vec<i32>>(schema, &bytes)?, vec![1, 2, 3]);
        Ok(())
    }

    #[test]
    fn huge_block_count_without_items() -> TestResult {
        let mut count = Vec::new();
        crate::util::zig_i64(400_000_000, &mut count)?;

        // 400M items of 1 KiB each is far beyond the allocation limit.
        let schema = r#"{"type": "array", "items": {"type": "fixed", "name": "Page", "size": 1024}}"#;
        let error = decode_with::<Vec<[u8; 1024]>>(schema, &count).map_err(Error::into_details);
        assert!(matches!(error, Err(Details::MemoryAllocation { .. })));

        // Within the limit, the stream simply ends before the first item.
        let error = decode_with::<Vec<bool>>(r#"{"type": "array", "items": "boolean"}"#, &count)
            .map_err(Error::into_details);
        assert!(matches!(error, Err(Details::TruncatedStream { .. })));

        let schema = r#"{"type": "map", "values": "long"}"#;
        let error = decode_with::<std::collections::BTreeMap<String, i64>>(schema, &count)
            .map_err(Error::into_details);
        assert!(matches!(error, Err(Details::MemoryAllocation { .. })));
        Ok(())
    }

    #[test]
    fn skipping_uses_block_sizes() -> TestResult {
        let graph = SchemaGraph::parse_str(r#"{"type": "array", "items": "string"}"#)?;
        // One item in a 4 byte block ("abc"), then the end, then one more byte.
        let bytes = [0x01, 0x08, 0x06, b'a', b'b', b'c', 0x00, 0x2A];
        let mut source = Source::new(&bytes[..]);
        skip_value(&graph, &mut source, graph.root())?;
        assert_eq!(source.offset(), 7);
        assert_eq!(source.read_byte()?, 0x2A);
        Ok(())
    }

    #[test]
    fn variant_by_branch_name() -> TestResult {
        let schema = r#"["null", {"type": "record", "name": "ns.Point", "fields": [{"name": "x", "type": "int"}]}, "string"]"#;
        let graph = SchemaGraph::parse_str(schema)?;
        let plans = PlanCache::new();
        let mut source = Source::new(&[0x04, 0x02, b'z'][..]);
        let (index, decoder) = BinaryDecoder::new(&graph, &plans, &mut source, graph.root())
            .decode_variant(&["ns.Point", "string"])?;
        assert_eq!(index, 1);
        assert_eq!(decoder.decode_string()?, "z");
        Ok(())
    }
}
