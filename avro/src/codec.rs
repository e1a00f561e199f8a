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

//! The entry point for encoding and decoding with one writer schema.
use crate::{
    AvroResult,
    decode::{AvroDecode, BinaryDecoder, Source},
    encode::{AvroEncode, Encoder},
    error::Details,
    resolution::{PlanCache, ResolutionPlan},
    schema::{NodeId, SchemaGraph},
    shape::TargetShape,
};
use log::debug;
use std::{
    io::{Read, Write},
    sync::Arc,
};

/// Encodes and decodes values written with the root schema of a [`SchemaGraph`].
///
/// Owns the cache of resolution plans, so a codec is meant to be created once per writer schema
/// and shared. All methods take `&self` and may be called from several threads at once.
///
/// ```
/// # use avro_direct::{AvroCodec, schema::SchemaGraph};
/// let codec = AvroCodec::new(SchemaGraph::parse_str(r#"["null", "string"]"#)?);
/// assert_eq!(codec.encode_to_vec(&Some("x"))?, [0x02, 0x02, 0x78]);
/// assert_eq!(codec.decode_slice::<Option<String>>(&[0x00])?, None);
/// # Ok::<(), avro_direct::Error>(())
/// ```
#[derive(Debug)]
pub struct AvroCodec {
    graph: SchemaGraph,
    plans: PlanCache,
}

impl AvroCodec {
    pub fn new(graph: SchemaGraph) -> Self {
        debug!("Created codec for schema graph {}", graph.id());
        Self {
            graph,
            plans: PlanCache::new(),
        }
    }

    pub fn graph(&self) -> &SchemaGraph {
        &self.graph
    }

    pub fn plans(&self) -> &PlanCache {
        &self.plans
    }

    /// The resolution plan of the root record against `shape`.
    pub fn plan(&self, shape: &'static TargetShape) -> AvroResult<Arc<ResolutionPlan>> {
        self.plan_at(self.graph.root(), shape)
    }

    /// The resolution plan of the record at `writer` against `shape`.
    pub fn plan_at(
        &self,
        writer: NodeId,
        shape: &'static TargetShape,
    ) -> AvroResult<Arc<ResolutionPlan>> {
        self.plans.get_or_resolve(&self.graph, writer, shape)
    }

    /// Write `value` to `writer`, returning the number of bytes written.
    pub fn encode<T, W>(&self, value: &T, writer: &mut W) -> AvroResult<usize>
    where
        T: AvroEncode + ?Sized,
        W: Write,
    {
        let mut counter = CountingWriter {
            inner: writer,
            count: 0,
        };
        value.encode(Encoder::new(
            &self.graph,
            &self.plans,
            &mut counter,
            self.graph.root(),
        ))?;
        Ok(counter.count)
    }

    pub fn encode_to_vec<T: AvroEncode + ?Sized>(&self, value: &T) -> AvroResult<Vec<u8>> {
        let mut buffer = Vec::new();
        self.encode(value, &mut buffer)?;
        Ok(buffer)
    }

    /// Read one value from `reader`. Bytes after the value are left unread.
    pub fn decode<T: AvroDecode, R: Read>(&self, reader: R) -> AvroResult<T> {
        let mut source = Source::new(reader);
        self.decode_from(&mut source)
    }

    /// Read one value that must span all of `bytes`.
    pub fn decode_slice<T: AvroDecode>(&self, bytes: &[u8]) -> AvroResult<T> {
        let mut source = Source::new(bytes);
        let value = self.decode_from(&mut source)?;
        let remaining = source.into_inner().len();
        if remaining > 0 {
            return Err(Details::TrailingData {
                consumed: (bytes.len() - remaining) as u64,
                remaining,
            }
            .into());
        }
        Ok(value)
    }

    fn decode_from<T: AvroDecode, R: Read>(&self, source: &mut Source<R>) -> AvroResult<T> {
        T::decode(BinaryDecoder::new(
            &self.graph,
            &self.plans,
            source,
            self.graph.root(),
        ))
    }
}

struct CountingWriter<'a, W> {
    inner: &'a mut W,
    count: usize,
}

impl<W: Write> Write for CountingWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.count += written;
        Ok(written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
