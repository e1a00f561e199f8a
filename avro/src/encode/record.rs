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
    AvroResult,
    encode::{AvroEncode, Encoder, encode_raw, field_error},
    error::Details,
    resolution::{EncodingWorkflow, PlanCache, ResolutionPlan},
    schema::{RecordSchema, SchemaGraph},
};
use log::trace;
use std::{io::Write, sync::Arc};

/// Writes the fields of one record in writer order while they are pushed in target order.
///
/// A field whose writer position is the next one to be written goes straight to the sink.
/// A field pushed ahead of its writer position is encoded into a buffer that is flushed once
/// every writer field before it has been written. Writer fields the target does not have are
/// filled with their schema default as soon as they are reached.
pub struct RecordEncoder<'a, W: Write> {
    graph: &'a SchemaGraph,
    plans: &'a PlanCache,
    writer: &'a mut W,
    record: &'a RecordSchema,
    plan: Arc<ResolutionPlan>,
    /// Writer position of the next field to reach the sink.
    next_writer: usize,
    /// Encoded fields waiting for their writer position, indexed by writer position.
    pending: Vec<Option<Vec<u8>>>,
    /// Target fields already pushed.
    pushed: Vec<bool>,
}

impl<'a, W: Write> RecordEncoder<'a, W> {
    pub(crate) fn new(
        graph: &'a SchemaGraph,
        plans: &'a PlanCache,
        writer: &'a mut W,
        record: &'a RecordSchema,
        plan: Arc<ResolutionPlan>,
    ) -> AvroResult<Self> {
        let pending = match plan.encoding_workflow() {
            EncodingWorkflow::NonContiguous { .. } => vec![None; record.fields.len()],
            _ => Vec::new(),
        };
        let pushed = vec![false; plan.shape().len()];
        let mut encoder = Self {
            graph,
            plans,
            writer,
            record,
            plan,
            next_writer: 0,
            pending,
            pushed,
        };
        // Leading writer fields unknown to the target.
        encoder.advance()?;
        Ok(encoder)
    }

    /// Encode the target field at `index` of the shape.
    pub fn field<T: AvroEncode + ?Sized>(&mut self, index: usize, value: &T) -> AvroResult<()> {
        let shape = self.plan.shape();
        let target = shape.field(index).ok_or_else(|| Details::UnknownTargetIndex {
            shape: shape.name.clone(),
            index,
            len: shape.len(),
        })?;
        self.push(index, value)
            .map_err(|e| field_error(self.plan.record(), &target.name, Some(index), e))
    }

    fn push<T: AvroEncode + ?Sized>(&mut self, index: usize, value: &T) -> AvroResult<()> {
        if std::mem::replace(&mut self.pushed[index], true) {
            return Err(Details::FieldEncodedTwice {
                field: self.plan.shape().fields[index].name.clone(),
                target_index: index,
            }
            .into());
        }
        let Some(writer_index) = self.plan.writer_index(index) else {
            trace!("Field {index} is not part of {}", self.plan.record());
            return Ok(());
        };
        let schema = self.record.fields[writer_index].schema;

        if writer_index == self.next_writer {
            value.encode(Encoder::new(self.graph, self.plans, &mut *self.writer, schema))?;
            self.next_writer += 1;
            self.advance()
        } else {
            if self.pending.is_empty() {
                self.pending = vec![None; self.record.fields.len()];
            }
            let mut buffer = Vec::new();
            value.encode(Encoder::new(self.graph, self.plans, &mut buffer, schema))?;
            self.pending[writer_index] = Some(buffer);
            Ok(())
        }
    }

    /// Write everything that can be written before the next field still to be pushed.
    fn advance(&mut self) -> AvroResult<()> {
        let record = self.record;
        while let Some(field) = record.fields.get(self.next_writer) {
            if let Some(buffer) = self.pending.get_mut(self.next_writer).and_then(Option::take) {
                encode_raw(&buffer, &mut *self.writer)?;
            } else if self.plan.target_index(self.next_writer).is_none() {
                let default = field.default.as_ref().ok_or_else(|| Details::MissingWriterFields {
                    record: self.plan.record().to_string(),
                    fields: vec![field.name.clone()],
                })?;
                Encoder::new(self.graph, self.plans, &mut *self.writer, field.schema)
                    .encode_value(default)
                    .map_err(|e| field_error(self.plan.record(), &field.name, None, e))?;
            } else {
                break;
            }
            self.next_writer += 1;
        }
        Ok(())
    }

    /// Check that every field the writer needs was pushed.
    pub(crate) fn finish(mut self) -> AvroResult<()> {
        self.advance()?;
        match self.plan.target_index(self.next_writer) {
            Some(target_index) if self.next_writer < self.record.fields.len() => {
                Err(Details::FieldNotEncoded {
                    field: self.plan.shape().fields[target_index].name.clone(),
                    target_index,
                }
                .into())
            }
            _ => Ok(()),
        }
    }
}
