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

//! Reconciling a writer record schema with a [`TargetShape`].
//!
//! Avro writes record fields in the order the *writer* schema declares them, while the Rust
//! type may declare them in any order, under other names, or not at all. [`resolve`] matches
//! the two once and produces a [`ResolutionPlan`]:
//!
//! * the [`DecodingStep`]s, one per writer field in writer order followed by the target fields
//!   the writer does not know about,
//! * the [`EncodingWorkflow`], which tells the encoder whether target fields can be written
//!   as they are pushed or need to be reordered first.
//!
//! Plans are pure data. [`PlanCache`] computes each one once per (schema node, shape) pair.
mod cache;

pub use cache::PlanCache;

use crate::{
    AvroResult,
    error::Details,
    schema::{NodeId, RecordSchema, Schema, SchemaGraph, SchemaKind},
    shape::TargetShape,
    types::Value,
};
use log::debug;
use std::collections::HashMap;

/// What to do for one writer field, or one target field the writer lacks.
#[derive(Clone, Debug, PartialEq)]
pub enum DecodingStep {
    /// The writer field has no counterpart in the target: consume and discard its bytes.
    SkipWriterField { writer_index: usize, schema: NodeId },
    /// The writer field feeds the target field `target_index`.
    DeserializeWriterField {
        writer_index: usize,
        target_index: usize,
        schema: NodeId,
    },
    /// The writer lacks the target field, which is produced from its default without touching
    /// the stream. The default is decoded by kind, so no schema is attached.
    GetDefaultValue { target_index: usize, default: Value },
    /// The writer lacks the target field and the target type fills it on its own.
    IgnoreMissingElement { target_index: usize },
    /// The writer lacks the target field and nothing can produce it. Decoding with this plan
    /// fails before any byte is read.
    MissingElementValueFailure { target_index: usize, name: String },
}

/// How target fields are laid out relative to the writer fields when encoding.
#[derive(Clone, Debug, PartialEq)]
pub enum EncodingWorkflow {
    /// Writer field `i` is target field `i` for every `i`.
    ExactMatch,
    /// Matched fields appear in the same relative order on both sides.
    ContiguousWithSkips {
        /// Per target field: `true` when the writer lacks it and it is not written.
        skip_mask: Vec<bool>,
        /// Per writer field: `true` when the target lacks it and its default is written instead.
        writer_defaults: Vec<bool>,
    },
    /// Matched fields appear in a different relative order; the encoder buffers target fields
    /// until every writer field before them has been written.
    NonContiguous {
        target_to_writer: Vec<Option<usize>>,
    },
    /// Some writer fields have no target counterpart and no default, so nothing valid can be
    /// written for them.
    MissingWriterFields { fields: Vec<String> },
}

/// The resolution of one writer record against one target shape.
#[derive(Debug)]
pub struct ResolutionPlan {
    record: String,
    writer: NodeId,
    shape: &'static TargetShape,
    steps: Vec<DecodingStep>,
    workflow: EncodingWorkflow,
    target_to_writer: Vec<Option<usize>>,
    writer_to_target: Vec<Option<usize>>,
}

impl ResolutionPlan {
    /// Full name of the writer record.
    pub fn record(&self) -> &str {
        &self.record
    }

    pub fn writer(&self) -> NodeId {
        self.writer
    }

    pub fn shape(&self) -> &'static TargetShape {
        self.shape
    }

    pub fn decoding_steps(&self) -> &[DecodingStep] {
        &self.steps
    }

    pub fn encoding_workflow(&self) -> &EncodingWorkflow {
        &self.workflow
    }

    pub fn writer_index(&self, target_index: usize) -> Option<usize> {
        self.target_to_writer.get(target_index).copied().flatten()
    }

    pub fn target_index(&self, writer_index: usize) -> Option<usize> {
        self.writer_to_target.get(writer_index).copied().flatten()
    }

    /// Fail with [`Details::MissingRequiredField`] if the plan cannot produce every target field.
    pub fn ensure_decodable(&self) -> AvroResult<()> {
        match self.steps.iter().find_map(|step| match step {
            DecodingStep::MissingElementValueFailure { target_index, name } => {
                Some((*target_index, name))
            }
            _ => None,
        }) {
            Some((target_index, name)) => Err(Details::MissingRequiredField {
                record: self.record.clone(),
                field: name.clone(),
                target_index,
            }
            .into()),
            None => Ok(()),
        }
    }

    /// Fail with [`Details::MissingWriterFields`] if the plan cannot be used for encoding.
    pub fn ensure_encodable(&self) -> AvroResult<()> {
        match &self.workflow {
            EncodingWorkflow::MissingWriterFields { fields } => Err(Details::MissingWriterFields {
                record: self.record.clone(),
                fields: fields.clone(),
            }
            .into()),
            _ => Ok(()),
        }
    }
}

/// Resolve the record at `writer` against `shape`.
pub fn resolve(
    graph: &SchemaGraph,
    writer: NodeId,
    shape: &'static TargetShape,
) -> AvroResult<ResolutionPlan> {
    let record = match graph.check(writer)? {
        Schema::Record(record) => record,
        other => return Err(Details::ResolveNonRecord(SchemaKind::from(other)).into()),
    };

    let targets = target_names(shape)?;
    let writer_to_target = match_writer_fields(record, shape, &targets)?;

    let mut target_to_writer = vec![None; shape.len()];
    let mut steps = Vec::with_capacity(record.fields.len());
    for (writer_index, (field, target)) in record.fields.iter().zip(&writer_to_target).enumerate() {
        steps.push(match target {
            Some(target_index) => {
                target_to_writer[*target_index] = Some(writer_index);
                DecodingStep::DeserializeWriterField {
                    writer_index,
                    target_index: *target_index,
                    schema: field.schema,
                }
            }
            None => DecodingStep::SkipWriterField {
                writer_index,
                schema: field.schema,
            },
        });
    }
    for (target_index, (field, writer)) in shape.fields.iter().zip(&target_to_writer).enumerate() {
        if writer.is_some() {
            continue;
        }
        steps.push(match (&field.default, field.has_builtin_default) {
            (Some(default), _) => DecodingStep::GetDefaultValue {
                target_index,
                default: default.clone(),
            },
            (None, true) => DecodingStep::IgnoreMissingElement { target_index },
            (None, false) => DecodingStep::MissingElementValueFailure {
                target_index,
                name: field.name.clone(),
            },
        });
    }

    let workflow = classify(record, &writer_to_target, &target_to_writer);
    debug!(
        "Resolved record {} against shape {}: {workflow:?}",
        record.name, shape.name
    );

    Ok(ResolutionPlan {
        record: record.name.to_string(),
        writer,
        shape,
        steps,
        workflow,
        target_to_writer,
        writer_to_target,
    })
}

/// Every name and alias of the shape, mapped to its element index.
fn target_names(shape: &TargetShape) -> AvroResult<HashMap<&str, usize>> {
    let mut targets = HashMap::new();
    for (index, field) in shape.fields.iter().enumerate() {
        for name in std::iter::once(&field.name).chain(&field.aliases) {
            if targets.insert(name.as_str(), index).is_some() {
                return Err(Details::DuplicateShapeField {
                    shape: shape.name.clone(),
                    name: name.clone(),
                }
                .into());
            }
        }
    }
    Ok(targets)
}

/// Look every writer field up by name, then by its aliases. Two writer fields reaching the
/// same target field are rejected.
fn match_writer_fields(
    record: &RecordSchema,
    shape: &TargetShape,
    targets: &HashMap<&str, usize>,
) -> AvroResult<Vec<Option<usize>>> {
    let mut consumed_by: Vec<Option<&str>> = vec![None; shape.len()];
    let mut writer_to_target = Vec::with_capacity(record.fields.len());
    for field in &record.fields {
        let target = std::iter::once(&field.name)
            .chain(&field.aliases)
            .find_map(|name| targets.get(name.as_str()).copied());
        if let Some(target) = target {
            if let Some(first) = consumed_by[target] {
                return Err(Details::AmbiguousAliasCollision {
                    record: record.name.to_string(),
                    target: shape.fields[target].name.clone(),
                    first: first.to_string(),
                    second: field.name.clone(),
                }
                .into());
            }
            consumed_by[target] = Some(field.name.as_str());
        }
        writer_to_target.push(target);
    }
    Ok(writer_to_target)
}

fn classify(
    record: &RecordSchema,
    writer_to_target: &[Option<usize>],
    target_to_writer: &[Option<usize>],
) -> EncodingWorkflow {
    let missing: Vec<String> = record
        .fields
        .iter()
        .zip(writer_to_target)
        .filter(|(field, target)| target.is_none() && field.default.is_none())
        .map(|(field, _)| field.name.clone())
        .collect();
    if !missing.is_empty() {
        return EncodingWorkflow::MissingWriterFields { fields: missing };
    }

    if writer_to_target.len() == target_to_writer.len()
        && writer_to_target
            .iter()
            .enumerate()
            .all(|(writer_index, target)| *target == Some(writer_index))
    {
        return EncodingWorkflow::ExactMatch;
    }

    let mut matched = writer_to_target.iter().flatten();
    let in_order = match matched.next() {
        Some(first) => matched
            .try_fold(*first, |previous, next| (*next > previous).then_some(*next))
            .is_some(),
        None => true,
    };
    if in_order {
        EncodingWorkflow::ContiguousWithSkips {
            skip_mask: target_to_writer.iter().map(Option::is_none).collect(),
            writer_defaults: writer_to_target.iter().map(Option::is_none).collect(),
        }
    } else {
        EncodingWorkflow::NonContiguous {
            target_to_writer: target_to_writer.to_vec(),
        }
    }
}
