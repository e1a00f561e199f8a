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

//! Picking the schema a value is written with.
//!
//! When a value is written against a union, the branch is chosen from an ordered rule table
//! keyed by the kind of the value. Each rule is tried against every branch in declaration order
//! and the first rule any branch satisfies wins, so `int` prefers an `int` branch, then `long`,
//! then `float` and so on. Named values are matched by full name, then by alias, and only then by
//! structure; a structural match must be unique.
//!
//! A schema that is not a union is treated as a union of one branch, so the same table decides
//! whether a value can be written with it at all.

use crate::{
    AvroResult,
    error::Details,
    schema::{NodeId, Schema, SchemaGraph, SchemaKind},
};
use log::trace;
use std::fmt;

/// The kind of a value about to be written, with the details needed to pick a branch.
#[derive(Clone, Copy, Debug)]
pub enum Probe<'a> {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes(&'a [u8]),
    String(&'a str),
    Fixed {
        name: Option<&'a str>,
        size: usize,
    },
    Enum {
        name: Option<&'a str>,
        symbol: &'a str,
    },
    Record {
        name: Option<&'a str>,
        aliases: &'a [String],
    },
    Array,
    Map,
}

impl fmt::Display for Probe<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Probe::Null => f.write_str("null"),
            Probe::Boolean => f.write_str("boolean"),
            Probe::Int => f.write_str("int"),
            Probe::Long => f.write_str("long"),
            Probe::Float => f.write_str("float"),
            Probe::Double => f.write_str("double"),
            Probe::Bytes(_) => f.write_str("bytes"),
            Probe::String(_) => f.write_str("string"),
            Probe::Fixed { name: Some(name), .. } => write!(f, "fixed {name}"),
            Probe::Fixed { size, .. } => write!(f, "fixed({size})"),
            Probe::Enum { name: Some(name), .. } => write!(f, "enum {name}"),
            Probe::Enum { .. } => f.write_str("enum"),
            Probe::Record { name: Some(name), .. } => write!(f, "record {name}"),
            Probe::Record { .. } => f.write_str("record"),
            Probe::Array => f.write_str("array"),
            Probe::Map => f.write_str("map"),
        }
    }
}

type Predicate = fn(&Schema, &Probe<'_>) -> bool;

/// One row of the rule table.
#[derive(Clone, Copy)]
enum Rule {
    /// The first branch satisfying the predicate wins.
    First(Predicate),
    /// Exactly one branch may satisfy the predicate, several are an error.
    Unique(Predicate),
}

fn is_null(s: &Schema, _: &Probe<'_>) -> bool {
    matches!(s, Schema::Null)
}
fn is_boolean(s: &Schema, _: &Probe<'_>) -> bool {
    matches!(s, Schema::Boolean)
}
fn is_int(s: &Schema, _: &Probe<'_>) -> bool {
    matches!(s, Schema::Int)
}
fn is_long(s: &Schema, _: &Probe<'_>) -> bool {
    matches!(s, Schema::Long)
}
fn is_float(s: &Schema, _: &Probe<'_>) -> bool {
    matches!(s, Schema::Float)
}
fn is_double(s: &Schema, _: &Probe<'_>) -> bool {
    matches!(s, Schema::Double)
}
fn is_bytes(s: &Schema, _: &Probe<'_>) -> bool {
    matches!(s, Schema::Bytes)
}
fn is_string(s: &Schema, _: &Probe<'_>) -> bool {
    matches!(s, Schema::String)
}
fn is_array(s: &Schema, _: &Probe<'_>) -> bool {
    matches!(s, Schema::Array(_))
}
fn is_map(s: &Schema, _: &Probe<'_>) -> bool {
    matches!(s, Schema::Map(_))
}

fn is_utf8_string(s: &Schema, p: &Probe<'_>) -> bool {
    matches!((s, p), (Schema::String, Probe::Bytes(b)) if std::str::from_utf8(b).is_ok())
}

fn enum_with_symbol(s: &Schema, p: &Probe<'_>) -> bool {
    let symbol = match p {
        Probe::String(symbol) | Probe::Enum { symbol, .. } => symbol,
        _ => return false,
    };
    matches!(s, Schema::Enum(e) if e.ordinal(symbol).is_some())
}

fn fixed_of_same_size(s: &Schema, p: &Probe<'_>) -> bool {
    let size = match p {
        Probe::String(v) => v.len(),
        Probe::Bytes(v) => v.len(),
        Probe::Fixed { size, .. } => *size,
        _ => return false,
    };
    matches!(s, Schema::Fixed(f) if f.size == size)
}

fn probe_name<'a>(p: &Probe<'a>) -> Option<&'a str> {
    match p {
        Probe::Fixed { name, .. } | Probe::Enum { name, .. } | Probe::Record { name, .. } => *name,
        _ => None,
    }
}

fn same_kind(s: &Schema, p: &Probe<'_>) -> bool {
    matches!(
        (s, p),
        (Schema::Fixed(_), Probe::Fixed { .. })
            | (Schema::Enum(_), Probe::Enum { .. })
            | (Schema::Record(_), Probe::Record { .. })
    )
}

fn by_full_name(s: &Schema, p: &Probe<'_>) -> bool {
    same_kind(s, p)
        && probe_name(p).is_some_and(|name| s.name().is_some_and(|n| n.fullname() == name))
}

fn by_alias(s: &Schema, p: &Probe<'_>) -> bool {
    if !same_kind(s, p) {
        return false;
    }
    let schema_alias = probe_name(p).is_some_and(|name| s.answers_to(name));
    let value_alias = match (p, s.name()) {
        (Probe::Record { aliases, .. }, Some(n)) => aliases.iter().any(|a| a == n.fullname()),
        _ => false,
    };
    schema_alias || value_alias
}

fn structural_fixed(s: &Schema, p: &Probe<'_>) -> bool {
    same_kind(s, p) && fixed_of_same_size(s, p)
}

fn structural_enum(s: &Schema, p: &Probe<'_>) -> bool {
    same_kind(s, p) && enum_with_symbol(s, p)
}

fn structural_record(s: &Schema, p: &Probe<'_>) -> bool {
    same_kind(s, p)
}

const NULL: &[Rule] = &[Rule::First(is_null)];
const BOOLEAN: &[Rule] = &[Rule::First(is_boolean)];
const INT: &[Rule] = &[
    Rule::First(is_int),
    Rule::First(is_long),
    Rule::First(is_float),
    Rule::First(is_double),
    Rule::First(is_string),
];
const LONG: &[Rule] = &[
    Rule::First(is_long),
    Rule::First(is_float),
    Rule::First(is_double),
    Rule::First(is_string),
];
const FLOAT: &[Rule] = &[
    Rule::First(is_float),
    Rule::First(is_double),
    Rule::First(is_string),
];
const DOUBLE: &[Rule] = &[Rule::First(is_double), Rule::First(is_string)];
const STRING: &[Rule] = &[
    Rule::First(is_string),
    Rule::First(is_bytes),
    Rule::First(enum_with_symbol),
    Rule::First(fixed_of_same_size),
];
const BYTES: &[Rule] = &[
    Rule::First(is_bytes),
    Rule::First(fixed_of_same_size),
    Rule::First(is_utf8_string),
];
const FIXED: &[Rule] = &[
    Rule::First(by_full_name),
    Rule::First(by_alias),
    Rule::Unique(structural_fixed),
    Rule::First(is_bytes),
];
const ENUM: &[Rule] = &[
    Rule::First(by_full_name),
    Rule::First(by_alias),
    Rule::Unique(structural_enum),
    Rule::First(is_string),
];
const RECORD: &[Rule] = &[
    Rule::First(by_full_name),
    Rule::First(by_alias),
    Rule::Unique(structural_record),
];
const ARRAY: &[Rule] = &[Rule::First(is_array)];
const MAP: &[Rule] = &[Rule::First(is_map)];

fn rules(probe: &Probe<'_>) -> &'static [Rule] {
    match probe {
        Probe::Null => NULL,
        Probe::Boolean => BOOLEAN,
        Probe::Int => INT,
        Probe::Long => LONG,
        Probe::Float => FLOAT,
        Probe::Double => DOUBLE,
        Probe::Bytes(_) => BYTES,
        Probe::String(_) => STRING,
        Probe::Fixed { .. } => FIXED,
        Probe::Enum { .. } => ENUM,
        Probe::Record { .. } => RECORD,
        Probe::Array => ARRAY,
        Probe::Map => MAP,
    }
}

/// The outcome of [`select_branch`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Selection {
    /// Index of the chosen union branch, `None` when the schema is not a union.
    pub branch: Option<usize>,
    /// The schema the value is written with.
    pub schema: NodeId,
}

/// Pick the schema `probe` is written with when the declared schema is `node`.
pub fn select_branch(graph: &SchemaGraph, node: NodeId, probe: &Probe<'_>) -> AvroResult<Selection> {
    let (candidates, is_union): (&[NodeId], bool) = match graph.check(node)? {
        Schema::Union(union) => (union.variants(), true),
        _ => (std::slice::from_ref(&node), false),
    };

    for rule in rules(probe) {
        let found = match *rule {
            Rule::First(predicate) => candidates
                .iter()
                .position(|c| predicate(graph.node(*c), probe)),
            Rule::Unique(predicate) => {
                let matching: Vec<usize> = candidates
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| predicate(graph.node(**c), probe))
                    .map(|(i, _)| i)
                    .collect();
                if matching.len() > 1 {
                    return Err(Details::AmbiguousUnionBranch {
                        value_kind: probe.to_string(),
                        branches: matching,
                    }
                    .into());
                }
                matching.first().copied()
            }
        };
        if let Some(index) = found {
            trace!("Writing {probe} with branch {index} of {node}");
            return Ok(Selection {
                branch: is_union.then_some(index),
                schema: candidates[index],
            });
        }
    }

    Err(Details::EncodeValueAsSchema {
        value_kind: probe.to_string(),
        supported_schema: candidates.iter().map(|c| graph.kind(*c)).collect::<Vec<SchemaKind>>(),
    }
    .into())
}
