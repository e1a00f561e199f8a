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

//! Logic for parsing and interacting with schemas in Avro format.
//!
//! A schema is stored as a [`SchemaGraph`]: an arena of [`Schema`] nodes where every child is a
//! [`NodeId`]. References to named types, including recursive ones, point at the node of the
//! definition, so a linked list is simply a record whose field refers back to its own node.
mod name;
mod parser;
mod record;
mod union;

pub use crate::schema::{
    name::{Alias, Name, NamespaceRef},
    record::{RecordField, RecordSchema},
    union::UnionSchema,
};

use crate::{
    AvroResult,
    error::Details,
    types::Value,
    validator::{validate_enum_symbol, validate_field_name},
};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value as JsonValue, json};
use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};
use strum_macros::{Display, EnumDiscriminants};

/// Index of a node inside its [`SchemaGraph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Represents any valid Avro schema.
///
/// More information about Avro schemas can be found in the
/// [Avro Specification](https://avro.apache.org/docs/1.11.1/specification/#schema-declaration)
#[derive(Clone, Debug, PartialEq, EnumDiscriminants)]
#[strum_discriminants(name(SchemaKind), derive(Hash, Ord, PartialOrd, Display))]
pub enum Schema {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    /// A sequence of 8-bit unsigned bytes.
    Bytes,
    /// A unicode character sequence.
    String,
    Fixed(FixedSchema),
    Enum(EnumSchema),
    /// An array whose items all have the schema of the given node.
    Array(NodeId),
    /// A map with string keys whose values all have the schema of the given node.
    Map(NodeId),
    Record(RecordSchema),
    /// A union. Never directly contains another union once part of a [`SchemaGraph`].
    Union(UnionSchema),
}

impl Schema {
    /// The name of a `record`, `enum` or `fixed` schema.
    pub fn name(&self) -> Option<&Name> {
        match self {
            Schema::Fixed(FixedSchema { name, .. })
            | Schema::Enum(EnumSchema { name, .. })
            | Schema::Record(RecordSchema { name, .. }) => Some(name),
            _ => None,
        }
    }

    pub fn aliases(&self) -> &[Alias] {
        match self {
            Schema::Fixed(FixedSchema { aliases, .. })
            | Schema::Enum(EnumSchema { aliases, .. })
            | Schema::Record(RecordSchema { aliases, .. }) => aliases,
            _ => &[],
        }
    }

    pub fn is_named(&self) -> bool {
        self.name().is_some()
    }

    /// Whether `fullname` is the name or one of the aliases of this named schema.
    pub(crate) fn answers_to(&self, fullname: &str) -> bool {
        self.name().is_some_and(|n| n.fullname() == fullname)
            || self.aliases().iter().any(|a| a.fullname() == fullname)
    }

    fn children(&self) -> Vec<NodeId> {
        match self {
            Schema::Array(items) => vec![*items],
            Schema::Map(values) => vec![*values],
            Schema::Record(record) => record.fields.iter().map(|f| f.schema).collect(),
            Schema::Union(union) => union.variants().to_vec(),
            _ => Vec::new(),
        }
    }
}

/// A `fixed` schema: exactly `size` bytes, no length prefix.
#[derive(bon::Builder, Debug, Clone, PartialEq)]
pub struct FixedSchema {
    pub name: Name,
    #[builder(default)]
    pub aliases: Vec<Alias>,
    pub size: usize,
}

/// An `enum` schema, written as the ordinal of the symbol.
#[derive(bon::Builder, Debug, Clone, PartialEq)]
pub struct EnumSchema {
    pub name: Name,
    #[builder(default)]
    pub aliases: Vec<Alias>,
    pub symbols: Vec<String>,
    /// Symbol used by readers that do not know the written one.
    pub default: Option<String>,
}

impl EnumSchema {
    pub fn ordinal(&self, symbol: &str) -> Option<u32> {
        self.symbols
            .iter()
            .position(|s| s == symbol)
            .and_then(|i| u32::try_from(i).ok())
    }
}

static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(0);

/// An immutable, validated schema arena with a designated root node.
///
/// Each graph carries a process-unique [`id`](Self::id), which together with a [`NodeId`]
/// identifies a schema node in the plan cache.
#[derive(Clone, Debug)]
pub struct SchemaGraph {
    id: u64,
    nodes: Vec<Schema>,
    root: NodeId,
    names: HashMap<Name, NodeId>,
}

impl SchemaGraph {
    /// Parse a JSON Avro schema.
    pub fn parse_str(input: &str) -> AvroResult<Self> {
        let json = serde_json::from_str(input).map_err(Details::ParseSchemaJson)?;
        Self::parse(&json)
    }

    /// Parse an already deserialized JSON Avro schema.
    pub fn parse(json: &JsonValue) -> AvroResult<Self> {
        parser::Parser::default().parse_root(json)
    }

    pub fn builder() -> SchemaGraphBuilder {
        SchemaGraphBuilder::new()
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, node: NodeId) -> Option<&Schema> {
        self.nodes.get(node.0)
    }

    /// The schema at `node`.
    ///
    /// # Panics
    /// If `node` was not produced for this graph.
    pub fn node(&self, node: NodeId) -> &Schema {
        &self.nodes[node.0]
    }

    pub fn kind(&self, node: NodeId) -> SchemaKind {
        SchemaKind::from(self.node(node))
    }

    /// Find a named schema by its full name.
    pub fn lookup(&self, fullname: &str) -> Option<NodeId> {
        self.names
            .iter()
            .find(|(name, _)| name.fullname() == fullname)
            .map(|(_, id)| *id)
    }

    pub(crate) fn check(&self, node: NodeId) -> AvroResult<&Schema> {
        self.get(node).ok_or_else(|| {
            Details::UnknownNode {
                index: node.0,
                len: self.nodes.len(),
            }
            .into()
        })
    }

    /// The JSON form of the schema rooted at `node`. Named types are written in full on their
    /// first occurrence and by name afterwards.
    pub fn to_json(&self, node: NodeId) -> JsonValue {
        self.node_to_json(node, &mut HashSet::new())
    }

    fn node_to_json(&self, node: NodeId, seen: &mut HashSet<NodeId>) -> JsonValue {
        let schema = self.node(node);
        if let Some(name) = schema.name()
            && !seen.insert(node)
        {
            return JsonValue::String(name.fullname().to_string());
        }
        let aliases = |aliases: &[Alias]| -> Option<JsonValue> {
            (!aliases.is_empty())
                .then(|| aliases.iter().map(|a| json!(a.fullname())).collect())
        };
        match schema {
            Schema::Null => json!("null"),
            Schema::Boolean => json!("boolean"),
            Schema::Int => json!("int"),
            Schema::Long => json!("long"),
            Schema::Float => json!("float"),
            Schema::Double => json!("double"),
            Schema::Bytes => json!("bytes"),
            Schema::String => json!("string"),
            Schema::Fixed(fixed) => {
                let mut map = Map::new();
                map.insert("type".into(), json!("fixed"));
                map.insert("name".into(), json!(fixed.name.fullname()));
                if let Some(aliases) = aliases(&fixed.aliases) {
                    map.insert("aliases".into(), aliases);
                }
                map.insert("size".into(), json!(fixed.size));
                JsonValue::Object(map)
            }
            Schema::Enum(enum_schema) => {
                let mut map = Map::new();
                map.insert("type".into(), json!("enum"));
                map.insert("name".into(), json!(enum_schema.name.fullname()));
                if let Some(aliases) = aliases(&enum_schema.aliases) {
                    map.insert("aliases".into(), aliases);
                }
                map.insert("symbols".into(), json!(enum_schema.symbols));
                if let Some(default) = &enum_schema.default {
                    map.insert("default".into(), json!(default));
                }
                JsonValue::Object(map)
            }
            Schema::Array(items) => json!({"type": "array", "items": self.node_to_json(*items, seen)}),
            Schema::Map(values) => json!({"type": "map", "values": self.node_to_json(*values, seen)}),
            Schema::Record(record) => {
                let mut map = Map::new();
                map.insert("type".into(), json!("record"));
                map.insert("name".into(), json!(record.name.fullname()));
                if let Some(aliases) = aliases(&record.aliases) {
                    map.insert("aliases".into(), aliases);
                }
                let fields = record
                    .fields
                    .iter()
                    .map(|field| {
                        let mut f = Map::new();
                        f.insert("name".into(), json!(field.name));
                        f.insert("type".into(), self.node_to_json(field.schema, seen));
                        if !field.aliases.is_empty() {
                            f.insert("aliases".into(), json!(field.aliases));
                        }
                        if let Some(default) = &field.default {
                            f.insert("default".into(), default.to_json());
                        }
                        JsonValue::Object(f)
                    })
                    .collect();
                map.insert("fields".into(), JsonValue::Array(fields));
                JsonValue::Object(map)
            }
            Schema::Union(union) => JsonValue::Array(
                union
                    .variants()
                    .iter()
                    .map(|v| self.node_to_json(*v, seen))
                    .collect(),
            ),
        }
    }
}

impl Serialize for SchemaGraph {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_json(self.root).serialize(serializer)
    }
}

impl fmt::Display for SchemaGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json(self.root))
    }
}

/// Assembles a [`SchemaGraph`] node by node.
///
/// Recursive named types are declared with [`reserve`](Self::reserve) and filled in later with
/// [`define`](Self::define), once the node id is known to the children referring to it.
///
/// ```
/// # use avro_direct::schema::{Name, RecordField, RecordSchema, Schema, SchemaGraph};
/// let mut builder = SchemaGraph::builder();
/// let node = builder.reserve();
/// let null = builder.add(Schema::Null);
/// let next = builder.add_union(vec![null, node]);
/// let value = builder.add(Schema::Long);
/// builder.define(node, Schema::Record(
///     RecordSchema::builder()
///         .name(Name::new("LongList")?)
///         .fields(vec![
///             RecordField::builder().name("value").schema(value).build(),
///             RecordField::builder().name("next").schema(next).build(),
///         ])
///         .build(),
/// ))?;
/// let graph = builder.build(node)?;
/// assert_eq!(graph.lookup("LongList"), Some(node));
/// # Ok::<(), avro_direct::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct SchemaGraphBuilder {
    nodes: Vec<Schema>,
    pending: HashSet<usize>,
}

impl SchemaGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, schema: Schema) -> NodeId {
        self.nodes.push(schema);
        NodeId(self.nodes.len() - 1)
    }

    pub fn add_union(&mut self, variants: Vec<NodeId>) -> NodeId {
        self.add(Schema::Union(UnionSchema::new(variants)))
    }

    /// Allocate a node to be filled in by [`define`](Self::define).
    pub fn reserve(&mut self) -> NodeId {
        let id = self.add(Schema::Null);
        self.pending.insert(id.0);
        id
    }

    pub fn define(&mut self, node: NodeId, schema: Schema) -> AvroResult<()> {
        let len = self.nodes.len();
        let slot = self.nodes.get_mut(node.0).ok_or(Details::UnknownNode {
            index: node.0,
            len,
        })?;
        *slot = schema;
        self.pending.remove(&node.0);
        Ok(())
    }

    pub(crate) fn nodes(&self) -> &[Schema] {
        &self.nodes
    }

    pub(crate) fn set_field_default(&mut self, record: NodeId, position: usize, default: Value) {
        if let Some(Schema::Record(record)) = self.nodes.get_mut(record.0)
            && let Some(field) = record.fields.get_mut(position)
        {
            field.default = Some(default);
        }
    }

    /// Validate the nodes, flatten nested unions and freeze the graph.
    pub fn build(mut self, root: NodeId) -> AvroResult<SchemaGraph> {
        let len = self.nodes.len();
        let unknown = |index: usize| Details::UnknownNode { index, len };
        if let Some(index) = self.pending.iter().min() {
            return Err(unknown(*index).into());
        }
        if root.0 >= len {
            return Err(unknown(root.0).into());
        }
        for schema in &self.nodes {
            if let Some(child) = schema.children().into_iter().find(|c| c.0 >= len) {
                return Err(unknown(child.0).into());
            }
        }

        for index in 0..len {
            if let Schema::Union(union) = &self.nodes[index] {
                let flattened = union::flatten(&self.nodes, union.variants())?;
                self.nodes[index] = Schema::Union(UnionSchema::new(flattened));
            }
        }

        let mut names = HashMap::new();
        for (index, schema) in self.nodes.iter_mut().enumerate() {
            if let Some(name) = schema.name()
                && names.insert(name.clone(), NodeId(index)).is_some()
            {
                return Err(Details::AmbiguousSchemaDefinition(name.clone()).into());
            }
            match schema {
                Schema::Enum(enum_schema) => validate_enum(enum_schema)?,
                Schema::Record(record) => {
                    let mut seen = HashSet::new();
                    for (position, field) in record.fields.iter_mut().enumerate() {
                        validate_field_name(&field.name)?;
                        if !seen.insert(field.name.clone()) {
                            return Err(Details::FieldNameDuplicate(field.name.clone()).into());
                        }
                        field.position = position;
                    }
                }
                _ => {}
            }
        }

        for schema in &self.nodes {
            if let Schema::Record(record) = schema {
                for field in &record.fields {
                    if let Some(default) = &field.default
                        && !default.conforms_to(&self.nodes, field.schema)
                    {
                        return Err(Details::GetDefaultRecordField {
                            field: field.name.clone(),
                            record: record.name.to_string(),
                            default: default.to_json(),
                            schema: SchemaKind::from(&self.nodes[field.schema.0]),
                            reason: "the value does not match the field schema".to_string(),
                        }
                        .into());
                    }
                }
            }
        }

        Ok(SchemaGraph {
            id: NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed),
            nodes: self.nodes,
            root,
            names,
        })
    }
}

fn validate_enum(enum_schema: &EnumSchema) -> AvroResult<()> {
    let mut seen = HashSet::new();
    for symbol in &enum_schema.symbols {
        validate_enum_symbol(symbol)?;
        if !seen.insert(symbol.as_str()) {
            return Err(Details::EnumSymbolDuplicate(symbol.clone()).into());
        }
    }
    match &enum_schema.default {
        Some(default) if !seen.contains(default.as_str()) => Err(Details::GetEnumDefault {
            symbol: default.clone(),
            symbols: enum_schema.symbols.clone(),
        }
        .into()),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use pretty_assertions::assert_eq;

    type TestResult = anyhow::Result<()>;

    #[test]
    fn nested_unions_are_flattened() -> TestResult {
        let mut builder = SchemaGraph::builder();
        let null = builder.add(Schema::Null);
        let int = builder.add(Schema::Int);
        let string = builder.add(Schema::String);
        let inner = builder.add_union(vec![int, string]);
        let outer = builder.add_union(vec![null, inner]);
        let graph = builder.build(outer)?;

        let Schema::Union(union) = graph.node(outer) else {
            panic!("Expected a union");
        };
        assert_eq!(union.variants(), &[null, int, string]);
        Ok(())
    }

    #[test]
    fn duplicate_unnamed_union_kinds_are_rejected() {
        let mut builder = SchemaGraph::builder();
        let a = builder.add(Schema::Int);
        let b = builder.add(Schema::Int);
        let union = builder.add_union(vec![a, b]);
        assert!(matches!(
            builder.build(union).map_err(Error::into_details),
            Err(Details::GetUnionDuplicate(SchemaKind::Int))
        ));
    }

    #[test]
    fn pending_nodes_fail_the_build() {
        let mut builder = SchemaGraph::builder();
        let root = builder.reserve();
        assert!(matches!(
            builder.build(root).map_err(Error::into_details),
            Err(Details::UnknownNode { index: 0, len: 1 })
        ));
    }

    #[test]
    fn invalid_defaults_are_rejected() -> TestResult {
        let mut builder = SchemaGraph::builder();
        let int = builder.add(Schema::Int);
        let record = builder.add(Schema::Record(
            RecordSchema::builder()
                .name(Name::new("R")?)
                .fields(vec![
                    RecordField::builder()
                        .name("a")
                        .schema(int)
                        .default(Value::String("nope".into()))
                        .build(),
                ])
                .build(),
        ));
        assert!(matches!(
            builder.build(record).map_err(Error::into_details),
            Err(Details::GetDefaultRecordField { .. })
        ));
        Ok(())
    }

    #[test]
    fn graphs_get_distinct_ids() -> TestResult {
        let first = SchemaGraph::parse_str(r#""int""#)?;
        let second = SchemaGraph::parse_str(r#""int""#)?;
        assert_ne!(first.id(), second.id());
        Ok(())
    }
}
