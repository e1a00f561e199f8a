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
    error::Details,
    schema::{
        Alias, EnumSchema, FixedSchema, Name, NamespaceRef, NodeId, RecordField, RecordSchema,
        Schema, SchemaGraph, SchemaGraphBuilder, SchemaKind,
    },
    types::Value,
    util::MapHelper,
};
use log::warn;
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;

/// Turns a JSON Avro schema into a [`SchemaGraph`].
#[derive(Default)]
pub(crate) struct Parser {
    builder: SchemaGraphBuilder,
    /// Named types seen so far. A record is registered before its fields are parsed so that
    /// fields can refer back to it.
    named: HashMap<Name, NodeId>,
    primitives: HashMap<SchemaKind, NodeId>,
    /// JSON defaults are converted once every node they may refer to is defined.
    pending_defaults: Vec<PendingDefault>,
}

struct PendingDefault {
    record: NodeId,
    record_name: Name,
    position: usize,
    field: String,
    schema: NodeId,
    json: JsonValue,
}

impl Parser {
    pub(crate) fn parse_root(mut self, json: &JsonValue) -> AvroResult<SchemaGraph> {
        let root = self.parse(json, None)?;
        for pending in std::mem::take(&mut self.pending_defaults) {
            let value = Value::from_json_default(self.builder.nodes(), pending.schema, &pending.json)
                .map_err(|reason| Details::GetDefaultRecordField {
                    field: pending.field.clone(),
                    record: pending.record_name.to_string(),
                    default: pending.json.clone(),
                    schema: SchemaKind::from(&self.builder.nodes()[pending.schema.index()]),
                    reason,
                })?;
            self.builder
                .set_field_default(pending.record, pending.position, value);
        }
        self.builder.build(root)
    }

    fn parse(&mut self, value: &JsonValue, enclosing_namespace: NamespaceRef) -> AvroResult<NodeId> {
        match value {
            JsonValue::String(t) => self.parse_known_schema(t, enclosing_namespace),
            JsonValue::Object(data) => self.parse_complex(data, enclosing_namespace),
            JsonValue::Array(data) => self.parse_union(data, enclosing_namespace),
            _ => Err(Details::ParseSchemaFromValidJson.into()),
        }
    }

    /// Parse a string as a primitive type or a reference to an already seen named type.
    fn parse_known_schema(&mut self, name: &str, enclosing_namespace: NamespaceRef) -> AvroResult<NodeId> {
        let primitive = match name {
            "null" => Schema::Null,
            "boolean" => Schema::Boolean,
            "int" => Schema::Int,
            "long" => Schema::Long,
            "double" => Schema::Double,
            "float" => Schema::Float,
            "bytes" => Schema::Bytes,
            "string" => Schema::String,
            _ => return self.fetch_schema_ref(name, enclosing_namespace),
        };
        let kind = SchemaKind::from(&primitive);
        Ok(*self
            .primitives
            .entry(kind)
            .or_insert_with(|| self.builder.add(primitive)))
    }

    fn fetch_schema_ref(&self, name: &str, enclosing_namespace: NamespaceRef) -> AvroResult<NodeId> {
        let qualified = Name::new_with_enclosing_namespace(name, enclosing_namespace).ok();
        let unqualified = Name::new(name).ok();
        [qualified, unqualified]
            .into_iter()
            .flatten()
            .find_map(|candidate| self.named.get(&candidate).copied())
            .ok_or_else(|| Details::ParsePrimitive(name.to_string()).into())
    }

    fn register(&mut self, name: &Name, node: NodeId) -> AvroResult<()> {
        if self.named.insert(name.clone(), node).is_some() {
            return Err(Details::AmbiguousSchemaDefinition(name.clone()).into());
        }
        Ok(())
    }

    fn parse_complex(
        &mut self,
        complex: &Map<String, JsonValue>,
        enclosing_namespace: NamespaceRef,
    ) -> AvroResult<NodeId> {
        match complex.get("type") {
            Some(JsonValue::String(t)) => match t.as_str() {
                "record" | "error" => self.parse_record(complex, enclosing_namespace),
                "enum" => self.parse_enum(complex, enclosing_namespace),
                "fixed" => self.parse_fixed(complex, enclosing_namespace),
                "array" => {
                    let items = complex.get("items").ok_or(Details::GetArrayItemsField)?;
                    let items = self.parse(items, enclosing_namespace)?;
                    Ok(self.builder.add(Schema::Array(items)))
                }
                "map" => {
                    let values = complex.get("values").ok_or(Details::GetMapValuesField)?;
                    let values = self.parse(values, enclosing_namespace)?;
                    Ok(self.builder.add(Schema::Map(values)))
                }
                other => {
                    if let Some(logical_type) = complex.get("logicalType") {
                        warn!("Ignoring logical type {logical_type} on a `{other}` schema");
                    }
                    self.parse_known_schema(other, enclosing_namespace)
                }
            },
            Some(nested @ (JsonValue::Object(_) | JsonValue::Array(_))) => {
                self.parse(nested, enclosing_namespace)
            }
            Some(other) => Err(Details::GetComplexType(other.clone()).into()),
            None => Err(Details::GetComplexTypeField.into()),
        }
    }

    fn parse_aliases(complex: &Map<String, JsonValue>, name: &Name) -> AvroResult<Vec<Alias>> {
        complex
            .aliases()
            .iter()
            .map(|alias| Alias::qualified(alias, name.namespace()))
            .collect()
    }

    fn parse_record(
        &mut self,
        complex: &Map<String, JsonValue>,
        enclosing_namespace: NamespaceRef,
    ) -> AvroResult<NodeId> {
        let name = Name::parse(complex, enclosing_namespace)?;
        let aliases = Self::parse_aliases(complex, &name)?;
        let node = self.builder.reserve();
        self.register(&name, node)?;

        let fields_json = complex
            .get("fields")
            .and_then(|fields| fields.as_array())
            .ok_or(Details::GetRecordFieldsJson)?;
        let namespace = name.namespace().map(str::to_string);

        let mut fields = Vec::with_capacity(fields_json.len());
        for (position, field) in fields_json.iter().enumerate() {
            let field = field.as_object().ok_or(Details::GetRecordFieldsJson)?;
            let field_name = field.name().ok_or(Details::GetNameFieldFromRecord)?;
            let field_type = field.get("type").ok_or(Details::GetComplexTypeField)?;
            let schema = self.parse(field_type, namespace.as_deref())?;
            if let Some(json) = field.get("default") {
                self.pending_defaults.push(PendingDefault {
                    record: node,
                    record_name: name.clone(),
                    position,
                    field: field_name.clone(),
                    schema,
                    json: json.clone(),
                });
            }
            fields.push(
                RecordField::builder()
                    .name(field_name)
                    .aliases(field.aliases())
                    .schema(schema)
                    .position(position)
                    .build(),
            );
        }

        self.builder.define(
            node,
            Schema::Record(
                RecordSchema::builder()
                    .name(name)
                    .aliases(aliases)
                    .fields(fields)
                    .build(),
            ),
        )?;
        Ok(node)
    }

    fn parse_enum(
        &mut self,
        complex: &Map<String, JsonValue>,
        enclosing_namespace: NamespaceRef,
    ) -> AvroResult<NodeId> {
        let name = Name::parse(complex, enclosing_namespace)?;
        let aliases = Self::parse_aliases(complex, &name)?;
        let symbols = complex
            .get("symbols")
            .ok_or(Details::GetEnumSymbolsField)?
            .as_array()
            .ok_or(Details::GetEnumSymbols)?
            .iter()
            .map(|symbol| symbol.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .ok_or(Details::GetEnumSymbols)?;

        let node = self.builder.add(Schema::Enum(
            EnumSchema::builder()
                .name(name.clone())
                .aliases(aliases)
                .symbols(symbols)
                .maybe_default(complex.string("default"))
                .build(),
        ));
        self.register(&name, node)?;
        Ok(node)
    }

    fn parse_fixed(
        &mut self,
        complex: &Map<String, JsonValue>,
        enclosing_namespace: NamespaceRef,
    ) -> AvroResult<NodeId> {
        let name = Name::parse(complex, enclosing_namespace)?;
        let aliases = Self::parse_aliases(complex, &name)?;
        let size = complex
            .get("size")
            .and_then(|size| size.as_u64())
            .and_then(|size| usize::try_from(size).ok())
            .ok_or_else(|| Details::GetFixedSizeField(complex.get("size").cloned()))?;
        if let Some(logical_type) = complex.get("logicalType") {
            warn!("Ignoring logical type {logical_type} on fixed {name}");
        }

        let node = self.builder.add(Schema::Fixed(
            FixedSchema::builder()
                .name(name.clone())
                .aliases(aliases)
                .size(size)
                .build(),
        ));
        self.register(&name, node)?;
        Ok(node)
    }

    fn parse_union(&mut self, items: &[JsonValue], enclosing_namespace: NamespaceRef) -> AvroResult<NodeId> {
        let variants = items
            .iter()
            .map(|item| self.parse(item, enclosing_namespace))
            .collect::<AvroResult<Vec<_>>>()?;
        Ok(self.builder.add_union(variants))
    }
}
