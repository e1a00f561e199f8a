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
    schema::{Alias, Name, NodeId},
    types::Value,
};

/// A description of a Record schema.
#[derive(bon::Builder, Clone, Debug, PartialEq)]
pub struct RecordSchema {
    pub name: Name,
    #[builder(default)]
    pub aliases: Vec<Alias>,
    /// Fields in the order they are written on the wire.
    #[builder(default)]
    pub fields: Vec<RecordField>,
}

impl<S: record_schema_builder::State> RecordSchemaBuilder<S> {
    /// Try to set a Name from the given string.
    pub fn try_name<T>(
        self,
        name: T,
    ) -> Result<RecordSchemaBuilder<record_schema_builder::SetName<S>>, <T as TryInto<Name>>::Error>
    where
        <S as record_schema_builder::State>::Name: record_schema_builder::IsUnset,
        T: TryInto<Name>,
    {
        let name = name.try_into()?;
        Ok(self.name(name))
    }
}

impl RecordSchema {
    pub fn field(&self, name: &str) -> Option<&RecordField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Represents a `field` in a `record` Avro schema.
#[derive(bon::Builder, Clone, Debug, PartialEq)]
pub struct RecordField {
    #[builder(into)]
    pub name: String,
    /// Alternative names of the field. They have no namespace.
    #[builder(default)]
    pub aliases: Vec<String>,
    pub schema: NodeId,
    /// Value used by writers that have no value for the field and by readers whose writer
    /// schema lacks it.
    pub default: Option<Value>,
    /// Position of the field in its record, assigned when the graph is built.
    #[builder(default)]
    pub position: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Schema, SchemaGraph};
    use pretty_assertions::assert_eq;

    type TestResult = anyhow::Result<()>;

    #[test]
    fn record_schema_builder_no_fields() -> TestResult {
        let name = Name::new("TestRecord")?;

        let record_schema = RecordSchema::builder().name(name.clone()).build();

        assert_eq!(record_schema.name, name);
        assert_eq!(record_schema.aliases, Vec::new());
        assert_eq!(record_schema.fields.len(), 0);

        Ok(())
    }

    #[test]
    fn positions_are_assigned_on_build() -> TestResult {
        let mut builder = SchemaGraph::builder();
        let null = builder.add(Schema::Null);
        let boolean = builder.add(Schema::Boolean);
        let record = builder.add(Schema::Record(
            RecordSchema::builder()
                .try_name("TestRecord")?
                .fields(vec![
                    RecordField::builder().name("field1_null").schema(null).build(),
                    RecordField::builder()
                        .name("field2_bool")
                        .aliases(vec!["flag".to_string()])
                        .schema(boolean)
                        .build(),
                ])
                .build(),
        ));
        let graph = builder.build(record)?;

        let Schema::Record(record_schema) = graph.node(record) else {
            panic!("Expected a record");
        };
        let positions: Vec<usize> = record_schema.fields.iter().map(|f| f.position).collect();
        assert_eq!(positions, vec![0, 1]);
        assert_eq!(
            record_schema.field("field2_bool").map(|f| f.aliases.clone()),
            Some(vec!["flag".to_string()])
        );
        Ok(())
    }
}
