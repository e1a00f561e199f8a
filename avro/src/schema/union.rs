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
    schema::{NodeId, Schema, SchemaKind},
};
use std::collections::HashSet;

/// A description of a Union schema.
#[derive(Debug, Clone, PartialEq)]
pub struct UnionSchema {
    variants: Vec<NodeId>,
}

impl UnionSchema {
    /// Creates a new union over the given nodes.
    ///
    /// Nested unions and duplicates are only detected when the enclosing
    /// [`SchemaGraph`](crate::schema::SchemaGraph) is built.
    pub fn new(variants: Vec<NodeId>) -> Self {
        Self { variants }
    }

    /// The branches of this union, in declaration order.
    pub fn variants(&self) -> &[NodeId] {
        &self.variants
    }
}

/// Replace every union branch by its own branches, preserving declaration order, then reject
/// duplicate unnamed kinds and duplicate full names.
pub(crate) fn flatten(nodes: &[Schema], variants: &[NodeId]) -> AvroResult<Vec<NodeId>> {
    let mut flattened = Vec::with_capacity(variants.len());
    expand(nodes, variants, &mut flattened, &mut Vec::new());

    let mut kinds = HashSet::new();
    let mut names = HashSet::new();
    for node in &flattened {
        let schema = &nodes[node.index()];
        let unique = match schema.name() {
            Some(name) => names.insert(name.fullname()),
            None => kinds.insert(SchemaKind::from(schema)),
        };
        if !unique {
            return Err(Details::GetUnionDuplicate(SchemaKind::from(schema)).into());
        }
    }
    if flattened.is_empty() {
        return Err(Details::EmptyUnion.into());
    }
    Ok(flattened)
}

fn expand(nodes: &[Schema], variants: &[NodeId], out: &mut Vec<NodeId>, visiting: &mut Vec<NodeId>) {
    for &variant in variants {
        match &nodes[variant.index()] {
            Schema::Union(inner) => {
                if visiting.contains(&variant) {
                    continue;
                }
                visiting.push(variant);
                expand(nodes, inner.variants(), out, visiting);
                visiting.pop();
            }
            _ => out.push(variant),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::Error,
        schema::{FixedSchema, Name, SchemaGraphBuilder},
    };
    use pretty_assertions::assert_eq;

    type TestResult = anyhow::Result<()>;

    #[test]
    fn named_branches_of_the_same_kind_are_allowed() -> TestResult {
        let mut builder = SchemaGraphBuilder::new();
        let md5 = builder.add(Schema::Fixed(
            FixedSchema::builder().name(Name::new("md5")?).size(16).build(),
        ));
        let sha = builder.add(Schema::Fixed(
            FixedSchema::builder().name(Name::new("sha1")?).size(20).build(),
        ));
        assert_eq!(flatten(builder.nodes(), &[md5, sha])?, vec![md5, sha]);

        assert!(matches!(
            flatten(builder.nodes(), &[md5, md5]).map_err(Error::into_details),
            Err(Details::GetUnionDuplicate(SchemaKind::Fixed))
        ));
        Ok(())
    }

    #[test]
    fn empty_union_is_rejected() {
        assert!(matches!(
            flatten(&[], &[]).map_err(Error::into_details),
            Err(Details::EmptyUnion)
        ));
    }
}
