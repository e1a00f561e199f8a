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
    resolution::{ResolutionPlan, resolve},
    schema::{NodeId, SchemaGraph},
    shape::TargetShape,
};
use dashmap::DashMap;
use log::trace;
use std::sync::Arc;

/// `(graph id, writer node, shape address)`
type PlanKey = (u64, NodeId, usize);

/// Resolution plans computed so far, shared by concurrent encode and decode calls.
///
/// Entries are inserted once and never modified or evicted; they live as long as the cache.
/// Failed resolutions are not cached.
#[derive(Debug, Default)]
pub struct PlanCache {
    plans: DashMap<PlanKey, Arc<ResolutionPlan>>,
}

impl PlanCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The plan for the record at `writer` and `shape`, resolving it on first use.
    pub fn get_or_resolve(
        &self,
        graph: &SchemaGraph,
        writer: NodeId,
        shape: &'static TargetShape,
    ) -> AvroResult<Arc<ResolutionPlan>> {
        let key = (graph.id(), writer, shape.identity());
        if let Some(plan) = self.plans.get(&key) {
            trace!("Plan cache hit for {key:?}");
            return Ok(Arc::clone(plan.value()));
        }

        let plan = Arc::new(resolve(graph, writer, shape)?);
        // Another thread may have won the race, keep whichever entry landed first.
        let entry = self.plans.entry(key).or_insert(plan);
        Ok(Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::ShapeField;
    use pretty_assertions::assert_eq;
    use std::sync::LazyLock;

    type TestResult = anyhow::Result<()>;

    static SHAPE: LazyLock<TargetShape> = LazyLock::new(|| {
        TargetShape::builder()
            .name("Id")
            .fields(vec![ShapeField::builder().name("id").build()])
            .build()
    });

    #[test]
    fn plans_are_computed_once_per_key() -> TestResult {
        let graph =
            SchemaGraph::parse_str(r#"{"type": "record", "name": "Id", "fields": [{"name": "id", "type": "long"}]}"#)?;
        let other =
            SchemaGraph::parse_str(r#"{"type": "record", "name": "Id", "fields": [{"name": "id", "type": "long"}]}"#)?;
        let cache = PlanCache::new();

        let first = cache.get_or_resolve(&graph, graph.root(), &SHAPE)?;
        let second = cache.get_or_resolve(&graph, graph.root(), &SHAPE)?;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);

        let third = cache.get_or_resolve(&other, other.root(), &SHAPE)?;
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(cache.len(), 2);
        Ok(())
    }

    #[test]
    fn concurrent_lookups_share_one_plan() -> TestResult {
        let graph =
            SchemaGraph::parse_str(r#"{"type": "record", "name": "Id", "fields": [{"name": "id", "type": "long"}]}"#)?;
        let cache = PlanCache::new();

        let plans = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| cache.get_or_resolve(&graph, graph.root(), &SHAPE)))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().expect("thread panicked"))
                .collect::<AvroResult<Vec<_>>>()
        })?;

        let cached = cache.get_or_resolve(&graph, graph.root(), &SHAPE)?;
        assert!(plans.iter().all(|plan| Arc::ptr_eq(plan, &cached)));
        assert_eq!(cache.len(), 1);
        Ok(())
    }
}
