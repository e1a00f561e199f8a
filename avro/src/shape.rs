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

//! The field layout of a Rust type, independent of any schema.
//!
//! A [`TargetShape`] is what the code generating [`AvroEncode`](crate::AvroEncode) and
//! [`AvroDecode`](crate::AvroDecode) implementations hands to the codec. The codec identifies a
//! shape by its address, so shapes are expected to live in statics:
//!
//! ```
//! # use avro_direct::shape::{ShapeField, TargetShape};
//! # use avro_direct::types::Value;
//! # use std::sync::LazyLock;
//! static POINT: LazyLock<TargetShape> = LazyLock::new(|| {
//!     TargetShape::builder()
//!         .name("geo.Point")
//!         .fields(vec![
//!             ShapeField::builder().name("x").build(),
//!             ShapeField::builder().name("y").build(),
//!             ShapeField::builder()
//!                 .name("z")
//!                 .aliases(vec!["height".to_string()])
//!                 .default(Value::Double(0.0))
//!                 .build(),
//!         ])
//!         .build()
//! });
//! assert_eq!(POINT.index_of("height"), Some(2));
//! ```

use crate::types::Value;

/// The ordered fields of a record-like Rust type.
///
/// The element index of a field is its position in [`fields`](Self::fields).
#[derive(bon::Builder, Clone, Debug, PartialEq)]
pub struct TargetShape {
    /// Full name of the type, used to pick a record branch out of a union.
    #[builder(into)]
    pub name: String,
    /// Alternative full names of the type.
    #[builder(default)]
    pub aliases: Vec<String>,
    #[builder(default)]
    pub fields: Vec<ShapeField>,
}

/// One field of a [`TargetShape`].
#[derive(bon::Builder, Clone, Debug, PartialEq)]
pub struct ShapeField {
    #[builder(into)]
    pub name: String,
    #[builder(default)]
    pub aliases: Vec<String>,
    /// Value injected when the writer schema has no such field.
    pub default: Option<Value>,
    /// The Rust type fills the field itself when the writer schema has no such field.
    #[builder(default)]
    pub has_builtin_default: bool,
}

impl TargetShape {
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, index: usize) -> Option<&ShapeField> {
        self.fields.get(index)
    }

    /// Position of the field named `name`, or declaring `name` as an alias.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.name == name)
            .or_else(|| {
                self.fields
                    .iter()
                    .position(|f| f.aliases.iter().any(|a| a == name))
            })
    }

    /// The address of this shape, its identity in the plan cache.
    pub(crate) fn identity(&'static self) -> usize {
        std::ptr::from_ref(self) as usize
    }
}

impl ShapeField {
    /// Whether the field can be produced without the writer providing it.
    pub fn is_optional(&self) -> bool {
        self.default.is_some() || self.has_builtin_default
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn index_of_prefers_names_over_aliases() {
        let shape = TargetShape::builder()
            .name("Swap")
            .fields(vec![
                ShapeField::builder()
                    .name("a")
                    .aliases(vec!["b".to_string()])
                    .build(),
                ShapeField::builder().name("b").build(),
            ])
            .build();

        assert_eq!(shape.index_of("b"), Some(1));
        assert_eq!(shape.index_of("a"), Some(0));
        assert_eq!(shape.index_of("c"), None);
    }

    #[test]
    fn optional_fields() {
        let required = ShapeField::builder().name("r").build();
        let defaulted = ShapeField::builder().name("d").default(Value::Int(5)).build();
        let builtin = ShapeField::builder().name("b").has_builtin_default(true).build();

        assert!(!required.is_optional());
        assert!(defaulted.is_optional());
        assert!(builtin.is_optional());
    }
}
