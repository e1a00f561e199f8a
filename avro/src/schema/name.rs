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

use serde::{Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};
use std::{
    fmt::{Debug, Display, Formatter},
    str::FromStr,
};

use crate::{
    AvroResult, Error,
    error::Details,
    util::MapHelper,
    validator::{validate_namespace, validate_schema_name},
};

/// The full name of a `record`, `enum` or `fixed` schema.
///
/// A full name is an optional dotted namespace followed by a simple name. Names without an
/// explicit namespace inherit the namespace of the enclosing named type.
#[derive(Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Name {
    namespace_and_name: String,
    /// Start byte of the simple name, zero when there is no namespace.
    index_of_name: usize,
}

/// Optional namespace borrowed from an enclosing named type.
pub type NamespaceRef<'a> = Option<&'a str>;

impl Name {
    /// Create a new `Name`, splitting the namespace off a dotted `name`.
    pub fn new(name: impl Into<String> + AsRef<str>) -> AvroResult<Self> {
        Self::new_with_enclosing_namespace(name, None)
    }

    /// Create a new `Name`, qualifying it with `enclosing_namespace` when it has no namespace
    /// of its own.
    pub fn new_with_enclosing_namespace(
        name: impl Into<String> + AsRef<str>,
        enclosing_namespace: NamespaceRef,
    ) -> AvroResult<Self> {
        let name_ref = name.as_ref();
        let index_of_name = validate_schema_name(name_ref)?;

        match (index_of_name, enclosing_namespace) {
            (0, Some(namespace)) if !namespace.is_empty() => {
                validate_namespace(namespace)?;
                Ok(Self {
                    namespace_and_name: format!("{namespace}.{name_ref}"),
                    index_of_name: namespace.len() + 1,
                })
            }
            // a leading dot means "explicitly no namespace"
            (1, _) => Ok(Self {
                namespace_and_name: name_ref[1..].to_string(),
                index_of_name: 0,
            }),
            _ => Ok(Self {
                namespace_and_name: name.into(),
                index_of_name,
            }),
        }
    }

    /// Read the `name` and `namespace` attributes of a JSON schema object.
    pub(crate) fn parse(
        complex: &Map<String, JsonValue>,
        enclosing_namespace: NamespaceRef,
    ) -> AvroResult<Self> {
        let name_field = complex.name().ok_or(Details::GetNameField)?;
        let namespace = complex.string("namespace");
        Self::new_with_enclosing_namespace(
            name_field,
            namespace.as_deref().or(enclosing_namespace),
        )
    }

    pub fn name(&self) -> &str {
        &self.namespace_and_name[self.index_of_name..]
    }

    pub fn namespace(&self) -> NamespaceRef<'_> {
        if self.index_of_name == 0 {
            None
        } else {
            Some(&self.namespace_and_name[..(self.index_of_name - 1)])
        }
    }

    /// The dotted full name.
    pub fn fullname(&self) -> &str {
        &self.namespace_and_name
    }
}

impl TryFrom<&str> for Name {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl FromStr for Name {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Debug for Name {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut debug = f.debug_struct("Name");
        debug.field("name", &self.name());
        match self.namespace() {
            Some(namespace) => debug.field("namespace", &namespace).finish(),
            None => debug.finish_non_exhaustive(),
        }
    }
}

impl Display for Name {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.namespace_and_name)
    }
}

impl Serialize for Name {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.fullname())
    }
}

/// An alternative full name of a named schema.
///
/// Aliases without a namespace are qualified with the namespace of the schema declaring them.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Alias(Name);

impl Alias {
    pub fn new(name: &str) -> AvroResult<Self> {
        Name::new(name).map(Self)
    }

    pub(crate) fn qualified(name: &str, namespace: NamespaceRef) -> AvroResult<Self> {
        Name::new_with_enclosing_namespace(name, namespace).map(Self)
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }

    pub fn fullname(&self) -> &str {
        self.0.fullname()
    }
}

impl FromStr for Alias {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for Alias {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.fullname())
    }
}
