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

//! # Custom name validation
//!
//! Names of records, enums and fixed types, their namespaces, enum symbols and record field
//! names are checked against the rules of the
//! [Avro specification](https://avro.apache.org/docs/1.11.1/specification/#names) when a
//! [`SchemaGraph`](crate::schema::SchemaGraph) is built.
//!
//! Writers produced by other Avro SDKs are sometimes more lenient. To accept their schemas,
//! register a [`NameValidator`] that overrides some of the regexes:
//!
//! ```
//! # use avro_direct::validator::{NameValidator, set_name_validator};
//! # use regex_lite::Regex;
//! # use std::sync::LazyLock;
//! struct AllowDashes;
//!
//! impl NameValidator for AllowDashes {
//!     fn field_name_regex(&self) -> &'static Regex {
//!         static FIELD: LazyLock<Regex> =
//!             LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").expect("valid regex"));
//!         &FIELD
//!     }
//! }
//!
//! // register before the first schema is parsed
//! if set_name_validator(Box::new(AllowDashes)).is_err() {
//!     panic!("a name validator was already configured");
//! }
//! ```
//!
//! **Note**: the validator can be set only once per process. Parsing a schema before calling
//! [`set_name_validator`] registers the default one.

use crate::{AvroResult, error::Details};
use log::debug;
use regex_lite::Regex;
use std::sync::{LazyLock, OnceLock};

static SCHEMA_NAME: LazyLock<Regex> = LazyLock::new(|| {
    // An optional dotted namespace followed by a name without dots.
    Regex::new(
        r"^((?P<namespace>([A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*)?)\.)?(?P<name>[A-Za-z_][A-Za-z0-9_]*)$",
    )
    .expect("schema name regex is valid")
});

static NAMESPACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*)?$")
        .expect("namespace regex is valid")
});

static SIMPLE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("simple name regex is valid"));

/// Validates the names found in a schema.
///
/// Every method has a default that follows the Avro specification, so an implementation only
/// overrides what it needs.
pub trait NameValidator: Send + Sync {
    /// Regex for a (possibly namespace-qualified) schema name.
    ///
    /// It must provide a capture group called `name` around the unqualified part.
    fn schema_name_regex(&self) -> &'static Regex {
        &SCHEMA_NAME
    }

    fn namespace_regex(&self) -> &'static Regex {
        &NAMESPACE
    }

    fn enum_symbol_regex(&self) -> &'static Regex {
        &SIMPLE_NAME
    }

    fn field_name_regex(&self) -> &'static Regex {
        &SIMPLE_NAME
    }

    /// Validates a schema name and returns the byte offset where the unqualified name starts.
    fn validate_schema_name(&self, schema_name: &str) -> AvroResult<usize> {
        let regex = self.schema_name_regex();
        regex
            .captures(schema_name)
            .and_then(|caps| caps.name("name"))
            .map(|name| name.start())
            .ok_or_else(|| {
                Details::InvalidSchemaName(schema_name.to_string(), regex.as_str()).into()
            })
    }

    fn validate_namespace(&self, namespace: &str) -> AvroResult<()> {
        let regex = self.namespace_regex();
        if regex.is_match(namespace) {
            Ok(())
        } else {
            Err(Details::InvalidNamespace(namespace.to_string(), regex.as_str()).into())
        }
    }

    fn validate_enum_symbol(&self, symbol: &str) -> AvroResult<()> {
        if self.enum_symbol_regex().is_match(symbol) {
            Ok(())
        } else {
            Err(Details::EnumSymbolName(symbol.to_string()).into())
        }
    }

    fn validate_field_name(&self, field_name: &str) -> AvroResult<()> {
        if self.field_name_regex().is_match(field_name) {
            Ok(())
        } else {
            Err(Details::FieldName(field_name.to_string()).into())
        }
    }
}

struct DefaultValidator;

impl NameValidator for DefaultValidator {}

static VALIDATOR_ONCE: OnceLock<Box<dyn NameValidator>> = OnceLock::new();

/// Sets a custom name validator.
///
/// Returns `Err(validator)` if a validator is already configured.
pub fn set_name_validator(
    validator: Box<dyn NameValidator>,
) -> Result<(), Box<dyn NameValidator>> {
    debug!("Setting a custom name validator.");
    VALIDATOR_ONCE.set(validator)
}

fn validator() -> &'static dyn NameValidator {
    VALIDATOR_ONCE
        .get_or_init(|| {
            debug!("Going to use the default name validator.");
            Box::new(DefaultValidator)
        })
        .as_ref()
}

pub(crate) fn validate_schema_name(schema_name: &str) -> AvroResult<usize> {
    validator().validate_schema_name(schema_name)
}

pub(crate) fn validate_namespace(namespace: &str) -> AvroResult<()> {
    validator().validate_namespace(namespace)
}

pub(crate) fn validate_enum_symbol(symbol: &str) -> AvroResult<()> {
    validator().validate_enum_symbol(symbol)
}

pub(crate) fn validate_field_name(field_name: &str) -> AvroResult<()> {
    validator().validate_field_name(field_name)
}
