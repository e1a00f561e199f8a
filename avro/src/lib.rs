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

//! Direct encoding and decoding of Rust values in the
//! [Apache Avro](https://avro.apache.org/) binary format.
//!
//! Values are written straight to a [`Write`](std::io::Write) sink and read straight from a
//! [`Read`](std::io::Read) source, without an intermediate value tree. The schema the bytes are
//! written with (the *writer schema*) and the field layout of the Rust type (its
//! [`TargetShape`](shape::TargetShape)) are reconciled once per pair by the
//! [`resolution`] planner; fields are matched by name and alias, so both sides may evolve
//! independently:
//!
//! - fields the Rust type lacks are skipped when reading and filled with their schema default
//!   when writing,
//! - fields the writer lacks are filled with the default recorded in the shape when reading,
//! - fields declared in a different order are reordered.
//!
//! Union branches are chosen from the kind of the value being written (see [`matcher`]) and
//! scalar values are converted where Avro schema resolution allows it, for example an `int`
//! written by an old writer is read into an `i64`.
//!
//! ```
//! use avro_direct::{
//!     AvroCodec, AvroDecode, AvroEncode, AvroResult, Decoder, Encoder, RecordAccess,
//!     decode::required,
//!     schema::SchemaGraph,
//!     shape::{ShapeField, TargetShape},
//!     types::Value,
//! };
//! use std::{io::Write, sync::LazyLock};
//!
//! #[derive(Debug, PartialEq)]
//! struct User {
//!     name: String,
//!     age: i64,
//! }
//!
//! static USER: LazyLock<TargetShape> = LazyLock::new(|| {
//!     TargetShape::builder()
//!         .name("User")
//!         .fields(vec![
//!             ShapeField::builder().name("name").build(),
//!             ShapeField::builder().name("age").default(Value::Long(-1)).build(),
//!         ])
//!         .build()
//! });
//!
//! impl AvroEncode for User {
//!     fn encode<W: Write>(&self, encoder: Encoder<'_, W>) -> AvroResult<()> {
//!         encoder.encode_record(&USER, |record| {
//!             record.field(0, &self.name)?;
//!             record.field(1, &self.age)
//!         })
//!     }
//! }
//!
//! impl AvroDecode for User {
//!     fn decode<D: Decoder>(decoder: D) -> AvroResult<Self> {
//!         decoder.decode_record(&USER, |record| {
//!             let (mut name, mut age) = (None, None);
//!             while let Some(index) = record.next_field()? {
//!                 match index {
//!                     0 => name = Some(record.field_value()?),
//!                     _ => age = Some(record.field_value()?),
//!                 }
//!             }
//!             Ok(User {
//!                 name: required(name, &USER, 0)?,
//!                 age: required(age, &USER, 1)?,
//!             })
//!         })
//!     }
//! }
//!
//! // An older writer without the `age` field, with an extra `email`.
//! let codec = AvroCodec::new(SchemaGraph::parse_str(
//!     r#"{"type": "record", "name": "User", "fields": [
//!         {"name": "email", "type": "string", "default": ""},
//!         {"name": "name", "type": "string"}
//!     ]}"#,
//! )?);
//!
//! let user = User { name: "Ada".to_string(), age: 36 };
//! let bytes = codec.encode_to_vec(&user)?;
//! assert_eq!(bytes, [0x00, 0x06, b'A', b'd', b'a']);
//! assert_eq!(
//!     codec.decode_slice::<User>(&bytes)?,
//!     User { name: "Ada".to_string(), age: -1 }
//! );
//! # Ok::<(), avro_direct::Error>(())
//! ```
//!
//! Container files, single object encoding, the JSON encoding and schema compatibility checks are
//! not part of this crate.
//!
//! # MSRV
//!
//! The current MSRV is 1.88.0.

mod bytes;
mod codec;

pub mod decode;
pub mod encode;
pub mod error;
pub mod matcher;
pub mod resolution;
pub mod schema;
pub mod shape;
pub mod types;
pub mod util;
pub mod validator;

pub use crate::{
    bytes::Bytes,
    codec::AvroCodec,
    decode::{AvroDecode, Decoder, RecordAccess},
    encode::{AvroEncode, Encoder, RecordEncoder},
    error::Error,
    schema::{Schema, SchemaGraph},
};

/// A convenience type alias for `Result`s with `Error`s.
pub type AvroResult<T> = Result<T, Error>;
