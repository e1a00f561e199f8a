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

use std::ops::{Deref, DerefMut};

/// An Avro `bytes` value.
///
/// `Vec<u8>` is encoded as an Avro `array` of `int`s like every other `Vec`; wrap it in `Bytes` to
/// use the length-prefixed `bytes` form instead. Fixed-size byte arrays (`[u8; N]`) are encoded as
/// Avro `fixed`.
///
/// ```
/// # use avro_direct::{AvroCodec, Bytes, schema::SchemaGraph};
/// let codec = AvroCodec::new(SchemaGraph::parse_str(r#""bytes""#)?);
/// let encoded = codec.encode_to_vec(&Bytes::from(vec![0xCA, 0xFE]))?;
/// assert_eq!(encoded, [0x04, 0xCA, 0xFE]);
/// assert_eq!(codec.decode_slice::<Bytes>(&encoded)?, Bytes::from(vec![0xCA, 0xFE]));
/// # Ok::<(), avro_direct::Error>(())
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl Deref for Bytes {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Bytes {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Bytes {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl AsRef<[u8]> for Bytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
