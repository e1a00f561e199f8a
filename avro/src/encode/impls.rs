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
    AvroResult, Bytes,
    encode::{AvroEncode, Encoder},
    types::Value,
};
use std::{
    collections::{BTreeMap, HashMap},
    io::Write,
};

macro_rules! encode_as {
    ($method:ident: $($ty:ty => $conv:expr),+ $(,)?) => {
        $(
            impl AvroEncode for $ty {
                fn encode<W: Write>(&self, encoder: Encoder<'_, W>) -> AvroResult<()> {
                    encoder.$method($conv(*self))
                }
            }
        )+
    };
}

encode_as!(encode_bool: bool => std::convert::identity);
encode_as!(encode_int: i8 => i32::from, i16 => i32::from, i32 => std::convert::identity, u8 => i32::from, u16 => i32::from);
encode_as!(encode_long: i64 => std::convert::identity, u32 => i64::from);
encode_as!(encode_float: f32 => std::convert::identity);
encode_as!(encode_double: f64 => std::convert::identity);

impl AvroEncode for () {
    fn encode<W: Write>(&self, encoder: Encoder<'_, W>) -> AvroResult<()> {
        encoder.encode_null()
    }
}

impl AvroEncode for str {
    fn encode<W: Write>(&self, encoder: Encoder<'_, W>) -> AvroResult<()> {
        encoder.encode_str(self)
    }
}

impl AvroEncode for String {
    fn encode<W: Write>(&self, encoder: Encoder<'_, W>) -> AvroResult<()> {
        encoder.encode_str(self)
    }
}

impl AvroEncode for Bytes {
    fn encode<W: Write>(&self, encoder: Encoder<'_, W>) -> AvroResult<()> {
        encoder.encode_bytes(self)
    }
}

impl<const N: usize> AvroEncode for [u8; N] {
    fn encode<W: Write>(&self, encoder: Encoder<'_, W>) -> AvroResult<()> {
        encoder.encode_fixed(None, self)
    }
}

impl<T: AvroEncode + ?Sized> AvroEncode for &T {
    fn encode<W: Write>(&self, encoder: Encoder<'_, W>) -> AvroResult<()> {
        (**self).encode(encoder)
    }
}

impl<T: AvroEncode + ?Sized> AvroEncode for Box<T> {
    fn encode<W: Write>(&self, encoder: Encoder<'_, W>) -> AvroResult<()> {
        (**self).encode(encoder)
    }
}

impl<T: AvroEncode> AvroEncode for Option<T> {
    fn encode<W: Write>(&self, encoder: Encoder<'_, W>) -> AvroResult<()> {
        match self {
            Some(value) => value.encode(encoder),
            None => encoder.encode_null(),
        }
    }
}

impl<T: AvroEncode> AvroEncode for [T] {
    fn encode<W: Write>(&self, encoder: Encoder<'_, W>) -> AvroResult<()> {
        encoder.encode_array(self)
    }
}

impl<T: AvroEncode> AvroEncode for Vec<T> {
    fn encode<W: Write>(&self, encoder: Encoder<'_, W>) -> AvroResult<()> {
        encoder.encode_array(self)
    }
}

impl<T: AvroEncode> AvroEncode for HashMap<String, T> {
    fn encode<W: Write>(&self, encoder: Encoder<'_, W>) -> AvroResult<()> {
        encoder.encode_map(self.iter().map(|(k, v)| (k.as_str(), v)))
    }
}

impl<T: AvroEncode> AvroEncode for BTreeMap<String, T> {
    fn encode<W: Write>(&self, encoder: Encoder<'_, W>) -> AvroResult<()> {
        encoder.encode_map(self.iter().map(|(k, v)| (k.as_str(), v)))
    }
}

impl AvroEncode for Value {
    fn encode<W: Write>(&self, encoder: Encoder<'_, W>) -> AvroResult<()> {
        encoder.encode_value(self)
    }
}
