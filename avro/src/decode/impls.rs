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
    decode::{AvroDecode, Decoder},
    error::Details,
};
use std::collections::{BTreeMap, HashMap};

macro_rules! decode_narrowed {
    ($method:ident: $($ty:ty),+) => {
        $(
            impl AvroDecode for $ty {
                fn decode<D: Decoder>(decoder: D) -> AvroResult<Self> {
                    let value = decoder.$method()?;
                    <$ty>::try_from(value).map_err(|_| {
                        Details::IntegerOutOfRange {
                            value: i64::from(value),
                            target: stringify!($ty),
                        }
                        .into()
                    })
                }
            }
        )+
    };
}

decode_narrowed!(decode_int: i8, i16, u8, u16);
decode_narrowed!(decode_long: u32);

impl AvroDecode for () {
    fn decode<D: Decoder>(decoder: D) -> AvroResult<Self> {
        decoder.decode_null()
    }
}

impl AvroDecode for bool {
    fn decode<D: Decoder>(decoder: D) -> AvroResult<Self> {
        decoder.decode_bool()
    }
}

impl AvroDecode for i32 {
    fn decode<D: Decoder>(decoder: D) -> AvroResult<Self> {
        decoder.decode_int()
    }
}

impl AvroDecode for i64 {
    fn decode<D: Decoder>(decoder: D) -> AvroResult<Self> {
        decoder.decode_long()
    }
}

impl AvroDecode for f32 {
    fn decode<D: Decoder>(decoder: D) -> AvroResult<Self> {
        decoder.decode_float()
    }
}

impl AvroDecode for f64 {
    fn decode<D: Decoder>(decoder: D) -> AvroResult<Self> {
        decoder.decode_double()
    }
}

impl AvroDecode for String {
    fn decode<D: Decoder>(decoder: D) -> AvroResult<Self> {
        decoder.decode_string()
    }
}

impl AvroDecode for Bytes {
    fn decode<D: Decoder>(decoder: D) -> AvroResult<Self> {
        decoder.decode_bytes().map(Bytes)
    }
}

impl<const N: usize> AvroDecode for [u8; N] {
    fn decode<D: Decoder>(decoder: D) -> AvroResult<Self> {
        let bytes = decoder.decode_fixed(N)?;
        let actual = bytes.len();
        bytes.try_into().map_err(|_| {
            Details::FixedSizeMismatch {
                expected: N,
                actual,
            }
            .into()
        })
    }
}

impl<T: AvroDecode> AvroDecode for Box<T> {
    fn decode<D: Decoder>(decoder: D) -> AvroResult<Self> {
        T::decode(decoder).map(Box::new)
    }
}

impl<T: AvroDecode> AvroDecode for Option<T> {
    fn decode<D: Decoder>(decoder: D) -> AvroResult<Self> {
        decoder.decode_option()
    }
}

impl<T: AvroDecode> AvroDecode for Vec<T> {
    fn decode<D: Decoder>(decoder: D) -> AvroResult<Self> {
        decoder.decode_array()
    }
}

impl<T: AvroDecode> AvroDecode for HashMap<String, T> {
    fn decode<D: Decoder>(decoder: D) -> AvroResult<Self> {
        Ok(decoder.decode_map()?.into_iter().collect())
    }
}

impl<T: AvroDecode> AvroDecode for BTreeMap<String, T> {
    fn decode<D: Decoder>(decoder: D) -> AvroResult<Self> {
        Ok(decoder.decode_map()?.into_iter().collect())
    }
}
