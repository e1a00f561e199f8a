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

use crate::{AvroResult, error::Details};
use serde_json::{Map, Value as JsonValue};
use std::{
    io::Write,
    sync::{
        Once,
        atomic::{AtomicUsize, Ordering},
    },
};

/// Maximum number of bytes that can be allocated when decoding
/// Avro-encoded values. This is a protection against ill-formed
/// data, whose length field might be interpreted as enormous.
/// See max_allocation_bytes to change this limit.
pub const DEFAULT_MAX_ALLOCATION_BYTES: usize = 512 * 1024 * 1024;
static MAX_ALLOCATION_BYTES: AtomicUsize = AtomicUsize::new(DEFAULT_MAX_ALLOCATION_BYTES);
static MAX_ALLOCATION_BYTES_ONCE: Once = Once::new();

/// Longest valid encoding of an Avro `int`.
pub const MAX_INT_VARINT_BYTES: usize = 5;
/// Longest valid encoding of an Avro `long`.
pub const MAX_LONG_VARINT_BYTES: usize = 10;

/// Set a new maximum number of bytes that can be allocated when decoding data.
/// Once called, the limit cannot be changed.
///
/// **NOTE** This function must be called before decoding **any** data. The
/// library leverages [`std::sync::Once`](https://doc.rust-lang.org/std/sync/struct.Once.html)
/// to set the limit either when calling this method, or when decoding for
/// the first time.
pub fn max_allocation_bytes(num_bytes: usize) -> usize {
    MAX_ALLOCATION_BYTES_ONCE.call_once(|| {
        MAX_ALLOCATION_BYTES.store(num_bytes, Ordering::Release);
    });
    MAX_ALLOCATION_BYTES.load(Ordering::Acquire)
}

/// Check a length read from the wire against the allocation limit.
pub fn safe_len(len: usize) -> AvroResult<usize> {
    let max_bytes = max_allocation_bytes(DEFAULT_MAX_ALLOCATION_BYTES);

    if len <= max_bytes {
        Ok(len)
    } else {
        Err(Details::MemoryAllocation {
            desired: len,
            maximum: max_bytes,
        }
        .into())
    }
}

pub(crate) trait MapHelper {
    fn string(&self, key: &str) -> Option<String>;

    fn name(&self) -> Option<String> {
        self.string("name")
    }

    fn aliases(&self) -> Vec<String>;
}

impl MapHelper for Map<String, JsonValue> {
    fn string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.as_str()).map(str::to_string)
    }

    fn aliases(&self) -> Vec<String> {
        match self.get("aliases").and_then(|aliases| aliases.as_array()) {
            Some(aliases) => aliases
                .iter()
                .filter_map(|alias| alias.as_str())
                .map(str::to_string)
                .collect(),
            None => Vec::new(),
        }
    }
}

/// Map a signed 64 bit integer onto an unsigned one so that small magnitudes stay small.
#[inline]
pub fn zigzag(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

/// Inverse of [`zigzag`].
#[inline]
pub fn unzigzag(z: u64) -> i64 {
    if z & 0x1 == 0 {
        (z >> 1) as i64
    } else {
        !(z >> 1) as i64
    }
}

pub fn zig_i32<W: Write>(n: i32, writer: W) -> AvroResult<usize> {
    zig_i64(n as i64, writer)
}

pub fn zig_i64<W: Write>(n: i64, writer: W) -> AvroResult<usize> {
    encode_variable(zigzag(n), writer)
}

/// Write `z` as a base-128 varint, least significant group first.
pub(crate) fn encode_variable<W: Write>(mut z: u64, mut writer: W) -> AvroResult<usize> {
    let mut buffer = [0u8; MAX_LONG_VARINT_BYTES];
    let mut i: usize = 0;
    loop {
        if z <= 0x7F {
            buffer[i] = (z & 0x7F) as u8;
            i += 1;
            break;
        }
        buffer[i] = (0x80 | (z & 0x7F)) as u8;
        i += 1;
        z >>= 7;
    }
    writer
        .write_all(&buffer[..i])
        .map_err(Details::WriteBytes)?;
    Ok(i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    type TestResult = anyhow::Result<()>;

    #[rstest]
    #[case(0, &[0x00])]
    #[case(-1, &[0x01])]
    #[case(1, &[0x02])]
    #[case(-2, &[0x03])]
    #[case(-64, &[0x7F])]
    #[case(64, &[0x80, 0x01])]
    #[case(i32::MAX as i64, &[254, 255, 255, 255, 15])]
    #[case(i32::MAX as i64 + 1, &[128, 128, 128, 128, 16])]
    #[case(i32::MIN as i64, &[255, 255, 255, 255, 15])]
    #[case(i32::MIN as i64 - 1, &[129, 128, 128, 128, 16])]
    #[case(i64::MAX, &[254, 255, 255, 255, 255, 255, 255, 255, 255, 1])]
    #[case(i64::MIN, &[255, 255, 255, 255, 255, 255, 255, 255, 255, 1])]
    fn test_zig_i64(#[case] n: i64, #[case] expected: &[u8]) -> TestResult {
        let mut s = Vec::new();
        let written = zig_i64(n, &mut s)?;
        assert_eq!(s, expected);
        assert_eq!(written, expected.len());
        Ok(())
    }

    #[test]
    fn test_zig_i32() -> TestResult {
        let mut s = Vec::new();
        zig_i32(i32::MAX / 2, &mut s)?;
        assert_eq!(s, [254, 255, 255, 255, 7]);

        s.clear();
        zig_i32(i32::MIN / 2 - 1, &mut s)?;
        assert_eq!(s, [129, 128, 128, 128, 8]);

        s.clear();
        zig_i32(42, &mut s)?;
        let mut wide = Vec::new();
        zig_i64(42, &mut wide)?;
        assert_eq!(s, wide);
        Ok(())
    }

    #[test]
    fn test_unzigzag_inverts_zigzag() {
        for n in [0, 1, -1, 63, -64, 1 << 40, i64::MAX, i64::MIN] {
            assert_eq!(unzigzag(zigzag(n)), n);
        }
    }

    #[test]
    fn test_safe_len() -> TestResult {
        assert_eq!(42usize, safe_len(42usize)?);
        assert!(safe_len(1024 * 1024 * 1024).is_err());

        Ok(())
    }
}
