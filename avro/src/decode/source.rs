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
    util::{MAX_INT_VARINT_BYTES, MAX_LONG_VARINT_BYTES, safe_len, unzigzag},
};
use std::io::{ErrorKind, Read};

/// A byte source that knows how far it has read.
pub(crate) struct Source<R> {
    reader: R,
    offset: u64,
}

impl<R: Read> Source<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self { reader, offset: 0 }
    }

    /// Number of bytes consumed so far.
    pub(crate) fn offset(&self) -> u64 {
        self.offset
    }

    pub(crate) fn into_inner(self) -> R {
        self.reader
    }

    /// Fill `buf` completely or fail with [`Details::TruncatedStream`].
    pub(crate) fn read_exact(&mut self, buf: &mut [u8]) -> AvroResult<()> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => {
                    return Err(Details::TruncatedStream {
                        offset: self.offset + filled as u64,
                        needed: buf.len() - filled,
                    }
                    .into());
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(Details::ReadBytes(e).into()),
            }
        }
        self.offset += filled as u64;
        Ok(())
    }

    pub(crate) fn read_byte(&mut self) -> AvroResult<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    fn read_varint(&mut self, max_bytes: usize) -> AvroResult<u64> {
        let start = self.offset;
        let mut z = 0u64;
        for j in 0..max_bytes {
            let byte = self.read_byte()?;
            let group = u64::from(byte & 0x7F);
            let shift = j * 7;
            // The tenth group of a long only has room for bit 63.
            if shift + 7 > 64 && group >> (64 - shift) != 0 {
                break;
            }
            z |= group << shift;
            if byte & 0x80 == 0 {
                return Ok(z);
            }
        }
        Err(Details::CorruptVarint {
            offset: start,
            max_bytes,
        }
        .into())
    }

    pub(crate) fn read_long(&mut self) -> AvroResult<i64> {
        Ok(unzigzag(self.read_varint(MAX_LONG_VARINT_BYTES)?))
    }

    pub(crate) fn read_int(&mut self) -> AvroResult<i32> {
        let offset = self.offset;
        let value = unzigzag(self.read_varint(MAX_INT_VARINT_BYTES)?);
        i32::try_from(value).map_err(|_| Details::ZagI32 { value, offset }.into())
    }

    /// Read a length prefix, which must not be negative.
    pub(crate) fn read_len(&mut self) -> AvroResult<usize> {
        let offset = self.offset;
        let length = self.read_long()?;
        let len = usize::try_from(length).map_err(|_| Details::NegativeLength { length, offset })?;
        safe_len(len)
    }

    pub(crate) fn read_bool(&mut self) -> AvroResult<bool> {
        let offset = self.offset;
        match self.read_byte()? {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(Details::BoolValue { value, offset }.into()),
        }
    }

    pub(crate) fn read_float(&mut self) -> AvroResult<f32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(f32::from_le_bytes(buf))
    }

    pub(crate) fn read_double(&mut self) -> AvroResult<f64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(f64::from_le_bytes(buf))
    }

    /// Read exactly `len` raw bytes.
    pub(crate) fn read_fixed(&mut self, len: usize) -> AvroResult<Vec<u8>> {
        let mut buf = vec![0u8; safe_len(len)?];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Read a length-prefixed byte sequence.
    pub(crate) fn read_bytes(&mut self) -> AvroResult<Vec<u8>> {
        let len = self.read_len()?;
        self.read_fixed(len)
    }

    pub(crate) fn read_string(&mut self) -> AvroResult<String> {
        String::from_utf8(self.read_bytes()?).map_err(|e| Details::ConvertToUtf8(e).into())
    }

    /// Read the header of the next block of an array or map.
    ///
    /// Returns the number of items in the block, `0` for the terminating block, and the size in
    /// bytes of the block when the writer recorded it.
    pub(crate) fn read_block_header(&mut self) -> AvroResult<(usize, Option<usize>)> {
        let offset = self.offset;
        let count = self.read_long()?;
        if count >= 0 {
            return Ok((safe_len(count as usize)?, None));
        }
        let count = count.checked_neg().ok_or(Details::NegativeLength {
            length: count,
            offset,
        })?;
        let size = self.read_len()?;
        Ok((safe_len(count as usize)?, Some(size)))
    }

    /// Consume `len` bytes without keeping them.
    pub(crate) fn skip(&mut self, mut len: usize) -> AvroResult<()> {
        let mut scratch = [0u8; 4096];
        while len > 0 {
            let chunk = len.min(scratch.len());
            self.read_exact(&mut scratch[..chunk])?;
            len -= chunk;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ErrorCategory};
    use pretty_assertions::assert_eq;

    type TestResult = anyhow::Result<()>;

    #[test]
    fn reads_zigzag_varints() -> TestResult {
        let mut source = Source::new(&[0x00, 0x01, 0x02, 0x03, 0x80, 0x01][..]);
        assert_eq!(source.read_long()?, 0);
        assert_eq!(source.read_long()?, -1);
        assert_eq!(source.read_int()?, 1);
        assert_eq!(source.read_int()?, -2);
        assert_eq!(source.read_long()?, 64);
        assert_eq!(source.offset(), 6);
        Ok(())
    }

    #[test]
    fn overlong_int_is_corrupt() {
        let bytes = [0x80, 0x80, 0x80, 0x80, 0x80, 0x01];
        let error = Source::new(&bytes[..]).read_int().map_err(Error::into_details);
        assert!(matches!(
            error,
            Err(Details::CorruptVarint {
                offset: 0,
                max_bytes: 5
            })
        ));
        // Eleven bytes are too many for a long.
        let bytes = [0xFF; 11];
        let error = Source::new(&bytes[..]).read_long().map_err(Error::into_details);
        assert!(matches!(error, Err(Details::CorruptVarint { max_bytes: 10, .. })));
    }

    #[test]
    fn tenth_byte_of_a_long_holds_one_bit() -> TestResult {
        let mut min = [0xFF; 10];
        min[9] = 0x01;
        assert_eq!(Source::new(&min[..]).read_long()?, i64::MIN);

        let mut overflow = [0xFF; 10];
        overflow[9] = 0x7F;
        let error = Source::new(&overflow[..]).read_long().map_err(Error::into_details);
        assert!(matches!(
            error,
            Err(Details::CorruptVarint {
                offset: 0,
                max_bytes: 10
            })
        ));
        Ok(())
    }

    #[test]
    fn block_size_is_checked_against_the_allocation_limit() -> TestResult {
        // One item, recorded as taking more bytes than may ever be allocated.
        let mut bytes = Vec::new();
        crate::util::zig_i64(-1, &mut bytes)?;
        crate::util::zig_i64(i64::MAX, &mut bytes)?;
        let error = Source::new(&bytes[..]).read_block_header().map_err(Error::into_details);
        assert!(matches!(error, Err(Details::MemoryAllocation { .. })));
        Ok(())
    }

    #[test]
    fn five_byte_int_outside_i32() {
        // zigzag(2^31) needs five bytes but is no int.
        let bytes = [0x80, 0x80, 0x80, 0x80, 0x10];
        let error = Source::new(&bytes[..]).read_int().map_err(Error::into_details);
        assert!(matches!(error, Err(Details::ZagI32 { offset: 0, .. })));
    }

    #[test]
    fn truncated_fixed_reports_offset() {
        let mut source = Source::new(&[0xAA, 0xBB][..]);
        let error = source.read_fixed(4).expect_err("two bytes cannot fill four");
        assert_eq!(error.category(), ErrorCategory::TruncatedStream);
        assert!(matches!(
            error.details(),
            Details::TruncatedStream {
                offset: 2,
                needed: 2
            }
        ));
    }

    #[test]
    fn negative_length_is_malformed() {
        let error = Source::new(&[0x01][..]).read_bytes().map_err(Error::into_details);
        assert!(matches!(
            error,
            Err(Details::NegativeLength {
                length: -1,
                offset: 0
            })
        ));
    }

    #[test]
    fn bool_must_be_zero_or_one() -> TestResult {
        let mut source = Source::new(&[0x00, 0x01, 0x02][..]);
        assert!(!source.read_bool()?);
        assert!(source.read_bool()?);
        let error = source.read_bool().map_err(Error::into_details);
        assert!(matches!(
            error,
            Err(Details::BoolValue {
                value: 2,
                offset: 2
            })
        ));
        Ok(())
    }

    #[test]
    fn block_headers() -> TestResult {
        // 2 items, then -1 item with a 3 byte block, then the end.
        let mut source = Source::new(&[0x04, 0x01, 0x06, 0x00][..]);
        assert_eq!(source.read_block_header()?, (2, None));
        assert_eq!(source.read_block_header()?, (1, Some(3)));
        assert_eq!(source.read_block_header()?, (0, None));
        Ok(())
    }

    #[test]
    fn skip_spans_several_chunks() -> TestResult {
        let bytes = vec![7u8; 10_000];
        let mut source = Source::new(&bytes[..]);
        source.skip(9_999)?;
        assert_eq!(source.read_byte()?, 7);
        assert_eq!(source.offset(), 10_000);
        Ok(())
    }
}
