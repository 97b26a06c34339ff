// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::protobuf::encode::varint_len;
use crate::protobuf::{self, encode, Buffer, ByteRange, Label, LenEncodable};
use datadog_alloc::buffer::MayGrowOps;

#[derive(Copy, Clone, Debug)]
pub struct Sample<'a> {
    pub location_ids: &'a [u64], // 1
    pub values: &'a [i64],       // 2
    pub labels: &'a [Label],     // 3
}

#[must_use]
#[inline]
fn packed_varint_u64_len(tag: u32, items: &[u64]) -> usize {
    if !items.is_empty() {
        let encoded_len = items.iter().copied().map(varint_len).sum::<usize>();
        encode::key_len(tag, encode::WireType::LengthDelimited)
            + varint_len(encoded_len as u64)
            + encoded_len
    } else {
        0
    }
}

#[must_use]
#[inline]
fn packed_varint_i64_len(tag: u32, items: &[i64]) -> usize {
    // SAFETY: the pointer comes from a reference, and does a valid conversion.
    let items: &[u64] = unsafe { &*(items as *const [i64] as *const [u64]) };
    packed_varint_u64_len(tag, items)
}

unsafe fn packed_varint<T: MayGrowOps<u8>>(buffer: &mut Buffer<T>, tag: u32, items: &[u64]) {
    if items.is_empty() {
        return;
    }
    unsafe {
        encode::key(buffer, tag, encode::WireType::LengthDelimited);
    }

    let encoded_len = items.iter().copied().map(varint_len).sum::<usize>();
    unsafe { encode::varint(buffer, encoded_len as u64) };
    for item in items {
        unsafe { encode::varint(buffer, *item) };
    }
}

#[inline]
unsafe fn packed_i64<T: MayGrowOps<u8>>(buffer: &mut Buffer<T>, tag: u32, items: &[i64]) {
    // SAFETY: the pointer comes from a reference, and does a valid conversion.
    let items: &[u64] = unsafe { &*(items as *const [i64] as *const [u64]) };
    unsafe { packed_varint(buffer, tag, items) };
}

impl LenEncodable for Sample<'_> {
    fn encoded_len(&self) -> usize {
        let locations = packed_varint_u64_len(1, self.location_ids);
        let values = packed_varint_i64_len(2, self.values);
        let labels = self
            .labels
            .iter()
            .map(|label| protobuf::encoded_len(3, label).1)
            .sum::<usize>();
        locations + values + labels
    }

    unsafe fn encode_raw<T: MayGrowOps<u8>>(&self, buffer: &mut Buffer<T>) -> ByteRange {
        let start = buffer.len_u31();
        unsafe { packed_varint(buffer, 1, self.location_ids) };
        unsafe { packed_i64(buffer, 2, self.values) };
        for label in self.labels {
            unsafe { protobuf::encode_len_delimited(buffer, 3, label, label.encoded_len()) };
        }
        let end = buffer.len_u31();
        ByteRange { start, end }
    }
}
