//! Primitive type representations (RFC 7541 Section 5).

use super::huffman;
use crate::types::HpackError;
use bytes::{Buf, BufMut, Bytes, BytesMut};

const HUFFMAN_FLAG: u8 = 0x80;

/// Decodes an integer with an `n`-bit prefix (Section 5.1), `1 <= n <= 8`.
///
/// Returns the bits above the prefix (instruction flags) and the value.
pub fn decode_prefixed_int<B: Buf>(buf: &mut B, n: u8) -> Result<(u8, u64), HpackError> {
    if !buf.has_remaining() {
        return Err(HpackError::UnexpectedEof);
    }

    let mask = ((1u16 << n) - 1) as u8;
    let first = buf.get_u8();
    let flags = first & !mask;
    let prefixed = first & mask;

    if prefixed < mask {
        return Ok((flags, prefixed as u64));
    }

    let mut value = prefixed as u64;
    let mut shift = 0u32;
    loop {
        if shift >= 63 {
            return Err(HpackError::PrefixedIntOverflow);
        }
        if !buf.has_remaining() {
            return Err(HpackError::UnexpectedEof);
        }

        let byte = buf.get_u8();
        value = value
            .checked_add(((byte & 0x7f) as u64) << shift)
            .ok_or(HpackError::PrefixedIntOverflow)?;

        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }

    Ok((flags, value))
}

/// Appends `value` with an `n`-bit prefix; `flags` fills the bits above it.
pub fn encode_prefixed_int(dst: &mut BytesMut, n: u8, flags: u8, value: u64) {
    let max = (1u64 << n) - 1;
    let flags = flags & !(max as u8);

    if value < max {
        dst.put_u8(flags | value as u8);
        return;
    }

    dst.put_u8(flags | max as u8);
    let mut rest = value - max;
    while rest >= 0x80 {
        dst.put_u8(0x80 | (rest & 0x7f) as u8);
        rest >>= 7;
    }
    dst.put_u8(rest as u8);
}

/// Decodes a string literal (Section 5.2). A declared length above `max_len`
/// is rejected before anything is copied.
pub fn decode_string_literal<B: Buf>(
    buf: &mut B,
    max_len: usize,
) -> Result<Bytes, HpackError> {
    let (flags, length) = decode_prefixed_int(buf, 7)?;
    if length > max_len as u64 {
        return Err(HpackError::StringLiteralTooLong {
            length,
            max: max_len,
        });
    }

    let length = length as usize;
    if buf.remaining() < length {
        return Err(HpackError::UnexpectedEof);
    }

    let raw = buf.copy_to_bytes(length);
    if flags & HUFFMAN_FLAG != 0 {
        huffman::decode(&raw).map(Bytes::from)
    } else {
        Ok(raw)
    }
}

pub fn encode_string_literal(dst: &mut BytesMut, data: &[u8], use_huffman: bool) {
    if use_huffman {
        let encoded = huffman::encode(data);
        encode_prefixed_int(dst, 7, HUFFMAN_FLAG, encoded.len() as u64);
        dst.put_slice(&encoded);
    } else {
        encode_prefixed_int(dst, 7, 0, data.len() as u64);
        dst.put_slice(data);
    }
}
