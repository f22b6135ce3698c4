use super::huffman;
use super::primitive::{
    decode_prefixed_int, decode_string_literal, encode_prefixed_int, encode_string_literal,
};
use super::table::IndexTable;
use crate::types::{HeaderField, HeaderList, HpackError};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Decodes one complete header block, updating `table` as instructed.
///
/// The block must already be reassembled from HEADERS/PUSH_PROMISE and any
/// CONTINUATION frames. Any failing instruction aborts the whole block.
pub fn decode_header_block<B: Buf>(
    table: &mut IndexTable,
    mut block: B,
) -> Result<HeaderList, HpackError> {
    let mut headers = HeaderList::new();

    while block.has_remaining() {
        // Classify by peeking; each decoder consumes the octet itself.
        let field = match block.chunk()[0] {
            // Indexed Header Field (Section 6.1)
            0x80..=0xff => Some(decode_indexed_field(table, &mut block)?),
            // Literal Header Field with Incremental Indexing (Section 6.2.1)
            0x40..=0x7f => Some(decode_literal_field(table, &mut block, 6, true)?),
            // Dynamic Table Size Update (Section 6.3)
            0x20..=0x3f => {
                let (_, new_size) = decode_prefixed_int(&mut block, 5)?;
                table.update_max_data_size(new_size)?;
                None
            }
            // Literal Header Field without Indexing / Never Indexed (6.2.2, 6.2.3)
            _ => Some(decode_literal_field(table, &mut block, 4, false)?),
        };

        if let Some(field) = field {
            headers.push(field);
        }
    }

    Ok(headers)
}

fn decode_indexed_field<B: Buf>(
    table: &IndexTable,
    block: &mut B,
) -> Result<HeaderField, HpackError> {
    let (_, index) = decode_prefixed_int(block, 7)?;
    table
        .entry(index)
        .cloned()
        .ok_or(HpackError::TableEntryNotFound(index))
}

fn decode_literal_field<B: Buf>(
    table: &mut IndexTable,
    block: &mut B,
    n: u8,
    indexing: bool,
) -> Result<HeaderField, HpackError> {
    let (_, name_index) = decode_prefixed_int(block, n)?;

    let name = if name_index > 0 {
        table
            .entry(name_index)
            .map(|entry| entry.name().clone())
            .ok_or(HpackError::TableEntryNotFound(name_index))?
    } else {
        decode_string_literal(block, table.max_data_size())?
    };

    let value = decode_string_literal(block, table.max_data_size())?;

    let field = HeaderField::new(name, value);
    if indexing {
        table.add_entry(field.clone());
    }

    Ok(field)
}

/// Encodes `fields` without touching any dynamic table: exact static matches
/// become indexed fields, everything else a literal without indexing.
pub fn encode_header_block<'a, I>(fields: I) -> Bytes
where
    I: IntoIterator<Item = &'a HeaderField>,
{
    let mut dst = BytesMut::new();

    for field in fields {
        match IndexTable::find_static(field) {
            Some((index, true)) => encode_prefixed_int(&mut dst, 7, 0x80, index as u64),
            Some((index, false)) => {
                encode_prefixed_int(&mut dst, 4, 0x00, index as u64);
                encode_literal(&mut dst, field.value());
            }
            None => {
                dst.put_u8(0x00);
                encode_literal(&mut dst, field.name());
                encode_literal(&mut dst, field.value());
            }
        }
    }

    dst.freeze()
}

fn encode_literal(dst: &mut BytesMut, data: &Bytes) {
    let use_huffman = huffman::encoded_len(data) < data.len();
    encode_string_literal(dst, data, use_huffman);
}
