use crate::types::{HeaderField, HpackError};
use std::collections::VecDeque;

/// Predefined header fields (RFC 7541 Appendix A), addressed from index 1.
pub static STATIC_TABLE: [HeaderField; 61] = [
    HeaderField::from_static(b":authority", b""),
    HeaderField::from_static(b":method", b"GET"),
    HeaderField::from_static(b":method", b"POST"),
    HeaderField::from_static(b":path", b"/"),
    HeaderField::from_static(b":path", b"/index.html"),
    HeaderField::from_static(b":scheme", b"http"),
    HeaderField::from_static(b":scheme", b"https"),
    HeaderField::from_static(b":status", b"200"),
    HeaderField::from_static(b":status", b"204"),
    HeaderField::from_static(b":status", b"206"),
    HeaderField::from_static(b":status", b"304"),
    HeaderField::from_static(b":status", b"400"),
    HeaderField::from_static(b":status", b"404"),
    HeaderField::from_static(b":status", b"500"),
    HeaderField::from_static(b"accept-charset", b""),
    HeaderField::from_static(b"accept-encoding", b"gzip, deflate"),
    HeaderField::from_static(b"accept-language", b""),
    HeaderField::from_static(b"accept-ranges", b""),
    HeaderField::from_static(b"accept", b""),
    HeaderField::from_static(b"access-control-allow-origin", b""),
    HeaderField::from_static(b"age", b""),
    HeaderField::from_static(b"allow", b""),
    HeaderField::from_static(b"authorization", b""),
    HeaderField::from_static(b"cache-control", b""),
    HeaderField::from_static(b"content-disposition", b""),
    HeaderField::from_static(b"content-encoding", b""),
    HeaderField::from_static(b"content-language", b""),
    HeaderField::from_static(b"content-length", b""),
    HeaderField::from_static(b"content-location", b""),
    HeaderField::from_static(b"content-range", b""),
    HeaderField::from_static(b"content-type", b""),
    HeaderField::from_static(b"cookie", b""),
    HeaderField::from_static(b"date", b""),
    HeaderField::from_static(b"etag", b""),
    HeaderField::from_static(b"expect", b""),
    HeaderField::from_static(b"expires", b""),
    HeaderField::from_static(b"from", b""),
    HeaderField::from_static(b"host", b""),
    HeaderField::from_static(b"if-match", b""),
    HeaderField::from_static(b"if-modified-since", b""),
    HeaderField::from_static(b"if-none-match", b""),
    HeaderField::from_static(b"if-range", b""),
    HeaderField::from_static(b"if-unmodified-since", b""),
    HeaderField::from_static(b"last-modified", b""),
    HeaderField::from_static(b"link", b""),
    HeaderField::from_static(b"location", b""),
    HeaderField::from_static(b"max-forwards", b""),
    HeaderField::from_static(b"proxy-authenticate", b""),
    HeaderField::from_static(b"proxy-authorization", b""),
    HeaderField::from_static(b"range", b""),
    HeaderField::from_static(b"referer", b""),
    HeaderField::from_static(b"refresh", b""),
    HeaderField::from_static(b"retry-after", b""),
    HeaderField::from_static(b"server", b""),
    HeaderField::from_static(b"set-cookie", b""),
    HeaderField::from_static(b"strict-transport-security", b""),
    HeaderField::from_static(b"transfer-encoding", b""),
    HeaderField::from_static(b"user-agent", b""),
    HeaderField::from_static(b"vary", b""),
    HeaderField::from_static(b"via", b""),
    HeaderField::from_static(b"www-authenticate", b""),
];

/// Combined index address space (RFC 7541 Section 2.3.3): the static table
/// followed by this connection's dynamic table, newest entry first.
///
/// The dynamic table belongs to a single connection's decoding path and is
/// never shared.
#[derive(Debug, Clone)]
pub struct IndexTable {
    max_protocol_data_size: usize,
    max_data_size: usize,
    total_data_size: usize,
    dynamic_table: VecDeque<HeaderField>,
}

impl IndexTable {
    pub fn new(max_protocol_data_size: usize) -> Self {
        Self {
            max_protocol_data_size,
            max_data_size: max_protocol_data_size,
            total_data_size: 0,
            dynamic_table: VecDeque::new(),
        }
    }

    pub fn entries_count(&self) -> usize {
        STATIC_TABLE.len() + self.dynamic_table.len()
    }

    pub fn dynamic_len(&self) -> usize {
        self.dynamic_table.len()
    }

    /// `1..=61` addresses the static table, `62..` the dynamic table with the
    /// most recently added entry at 62.
    pub fn entry(&self, index: u64) -> Option<&HeaderField> {
        let index = usize::try_from(index).ok()?;
        if index == 0 || index > self.entries_count() {
            return None;
        }

        if index <= STATIC_TABLE.len() {
            return STATIC_TABLE.get(index - 1);
        }

        let position = index - STATIC_TABLE.len();
        self.dynamic_table.get(self.dynamic_table.len() - position)
    }

    /// Static table index of an exact match, else of the first name match.
    pub fn find_static(field: &HeaderField) -> Option<(usize, bool)> {
        let mut name_match = None;
        for (i, entry) in STATIC_TABLE.iter().enumerate() {
            if entry.name() == field.name() {
                if entry.value() == field.value() {
                    return Some((i + 1, true));
                }
                name_match.get_or_insert((i + 1, false));
            }
        }
        name_match
    }

    pub fn add_entry(&mut self, field: HeaderField) {
        self.total_data_size += field.data_size();
        self.dynamic_table.push_back(field);
        self.evict_entries();
    }

    pub fn max_protocol_data_size(&self) -> usize {
        self.max_protocol_data_size
    }

    /// Lowers (or raises) the limit negotiated through SETTINGS_HEADER_TABLE_SIZE.
    pub fn update_max_protocol_data_size(&mut self, n: usize) {
        self.max_protocol_data_size = n;
        if self.max_data_size > n {
            self.max_data_size = n;
        }
        self.evict_entries();
    }

    pub fn max_data_size(&self) -> usize {
        self.max_data_size
    }

    pub fn total_data_size(&self) -> usize {
        self.total_data_size
    }

    /// Applies a dynamic table size update (RFC 7541 Section 6.3).
    pub fn update_max_data_size(&mut self, n: u64) -> Result<(), HpackError> {
        if n > self.max_protocol_data_size as u64 {
            return Err(HpackError::DataSizeExceeded {
                requested: n,
                limit: self.max_protocol_data_size,
            });
        }

        self.max_data_size = n as usize;
        self.evict_entries();
        Ok(())
    }

    // See RFC 7541 Sections 4.3 and 4.4
    fn evict_entries(&mut self) {
        while self.total_data_size > self.max_data_size {
            match self.dynamic_table.pop_front() {
                Some(evicted) => self.total_data_size -= evicted.data_size(),
                None => break,
            }
        }
    }
}
