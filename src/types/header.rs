use super::error::HpackError;
use bytes::Bytes;
use std::fmt;

/// Fixed bookkeeping overhead per entry (RFC 7541 Section 4.1)
pub const HEADER_FIELD_OVERHEAD: usize = 32;

const PSEUDO_HEADERS: [&[u8]; 5] = [b":authority", b":scheme", b":method", b":path", b":status"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderField {
    name: Bytes,
    value: Bytes,
}

impl HeaderField {
    pub fn new(name: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub(crate) const fn from_static(name: &'static [u8], value: &'static [u8]) -> Self {
        Self {
            name: Bytes::from_static(name),
            value: Bytes::from_static(value),
        }
    }

    pub fn name(&self) -> &Bytes {
        &self.name
    }

    pub fn value(&self) -> &Bytes {
        &self.value
    }

    pub fn data_size(&self) -> usize {
        self.name.len() + self.value.len() + HEADER_FIELD_OVERHEAD
    }

    pub fn is_pseudo(&self) -> bool {
        PSEUDO_HEADERS.contains(&&self.name[..])
    }

    pub fn validate(&self) -> Result<(), HpackError> {
        if self.valid_name() && self.valid_value() {
            Ok(())
        } else {
            Err(HpackError::InvalidHeaderChar)
        }
    }

    fn valid_name(&self) -> bool {
        self.is_pseudo() || self.name.iter().all(|&c| is_name_char(c))
    }

    fn valid_value(&self) -> bool {
        self.value
            .iter()
            .all(|&c| c < 0x80 && (c >= b' ' || c == b'\t') && c != 0x7f)
    }
}

fn is_name_char(c: u8) -> bool {
    matches!(c,
        b'a'..=b'z'
        | b'0'..=b'9'
        | b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+'
        | b'-' | b'.' | b'^' | b'_' | b'`' | b'|' | b'~')
}

impl fmt::Display for HeaderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}",
            String::from_utf8_lossy(&self.name),
            String::from_utf8_lossy(&self.value)
        )
    }
}

/// Header fields in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderList(Vec<HeaderField>);

impl HeaderList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, field: HeaderField) {
        self.0.push(field);
    }

    pub fn fields(&self) -> &[HeaderField] {
        &self.0
    }

    pub fn into_fields(self) -> Vec<HeaderField> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HeaderField> {
        self.0.iter()
    }

    pub fn validate(&self) -> Result<(), HpackError> {
        self.0.iter().try_for_each(HeaderField::validate)
    }

    pub fn get(&self, name: &str) -> Option<&Bytes> {
        self.0
            .iter()
            .find(|field| &field.name[..] == name.as_bytes())
            .map(|field| &field.value)
    }
}

impl From<Vec<HeaderField>> for HeaderList {
    fn from(fields: Vec<HeaderField>) -> Self {
        Self(fields)
    }
}

impl IntoIterator for HeaderList {
    type Item = HeaderField;
    type IntoIter = std::vec::IntoIter<HeaderField>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a HeaderList {
    type Item = &'a HeaderField;
    type IntoIter = std::slice::Iter<'a, HeaderField>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
