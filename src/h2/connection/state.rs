use crate::types::{ErrorCode, H2Error};
use bytes::{Bytes, BytesMut};

/// A header block whose END_HEADERS flag has been seen.
#[derive(Debug, Clone)]
pub struct HeaderBlock {
    pub stream_id: u32,
    pub block: Bytes,
    pub end_stream: bool,
}

#[derive(Debug, Clone)]
struct PendingHeaderBlock {
    stream_id: u32,
    block: BytesMut,
    end_stream: bool,
}

impl PendingHeaderBlock {
    fn new(stream_id: u32, end_stream: bool) -> Self {
        Self {
            stream_id,
            block: BytesMut::new(),
            end_stream,
        }
    }

    fn append(&mut self, fragment: &[u8]) {
        self.block.extend_from_slice(fragment);
    }

    fn finish(self) -> HeaderBlock {
        HeaderBlock {
            stream_id: self.stream_id,
            block: self.block.freeze(),
            end_stream: self.end_stream,
        }
    }
}

/// Joins a HEADERS fragment with the CONTINUATION fragments that follow it
/// (RFC 7540 Section 6.10). At most one block is open per connection.
#[derive(Debug, Default)]
pub struct HeaderBlockAssembler {
    pending: Option<PendingHeaderBlock>,
}

impl HeaderBlockAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_stream(&self) -> Option<u32> {
        self.pending.as_ref().map(|p| p.stream_id)
    }

    pub fn begin(
        &mut self,
        stream_id: u32,
        fragment: &[u8],
        end_headers: bool,
        end_stream: bool,
    ) -> Result<Option<HeaderBlock>, H2Error> {
        if let Some(open) = &self.pending {
            return Err(H2Error::new(
                ErrorCode::ProtocolError,
                format!(
                    "headers frame on stream {} while header block of stream {} is open",
                    stream_id, open.stream_id
                ),
            ));
        }

        let mut pending = PendingHeaderBlock::new(stream_id, end_stream);
        pending.append(fragment);

        if end_headers {
            Ok(Some(pending.finish()))
        } else {
            self.pending = Some(pending);
            Ok(None)
        }
    }

    pub fn continue_block(
        &mut self,
        stream_id: u32,
        fragment: &[u8],
        end_headers: bool,
    ) -> Result<Option<HeaderBlock>, H2Error> {
        let pending = match self.pending.as_mut() {
            Some(pending) => pending,
            None => {
                return Err(H2Error::new(
                    ErrorCode::ProtocolError,
                    format!("continuation frame on stream {} without header block", stream_id),
                ))
            }
        };

        if pending.stream_id != stream_id {
            return Err(H2Error::new(
                ErrorCode::ProtocolError,
                format!(
                    "continuation frame on stream {}, expected stream {}",
                    stream_id, pending.stream_id
                ),
            ));
        }

        pending.append(fragment);

        if end_headers {
            Ok(self.pending.take().map(PendingHeaderBlock::finish))
        } else {
            Ok(None)
        }
    }
}
