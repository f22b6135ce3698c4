use crate::h2::consts::*;
use crate::types::{
    ContinuationFrame, DataFrame, ErrorCode, Frame, GoAwayFrame, H2Error, HeadersFrame,
    PingFrame, PushPromiseFrame, RawFrame, RstStreamFrame, ServerError, SettingsFrame,
    UnknownFrame,
};
use bytes::{BufMut, Bytes, BytesMut};
use std::io::{self, Read, Write};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

mod settings;

pub use settings::{SettingsFrameBuilder, SettingsParam};

// HTTP/2 Frame Format (RFC 7540 Section 4.1):
//  0                   1                   2                   3
//  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                 Length (24)                   |
// +---------------+---------------+---------------+
// |   Type (8)    |   Flags (8)   |
// +-+-+-----------+---------------+-------------------------------+
// |R|                 Stream Identifier (31)                      |
// +=+=============================================================+
// |                   Frame Payload (0...)                      ...
// +---------------------------------------------------------------+

/// A frame could not be written completely. `written` counts the octets the
/// sink accepted before the failure.
#[derive(Debug, thiserror::Error)]
#[error("failed after writing {written} octets of frame: {source}")]
pub struct FrameWriteError {
    pub written: usize,
    #[source]
    pub source: io::Error,
}

struct FrameHeader {
    length: usize,
    frame_type: u8,
    flags: u8,
    stream_id: u32,
}

impl FrameHeader {
    fn decode(buf: &[u8; FRAME_HEADER_SIZE]) -> Self {
        // Parse Length (24 bits)
        let length = ((buf[0] as usize) << 16) | ((buf[1] as usize) << 8) | (buf[2] as usize);

        // Parse Stream Identifier (31 bits, R bit reserved)
        let stream_id = u32::from_be_bytes([buf[5], buf[6], buf[7], buf[8]]) & STREAM_ID_MASK;

        Self {
            length,
            frame_type: buf[3],
            flags: buf[4],
            stream_id,
        }
    }

    fn into_frame(self, payload: Vec<u8>) -> Frame {
        Frame::from_raw(RawFrame::new(
            self.frame_type,
            self.flags,
            self.stream_id,
            Bytes::from(payload),
        ))
    }
}

/// Reads exactly one frame. Short reads and I/O failures propagate untouched;
/// no partial frame is retained.
pub fn read_frame<R: Read + ?Sized>(reader: &mut R) -> io::Result<Frame> {
    let mut header_buf = [0u8; FRAME_HEADER_SIZE];
    reader.read_exact(&mut header_buf)?;
    let header = FrameHeader::decode(&header_buf);

    let mut payload = vec![0u8; header.length];
    reader.read_exact(&mut payload)?;

    Ok(header.into_frame(payload))
}

/// Async counterpart of [`read_frame`]. With `max_payload` set, a declared
/// length above it fails with FRAME_SIZE_ERROR before the payload is read.
pub async fn read_frame_async<R>(
    reader: &mut R,
    max_payload: Option<u32>,
) -> Result<Frame, ServerError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut header_buf = [0u8; FRAME_HEADER_SIZE];
    reader.read_exact(&mut header_buf).await?;
    let header = FrameHeader::decode(&header_buf);

    if let Some(max) = max_payload {
        if header.length > max as usize {
            return Err(H2Error::new(
                ErrorCode::FrameSizeError,
                format!(
                    "frame payload length({} octets) exceeds max frame size({})",
                    header.length, max
                ),
            )
            .into());
        }
    }

    let mut payload = vec![0u8; header.length];
    if header.length > 0 {
        reader.read_exact(&mut payload).await?;
    }

    Ok(header.into_frame(payload))
}

pub async fn write_frame_async<W>(frame: &Frame, writer: &mut W) -> Result<usize, ServerError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let serialized = frame.serialize()?;
    writer.write_all(&serialized).await?;
    Ok(serialized.len())
}

fn write_counted<W: Write + ?Sized>(
    writer: &mut W,
    mut buf: &[u8],
    written: &mut usize,
) -> io::Result<()> {
    while !buf.is_empty() {
        match writer.write(buf) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "failed to write whole frame",
                ))
            }
            Ok(n) => {
                *written += n;
                buf = &buf[n..];
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

impl Frame {
    pub fn from_raw(raw: RawFrame) -> Self {
        match raw.frame_type {
            DATA_FRAME_TYPE => Frame::Data(DataFrame(raw)),
            HEADERS_FRAME_TYPE => Frame::Headers(HeadersFrame(raw)),
            RST_STREAM_FRAME_TYPE => Frame::RstStream(RstStreamFrame(raw)),
            SETTINGS_FRAME_TYPE => Frame::Settings(SettingsFrame(raw)),
            PUSH_PROMISE_FRAME_TYPE => Frame::PushPromise(PushPromiseFrame(raw)),
            PING_FRAME_TYPE => Frame::Ping(PingFrame(raw)),
            GOAWAY_FRAME_TYPE => Frame::GoAway(GoAwayFrame(raw)),
            CONTINUATION_FRAME_TYPE => Frame::Continuation(ContinuationFrame(raw)),
            _ => Frame::Unknown(UnknownFrame(raw)),
        }
    }

    pub fn rst_stream(stream_id: u32, error_code: ErrorCode) -> Self {
        let payload = Bytes::copy_from_slice(&error_code.as_u32().to_be_bytes());
        Self::from_raw(RawFrame::new(RST_STREAM_FRAME_TYPE, 0, stream_id, payload))
    }

    pub fn goaway(last_stream_id: u32, error_code: ErrorCode, debug_data: &[u8]) -> Self {
        let mut payload = BytesMut::with_capacity(8 + debug_data.len());
        payload.put_u32(last_stream_id & STREAM_ID_MASK);
        payload.put_u32(error_code.as_u32());
        payload.put_slice(debug_data);

        Self::from_raw(RawFrame::new(GOAWAY_FRAME_TYPE, 0, 0, payload.freeze()))
    }

    pub fn verify(&self) -> Result<(), H2Error> {
        match self {
            Frame::Data(f) => f.verify(),
            Frame::Headers(f) => f.verify(),
            Frame::RstStream(f) => f.verify(),
            Frame::Settings(f) => f.verify(),
            Frame::PushPromise(f) => f.verify(),
            Frame::Ping(f) => f.verify(),
            Frame::GoAway(f) => f.verify(),
            Frame::Continuation(f) => f.verify(),
            Frame::Unknown(_) => Ok(()),
        }
    }

    pub fn serialize(&self) -> Result<Bytes, H2Error> {
        let raw = self.raw();
        if raw.payload.len() > MAX_FRAME_SIZE_UPPER_BOUND as usize {
            return Err(H2Error::new(
                ErrorCode::FrameSizeError,
                format!(
                    "frame payload size {} exceeds maximum {}",
                    raw.payload.len(),
                    MAX_FRAME_SIZE_UPPER_BOUND
                ),
            ));
        }

        let mut result = BytesMut::with_capacity(FRAME_HEADER_SIZE + raw.payload.len());

        // Length (24 bits)
        let length = raw.payload.len() as u32;
        result.put_u8(((length >> 16) & 0xFF) as u8);
        result.put_u8(((length >> 8) & 0xFF) as u8);
        result.put_u8((length & 0xFF) as u8);

        result.put_u8(raw.frame_type);
        result.put_u8(raw.flags);
        result.put_u32(raw.stream_id & STREAM_ID_MASK);

        result.put_slice(&raw.payload);

        Ok(result.freeze())
    }

    /// Writes header then payload. On failure the error still reports how many
    /// octets reached the sink.
    pub fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> Result<usize, FrameWriteError> {
        let serialized = self.serialize().map_err(|e| FrameWriteError {
            written: 0,
            source: io::Error::new(io::ErrorKind::InvalidInput, e),
        })?;

        let mut written = 0;
        let (header, payload) = serialized.split_at(FRAME_HEADER_SIZE);
        write_counted(writer, header, &mut written)
            .and_then(|_| write_counted(writer, payload, &mut written))
            .map_err(|source| FrameWriteError { written, source })?;

        Ok(written)
    }
}

fn require_stream(raw: &RawFrame, kind: &str) -> Result<(), H2Error> {
    if raw.stream_id == 0 {
        return Err(H2Error::new(
            ErrorCode::ProtocolError,
            format!("{} frame's stream ID(0) is invalid", kind),
        ));
    }
    Ok(())
}

fn require_connection(raw: &RawFrame, kind: &str) -> Result<(), H2Error> {
    if raw.stream_id != 0 {
        return Err(H2Error::new(
            ErrorCode::ProtocolError,
            format!("{} frame's stream ID({}) must be 0", kind, raw.stream_id),
        ));
    }
    Ok(())
}

impl DataFrame {
    pub fn is_end_stream(&self) -> bool {
        self.0.has_flag(END_STREAM_FLAG)
    }

    pub fn is_padded(&self) -> bool {
        self.0.has_flag(PADDED_FLAG)
    }

    pub fn verify(&self) -> Result<(), H2Error> {
        require_stream(&self.0, "data")?;

        if !self.is_padded() {
            return Ok(());
        }

        let payload = &self.0.payload;
        if payload.is_empty() || payload.len() < payload[0] as usize + 1 {
            return Err(H2Error::new(
                ErrorCode::FrameSizeError,
                "data frame's payload length is invalid",
            ));
        }

        Ok(())
    }

    /// Application data without padding.
    ///
    /// # Panics
    ///
    /// If the frame did not pass [`DataFrame::verify`].
    pub fn data(&self) -> Bytes {
        let payload = &self.0.payload;
        if self.is_padded() {
            payload.slice(1..payload.len() - payload[0] as usize)
        } else {
            payload.clone()
        }
    }
}

impl HeadersFrame {
    pub fn is_end_stream(&self) -> bool {
        self.0.has_flag(END_STREAM_FLAG)
    }

    pub fn is_end_headers(&self) -> bool {
        self.0.has_flag(END_HEADERS_FLAG)
    }

    pub fn is_padded(&self) -> bool {
        self.0.has_flag(PADDED_FLAG)
    }

    pub fn is_prioritized(&self) -> bool {
        self.0.has_flag(PRIORITY_FLAG)
    }

    pub fn verify(&self) -> Result<(), H2Error> {
        require_stream(&self.0, "headers")?;

        let payload = &self.0.payload;
        let mut fragment_len = payload.len() as isize;
        if self.is_padded() {
            fragment_len -= 1;
            if fragment_len < 0 {
                return Err(H2Error::new(
                    ErrorCode::ProtocolError,
                    "headers frame's payload length is invalid",
                ));
            }
            fragment_len -= payload[0] as isize;
        }

        if self.is_prioritized() {
            fragment_len -= 5;
        }

        if fragment_len < 0 {
            return Err(H2Error::new(
                ErrorCode::ProtocolError,
                "headers frame's payload length is invalid",
            ));
        }

        Ok(())
    }

    /// Header block fragment without pad length, priority fields and padding.
    ///
    /// # Panics
    ///
    /// If the frame did not pass [`HeadersFrame::verify`].
    pub fn fragment(&self) -> Bytes {
        let payload = &self.0.payload;
        let mut offset = 0;
        let mut end = payload.len();

        if self.is_padded() {
            offset += 1;
            end -= payload[0] as usize;
        }

        if self.is_prioritized() {
            offset += 5;
        }

        payload.slice(offset..end)
    }
}

impl PushPromiseFrame {
    pub fn is_end_headers(&self) -> bool {
        self.0.has_flag(END_HEADERS_FLAG)
    }

    pub fn is_padded(&self) -> bool {
        self.0.has_flag(PADDED_FLAG)
    }

    pub fn verify(&self) -> Result<(), H2Error> {
        require_stream(&self.0, "push promise")?;

        let payload = &self.0.payload;
        let mut required = 4;
        if self.is_padded() {
            if payload.is_empty() {
                return Err(H2Error::new(
                    ErrorCode::FrameSizeError,
                    "push promise frame's payload length is invalid",
                ));
            }
            required += 1 + payload[0] as usize;
        }

        if payload.len() < required {
            return Err(H2Error::new(
                ErrorCode::FrameSizeError,
                "push promise frame's payload length is invalid",
            ));
        }

        Ok(())
    }

    pub fn promised_stream_id(&self) -> u32 {
        let offset = if self.is_padded() { 1 } else { 0 };
        read_u32(&self.0.payload[offset..]) & STREAM_ID_MASK
    }

    /// # Panics
    ///
    /// If the frame did not pass [`PushPromiseFrame::verify`].
    pub fn header_fragment(&self) -> Bytes {
        let payload = &self.0.payload;
        let mut offset = 4;
        let mut end = payload.len();

        if self.is_padded() {
            offset += 1;
            end -= payload[0] as usize;
        }

        payload.slice(offset..end)
    }
}

impl RstStreamFrame {
    pub fn verify(&self) -> Result<(), H2Error> {
        require_stream(&self.0, "rst stream")?;

        let len = self.0.payload.len();
        if len != 4 {
            return Err(H2Error::new(
                ErrorCode::FrameSizeError,
                format!("rst stream frame's payload length({} octets) is invalid", len),
            ));
        }

        Ok(())
    }

    pub fn error_code(&self) -> ErrorCode {
        ErrorCode::from_u32(read_u32(&self.0.payload))
    }
}

impl PingFrame {
    pub fn is_ack(&self) -> bool {
        self.0.has_flag(ACK_FLAG)
    }

    pub fn verify(&self) -> Result<(), H2Error> {
        require_connection(&self.0, "ping")?;

        let len = self.0.payload.len();
        if len != PING_PAYLOAD_SIZE {
            return Err(H2Error::new(
                ErrorCode::FrameSizeError,
                format!("ping frame's payload length({} octets) is invalid", len),
            ));
        }

        Ok(())
    }

    pub fn opaque_data(&self) -> &Bytes {
        &self.0.payload
    }

    /// Builds the acknowledgement carrying the same opaque data.
    pub fn ack(&self) -> Result<PingFrame, H2Error> {
        if self.is_ack() {
            return Err(H2Error::new(
                ErrorCode::InternalError,
                "can't ack to ack ping frame",
            ));
        }

        Ok(PingFrame(RawFrame::new(
            PING_FRAME_TYPE,
            ACK_FLAG,
            0,
            self.0.payload.clone(),
        )))
    }
}

impl GoAwayFrame {
    pub fn verify(&self) -> Result<(), H2Error> {
        require_connection(&self.0, "go away")?;

        if self.0.payload.len() < 8 {
            return Err(H2Error::new(
                ErrorCode::FrameSizeError,
                "go away frame's payload length must be at least 8 octets",
            ));
        }

        Ok(())
    }

    pub fn last_stream_id(&self) -> u32 {
        read_u32(&self.0.payload) & STREAM_ID_MASK
    }

    pub fn error_code(&self) -> ErrorCode {
        ErrorCode::from_u32(read_u32(&self.0.payload[4..]))
    }

    pub fn debug_data(&self) -> Bytes {
        self.0.payload.slice(8..)
    }
}

impl ContinuationFrame {
    pub fn is_end_headers(&self) -> bool {
        self.0.has_flag(END_HEADERS_FLAG)
    }

    pub fn verify(&self) -> Result<(), H2Error> {
        require_stream(&self.0, "continuation")
    }

    pub fn fragment(&self) -> Bytes {
        self.0.payload.clone()
    }
}

impl UnknownFrame {
    pub fn verify(&self) -> Result<(), H2Error> {
        Ok(())
    }
}

fn read_u32(buf: &[u8]) -> u32 {
    u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]])
}
