use async_trait::async_trait;
use bytes::Bytes;
use h2server::h2::consts::*;
use h2server::h2::framing::{
    read_frame, read_frame_async, write_frame_async, SettingsFrameBuilder, SettingsParam,
};
use h2server::types::{ErrorCode, Frame, FrameSink, RawFrame, ServerError};
use std::io::{self, Write};
use tokio_test::io::Builder;

fn frame(frame_type: u8, flags: u8, stream_id: u32, payload: &'static [u8]) -> Frame {
    Frame::from_raw(RawFrame::new(
        frame_type,
        flags,
        stream_id,
        Bytes::from_static(payload),
    ))
}

fn verify_code(frame: &Frame) -> ErrorCode {
    frame.verify().expect_err("frame must be rejected").code()
}

struct MockSink {
    frames: Vec<Frame>,
}

#[async_trait]
impl FrameSink for MockSink {
    async fn write_frame(&mut self, frame: Frame) -> Result<(), ServerError> {
        self.frames.push(frame);
        Ok(())
    }
}

/// Accepts `capacity` octets, then fails every write.
struct LimitedWriter {
    accepted: Vec<u8>,
    capacity: usize,
}

impl Write for LimitedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let room = self.capacity - self.accepted.len();
        if room == 0 {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink full"));
        }
        let n = room.min(buf.len());
        self.accepted.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn reads_header_and_payload() {
    let wire = [
        0x00, 0x00, 0x05, 0x00, 0x01, 0x80, 0x00, 0x00, 0x03, b'h', b'e', b'l', b'l', b'o',
    ];
    let parsed = read_frame(&mut &wire[..]).expect("read frame");

    // reserved bit is dropped
    assert_eq!(parsed.stream_id(), 3);
    assert_eq!(parsed.frame_type(), DATA_FRAME_TYPE);
    assert_eq!(parsed.payload(), &Bytes::from_static(b"hello"));
    match parsed {
        Frame::Data(data) => {
            assert!(data.is_end_stream());
            assert!(!data.is_padded());
            assert_eq!(data.data(), Bytes::from_static(b"hello"));
        }
        other => panic!("expected data frame, got {}", other.name()),
    }
}

#[test]
fn short_read_is_an_error() {
    let wire = [0x00, 0x00, 0x05, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, b'h', b'i'];
    let err = read_frame(&mut &wire[..]).expect_err("truncated payload");
    assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);

    let err = read_frame(&mut &wire[..4]).expect_err("truncated header");
    assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
}

#[test]
fn reads_consecutive_frames() {
    let mut wire = frame(PING_FRAME_TYPE, 0, 0, b"12345678")
        .serialize()
        .expect("serialize ping")
        .to_vec();
    wire.extend_from_slice(&frame(SETTINGS_FRAME_TYPE, ACK_FLAG, 0, b"").serialize().expect("serialize settings"));

    let mut reader = &wire[..];
    assert!(matches!(read_frame(&mut reader).expect("first"), Frame::Ping(_)));
    assert!(matches!(read_frame(&mut reader).expect("second"), Frame::Settings(_)));
    assert!(reader.is_empty());
}

#[test]
fn serialize_writes_nine_octet_header() {
    let ping = frame(PING_FRAME_TYPE, ACK_FLAG, 0, b"12345678");
    let bytes = ping.serialize().expect("serialize");

    assert_eq!(&bytes[..FRAME_HEADER_SIZE], &[0, 0, 8, 6, 1, 0, 0, 0, 0]);
    assert_eq!(&bytes[FRAME_HEADER_SIZE..], b"12345678");
    assert_eq!(read_frame(&mut &bytes[..]).expect("read back"), ping);
}

#[test]
fn built_frames_clear_the_reserved_bit() {
    let built = frame(HEADERS_FRAME_TYPE, END_HEADERS_FLAG, 0x8000_0007, b"\x82");
    assert_eq!(built.stream_id(), 7);

    let bytes = built.serialize().expect("serialize");
    assert_eq!(&bytes[5..9], &[0, 0, 0, 7]);
}

#[test]
fn oversized_payload_cannot_be_serialized() {
    let payload = Bytes::from(vec![0u8; MAX_FRAME_SIZE_UPPER_BOUND as usize + 1]);
    let data = Frame::from_raw(RawFrame::new(DATA_FRAME_TYPE, 0, 1, payload));
    let err = data.serialize().expect_err("too large");
    assert_eq!(err.code(), ErrorCode::FrameSizeError);
}

#[test]
fn write_to_reports_octets_written() {
    let ping = frame(PING_FRAME_TYPE, 0, 0, b"abcdefgh");

    let mut out = Vec::new();
    assert_eq!(ping.write_to(&mut out).expect("write"), 17);
    assert_eq!(out.len(), 17);

    let mut limited = LimitedWriter {
        accepted: Vec::new(),
        capacity: 12,
    };
    let err = ping.write_to(&mut limited).expect_err("sink fills up");
    assert_eq!(err.written, 12);
    assert_eq!(err.source.kind(), io::ErrorKind::BrokenPipe);
    assert_eq!(&limited.accepted[..FRAME_HEADER_SIZE], &out[..FRAME_HEADER_SIZE]);
}

#[test]
fn every_frame_kind_survives_write_and_read() {
    let frames = [
        // pad length 2, data "hi", 2 octets of padding
        frame(DATA_FRAME_TYPE, PADDED_FLAG | END_STREAM_FLAG, 1, b"\x02hi\x00\x00"),
        // pad length 1, dependency 3 (exclusive), weight 16, fragment 0x82, padding
        frame(
            HEADERS_FRAME_TYPE,
            PADDED_FLAG | PRIORITY_FLAG | END_HEADERS_FLAG,
            3,
            b"\x01\x80\x00\x00\x03\x10\x82\x00",
        ),
        Frame::rst_stream(5, ErrorCode::Cancel),
        SettingsFrameBuilder::new()
            .set(SETTINGS_MAX_CONCURRENT_STREAMS, 100)
            .build()
            .expect("settings"),
        frame(PUSH_PROMISE_FRAME_TYPE, END_HEADERS_FLAG, 1, b"\x00\x00\x00\x02\x82"),
        frame(PING_FRAME_TYPE, ACK_FLAG, 0, b"pingpong"),
        Frame::goaway(7, ErrorCode::EnhanceYourCalm, b"slow down"),
        frame(CONTINUATION_FRAME_TYPE, END_HEADERS_FLAG, 3, b"\x84"),
        frame(0xff, 0xff, 9, b"opaque"),
        frame(HEADERS_FRAME_TYPE, END_HEADERS_FLAG, 0x8000_0005, b"\x82"),
    ];

    let mut wire = Vec::new();
    for f in &frames {
        let written = f.write_to(&mut wire).expect("write");
        assert_eq!(written, FRAME_HEADER_SIZE + f.payload().len());
    }

    let mut reader = &wire[..];
    for f in &frames {
        let parsed = read_frame(&mut reader).expect("read back");
        assert_eq!(&parsed, f);
        assert!(parsed.verify().is_ok(), "{} must verify", parsed.name());
    }
    assert!(reader.is_empty());

    match read_frame(&mut &wire[..]).expect("first frame") {
        Frame::Data(data) => assert_eq!(data.data(), Bytes::from_static(b"hi")),
        other => panic!("expected data frame, got {}", other.name()),
    }
    match &frames[1] {
        Frame::Headers(headers) => assert_eq!(headers.fragment(), Bytes::from_static(b"\x82")),
        other => panic!("expected headers frame, got {}", other.name()),
    }
    match &frames[6] {
        Frame::GoAway(goaway) => {
            assert_eq!(goaway.debug_data(), Bytes::from_static(b"slow down"))
        }
        other => panic!("expected goaway frame, got {}", other.name()),
    }
    assert_eq!(frames[8].name(), "Unknown");
    assert_eq!(frames[9].stream_id(), 5);
}

#[test]
fn type_codes_map_to_variants() {
    let cases: [(u8, &str); 10] = [
        (DATA_FRAME_TYPE, "Data"),
        (HEADERS_FRAME_TYPE, "Headers"),
        (PRIORITY_FRAME_TYPE, "Unknown"),
        (RST_STREAM_FRAME_TYPE, "RstStream"),
        (SETTINGS_FRAME_TYPE, "Settings"),
        (PUSH_PROMISE_FRAME_TYPE, "PushPromise"),
        (PING_FRAME_TYPE, "Ping"),
        (GOAWAY_FRAME_TYPE, "GoAway"),
        (WINDOW_UPDATE_FRAME_TYPE, "Unknown"),
        (CONTINUATION_FRAME_TYPE, "Continuation"),
    ];

    for (frame_type, name) in cases {
        assert_eq!(frame(frame_type, 0, 1, b"").name(), name);
    }
    assert_eq!(frame(0xfa, 0, 0, b"").name(), "Unknown");
}

#[test]
fn unknown_frames_always_verify() {
    assert!(frame(0xfa, 0xff, 0, b"anything").verify().is_ok());
    assert!(frame(PRIORITY_FRAME_TYPE, 0, 0, b"").verify().is_ok());
    assert!(frame(WINDOW_UPDATE_FRAME_TYPE, 0, 3, b"\x00").verify().is_ok());
}

#[test]
fn data_frame_rules() {
    assert_eq!(verify_code(&frame(DATA_FRAME_TYPE, 0, 0, b"x")), ErrorCode::ProtocolError);
    assert_eq!(
        verify_code(&frame(DATA_FRAME_TYPE, PADDED_FLAG, 1, b"")),
        ErrorCode::FrameSizeError
    );
    assert_eq!(
        verify_code(&frame(DATA_FRAME_TYPE, PADDED_FLAG, 1, b"\x05ab")),
        ErrorCode::FrameSizeError
    );

    let padded = frame(DATA_FRAME_TYPE, PADDED_FLAG, 1, b"\x02hi\x00\x00");
    padded.verify().expect("valid padding");
    match padded {
        Frame::Data(data) => assert_eq!(data.data(), Bytes::from_static(b"hi")),
        other => panic!("expected data frame, got {}", other.name()),
    }
}

#[test]
fn headers_frame_rules() {
    assert_eq!(
        verify_code(&frame(HEADERS_FRAME_TYPE, END_HEADERS_FLAG, 0, b"\x82")),
        ErrorCode::ProtocolError
    );
    assert_eq!(
        verify_code(&frame(HEADERS_FRAME_TYPE, PADDED_FLAG, 1, b"")),
        ErrorCode::ProtocolError
    );
    assert_eq!(
        verify_code(&frame(HEADERS_FRAME_TYPE, PRIORITY_FLAG, 1, b"\x00\x00\x00")),
        ErrorCode::ProtocolError
    );
    assert_eq!(
        verify_code(&frame(HEADERS_FRAME_TYPE, PADDED_FLAG, 1, b"\x04\x82")),
        ErrorCode::ProtocolError
    );

    let full = frame(
        HEADERS_FRAME_TYPE,
        PADDED_FLAG | PRIORITY_FLAG | END_HEADERS_FLAG | END_STREAM_FLAG,
        1,
        b"\x01\x00\x00\x00\x00\x10\x82\x00",
    );
    full.verify().expect("valid headers");
    match full {
        Frame::Headers(headers) => {
            assert!(headers.is_end_headers());
            assert!(headers.is_end_stream());
            assert!(headers.is_prioritized());
            assert_eq!(headers.fragment(), Bytes::from_static(b"\x82"));
        }
        other => panic!("expected headers frame, got {}", other.name()),
    }
}

#[test]
fn push_promise_frame_rules() {
    assert_eq!(
        verify_code(&frame(PUSH_PROMISE_FRAME_TYPE, 0, 0, b"\x00\x00\x00\x02")),
        ErrorCode::ProtocolError
    );
    assert_eq!(
        verify_code(&frame(PUSH_PROMISE_FRAME_TYPE, 0, 1, b"\x00\x00\x02")),
        ErrorCode::FrameSizeError
    );
    assert_eq!(
        verify_code(&frame(PUSH_PROMISE_FRAME_TYPE, PADDED_FLAG, 1, b"\x03\x00\x00\x00\x02")),
        ErrorCode::FrameSizeError
    );

    let promise = frame(
        PUSH_PROMISE_FRAME_TYPE,
        END_HEADERS_FLAG,
        1,
        b"\x80\x00\x00\x02\x82",
    );
    promise.verify().expect("valid push promise");
    match promise {
        Frame::PushPromise(promise) => {
            assert!(promise.is_end_headers());
            assert_eq!(promise.promised_stream_id(), 2);
            assert_eq!(promise.header_fragment(), Bytes::from_static(b"\x82"));
        }
        other => panic!("expected push promise frame, got {}", other.name()),
    }
}

#[test]
fn rst_stream_frame_rules() {
    assert_eq!(
        verify_code(&frame(RST_STREAM_FRAME_TYPE, 0, 0, b"\x00\x00\x00\x08")),
        ErrorCode::ProtocolError
    );
    assert_eq!(
        verify_code(&frame(RST_STREAM_FRAME_TYPE, 0, 1, b"\x00\x00\x08")),
        ErrorCode::FrameSizeError
    );

    let rst = Frame::rst_stream(3, ErrorCode::Cancel);
    assert_eq!(
        &rst.serialize().expect("serialize")[..],
        &[0, 0, 4, 3, 0, 0, 0, 0, 3, 0, 0, 0, 8]
    );
    match frame(RST_STREAM_FRAME_TYPE, 0, 1, b"\x00\x00\x00\x42") {
        Frame::RstStream(rst) => assert_eq!(rst.error_code(), ErrorCode::Unknown(0x42)),
        other => panic!("expected rst stream frame, got {}", other.name()),
    }
}

#[test]
fn settings_frame_rules() {
    assert_eq!(
        verify_code(&frame(SETTINGS_FRAME_TYPE, 0, 1, b"")),
        ErrorCode::ProtocolError
    );
    assert_eq!(
        verify_code(&frame(SETTINGS_FRAME_TYPE, ACK_FLAG, 0, b"\x00\x02\x00\x00\x00\x00")),
        ErrorCode::FrameSizeError
    );
    assert_eq!(
        verify_code(&frame(SETTINGS_FRAME_TYPE, 0, 0, b"\x00\x02\x00\x00\x00")),
        ErrorCode::FrameSizeError
    );
    assert!(frame(SETTINGS_FRAME_TYPE, ACK_FLAG, 0, b"").verify().is_ok());
}

#[test]
fn settings_builder_encodes_params() {
    let built = SettingsFrameBuilder::new()
        .set(SETTINGS_MAX_FRAME_SIZE, 16_384)
        .add(SettingsParam::new(SETTINGS_ENABLE_PUSH, 0))
        .set(0x99, 7)
        .build()
        .expect("build settings");

    built.verify().expect("valid settings");
    assert_eq!(built.payload().len(), 18);
    match built {
        Frame::Settings(settings) => {
            assert!(!settings.is_ack());
            assert_eq!(
                settings.params(),
                vec![
                    SettingsParam::new(SETTINGS_MAX_FRAME_SIZE, 16_384),
                    SettingsParam::new(SETTINGS_ENABLE_PUSH, 0),
                ]
            );
        }
        other => panic!("expected settings frame, got {}", other.name()),
    }
}

#[test]
fn settings_builder_rejects_bad_values() {
    let cases = [
        (SETTINGS_ENABLE_PUSH, 2, ErrorCode::ProtocolError),
        (SETTINGS_INITIAL_WINDOW_SIZE, MAX_INITIAL_WINDOW_SIZE + 1, ErrorCode::FlowControlError),
        (SETTINGS_MAX_FRAME_SIZE, MIN_MAX_FRAME_SIZE - 1, ErrorCode::FlowControlError),
        (SETTINGS_MAX_FRAME_SIZE, MAX_FRAME_SIZE_UPPER_BOUND + 1, ErrorCode::FlowControlError),
    ];

    for (id, value, code) in cases {
        let err = SettingsFrameBuilder::new()
            .set(id, value)
            .build()
            .expect_err("invalid value");
        assert_eq!(err.code(), code, "id {} value {}", id, value);
    }

    assert!(SettingsFrameBuilder::new()
        .set(SETTINGS_MAX_FRAME_SIZE, MAX_FRAME_SIZE_UPPER_BOUND)
        .build()
        .is_ok());
}

#[test]
fn settings_ack_carries_no_params() {
    let ack = SettingsFrameBuilder::new().ack().build().expect("ack");
    assert_eq!(ack.flags(), ACK_FLAG);
    assert!(ack.payload().is_empty());

    let err = SettingsFrameBuilder::new()
        .ack()
        .set(SETTINGS_HEADER_TABLE_SIZE, 0)
        .build()
        .expect_err("ack with params");
    assert_eq!(err.code(), ErrorCode::FrameSizeError);
}

#[test]
fn ping_frame_rules() {
    assert_eq!(
        verify_code(&frame(PING_FRAME_TYPE, 0, 1, b"12345678")),
        ErrorCode::ProtocolError
    );
    assert_eq!(
        verify_code(&frame(PING_FRAME_TYPE, 0, 0, b"1234567")),
        ErrorCode::FrameSizeError
    );

    match frame(PING_FRAME_TYPE, 0, 0, b"opaque!!") {
        Frame::Ping(ping) => {
            let ack = ping.ack().expect("ack");
            assert!(ack.is_ack());
            assert_eq!(ack.opaque_data(), ping.opaque_data());

            let err = ack.ack().expect_err("ack of ack");
            assert_eq!(err.code(), ErrorCode::InternalError);
        }
        other => panic!("expected ping frame, got {}", other.name()),
    }
}

#[test]
fn goaway_frame_rules() {
    assert_eq!(
        verify_code(&frame(GOAWAY_FRAME_TYPE, 0, 1, b"\x00\x00\x00\x00\x00\x00\x00\x00")),
        ErrorCode::ProtocolError
    );
    assert_eq!(
        verify_code(&frame(GOAWAY_FRAME_TYPE, 0, 0, b"\x00\x00\x00\x00\x00\x00\x00")),
        ErrorCode::FrameSizeError
    );

    let goaway = Frame::goaway(5, ErrorCode::EnhanceYourCalm, b"calm");
    goaway.verify().expect("valid goaway");
    match goaway {
        Frame::GoAway(goaway) => {
            assert_eq!(goaway.last_stream_id(), 5);
            assert_eq!(goaway.error_code(), ErrorCode::EnhanceYourCalm);
            assert_eq!(goaway.debug_data(), Bytes::from_static(b"calm"));
        }
        other => panic!("expected goaway frame, got {}", other.name()),
    }
}

#[test]
fn continuation_frame_rules() {
    assert_eq!(
        verify_code(&frame(CONTINUATION_FRAME_TYPE, END_HEADERS_FLAG, 0, b"\x82")),
        ErrorCode::ProtocolError
    );
    match frame(CONTINUATION_FRAME_TYPE, END_HEADERS_FLAG, 1, b"\x82") {
        Frame::Continuation(continuation) => {
            assert!(continuation.is_end_headers());
            assert_eq!(continuation.fragment(), Bytes::from_static(b"\x82"));
        }
        other => panic!("expected continuation frame, got {}", other.name()),
    }
}

#[tokio::test]
async fn async_read_in_pieces() {
    let ping = frame(PING_FRAME_TYPE, 0, 0, b"abcdefgh");
    let bytes = ping.serialize().expect("serialize");

    let mut mock = Builder::new()
        .read(&bytes[..4])
        .read(&bytes[4..11])
        .read(&bytes[11..])
        .build();
    let parsed = read_frame_async(&mut mock, Some(DEFAULT_MAX_FRAME_SIZE))
        .await
        .expect("read frame");
    assert_eq!(parsed, ping);
}

#[tokio::test]
async fn async_read_rejects_oversized_frame() {
    // declares 16385 octets, one more than the default limit
    let header = [0x00, 0x40, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01];
    let mut mock = Builder::new().read(&header).build();

    let err = read_frame_async(&mut mock, Some(DEFAULT_MAX_FRAME_SIZE))
        .await
        .expect_err("too large");
    assert_eq!(err.error_code(), ErrorCode::FrameSizeError);
}

#[tokio::test]
async fn async_read_without_limit() {
    let data = Frame::from_raw(RawFrame::new(
        DATA_FRAME_TYPE,
        0,
        1,
        Bytes::from(vec![7u8; 20_000]),
    ));
    let bytes = data.serialize().expect("serialize");
    let mut mock = Builder::new().read(&bytes).build();

    let parsed = read_frame_async(&mut mock, None).await.expect("read");
    assert_eq!(parsed.payload().len(), 20_000);
}

#[tokio::test]
async fn async_write_sends_serialized_frame() {
    let goaway = Frame::goaway(0, ErrorCode::NoError, b"");
    let bytes = goaway.serialize().expect("serialize");
    let mut mock = Builder::new().write(&bytes).build();

    let written = write_frame_async(&goaway, &mut mock).await.expect("write");
    assert_eq!(written, 17);
}

#[tokio::test]
async fn frames_go_through_a_sink() {
    let mut sink = MockSink { frames: Vec::new() };
    let ping = frame(PING_FRAME_TYPE, 0, 0, b"12345678");

    sink.write_frame(ping.clone()).await.expect("send ping");
    sink.write_frame(Frame::rst_stream(1, ErrorCode::Cancel))
        .await
        .expect("send rst");

    assert_eq!(sink.frames.len(), 2);
    assert_eq!(sink.frames[0], ping);
    assert_eq!(sink.frames[1].name(), "RstStream");
}
