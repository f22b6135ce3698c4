use crate::h2::connection::state::{HeaderBlock, HeaderBlockAssembler};
use crate::h2::connection::ConnHandle;
use crate::h2::framing::SettingsFrameBuilder;
use crate::h2::hpack::{decode_header_block, IndexTable};
use crate::types::{ErrorCode, Frame, H2Error, ServerError};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Consumes the inbound frames of one connection, in arrival order.
///
/// `received` is never called concurrently with itself; `terminated` runs
/// once after both connection loops have stopped.
#[async_trait]
pub trait Multiplexer: Send {
    async fn received(&mut self, frame: Frame);

    /// The reader hit a protocol error before a frame could be handed over,
    /// e.g. a frame over the advertised size limit. No more frames follow.
    async fn read_failed(&mut self, _err: &H2Error) {}

    async fn terminated(&mut self);
}

pub type MultiplexerFactory = Arc<dyn Fn(ConnHandle) -> Box<dyn Multiplexer> + Send + Sync>;

/// Connection-level housekeeping: acknowledges SETTINGS, answers PING,
/// honours GOAWAY and decodes request header blocks. Connection errors are
/// answered with GOAWAY followed by close.
pub struct DefaultMultiplexer {
    conn: ConnHandle,
    table: IndexTable,
    headers: HeaderBlockAssembler,
    last_stream_id: u32,
}

impl DefaultMultiplexer {
    pub fn new(conn: ConnHandle, header_table_size: usize) -> Self {
        Self {
            conn,
            table: IndexTable::new(header_table_size),
            headers: HeaderBlockAssembler::new(),
            last_stream_id: 0,
        }
    }

    pub fn factory(header_table_size: usize) -> MultiplexerFactory {
        Arc::new(move |conn| {
            Box::new(DefaultMultiplexer::new(conn, header_table_size)) as Box<dyn Multiplexer>
        })
    }

    async fn handle(&mut self, frame: Frame) -> Result<(), ServerError> {
        frame.verify()?;

        if let Some(stream_id) = self.headers.pending_stream() {
            if !matches!(frame, Frame::Continuation(_)) {
                return Err(H2Error::new(
                    ErrorCode::ProtocolError,
                    format!(
                        "expected continuation frame for stream {}, got {}",
                        stream_id,
                        frame.name()
                    ),
                )
                .into());
            }
        }

        match frame {
            Frame::Settings(settings) if !settings.is_ack() => {
                for param in settings.params() {
                    param.verify()?;
                    debug!(peer = %self.conn.peer_addr(), id = param.id, value = param.value, "peer setting");
                }
                self.conn.write(SettingsFrameBuilder::new().ack().build()?).await?;
            }
            Frame::Ping(ping) if !ping.is_ack() => {
                self.conn.write(ping.ack()?.into()).await?;
            }
            Frame::GoAway(goaway) => {
                info!(
                    peer = %self.conn.peer_addr(),
                    last_stream_id = goaway.last_stream_id(),
                    error_code = %goaway.error_code(),
                    "peer is going away"
                );
                self.conn.close();
            }
            Frame::Headers(headers) => {
                let stream_id = headers.raw().stream_id();
                self.last_stream_id = self.last_stream_id.max(stream_id);
                let block = self.headers.begin(
                    stream_id,
                    &headers.fragment(),
                    headers.is_end_headers(),
                    headers.is_end_stream(),
                )?;
                if let Some(block) = block {
                    self.decode(block).await?;
                }
            }
            Frame::Continuation(continuation) => {
                let block = self.headers.continue_block(
                    continuation.raw().stream_id(),
                    &continuation.fragment(),
                    continuation.is_end_headers(),
                )?;
                if let Some(block) = block {
                    self.decode(block).await?;
                }
            }
            Frame::RstStream(rst) => {
                debug!(
                    peer = %self.conn.peer_addr(),
                    stream_id = rst.raw().stream_id(),
                    error_code = %rst.error_code(),
                    "stream reset by peer"
                );
            }
            _ => {}
        }

        Ok(())
    }

    async fn decode(&mut self, block: HeaderBlock) -> Result<(), ServerError> {
        let headers = decode_header_block(&mut self.table, block.block)?;

        for field in &headers {
            debug!(peer = %self.conn.peer_addr(), stream_id = block.stream_id, "{}", field);
        }

        if let Err(e) = headers.validate() {
            warn!(peer = %self.conn.peer_addr(), stream_id = block.stream_id, error = %e, "malformed request headers");
            self.conn
                .write(Frame::rst_stream(block.stream_id, ErrorCode::ProtocolError))
                .await?;
        }

        Ok(())
    }

    async fn fail(&mut self, err: ServerError) {
        if matches!(err, ServerError::ConnectionClosed) {
            return;
        }

        let code = err.error_code();
        warn!(peer = %self.conn.peer_addr(), error = %err, "connection error");

        let goaway = Frame::goaway(self.last_stream_id, code, err.to_string().as_bytes());
        if let Err(e) = self.conn.write(goaway).await {
            debug!(peer = %self.conn.peer_addr(), error = %e, "failed to send goaway");
        }
        self.conn.close();
    }
}

#[async_trait]
impl Multiplexer for DefaultMultiplexer {
    async fn received(&mut self, frame: Frame) {
        debug!(
            peer = %self.conn.peer_addr(),
            frame_type = frame.frame_type(),
            flags = frame.flags(),
            stream_id = frame.stream_id(),
            length = frame.payload().len(),
            "received {} frame",
            frame.name()
        );

        if let Err(err) = self.handle(frame).await {
            self.fail(err).await;
        }
    }

    async fn read_failed(&mut self, err: &H2Error) {
        self.fail(H2Error::new(err.code(), err.message()).into()).await;
    }

    async fn terminated(&mut self) {
        debug!(peer = %self.conn.peer_addr(), "connection terminated");
    }
}
