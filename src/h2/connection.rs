use crate::h2::consts::{
    CONNECTION_PREFACE, DEFAULT_HEADER_TABLE_SIZE, DEFAULT_MAX_FRAME_SIZE,
    SETTINGS_HEADER_TABLE_SIZE, SETTINGS_MAX_FRAME_SIZE,
};
use crate::h2::framing::{read_frame_async, write_frame_async, SettingsFrameBuilder};
use crate::h2::multiplexer::{DefaultMultiplexer, Multiplexer};
use crate::types::{Frame, FrameSink, ServerConfig, ServerError};
use crate::utils::timeout_result;
use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub mod state;

/// Cheap handle the multiplexer uses to talk back to its connection.
///
/// Frames go through a single-slot queue, so `write` waits until the writer
/// loop has taken the previous frame.
#[derive(Clone)]
pub struct ConnHandle {
    peer: SocketAddr,
    sender: mpsc::Sender<Frame>,
    closed: Arc<AtomicBool>,
    close_signal: CancellationToken,
    cancel: CancellationToken,
}

impl ConnHandle {
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Queues `frame` for the writer. Frames written after `close` are
    /// dropped silently; a cancelled connection fails the call.
    pub async fn write(&self, frame: Frame) -> Result<(), ServerError> {
        if self.is_closed() {
            return Ok(());
        }

        tokio::select! {
            _ = self.cancel.cancelled() => Err(ServerError::ConnectionClosed),
            sent = self.sender.send(frame) => sent.map_err(|_| ServerError::ConnectionClosed),
        }
    }

    /// Asks the writer to flush what is queued and stop. Safe to call any
    /// number of times.
    pub fn close(&self) {
        if self
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.close_signal.cancel();
        }
    }
}

#[async_trait]
impl FrameSink for ConnHandle {
    async fn write_frame(&mut self, frame: Frame) -> Result<(), ServerError> {
        self.write(frame).await
    }
}

/// Receiving side of a [`ConnHandle`], owned by the writer loop.
pub struct FrameQueue {
    receiver: mpsc::Receiver<Frame>,
    close_signal: CancellationToken,
}

pub fn channel(peer: SocketAddr, cancel: CancellationToken) -> (ConnHandle, FrameQueue) {
    let (sender, receiver) = mpsc::channel(1);
    let close_signal = CancellationToken::new();

    let handle = ConnHandle {
        peer,
        sender,
        closed: Arc::new(AtomicBool::new(false)),
        close_signal: close_signal.clone(),
        cancel,
    };

    (
        handle,
        FrameQueue {
            receiver,
            close_signal,
        },
    )
}

async fn send<W>(writer: &mut W, frame: &Frame, peer: SocketAddr) -> Result<(), ServerError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let written = write_frame_async(frame, writer).await?;
    writer.flush().await?;
    debug!(peer = %peer, stream_id = frame.stream_id(), octets = written, "sent {} frame", frame.name());
    Ok(())
}

/// Drains the queue onto `writer` until the connection is cancelled or
/// closed. On close, frames already queued are still written.
pub async fn run_writer<W>(
    writer: &mut W,
    mut queue: FrameQueue,
    cancel: &CancellationToken,
    peer: SocketAddr,
) -> Result<(), ServerError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            _ = queue.close_signal.cancelled() => {
                while let Ok(frame) = queue.receiver.try_recv() {
                    send(writer, &frame, peer).await?;
                }
                writer.shutdown().await?;
                return Ok(());
            }
            outgoing = queue.receiver.recv() => match outgoing {
                Some(frame) => send(writer, &frame, peer).await?,
                None => return Ok(()),
            },
        }
    }
}

/// Feeds every inbound frame to `mux` until the peer goes away, a read
/// fails, or the connection is cancelled. Protocol errors raised while
/// reading are reported to `mux` before the loop stops.
pub async fn run_reader<R>(
    reader: &mut R,
    mux: &mut dyn Multiplexer,
    cancel: &CancellationToken,
    max_frame_size: u32,
) -> Result<(), ServerError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            read = read_frame_async(reader, Some(max_frame_size)) => match read {
                Ok(frame) => frame,
                Err(ServerError::H2(err)) => {
                    mux.read_failed(&err).await;
                    return Err(err.into());
                }
                Err(e) => return Err(e),
            },
        };
        mux.received(frame).await;
    }
}

async fn read_client_preface<R>(reader: &mut R) -> Result<(), ServerError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut preface = [0u8; CONNECTION_PREFACE.len()];
    reader.read_exact(&mut preface).await?;
    if preface[..] != *CONNECTION_PREFACE {
        return Err(ServerError::InvalidPreface);
    }
    Ok(())
}

/// SETTINGS sent as the server preface. The decoder table size and frame
/// size limit of `config` override whatever the preface builder set.
pub fn server_preface(config: &ServerConfig) -> SettingsFrameBuilder {
    let mut preface = (config.preface)();
    if config.header_table_size != DEFAULT_HEADER_TABLE_SIZE {
        preface = preface.replace(SETTINGS_HEADER_TABLE_SIZE, config.header_table_size);
    }
    if config.max_frame_size != DEFAULT_MAX_FRAME_SIZE {
        preface = preface.replace(SETTINGS_MAX_FRAME_SIZE, config.max_frame_size);
    }
    preface
}

fn log_loop_result(peer: SocketAddr, side: &str, result: &Result<(), ServerError>) {
    match result {
        Ok(()) => {}
        Err(ServerError::Io(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
            debug!(peer = %peer, "peer closed the connection");
        }
        Err(e) => warn!(peer = %peer, error = %e, "{} stopped", side),
    }
}

/// Runs one HTTP/2 connection over an already negotiated transport.
///
/// The server SETTINGS preface goes out first, then the client preface is
/// read under the handshake timeout. After that the reader and writer loops
/// run until either stops; the multiplexer is told once both are done.
pub async fn serve_connection<S>(
    io: S,
    peer: SocketAddr,
    config: &ServerConfig,
) -> Result<(), ServerError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let (mut reader, mut writer) = tokio::io::split(io);

    let preface = server_preface(config).build()?;
    send(&mut writer, &preface, peer).await?;

    timeout_result(config.timeouts.handshake, read_client_preface(&mut reader)).await?;
    debug!(peer = %peer, "client preface accepted");

    let cancel = CancellationToken::new();
    let (handle, queue) = channel(peer, cancel.clone());

    let factory = config
        .multiplexer
        .clone()
        .unwrap_or_else(|| DefaultMultiplexer::factory(config.header_table_size as usize));
    let mut mux = factory(handle.clone());

    let writing = async {
        let result = run_writer(&mut writer, queue, &cancel, peer).await;
        cancel.cancel();
        result
    };
    let reading = async {
        let result = run_reader(&mut reader, mux.as_mut(), &cancel, config.max_frame_size).await;
        // A closed handle means the writer is draining and cancels on its own.
        if !handle.is_closed() {
            cancel.cancel();
        }
        result
    };
    let (written, read) = tokio::join!(writing, reading);

    log_loop_result(peer, "writer", &written);
    log_loop_result(peer, "reader", &read);

    mux.terminated().await;
    Ok(())
}
