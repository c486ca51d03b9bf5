//! Newline-delimited request/reply plumbing shared by the broker and the
//! rate limiter.
//!
//! # Protocol
//! ```text
//! client → server:  <command>\n
//! server → client:  <reply>\n
//! ```
//! A connection may carry any number of exchanges; the server answers each
//! line before reading the next one. `\r\n` terminators are accepted.
//! Lines longer than [`MAX_LINE_LENGTH`] bytes close the connection.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::time;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};

use crate::net::connection::{ConnectionGuard, ConnectionTracker};

/// Longest accepted line in bytes, terminator excluded.
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

fn line_codec() -> LinesCodec {
    LinesCodec::new_with_max_length(MAX_LINE_LENGTH)
}

/// Answers one protocol line. Implementations must not block on I/O.
pub trait LineHandler: Send + Sync + 'static {
    /// Service name used in log events.
    fn name(&self) -> &'static str;

    /// Produce the reply for `line`, without the trailing newline.
    fn handle_line(&self, line: &str) -> String;
}

/// Accept connections until shutdown, serving each on its own task.
pub async fn serve_lines<H: LineHandler>(
    listener: TcpListener,
    handler: Arc<H>,
    mut shutdown: broadcast::Receiver<()>,
) -> io::Result<()> {
    let local_addr = listener.local_addr()?;
    let tracker = ConnectionTracker::new(handler.name());
    tracing::info!(service = handler.name(), address = %local_addr, "Line server listening");

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::warn!(service = handler.name(), error = %e, "Failed to accept connection");
                        time::sleep(Duration::from_millis(50)).await;
                        continue;
                    }
                };

                let guard = tracker.open(peer);
                let handler = handler.clone();
                tracing::debug!(
                    service = handler.name(),
                    connection_id = guard.id(),
                    peer_addr = %peer,
                    active = tracker.active(),
                    "Connection accepted"
                );

                tokio::spawn(async move {
                    match handle_connection(stream, handler.as_ref(), &guard).await {
                        Ok(()) => {}
                        Err(LinesCodecError::MaxLineLengthExceeded) => {
                            tracing::warn!(
                                service = handler.name(),
                                connection_id = guard.id(),
                                peer_addr = %guard.peer(),
                                max_length = MAX_LINE_LENGTH,
                                "Line too long, closing connection"
                            );
                        }
                        Err(LinesCodecError::Io(e)) => {
                            tracing::warn!(
                                service = handler.name(),
                                connection_id = guard.id(),
                                peer_addr = %guard.peer(),
                                error = %e,
                                "Connection ended with error"
                            );
                        }
                    }
                });
            }
            _ = shutdown.recv() => {
                tracing::info!(service = handler.name(), "Line server received shutdown signal");
                break;
            }
        }
    }

    Ok(())
}

async fn handle_connection<H: LineHandler>(
    stream: TcpStream,
    handler: &H,
    conn: &ConnectionGuard,
) -> Result<(), LinesCodecError> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = FramedRead::new(reader, line_codec());

    while let Some(line) = lines.next().await {
        let line = line?;
        let mut reply = handler.handle_line(&line);
        tracing::trace!(connection_id = conn.id(), request = %line, reply = %reply, "Line handled");
        reply.push('\n');
        writer.write_all(reply.as_bytes()).await?;
    }

    Ok(())
}

/// Failure of a single client exchange.
#[derive(Debug, Error)]
pub enum LineError {
    #[error("connection to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error talking to {addr}: {source}")]
    Io {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("{addr} sent a reply longer than {MAX_LINE_LENGTH} bytes")]
    ReplyTooLong { addr: String },

    #[error("{addr} closed the connection without replying")]
    Closed { addr: String },

    #[error("{addr} did not reply within {timeout:?}")]
    Timeout { addr: String, timeout: Duration },
}

/// Open a connection to `addr`, send one line, and read one reply line.
/// The whole exchange is bounded by `timeout`.
pub async fn request_line(addr: &str, line: &str, timeout: Duration) -> Result<String, LineError> {
    match time::timeout(timeout, exchange(addr, line)).await {
        Ok(result) => result,
        Err(_) => Err(LineError::Timeout {
            addr: addr.to_string(),
            timeout,
        }),
    }
}

async fn exchange(addr: &str, line: &str) -> Result<String, LineError> {
    let stream = TcpStream::connect(addr)
        .await
        .map_err(|source| LineError::Connect {
            addr: addr.to_string(),
            source,
        })?;
    let io_err = |source| LineError::Io {
        addr: addr.to_string(),
        source,
    };

    let (reader, mut writer) = stream.into_split();
    let mut request = String::with_capacity(line.len() + 1);
    request.push_str(line);
    request.push('\n');
    writer.write_all(request.as_bytes()).await.map_err(io_err)?;

    let mut lines = FramedRead::new(reader, line_codec());
    match lines.next().await {
        Some(Ok(reply)) => Ok(reply),
        Some(Err(LinesCodecError::Io(source))) => Err(io_err(source)),
        Some(Err(LinesCodecError::MaxLineLengthExceeded)) => Err(LineError::ReplyTooLong {
            addr: addr.to_string(),
        }),
        None => Err(LineError::Closed {
            addr: addr.to_string(),
        }),
    }
}
