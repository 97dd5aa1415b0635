//! Envelope transport for editor and processor running in separate processes.
//!
//! Frames are a big-endian `u32` length followed by a bincode-encoded
//! [`Envelope`], over a Unix domain socket.

use crate::error::{PluginError, ProtocolError, Result};
use crate::protocol::Envelope;
use std::path::Path;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{UnixListener, UnixStream};

/// Frames larger than this are rejected without reading the body.
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, envelope: &Envelope) -> Result<()> {
    let data = envelope.encode()?;
    writer.write_u32(data.len() as u32).await?;
    writer.write_all(&data).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Envelope> {
    let len = reader.read_u32().await? as usize;
    if len > MAX_FRAME_SIZE {
        return Err(ProtocolError::Decode(format!(
            "frame of {} bytes exceeds {} byte limit",
            len, MAX_FRAME_SIZE
        ))
        .into());
    }
    let mut data = vec![0u8; len];
    reader.read_exact(&mut data).await?;
    Ok(Envelope::decode(&data)?)
}

/// Whether an error means the peer went away.
pub fn is_disconnect(err: &PluginError) -> bool {
    matches!(
        err,
        PluginError::Io(e) if matches!(
            e.kind(),
            std::io::ErrorKind::UnexpectedEof
                | std::io::ErrorKind::BrokenPipe
                | std::io::ErrorKind::ConnectionReset
        )
    )
}

/// Bidirectional envelope stream.
pub struct EnvelopeTransport {
    stream: UnixStream,
}

impl EnvelopeTransport {
    pub fn new(stream: UnixStream) -> Self {
        Self { stream }
    }

    /// Must be called from within a tokio runtime.
    pub fn from_std(stream: std::os::unix::net::UnixStream) -> Result<Self> {
        stream.set_nonblocking(true)?;
        Ok(Self::new(UnixStream::from_std(stream)?))
    }

    pub async fn connect(socket_path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(socket_path).await?;
        Ok(Self::new(stream))
    }

    pub async fn send(&mut self, envelope: &Envelope) -> Result<()> {
        write_frame(&mut self.stream, envelope).await
    }

    pub async fn recv(&mut self) -> Result<Envelope> {
        read_frame(&mut self.stream).await
    }

    pub fn into_split(self) -> (EnvelopeReader, EnvelopeWriter) {
        let (read, write) = self.stream.into_split();
        (EnvelopeReader { half: read }, EnvelopeWriter { half: write })
    }
}

pub struct EnvelopeReader {
    half: OwnedReadHalf,
}

impl EnvelopeReader {
    pub async fn recv(&mut self) -> Result<Envelope> {
        read_frame(&mut self.half).await
    }
}

pub struct EnvelopeWriter {
    half: OwnedWriteHalf,
}

impl EnvelopeWriter {
    pub async fn send(&mut self, envelope: &Envelope) -> Result<()> {
        write_frame(&mut self.half, envelope).await
    }
}

/// Accepts transports on a socket path.
pub struct EnvelopeListener {
    listener: UnixListener,
}

impl EnvelopeListener {
    pub fn bind(socket_path: &Path) -> Result<Self> {
        let listener = UnixListener::bind(socket_path)?;
        tracing::debug!("Listening on {}", socket_path.display());
        Ok(Self { listener })
    }

    pub async fn accept(&self) -> Result<EnvelopeTransport> {
        let (stream, _) = self.listener.accept().await?;
        Ok(EnvelopeTransport::new(stream))
    }
}
