use bytes::{Bytes, BytesMut};
use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{Frame, VideoError, VideoSource};

/// Payload size of every datagram except the last one of a frame.
pub const CHUNK_LEN: usize = 1460;
pub const MAX_FRAME_LEN: usize = 256 * 1024;

/// Receives the vehicle's raw video stream and cuts it into frames.
#[derive(Debug)]
pub struct UdpFrameSource {
    bind: SocketAddr,
    read_timeout: Duration,
    socket: Option<UdpSocket>,
    pending: BytesMut,
    overflowed: bool,
    seq: u64,
}

impl UdpFrameSource {
    pub fn new(bind: SocketAddr, read_timeout: Duration) -> Self {
        Self {
            bind,
            read_timeout: read_timeout.max(Duration::from_millis(1)),
            socket: None,
            pending: BytesMut::with_capacity(64 * 1024),
            overflowed: false,
            seq: 0,
        }
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    // returns a finished frame when `chunk` terminates one
    fn push_chunk(&mut self, chunk: &[u8]) -> Option<Bytes> {
        if self.pending.len() + chunk.len() > MAX_FRAME_LEN {
            if !self.overflowed {
                warn!("video frame over {} bytes, discarding", MAX_FRAME_LEN);
            }
            self.overflowed = true;
            self.pending.clear();
        } else if !self.overflowed {
            self.pending.extend_from_slice(chunk);
        }

        if chunk.len() == CHUNK_LEN {
            return None;
        }
        let frame = self.pending.split().freeze();
        if std::mem::take(&mut self.overflowed) || frame.is_empty() {
            return None;
        }
        Some(frame)
    }
}

impl VideoSource for UdpFrameSource {
    fn connect(&mut self) -> Result<(), VideoError> {
        let socket = UdpSocket::bind(self.bind)?;
        socket.set_read_timeout(Some(self.read_timeout))?;
        info!("video receiver bound on {}", socket.local_addr()?);
        self.socket = Some(socket);
        self.pending.clear();
        self.overflowed = false;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<Frame>, VideoError> {
        let mut buf = [0u8; 2048];
        loop {
            let socket = self.socket.as_ref().ok_or(VideoError::NotConnected)?;
            let n = match socket.recv(&mut buf) {
                Ok(n) => n,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => return Ok(None),
                Err(e) => return Err(e.into()),
            };
            if let Some(data) = self.push_chunk(&buf[..n]) {
                self.seq += 1;
                return Ok(Some(Frame { seq: self.seq, data }));
            }
        }
    }

    fn release(&mut self) {
        if self.socket.take().is_some() {
            debug!("video receiver released");
        }
        self.pending.clear();
    }
}
