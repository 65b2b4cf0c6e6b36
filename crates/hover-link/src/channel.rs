use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;
use tracing::{debug, info, warn};

use hover_proto::telemetry::{parse_battery, parse_state, StateReport};
use hover_proto::{Command, Direction, Rotation};

use crate::error::TransportError;

const REPLY_BUF: usize = 1024;

/// Anything that can carry the vehicle's text protocol.
///
/// Every call blocks the caller for `wait` after the datagram leaves, so the
/// vehicle has time to act before the next command arrives.
pub trait CommandLink: Send + Sync {
    fn send(&self, command: &Command, wait: Duration) -> Result<(), TransportError>;

    /// Sends `command` and blocks up to `timeout` for a single reply datagram.
    fn send_and_await_response(
        &self,
        command: &Command,
        wait: Duration,
        timeout: Duration,
    ) -> Result<String, TransportError>;

    fn send_default(&self, command: &Command) -> Result<(), TransportError> {
        self.send(command, command.default_wait())
    }

    fn activate_sdk_mode(&self) -> Result<(), TransportError> {
        self.send_default(&Command::Sdk)
    }

    fn start_video_stream(&self) -> Result<(), TransportError> {
        self.activate_sdk_mode()?;
        self.send_default(&Command::StreamOn)?;
        info!("video stream started");
        Ok(())
    }

    fn stop_video_stream(&self) -> Result<(), TransportError> {
        self.send_default(&Command::StreamOff)
    }

    fn takeoff(&self) -> Result<(), TransportError> {
        self.send_default(&Command::Takeoff)
    }

    fn land(&self) -> Result<(), TransportError> {
        self.send_default(&Command::Land)
    }

    fn emergency(&self) -> Result<(), TransportError> {
        self.send_default(&Command::Emergency)
    }

    fn stop(&self) -> Result<(), TransportError> {
        self.send_default(&Command::Stop)
    }

    fn move_by(&self, dir: Direction, cm: u32) -> Result<(), TransportError> {
        let cmd = Command::movement(dir, cm)?;
        self.send_default(&cmd)
    }

    fn rotate_by(&self, rot: Rotation, deg: u32) -> Result<(), TransportError> {
        let cmd = Command::rotation(rot, deg)?;
        self.send_default(&cmd)
    }

    fn battery(&self, timeout: Duration) -> Result<u8, TransportError> {
        let reply = self.send_and_await_response(&Command::Battery, Command::Battery.default_wait(), timeout)?;
        parse_battery(&reply).ok_or(TransportError::Malformed(reply))
    }

    fn state(&self, timeout: Duration) -> Result<StateReport, TransportError> {
        let reply = self.send_and_await_response(&Command::State, Command::State.default_wait(), timeout)?;
        let report = parse_state(&reply);
        if report.is_empty() {
            return Err(TransportError::Malformed(reply));
        }
        Ok(report)
    }
}

/// UDP command channel to the vehicle.
///
/// Sends go out through one unbound socket. Replies are read on a socket
/// bound to `response_bind` that exists only for the duration of one query.
#[derive(Debug)]
pub struct CommandChannel {
    socket: Option<UdpSocket>,
    peer: SocketAddr,
    response_bind: SocketAddr,
}

impl CommandChannel {
    pub fn open(peer: SocketAddr, response_bind: SocketAddr) -> Result<Self, TransportError> {
        let bind: SocketAddr = if peer.is_ipv4() { ([0, 0, 0, 0], 0).into() } else { (std::net::Ipv6Addr::UNSPECIFIED, 0).into() };
        let socket = UdpSocket::bind(bind)?;
        info!("command channel open: local={} peer={}", socket.local_addr()?, peer);
        Ok(Self { socket: Some(socket), peer, response_bind })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    pub fn close(&mut self) {
        if self.socket.take().is_some() {
            info!("command channel closed");
        }
    }

    fn log_send(&self, command: &Command) {
        if command.is_rc() {
            debug!("send: {}", command);
        } else {
            info!("send: {}", command);
        }
    }
}

impl CommandLink for CommandChannel {
    fn send(&self, command: &Command, wait: Duration) -> Result<(), TransportError> {
        let socket = self.socket.as_ref().ok_or(TransportError::NotConnected)?;
        self.log_send(command);
        if let Err(e) = socket.send_to(command.to_string().as_bytes(), self.peer) {
            warn!("send failed: {}: {}", command, e);
            return Err(e.into());
        }
        std::thread::sleep(wait);
        Ok(())
    }

    fn send_and_await_response(
        &self,
        command: &Command,
        wait: Duration,
        timeout: Duration,
    ) -> Result<String, TransportError> {
        if self.socket.is_none() {
            return Err(TransportError::NotConnected);
        }

        // dropped on every return path below
        let rx = UdpSocket::bind(self.response_bind)?;
        rx.set_read_timeout(Some(timeout.max(Duration::from_millis(1))))?;

        self.log_send(command);
        rx.send_to(command.to_string().as_bytes(), self.peer)?;

        let mut buf = [0u8; REPLY_BUF];
        let reply = match rx.recv_from(&mut buf) {
            Ok((n, from)) => {
                let text = String::from_utf8_lossy(&buf[..n]).trim().to_string();
                debug!("reply from {}: {:?}", from, text);
                text
            }
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                return Err(TransportError::Timeout(timeout));
            }
            Err(e) => return Err(e.into()),
        };
        drop(rx);

        std::thread::sleep(wait);
        Ok(reply)
    }
}
