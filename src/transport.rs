//! Serial transport to the RC receiver
//!
//! The receiver speaks a simple request/response pattern over a serial
//! line: write the ping, read back one newline-terminated frame. Reads
//! carry an explicit, configurable deadline so the poll loop stays
//! responsive to cancellation even when the controller goes quiet.

use std::io::{ErrorKind, Read, Write};
use std::time::Duration;
use thiserror::Error;

/// Errors from transport operations
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to open serial port {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("serial I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Request/response transport to the receiver
pub trait Transport {
    /// Write one ping frame
    fn write_ping(&mut self, ping: &[u8]) -> Result<(), TransportError>;

    /// Read one delimiter-terminated frame, including the delimiter.
    ///
    /// Returns `Ok(None)` when the read deadline expires before a full
    /// frame arrives; bytes received so far are retained for the next
    /// call.
    fn read_frame(&mut self) -> Result<Option<Vec<u8>>, TransportError>;

    /// Flush and release the transport
    fn close(&mut self) -> Result<(), TransportError>;
}

/// Frame delimiter on the wire
const DELIMITER: u8 = 0x0a;

/// Blocking serial-port transport (8N1)
pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
    /// Bytes received but not yet delivered as a complete frame
    pending: Vec<u8>,
}

impl SerialTransport {
    /// Open the given port with a read deadline
    pub fn open(port_name: &str, baud_rate: u32, read_timeout: Duration) -> Result<Self, TransportError> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(read_timeout)
            .open()
            .map_err(|source| TransportError::Open {
                port: port_name.to_string(),
                source,
            })?;
        Ok(Self {
            port,
            pending: Vec::new(),
        })
    }

    /// Name of the underlying port, if known
    pub fn name(&self) -> Option<String> {
        self.port.name()
    }

    /// Split off one complete frame from the pending buffer, if present
    fn take_frame(&mut self) -> Option<Vec<u8>> {
        let end = self.pending.iter().position(|&b| b == DELIMITER)?;
        let rest = self.pending.split_off(end + 1);
        Some(std::mem::replace(&mut self.pending, rest))
    }
}

impl Transport for SerialTransport {
    fn write_ping(&mut self, ping: &[u8]) -> Result<(), TransportError> {
        self.port.write_all(ping)?;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        if let Some(frame) = self.take_frame() {
            return Ok(Some(frame));
        }

        let mut chunk = [0u8; 64];
        loop {
            match self.port.read(&mut chunk) {
                // A zero-length read means no data is coming; treat it
                // like a deadline so the caller can re-check its stop flag
                Ok(0) => return Ok(None),
                Ok(n) => {
                    self.pending.extend_from_slice(&chunk[..n]);
                    if let Some(frame) = self.take_frame() {
                        return Ok(Some(frame));
                    }
                }
                Err(e) if e.kind() == ErrorKind::TimedOut => return Ok(None),
                Err(e) if e.kind() == ErrorKind::Interrupted => return Ok(None),
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.port.flush()?;
        Ok(())
    }
}
