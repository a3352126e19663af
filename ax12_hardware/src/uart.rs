//! Raspberry Pi UART link via `rppal`.

use std::path::PathBuf;
use std::time::Duration;

use rppal::uart::{Parity, Queue, Uart};

use crate::error::{LinkError, Result};
use crate::link::SerialLink;

/// Primary UART of the Pi header, the port the servo chain hangs off.
pub const DEFAULT_DEVICE: &str = "/dev/serial0";

/// `SerialLink` over a Pi UART device node. The port itself is opened
/// lazily by the first `reopen`, so constructing one is free and the
/// transport's not-initialized handling stays observable.
pub struct UartLink {
    path: PathBuf,
    port: Option<Uart>,
}

impl UartLink {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            port: None,
        }
    }

    fn port(&mut self) -> Result<&mut Uart> {
        self.port.as_mut().ok_or(LinkError::NotOpen)
    }
}

impl SerialLink for UartLink {
    fn reopen(&mut self, baud_rate: u32) -> Result<()> {
        let mut port = Uart::with_path(&self.path, baud_rate, Parity::None, 8, 1)
            .map_err(|e| LinkError::Uart(e.to_string()))?;
        // Non-blocking reads; the transport owns the answer deadline.
        port.set_read_mode(0, Duration::ZERO)
            .map_err(|e| LinkError::Uart(e.to_string()))?;
        tracing::info!(device = %self.path.display(), baud_rate, "uart opened");
        self.port = Some(port);
        Ok(())
    }

    fn send(&mut self, frame: &[u8]) -> Result<()> {
        let port = self.port()?;
        let mut sent = 0;
        while sent < frame.len() {
            sent += port
                .write(&frame[sent..])
                .map_err(|e| LinkError::Uart(e.to_string()))?;
        }
        // Half-duplex: the answer can start the moment the last bit is out,
        // so block until the TX queue has drained.
        port.drain().map_err(|e| LinkError::Uart(e.to_string()))?;
        Ok(())
    }

    fn recv_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        let n = self
            .port()?
            .read(&mut byte)
            .map_err(|e| LinkError::Uart(e.to_string()))?;
        Ok((n == 1).then_some(byte[0]))
    }

    fn flush_input(&mut self) -> Result<()> {
        self.port()?
            .flush(Queue::Input)
            .map_err(|e| LinkError::Uart(e.to_string()))
    }
}
