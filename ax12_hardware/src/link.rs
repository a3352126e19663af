//! Byte-level seam under the transport: one implementation per serial
//! device. Tests script it; the `hardware` feature provides the Pi UART.

use crate::error::Result;

/// Half-duplex byte pipe carrying servo frames.
///
/// `recv_byte` polls: `Ok(None)` means nothing has arrived yet, and the
/// caller owns the waiting/deadline policy. `send` must not return before
/// the bytes are fully on the wire, since the device answers as soon as the
/// last bit lands and the line carries one direction at a time.
pub trait SerialLink: Send {
    /// (Re)open the device at `baud_rate`, dropping any previous handle.
    fn reopen(&mut self, baud_rate: u32) -> Result<()>;

    fn send(&mut self, frame: &[u8]) -> Result<()>;

    fn recv_byte(&mut self) -> Result<Option<u8>>;

    /// Discard anything waiting in the receive buffer.
    fn flush_input(&mut self) -> Result<()>;
}
