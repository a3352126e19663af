//! Serial transport for AX12-class servo chains.
//!
//! Implements `ax12_traits::Transport` over a half-duplex UART: instruction
//! framing and status parsing (`frame`), the control-table map
//! (`registers`), unit conversions (`convert`), the locked
//! flush/send/retry exchange engine plus the arrival-watcher thread
//! (`transport`). The real Raspberry Pi UART lives behind the `hardware`
//! feature; everything else compiles and tests on any host against a
//! scripted [`SerialLink`].

pub mod convert;
pub mod error;
pub mod frame;
pub mod link;
pub mod registers;
pub mod transport;
#[cfg(feature = "hardware")]
pub mod uart;
mod watcher;

pub use error::{LinkError, Result};
pub use frame::{FrameError, FrameParser, StatusFrame};
pub use link::SerialLink;
pub use transport::{SerialTransport, WATCH_CAPACITY};
#[cfg(feature = "hardware")]
pub use uart::{DEFAULT_DEVICE, UartLink};
