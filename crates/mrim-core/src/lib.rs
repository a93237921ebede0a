//! Sans-IO core of the MRIM server.
//!
//! Pure state machines with no sockets, clocks or logging:
//!
//! - [`framer`]: turns arbitrary TCP chunks into complete raw frames
//! - [`connection`]: owns a framer and tracks the hello/login lifecycle
//!
//! The runtime in `mrim-server` feeds bytes in, dispatches the packets that
//! come out, and reports back what it sent. Everything here is synchronous
//! and deterministic, so it is tested without a network.

#![forbid(unsafe_code)]

pub mod connection;
pub mod error;
pub mod framer;

pub use connection::{Connection, ConnectionState};
pub use error::ConnectionError;
pub use framer::{FrameEvent, Framer, FramerState, FramingError};
