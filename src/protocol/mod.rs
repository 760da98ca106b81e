//! Wire protocol for the dashboard controller
//!
//! Record format: `[22-byte telemetry payload] [0x0D 0x0A]`
//!
//! ```text
//! ┌────────┬─────────────────────────────┬──────────────────────────────┐
//! │ offset │ field                       │ encoding                     │
//! ├────────┼─────────────────────────────┼──────────────────────────────┤
//! │ 0      │ radio status                │ 0 = connected                │
//! │ 1–2    │ latitude integer part       │ u16 BE, degrees*100+minutes  │
//! │ 3–5    │ latitude fractional part    │ u24 BE, seconds * 10^5       │
//! │ 6–7    │ longitude integer part      │ u16 BE                       │
//! │ 8–10   │ longitude fractional part   │ u24 BE                       │
//! │ 11     │ GPS flags                   │ b0 N/S, b1 E/W, b2–7 sats    │
//! │ 12–13  │ revolution period           │ u16 BE, 10 µs ticks          │
//! │ 14–15  │ battery                     │ u16 BE millivolts            │
//! │ 16–17  │ longitudinal acceleration   │ i16 BE two's complement      │
//! │ 18–19  │ pitch                       │ i16 BE degrees               │
//! │ 20–21  │ roll                        │ i16 BE degrees               │
//! └────────┴─────────────────────────────┴──────────────────────────────┘
//! ```
//!
//! All multi-byte fields are big-endian. The format is fixed and
//! unversioned; there is no negotiation.
//!
//! This module provides:
//! - [`StreamFramer`] / [`FrameStream`]: CR/LF framing over a raw byte source
//! - [`TelemetryDecoder`]: payload decode with sticky-merge of prior state

pub mod constants;
mod decoder;
mod framer;

pub use decoder::TelemetryDecoder;
pub use framer::{Frame, FrameStream, StreamFramer};
