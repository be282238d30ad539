//! Shared codec primitives used by every protocol decoder.
//!
//! Layering mirrors the protocol modules: conventions for safe byte
//! access live in readers, format knowledge (BCD, bit packing, CRC
//! parameters, coordinate forms, escape schemes, sentence grammars)
//! lives in the dedicated modules, and decoders stay free of ad hoc
//! byte twiddling. All reads are bounds-checked; running out of frame
//! is a `FrameTruncated` failure fatal to the current frame only.

pub mod bcd;
pub mod bits;
pub mod checksum;
pub mod coords;
pub mod datetime;
pub mod escape;
pub mod reader;
pub mod text;
pub mod units;
