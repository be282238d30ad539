//! gt06 family: fixed-layout binary frames in a checksummed envelope.
//!
//! Devices log in first (BCD imei) and send telemetry afterwards, so
//! identity is deferred: the login frame establishes the session that
//! every later frame relies on. A login through the `79 79`
//! wide-length envelope puts the session in extended mode and acks
//! follow that framing. Checksum verification is advisory, field
//! units of this family are frequently non-compliant.

pub mod layout;

mod decoder;

pub use decoder::Gt06Decoder;
