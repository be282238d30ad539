//! gps103 family: comma-delimited text sentences.
//!
//! The device opens with a `##,imei:...` handshake and periodic
//! bare-imei heartbeats, both of which demand an immediate generic
//! reply even when the device is unknown; without it the tracker
//! retransmits or drops the link. Position sentences come in GPS (`F`)
//! and cell-only (`L`) revisions.

mod decoder;

pub use decoder::Gps103Decoder;
