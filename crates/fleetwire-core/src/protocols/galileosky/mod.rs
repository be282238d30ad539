//! galileosky: self-describing tag streams under a CRC16-MODBUS
//! trailer.
//!
//! A data frame is a run of (tag, value) pairs whose lengths come from
//! a fixed tag table; a repeated tag starts the next record of a
//! batch, with unsent fields carrying over from the previous record.
//! Photo upload runs a request-next-part handshake through the
//! reassembler. Every frame is acknowledged by echoing its checksum,
//! even when the body is dropped.

pub mod layout;

mod decoder;

pub use decoder::GalileoskyDecoder;
