//! The TLS record layer, used purely as a framing shell.
//!
//! Every record is laid out as follows:
//! ```text
//! +--------------+-----------------+-----------------+------------------+
//! | content type | version         | length (BE)     | payload          |
//! | 1 byte       | 2 bytes         | 2 bytes         | `length` bytes   |
//! +--------------+-----------------+-----------------+------------------+
//! ```
//!
//! Outgoing payloads longer than [`MAX_RECORD_PAYLOAD`] are split across as many records as
//! needed. Incoming records are read whole, no matter how the stream chops them up.

use std::io::{self, Error, ErrorKind};

use tokio::io::{AsyncRead, AsyncReadExt};

/// The length of a record header.
pub const RECORD_HEADER_LEN: usize = 5;

/// The largest payload a single outgoing record may carry (2^14, the TLS plaintext limit).
pub const MAX_RECORD_PAYLOAD: usize = 0x4000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ContentType {
    ChangeCipherSpec = 0x14,
    Handshake = 0x16,
    ApplicationData = 0x17,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolVersion(pub u16);

impl ProtocolVersion {
    /// Used on the record carrying the ClientHello, like real browsers do.
    pub const TLS10: Self = Self(0x0301);
    pub const TLS12: Self = Self(0x0303);
}

/// A parsed record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub content_type: u8,
    pub version: u16,
    pub length: u16,
}

impl RecordHeader {
    pub fn parse(bytes: &[u8; RECORD_HEADER_LEN]) -> Self {
        Self {
            content_type: bytes[0],
            version: u16::from_be_bytes([bytes[1], bytes[2]]),
            length: u16::from_be_bytes([bytes[3], bytes[4]]),
        }
    }
}

/// Returns how many bytes framing a payload of length `payload_len` produces.
pub const fn framed_len(payload_len: usize) -> usize {
    let record_count = match payload_len {
        0 => 1,
        len => (len + MAX_RECORD_PAYLOAD - 1) / MAX_RECORD_PAYLOAD,
    };

    payload_len + record_count * RECORD_HEADER_LEN
}

fn push_record(out: &mut Vec<u8>, chunk: &[u8], content_type: ContentType, version: ProtocolVersion) {
    out.push(content_type as u8);
    out.extend_from_slice(&version.0.to_be_bytes());
    out.extend_from_slice(&(chunk.len() as u16).to_be_bytes());
    out.extend_from_slice(chunk);
}

/// Frames `payload` into records, appending them to `out`.
///
/// An empty payload produces a single empty record.
pub fn add_record_layer_into(out: &mut Vec<u8>, payload: &[u8], content_type: ContentType, version: ProtocolVersion) {
    out.reserve(framed_len(payload.len()));

    if payload.is_empty() {
        push_record(out, payload, content_type, version);
        return;
    }

    for chunk in payload.chunks(MAX_RECORD_PAYLOAD) {
        push_record(out, chunk, content_type, version);
    }
}

/// Frames `payload` into a newly allocated buffer of records.
pub fn add_record_layer(payload: &[u8], content_type: ContentType, version: ProtocolVersion) -> Vec<u8> {
    let mut out = Vec::with_capacity(framed_len(payload.len()));
    add_record_layer_into(&mut out, payload, content_type, version);
    out
}

/// Strips the headers off one or more complete, concatenated records, returning their payloads
/// joined in order. Fails with [`ErrorKind::InvalidData`] if the buffer ends mid-record.
#[cfg(test)]
pub fn peel_record_layer(mut bytes: &[u8]) -> io::Result<Vec<u8>> {
    let mut payload = Vec::with_capacity(bytes.len());

    while !bytes.is_empty() {
        let header = match bytes.first_chunk::<RECORD_HEADER_LEN>() {
            Some(header) => RecordHeader::parse(header),
            None => return Err(Error::new(ErrorKind::InvalidData, "Buffer ends inside a record header")),
        };

        let end = RECORD_HEADER_LEN + header.length as usize;
        if bytes.len() < end {
            return Err(Error::new(ErrorKind::InvalidData, "Buffer ends inside a record payload"));
        }

        payload.extend_from_slice(&bytes[RECORD_HEADER_LEN..end]);
        bytes = &bytes[end..];
    }

    Ok(payload)
}

/// Reads exactly one record from `reader` into `buf`, draining the stream for as many reads as it
/// takes, and returns the record's payload (a subslice of `buf`).
///
/// Fails with [`ErrorKind::UnexpectedEof`] if the stream closes before the record is complete,
/// and with [`ErrorKind::InvalidData`] if the record does not fit in `buf`.
pub async fn read_record<'a, R>(reader: &mut R, buf: &'a mut [u8]) -> io::Result<&'a [u8]>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut header_bytes = [0u8; RECORD_HEADER_LEN];
    reader.read_exact(&mut header_bytes).await?;
    let header = RecordHeader::parse(&header_bytes);

    let length = header.length as usize;
    if length > buf.len() {
        let msg = format!(
            "Record of type {:#04x}, version {:#06x} and {length} bytes does not fit in a buffer of {} bytes",
            header.content_type,
            header.version,
            buf.len()
        );
        return Err(Error::new(ErrorKind::InvalidData, msg));
    }

    reader.read_exact(&mut buf[..length]).await?;
    Ok(&buf[..length])
}
