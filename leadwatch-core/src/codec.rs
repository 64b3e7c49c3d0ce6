//! Leader record encoding.
//!
//! The record stored at the retrieval path is
//! `[u32 big-endian address length][UTF-8 address][16-byte session id]`.
//! An absent node or a node without data means no leader is published and
//! never reaches the decoder.

use crate::{DecodeError, LeaderInformation};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use uuid::Uuid;

const LENGTH_PREFIX: usize = 4;
const SESSION_ID_LEN: usize = 16;

/// Trait for leader record codecs
pub trait LeaderRecordCodec: Send + Sync {
    /// Encode leader information into the bytes stored at the retrieval path
    fn encode(&self, info: &LeaderInformation) -> Bytes;

    /// Decode the non-empty bytes stored at the retrieval path
    fn decode(&self, data: &[u8]) -> Result<LeaderInformation, DecodeError>;
}

/// The length-prefixed binary record format.
#[derive(Debug, Default, Clone, Copy)]
pub struct LengthPrefixedCodec;

impl LeaderRecordCodec for LengthPrefixedCodec {
    fn encode(&self, info: &LeaderInformation) -> Bytes {
        match info {
            LeaderInformation::Known {
                session_id,
                address,
            } => {
                let mut buf =
                    BytesMut::with_capacity(LENGTH_PREFIX + address.len() + SESSION_ID_LEN);
                buf.put_u32(address.len() as u32);
                buf.put_slice(address.as_bytes());
                buf.put_slice(session_id.as_bytes());
                buf.freeze()
            }
            LeaderInformation::Empty => Bytes::new(),
        }
    }

    fn decode(&self, data: &[u8]) -> Result<LeaderInformation, DecodeError> {
        let mut buf = data;

        if buf.remaining() < LENGTH_PREFIX {
            return Err(DecodeError::TruncatedHeader { len: data.len() });
        }
        let declared = buf.get_u32() as usize;

        if declared > buf.remaining() {
            return Err(DecodeError::TruncatedAddress {
                declared,
                remaining: buf.remaining(),
            });
        }
        let address = std::str::from_utf8(&buf[..declared])
            .map_err(|e| DecodeError::InvalidAddress {
                reason: e.to_string(),
            })?
            .to_owned();
        buf.advance(declared);

        if buf.remaining() < SESSION_ID_LEN {
            return Err(DecodeError::TruncatedSessionId {
                remaining: buf.remaining(),
            });
        }
        let mut session = [0u8; SESSION_ID_LEN];
        buf.copy_to_slice(&mut session);

        if buf.has_remaining() {
            return Err(DecodeError::TrailingBytes {
                extra: buf.remaining(),
            });
        }

        Ok(LeaderInformation::known(Uuid::from_bytes(session), address))
    }
}

/// Turn the result of a data read into leader information.
///
/// `None` (no node) and empty data both mean no leader and bypass `codec`.
pub fn decode_record(
    codec: &dyn LeaderRecordCodec,
    data: Option<&[u8]>,
) -> Result<LeaderInformation, DecodeError> {
    match data {
        Some(bytes) if !bytes.is_empty() => codec.decode(bytes),
        _ => Ok(LeaderInformation::Empty),
    }
}
