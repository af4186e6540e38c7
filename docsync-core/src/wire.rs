//! Binary wire codec (§6).
//!
//! Each protocol message is a self-contained binary frame: a one-byte type
//! discriminant followed by a `postcard`-encoded payload. A `batch` frame
//! is a discriminant followed by a length-prefixed vector of inner frames.
//! These codes are not exchanged with outside systems — they are a stable
//! internal contract for tests and this encoder; fragmentation/reassembly
//! for transports with message-size limits is the transport's concern.

use crate::protocol::{
    BatchMsg, DeleteRequest, DeleteResponse, DirectoryResponse, EphemeralMsg, EstablishRequest,
    EstablishResponse, NewDoc, ProtocolMsg, SyncRequest, SyncResponse, UpdateMsg,
};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("frame truncated")]
    Truncated,
    #[error("unknown discriminant: {0:#04x}")]
    UnknownDiscriminant(u8),
    #[error("decode error: {0}")]
    Decode(String),
}

const ESTABLISH_REQUEST: u8 = 0x10;
const ESTABLISH_RESPONSE: u8 = 0x11;
const BATCH: u8 = 0x1F;
const DIRECTORY_REQUEST: u8 = 0x20;
const DIRECTORY_RESPONSE: u8 = 0x21;
const NEW_DOC: u8 = 0x22;
const SYNC_REQUEST: u8 = 0x30;
const SYNC_RESPONSE: u8 = 0x31;
const UPDATE: u8 = 0x32;
const DELETE_REQUEST: u8 = 0x38;
const DELETE_RESPONSE: u8 = 0x39;
const EPHEMERAL: u8 = 0x40;

fn encode_payload<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, WireError> {
    postcard::to_allocvec(value).map_err(|e| WireError::Decode(e.to_string()))
}

fn decode_payload<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, WireError> {
    postcard::from_bytes(bytes).map_err(|e| WireError::Decode(e.to_string()))
}

/// Encodes one message (recursively, for `batch`) into a self-contained frame.
pub fn encode_frame(msg: &ProtocolMsg) -> Result<Vec<u8>, WireError> {
    let mut out = Vec::new();
    match msg {
        ProtocolMsg::EstablishRequest(m) => {
            out.push(ESTABLISH_REQUEST);
            out.extend(encode_payload(m)?);
        }
        ProtocolMsg::EstablishResponse(m) => {
            out.push(ESTABLISH_RESPONSE);
            out.extend(encode_payload(m)?);
        }
        ProtocolMsg::Batch(BatchMsg { messages }) => {
            out.push(BATCH);
            out.extend((messages.len() as u32).to_le_bytes());
            for inner in messages {
                let frame = encode_frame(inner)?;
                out.extend((frame.len() as u32).to_le_bytes());
                out.extend(frame);
            }
        }
        ProtocolMsg::DirectoryRequest => {
            out.push(DIRECTORY_REQUEST);
        }
        ProtocolMsg::DirectoryResponse(m) => {
            out.push(DIRECTORY_RESPONSE);
            out.extend(encode_payload(m)?);
        }
        ProtocolMsg::NewDoc(m) => {
            out.push(NEW_DOC);
            out.extend(encode_payload(m)?);
        }
        ProtocolMsg::SyncRequest(m) => {
            out.push(SYNC_REQUEST);
            out.extend(encode_payload(m)?);
        }
        ProtocolMsg::SyncResponse(m) => {
            out.push(SYNC_RESPONSE);
            out.extend(encode_payload(m)?);
        }
        ProtocolMsg::Update(m) => {
            out.push(UPDATE);
            out.extend(encode_payload(m)?);
        }
        ProtocolMsg::DeleteRequest(m) => {
            out.push(DELETE_REQUEST);
            out.extend(encode_payload(m)?);
        }
        ProtocolMsg::DeleteResponse(m) => {
            out.push(DELETE_RESPONSE);
            out.extend(encode_payload(m)?);
        }
        ProtocolMsg::Ephemeral(m) => {
            out.push(EPHEMERAL);
            out.extend(encode_payload(m)?);
        }
    }
    Ok(out)
}

/// Decodes one frame produced by [`encode_frame`].
pub fn decode_frame(bytes: &[u8]) -> Result<ProtocolMsg, WireError> {
    let (&discriminant, rest) = bytes.split_first().ok_or(WireError::Truncated)?;
    Ok(match discriminant {
        ESTABLISH_REQUEST => ProtocolMsg::EstablishRequest(decode_payload::<EstablishRequest>(rest)?),
        ESTABLISH_RESPONSE => {
            ProtocolMsg::EstablishResponse(decode_payload::<EstablishResponse>(rest)?)
        }
        BATCH => {
            if rest.len() < 4 {
                return Err(WireError::Truncated);
            }
            let count = u32::from_le_bytes(rest[0..4].try_into().unwrap()) as usize;
            let mut cursor = &rest[4..];
            let mut messages = Vec::with_capacity(count);
            for _ in 0..count {
                if cursor.len() < 4 {
                    return Err(WireError::Truncated);
                }
                let len = u32::from_le_bytes(cursor[0..4].try_into().unwrap()) as usize;
                cursor = &cursor[4..];
                if cursor.len() < len {
                    return Err(WireError::Truncated);
                }
                messages.push(decode_frame(&cursor[..len])?);
                cursor = &cursor[len..];
            }
            ProtocolMsg::Batch(BatchMsg { messages })
        }
        DIRECTORY_REQUEST => ProtocolMsg::DirectoryRequest,
        DIRECTORY_RESPONSE => {
            ProtocolMsg::DirectoryResponse(decode_payload::<DirectoryResponse>(rest)?)
        }
        NEW_DOC => ProtocolMsg::NewDoc(decode_payload::<NewDoc>(rest)?),
        SYNC_REQUEST => ProtocolMsg::SyncRequest(decode_payload::<SyncRequest>(rest)?),
        SYNC_RESPONSE => ProtocolMsg::SyncResponse(decode_payload::<SyncResponse>(rest)?),
        UPDATE => ProtocolMsg::Update(decode_payload::<UpdateMsg>(rest)?),
        DELETE_REQUEST => ProtocolMsg::DeleteRequest(decode_payload::<DeleteRequest>(rest)?),
        DELETE_RESPONSE => ProtocolMsg::DeleteResponse(decode_payload::<DeleteResponse>(rest)?),
        EPHEMERAL => ProtocolMsg::Ephemeral(decode_payload::<EphemeralMsg>(rest)?),
        other => return Err(WireError::UnknownDiscriminant(other)),
    })
}
