//! Checksum Builder (spec §4.2): the 0x8003 Authenticator checksum blob.
//! Not a keyed hash itself - a structured blob carrying an MD5 of the
//! channel bindings, the capability flag word, and two optional
//! trailers (delegation, extra MIC).

use md5::{Digest, Md5};
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::collab::{ChannelBindings, ChannelBindingsCodec, ChecksumType, KerberosCrypto, Key, KeyUsage};
use crate::flags::ContextFlags;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChecksumError {
    #[error("0x8003 checksum blob truncated")]
    Truncated,
    #[error("0x8003 checksum blob has a malformed bindings-hash length field")]
    BadBindingsLength,
    #[error("trailing garbage after the 0x8003 checksum blob")]
    TrailingGarbage,
    #[error("acceptor rejected the checksum: bindings hash and flags did not satisfy any accepted case")]
    Rejected,
    #[error("acceptor rejected the extra MIC trailer: mismatch")]
    ExtraMicMismatch,
}

/// A decoded 0x8003 checksum blob (spec §4.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gssapi8003Checksum {
    pub bindings_hash: [u8; 16],
    pub flags: ContextFlags,
    /// Delegated KRB-CRED bytes, parsed-past but never acted upon (spec
    /// §1 Non-goals: "delegation credential consumption").
    pub delegation: Option<Vec<u8>>,
    pub extra_mic: Option<Vec<u8>>,
}

const DELEGATION_TAG: u16 = 1;

impl Gssapi8003Checksum {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(24);
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&self.bindings_hash);
        out.extend_from_slice(&self.flags.to_word().to_le_bytes());
        if let Some(deleg) = &self.delegation {
            out.extend_from_slice(&DELEGATION_TAG.to_le_bytes());
            out.extend_from_slice(&(deleg.len() as u16).to_le_bytes());
            out.extend_from_slice(deleg);
        }
        if let Some(mic) = &self.extra_mic {
            out.extend_from_slice(&0u32.to_be_bytes());
            out.extend_from_slice(&(mic.len() as u32).to_be_bytes());
            out.extend_from_slice(mic);
        }
        out
    }

    pub fn decode(buf: &[u8]) -> Result<Self, ChecksumError> {
        if buf.len() < 24 {
            return Err(ChecksumError::Truncated);
        }
        let len = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        if len != 16 {
            return Err(ChecksumError::BadBindingsLength);
        }
        let bindings_hash: [u8; 16] = buf[4..20].try_into().unwrap();
        let flags = ContextFlags::from_word(u32::from_le_bytes(buf[20..24].try_into().unwrap()));
        let mut rest = &buf[24..];

        let mut delegation = None;
        if rest.len() >= 4 {
            let tag = u16::from_le_bytes(rest[0..2].try_into().unwrap());
            if tag == DELEGATION_TAG {
                let dlen = u16::from_le_bytes(rest[2..4].try_into().unwrap()) as usize;
                let body = rest.get(4..4 + dlen).ok_or(ChecksumError::Truncated)?;
                delegation = Some(body.to_vec());
                rest = &rest[4 + dlen..];
            }
        }

        let mut extra_mic = None;
        if !rest.is_empty() {
            if rest.len() < 8 {
                return Err(ChecksumError::Truncated);
            }
            let zero = u32::from_be_bytes(rest[0..4].try_into().unwrap());
            let mlen = u32::from_be_bytes(rest[4..8].try_into().unwrap()) as usize;
            if zero != 0 {
                return Err(ChecksumError::TrailingGarbage);
            }
            let body = rest.get(8..8 + mlen).ok_or(ChecksumError::Truncated)?;
            extra_mic = Some(body.to_vec());
            rest = &rest[8 + mlen..];
        }

        if !rest.is_empty() {
            return Err(ChecksumError::TrailingGarbage);
        }

        Ok(Gssapi8003Checksum {
            bindings_hash,
            flags,
            delegation,
            extra_mic,
        })
    }
}

fn md5_of(bindings_encoded: &[u8]) -> [u8; 16] {
    let mut h = Md5::new();
    h.update(bindings_encoded);
    h.finalize().into()
}

/// Build the initiator-side 0x8003 checksum (spec §4.2). `delegation` is
/// the caller's already-encoded KRB-CRED, included only when the
/// `delegate` flag is set.
pub fn build(
    crypto: &dyn KerberosCrypto,
    bindings_codec: &dyn ChannelBindingsCodec,
    bindings: &ChannelBindings,
    flags: ContextFlags,
    ticket_key: &Key,
    delegation: Option<Vec<u8>>,
) -> Result<Gssapi8003Checksum, ChecksumError> {
    let bindings_hash = md5_of(&bindings_codec.encode(bindings));

    let mut checksum = Gssapi8003Checksum {
        bindings_hash,
        flags,
        delegation: if flags.delegate { delegation } else { None },
        extra_mic: None,
    };

    let cksumtype = crypto.default_checksum_type(ticket_key.enctype);
    if cksumtype.is_keyed() {
        let encoded_bindings = bindings_codec.encode(bindings);
        let mic = crypto
            .checksum(ticket_key, KeyUsage::GssInitiatorSign, &encoded_bindings)
            .map_err(|_| ChecksumError::Rejected)?;
        checksum.extra_mic = Some(mic);
    }

    Ok(checksum)
}

/// Acceptor-side validation outcome: none of the three cases means the
/// checksum is rejected outright.
pub fn validate(
    crypto: &dyn KerberosCrypto,
    bindings_codec: &dyn ChannelBindingsCodec,
    local_bindings: &ChannelBindings,
    required_flags: ContextFlags,
    ticket_key: &Key,
    decoded: &Gssapi8003Checksum,
) -> Result<(), ChecksumError> {
    if !decoded.flags.contains_all(required_flags) {
        return Err(ChecksumError::Rejected);
    }

    let encoded_bindings = bindings_codec.encode(local_bindings);
    let local_hash = md5_of(&encoded_bindings);

    let case1 = decoded.bindings_hash.ct_eq(&local_hash).into();
    let case2 = decoded.bindings_hash == [0u8; 16] && local_bindings.is_empty();
    // Legacy Microsoft compatibility (spec §4.2 case 3): all-0xFF hash
    // plus a non-empty trailer (delegation or extra MIC).
    let case3 = decoded.bindings_hash == [0xffu8; 16]
        && (decoded.delegation.is_some() || decoded.extra_mic.is_some());

    if !(case1 || case2 || case3) {
        return Err(ChecksumError::Rejected);
    }

    if let Some(mic) = &decoded.extra_mic {
        let expected = crypto
            .checksum(ticket_key, KeyUsage::GssInitiatorSign, &encoded_bindings)
            .map_err(|_| ChecksumError::ExtraMicMismatch)?;
        if expected.ct_eq(mic).unwrap_u8() != 1 {
            return Err(ChecksumError::ExtraMicMismatch);
        }
    }

    Ok(())
}
