//! Per-Message Protection (spec §4.3): MIC/Wrap construction and
//! verification for v1 (3DES, RFC 1964) and v2 (modern enctypes, RFC
//! 4121), including sequence-number tracking, replay/gap detection,
//! padding and byte rotation.

pub mod v1;
pub mod v2;

use thiserror::Error;

use crate::collab::KeyUsage;

/// Which side of the context sent (or, for verification, is being
/// checked against) a given message (spec §4.3 "Key-usage selection").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Initiator,
    Acceptor,
}

impl Role {
    pub fn opposite(self) -> Role {
        match self {
            Role::Initiator => Role::Acceptor,
            Role::Acceptor => Role::Initiator,
        }
    }

    /// `gss_<role>_sign` (spec §4.3 v2 MIC/Wrap usage selection).
    pub fn sign_usage(self) -> KeyUsage {
        match self {
            Role::Initiator => KeyUsage::GssInitiatorSign,
            Role::Acceptor => KeyUsage::GssAcceptorSign,
        }
    }

    /// `gss_<role>_seal`.
    pub fn seal_usage(self) -> KeyUsage {
        match self {
            Role::Initiator => KeyUsage::GssInitiatorSeal,
            Role::Acceptor => KeyUsage::GssAcceptorSeal,
        }
    }
}

/// Per-message recoverable errors (spec §7): the context is unchanged
/// and the caller may continue using it.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtError {
    #[error("duplicate token: sequence number already seen")]
    DuplicateToken,
    #[error("gap token: sequence number skipped ahead of expectation")]
    GapToken,
    #[error("unseq token: wrong direction for a v1 token")]
    UnseqTokenBadDirection,
    #[error("defective token: {0}")]
    DefectiveToken(String),
}

/// Sequence / replay semantics shared by MIC and Wrap, v1 and v2 (spec
/// §4.3 "Sequence / replay semantics", §8 properties 5-7).
///
/// Only mutates `rseq` on acceptance; duplicate/gap leave it untouched.
pub fn check_sequence(token_seq: u64, rseq: &mut u64) -> Result<(), ProtError> {
    if token_seq == *rseq {
        *rseq += 1;
        Ok(())
    } else if token_seq < *rseq {
        Err(ProtError::DuplicateToken)
    } else {
        Err(ProtError::GapToken)
    }
}

/// Rotate `data` right by `n` bytes (the last `n` bytes move to the
/// front). This is the transform RFC 4121's RRC applies to a Wrap
/// token's ciphertext before transmission (spec §8 S1).
pub fn rotate_right(data: &[u8], n: usize) -> Vec<u8> {
    if data.is_empty() {
        return Vec::new();
    }
    let n = n % data.len();
    let split = data.len() - n;
    let mut out = Vec::with_capacity(data.len());
    out.extend_from_slice(&data[split..]);
    out.extend_from_slice(&data[..split]);
    out
}

/// Inverse of [`rotate_right`]: rotate `data` left by `n` bytes.
pub fn rotate_left(data: &[u8], n: usize) -> Vec<u8> {
    if data.is_empty() {
        return Vec::new();
    }
    let n = n % data.len();
    let mut out = Vec::with_capacity(data.len());
    out.extend_from_slice(&data[n..]);
    out.extend_from_slice(&data[..n]);
    out
}

/// RFC 1964-style PKCS#5-ish DES padding (spec §8 S2): pad byte value
/// equals the pad length, and a message already block-aligned still
/// gets a full 8-byte block of padding.
pub fn des_pad(message: &[u8]) -> Vec<u8> {
    let pad_len = 8 - (message.len() % 8);
    let mut out = Vec::with_capacity(message.len() + pad_len);
    out.extend_from_slice(message);
    out.extend(std::iter::repeat(pad_len as u8).take(pad_len));
    out
}

/// Inverse of [`des_pad`]; rejects malformed padding.
pub fn des_unpad(data: &[u8]) -> Result<Vec<u8>, ProtError> {
    let pad_len = *data
        .last()
        .ok_or_else(|| ProtError::DefectiveToken("empty padded buffer".into()))? as usize;
    if pad_len == 0 || pad_len > 8 || pad_len > data.len() {
        return Err(ProtError::DefectiveToken("invalid DES padding length".into()));
    }
    if !data[data.len() - pad_len..].iter().all(|&b| b as usize == pad_len) {
        return Err(ProtError::DefectiveToken("invalid DES padding bytes".into()));
    }
    Ok(data[..data.len() - pad_len].to_vec())
}

/// v2 Wrap's zero-byte padding (spec §4.3 v2 Wrap): for DES-family
/// enctypes, pad with zero bytes up to the next 8-byte boundary (zero
/// pad length if already aligned); for modern enctypes, no padding.
pub fn v2_wrap_padding_len(message_len: usize, is_des_family: bool) -> usize {
    if !is_des_family {
        return 0;
    }
    (8 - (message_len % 8)) % 8
}
