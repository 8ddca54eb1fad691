//! MIC token records (spec §4.1): the v1 (RFC 1964) and v2 (RFC 4121)
//! wire layouts. Construction/verification of the checksum bytes lives
//! in [`crate::protect`]; this module only frames bytes.

use super::{SigAlg, TokenError};
use crate::flags::TokenFlags;

const TAG_MIC_V1: [u8; 2] = [0x01, 0x01];
const TAG_MIC_V2: [u8; 2] = [0x04, 0x04];

/// RFC 1964 MIC token (spec §4.1 tag `01 01`). Per spec §4.1, v1
/// per-message tokens ARE wrapped in the initial-context-token envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MicV1 {
    pub sig_alg: SigAlg,
    /// Encrypted `(seq_number, direction)` pair (spec §4.3 v1 MIC).
    pub seq_enc: [u8; 8],
    pub checksum: Vec<u8>,
}

impl MicV1 {
    /// The first 8 bytes of the encoded token with an empty checksum
    /// field (spec §4.3: "Construct token prefix (first 8 bytes of
    /// encoded MIC-v1 with empty fields)") - i.e. tag + sig_alg +
    /// filler, which is exactly 8 bytes regardless of checksum length.
    pub fn prefix(sig_alg: SigAlg) -> [u8; 8] {
        let mut p = [0u8; 8];
        p[0..2].copy_from_slice(&TAG_MIC_V1);
        p[2..4].copy_from_slice(&sig_alg.value().to_be_bytes());
        p[4..8].copy_from_slice(&[0xff, 0xff, 0xff, 0xff]);
        p
    }

    pub fn encode_payload(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(16 + self.checksum.len());
        out.extend_from_slice(&Self::prefix(self.sig_alg));
        out.extend_from_slice(&self.seq_enc);
        out.extend_from_slice(&self.checksum);
        out
    }

    pub fn encode(&self) -> Vec<u8> {
        super::wrap_initial(&self.encode_payload())
    }

    pub fn decode_payload(buf: &[u8]) -> Result<Self, TokenError> {
        if buf.len() < 16 {
            return Err(TokenError::Truncated);
        }
        let tag: [u8; 2] = buf[0..2].try_into().unwrap();
        if tag != TAG_MIC_V1 {
            return Err(TokenError::UnknownTag(tag));
        }
        let sig_alg = SigAlg::from_value(u16::from_be_bytes(buf[2..4].try_into().unwrap()))?;
        // buf[4..8] is the FF FF FF FF filler, ignored on decode.
        let seq_enc: [u8; 8] = buf[8..16].try_into().unwrap();
        let checksum = buf[16..].to_vec();
        Ok(MicV1 {
            sig_alg,
            seq_enc,
            checksum,
        })
    }

    pub fn decode(buf: &[u8]) -> Result<Self, TokenError> {
        Self::decode_payload(super::unwrap_initial(buf)?)
    }
}

/// RFC 4121 MIC token (spec §4.1 tag `04 04`). v2 per-message tokens are
/// NOT wrapped in the initial-context-token envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MicV2 {
    pub flags: TokenFlags,
    pub seq: u64,
    pub checksum: Vec<u8>,
}

impl MicV2 {
    /// The 16-byte fixed header with the checksum field conceptually
    /// empty (spec §4.3 v2 MIC: "Build the MIC-v2 header with
    /// checksum = empty").
    pub fn header(flags: TokenFlags, seq: u64) -> [u8; 16] {
        let mut h = [0u8; 16];
        h[0..2].copy_from_slice(&TAG_MIC_V2);
        h[2] = flags.to_byte();
        h[3..8].copy_from_slice(&[0xff; 5]);
        h[8..16].copy_from_slice(&seq.to_be_bytes());
        h
    }

    pub fn encode_payload(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(16 + self.checksum.len());
        out.extend_from_slice(&Self::header(self.flags, self.seq));
        out.extend_from_slice(&self.checksum);
        out
    }

    /// v2 tokens have no outer envelope (spec §4.1).
    pub fn encode(&self) -> Vec<u8> {
        self.encode_payload()
    }

    pub fn decode(buf: &[u8]) -> Result<Self, TokenError> {
        if buf.len() < 16 {
            return Err(TokenError::Truncated);
        }
        let tag: [u8; 2] = buf[0..2].try_into().unwrap();
        if tag != TAG_MIC_V2 {
            return Err(TokenError::UnknownTag(tag));
        }
        let flags = TokenFlags::from_byte(buf[2]);
        // buf[3..8] is the FF FF FF FF FF filler, ignored on decode.
        let seq = u64::from_be_bytes(buf[8..16].try_into().unwrap());
        let checksum = buf[16..].to_vec();
        Ok(MicV2 {
            flags,
            seq,
            checksum,
        })
    }
}
