//! Wrap token records (spec §4.1): the v1 (RFC 1964) and v2 (RFC 4121)
//! wire layouts. Encryption/decryption of `ciphertext`/`edata` lives in
//! [`crate::protect`]; this module only frames bytes.

use super::{SealAlg, SigAlg, TokenError};
use crate::flags::TokenFlags;

const TAG_WRAP_V1: [u8; 2] = [0x02, 0x01];
const TAG_WRAP_V2: [u8; 2] = [0x05, 0x04];

/// RFC 1964 Wrap token (spec §4.1 tag `02 01`). Wrapped in the
/// initial-context-token envelope like all v1 per-message tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapV1 {
    pub sig_alg: SigAlg,
    pub seal_alg: SealAlg,
    pub seq_enc: [u8; 8],
    pub checksum: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

impl WrapV1 {
    /// First 8 bytes of the encoded token with empty trailing fields
    /// (spec §4.3 v1 Wrap uses the same `prefix(8)` construction as v1
    /// MIC for the checksum's `ToMAC`).
    pub fn prefix(sig_alg: SigAlg, seal_alg: SealAlg) -> [u8; 8] {
        let mut p = [0u8; 8];
        p[0..2].copy_from_slice(&TAG_WRAP_V1);
        p[2..4].copy_from_slice(&sig_alg.value().to_be_bytes());
        p[4..6].copy_from_slice(&seal_alg.value().to_be_bytes());
        p[6..8].copy_from_slice(&[0xff, 0xff]);
        p
    }

    pub fn encode_payload(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(16 + self.checksum.len() + self.ciphertext.len());
        out.extend_from_slice(&Self::prefix(self.sig_alg, self.seal_alg));
        out.extend_from_slice(&self.seq_enc);
        out.extend_from_slice(&self.checksum);
        out.extend_from_slice(&self.ciphertext);
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
        if tag != TAG_WRAP_V1 {
            return Err(TokenError::UnknownTag(tag));
        }
        let sig_alg = SigAlg::from_value(u16::from_be_bytes(buf[2..4].try_into().unwrap()))?;
        let seal_alg = SealAlg::from_value(u16::from_be_bytes(buf[4..6].try_into().unwrap()))?;
        // buf[6..8] is the FF FF filler, ignored on decode.
        let seq_enc: [u8; 8] = buf[8..16].try_into().unwrap();
        let cksum_len = sig_alg.checksum_len();
        let rest = &buf[16..];
        if rest.len() < cksum_len {
            return Err(TokenError::Truncated);
        }
        let checksum = rest[..cksum_len].to_vec();
        let ciphertext = rest[cksum_len..].to_vec();
        Ok(WrapV1 {
            sig_alg,
            seal_alg,
            seq_enc,
            checksum,
            ciphertext,
        })
    }

    pub fn decode(buf: &[u8]) -> Result<Self, TokenError> {
        Self::decode_payload(super::unwrap_initial(buf)?)
    }
}

/// RFC 4121 Wrap token (spec §4.1 tag `05 04`). No outer envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapV2 {
    pub flags: TokenFlags,
    /// Extra Count: padding length appended before encryption (spec
    /// §4.3, glossary "EC").
    pub ec: u16,
    /// Right Rotation Count applied to the ciphertext before
    /// transmission (spec §4.3, glossary "RRC").
    pub rrc: u16,
    pub seq: u64,
    pub edata: Vec<u8>,
}

impl WrapV2 {
    /// The 16-byte fixed header, with `rrc` as given (callers needing the
    /// "header with RRC cleared" reconstruction per spec §4.3 pass `rrc:
    /// 0`).
    pub fn header(flags: TokenFlags, ec: u16, rrc: u16, seq: u64) -> [u8; 16] {
        let mut h = [0u8; 16];
        h[0..2].copy_from_slice(&TAG_WRAP_V2);
        h[2] = flags.to_byte();
        h[3] = 0xff;
        h[4..6].copy_from_slice(&ec.to_be_bytes());
        h[6..8].copy_from_slice(&rrc.to_be_bytes());
        h[8..16].copy_from_slice(&seq.to_be_bytes());
        h
    }

    pub fn encode_payload(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(16 + self.edata.len());
        out.extend_from_slice(&Self::header(self.flags, self.ec, self.rrc, self.seq));
        out.extend_from_slice(&self.edata);
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
        if tag != TAG_WRAP_V2 {
            return Err(TokenError::UnknownTag(tag));
        }
        let flags = TokenFlags::from_byte(buf[2]);
        // buf[3] is the FF filler, ignored on decode.
        let ec = u16::from_be_bytes(buf[4..6].try_into().unwrap());
        let rrc = u16::from_be_bytes(buf[6..8].try_into().unwrap());
        let seq = u64::from_be_bytes(buf[8..16].try_into().unwrap());
        let edata = buf[16..].to_vec();
        Ok(WrapV2 {
            flags,
            ec,
            rrc,
            seq,
            edata,
        })
    }
}
