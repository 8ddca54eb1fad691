//! Token Codec (spec §4.1): bit-exact serialize/parse of every
//! GSS-Kerberos token envelope and the inner v1/v2 MIC/Wrap records.
//!
//! This module is total and pure - no crypto occurs here (spec §4.1
//! "the codec is total and pure"). It owns two layers:
//!
//! - the outer GSS-API "initial context token" wrapper (RFC 2743 §3.1:
//!   `[APPLICATION 0] SEQUENCE { mechOID, innerToken }`), used around
//!   the setup PDUs (AP-REQ/AP-REP/KRB-ERROR) and around v1 MIC/Wrap;
//!   this is NOT the SPNEGO negotiation wrapper (that is out of scope
//!   per spec §1) - just the single fixed-mechanism DER framing a lone
//!   Kerberos GSS mechanism always carries.
//! - the mechanism-specific payload tag table (spec §4.1), shared by
//!   [`mic`] and [`wrap`] for the per-message records.

pub mod mic;
pub mod wrap;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token too short to contain a valid header")]
    Truncated,
    #[error("unrecognized token tag: {0:02x?}")]
    UnknownTag([u8; 2]),
    #[error("trailing garbage after a well-formed token")]
    TrailingGarbage,
    #[error("unrecognized outer mechanism OID")]
    UnknownMech,
    #[error("malformed DER length or tag in the outer token wrapper")]
    BadDer,
    #[error("unrecognized signature algorithm: {0:#06x}")]
    UnknownSigAlg(u16),
    #[error("unrecognized seal algorithm: {0:#06x}")]
    UnknownSealAlg(u16),
}

/// DER encoding of `id-mech-krb5` (1.2.840.113554.1.2.2), the only
/// mechanism OID this crate ever wraps or recognizes on unwrap (spec
/// §4.1, §4.4 step 1).
pub const ID_MECH_KRB5_DER: &[u8] = &[
    0x06, 0x09, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x12, 0x01, 0x02, 0x02,
];

fn der_encode_length(len: usize, out: &mut Vec<u8>) {
    if len < 0x80 {
        out.push(len as u8);
        return;
    }
    let bytes = len.to_be_bytes();
    let significant = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len() - 1);
    let significant_bytes = &bytes[significant..];
    out.push(0x80 | significant_bytes.len() as u8);
    out.extend_from_slice(significant_bytes);
}

/// Returns `(length, bytes_consumed)`.
fn der_decode_length(buf: &[u8]) -> Result<(usize, usize), TokenError> {
    let first = *buf.first().ok_or(TokenError::Truncated)?;
    if first & 0x80 == 0 {
        return Ok((first as usize, 1));
    }
    let nbytes = (first & 0x7f) as usize;
    if nbytes == 0 || nbytes > 8 {
        return Err(TokenError::BadDer);
    }
    let body = buf.get(1..1 + nbytes).ok_or(TokenError::Truncated)?;
    let mut padded = [0u8; 8];
    padded[8 - nbytes..].copy_from_slice(body);
    Ok((u64::from_be_bytes(padded) as usize, 1 + nbytes))
}

/// Wrap `inner` (a mechanism-specific payload) in the RFC 2743 §3.1
/// initial-context-token envelope with `id-mech-krb5`.
pub fn wrap_initial(inner: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(ID_MECH_KRB5_DER.len() + inner.len());
    body.extend_from_slice(ID_MECH_KRB5_DER);
    body.extend_from_slice(inner);

    let mut out = Vec::with_capacity(body.len() + 6);
    out.push(0x60);
    der_encode_length(body.len(), &mut out);
    out.extend_from_slice(&body);
    out
}

/// Unwrap the RFC 2743 §3.1 envelope, returning the inner mechanism
/// payload. Errors if the outer tag, length, or mechanism OID don't
/// match exactly, or if there is trailing garbage (spec §4.1).
pub fn unwrap_initial(buf: &[u8]) -> Result<&[u8], TokenError> {
    let (&tag, rest) = buf.split_first().ok_or(TokenError::Truncated)?;
    if tag != 0x60 {
        return Err(TokenError::BadDer);
    }
    let (len, consumed) = der_decode_length(rest)?;
    let body = rest.get(consumed..).ok_or(TokenError::Truncated)?;
    if body.len() != len {
        return Err(TokenError::TrailingGarbage);
    }
    let oid_len = ID_MECH_KRB5_DER.len();
    let oid = body.get(..oid_len).ok_or(TokenError::Truncated)?;
    if oid != ID_MECH_KRB5_DER {
        return Err(TokenError::UnknownMech);
    }
    Ok(&body[oid_len..])
}

/// The three raw Kerberos setup PDUs, tagged per spec §4.1's table.
/// ASN.1 encoding of the payload itself is the external
/// [`crate::collab::Asn1Codec`] collaborator's job; this variant only
/// carries the already-encoded DER bytes plus the 2-byte tag framing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupToken {
    ApReq(Vec<u8>),
    ApRep(Vec<u8>),
    KrbError(Vec<u8>),
}

const TAG_AP_REQ: [u8; 2] = [0x01, 0x00];
const TAG_AP_REP: [u8; 2] = [0x02, 0x00];
const TAG_KRB_ERROR: [u8; 2] = [0x03, 0x00];

impl SetupToken {
    fn tag(&self) -> [u8; 2] {
        match self {
            SetupToken::ApReq(_) => TAG_AP_REQ,
            SetupToken::ApRep(_) => TAG_AP_REP,
            SetupToken::KrbError(_) => TAG_KRB_ERROR,
        }
    }

    fn der(&self) -> &[u8] {
        match self {
            SetupToken::ApReq(d) | SetupToken::ApRep(d) | SetupToken::KrbError(d) => d,
        }
    }

    /// Encode the mechanism-specific payload (tag + DER body), without
    /// the outer envelope.
    pub fn encode_payload(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(2 + self.der().len());
        out.extend_from_slice(&self.tag());
        out.extend_from_slice(self.der());
        out
    }

    /// Encode wrapped in the initial-context-token envelope (spec §4.1:
    /// "Outer envelope for any setup token ... is produced by the
    /// external GSS initial-token wrapper").
    pub fn encode(&self) -> Vec<u8> {
        wrap_initial(&self.encode_payload())
    }

    /// Decode a mechanism-specific payload (no outer envelope).
    pub fn decode_payload(buf: &[u8]) -> Result<Self, TokenError> {
        let tag: [u8; 2] = buf.get(0..2).ok_or(TokenError::Truncated)?.try_into().unwrap();
        let der = buf[2..].to_vec();
        match tag {
            TAG_AP_REQ => Ok(SetupToken::ApReq(der)),
            TAG_AP_REP => Ok(SetupToken::ApRep(der)),
            TAG_KRB_ERROR => Ok(SetupToken::KrbError(der)),
            other => Err(TokenError::UnknownTag(other)),
        }
    }

    /// Decode from a fully wrapped initial token.
    pub fn decode(buf: &[u8]) -> Result<Self, TokenError> {
        Self::decode_payload(unwrap_initial(buf)?)
    }
}

/// RFC 1964 signature algorithm identifiers (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigAlg {
    DesMacMd5,
    Md25,
    DesMac,
    HmacMd5Rc4,
    HmacSha1Des3,
}

impl SigAlg {
    pub const fn value(self) -> u16 {
        match self {
            SigAlg::DesMacMd5 => 0x0000,
            SigAlg::Md25 => 0x0100,
            SigAlg::DesMac => 0x0200,
            SigAlg::HmacMd5Rc4 => 0x1100,
            SigAlg::HmacSha1Des3 => 0x0400,
        }
    }

    pub const fn from_value(v: u16) -> Result<Self, TokenError> {
        match v {
            0x0000 => Ok(SigAlg::DesMacMd5),
            0x0100 => Ok(SigAlg::Md25),
            0x0200 => Ok(SigAlg::DesMac),
            0x1100 => Ok(SigAlg::HmacMd5Rc4),
            0x0400 => Ok(SigAlg::HmacSha1Des3),
            other => Err(TokenError::UnknownSigAlg(other)),
        }
    }

    /// Checksum field length on the wire (spec §4.1: "8 B, or 20 B if
    /// sig-alg = hmac_sha1_des3").
    pub const fn checksum_len(self) -> usize {
        match self {
            SigAlg::HmacSha1Des3 => 20,
            _ => 8,
        }
    }
}

/// RFC 1964 seal algorithm identifiers (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SealAlg {
    None,
    Des,
    Rc4,
    Des3,
}

impl SealAlg {
    pub const fn value(self) -> u16 {
        match self {
            SealAlg::None => 0xFFFF,
            SealAlg::Des => 0x0000,
            SealAlg::Rc4 => 0x1000,
            SealAlg::Des3 => 0x0200,
        }
    }

    pub const fn from_value(v: u16) -> Result<Self, TokenError> {
        match v {
            0xFFFF => Ok(SealAlg::None),
            0x0000 => Ok(SealAlg::Des),
            0x1000 => Ok(SealAlg::Rc4),
            0x0200 => Ok(SealAlg::Des3),
            other => Err(TokenError::UnknownSealAlg(other)),
        }
    }
}
