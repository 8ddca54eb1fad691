//! Enumerations both the mechanism core and the external collaborators
//! (spec §6) need to name: enctypes, checksum types and key usages.
//!
//! None of these carry algorithm implementations - that lives entirely
//! on the [`super::KerberosCrypto`] side. This module is just the shared
//! vocabulary.

use std::fmt;

/// Kerberos encryption type identifiers (RFC 3961 §8, RFC 3962, RFC 8009).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Enctype {
    Des3CbcSha1,
    ArcFourHmac,
    Aes128CtsHmacSha196,
    Aes256CtsHmacSha196,
    Aes128CtsHmacSha256128,
    Aes256CtsHmacSha384192,
}

impl Enctype {
    /// RFC-assigned integer value, used on the wire inside `Ticket`/`Key`
    /// ASN.1 structures by the (external) ASN.1 codec.
    pub const fn etype_value(self) -> i32 {
        match self {
            Enctype::Des3CbcSha1 => 16,
            Enctype::ArcFourHmac => 23,
            Enctype::Aes128CtsHmacSha196 => 17,
            Enctype::Aes256CtsHmacSha196 => 18,
            Enctype::Aes128CtsHmacSha256128 => 19,
            Enctype::Aes256CtsHmacSha384192 => 20,
        }
    }

    /// Whether this enctype's per-message wrap padding scheme is the v1
    /// DES/3DES style (pad to the cipher block size) or the v2 modern
    /// style (no padding, `EC = 0`), per spec §4.3.
    pub const fn is_des_family(self) -> bool {
        matches!(self, Enctype::Des3CbcSha1)
    }
}

/// Checksum type identifiers (RFC 3961 §6, RFC 8009). Used by the
/// Checksum Builder (spec §4.2) to decide whether the ticket session
/// key's checksum is "keyed" and therefore requires the optional extra
/// MIC trailer in the 0x8003 blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ChecksumType {
    Crc32,
    RsaMd5,
    HmacSha1Des3Kd,
    HmacSha196Aes128,
    HmacSha196Aes256,
    HmacSha256128Aes128,
    HmacSha384192Aes256,
    HmacMd5Rc4,
}

impl ChecksumType {
    /// CRC-32 and plain RSA-MD5 are unkeyed; every other checksum type
    /// here is a keyed MAC. Spec §4.2: "The extra MIC is emitted only if
    /// the ticket session key's checksum type is keyed."
    pub const fn is_keyed(self) -> bool {
        !matches!(self, ChecksumType::Crc32 | ChecksumType::RsaMd5)
    }
}

/// Kerberos protocol key-usage numbers (RFC 4120 §7.5.1, RFC 4121 §4.2.4/
/// §4.2.6.1) relevant to the GSS mechanism core. Values match the RFC
/// assignments exactly so a real crypto collaborator can switch on them
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyUsage {
    /// Decrypt the `Ticket`'s `enc-part` with the service/keytab key.
    KdcRepTicket,
    /// Decrypt/encrypt the AP-REQ `Authenticator`.
    ApReqAuth,
    /// Decrypt/encrypt the AP-REP `EncAPRepPart`.
    ApRepEncPart,
    /// RFC 1964 sequence-number/checksum key derivation usage for
    /// 3DES MIC/Wrap (the "gss_des3_sign" usage spec §4.3 names). Numeric
    /// value 23, same as [`GssAcceptorSign`](Self::GssAcceptorSign) - the
    /// two collide by RFC assignment, which is why this can't be a `#[repr]`
    /// discriminant and is instead mapped explicitly in [`Self::value`].
    Rfc1964Sign,
    /// RFC 4121 `GSS_Wrap`/`GSS_GetMIC` usages; acceptor sealing.
    GssAcceptorSeal,
    /// RFC 4121 acceptor signing. Numeric value 23, colliding with
    /// [`Rfc1964Sign`](Self::Rfc1964Sign) (see its doc comment).
    GssAcceptorSign,
    /// RFC 4121 initiator sealing.
    GssInitiatorSeal,
    /// RFC 4121 initiator signing / `gss_new_checksum` (spec §4.2: the
    /// 0x8003 checksum blob's optional extra MIC uses this same usage
    /// number, 25).
    GssInitiatorSign,
}

impl KeyUsage {
    pub const fn value(self) -> u32 {
        match self {
            KeyUsage::KdcRepTicket => 2,
            KeyUsage::ApReqAuth => 11,
            KeyUsage::ApRepEncPart => 12,
            KeyUsage::GssAcceptorSeal => 22,
            KeyUsage::Rfc1964Sign | KeyUsage::GssAcceptorSign => 23,
            KeyUsage::GssInitiatorSeal => 24,
            KeyUsage::GssInitiatorSign => 25,
        }
    }
}

/// Kerberos principal name types (RFC 4120 §6.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameType {
    Principal = 1,
    Service = 2,
    Other(i32),
}

impl NameType {
    pub fn value(self) -> i32 {
        match self {
            NameType::Principal => 1,
            NameType::Service => 2,
            NameType::Other(v) => v,
        }
    }

    pub fn from_value(v: i32) -> Self {
        match v {
            1 => NameType::Principal,
            2 => NameType::Service,
            other => NameType::Other(other),
        }
    }
}

/// A Kerberos principal: a name type plus an ordered list of components
/// (spec §3, §4.5). The realm is carried alongside this, not inside it,
/// mirroring how `(realm, principal)` pairs are always passed together in
/// spec §4.5's Name Projection signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalName {
    pub name_type: NameType,
    pub components: Vec<String>,
}

impl PrincipalName {
    pub fn new(name_type: NameType, components: impl IntoIterator<Item = impl Into<String>>) -> Self {
        PrincipalName {
            name_type,
            components: components.into_iter().map(Into::into).collect(),
        }
    }
}

/// `(realm, principal)` pair, used throughout the context for `us`/`them`
/// (spec §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub realm: String,
    pub name: PrincipalName,
}

/// KRB-ERROR error codes relevant to the acceptor path (spec §4.4). Only
/// the codes this crate itself emits or must recognize are listed; any
/// other KDC/AP error code round-trips through `KrbErrorCode::Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum KrbErrorCode {
    AppErrBadIntegrity,
    AppErrTktExpired,
    AppErrNotUs,
    AppErrNoKey,
    AppErrSkew,
    AppErrInappCksum,
    Generic,
    Other(i32),
}

impl KrbErrorCode {
    pub const fn value(self) -> i32 {
        match self {
            KrbErrorCode::AppErrBadIntegrity => 31,
            KrbErrorCode::AppErrTktExpired => 32,
            KrbErrorCode::AppErrNotUs => 37,
            KrbErrorCode::AppErrNoKey => 44,
            KrbErrorCode::AppErrSkew => 41,
            KrbErrorCode::AppErrInappCksum => 50,
            KrbErrorCode::Generic => 60,
            KrbErrorCode::Other(v) => v,
        }
    }

    pub fn from_value(v: i32) -> Self {
        match v {
            31 => KrbErrorCode::AppErrBadIntegrity,
            32 => KrbErrorCode::AppErrTktExpired,
            37 => KrbErrorCode::AppErrNotUs,
            44 => KrbErrorCode::AppErrNoKey,
            41 => KrbErrorCode::AppErrSkew,
            50 => KrbErrorCode::AppErrInappCksum,
            60 => KrbErrorCode::Generic,
            other => KrbErrorCode::Other(other),
        }
    }
}

impl fmt::Display for KrbErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.value())
    }
}
