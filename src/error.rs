use thiserror::Error;

use crate::checksum::ChecksumError;
use crate::collab::KrbErrorCode;
use crate::name::NameError;
use crate::protect::ProtError;
use crate::token::TokenError;

/// Fatal context errors (spec §7): once returned, the
/// [`crate::context::Context`] that produced them is unusable and must be
/// dropped.
#[derive(Error, Debug)]
pub enum Error {
    #[error("defective token: {0}")]
    DefectiveToken(String),

    #[error("unrecognized or unsupported mechanism OID: {0}")]
    BadMech(String),

    #[error("peer returned KRB-ERROR {0:?}")]
    PeerKrbError(KrbErrorCode),

    /// A fatal setup failure this side detected; `token` is the encoded
    /// KRB-ERROR wire token the caller must send to the peer (spec §4.4:
    /// "Any fatal decode error ... produces a KRB-ERROR ... and
    /// transitions state to errored").
    #[error("emitting KRB-ERROR {code:?} to peer")]
    EmittedKrbError { code: KrbErrorCode, token: Vec<u8> },

    #[error("token codec error: {0}")]
    Token(#[from] TokenError),

    #[error("checksum error: {0}")]
    Checksum(#[from] ChecksumError),

    #[error("name projection error: {0}")]
    Name(#[from] NameError),

    #[error("accessor not yet available: {0}")]
    NotYetAvailable(&'static str),

    #[error("context is in an invalid state for this operation: {0}")]
    InvalidState(&'static str),

    #[error("collaborator ASN.1 codec failed: {0}")]
    Asn1(String),

    #[error("collaborator crypto failed: {0}")]
    Crypto(String),

    #[error("keytab lookup failed: {0}")]
    Keytab(String),
}

impl From<ProtError> for Error {
    /// Per-message recoverable errors (duplicate/gap/unseq) are not fatal
    /// by definition; this conversion only exists for callers that want
    /// to fold everything into one error type, and always lands on
    /// `DefectiveToken` since that's the one recoverable variant that is
    /// also meaningful as a terminal error.
    fn from(e: ProtError) -> Self {
        Error::DefectiveToken(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
