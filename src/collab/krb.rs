//! Plain Rust models of the Kerberos PDUs the mechanism core needs
//! structured access to. Encoding/decoding these to and from ASN.1 DER is
//! the external [`super::Asn1Codec`] collaborator's job (spec §1, §6);
//! this crate only ever reads and writes these plain structs.

use time::OffsetDateTime;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::types::{Enctype, Principal, PrincipalName};

/// A symmetric Kerberos key: an enctype tag plus raw key bytes. Zeroized
/// on drop per spec §5 ("key material ... must be zeroed on deletion").
#[derive(Clone, ZeroizeOnDrop)]
pub struct Key {
    #[zeroize(skip)]
    pub enctype: Enctype,
    pub bytes: Vec<u8>,
}

impl Key {
    pub fn new(enctype: Enctype, bytes: Vec<u8>) -> Self {
        Key { enctype, bytes }
    }
}

impl std::fmt::Debug for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Key")
            .field("enctype", &self.enctype)
            .field("bytes", &"<redacted>")
            .finish()
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.enctype == other.enctype && self.bytes == other.bytes
    }
}

/// The ciphertext half of a `Ticket` as carried on the wire: realm/sname
/// are cleartext (needed for keytab lookup before the ticket can be
/// decrypted at all), `enc_part` is the encrypted `EncTicketPart`.
#[derive(Debug, Clone)]
pub struct Ticket {
    pub realm: String,
    pub sname: PrincipalName,
    pub kvno: Option<u32>,
    pub enc_part_etype: Enctype,
    pub enc_part: Vec<u8>,
}

/// The decrypted body of a [`Ticket`] (spec §3 `tkt`/`tkt_key`).
#[derive(Debug, Clone)]
pub struct EncTicketPart {
    pub crealm: String,
    pub cname: PrincipalName,
    pub key: Key,
    pub starttime: Option<OffsetDateTime>,
    pub endtime: OffsetDateTime,
    pub renew_till: Option<OffsetDateTime>,
}

impl EncTicketPart {
    pub fn client(&self) -> Principal {
        Principal {
            realm: self.crealm.clone(),
            name: self.cname.clone(),
        }
    }
}

/// A Kerberos `Checksum` structure, e.g. the Authenticator's `cksum`
/// field, holding the raw 0x8003 blob built by [`crate::checksum`].
#[derive(Debug, Clone)]
pub struct Checksum {
    pub cksumtype: i32,
    pub checksum: Vec<u8>,
}

pub const CKSUMTYPE_GSSAPI: i32 = 0x8003;

/// The decrypted `Authenticator` (spec §3, §4.2, §4.4).
#[derive(Debug, Clone)]
pub struct Authenticator {
    pub crealm: String,
    pub cname: PrincipalName,
    pub ctime: OffsetDateTime,
    /// Microsecond component of `ctime`, kept separate because Kerberos
    /// wire time is split into whole seconds (`ctime`) plus a microsecond
    /// remainder (`cusec`) - spec §4.4 step 5.
    pub cusec: u32,
    pub cksum: Option<Checksum>,
    pub seq_number: Option<u32>,
    pub subkey: Option<Key>,
}

/// AP-REQ options bit flags (RFC 4120 §5.5.1): only the two bits this
/// mechanism ever sets/reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApOptions {
    pub use_session_key: bool,
    pub mutual_required: bool,
}

/// An AP-REQ PDU: the options, the (still-encrypted) ticket, and the
/// (still-encrypted) authenticator ciphertext.
#[derive(Debug, Clone)]
pub struct ApReq {
    pub ap_options: ApOptions,
    pub ticket: Ticket,
    pub authenticator_etype: Enctype,
    pub authenticator: Vec<u8>,
}

/// The decrypted body of an AP-REP (spec §3 `ac_key`, `rseq`).
#[derive(Debug, Clone)]
pub struct EncApRepPart {
    pub ctime: OffsetDateTime,
    pub cusec: u32,
    pub seq_number: Option<u32>,
    pub subkey: Option<Key>,
}

/// An AP-REP PDU.
#[derive(Debug, Clone)]
pub struct ApRep {
    pub enc_part_etype: Enctype,
    pub enc_part: Vec<u8>,
}

/// A KRB-ERROR PDU (spec §4.4, emitted on fatal setup failures).
#[derive(Debug, Clone)]
pub struct KrbError {
    pub error_code: super::types::KrbErrorCode,
    pub stime: OffsetDateTime,
    pub susec: u32,
    pub text: Option<String>,
}
