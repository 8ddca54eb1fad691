//! The external collaborator contracts (spec §6): everything this crate
//! treats as "somebody else's problem" - ASN.1 codec, Kerberos crypto
//! primitives, keytab storage, channel bindings encoding, randomness and
//! the clock. The mechanism core (`context`, `protect`, `checksum`,
//! `token`) is generic over these traits and never assumes a concrete
//! backend; production users plug in real implementations (e.g. backed
//! by `picky-krb`/`picky-asn1-der` for the ASN.1 side).

use time::OffsetDateTime;

use super::krb::{ApRep, ApReq, Authenticator, EncApRepPart, EncTicketPart, Key, KrbError, Ticket};
use super::types::{ChecksumType, Enctype, KeyUsage, PrincipalName};

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct CollabError(pub String);

impl CollabError {
    pub fn new(msg: impl Into<String>) -> Self {
        CollabError(msg.into())
    }
}

/// Kerberos ASN.1 DER encode/decode (spec §6). Operates purely on the
/// plain structs in [`super::krb`] - no ASN.1 library types ever cross
/// this boundary into the mechanism core.
pub trait Asn1Codec {
    fn decode_ap_req(&self, der: &[u8]) -> Result<ApReq, CollabError>;
    fn encode_ap_req(&self, ap_req: &ApReq) -> Result<Vec<u8>, CollabError>;

    fn decode_ap_rep(&self, der: &[u8]) -> Result<ApRep, CollabError>;
    fn encode_ap_rep(&self, ap_rep: &ApRep) -> Result<Vec<u8>, CollabError>;

    fn decode_krb_error(&self, der: &[u8]) -> Result<KrbError, CollabError>;
    fn encode_krb_error(&self, err: &KrbError) -> Result<Vec<u8>, CollabError>;

    fn decode_enc_ticket_part(&self, key: &Key, cipher: &[u8]) -> Result<EncTicketPart, CollabError>;

    fn decode_authenticator(&self, key: &Key, cipher: &[u8]) -> Result<Authenticator, CollabError>;
    fn encode_authenticator(&self, key: &Key, authenticator: &Authenticator) -> Result<Vec<u8>, CollabError>;

    fn decode_enc_ap_rep_part(&self, key: &Key, cipher: &[u8]) -> Result<EncApRepPart, CollabError>;
    fn encode_enc_ap_rep_part(&self, key: &Key, part: &EncApRepPart) -> Result<Vec<u8>, CollabError>;
}

/// Kerberos cryptographic primitives (spec §6): key-usage-scoped
/// encrypt/decrypt/checksum, plus the key-derivation helpers the
/// Checksum Builder and v1 per-message layer need.
pub trait KerberosCrypto {
    fn encrypt(&self, key: &Key, usage: KeyUsage, plain: &[u8]) -> Result<Vec<u8>, CollabError>;
    fn decrypt(&self, key: &Key, usage: KeyUsage, cipher: &[u8]) -> Result<Vec<u8>, CollabError>;

    /// Compute a keyed or unkeyed checksum. Used both for v2 MIC/Wrap
    /// (keyed) and for the optional extra MIC in the 0x8003 checksum
    /// blob (spec §4.2).
    fn checksum(&self, key: &Key, usage: KeyUsage, data: &[u8]) -> Result<Vec<u8>, CollabError>;

    /// The checksum type a given enctype's "default" keyed checksum uses
    /// (spec §4.2: "the ticket session key's checksum type").
    fn default_checksum_type(&self, enctype: Enctype) -> ChecksumType;

    /// Generate a random session key of the given enctype (spec §6
    /// `random_to_key`).
    fn random_to_key(&self, enctype: Enctype) -> Result<Key, CollabError>;

    /// RFC 3961 `base_key_to_ck_key`-style key-usage-scoped derivation for
    /// a single derived key (used where only one derived key, not a
    /// triad, is needed).
    fn base_key_to_ck_key(&self, key: &Key, usage: KeyUsage) -> Result<Key, CollabError>;

    /// RFC 1964 `(Kc, Ke, Ki)` triad derivation for 3DES MIC/Wrap (spec
    /// §4.3 v1 MIC/Wrap): `Kc` signs, `Ke` encrypts, `Ki` is unused by
    /// RFC 1964 but kept for a uniform signature with RFC 4121-style
    /// triads.
    fn base_key_to_triad(&self, key: &Key, usage: KeyUsage) -> Result<(Key, Key, Key), CollabError>;
}

/// Keytab lookup (spec §6): select the key(s) that can decrypt a given
/// ticket's `enc-part`.
pub trait KeytabStore {
    /// Returns the matching key, or `Err` distinguishing "no entry for
    /// this principal at all" from other failures so the acceptor can
    /// tell `KRB_AP_ERR_NOT_US` apart from `KRB_AP_ERR_NOKEY` (spec §4.4
    /// step 3).
    fn filter_for_ticket(&self, ticket: &Ticket) -> Result<KeytabMatch, KeytabError>;
}

#[derive(Debug)]
pub enum KeytabMatch {
    Found(Key),
    NotFound,
    NoMatchingKey,
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct KeytabError(pub String);

/// Channel bindings encoding (spec §4.2, §6): caller-supplied transport
/// binding data, MD5-hashed into the 0x8003 checksum blob.
pub trait ChannelBindingsCodec {
    fn encode(&self, bindings: &ChannelBindings) -> Vec<u8>;
}

/// Caller-supplied channel bindings value (spec §6 `chan_bindings`
/// option). Opaque to the core beyond "encode it and hash the result".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelBindings {
    pub initiator_addr: Vec<u8>,
    pub acceptor_addr: Vec<u8>,
    pub application_data: Vec<u8>,
}

impl ChannelBindings {
    pub fn is_empty(&self) -> bool {
        self.initiator_addr.is_empty()
            && self.acceptor_addr.is_empty()
            && self.application_data.is_empty()
    }
}

/// A default, RFC 4120-style encoding: concatenation of the three
/// fields, each length-prefixed the way `gss_channel_bindings_struct` is
/// laid out on the wire. Provided so callers with no exotic transport
/// binding don't need to write their own [`ChannelBindingsCodec`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultChannelBindingsCodec;

impl ChannelBindingsCodec for DefaultChannelBindingsCodec {
    fn encode(&self, bindings: &ChannelBindings) -> Vec<u8> {
        let mut out = Vec::new();
        // initiator-addrtype/acceptor-addrtype are left as 0 (unspecified)
        // since the core only ever hashes the encoded bytes, never parses
        // them back.
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&(bindings.initiator_addr.len() as u32).to_le_bytes());
        out.extend_from_slice(&bindings.initiator_addr);
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&(bindings.acceptor_addr.len() as u32).to_le_bytes());
        out.extend_from_slice(&bindings.acceptor_addr);
        out.extend_from_slice(&(bindings.application_data.len() as u32).to_le_bytes());
        out.extend_from_slice(&bindings.application_data);
        out
    }
}

/// Randomness injected as an interface (spec §5, §9 "Global crypto
/// state"), so tests can supply a deterministic source.
pub trait Rng {
    fn fill(&mut self, buf: &mut [u8]);

    fn random_u32(&mut self) -> u32 {
        let mut buf = [0u8; 4];
        self.fill(&mut buf);
        u32::from_le_bytes(buf)
    }

    /// A 31-bit unsigned value, per spec §3 `nonce`.
    fn random_nonce31(&mut self) -> u32 {
        self.random_u32() & 0x7fff_ffff
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRng;

impl Rng for SystemRng {
    fn fill(&mut self, buf: &mut [u8]) {
        use rand::RngCore;
        rand::thread_rng().fill_bytes(buf);
    }
}

/// The clock injected as an interface (spec §5, §9), with a formatter to
/// Kerberos time strings (spec §4.4 step 4: "Times are compared as
/// Kerberos-time strings (ASCII) which sort monotonically").
pub trait Clock {
    fn now(&self) -> OffsetDateTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Kerberos `KerberosTime` is `YYYYMMDDHHMMSSZ`; ASCII-sorting this
/// string sorts the underlying instants, which is what spec §4.4 step 6
/// relies on for skew comparison without needing real arithmetic.
pub fn format_krb_time(t: OffsetDateTime) -> String {
    let t = t.to_offset(time::UtcOffset::UTC);
    format!(
        "{:04}{:02}{:02}{:02}{:02}{:02}Z",
        t.year(),
        u8::from(t.month()),
        t.day(),
        t.hour(),
        t.minute(),
        t.second()
    )
}
