//! External collaborator contracts (spec §1, §6): ASN.1 codec, Kerberos
//! crypto primitives, keytab storage, channel bindings, randomness and
//! the clock. See [`SPEC_FULL.md`] §0 for why these are traits rather
//! than concrete dependencies.

mod krb;
mod traits;
mod types;

pub use krb::{
    ApOptions, ApRep, ApReq, Authenticator, Checksum, EncApRepPart, EncTicketPart, Key, KrbError,
    Ticket, CKSUMTYPE_GSSAPI,
};
pub use traits::{
    format_krb_time, ChannelBindings, ChannelBindingsCodec, Clock, CollabError,
    DefaultChannelBindingsCodec, KerberosCrypto, KeytabError, KeytabMatch, KeytabStore, Rng,
    SystemClock, SystemRng,
};
pub use types::{ChecksumType, Enctype, KeyUsage, KrbErrorCode, NameType, Principal, PrincipalName};
