//! Kerberos V5 GSS-API mechanism core: context establishment, the
//! binary framing of every GSS-Kerberos token variant, and the
//! per-message protection layer (RFC 1964 legacy 3DES tokens and RFC
//! 4121 modern-enctype tokens).
//!
//! The ASN.1 codec, Kerberos cryptographic primitives, keytab storage
//! and ticket acquisition are explicitly out of scope; [`collab`] pins
//! down the trait boundary a real backend plugs into.

pub mod checksum;
pub mod collab;
pub mod context;
pub mod error;
pub mod flags;
pub mod name;
pub mod protect;
pub mod token;

pub use context::{Collaborators, Context, ContextOptions, InitResult, InitiatorTicket};
pub use error::{Error, Result};
pub use flags::{ContextFlags, TokenFlags};
pub use name::{NameError, NameTarget};
pub use protect::{ProtError, Role};
