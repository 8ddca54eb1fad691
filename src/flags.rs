//! Flag Codec (spec §4.2, §4.6): the GSS context capability flags and
//! their 32-bit little-endian wire encoding, shared by the Checksum
//! Builder and [`crate::context::ContextOptions`].

/// GSS context capability flags (spec §4.2). `Default` matches spec's
/// "Defaults when the caller did not explicitly set the flag: sequence,
/// confidentiality, integrity on; others off."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextFlags {
    pub delegate: bool,
    pub mutual_auth: bool,
    pub replay_detect: bool,
    pub sequence: bool,
    pub confidentiality: bool,
    pub integrity: bool,
    pub dce_style: bool,
    pub identify: bool,
    pub ext_errors: bool,
}

impl Default for ContextFlags {
    fn default() -> Self {
        ContextFlags {
            delegate: false,
            mutual_auth: false,
            replay_detect: false,
            sequence: true,
            confidentiality: true,
            integrity: true,
            dce_style: false,
            identify: false,
            ext_errors: false,
        }
    }
}

const BIT_DELEGATE: u32 = 0x0000_0001;
const BIT_MUTUAL_AUTH: u32 = 0x0000_0002;
const BIT_REPLAY_DETECT: u32 = 0x0000_0004;
const BIT_SEQUENCE: u32 = 0x0000_0008;
const BIT_CONFIDENTIALITY: u32 = 0x0000_0010;
const BIT_INTEGRITY: u32 = 0x0000_0020;
const BIT_DCE_STYLE: u32 = 0x0000_1000;
const BIT_IDENTIFY: u32 = 0x0000_2000;
const BIT_EXT_ERRORS: u32 = 0x0000_4000;

impl ContextFlags {
    /// Encode to the 32-bit little-endian flag word used in the 0x8003
    /// checksum blob (spec §4.2).
    pub fn to_word(self) -> u32 {
        let mut w = 0u32;
        if self.delegate {
            w |= BIT_DELEGATE;
        }
        if self.mutual_auth {
            w |= BIT_MUTUAL_AUTH;
        }
        if self.replay_detect {
            w |= BIT_REPLAY_DETECT;
        }
        if self.sequence {
            w |= BIT_SEQUENCE;
        }
        if self.confidentiality {
            w |= BIT_CONFIDENTIALITY;
        }
        if self.integrity {
            w |= BIT_INTEGRITY;
        }
        if self.dce_style {
            w |= BIT_DCE_STYLE;
        }
        if self.identify {
            w |= BIT_IDENTIFY;
        }
        if self.ext_errors {
            w |= BIT_EXT_ERRORS;
        }
        w
    }

    /// Decode from the 32-bit little-endian flag word. Unknown bits are
    /// ignored, matching the wire-level contract of all of this crate's
    /// other bit-field parsers.
    pub fn from_word(w: u32) -> Self {
        ContextFlags {
            delegate: w & BIT_DELEGATE != 0,
            mutual_auth: w & BIT_MUTUAL_AUTH != 0,
            replay_detect: w & BIT_REPLAY_DETECT != 0,
            sequence: w & BIT_SEQUENCE != 0,
            confidentiality: w & BIT_CONFIDENTIALITY != 0,
            integrity: w & BIT_INTEGRITY != 0,
            dce_style: w & BIT_DCE_STYLE != 0,
            identify: w & BIT_IDENTIFY != 0,
            ext_errors: w & BIT_EXT_ERRORS != 0,
        }
    }

    /// Whether every flag set in `required` is also set in `self` - used
    /// by the acceptor's checksum validation (spec §4.2 condition 1: "all
    /// caller-requested flags are represented").
    pub fn contains_all(self, required: ContextFlags) -> bool {
        let have = self.to_word();
        let need = required.to_word();
        have & need == need
    }
}

/// Per-message protection flags (spec §4.1 v2 MIC/Wrap header flags
/// byte): LSB-first, 5 high bits reserved and must be zero on send,
/// ignored on receive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenFlags {
    pub sent_by_acceptor: bool,
    pub sealed: bool,
    pub acceptor_subkey: bool,
}

impl TokenFlags {
    pub fn to_byte(self) -> u8 {
        let mut b = 0u8;
        if self.sent_by_acceptor {
            b |= 0b001;
        }
        if self.sealed {
            b |= 0b010;
        }
        if self.acceptor_subkey {
            b |= 0b100;
        }
        b
    }

    pub fn from_byte(b: u8) -> Self {
        TokenFlags {
            sent_by_acceptor: b & 0b001 != 0,
            sealed: b & 0b010 != 0,
            acceptor_subkey: b & 0b100 != 0,
        }
    }
}
