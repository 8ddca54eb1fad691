//! Context State Machine (spec §4.4, §3): the initiator and acceptor
//! flows, the AP-REQ/AP-REP exchange, mutual-auth branching, and
//! per-message protection dispatch (picking v1 vs. v2 framing by
//! enctype, and the right key per spec §4.3's key-selection rules).

use crate::checksum::{self, Gssapi8003Checksum};
use crate::collab::{
    format_krb_time, ApOptions, ApRep, ApReq, Asn1Codec, Authenticator, ChannelBindings,
    ChannelBindingsCodec, Checksum, Clock, EncApRepPart, EncTicketPart, Key, KerberosCrypto,
    KeyUsage, KeytabMatch, KeytabStore, KrbErrorCode, KrbError, Principal, Rng, Ticket,
    CKSUMTYPE_GSSAPI,
};
use crate::error::{Error, Result};
use crate::flags::ContextFlags;
use crate::name::{translate_name, NameTarget};
use crate::protect::{self, v1, v2, ProtError, Role};
use crate::token::mic::{MicV1, MicV2};
use crate::token::wrap::{WrapV1, WrapV2};
use crate::token::SetupToken;

/// Collaborator bundle (spec §6): every external interface the state
/// machine needs, gathered into one borrow so `initiate`/`accept`/
/// `continue_` don't need half a dozen separate parameters.
pub struct Collaborators<'a> {
    pub asn1: &'a dyn Asn1Codec,
    pub crypto: &'a dyn KerberosCrypto,
    pub keytab: Option<&'a dyn KeytabStore>,
    pub bindings_codec: &'a dyn ChannelBindingsCodec,
    pub rng: &'a mut dyn Rng,
    pub clock: &'a dyn Clock,
}

/// What the initiator already holds before calling [`initiate`]: the
/// ticket it got from the KDC externally (spec §1: ticket acquisition
/// is out of scope), plus the decrypted bits it needs to build the
/// Authenticator.
#[derive(Debug, Clone)]
pub struct InitiatorTicket {
    pub client: Principal,
    pub ticket: Ticket,
    pub session_key: Key,
}

/// Configuration (spec §6 "Options"). Unknown keys have no Rust
/// representation to begin with, so "unknown keys are ignored" is
/// automatically satisfied by this being a typed struct rather than a
/// string-keyed map.
#[derive(Debug, Clone)]
pub struct ContextOptions {
    pub chan_bindings: ChannelBindings,
    pub max_skew_ms: i64,
    pub flags: ContextFlags,
}

impl Default for ContextOptions {
    fn default() -> Self {
        ContextOptions {
            chan_bindings: ChannelBindings::default(),
            max_skew_ms: 300_000,
            flags: ContextFlags::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContextState {
    AwaitingApRep,
    Ready,
    Errored,
    Deleted,
}

/// The long-lived per-session entity (spec §3).
pub struct Context {
    party: Role,
    state: ContextState,
    us: Principal,
    them: Option<Principal>,
    flags: ContextFlags,
    max_skew_ms: i64,
    nonce: Option<u32>,
    tkt: Option<EncTicketPart>,
    tkt_key: Option<Key>,
    i_key: Option<Key>,
    ac_key: Option<Key>,
    seq: u64,
    rseq: u64,
}

/// Result shape shared by `initiate`/`accept`/`continue` (spec §6).
pub enum InitResult {
    Ok { token: Option<Vec<u8>>, ctx: Context },
    Continue { token: Vec<u8>, ctx: Context },
}

impl InitResult {
    pub fn ctx(&self) -> &Context {
        match self {
            InitResult::Ok { ctx, .. } => ctx,
            InitResult::Continue { ctx, .. } => ctx,
        }
    }

    pub fn into_ctx(self) -> Context {
        match self {
            InitResult::Ok { ctx, .. } => ctx,
            InitResult::Continue { ctx, .. } => ctx,
        }
    }
}

fn split_ctime(now: time::OffsetDateTime) -> (time::OffsetDateTime, u32) {
    let micros = now.microsecond() as u32;
    (now, micros)
}

impl Context {
    /// `initiate` (spec §4.4 "Initiator path").
    pub fn initiate(
        opts: &ContextOptions,
        service: Principal,
        ticket: InitiatorTicket,
        collab: &mut Collaborators,
    ) -> Result<InitResult> {
        let nonce = collab.rng.random_nonce31();

        let subkey = collab
            .crypto
            .random_to_key(ticket.session_key.enctype)
            .map_err(|e| Error::Crypto(e.0))?;

        let built_cksum = checksum::build(
            collab.crypto,
            collab.bindings_codec,
            &opts.chan_bindings,
            opts.flags,
            &ticket.session_key,
            None,
        )?;

        let (ctime, cusec) = split_ctime(collab.clock.now());
        let authenticator = Authenticator {
            crealm: ticket.client.realm.clone(),
            cname: ticket.client.name.clone(),
            ctime,
            cusec,
            cksum: Some(Checksum {
                cksumtype: CKSUMTYPE_GSSAPI,
                checksum: built_cksum.encode(),
            }),
            seq_number: Some(nonce),
            subkey: Some(subkey.clone()),
        };

        let authenticator_cipher = collab
            .asn1
            .encode_authenticator(&ticket.session_key, &authenticator)
            .map_err(|e| Error::Asn1(e.0))?;

        let ap_req = ApReq {
            ap_options: ApOptions {
                use_session_key: true,
                mutual_required: opts.flags.mutual_auth,
            },
            ticket: ticket.ticket.clone(),
            authenticator_etype: ticket.session_key.enctype,
            authenticator: authenticator_cipher,
        };

        let der = collab.asn1.encode_ap_req(&ap_req).map_err(|e| Error::Asn1(e.0))?;
        let token = SetupToken::ApReq(der).encode();

        let ctx = Context {
            party: Role::Initiator,
            state: if opts.flags.mutual_auth {
                ContextState::AwaitingApRep
            } else {
                ContextState::Ready
            },
            us: ticket.client,
            them: Some(service),
            flags: opts.flags,
            max_skew_ms: opts.max_skew_ms,
            nonce: Some(nonce),
            tkt: None,
            tkt_key: Some(ticket.session_key),
            i_key: Some(subkey),
            ac_key: None,
            seq: nonce as u64,
            rseq: nonce as u64,
        };

        if opts.flags.mutual_auth {
            Ok(InitResult::Continue { token, ctx })
        } else {
            Ok(InitResult::Ok {
                token: Some(token),
                ctx,
            })
        }
    }

    /// `continue` on an initiator awaiting AP-REP (spec §4.4 "Initiator
    /// follow-up").
    pub fn continue_(mut self, token: &[u8], collab: &mut Collaborators) -> Result<InitResult> {
        if self.state == ContextState::Errored {
            return Err(Error::DefectiveToken("context is errored".into()));
        }
        if self.state != ContextState::AwaitingApRep {
            return Err(Error::InvalidState("continue() called outside awaiting_ap_rep"));
        }

        match SetupToken::decode(token) {
            Ok(SetupToken::KrbError(der)) => {
                let err = collab.asn1.decode_krb_error(&der).map_err(|e| Error::Asn1(e.0))?;
                self.state = ContextState::Errored;
                Err(Error::PeerKrbError(err.error_code))
            }
            Ok(SetupToken::ApRep(der)) => {
                let ap_rep = collab.asn1.decode_ap_rep(&der).map_err(|e| Error::Asn1(e.0))?;
                let tkt_key = self
                    .tkt_key
                    .as_ref()
                    .ok_or_else(|| Error::InvalidState("missing ticket session key"))?;
                let enc = collab
                    .asn1
                    .decode_enc_ap_rep_part(tkt_key, &ap_rep.enc_part)
                    .map_err(|e| Error::Asn1(e.0))?;

                if let Some(seq) = enc.seq_number {
                    self.rseq = seq as u64;
                }
                if let Some(subkey) = enc.subkey {
                    self.ac_key = Some(subkey);
                }
                self.state = ContextState::Ready;
                Ok(InitResult::Ok {
                    token: None,
                    ctx: self,
                })
            }
            Ok(SetupToken::ApReq(_)) | Err(_) => {
                self.state = ContextState::Errored;
                let krb_err = KrbError {
                    error_code: KrbErrorCode::Generic,
                    stime: collab.clock.now(),
                    susec: 0,
                    text: Some("unexpected payload while awaiting AP-REP".into()),
                };
                let der = collab.asn1.encode_krb_error(&krb_err).map_err(|e| Error::Asn1(e.0))?;
                let token = SetupToken::KrbError(der).encode();
                Err(Error::EmittedKrbError {
                    code: KrbErrorCode::Generic,
                    token,
                })
            }
        }
    }

    /// `accept` (spec §4.4 "Acceptor path").
    pub fn accept(
        opts: &ContextOptions,
        acceptor_identity: Principal,
        token: &[u8],
        collab: &mut Collaborators,
    ) -> Result<InitResult> {
        let setup = SetupToken::decode(token)?;
        let der = match setup {
            SetupToken::ApReq(der) => der,
            _ => return Err(Error::BadMech("expected an AP-REQ".into())),
        };
        let ap_req = collab.asn1.decode_ap_req(&der).map_err(|e| Error::Asn1(e.0))?;

        let keytab = collab
            .keytab
            .ok_or_else(|| Error::InvalidState("acceptor requires a keytab"))?;
        let key = match keytab.filter_for_ticket(&ap_req.ticket) {
            Ok(KeytabMatch::Found(k)) => k,
            Ok(KeytabMatch::NotFound) => {
                return Self::emit_ap_err(KrbErrorCode::AppErrNotUs, collab)
            }
            Ok(KeytabMatch::NoMatchingKey) => {
                return Self::emit_ap_err(KrbErrorCode::AppErrNoKey, collab)
            }
            Err(e) => return Err(Error::Keytab(e.0)),
        };

        let tkt = match collab
            .asn1
            .decode_enc_ticket_part(&key, &ap_req.ticket.enc_part)
        {
            Ok(t) => t,
            Err(_) => return Self::emit_ap_err(KrbErrorCode::AppErrBadIntegrity, collab),
        };

        let now = collab.clock.now();
        if format_krb_time(now) > format_krb_time(tkt.endtime) {
            return Self::emit_ap_err(KrbErrorCode::AppErrTktExpired, collab);
        }

        let authenticator = match collab
            .asn1
            .decode_authenticator(&tkt.key, &ap_req.authenticator)
        {
            Ok(a) => a,
            Err(_) => return Self::emit_ap_err(KrbErrorCode::AppErrBadIntegrity, collab),
        };

        if authenticator.crealm != tkt.crealm || authenticator.cname != tkt.cname {
            return Self::emit_ap_err(KrbErrorCode::AppErrBadIntegrity, collab);
        }

        let skew_ms = (authenticator.ctime - now).whole_milliseconds().unsigned_abs() as i64;
        if skew_ms > opts.max_skew_ms {
            return Self::emit_ap_err(KrbErrorCode::AppErrSkew, collab);
        }

        let i_key = authenticator.subkey.clone();

        if let Some(cksum) = &authenticator.cksum {
            if cksum.cksumtype == CKSUMTYPE_GSSAPI {
                let decoded = Gssapi8003Checksum::decode(&cksum.checksum)?;
                let active_key = i_key.as_ref().unwrap_or(&tkt.key);
                if checksum::validate(
                    collab.crypto,
                    collab.bindings_codec,
                    &opts.chan_bindings,
                    opts.flags,
                    active_key,
                    &decoded,
                )
                .is_err()
                {
                    return Self::emit_ap_err(KrbErrorCode::AppErrInappCksum, collab);
                }
            }
            // A missing 0x8003 checksum type (some other cksumtype) is
            // not this mechanism's problem to validate further.
        }
        // A wholly missing checksum is tolerated (spec §4.2, §9 open
        // question: "some Microsoft things do this").

        let seq0 = authenticator.seq_number.unwrap_or(0) as u64;

        let mut ctx = Context {
            party: Role::Acceptor,
            state: ContextState::Ready,
            us: acceptor_identity,
            them: Some(tkt.client()),
            flags: opts.flags,
            max_skew_ms: opts.max_skew_ms,
            nonce: None,
            tkt: Some(tkt.clone()),
            tkt_key: Some(tkt.key.clone()),
            i_key,
            ac_key: None,
            seq: seq0,
            rseq: seq0,
        };

        if ap_req.ap_options.mutual_required {
            let ac_subkey = collab
                .crypto
                .random_to_key(tkt.key.enctype)
                .map_err(|e| Error::Crypto(e.0))?;
            let enc_ap_rep = EncApRepPart {
                ctime: authenticator.ctime,
                cusec: authenticator.cusec,
                seq_number: Some(ctx.seq as u32),
                subkey: Some(ac_subkey.clone()),
            };
            let enc_part = collab
                .asn1
                .encode_enc_ap_rep_part(&tkt.key, &enc_ap_rep)
                .map_err(|e| Error::Asn1(e.0))?;
            let ap_rep = ApRep {
                enc_part_etype: tkt.key.enctype,
                enc_part,
            };
            let der = collab.asn1.encode_ap_rep(&ap_rep).map_err(|e| Error::Asn1(e.0))?;
            let token = SetupToken::ApRep(der).encode();
            ctx.ac_key = Some(ac_subkey);
            Ok(InitResult::Ok {
                token: Some(token),
                ctx,
            })
        } else {
            Ok(InitResult::Ok { token: None, ctx })
        }
    }

    fn emit_ap_err(code: KrbErrorCode, collab: &mut Collaborators) -> Result<InitResult> {
        let krb_err = KrbError {
            error_code: code,
            stime: collab.clock.now(),
            susec: 0,
            text: None,
        };
        let der = collab.asn1.encode_krb_error(&krb_err).map_err(|e| Error::Asn1(e.0))?;
        let token = SetupToken::KrbError(der).encode();
        Err(Error::EmittedKrbError { code, token })
    }

    /// No wire message is emitted on delete (spec §3 lifecycle); key
    /// material is zeroized by simply dropping it (spec §2 SPEC_FULL
    /// addition - `Key` is `ZeroizeOnDrop`).
    pub fn delete(mut self) {
        self.tkt_key = None;
        self.i_key = None;
        self.ac_key = None;
        self.state = ContextState::Deleted;
    }

    fn active_v2_key(&self) -> Result<(&Key, bool)> {
        let i_key = self
            .i_key
            .as_ref()
            .or(self.tkt_key.as_ref())
            .ok_or_else(|| Error::InvalidState("no signing/sealing key available"))?;
        Ok(v2::select_send_key(i_key, self.ac_key.as_ref()))
    }

    fn ticket_key(&self) -> Result<&Key> {
        self.tkt_key
            .as_ref()
            .ok_or_else(|| Error::InvalidState("no ticket session key available"))
    }

    fn is_v1(&self) -> Result<bool> {
        let key = self
            .i_key
            .as_ref()
            .or(self.tkt_key.as_ref())
            .ok_or_else(|| Error::InvalidState("no key available to pick a wire version"))?;
        Ok(key.enctype.is_des_family())
    }

    /// `get_mic` (spec §6).
    pub fn get_mic(&mut self, msg: &[u8], crypto: &dyn KerberosCrypto) -> Result<Vec<u8>> {
        let wire = if self.is_v1()? {
            let key = self.ticket_key()?.clone();
            let mic = v1::get_mic(crypto, &key, self.party, self.seq as u32, msg)
                .map_err(|e| Error::DefectiveToken(e.to_string()))?;
            mic.encode()
        } else {
            let (key, acceptor_subkey) = self.active_v2_key()?;
            let key = key.clone();
            let mic = v2::get_mic(crypto, &key, self.party, acceptor_subkey, self.seq, msg)
                .map_err(|e| Error::DefectiveToken(e.to_string()))?;
            mic.encode()
        };
        self.seq += 1;
        Ok(wire)
    }

    /// `verify_mic` (spec §6). Returns the per-message recoverable error
    /// directly so callers can match on it without the context becoming
    /// unusable (spec §7).
    pub fn verify_mic(
        &mut self,
        msg: &[u8],
        token: &[u8],
        crypto: &dyn KerberosCrypto,
    ) -> std::result::Result<(), ProtError> {
        let sender_role = self.party.opposite();
        if self.is_v1().map_err(|e| ProtError::DefectiveToken(e.to_string()))? {
            let key = self
                .ticket_key()
                .map_err(|e| ProtError::DefectiveToken(e.to_string()))?
                .clone();
            let mic = MicV1::decode(token).map_err(|e| ProtError::DefectiveToken(e.to_string()))?;
            let token_seq = v1::verify_mic(crypto, &key, sender_role, &mic, msg)?;
            protect::check_sequence(token_seq as u64, &mut self.rseq)
        } else {
            let mic = MicV2::decode(token).map_err(|e| ProtError::DefectiveToken(e.to_string()))?;
            let key = v2::select_recv_key(
                mic.flags,
                self.i_key.as_ref().or(self.tkt_key.as_ref()).unwrap(),
                self.ac_key.as_ref(),
            )
            .clone();
            v2::verify_mic(crypto, &key, sender_role, &mic, msg)?;
            protect::check_sequence(mic.seq, &mut self.rseq)
        }
    }

    /// `wrap` (spec §6).
    pub fn wrap(&mut self, msg: &[u8], crypto: &dyn KerberosCrypto, confounder: [u8; 8]) -> Result<Vec<u8>> {
        let wire = if self.is_v1()? {
            let key = self.ticket_key()?.clone();
            let w = v1::wrap(crypto, &key, self.party, self.seq as u32, confounder, msg)
                .map_err(|e| Error::DefectiveToken(e.to_string()))?;
            w.encode()
        } else {
            let (key, acceptor_subkey) = self.active_v2_key()?;
            let key = key.clone();
            let w = v2::wrap(crypto, &key, self.party, acceptor_subkey, self.seq, msg)
                .map_err(|e| Error::DefectiveToken(e.to_string()))?;
            w.encode()
        };
        self.seq += 1;
        Ok(wire)
    }

    /// `unwrap` (spec §6).
    pub fn unwrap(
        &mut self,
        token: &[u8],
        crypto: &dyn KerberosCrypto,
    ) -> std::result::Result<Vec<u8>, ProtError> {
        let sender_role = self.party.opposite();
        if self.is_v1().map_err(|e| ProtError::DefectiveToken(e.to_string()))? {
            let key = self
                .ticket_key()
                .map_err(|e| ProtError::DefectiveToken(e.to_string()))?
                .clone();
            let w = WrapV1::decode(token).map_err(|e| ProtError::DefectiveToken(e.to_string()))?;
            let (msg, token_seq) = v1::unwrap(crypto, &key, sender_role, &w)?;
            protect::check_sequence(token_seq as u64, &mut self.rseq)?;
            Ok(msg)
        } else {
            let w = WrapV2::decode(token).map_err(|e| ProtError::DefectiveToken(e.to_string()))?;
            let key = v2::select_recv_key(
                w.flags,
                self.i_key.as_ref().or(self.tkt_key.as_ref()).unwrap(),
                self.ac_key.as_ref(),
            )
            .clone();
            let msg = v2::unwrap(crypto, &key, sender_role, &w)?;
            protect::check_sequence(w.seq, &mut self.rseq)?;
            Ok(msg)
        }
    }

    // --- Accessors (spec §6, §3 invariants) -----------------------------

    pub fn local_name(&self) -> &Principal {
        &self.us
    }

    pub fn peer_name(&self) -> Result<&Principal> {
        self.them.as_ref().ok_or(Error::NotYetAvailable("peer_name"))
    }

    pub fn peer_ticket(&self) -> Result<&EncTicketPart> {
        self.tkt.as_ref().ok_or(Error::NotYetAvailable("peer_ticket"))
    }

    pub fn translate_name(&self, target: NameTarget) -> Result<String> {
        let peer = self.peer_name()?;
        Ok(translate_name(peer, target)?)
    }

    pub fn party(&self) -> Role {
        self.party
    }

    pub fn is_ready(&self) -> bool {
        self.state == ContextState::Ready
    }

    pub fn is_errored(&self) -> bool {
        self.state == ContextState::Errored
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn rseq(&self) -> u64 {
        self.rseq
    }
}
