#![allow(dead_code)]
//! Test-support reference implementations of the `collab` traits,
//! exercised by this crate's own integration tests. Real ASN.1 and real
//! RFC 3961 key derivation are explicitly out of scope (spec §1), so
//! this codec is a hand-rolled, reversible, non-ASN.1 stand-in, and key
//! derivation here is a deterministic placeholder, not the real KDF.

use std::cell::Cell;
use std::collections::HashMap;

use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use cmac::{Cmac, Mac as CmacMac};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;

use krb5_gss_core::collab::{
    format_krb_time, ApOptions, ApRep, ApReq, Authenticator, Checksum, ChecksumType, Clock,
    CollabError, EncApRepPart, EncTicketPart, Enctype, Key, KerberosCrypto, KeyUsage, KeytabError,
    KeytabMatch, KeytabStore, KrbError, NameType, Principal, PrincipalName, Rng, Ticket,
};

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type Des3CbcEnc = cbc::Encryptor<des::TdesEde3>;
type Des3CbcDec = cbc::Decryptor<des::TdesEde3>;

/// Reference [`KerberosCrypto`]: AES-CBC/3DES-CBC for confidentiality
/// (block-size-appropriate, PKCS7-padded - not the real RFC 8009/3962
/// CTS profiles, which are out of scope), HMAC/CMAC for integrity.
pub struct TestKerberosCrypto;

fn zero_iv16() -> [u8; 16] {
    [0u8; 16]
}

fn zero_iv8() -> [u8; 8] {
    [0u8; 8]
}

impl KerberosCrypto for TestKerberosCrypto {
    fn encrypt(&self, key: &Key, _usage: KeyUsage, plain: &[u8]) -> Result<Vec<u8>, CollabError> {
        match key.enctype {
            Enctype::Des3CbcSha1 => Ok(Des3CbcEnc::new_from_slices(&key.bytes, &zero_iv8())
                .map_err(|e| CollabError::new(e.to_string()))?
                .encrypt_padded_vec_mut::<Pkcs7>(plain)),
            Enctype::Aes128CtsHmacSha196 | Enctype::Aes128CtsHmacSha256128 => {
                Ok(Aes128CbcEnc::new_from_slices(&key.bytes, &zero_iv16())
                    .map_err(|e| CollabError::new(e.to_string()))?
                    .encrypt_padded_vec_mut::<Pkcs7>(plain))
            }
            Enctype::Aes256CtsHmacSha196 | Enctype::Aes256CtsHmacSha384192 => {
                Ok(Aes256CbcEnc::new_from_slices(&key.bytes, &zero_iv16())
                    .map_err(|e| CollabError::new(e.to_string()))?
                    .encrypt_padded_vec_mut::<Pkcs7>(plain))
            }
            Enctype::ArcFourHmac => {
                // No RC4 crate in the test dependency set; XOR stream is
                // a reversible stand-in for a test enctype we never
                // exercise outside flag-codec plumbing.
                let mut out = plain.to_vec();
                for (i, b) in out.iter_mut().enumerate() {
                    *b ^= key.bytes[i % key.bytes.len()];
                }
                Ok(out)
            }
        }
    }

    fn decrypt(&self, key: &Key, _usage: KeyUsage, cipher: &[u8]) -> Result<Vec<u8>, CollabError> {
        match key.enctype {
            Enctype::Des3CbcSha1 => Des3CbcDec::new_from_slices(&key.bytes, &zero_iv8())
                .map_err(|e| CollabError::new(e.to_string()))?
                .decrypt_padded_vec_mut::<Pkcs7>(cipher)
                .map_err(|e| CollabError::new(e.to_string())),
            Enctype::Aes128CtsHmacSha196 | Enctype::Aes128CtsHmacSha256128 => {
                Aes128CbcDec::new_from_slices(&key.bytes, &zero_iv16())
                    .map_err(|e| CollabError::new(e.to_string()))?
                    .decrypt_padded_vec_mut::<Pkcs7>(cipher)
                    .map_err(|e| CollabError::new(e.to_string()))
            }
            Enctype::Aes256CtsHmacSha196 | Enctype::Aes256CtsHmacSha384192 => {
                Aes256CbcDec::new_from_slices(&key.bytes, &zero_iv16())
                    .map_err(|e| CollabError::new(e.to_string()))?
                    .decrypt_padded_vec_mut::<Pkcs7>(cipher)
                    .map_err(|e| CollabError::new(e.to_string()))
            }
            Enctype::ArcFourHmac => {
                let mut out = cipher.to_vec();
                for (i, b) in out.iter_mut().enumerate() {
                    *b ^= key.bytes[i % key.bytes.len()];
                }
                Ok(out)
            }
        }
    }

    fn checksum(&self, key: &Key, usage: KeyUsage, data: &[u8]) -> Result<Vec<u8>, CollabError> {
        match key.enctype {
            Enctype::Des3CbcSha1 | Enctype::ArcFourHmac => {
                let mut mac = Hmac::<Sha1>::new_from_slice(&key.bytes)
                    .map_err(|e| CollabError::new(e.to_string()))?;
                mac.update(&usage.value().to_le_bytes());
                mac.update(data);
                Ok(mac.finalize().into_bytes().to_vec())
            }
            Enctype::Aes128CtsHmacSha196 | Enctype::Aes128CtsHmacSha256128 => {
                let mut mac = Cmac::<aes::Aes128>::new_from_slice(&key.bytes)
                    .map_err(|e| CollabError::new(e.to_string()))?;
                mac.update(&usage.value().to_le_bytes());
                mac.update(data);
                Ok(mac.finalize().into_bytes().to_vec())
            }
            Enctype::Aes256CtsHmacSha196 | Enctype::Aes256CtsHmacSha384192 => {
                let mut mac = Cmac::<aes::Aes256>::new_from_slice(&key.bytes)
                    .map_err(|e| CollabError::new(e.to_string()))?;
                mac.update(&usage.value().to_le_bytes());
                mac.update(data);
                Ok(mac.finalize().into_bytes().to_vec())
            }
        }
    }

    fn default_checksum_type(&self, enctype: Enctype) -> ChecksumType {
        match enctype {
            Enctype::Des3CbcSha1 => ChecksumType::HmacSha1Des3Kd,
            Enctype::ArcFourHmac => ChecksumType::HmacMd5Rc4,
            Enctype::Aes128CtsHmacSha196 | Enctype::Aes128CtsHmacSha256128 => {
                ChecksumType::HmacSha196Aes128
            }
            Enctype::Aes256CtsHmacSha196 | Enctype::Aes256CtsHmacSha384192 => {
                ChecksumType::HmacSha196Aes256
            }
        }
    }

    fn random_to_key(&self, enctype: Enctype) -> Result<Key, CollabError> {
        use rand::RngCore;
        let len = match enctype {
            Enctype::Des3CbcSha1 => 24,
            Enctype::ArcFourHmac => 16,
            Enctype::Aes128CtsHmacSha196 | Enctype::Aes128CtsHmacSha256128 => 16,
            Enctype::Aes256CtsHmacSha196 | Enctype::Aes256CtsHmacSha384192 => 32,
        };
        let mut bytes = vec![0u8; len];
        rand::thread_rng().fill_bytes(&mut bytes);
        Ok(Key::new(enctype, bytes))
    }

    fn base_key_to_ck_key(&self, key: &Key, usage: KeyUsage) -> Result<Key, CollabError> {
        Ok(Key::new(key.enctype, derive(&key.bytes, usage.value(), key.bytes.len())))
    }

    fn base_key_to_triad(&self, key: &Key, usage: KeyUsage) -> Result<(Key, Key, Key), CollabError> {
        let len = key.bytes.len();
        let kc = derive(&key.bytes, usage.value().wrapping_mul(3), len);
        let ke = derive(&key.bytes, usage.value().wrapping_mul(5), len);
        let ki = derive(&key.bytes, usage.value().wrapping_mul(7), len);
        Ok((
            Key::new(key.enctype, kc),
            Key::new(key.enctype, ke),
            Key::new(key.enctype, ki),
        ))
    }
}

/// Deterministic placeholder for RFC 3961 key derivation: HMAC-SHA256
/// over the usage number, truncated/repeated to the target length.
fn derive(base: &[u8], usage: u32, len: usize) -> Vec<u8> {
    let mut mac = Hmac::<Sha256>::new_from_slice(base).expect("HMAC accepts any key length");
    mac.update(&usage.to_le_bytes());
    let digest = mac.finalize().into_bytes();
    digest.iter().cycle().take(len).copied().collect()
}

/// Hand-rolled, non-ASN.1 reversible wire format for the setup PDUs
/// (spec §1: real ASN.1 is out of scope). Every field is
/// length-prefixed; `EncTicketPart`/`Authenticator`/`EncApRepPart` are
/// serialized plain and then run through [`TestKerberosCrypto`].
pub struct TestAsn1Codec;

fn put_bytes(out: &mut Vec<u8>, b: &[u8]) {
    out.extend_from_slice(&(b.len() as u32).to_le_bytes());
    out.extend_from_slice(b);
}

fn take_bytes(buf: &mut &[u8]) -> Vec<u8> {
    let len = u32::from_le_bytes(buf[0..4].try_into().unwrap()) as usize;
    let out = buf[4..4 + len].to_vec();
    *buf = &buf[4 + len..];
    out
}

fn put_str(out: &mut Vec<u8>, s: &str) {
    put_bytes(out, s.as_bytes());
}

fn take_str(buf: &mut &[u8]) -> String {
    String::from_utf8(take_bytes(buf)).unwrap()
}

fn put_principal_name(out: &mut Vec<u8>, name: &PrincipalName) {
    out.extend_from_slice(&name.name_type.value().to_le_bytes());
    out.extend_from_slice(&(name.components.len() as u32).to_le_bytes());
    for c in &name.components {
        put_str(out, c);
    }
}

fn take_principal_name(buf: &mut &[u8]) -> PrincipalName {
    let name_type = NameType::from_value(i32::from_le_bytes(buf[0..4].try_into().unwrap()));
    *buf = &buf[4..];
    let n = u32::from_le_bytes(buf[0..4].try_into().unwrap()) as usize;
    *buf = &buf[4..];
    let components = (0..n).map(|_| take_str(buf)).collect();
    PrincipalName { name_type, components }
}

fn put_enctype(out: &mut Vec<u8>, e: Enctype) {
    out.extend_from_slice(&e.etype_value().to_le_bytes());
}

fn take_enctype(buf: &mut &[u8]) -> Enctype {
    let v = i32::from_le_bytes(buf[0..4].try_into().unwrap());
    *buf = &buf[4..];
    match v {
        16 => Enctype::Des3CbcSha1,
        23 => Enctype::ArcFourHmac,
        17 => Enctype::Aes128CtsHmacSha196,
        18 => Enctype::Aes256CtsHmacSha196,
        19 => Enctype::Aes128CtsHmacSha256128,
        20 => Enctype::Aes256CtsHmacSha384192,
        other => panic!("unsupported test enctype value {other}"),
    }
}

fn put_time(out: &mut Vec<u8>, t: time::OffsetDateTime) {
    put_str(out, &format_krb_time(t));
}

fn take_time(buf: &mut &[u8]) -> time::OffsetDateTime {
    let s = take_str(buf);
    time::PrimitiveDateTime::parse(
        &s,
        time::macros::format_description!("[year][month][day][hour][minute][second]Z"),
    )
    .unwrap()
    .assume_utc()
}

fn out_opt_time(out: &mut Vec<u8>, t: Option<time::OffsetDateTime>) {
    out.push(t.is_some() as u8);
    put_time(out, t.unwrap_or(time::OffsetDateTime::UNIX_EPOCH));
}

fn take_opt_time(buf: &mut &[u8]) -> Option<time::OffsetDateTime> {
    let present = buf[0] != 0;
    *buf = &buf[1..];
    let t = take_time(buf);
    present.then_some(t)
}

fn put_ticket(out: &mut Vec<u8>, t: &Ticket) {
    put_str(out, &t.realm);
    put_principal_name(out, &t.sname);
    out.extend_from_slice(&t.kvno.unwrap_or(0).to_le_bytes());
    out.push(t.kvno.is_some() as u8);
    put_enctype(out, t.enc_part_etype);
    put_bytes(out, &t.enc_part);
}

fn take_ticket(buf: &mut &[u8]) -> Ticket {
    let realm = take_str(buf);
    let sname = take_principal_name(buf);
    let kvno_val = u32::from_le_bytes(buf[0..4].try_into().unwrap());
    *buf = &buf[4..];
    let kvno_present = buf[0] != 0;
    *buf = &buf[1..];
    let enc_part_etype = take_enctype(buf);
    let enc_part = take_bytes(buf);
    Ticket {
        realm,
        sname,
        kvno: kvno_present.then_some(kvno_val),
        enc_part_etype,
        enc_part,
    }
}

fn put_key(out: &mut Vec<u8>, k: &Key) {
    put_enctype(out, k.enctype);
    put_bytes(out, &k.bytes);
}

fn take_key(buf: &mut &[u8]) -> Key {
    let enctype = take_enctype(buf);
    let bytes = take_bytes(buf);
    Key::new(enctype, bytes)
}

impl TestAsn1Codec {
    /// Not part of the `Asn1Codec` trait (ticket issuance is out of
    /// scope): builds the wire `Ticket` a test KDC would have produced,
    /// encrypting `part` under `service_key`.
    pub fn build_ticket(
        &self,
        service_key: &Key,
        realm: &str,
        sname: PrincipalName,
        part: &EncTicketPart,
    ) -> Ticket {
        let mut plain = Vec::new();
        put_str(&mut plain, &part.crealm);
        put_principal_name(&mut plain, &part.cname);
        put_key(&mut plain, &part.key);
        out_opt_time(&mut plain, part.starttime);
        put_time(&mut plain, part.endtime);
        out_opt_time(&mut plain, part.renew_till);

        let enc_part = TestKerberosCrypto
            .encrypt(service_key, KeyUsage::KdcRepTicket, &plain)
            .expect("test encryption never fails");

        Ticket {
            realm: realm.to_string(),
            sname,
            kvno: Some(1),
            enc_part_etype: service_key.enctype,
            enc_part,
        }
    }
}

impl krb5_gss_core::collab::Asn1Codec for TestAsn1Codec {
    fn decode_ap_req(&self, der: &[u8]) -> Result<ApReq, CollabError> {
        let mut buf = der;
        let use_session_key = buf[0] != 0;
        let mutual_required = buf[1] != 0;
        buf = &buf[2..];
        let ticket = take_ticket(&mut buf);
        let authenticator_etype = take_enctype(&mut buf);
        let authenticator = take_bytes(&mut buf);
        Ok(ApReq {
            ap_options: ApOptions {
                use_session_key,
                mutual_required,
            },
            ticket,
            authenticator_etype,
            authenticator,
        })
    }

    fn encode_ap_req(&self, ap_req: &ApReq) -> Result<Vec<u8>, CollabError> {
        let mut out = Vec::new();
        out.push(ap_req.ap_options.use_session_key as u8);
        out.push(ap_req.ap_options.mutual_required as u8);
        put_ticket(&mut out, &ap_req.ticket);
        put_enctype(&mut out, ap_req.authenticator_etype);
        put_bytes(&mut out, &ap_req.authenticator);
        Ok(out)
    }

    fn decode_ap_rep(&self, der: &[u8]) -> Result<ApRep, CollabError> {
        let mut buf = der;
        let enc_part_etype = take_enctype(&mut buf);
        let enc_part = take_bytes(&mut buf);
        Ok(ApRep { enc_part_etype, enc_part })
    }

    fn encode_ap_rep(&self, ap_rep: &ApRep) -> Result<Vec<u8>, CollabError> {
        let mut out = Vec::new();
        put_enctype(&mut out, ap_rep.enc_part_etype);
        put_bytes(&mut out, &ap_rep.enc_part);
        Ok(out)
    }

    fn decode_krb_error(&self, der: &[u8]) -> Result<KrbError, CollabError> {
        let mut buf = der;
        let error_code = krb5_gss_core::collab::KrbErrorCode::from_value(i32::from_le_bytes(
            buf[0..4].try_into().unwrap(),
        ));
        buf = &buf[4..];
        let stime = take_time(&mut buf);
        let susec = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        buf = &buf[4..];
        let has_text = buf[0] != 0;
        buf = &buf[1..];
        let text = has_text.then(|| take_str(&mut buf));
        Ok(KrbError {
            error_code,
            stime,
            susec,
            text,
        })
    }

    fn encode_krb_error(&self, err: &KrbError) -> Result<Vec<u8>, CollabError> {
        let mut out = Vec::new();
        out.extend_from_slice(&err.error_code.value().to_le_bytes());
        put_time(&mut out, err.stime);
        out.extend_from_slice(&err.susec.to_le_bytes());
        out.push(err.text.is_some() as u8);
        if let Some(t) = &err.text {
            put_str(&mut out, t);
        }
        Ok(out)
    }

    fn decode_enc_ticket_part(&self, key: &Key, cipher: &[u8]) -> Result<EncTicketPart, CollabError> {
        let plain = TestKerberosCrypto.decrypt(key, KeyUsage::KdcRepTicket, cipher)?;
        let mut buf = plain.as_slice();
        let crealm = take_str(&mut buf);
        let cname = take_principal_name(&mut buf);
        let ticket_key = take_key(&mut buf);
        let starttime = take_opt_time(&mut buf);
        let endtime = take_time(&mut buf);
        let renew_till = take_opt_time(&mut buf);
        Ok(EncTicketPart {
            crealm,
            cname,
            key: ticket_key,
            starttime,
            endtime,
            renew_till,
        })
    }

    fn decode_authenticator(&self, key: &Key, cipher: &[u8]) -> Result<Authenticator, CollabError> {
        let plain = TestKerberosCrypto.decrypt(key, KeyUsage::ApReqAuth, cipher)?;
        let mut buf = plain.as_slice();
        let crealm = take_str(&mut buf);
        let cname = take_principal_name(&mut buf);
        let ctime = take_time(&mut buf);
        let cusec = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        buf = &buf[4..];
        let has_cksum = buf[0] != 0;
        buf = &buf[1..];
        let cksum = if has_cksum {
            let cksumtype = i32::from_le_bytes(buf[0..4].try_into().unwrap());
            buf = &buf[4..];
            let checksum = take_bytes(&mut buf);
            Some(Checksum { cksumtype, checksum })
        } else {
            None
        };
        let has_seq = buf[0] != 0;
        buf = &buf[1..];
        let seq_val = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        buf = &buf[4..];
        let seq_number = has_seq.then_some(seq_val);
        let has_subkey = buf[0] != 0;
        buf = &buf[1..];
        let subkey = has_subkey.then(|| take_key(&mut buf));
        Ok(Authenticator {
            crealm,
            cname,
            ctime,
            cusec,
            cksum,
            seq_number,
            subkey,
        })
    }

    fn encode_authenticator(&self, key: &Key, authenticator: &Authenticator) -> Result<Vec<u8>, CollabError> {
        let mut plain = Vec::new();
        put_str(&mut plain, &authenticator.crealm);
        put_principal_name(&mut plain, &authenticator.cname);
        put_time(&mut plain, authenticator.ctime);
        plain.extend_from_slice(&authenticator.cusec.to_le_bytes());
        plain.push(authenticator.cksum.is_some() as u8);
        if let Some(c) = &authenticator.cksum {
            plain.extend_from_slice(&c.cksumtype.to_le_bytes());
            put_bytes(&mut plain, &c.checksum);
        }
        plain.push(authenticator.seq_number.is_some() as u8);
        plain.extend_from_slice(&authenticator.seq_number.unwrap_or(0).to_le_bytes());
        plain.push(authenticator.subkey.is_some() as u8);
        if let Some(k) = &authenticator.subkey {
            put_key(&mut plain, k);
        }
        TestKerberosCrypto.encrypt(key, KeyUsage::ApReqAuth, &plain)
    }

    fn decode_enc_ap_rep_part(&self, key: &Key, cipher: &[u8]) -> Result<EncApRepPart, CollabError> {
        let plain = TestKerberosCrypto.decrypt(key, KeyUsage::ApRepEncPart, cipher)?;
        let mut buf = plain.as_slice();
        let ctime = take_time(&mut buf);
        let cusec = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        buf = &buf[4..];
        let has_seq = buf[0] != 0;
        buf = &buf[1..];
        let seq_val = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        buf = &buf[4..];
        let seq_number = has_seq.then_some(seq_val);
        let has_subkey = buf[0] != 0;
        buf = &buf[1..];
        let subkey = has_subkey.then(|| take_key(&mut buf));
        Ok(EncApRepPart {
            ctime,
            cusec,
            seq_number,
            subkey,
        })
    }

    fn encode_enc_ap_rep_part(&self, key: &Key, part: &EncApRepPart) -> Result<Vec<u8>, CollabError> {
        let mut plain = Vec::new();
        put_time(&mut plain, part.ctime);
        plain.extend_from_slice(&part.cusec.to_le_bytes());
        plain.push(part.seq_number.is_some() as u8);
        plain.extend_from_slice(&part.seq_number.unwrap_or(0).to_le_bytes());
        plain.push(part.subkey.is_some() as u8);
        if let Some(k) = &part.subkey {
            put_key(&mut plain, k);
        }
        TestKerberosCrypto.encrypt(key, KeyUsage::ApRepEncPart, &plain)
    }
}

/// A single-entry keytab: one service principal, one key.
pub struct TestKeytab {
    entries: HashMap<(String, Vec<String>), Key>,
}

impl TestKeytab {
    pub fn new() -> Self {
        TestKeytab {
            entries: HashMap::new(),
        }
    }

    pub fn insert(&mut self, realm: &str, sname: &PrincipalName, key: Key) {
        self.entries
            .insert((realm.to_string(), sname.components.clone()), key);
    }
}

impl KeytabStore for TestKeytab {
    fn filter_for_ticket(&self, ticket: &Ticket) -> Result<KeytabMatch, KeytabError> {
        match self.entries.get(&(ticket.realm.clone(), ticket.sname.components.clone())) {
            Some(k) if k.enctype == ticket.enc_part_etype => Ok(KeytabMatch::Found(k.clone())),
            Some(_) => Ok(KeytabMatch::NoMatchingKey),
            None => Ok(KeytabMatch::NotFound),
        }
    }
}

/// A simple counter-keyed deterministic RNG so sequence numbers/subkeys
/// are reproducible across test runs.
pub struct TestRng {
    state: u64,
}

impl TestRng {
    pub fn new(seed: u64) -> Self {
        TestRng { state: seed }
    }
}

impl Rng for TestRng {
    fn fill(&mut self, buf: &mut [u8]) {
        for chunk in buf.chunks_mut(8) {
            self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
            let bytes = self.state.to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }
}

/// A settable clock double (spec §5/§9: clock is injected for
/// determinism).
pub struct TestClock {
    now: Cell<time::OffsetDateTime>,
}

impl TestClock {
    pub fn new(now: time::OffsetDateTime) -> Self {
        TestClock { now: Cell::new(now) }
    }

    pub fn set(&self, now: time::OffsetDateTime) {
        self.now.set(now);
    }
}

impl Clock for TestClock {
    fn now(&self) -> time::OffsetDateTime {
        self.now.get()
    }
}

pub fn principal(realm: &str, name: &str) -> Principal {
    Principal {
        realm: realm.to_string(),
        name: PrincipalName::new(NameType::Principal, [name]),
    }
}

pub fn service_principal(realm: &str, svc: &str, host: &str) -> Principal {
    Principal {
        realm: realm.to_string(),
        name: PrincipalName::new(NameType::Service, [svc, host]),
    }
}
