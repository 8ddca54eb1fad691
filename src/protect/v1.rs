//! RFC 1964 (v1) MIC and Wrap construction/verification over 3DES (spec
//! §4.3). Unlike v2, several steps here are raw, ad-hoc primitives the
//! GSS mechanism itself performs directly (not delegated to the
//! [`KerberosCrypto`] collaborator): the sequence-number cipher and the
//! confounder/data encryption are plain DES-EDE3-CBC calls with an
//! explicit IV, not RFC 3961 usage-keyed operations. Only the `(Kc, Ke,
//! Ki)` triad derivation is delegated, since that genuinely is Kerberos
//! key derivation (spec §1 Non-goals).

use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use des::TdesEde3;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use subtle::ConstantTimeEq;

use super::{des_pad, des_unpad, ProtError, Role};
use crate::collab::{Key, KerberosCrypto, KeyUsage};
use crate::token::mic::MicV1;
use crate::token::wrap::WrapV1;
use crate::token::{SealAlg, SigAlg};

type Des3CbcEnc = cbc::Encryptor<TdesEde3>;
type Des3CbcDec = cbc::Decryptor<TdesEde3>;
type HmacSha1 = Hmac<Sha1>;

fn des3_cbc_encrypt(key: &[u8], iv: &[u8; 8], plaintext: &[u8]) -> Vec<u8> {
    Des3CbcEnc::new_from_slices(key, iv)
        .expect("3DES key/IV are fixed-size and always valid here")
        .encrypt_padded_vec_mut::<NoPadding>(plaintext)
}

fn des3_cbc_decrypt(key: &[u8], iv: &[u8; 8], ciphertext: &[u8]) -> Result<Vec<u8>, ProtError> {
    Des3CbcDec::new_from_slices(key, iv)
        .expect("3DES key/IV are fixed-size and always valid here")
        .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
        .map_err(|_| ProtError::DefectiveToken("3DES-CBC decrypt failed (bad length)".into()))
}

fn hmac_sha1(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha1::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// `dirn` word per spec §4.3: all-ones if sent by the acceptor, all-zero
/// if sent by the initiator.
fn direction_word(role: Role) -> [u8; 4] {
    match role {
        Role::Acceptor => [0xff; 4],
        Role::Initiator => [0x00; 4],
    }
}

fn encrypt_seq(raw_key: &[u8], seq_iv: &[u8], seq: u32, role: Role) -> [u8; 8] {
    let mut iv = [0u8; 8];
    iv.copy_from_slice(&seq_iv[..8]);
    let mut plain = [0u8; 8];
    plain[0..4].copy_from_slice(&seq.to_le_bytes());
    plain[4..8].copy_from_slice(&direction_word(role));
    let enc = des3_cbc_encrypt(raw_key, &iv, &plain);
    let mut out = [0u8; 8];
    out.copy_from_slice(&enc[..8]);
    out
}

fn decrypt_seq(raw_key: &[u8], seq_iv: &[u8], seq_enc: &[u8; 8]) -> Result<(u32, Role), ProtError> {
    let mut iv = [0u8; 8];
    iv.copy_from_slice(&seq_iv[..8]);
    let plain = des3_cbc_decrypt(raw_key, &iv, seq_enc)?;
    let seq = u32::from_le_bytes(plain[0..4].try_into().unwrap());
    let dirn: [u8; 4] = plain[4..8].try_into().unwrap();
    let role = if dirn == [0xff; 4] {
        Role::Acceptor
    } else {
        Role::Initiator
    };
    Ok((seq, role))
}

/// Build a v1 MIC (spec §4.3 "v1 MIC (RFC 1964, sig_alg =
/// hmac_sha1_des3)"). `ticket_key` must be a 3DES key; `sender_role` is
/// this context's own role (the role doing the sending).
pub fn get_mic(
    crypto: &dyn KerberosCrypto,
    ticket_key: &Key,
    sender_role: Role,
    seq: u32,
    message: &[u8],
) -> Result<MicV1, ProtError> {
    let prefix = MicV1::prefix(SigAlg::HmacSha1Des3);
    let mut to_mac = Vec::with_capacity(8 + message.len());
    to_mac.extend_from_slice(&prefix);
    to_mac.extend_from_slice(message);

    let (kc, _ke, _ki) = crypto
        .base_key_to_triad(ticket_key, KeyUsage::Rfc1964Sign)
        .map_err(|e| ProtError::DefectiveToken(e.0))?;
    let checksum = hmac_sha1(&kc.bytes, &to_mac);

    let seq_iv = &checksum[0..8];
    let seq_enc = encrypt_seq(&ticket_key.bytes, seq_iv, seq, sender_role);

    Ok(MicV1 {
        sig_alg: SigAlg::HmacSha1Des3,
        seq_enc,
        checksum,
    })
}

/// Verify a v1 MIC. `expected_sender` is the role the token must have
/// been produced by (the peer's role, from this context's point of
/// view); a mismatch is an `{unseq_token, bad_direction}` error (spec
/// §4.3).
pub fn verify_mic(
    crypto: &dyn KerberosCrypto,
    ticket_key: &Key,
    expected_sender: Role,
    mic: &MicV1,
    message: &[u8],
) -> Result<u32, ProtError> {
    if mic.sig_alg != SigAlg::HmacSha1Des3 {
        return Err(ProtError::DefectiveToken("unsupported v1 MIC sig_alg".into()));
    }
    if mic.checksum.len() < mic.sig_alg.checksum_len() {
        return Err(ProtError::DefectiveToken("v1 MIC checksum too short".into()));
    }

    let seq_iv = &mic.checksum[0..8];
    let (seq, sender) = decrypt_seq(&ticket_key.bytes, seq_iv, &mic.seq_enc)?;
    if sender != expected_sender {
        return Err(ProtError::UnseqTokenBadDirection);
    }

    let prefix = MicV1::prefix(SigAlg::HmacSha1Des3);
    let mut to_mac = Vec::with_capacity(8 + message.len());
    to_mac.extend_from_slice(&prefix);
    to_mac.extend_from_slice(message);

    let (kc, _ke, _ki) = crypto
        .base_key_to_triad(ticket_key, KeyUsage::Rfc1964Sign)
        .map_err(|e| ProtError::DefectiveToken(e.0))?;
    let expected = hmac_sha1(&kc.bytes, &to_mac);

    if expected.ct_eq(&mic.checksum).unwrap_u8() == 1 {
        Ok(seq)
    } else {
        Err(ProtError::DefectiveToken("v1 MIC checksum mismatch".into()))
    }
}

/// Build a v1 Wrap token (spec §4.3 "v1 Wrap"). `confounder` is 8
/// caller-supplied random bytes (spec §9: randomness is injected so
/// tests can be deterministic).
pub fn wrap(
    crypto: &dyn KerberosCrypto,
    ticket_key: &Key,
    sender_role: Role,
    seq: u32,
    confounder: [u8; 8],
    message: &[u8],
) -> Result<WrapV1, ProtError> {
    let data_pad = des_pad(message);
    let mut conf_data_pad = Vec::with_capacity(8 + data_pad.len());
    conf_data_pad.extend_from_slice(&confounder);
    conf_data_pad.extend_from_slice(&data_pad);

    let (kc, _ke, _ki) = crypto
        .base_key_to_triad(ticket_key, KeyUsage::Rfc1964Sign)
        .map_err(|e| ProtError::DefectiveToken(e.0))?;
    let prefix = WrapV1::prefix(SigAlg::HmacSha1Des3, SealAlg::Des3);
    let mut to_mac = Vec::with_capacity(8 + conf_data_pad.len());
    to_mac.extend_from_slice(&prefix);
    to_mac.extend_from_slice(&conf_data_pad);
    let checksum = hmac_sha1(&kc.bytes, &to_mac);

    let ciphertext = des3_cbc_encrypt(&ticket_key.bytes, &[0u8; 8], &conf_data_pad);

    let seq_iv = &checksum[0..8];
    let seq_enc = encrypt_seq(&ticket_key.bytes, seq_iv, seq, sender_role);

    Ok(WrapV1 {
        sig_alg: SigAlg::HmacSha1Des3,
        seal_alg: SealAlg::Des3,
        seq_enc,
        checksum,
        ciphertext,
    })
}

/// Decrypt and verify a v1 Wrap token, returning `(message, seq)`.
pub fn unwrap(
    crypto: &dyn KerberosCrypto,
    ticket_key: &Key,
    expected_sender: Role,
    token: &WrapV1,
) -> Result<(Vec<u8>, u32), ProtError> {
    if token.sig_alg != SigAlg::HmacSha1Des3 || token.seal_alg != SealAlg::Des3 {
        return Err(ProtError::DefectiveToken("unsupported v1 Wrap algorithm pair".into()));
    }
    if token.checksum.len() < token.sig_alg.checksum_len() {
        return Err(ProtError::DefectiveToken("v1 Wrap checksum too short".into()));
    }

    let seq_iv = &token.checksum[0..8];
    let (seq, sender) = decrypt_seq(&ticket_key.bytes, seq_iv, &token.seq_enc)?;
    if sender != expected_sender {
        return Err(ProtError::UnseqTokenBadDirection);
    }

    let conf_data_pad = des3_cbc_decrypt(&ticket_key.bytes, &[0u8; 8], &token.ciphertext)?;
    if conf_data_pad.len() < 8 {
        return Err(ProtError::DefectiveToken("wrap plaintext shorter than confounder".into()));
    }

    let (kc, _ke, _ki) = crypto
        .base_key_to_triad(ticket_key, KeyUsage::Rfc1964Sign)
        .map_err(|e| ProtError::DefectiveToken(e.0))?;
    let prefix = WrapV1::prefix(SigAlg::HmacSha1Des3, SealAlg::Des3);
    let mut to_mac = Vec::with_capacity(8 + conf_data_pad.len());
    to_mac.extend_from_slice(&prefix);
    to_mac.extend_from_slice(&conf_data_pad);
    let expected = hmac_sha1(&kc.bytes, &to_mac);

    if expected.ct_eq(&token.checksum).unwrap_u8() != 1 {
        return Err(ProtError::DefectiveToken("v1 Wrap checksum mismatch".into()));
    }

    let data_pad = &conf_data_pad[8..];
    let message = des_unpad(data_pad)?;
    Ok((message, seq))
}
