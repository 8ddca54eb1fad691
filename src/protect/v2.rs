//! RFC 4121 (v2) MIC and Wrap construction/verification (spec §4.3).

use subtle::ConstantTimeEq;

use super::{rotate_left, v2_wrap_padding_len, ProtError, Role};
use crate::collab::{Key, KerberosCrypto};
use crate::flags::TokenFlags;
use crate::token::mic::MicV2;
use crate::token::wrap::WrapV2;

/// Build a v2 MIC over `message`, signed by `role` using `key` (spec
/// §4.3 v2 MIC).
pub fn get_mic(
    crypto: &dyn KerberosCrypto,
    key: &Key,
    role: Role,
    acceptor_subkey: bool,
    seq: u64,
    message: &[u8],
) -> Result<MicV2, ProtError> {
    let flags = TokenFlags {
        sent_by_acceptor: role == Role::Acceptor,
        sealed: false,
        acceptor_subkey,
    };
    let header = MicV2::header(flags, seq);
    let mut to_sign = Vec::with_capacity(message.len() + header.len());
    to_sign.extend_from_slice(message);
    to_sign.extend_from_slice(&header);

    let checksum = crypto
        .checksum(key, role.sign_usage(), &to_sign)
        .map_err(|e| ProtError::DefectiveToken(e.0))?;

    Ok(MicV2 {
        flags,
        seq,
        checksum,
    })
}

/// Verify a v2 MIC against `message`, where `sender_role` is the role
/// that must have produced it (spec §4.3: "receiver uses the opposite
/// role's usage", i.e. the role of whoever actually signed).
pub fn verify_mic(
    crypto: &dyn KerberosCrypto,
    key: &Key,
    sender_role: Role,
    mic: &MicV2,
    message: &[u8],
) -> Result<(), ProtError> {
    let header = MicV2::header(mic.flags, mic.seq);
    let mut to_verify = Vec::with_capacity(message.len() + header.len());
    to_verify.extend_from_slice(message);
    to_verify.extend_from_slice(&header);

    let expected = crypto
        .checksum(key, sender_role.sign_usage(), &to_verify)
        .map_err(|e| ProtError::DefectiveToken(e.0))?;

    if expected.ct_eq(&mic.checksum).unwrap_u8() == 1 {
        Ok(())
    } else {
        Err(ProtError::DefectiveToken("MIC checksum mismatch".into()))
    }
}

/// Build a v2 Wrap token (spec §4.3 v2 Wrap). `RRC` is always emitted as
/// 0 on send; receivers may present a nonzero RRC which [`unwrap`]
/// handles.
pub fn wrap(
    crypto: &dyn KerberosCrypto,
    key: &Key,
    role: Role,
    acceptor_subkey: bool,
    seq: u64,
    message: &[u8],
) -> Result<WrapV2, ProtError> {
    let pad_len = v2_wrap_padding_len(message.len(), key.enctype.is_des_family());
    let flags = TokenFlags {
        sent_by_acceptor: role == Role::Acceptor,
        sealed: true,
        acceptor_subkey,
    };
    let header = WrapV2::header(flags, pad_len as u16, 0, seq);

    let mut plaintext = Vec::with_capacity(message.len() + pad_len + header.len());
    plaintext.extend_from_slice(message);
    plaintext.extend(std::iter::repeat(0u8).take(pad_len));
    plaintext.extend_from_slice(&header);

    let edata = crypto
        .encrypt(key, role.seal_usage(), &plaintext)
        .map_err(|e| ProtError::DefectiveToken(e.0))?;

    Ok(WrapV2 {
        flags,
        ec: pad_len as u16,
        rrc: 0,
        seq,
        edata,
    })
}

/// Decrypt and validate a v2 Wrap token, returning the original message
/// (spec §4.3 v2 Wrap receive path).
pub fn unwrap(
    crypto: &dyn KerberosCrypto,
    key: &Key,
    sender_role: Role,
    token: &WrapV2,
) -> Result<Vec<u8>, ProtError> {
    let unrotated = rotate_left(&token.edata, token.rrc as usize);

    let plaintext = crypto
        .decrypt(key, sender_role.seal_usage(), &unrotated)
        .map_err(|e| ProtError::DefectiveToken(e.0))?;

    let expected_header = WrapV2::header(token.flags, token.ec, 0, token.seq);
    let ec = token.ec as usize;
    let trailer_len = ec + expected_header.len();
    if plaintext.len() < trailer_len {
        return Err(ProtError::DefectiveToken("wrap plaintext shorter than EC + header".into()));
    }
    let split = plaintext.len() - trailer_len;
    let (data, tail) = plaintext.split_at(split);
    let (padding, header_with_rrc_zero) = tail.split_at(ec);

    if !padding.iter().all(|&b| b == 0) {
        return Err(ProtError::DefectiveToken("nonzero wrap padding bytes".into()));
    }
    if header_with_rrc_zero != expected_header {
        return Err(ProtError::DefectiveToken(
            "reconstructed wrap header did not match".into(),
        ));
    }

    Ok(data.to_vec())
}

/// Select which key to sign/seal *with* when sending (spec §4.3 "Key
/// selection"): prefer `ac_key` if present, setting `acceptor_subkey`.
pub fn select_send_key<'a>(i_key: &'a Key, ac_key: Option<&'a Key>) -> (&'a Key, bool) {
    match ac_key {
        Some(k) => (k, true),
        None => (i_key, false),
    }
}

/// Select which key to verify/unseal *with* on receive (spec §4.3 "Key
/// selection"): if the token's `acceptor_subkey` flag is set and we have
/// an `ac_key`, use it; otherwise fall back to `i_key`.
pub fn select_recv_key<'a>(
    token_flags: TokenFlags,
    i_key: &'a Key,
    ac_key: Option<&'a Key>,
) -> &'a Key {
    if token_flags.acceptor_subkey {
        ac_key.unwrap_or(i_key)
    } else {
        i_key
    }
}
