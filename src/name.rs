//! Name Projection (spec §4.5): translate an internal Kerberos principal
//! name to one of three GSS display forms. Pure function of
//! `(realm, principal)` plus a target tag - no context state involved,
//! so it is exposed both as a free function and as a [`Principal`]
//! method (spec §2 SPEC_FULL addition).

use thiserror::Error;

use crate::collab::{NameType, Principal};

/// The three display-name forms spec §4.5 recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameTarget {
    /// `id-user-name`: name-type must be `Principal`, exactly one
    /// component; returns that component verbatim.
    UserName,
    /// `id-service-name`: name-type must be `Service`, exactly two
    /// components; returns `"svc@host"`.
    ServiceName,
    /// `id-krb5-name`: any name-type; returns
    /// `components joined by "/" || "@" || realm`.
    Krb5Name,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NameError {
    #[error("principal is not shaped correctly for the requested display form")]
    BadName,
    #[error("unrecognized target display-form tag")]
    BadTargetOid,
}

/// Translate `principal` (with `realm`) into the `target` display form
/// (spec §4.5).
pub fn translate_name(principal: &Principal, target: NameTarget) -> Result<String, NameError> {
    match target {
        NameTarget::UserName => {
            if principal.name.name_type != NameType::Principal || principal.name.components.len() != 1
            {
                return Err(NameError::BadName);
            }
            Ok(principal.name.components[0].clone())
        }
        NameTarget::ServiceName => {
            if principal.name.name_type != NameType::Service || principal.name.components.len() != 2 {
                return Err(NameError::BadName);
            }
            Ok(format!(
                "{}@{}",
                principal.name.components[0], principal.name.components[1]
            ))
        }
        NameTarget::Krb5Name => {
            if principal.name.components.is_empty() {
                return Err(NameError::BadName);
            }
            Ok(format!(
                "{}@{}",
                principal.name.components.join("/"),
                principal.realm
            ))
        }
    }
}

impl Principal {
    /// Method form of [`translate_name`] (spec §2 SPEC_FULL addition:
    /// Name Projection has no context dependency, so it is also exposed
    /// directly on the value it operates over).
    pub fn translate(&self, target: NameTarget) -> Result<String, NameError> {
        translate_name(self, target)
    }
}
