//! Signer selection types.

use session_storage::LoginType;
use std::fmt;

/// Result of looking up a stored private key.
#[derive(Clone, PartialEq, Eq)]
pub enum KeyLookup {
    /// Key login with the key on this device.
    Found(String),
    /// Logged in through a signer that never exposes keys.
    Delegated,
    /// No key and no signer that could stand in for one.
    Absent,
}

impl KeyLookup {
    pub fn into_key(self) -> Option<String> {
        match self {
            KeyLookup::Found(key) => Some(key),
            KeyLookup::Delegated | KeyLookup::Absent => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, KeyLookup::Found(_))
    }
}

impl fmt::Debug for KeyLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyLookup::Found(_) => f.write_str("Found(<redacted>)"),
            KeyLookup::Delegated => f.write_str("Delegated"),
            KeyLookup::Absent => f.write_str("Absent"),
        }
    }
}

/// Backend that signs one broadcast.
///
/// Also the answer to the authority upgrade prompt. A `LocalKey` picked
/// there is used for that single call and never stored.
#[derive(Clone, PartialEq, Eq)]
pub enum Signer {
    LocalKey(String),
    Extension,
    MobileSession,
    OAuthRelay,
}

impl Signer {
    /// Login type this signer corresponds to.
    pub fn login_type(&self) -> LoginType {
        match self {
            Signer::LocalKey(_) => LoginType::Key,
            Signer::Extension => LoginType::Keychain,
            Signer::MobileSession => LoginType::HiveAuth,
            Signer::OAuthRelay => LoginType::HiveSigner,
        }
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signer::LocalKey(_) => f.write_str("LocalKey(<redacted>)"),
            Signer::Extension => f.write_str("Extension"),
            Signer::MobileSession => f.write_str("MobileSession"),
            Signer::OAuthRelay => f.write_str("OAuthRelay"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_keys() {
        let signer = Signer::LocalKey("5Jsecret".to_string());
        assert!(!format!("{signer:?}").contains("5Jsecret"));
        let lookup = KeyLookup::Found("5Jsecret".to_string());
        assert!(!format!("{lookup:?}").contains("5Jsecret"));
    }

    #[test]
    fn test_signer_login_types() {
        assert_eq!(Signer::Extension.login_type(), LoginType::Keychain);
        assert_eq!(Signer::OAuthRelay.login_type(), LoginType::HiveSigner);
    }

    #[test]
    fn test_key_lookup_into_key() {
        assert_eq!(
            KeyLookup::Found("k".to_string()).into_key(),
            Some("k".to_string())
        );
        assert_eq!(KeyLookup::Delegated.into_key(), None);
        assert!(!KeyLookup::Absent.is_found());
    }
}
