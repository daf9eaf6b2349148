use argon2::Argon2;
use rand::Rng;

use crate::error::AppError;

pub const SALT_LEN: usize = 16;
pub const HASH_LEN: usize = 32;

/// Salted argon2id digest of a password. The plaintext never reaches storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub hash: [u8; HASH_LEN],
    pub salt: [u8; SALT_LEN],
}

impl Credential {
    /// Derive a credential for `password` under a fresh random salt
    pub fn derive(password: &str) -> Result<Self, AppError> {
        let salt: [u8; SALT_LEN] = rand::thread_rng().gen();
        let hash = hash_password(password, &salt)?;
        Ok(Credential { hash, salt })
    }

    /// Rebuild from the raw columns stored in the database
    pub fn from_stored(hash: &[u8], salt: &[u8]) -> Result<Self, AppError> {
        let hash: [u8; HASH_LEN] = hash
            .try_into()
            .map_err(|_| AppError::Internal("Invalid stored hash".to_string()))?;
        let salt: [u8; SALT_LEN] = salt
            .try_into()
            .map_err(|_| AppError::Internal("Invalid stored salt".to_string()))?;
        Ok(Credential { hash, salt })
    }

    pub fn matches(&self, password: &str) -> Result<bool, AppError> {
        let computed = hash_password(password, &self.salt)?;
        // Compare every byte so timing does not leak the mismatch position
        let diff = computed
            .iter()
            .zip(self.hash.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b));
        Ok(diff == 0)
    }
}

/// Hash a password with Argon2id using the provided salt
pub fn hash_password(password: &str, salt: &[u8]) -> Result<[u8; HASH_LEN], AppError> {
    let mut hash = [0u8; HASH_LEN];

    Argon2::default()
        .hash_password_into(password.as_bytes(), salt, &mut hash)
        .map_err(|e| AppError::Crypto(format!("Password hashing failed: {}", e)))?;

    Ok(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_and_match() {
        let credential = Credential::derive("pw1").unwrap();
        assert!(credential.matches("pw1").unwrap());
        assert!(!credential.matches("pw2").unwrap());
    }

    #[test]
    fn test_salts_differ_between_derivations() {
        let a = Credential::derive("same").unwrap();
        let b = Credential::derive("same").unwrap();
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn test_from_stored_rejects_bad_lengths() {
        assert!(Credential::from_stored(&[0u8; 7], &[0u8; SALT_LEN]).is_err());
        assert!(Credential::from_stored(&[0u8; HASH_LEN], &[0u8; 3]).is_err());

        let original = Credential::derive("pw").unwrap();
        let restored = Credential::from_stored(&original.hash, &original.salt).unwrap();
        assert_eq!(original, restored);
    }
}
