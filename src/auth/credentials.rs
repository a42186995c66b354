//! Password and room credential hashing.

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

/// Hashing collaborator used for user passwords and room credentials
pub trait CredentialService: Send + Sync {
    fn hash(&self, secret: &str) -> Result<String, String>;

    /// A malformed digest verifies as false
    fn verify(&self, secret: &str, digest: &str) -> bool;
}

#[derive(Default)]
pub struct Argon2Credentials {
    argon2: Argon2<'static>,
}

impl Argon2Credentials {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialService for Argon2Credentials {
    fn hash(&self, secret: &str) -> Result<String, String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(secret.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| format!("Failed to hash secret: {}", e))
    }

    fn verify(&self, secret: &str, digest: &str) -> bool {
        match PasswordHash::new(digest) {
            Ok(parsed) => self.argon2.verify_password(secret.as_bytes(), &parsed).is_ok(),
            Err(_) => false,
        }
    }
}

/// Random plaintext credential handed out once at room creation
pub fn generate_room_password() -> String {
    URL_SAFE_NO_PAD.encode(uuid::Uuid::new_v4().as_bytes())
}
