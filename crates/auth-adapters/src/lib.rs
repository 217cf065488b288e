//! # Duskforum Auth Adapters
//!
//! Concrete credential handling: argon2 password hashing, HS256 session
//! tokens (feature `auth-jwt`), and the REST identity-provider client
//! (feature `provider-rest`).

pub mod password;

#[cfg(feature = "auth-jwt")]
mod tokens;

#[cfg(feature = "provider-rest")]
pub mod provider;

#[cfg(feature = "provider-rest")]
pub use provider::RestIdentityProvider;

#[cfg(feature = "auth-jwt")]
pub use service::CredentialService;

#[cfg(feature = "auth-jwt")]
mod service {
    use std::time::Duration;

    use secrecy::SecretString;

    use domains::{Credentials, Result, SessionClaims, User};

    use crate::password;
    use crate::tokens::TokenSigner;

    /// The production [`Credentials`] implementation: argon2 for passwords,
    /// signed claims for sessions.
    pub struct CredentialService {
        signer: TokenSigner,
    }

    impl CredentialService {
        pub fn new(secret: SecretString, token_ttl: Duration) -> Self {
            Self {
                signer: TokenSigner::new(secret, token_ttl),
            }
        }
    }

    impl Credentials for CredentialService {
        fn hash_password(&self, password: &str) -> Result<String> {
            password::hash_password(password)
        }

        fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
            Ok(password::verify_password(password, hash))
        }

        fn issue_token(&self, user: &User) -> Result<String> {
            self.signer.issue(user)
        }

        fn verify_token(&self, token: &str) -> Result<SessionClaims> {
            self.signer.verify(token)
        }
    }

}
