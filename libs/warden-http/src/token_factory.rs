//! Token factories turn a credential into a [`Token`].

use std::collections::HashMap;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use http::request::Parts;
use warden_core::{Attributes, BoxError, Token};

/// Parses and validates the credential for one authorization scheme.
#[async_trait]
pub trait TokenFactory: Send + Sync {
    /// `value` is the header content after the scheme and delimiter.
    ///
    /// # Errors
    ///
    /// Returns an error when the credential is malformed or not valid. The
    /// error may wrap [`crate::ErrorStatusCoder`] or [`crate::ErrorHeaderer`]
    /// to shape the rejection response.
    async fn parse_and_validate(
        &self,
        parts: &Parts,
        scheme: &str,
        value: &str,
    ) -> Result<Token, BoxError>;
}

#[derive(Debug, thiserror::Error)]
pub enum BasicTokenError {
    #[error("could not decode credential: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("malformed credential")]
    Malformed,

    #[error("principal not found")]
    PrincipalNotFound,

    #[error("invalid key")]
    InvalidKey,
}

/// Validates `Basic` credentials against a fixed user to password map.
#[derive(Debug, Clone, Default)]
pub struct BasicTokenFactory {
    users: HashMap<String, String>,
}

impl BasicTokenFactory {
    #[must_use]
    pub fn new(users: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            users: users.into_iter().collect(),
        }
    }

    /// Decode and check a base64 `user:password` credential.
    ///
    /// # Errors
    ///
    /// Returns a [`BasicTokenError`] when the credential does not decode, has
    /// no `:` separator, names an unknown user, or carries the wrong password.
    pub fn validate(&self, value: &str) -> Result<Token, BasicTokenError> {
        let decoded = STANDARD.decode(value)?;
        let decoded = String::from_utf8(decoded).map_err(|_| BasicTokenError::Malformed)?;
        let (principal, password) = decoded.split_once(':').ok_or(BasicTokenError::Malformed)?;

        let expected = self
            .users
            .get(principal)
            .ok_or(BasicTokenError::PrincipalNotFound)?;
        if expected != password {
            return Err(BasicTokenError::InvalidKey);
        }

        Ok(Token::new("basic", principal, Attributes::new()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for BasicTokenFactory {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|(k, v)| (k.into(), v.into())))
    }
}

#[async_trait]
impl TokenFactory for BasicTokenFactory {
    async fn parse_and_validate(
        &self,
        _parts: &Parts,
        _scheme: &str,
        value: &str,
    ) -> Result<Token, BoxError> {
        Ok(self.validate(value)?)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use http::Request;

    use super::*;

    fn factory() -> BasicTokenFactory {
        [("codex", "codex")].into_iter().collect()
    }

    #[test]
    fn valid_credential() {
        let token = factory().validate("Y29kZXg6Y29kZXg=").unwrap();
        assert_eq!(token.token_type(), "basic");
        assert_eq!(token.principal(), "codex");
        assert!(token.attributes().is_some_and(Attributes::is_empty));
    }

    #[test]
    fn invalid_credentials() {
        let f = factory();
        assert!(matches!(f.validate("AFJDK"), Err(BasicTokenError::Decode(_))));
        // "codex"
        assert!(matches!(f.validate("Y29kZXg="), Err(BasicTokenError::Malformed)));
        // "user:pass"
        assert!(matches!(
            f.validate("dXNlcjpwYXNz"),
            Err(BasicTokenError::PrincipalNotFound)
        ));
        // "codex:nope"
        assert!(matches!(
            f.validate("Y29kZXg6bm9wZQ=="),
            Err(BasicTokenError::InvalidKey)
        ));
    }

    #[tokio::test]
    async fn factory_trait_delegates() {
        let (parts, ()) = Request::new(()).into_parts();
        let f: &dyn TokenFactory = &factory();
        assert!(f.parse_and_validate(&parts, "Basic", "Y29kZXg6Y29kZXg=").await.is_ok());
        assert!(f.parse_and_validate(&parts, "Basic", "nope").await.is_err());
    }
}
