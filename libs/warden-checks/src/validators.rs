//! Token shape validators.

use std::collections::HashSet;

use http::Extensions;
use warden_core::{BoxError, CheckError, Token, Validator};

/// Accepts every token.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Validator for AllowAll {
    fn check(&self, _ctx: &Extensions, _token: &Token) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Rejects tokens whose type is empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonEmptyType;

impl Validator for NonEmptyType {
    fn check(&self, _ctx: &Extensions, token: &Token) -> Result<(), BoxError> {
        if token.token_type().is_empty() {
            return Err(Box::new(CheckError::EmptyType));
        }
        Ok(())
    }
}

/// Accepts only the listed token types. Matching is exact.
#[derive(Debug, Clone, Default)]
pub struct ValidType {
    types: HashSet<String>,
}

impl ValidType {
    #[must_use]
    pub fn new<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            types: types.into_iter().map(Into::into).collect(),
        }
    }
}

impl Validator for ValidType {
    fn check(&self, _ctx: &Extensions, token: &Token) -> Result<(), BoxError> {
        if self.types.contains(token.token_type()) {
            return Ok(());
        }
        Err(Box::new(CheckError::InvalidType {
            token_type: token.token_type().to_owned(),
        }))
    }
}

/// Rejects tokens without a principal.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonEmptyPrincipal;

impl Validator for NonEmptyPrincipal {
    fn check(&self, _ctx: &Extensions, token: &Token) -> Result<(), BoxError> {
        if token.principal().is_empty() {
            return Err(Box::new(CheckError::EmptyPrincipal));
        }
        Ok(())
    }
}
