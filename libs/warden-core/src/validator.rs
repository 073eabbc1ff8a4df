//! Validator chain.
//!
//! A [`Validator`] is one authorization predicate over the request-scoped
//! context and the request's token. [`Validators`] runs an ordered list of
//! them to completion and aggregates every failure, so a rejected request
//! can be diagnosed from a single log line even when several checks failed.

use std::fmt;
use std::sync::Arc;

use http::Extensions;

use crate::error::{BoxError, ValidationErrors};
use crate::token::Token;

/// A single authorization predicate.
///
/// Implementations must not mutate the token and should return a
/// reason-carrying error (see [`crate::error::reason_of`]) on failure.
pub trait Validator: Send + Sync {
    /// Check the token against this validator.
    ///
    /// # Errors
    ///
    /// Returns an error describing why the token is not authorized.
    fn check(&self, ctx: &Extensions, token: &Token) -> Result<(), BoxError>;
}

impl<F> Validator for F
where
    F: Fn(&Extensions, &Token) -> Result<(), BoxError> + Send + Sync,
{
    fn check(&self, ctx: &Extensions, token: &Token) -> Result<(), BoxError> {
        self(ctx, token)
    }
}

/// An ordered chain of validators, itself a [`Validator`].
#[derive(Clone, Default)]
pub struct Validators(Vec<Arc<dyn Validator>>);

impl Validators {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a validator to the end of the chain.
    #[must_use]
    pub fn with(mut self, validator: impl Validator + 'static) -> Self {
        self.0.push(Arc::new(validator));
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Validators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validators")
            .field("len", &self.0.len())
            .finish()
    }
}

impl Validator for Validators {
    /// Run every validator; no short-circuit.
    ///
    /// Returns `Ok(())` when all pass, the failing validator's error unchanged
    /// when exactly one fails, and a [`ValidationErrors`] holding all failures
    /// in call order when more than one fails.
    fn check(&self, ctx: &Extensions, token: &Token) -> Result<(), BoxError> {
        let mut errors: Vec<BoxError> = self
            .0
            .iter()
            .filter_map(|v| v.check(ctx, token).err())
            .collect();

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(Box::new(ValidationErrors::new(errors))),
        }
    }
}
