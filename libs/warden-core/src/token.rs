use crate::attributes::Attributes;

/// An authenticated identity produced by a token factory.
///
/// Tokens are immutable once built. A token created with [`Token::new`] always
/// exposes an attribute bag (possibly empty); [`Token::without_attributes`]
/// models an upstream decoder that produced no attributes at all, which
/// downstream checks report separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    kind: String,
    principal: String,
    attributes: Option<Attributes>,
}

impl Token {
    #[must_use]
    pub fn new(
        token_type: impl Into<String>,
        principal: impl Into<String>,
        attributes: Attributes,
    ) -> Self {
        Self {
            kind: token_type.into(),
            principal: principal.into(),
            attributes: Some(attributes),
        }
    }

    #[must_use]
    pub fn without_attributes(token_type: impl Into<String>, principal: impl Into<String>) -> Self {
        Self {
            kind: token_type.into(),
            principal: principal.into(),
            attributes: None,
        }
    }

    /// Authentication scheme tag, e.g. `"jwt"` or `"basic"`.
    #[must_use]
    pub fn token_type(&self) -> &str {
        &self.kind
    }

    /// Caller identity. An empty string means "no principal" and is not an error.
    #[must_use]
    pub fn principal(&self) -> &str {
        &self.principal
    }

    #[must_use]
    pub fn attributes(&self) -> Option<&Attributes> {
        self.attributes.as_ref()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn token_exposes_fields() {
        let attrs: Attributes = [("sub", json!("abc"))].into_iter().collect();
        let token = Token::new("jwt", "client-1", attrs.clone());

        assert_eq!(token.token_type(), "jwt");
        assert_eq!(token.principal(), "client-1");
        assert_eq!(token.attributes(), Some(&attrs));
    }

    #[test]
    fn empty_attributes_are_present_not_absent() {
        let token = Token::new("basic", "", Attributes::new());
        assert!(token.attributes().is_some_and(Attributes::is_empty));
        assert_eq!(token.principal(), "");

        let bare = Token::without_attributes("basic", "user");
        assert!(bare.attributes().is_none());
    }
}
