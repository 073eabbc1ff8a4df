#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Core authorization primitives: tokens, the request authentication
//! envelope, the validator chain and the reason-carrying error taxonomy.

pub mod attributes;
pub mod authentication;
pub mod error;
pub mod token;
pub mod validator;

pub use attributes::{Attributes, StringListError, as_string_list, get_nested_attribute};
pub use authentication::{Authentication, RequestInfo};
pub use error::{BoxError, CheckError, ReasonError, ValidationErrors, reason_of, reasons};
pub use token::Token;
pub use validator::{Validator, Validators};
