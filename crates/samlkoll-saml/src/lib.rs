#![forbid(unsafe_code)]

//! SAML 2.0 relying-party response validation.
//!
//! [`ResponseValidator`] takes a decoded `<samlp:Response>` and either
//! returns the [`AuthenticatedPrincipal`] it vouches for or a
//! [`ValidationFailure`] saying why it was refused. The individual checks
//! are exposed as well:
//!
//! - [`signature::verify`]: XML-DSig signatures and the trust chain
//! - [`conditions::check_conditions`]: validity window and audience
//! - [`confirmation::check_confirmation`]: bearer subject confirmation
//! - [`name_id::match_policy`]: NameID format and SP qualifier
//!
//! The only state kept across calls is the [`ReplayCache`].

pub mod conditions;
pub mod config;
pub mod confirmation;
pub mod error;
pub mod model;
pub mod name_id;
pub mod parse;
pub mod principal;
pub mod replay;
pub mod signature;
pub mod validator;

pub use config::{NameIdPolicy, TrustConfiguration};
pub use error::{ConfigError, FailureKind, ValidationFailure};
pub use model::{Assertion, NameId, Response, SubjectConfirmation};
pub use principal::AuthenticatedPrincipal;
pub use replay::{InMemoryReplayCache, ReplayCache};
pub use signature::SignatureReport;
pub use validator::{ResponseValidator, ValidationResult, ValidationStage};
