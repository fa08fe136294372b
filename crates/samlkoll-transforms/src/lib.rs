#![forbid(unsafe_code)]

//! Transform pipeline engine for samlkoll.
//!
//! Implements the transform chain model from XML-DSig: each reference
//! contains a sequence of transforms that are applied in order. Only the
//! transforms a SAML signature may carry are supported.

pub mod c14n;
pub mod enveloped;
pub mod pipeline;

pub use c14n::C14nTransform;
pub use enveloped::EnvelopedSignatureTransform;
pub use pipeline::{Transform, TransformData, TransformPipeline};
