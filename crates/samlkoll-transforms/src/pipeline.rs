#![forbid(unsafe_code)]

//! Transform pipeline and trait definitions.

use crate::c14n::C14nTransform;
use crate::enveloped::EnvelopedSignatureTransform;
use samlkoll_core::{algorithm, ns, Error};
use samlkoll_xml::document::child_elements;
use samlkoll_xml::NodeSet;

/// Data flowing through the transform pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformData {
    /// A node set over the document being verified.
    Xml { node_set: NodeSet },
    /// Octets, the output of a canonicalization transform.
    Binary(Vec<u8>),
}

impl TransformData {
    /// Convert to octets, applying inclusive C14N 1.0 to a node set.
    pub fn to_binary(self, doc: &roxmltree::Document<'_>) -> Result<Vec<u8>, Error> {
        match self {
            TransformData::Binary(data) => Ok(data),
            TransformData::Xml { node_set } => samlkoll_c14n::canonicalize_doc(
                doc,
                samlkoll_c14n::C14nMode::Inclusive,
                Some(&node_set),
                &[],
            ),
        }
    }
}

/// Trait for individual transforms.
pub trait Transform: Send {
    /// The algorithm URI for this transform.
    fn uri(&self) -> &str;

    /// Execute the transform on data taken from `doc`.
    fn execute(
        &self,
        doc: &roxmltree::Document<'_>,
        input: TransformData,
    ) -> Result<TransformData, Error>;
}

/// A pipeline of transforms executed in sequence.
#[derive(Default)]
pub struct TransformPipeline {
    transforms: Vec<Box<dyn Transform>>,
}

impl TransformPipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the pipeline named by a `<ds:Transforms>` element.
    ///
    /// `signature` is the `<Signature>` the reference belongs to; the
    /// enveloped-signature transform removes it.
    pub fn from_transforms_node(
        transforms: roxmltree::Node<'_, '_>,
        signature: roxmltree::Node<'_, '_>,
    ) -> Result<Self, Error> {
        let mut pipeline = Self::new();
        for t in child_elements(transforms, ns::DSIG, ns::node::TRANSFORM) {
            let uri = t
                .attribute(ns::attr::ALGORITHM)
                .ok_or_else(|| Error::MissingAttribute("Transform/@Algorithm".into()))?;
            if uri == algorithm::ENVELOPED_SIGNATURE {
                pipeline.push(Box::new(EnvelopedSignatureTransform::new(signature.id())));
            } else if let Some(mode) = samlkoll_c14n::C14nMode::from_uri(uri) {
                pipeline.push(Box::new(C14nTransform::from_node(mode, t)));
            } else {
                return Err(Error::UnsupportedAlgorithm(format!("transform: {uri}")));
            }
        }
        Ok(pipeline)
    }

    /// Add a transform to the pipeline.
    pub fn push(&mut self, transform: Box<dyn Transform>) {
        self.transforms.push(transform);
    }

    /// Execute all transforms in order.
    pub fn execute(
        &self,
        doc: &roxmltree::Document<'_>,
        input: TransformData,
    ) -> Result<TransformData, Error> {
        let mut data = input;
        for transform in &self.transforms {
            data = transform.execute(doc, data)?;
        }
        Ok(data)
    }

    /// Algorithm URIs in pipeline order.
    pub fn uris(&self) -> Vec<&str> {
        self.transforms.iter().map(|t| t.uri()).collect()
    }

    /// Number of transforms in the pipeline.
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    /// Check if pipeline is empty.
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}
