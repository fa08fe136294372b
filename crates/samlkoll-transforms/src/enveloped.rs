#![forbid(unsafe_code)]

//! Enveloped signature transform.
//!
//! Removes the `<Signature>` element being verified from the node set.

use crate::pipeline::{Transform, TransformData};
use samlkoll_core::{algorithm, Error};

/// Removes one `<Signature>` subtree from the node set.
pub struct EnvelopedSignatureTransform {
    signature: roxmltree::NodeId,
}

impl EnvelopedSignatureTransform {
    pub fn new(signature: roxmltree::NodeId) -> Self {
        Self { signature }
    }
}

impl Transform for EnvelopedSignatureTransform {
    fn uri(&self) -> &str {
        algorithm::ENVELOPED_SIGNATURE
    }

    fn execute(
        &self,
        doc: &roxmltree::Document<'_>,
        input: TransformData,
    ) -> Result<TransformData, Error> {
        match input {
            TransformData::Xml { mut node_set } => {
                let sig = doc.get_node(self.signature).ok_or_else(|| {
                    Error::Transform("enveloped signature node not in document".into())
                })?;
                node_set.remove_subtree(sig);
                Ok(TransformData::Xml { node_set })
            }
            TransformData::Binary(_) => Err(Error::Transform(
                "enveloped-signature transform requires XML input".into(),
            )),
        }
    }
}
