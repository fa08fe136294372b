#![forbid(unsafe_code)]

//! DSig context: holds keys and configuration for signature operations.

use samlkoll_keys::KeysManager;

/// Context for XML-DSig operations.
pub struct DsigContext {
    /// Keys manager for key lookup and trust anchors.
    pub keys_manager: KeysManager,
    /// Attribute names treated as IDs when resolving references.
    pub id_attrs: Vec<String>,
    /// Accept SHA-1 digests and signatures.
    pub allow_sha1: bool,
    /// Instant at which embedded certificates must be valid; the system
    /// clock when `None`.
    pub verification_time: Option<der::DateTime>,
}

impl DsigContext {
    /// Create a new DSig context with the given keys manager.
    pub fn new(keys_manager: KeysManager) -> Self {
        Self {
            keys_manager,
            id_attrs: vec!["ID".to_owned(), "Id".to_owned()],
            allow_sha1: false,
            verification_time: None,
        }
    }

    pub fn with_allow_sha1(mut self, allow: bool) -> Self {
        self.allow_sha1 = allow;
        self
    }

    pub fn with_verification_time(mut self, time: der::DateTime) -> Self {
        self.verification_time = Some(time);
        self
    }

    pub(crate) fn id_attr_names(&self) -> Vec<&str> {
        self.id_attrs.iter().map(String::as_str).collect()
    }
}
