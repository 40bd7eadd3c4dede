//! Content decoders.
//!
//! A [`Decoder`] turns a file on disk into an opaque JSON payload plus a
//! status. Decoders are synchronous and are expected to run on a blocking
//! thread; the pipeline turns any error or panic escaping one into an
//! `error` result for that file.

mod document;
mod image;
mod structure;
mod text;

pub use self::document::DocumentDecoder;
pub use self::image::ImageDecoder;
pub use self::text::{Decoding, TextDecoder, TextEncoding, decode_bytes, decode_inline};
use crate::error::Result;
use crate::models::{Capability, Status};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;

/// Content extracted from one file.
#[derive(Clone, Debug, PartialEq)]
pub struct Decoded {
    pub content: Value,
    pub status: Status,
    pub error_message: Option<String>,
}

impl Decoded {
    pub fn success(content: Value) -> Self {
        Self { content, status: Status::Success, error_message: None }
    }

    pub fn partial(content: Value, message: impl Into<String>) -> Self {
        Self { content, status: Status::Partial, error_message: Some(message.into()) }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self { content: Value::Null, status: Status::Error, error_message: Some(message.into()) }
    }
}

/// Decodes the content of one kind of file.
pub trait Decoder: Debug + Send + Sync {
    fn decode(&self, path: &Path) -> Result<Decoded>;
}

/// Maps each capability to the decoder that handles it.
///
/// [`Decoders::default`] wires up the built-in decoders. Individual entries
/// can be replaced with [`Decoders::with`].
#[derive(Clone, Debug)]
pub struct Decoders {
    decoders: HashMap<Capability, Arc<dyn Decoder>>,
}

impl Default for Decoders {
    fn default() -> Self {
        Self::empty()
            .with(Capability::TextLike, TextDecoder)
            .with(Capability::Document, DocumentDecoder)
            .with(Capability::Image, ImageDecoder)
    }
}

impl Decoders {
    /// A registry with nothing registered.
    pub fn empty() -> Self {
        Self { decoders: HashMap::new() }
    }

    /// Register (or replace) the decoder for `capability`.
    pub fn with(mut self, capability: Capability, decoder: impl Decoder + 'static) -> Self {
        self.decoders.insert(capability, Arc::new(decoder));
        self
    }

    pub fn get(&self, capability: Capability) -> Option<Arc<dyn Decoder>> {
        self.decoders.get(&capability).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[derive(Debug)]
    struct Refuses;

    impl Decoder for Refuses {
        fn decode(&self, _path: &Path) -> Result<Decoded> {
            exn::bail!(ErrorKind::Decode("refused".to_string()))
        }
    }

    #[test]
    fn default_registry_covers_leaf_capabilities() {
        let decoders = Decoders::default();
        assert!(decoders.get(Capability::TextLike).is_some());
        assert!(decoders.get(Capability::Document).is_some());
        assert!(decoders.get(Capability::Image).is_some());
        assert!(decoders.get(Capability::Container).is_none());
        assert!(decoders.get(Capability::Unknown).is_none());
    }

    #[test]
    fn entries_can_be_replaced() {
        let decoders = Decoders::default().with(Capability::TextLike, Refuses);
        let err = decoders.get(Capability::TextLike).unwrap().decode(Path::new("x.txt")).unwrap_err();
        assert_eq!(*err, ErrorKind::Decode("refused".to_string()));
    }
}
