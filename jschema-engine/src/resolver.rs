//! Reference resolution across schema documents
//!
//! The resolver owns every document a validation session can reach: the
//! documents registered at build time, the bundled meta-schemas, and anything
//! fetched through the caller-supplied resolver callback. Lookup is by
//! absolute URI with the fragment stripped; embedded resources register
//! their `$id` URIs here too, so a reference can land inside another
//! document's subtree without a separate walk.
//!
//! Resolution order is fixed: session documents, then bundled meta-schemas,
//! then the caller's callback. A miss everywhere is `UnknownRef`.

use crate::document::SchemaDocument;
use crate::metaschemas;
use indexmap::IndexMap;
use jschema_core::config::RefResolver;
use jschema_core::draft::Draft;
use jschema_core::error::{Result, SchemaError};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;
use url::Url;

pub struct Resolver {
    documents: Mutex<IndexMap<String, Arc<SchemaDocument>>>,
    external: Option<RefResolver>,
    default_draft: Draft,
}

/// A URI with any fragment removed, the granularity documents are keyed at
fn document_uri(uri: &Url) -> Url {
    let mut stripped = uri.clone();
    stripped.set_fragment(None);
    stripped
}

/// Decode percent-escapes in a URI fragment
fn percent_decode(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(byte) = hex.and_then(|hex| u8::from_str_radix(hex, 16).ok()) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8(out).unwrap_or_else(|_| text.to_string())
}

impl Resolver {
    #[must_use]
    pub fn new(external: Option<RefResolver>, default_draft: Draft) -> Self {
        Resolver {
            documents: Mutex::new(IndexMap::new()),
            external,
            default_draft,
        }
    }

    /// Register a pre-walked document under its canonical URI and every
    /// embedded `$id` it declares
    ///
    /// The first document registered for a URI stays; later registrations
    /// of the same URI are ignored.
    pub fn register(&self, document: &Arc<SchemaDocument>) {
        let mut documents = self.documents.lock();
        documents
            .entry(document_uri(&document.uri).as_str().to_string())
            .or_insert_with(|| Arc::clone(document));
        for id in document.ids.keys() {
            documents
                .entry(id.clone())
                .or_insert_with(|| Arc::clone(document));
        }
    }

    /// Resolve a raw reference against its base to a document and a pointer
    /// within it
    ///
    /// Handles all three fragment shapes: none/empty (the resource root), a
    /// JSON pointer (relative to the resource root, percent-decoded), and a
    /// plain-name anchor. Unresolvable targets are `UnknownRef`.
    pub fn resolve_target(&self, base: &Url, raw: &str) -> Result<(Arc<SchemaDocument>, String)> {
        let absolute = base.join(raw).map_err(|err| SchemaError::InvalidUri {
            uri: raw.to_string(),
            message: err.to_string(),
        })?;
        let fragment = absolute.fragment().map(str::to_string);
        let key = document_uri(&absolute);
        let document = self.resolve(&key)?;

        // References can land on an embedded resource's $id; pointers in the
        // fragment are then relative to that resource's root
        let resource_pointer = if key.as_str() == document.uri.as_str() {
            String::new()
        } else {
            document
                .ids
                .get(key.as_str())
                .cloned()
                .ok_or_else(|| SchemaError::unknown_ref(absolute.as_str()))?
        };

        match fragment.as_deref() {
            None | Some("") => Ok((document, resource_pointer)),
            Some(fragment) if fragment.starts_with('/') => {
                let pointer = format!("{resource_pointer}{}", percent_decode(fragment));
                if document.value_at(&pointer).is_none() {
                    return Err(SchemaError::unknown_ref(absolute.as_str()));
                }
                Ok((document, pointer))
            }
            Some(anchor) => {
                let anchor = percent_decode(anchor);
                let pointer = document
                    .anchor_pointer(key.as_str(), &anchor)
                    .ok_or_else(|| SchemaError::unknown_ref(absolute.as_str()))?;
                Ok((Arc::clone(&document), pointer.to_string()))
            }
        }
    }

    /// Resolve a fragment-less document URI to a walked document
    pub fn resolve(&self, uri: &Url) -> Result<Arc<SchemaDocument>> {
        let key = document_uri(uri);
        if let Some(found) = self.documents.lock().get(key.as_str()) {
            return Ok(Arc::clone(found));
        }

        if let Some(raw) = metaschemas::lookup(key.as_str()) {
            debug!(uri = %key, "loading bundled meta-schema");
            let value = serde_json::from_str(raw).map_err(|err| {
                SchemaError::invalid_schema(format!("bundled meta-schema: {err}"))
            })?;
            let document = Arc::new(SchemaDocument::build(
                key.clone(),
                value,
                self.default_draft,
            )?);
            self.register(&document);
            return Ok(document);
        }

        if let Some(external) = &self.external {
            if let Some(value) = external(&key) {
                debug!(uri = %key, "resolved external document");
                let document = Arc::new(SchemaDocument::build(
                    key.clone(),
                    value,
                    self.default_draft,
                )?);
                self.register(&document);
                return Ok(document);
            }
        }

        Err(SchemaError::unknown_ref(key.as_str()))
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field(
                "documents",
                &self.documents.lock().keys().collect::<Vec<_>>(),
            )
            .field("external", &self.external.is_some())
            .field("default_draft", &self.default_draft)
            .finish()
    }
}
