//! Tag observations and decoding.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use super::operation::OperationResult;

/// A single tag sighting as reported by a reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// EPC bank contents, hex encoded.
    pub epc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tid: Option<String>,
    /// Name of the logical reader that saw the tag.
    pub reader: String,
    #[serde(default)]
    pub antenna: u16,
    pub seen_at: DateTime<Utc>,
    /// Number of raw reads folded into this sighting.
    #[serde(default = "default_count")]
    pub count: u32,
    /// Results of operations executed during the inventory.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<OperationResult>,
}

fn default_count() -> u32 {
    1
}

impl Tag {
    pub fn new(reader: impl Into<String>, epc: impl Into<String>) -> Self {
        Self {
            epc: epc.into(),
            tid: None,
            reader: reader.into(),
            antenna: 1,
            seen_at: Utc::now(),
            count: 1,
            results: Vec::new(),
        }
    }

    pub fn with_tid(mut self, tid: impl Into<String>) -> Self {
        self.tid = Some(tid.into());
        self
    }

    pub fn with_antenna(mut self, antenna: u16) -> Self {
        self.antenna = antenna;
        self
    }

    pub fn with_results(mut self, results: Vec<OperationResult>) -> Self {
        self.results = results;
        self
    }
}

/// Fields a primary key can be built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyField {
    Epc,
    Tid,
    Identity,
    Reader,
    Antenna,
}

type IdentityResolver = Arc<dyn Fn(&Tag) -> String + Send + Sync>;

/// A tag together with its lazily resolved semantic identity.
///
/// The identity (typically a pure-identity EPC URI) is only computed the
/// first time it is asked for, since most sightings are dropped as
/// duplicates before anybody looks at it.
#[derive(Clone)]
pub struct DecodedTag {
    tag: Tag,
    identity: OnceCell<String>,
    resolver: IdentityResolver,
}

impl DecodedTag {
    pub fn new<F>(tag: Tag, resolver: F) -> Self
    where
        F: Fn(&Tag) -> String + Send + Sync + 'static,
    {
        Self {
            tag,
            identity: OnceCell::new(),
            resolver: Arc::new(resolver),
        }
    }

    /// Decoded tag whose identity is the raw EPC.
    pub fn raw(tag: Tag) -> Self {
        Self::new(tag, |t| t.epc.clone())
    }

    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    pub fn into_tag(self) -> Tag {
        self.tag
    }

    pub fn identity(&self) -> &str {
        self.identity.get_or_init(|| (self.resolver)(&self.tag))
    }

    /// Build the primary key over `fields`. An empty field list keys by EPC.
    pub fn primary_key(&self, fields: &[KeyField]) -> String {
        if fields.is_empty() {
            return self.tag.epc.clone();
        }
        let parts: Vec<String> = fields
            .iter()
            .map(|field| match field {
                KeyField::Epc => self.tag.epc.clone(),
                KeyField::Tid => self.tag.tid.clone().unwrap_or_default(),
                KeyField::Identity => self.identity().to_string(),
                KeyField::Reader => self.tag.reader.clone(),
                KeyField::Antenna => self.tag.antenna.to_string(),
            })
            .collect();
        parts.join("|")
    }
}

impl fmt::Debug for DecodedTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedTag")
            .field("tag", &self.tag)
            .field("identity", &self.identity.get())
            .finish()
    }
}

/// Attaches a semantic identity to raw tags.
pub trait TagDecoder: Send + Sync {
    fn decode(&self, tag: Tag) -> DecodedTag;
}
