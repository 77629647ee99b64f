//! Raw-EPC tag decoder.

use ale_protocols::{DecodedTag, Tag, TagDecoder};

/// Resolves identities to `urn:epc:raw:<bits>.x<EPC>` URIs.
#[derive(Debug, Default, Clone)]
pub struct UriDecoder;

impl UriDecoder {
    pub fn new() -> Self {
        Self
    }

    pub fn identity(tag: &Tag) -> String {
        format!("urn:epc:raw:{}.x{}", tag.epc.len() * 4, tag.epc.to_uppercase())
    }
}

impl TagDecoder for UriDecoder {
    fn decode(&self, tag: Tag) -> DecodedTag {
        DecodedTag::new(tag, Self::identity)
    }
}
