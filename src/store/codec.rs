//! Content codecs.

use super::Codec;

/// Passes content through unchanged in both directions.
///
/// Suitable when records already hold Markdown.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityCodec;

impl Codec for IdentityCodec {
    fn to_portable(&self, content: &str) -> String {
        content.to_string()
    }

    fn from_portable(&self, text: &str) -> String {
        text.to_string()
    }
}
