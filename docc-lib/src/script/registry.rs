//! The methods docscript knows about

use once_cell::sync::Lazy;
use std::collections::HashMap;

pub const PARAGRAPH: &str = "paragraph";
pub const QUOTE: &str = "quote";
pub const RANGE: &str = "range";
pub const CAT: &str = "cat";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    /// positional arguments, compiled to a vector
    Vector,
    /// named parameters, compiled to a parameter map
    Map,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub name: &'static str,
    pub style: Style,
    /// block methods end the running paragraph
    pub block: bool,
    pub required: &'static [&'static str],
}

impl Descriptor {
    const fn vector(name: &'static str, block: bool) -> Self {
        Self {
            name,
            style: Style::Vector,
            block,
            required: &[],
        }
    }

    const fn map(name: &'static str, block: bool, required: &'static [&'static str]) -> Self {
        Self {
            name,
            style: Style::Map,
            block,
            required,
        }
    }
}

const BLOCK: bool = true;
const INLINE: bool = false;

const METHODS: &[Descriptor] = &[
    Descriptor::vector(PARAGRAPH, BLOCK),
    Descriptor::vector(QUOTE, INLINE),
    Descriptor::vector(RANGE, INLINE),
    Descriptor::vector(CAT, INLINE),
    Descriptor::vector("h1", BLOCK),
    Descriptor::vector("h2", BLOCK),
    Descriptor::vector("h3", BLOCK),
    Descriptor::vector("h4", BLOCK),
    Descriptor::vector("h5", BLOCK),
    Descriptor::vector("h6", BLOCK),
    Descriptor::vector("toc", BLOCK),
    Descriptor::vector("note", BLOCK),
    Descriptor::vector("itemize", BLOCK),
    Descriptor::vector("enumerate", BLOCK),
    Descriptor::vector("blockquote", BLOCK),
    Descriptor::vector("b", INLINE),
    Descriptor::vector("bold", INLINE),
    Descriptor::vector("i", INLINE),
    Descriptor::vector("italic", INLINE),
    Descriptor::vector("tt", INLINE),
    Descriptor::vector("mono", INLINE),
    Descriptor::vector("em", INLINE),
    Descriptor::vector("sub", INLINE),
    Descriptor::vector("sup", INLINE),
    Descriptor::vector("strike", INLINE),
    Descriptor::vector("mark", INLINE),
    Descriptor::vector("kbd", INLINE),
    Descriptor::vector("fn", INLINE),
    Descriptor::vector("now", INLINE),
    Descriptor::map("header", BLOCK, &["title", "level", "tag"]),
    Descriptor::map("figure", BLOCK, &["caption", "source"]),
    Descriptor::map("code", BLOCK, &["source"]),
    Descriptor::map("table", BLOCK, &["source"]),
    Descriptor::map("alert", BLOCK, &["level"]),
    Descriptor::map("meta", BLOCK, &[]),
    Descriptor::map("def", BLOCK, &[]),
    Descriptor::map("link", INLINE, &["text", "url"]),
    Descriptor::map("ref", INLINE, &["id"]),
    Descriptor::map("color", INLINE, &["value"]),
];

static REGISTRY: Lazy<HashMap<&'static str, &'static Descriptor>> =
    Lazy::new(|| METHODS.iter().map(|m| (m.name, m)).collect());

pub fn lookup_method(name: &str) -> Option<&'static Descriptor> {
    REGISTRY.get(name).copied()
}

/// true for registered block methods, unknown names are inline
pub fn is_block(name: &str) -> bool {
    lookup_method(name).map_or(false, |m| m.block)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let header = lookup_method("header").unwrap();
        assert_eq!(header.style, Style::Map);
        assert_eq!(header.required, &["title", "level", "tag"]);
        assert!(is_block("h3"));
        assert!(!is_block("b"));
        assert!(!is_block("unheard_of"));
        assert_eq!(lookup_method("link").unwrap().style, Style::Map);
        assert!(lookup_method("Link").is_none());
    }
}
