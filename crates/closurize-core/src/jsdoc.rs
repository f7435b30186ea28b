//! Structured comment model
//!
//! ARCHITECTURE: In-memory representation of `@tag`-style comment
//! annotations plus the serializer that turns a tag list back into a
//! block comment. Parsing and printing are exact inverses at the tag
//! level so a transformed file can be re-read without drift.

use regex::Regex;
use std::sync::OnceLock;

/// A single structured comment annotation.
///
/// A tag with an empty `name` contributes only free text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tag {
    /// Short identifier (`type`, `param`, `return`, ...); empty for free text.
    pub name: String,
    /// Type string in the annotation dialect, printed inside `{...}`.
    pub type_str: Option<String>,
    /// Parameter name, for `param` tags.
    pub parameter_name: Option<String>,
    /// Free-form trailing text.
    pub text: Option<String>,
    /// Parameter may be omitted; printed as `{T=}`.
    pub optional: bool,
    /// Parameter is variadic; printed as `{...T}`.
    pub rest_param: bool,
    /// Parameter binding was a destructuring pattern (name is synthesized).
    pub destructuring: bool,
}

impl Tag {
    /// A bare marker tag such as `@abstract` or `@struct`.
    pub fn marker(name: &str) -> Self {
        Tag {
            name: name.to_string(),
            ..Tag::default()
        }
    }

    /// A `@name {type}` tag.
    pub fn typed(name: &str, type_str: impl Into<String>) -> Self {
        Tag {
            name: name.to_string(),
            type_str: Some(type_str.into()),
            ..Tag::default()
        }
    }

    /// A free-text tag.
    pub fn text(text: impl Into<String>) -> Self {
        Tag {
            text: Some(text.into()),
            ..Tag::default()
        }
    }

    /// A `@param {type} name` tag.
    pub fn param(parameter_name: impl Into<String>, type_str: impl Into<String>) -> Self {
        Tag {
            name: "param".to_string(),
            type_str: Some(type_str.into()),
            parameter_name: Some(parameter_name.into()),
            ..Tag::default()
        }
    }
}

/// Tags that may not coexist with a composite `@type` comment on the same
/// declaration. Dropped on serialization when the caller asks for it.
pub const TAGS_CONFLICTING_WITH_TYPE: &[&str] = &[
    "param", "return", "this", "typedef", "template", "private", "protected", "public", "export",
];

/// Tags the downstream dialect understands and that survive re-serialization
/// of a pre-existing comment untouched.
const TAGS_ALLOWED: &[&str] = &[
    "author",
    "const",
    "copyright",
    "define",
    "deprecated",
    "desc",
    "dict",
    "export",
    "final",
    "hidden",
    "license",
    "nocollapse",
    "nosideeffects",
    "package",
    "preserve",
    "see",
    "struct",
    "suppress",
    "unrestricted",
];

/// Tags that collide with the annotations this tool generates; they are
/// removed outright when a comment is re-serialized.
const TAGS_BANNED: &[&str] = &[
    "abstract",
    "augments",
    "class",
    "constructor",
    "enum",
    "extends",
    "implements",
    "interface",
    "lends",
    "param",
    "private",
    "protected",
    "public",
    "record",
    "return",
    "returns",
    "template",
    "this",
    "type",
    "typedef",
];

// ============================================================================
// Parsing
// ============================================================================

#[allow(clippy::expect_used)] // pattern is a compile-time constant
fn tag_start_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^@(\w+)\s*").expect("static regex"))
}

/// Parse a `/** ... */` block into tags.
///
/// Returns `None` when the text is not a structured comment. Free text
/// before the first `@tag` line becomes a nameless text tag; text on or
/// after a tag line accumulates into that tag's `text`.
pub fn parse(comment: &str) -> Option<Vec<Tag>> {
    let body = comment
        .strip_prefix("/**")
        .and_then(|c| c.strip_suffix("*/"))?;

    let mut tags: Vec<Tag> = Vec::new();
    let mut current: Option<Tag> = None;

    for raw_line in body.lines() {
        let line = raw_line.trim().trim_start_matches('*').trim();
        if line.is_empty() {
            continue;
        }
        if let Some(caps) = tag_start_re().captures(line) {
            if let Some(tag) = current.take() {
                tags.push(tag);
            }
            let name = caps[1].to_string();
            let mut rest = line[caps.get(0).map_or(0, |m| m.end())..].trim();

            let mut tag = Tag {
                name,
                ..Tag::default()
            };

            if rest.starts_with('{') {
                if let Some((inner, after)) = take_braced(rest) {
                    let mut ty = inner.trim();
                    if let Some(stripped) = ty.strip_prefix("...") {
                        tag.rest_param = true;
                        ty = stripped.trim();
                    }
                    if let Some(stripped) = ty.strip_suffix('=') {
                        tag.optional = true;
                        ty = stripped.trim();
                    }
                    tag.type_str = Some(ty.to_string());
                    rest = after.trim();
                }
            }
            if tag.name == "param" {
                if let Some(word) = rest.split_whitespace().next() {
                    tag.parameter_name = Some(word.to_string());
                    rest = rest[word.len()..].trim();
                }
            }
            if !rest.is_empty() {
                tag.text = Some(rest.to_string());
            }
            current = Some(tag);
        } else if let Some(tag) = current.as_mut() {
            match tag.text.as_mut() {
                Some(text) => {
                    text.push(' ');
                    text.push_str(line);
                }
                None => tag.text = Some(line.to_string()),
            }
        } else {
            match tags.last_mut().filter(|t| t.name.is_empty()) {
                Some(free) => {
                    if let Some(text) = free.text.as_mut() {
                        text.push(' ');
                        text.push_str(line);
                    }
                }
                None => tags.push(Tag::text(line)),
            }
        }
    }
    if let Some(tag) = current.take() {
        tags.push(tag);
    }
    Some(tags)
}

/// Split `{balanced braces}rest`, honoring nested braces.
fn take_braced(s: &str) -> Option<(&str, &str)> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some((&s[1..i], &s[i + 1..]));
                }
            }
            _ => {}
        }
    }
    None
}

// ============================================================================
// Serialization
// ============================================================================

/// Escape comment metacharacters so arbitrary text can live in a block
/// comment without terminating it.
pub fn escape_comment_text(text: &str) -> String {
    text.replace("/*", "/\\*").replace("*/", "*\\/")
}

fn tag_to_string(tag: &Tag) -> String {
    if tag.name.is_empty() {
        return tag.text.clone().unwrap_or_default();
    }
    let mut out = format!("@{}", tag.name);
    if let Some(ty) = &tag.type_str {
        out.push_str(" {");
        if tag.rest_param {
            out.push_str("...");
        }
        out.push_str(ty);
        if tag.optional {
            out.push('=');
        }
        out.push('}');
    }
    if let Some(name) = &tag.parameter_name {
        out.push(' ');
        out.push_str(name);
    }
    if let Some(text) = &tag.text {
        out.push(' ');
        out.push_str(text);
    }
    out
}

/// Serialize tags into a block comment.
///
/// Contract from the comment-printer interface: when `drop_conflicting`
/// is set and the list carries a `type` tag, every tag named in
/// [`TAGS_CONFLICTING_WITH_TYPE`] is removed before printing. A single
/// surviving tag prints on one line with no trailing newline; more print
/// as a multi-line block, one `@tag` per line, in insertion order.
pub fn serialize(tags: &[Tag], drop_conflicting: bool) -> String {
    let has_type = tags.iter().any(|t| t.name == "type");
    let kept: Vec<&Tag> = tags
        .iter()
        .filter(|t| {
            !(drop_conflicting && has_type && TAGS_CONFLICTING_WITH_TYPE.contains(&t.name.as_str()))
        })
        .collect();

    if kept.is_empty() {
        return String::new();
    }
    if kept.len() == 1 && !kept[0].text.as_deref().is_some_and(|t| t.contains('\n')) {
        return format!("/** {} */", tag_to_string(kept[0]));
    }
    let mut out = String::from("/**\n");
    for tag in kept {
        out.push_str(" * ");
        out.push_str(&tag_to_string(tag));
        out.push('\n');
    }
    out.push_str(" */");
    out
}

// ============================================================================
// Illegal-tag policy
// ============================================================================

/// Re-serialization policy for comments the tool did not author.
///
/// Tags the dialect recognizes pass through; tags that collide with the
/// generated annotations are removed; anything else is downgraded to
/// escaped free text so no information is silently lost.
pub fn escape_illegal_tags(tags: Vec<Tag>) -> Vec<Tag> {
    tags.into_iter()
        .filter_map(|tag| {
            if tag.name.is_empty() || TAGS_ALLOWED.contains(&tag.name.as_str()) {
                Some(tag)
            } else if TAGS_BANNED.contains(&tag.name.as_str()) {
                None
            } else {
                let mut text = format!("\\@{}", tag.name);
                if let Some(extra) = &tag.text {
                    text.push(' ');
                    text.push_str(extra);
                }
                Some(Tag::text(escape_comment_text(&text)))
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_single_tag_inline() {
        let tags = vec![Tag::typed("type", "string")];
        assert_eq!(serialize(&tags, false), "/** @type {string} */");
    }

    #[test]
    fn test_serialize_multiline() {
        let tags = vec![
            Tag::marker("abstract"),
            Tag::param("x", "number"),
            Tag::typed("return", "string"),
        ];
        assert_eq!(
            serialize(&tags, false),
            "/**\n * @abstract\n * @param {number} x\n * @return {string}\n */"
        );
    }

    #[test]
    fn test_serialize_drops_conflicting_with_type() {
        let tags = vec![
            Tag::typed("type", "number"),
            Tag::param("x", "number"),
            Tag::marker("export"),
            Tag::marker("deprecated"),
        ];
        let out = serialize(&tags, true);
        assert!(out.contains("@type"));
        assert!(!out.contains("@param"));
        assert!(!out.contains("@export"));
        assert!(out.contains("@deprecated"));
    }

    #[test]
    fn test_param_flags() {
        let mut rest = Tag::param("xs", "string");
        rest.rest_param = true;
        let mut opt = Tag::param("y", "number");
        opt.optional = true;
        let out = serialize(&[rest, opt], false);
        assert!(out.contains("@param {...string} xs"));
        assert!(out.contains("@param {number=} y"));
    }

    #[test]
    fn test_parse_round_trip() {
        let tags = vec![
            Tag::text("Frobnicates widgets."),
            Tag::param("x", "(number|string)"),
            Tag::typed("return", "void"),
        ];
        let serialized = serialize(&tags, false);
        let parsed = parse(&serialized).unwrap();
        assert_eq!(parsed, tags);
    }

    #[test]
    fn test_parse_nested_braces() {
        let parsed = parse("/** @type {!Map<string, {a: number}>} */").unwrap();
        assert_eq!(
            parsed[0].type_str.as_deref(),
            Some("!Map<string, {a: number}>")
        );
    }

    #[test]
    fn test_parse_rejects_plain_comment() {
        assert!(parse("// line").is_none());
        assert!(parse("/* plain */").is_none());
    }

    #[test]
    fn test_escape_illegal_tags() {
        let tags = vec![
            Tag::typed("type", "string"),
            Tag::marker("export"),
            Tag::marker("customThing"),
        ];
        let escaped = escape_illegal_tags(tags);
        assert_eq!(escaped.len(), 2);
        assert_eq!(escaped[0].name, "export");
        assert_eq!(escaped[1].text.as_deref(), Some("\\@customThing"));
    }

    #[test]
    fn test_escape_comment_text() {
        assert_eq!(escape_comment_text("a */ b /* c"), "a *\\/ b /\\* c");
    }
}
