use crate::ast::{Attr, AttrSet};
use crate::span::Span;

/// Parses an attribute set from the text between `{` and `}` inclusive.
///
/// Accepted items are `#id`, `.class`, `key=value` and `key="quoted value"`.
/// Returns `None` when any item is malformed; the caller then keeps the
/// braces as literal text instead of reporting an error.
pub fn parse_attr_set(text: &str, base_offset: usize) -> Option<AttrSet> {
    let trimmed = text.trim();
    if !trimmed.starts_with('{') || !trimmed.ends_with('}') || trimmed.len() < 2 {
        return None;
    }
    let inner = &trimmed[1..trimmed.len() - 1];

    let mut tokens = Vec::new();
    let mut in_quotes = false;
    let mut token_start = None;
    for (idx, ch) in inner.char_indices() {
        if ch == '"' {
            in_quotes = !in_quotes;
        }
        if ch.is_whitespace() && !in_quotes {
            if let Some(start) = token_start {
                tokens.push((start, idx));
                token_start = None;
            }
        } else if token_start.is_none() {
            token_start = Some(idx);
        }
    }
    if in_quotes {
        return None;
    }
    if let Some(start) = token_start {
        tokens.push((start, inner.len()));
    }

    let mut attrs = AttrSet {
        span: Some(Span::new(base_offset, base_offset + text.len())),
        items: Vec::new(),
    };
    for (start, end) in tokens {
        let token = &inner[start..end];
        if let Some(name) = token.strip_prefix('#') {
            if name.is_empty() || !is_valid_name(name) {
                return None;
            }
            attrs.items.push(Attr {
                key: "id".to_string(),
                value: name.to_string(),
            });
            continue;
        }
        if let Some(name) = token.strip_prefix('.') {
            if name.is_empty() || !is_valid_name(name) {
                return None;
            }
            attrs.items.push(Attr {
                key: "class".to_string(),
                value: name.to_string(),
            });
            continue;
        }
        let mut iter = token.splitn(2, '=');
        let key = iter.next().unwrap_or("");
        let Some(value) = iter.next() else {
            return None;
        };
        if key.is_empty() || !is_valid_name(key) {
            return None;
        }
        let value = if let Some(stripped) = value.strip_prefix('"') {
            stripped.strip_suffix('"')?
        } else if value.contains('"') {
            return None;
        } else {
            value
        };
        attrs.items.push(Attr {
            key: key.to_string(),
            value: value.to_string(),
        });
    }
    Some(attrs)
}

/// Attribute names and id/class shorthands share one alphabet.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | ':'))
}

#[cfg(test)]
mod tests {
    use super::parse_attr_set;

    #[test]
    fn shorthand_desugars_to_id_and_class() {
        let attrs = parse_attr_set("{#intro .wide .tall}", 0).unwrap();
        let pairs: Vec<(&str, &str)> = attrs
            .items
            .iter()
            .map(|item| (item.key.as_str(), item.value.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![("id", "intro"), ("class", "wide"), ("class", "tall")]
        );
    }

    #[test]
    fn quoted_values_keep_spaces() {
        let attrs = parse_attr_set("{title=\"a b c\"}", 0).unwrap();
        assert_eq!(attrs.get("title"), Some("a b c"));
    }

    #[test]
    fn malformed_sets_are_rejected_whole() {
        assert!(parse_attr_set("{#}", 0).is_none());
        assert!(parse_attr_set("{key}", 0).is_none());
        assert!(parse_attr_set("{key=\"unterminated}", 0).is_none());
        assert!(parse_attr_set("not braces", 0).is_none());
    }
}
