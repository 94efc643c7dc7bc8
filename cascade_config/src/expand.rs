//! `${NAME}` and `${NAME|default}` placeholder expansion.
//!
//! `$$` produces a literal `$`, which is how escaped sources keep their
//! placeholder text intact. A `$` that starts neither form is copied as is.

use std::sync::Arc;

use crate::{ConfigError, ConfigResult, Mapping, Node};

/// Expand placeholders in `text` using `lookup`.
///
/// A variable found by `lookup` is substituted even when its value is empty.
/// When it is absent the default after `|` is used; `""` as a default stands
/// for the empty string.
///
/// # Errors
///
/// Returns [`ConfigError::UndefinedVariable`] when a variable is absent and
/// has no default.
///
/// # Examples
///
/// ```
/// use cascade_config::expand;
/// let lookup = |name: &str| (name == "HOST").then(|| "db".to_owned());
/// let text = expand(&lookup, "${HOST}:${PORT|5432} costs $$5").expect("expands");
/// assert_eq!(text, "db:5432 costs $5");
/// ```
pub fn expand<F>(lookup: &F, text: &str) -> ConfigResult<String>
where
    F: Fn(&str) -> Option<String> + ?Sized,
{
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('$') => {
                chars.next();
                out.push('$');
            }
            Some('{') => {
                chars.next();
                let mut body = String::new();
                let mut closed = false;
                for next in chars.by_ref() {
                    if next == '}' {
                        closed = true;
                        break;
                    }
                    body.push(next);
                }
                if closed {
                    out.push_str(&substitute(lookup, &body)?);
                } else {
                    out.push_str("${");
                    out.push_str(&body);
                }
            }
            _ => out.push('$'),
        }
    }
    Ok(out)
}

fn substitute<F>(lookup: &F, body: &str) -> ConfigResult<String>
where
    F: Fn(&str) -> Option<String> + ?Sized,
{
    let (name, default) = body
        .split_once('|')
        .map_or((body, None), |(name, default)| (name, Some(default)));
    if let Some(value) = lookup(name) {
        return Ok(value);
    }
    match default {
        Some("\"\"") => Ok(String::new()),
        Some(default) => Ok(default.to_owned()),
        None => Err(Arc::new(ConfigError::UndefinedVariable {
            name: name.to_owned(),
        })),
    }
}

/// Double every `$` so the text survives [`expand`] unchanged.
#[must_use]
pub fn escape(text: &str) -> String {
    text.replace('$', "$$")
}

/// Expand placeholders in every string scalar of `node`. Keys are left as
/// written.
///
/// # Errors
///
/// Propagates the first [`ConfigError::UndefinedVariable`].
pub fn expand_node<F>(lookup: &F, node: Node) -> ConfigResult<Node>
where
    F: Fn(&str) -> Option<String> + ?Sized,
{
    match node {
        Node::Str(text) if text.contains('$') => expand(lookup, &text).map(Node::Str),
        Node::Seq(items) => items
            .into_iter()
            .map(|item| expand_node(lookup, item))
            .collect::<ConfigResult<Vec<_>>>()
            .map(Node::Seq),
        Node::Map(map) => {
            let mut out = Mapping::new();
            for (key, value) in map {
                out.insert(key, expand_node(lookup, value)?);
            }
            Ok(Node::Map(out))
        }
        other => Ok(other),
    }
}

#[cfg(test)]
#[expect(
    clippy::expect_used,
    reason = "clippy::expect_used is denied globally; tests may not hit those branches"
)]
mod tests {
    use anyhow::{Result, anyhow, ensure};
    use rstest::rstest;

    use super::{escape, expand, expand_node};
    use crate::{ConfigError, Mapping, Node};

    fn lookup(name: &str) -> Option<String> {
        match name {
            "USER" => Some("ada".to_owned()),
            "EMPTY" => Some(String::new()),
            _ => None,
        }
    }

    #[rstest]
    #[case::plain("no placeholders", "no placeholders")]
    #[case::found("hi ${USER}", "hi ada")]
    #[case::found_beats_default("${USER|bob}", "ada")]
    #[case::empty_value_counts("[${EMPTY|x}]", "[]")]
    #[case::default("${MISSING|fallback}", "fallback")]
    #[case::quoted_empty_default("[${MISSING|\"\"}]", "[]")]
    #[case::default_with_pipe("${MISSING|a|b}", "a|b")]
    #[case::escaped("$${USER}", "${USER}")]
    #[case::lone_dollar("cost $5", "cost $5")]
    #[case::unterminated("${USER", "${USER")]
    fn expands(#[case] text: &str, #[case] expected: &str) {
        let out = expand(&lookup, text).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(out, expected);
    }

    #[rstest]
    fn undefined_without_default_fails() {
        let err = expand(&lookup, "${NOPE}").expect_err("expected failure");
        assert!(matches!(err.as_ref(), ConfigError::UndefinedVariable { name } if name == "NOPE"));
    }

    #[rstest]
    #[case("plain text")]
    #[case("ada: 42, port=8080")]
    fn expansion_is_idempotent_without_placeholders(#[case] text: &str) {
        let once = expand(&lookup, text).unwrap_or_else(|e| panic!("{e}"));
        let twice = expand(&lookup, &once).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(once, twice);
    }

    #[rstest]
    fn escaping_round_trips_through_expansion() {
        let text = "${USER} and $$ and $";
        let out = expand(&lookup, &escape(text)).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(out, text);
    }

    #[rstest]
    fn mapping_keys_are_left_as_written() -> Result<()> {
        let mut inner = Mapping::new();
        inner.insert(Node::from("${USER}"), Node::from("${USER}"));
        let mut map = Mapping::new();
        map.insert(Node::from("${USER}"), Node::Map(inner));
        map.insert(Node::from("list"), Node::Seq(vec![Node::from("${USER|x}")]));
        let out = expand_node(&lookup, Node::Map(map)).map_err(|e| anyhow!(e.to_string()))?;
        let Node::Map(out) = out else {
            return Err(anyhow!("expected a mapping, got {out:?}"));
        };
        let nested = out.get_str("${USER}").ok_or_else(|| anyhow!("key was rewritten"))?;
        ensure!(out.get_str("ada").is_none(), "keys are never expanded");
        let Node::Map(nested) = nested else {
            return Err(anyhow!("expected a nested mapping, got {nested:?}"));
        };
        ensure!(nested.get_str("${USER}") == Some(&Node::from("ada")));
        ensure!(out.get_str("list") == Some(&Node::Seq(vec![Node::from("ada")])));
        Ok(())
    }

    #[rstest]
    fn undefined_placeholders_in_keys_are_not_errors() -> Result<()> {
        let mut map = Mapping::new();
        map.insert(Node::from("${NOPE}"), Node::Int(1));
        let out = expand_node(&lookup, Node::Map(map.clone())).map_err(|e| anyhow!(e.to_string()))?;
        ensure!(out == Node::Map(map));
        Ok(())
    }
}
