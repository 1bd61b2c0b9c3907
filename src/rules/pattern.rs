//! Path pattern compiler for redirect and rewrite rules.
//!
//! # Grammar
//! - literal text, matched exactly (regex-escaped)
//! - `:name` parameter, one or more non-`/` characters; `name` is `[A-Za-z0-9_]+`
//! - `*` wildcard, any characters including `/` (may be empty)
//!
//! # Design Decisions
//! - Destinations are validated against the source at compile time; substitution
//!   at request time cannot fail
//! - Parameters bind by name, wildcards bind by position (n-th `*` in the
//!   destination takes the n-th `*` of the source)
//! - The `regex` crate guarantees linear-time matching, so no pattern can
//!   backtrack exponentially

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::rules::error::CompilationError;

const PARAM_GROUP: &str = "([^/]+)";
const WILDCARD_GROUP: &str = "(.*)";

/// A capture group in a compiled source pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureSlot {
    /// `:name` parameter.
    Param(String),
    /// The n-th `*` of the source, counted from zero.
    Wildcard(usize),
}

/// One piece of a destination template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplatePart {
    Literal(String),
    /// Index into the rule's capture order.
    Capture(usize),
}

/// A redirect or rewrite rule compiled from a source pattern and destination.
///
/// Immutable once built. Serializes as plain data (regex source, capture
/// order, template) and is re-validated when deserialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RuleData", into = "RuleData")]
pub struct CompiledRule {
    source: String,
    destination: String,
    regex: Regex,
    capture_order: Vec<CaptureSlot>,
    template: Vec<TemplatePart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RuleData {
    source: String,
    destination: String,
    pattern: String,
    capture_order: Vec<CaptureSlot>,
    template: Vec<TemplatePart>,
}

impl CompiledRule {
    /// The source pattern this rule was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The raw destination string.
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// The anchored regular expression the source compiled to.
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn capture_order(&self) -> &[CaptureSlot] {
        &self.capture_order
    }

    pub fn template(&self) -> &[TemplatePart] {
        &self.template
    }

    /// Returns true if the whole path matches the source pattern.
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Match `path` and substitute its captures into the destination.
    ///
    /// Returns `None` when the path does not match.
    pub fn apply(&self, path: &str) -> Option<String> {
        let captures = self.regex.captures(path)?;
        let mut out = String::with_capacity(self.destination.len() + path.len());
        for part in &self.template {
            match part {
                TemplatePart::Literal(text) => out.push_str(text),
                TemplatePart::Capture(slot) => {
                    if let Some(m) = captures.get(slot + 1) {
                        out.push_str(m.as_str());
                    }
                }
            }
        }
        Some(out)
    }
}

impl TryFrom<RuleData> for CompiledRule {
    type Error = CompilationError;

    /// Recompile from `source` and `destination`; the stored compiled form
    /// must be exactly what they compile to.
    fn try_from(data: RuleData) -> Result<Self, Self::Error> {
        let rule = compile_rule(&data.source, &data.destination)?;
        let mismatch = if rule.regex.as_str() != data.pattern {
            Some("pattern")
        } else if rule.capture_order != data.capture_order {
            Some("capture order")
        } else if rule.template != data.template {
            Some("destination template")
        } else {
            None
        };
        if let Some(field) = mismatch {
            return Err(CompilationError::Inconsistent(format!(
                "stored {field} for '{}' does not match its compiled form",
                data.source
            )));
        }
        Ok(rule)
    }
}

impl From<CompiledRule> for RuleData {
    fn from(rule: CompiledRule) -> Self {
        Self {
            pattern: rule.regex.as_str().to_string(),
            source: rule.source,
            destination: rule.destination,
            capture_order: rule.capture_order,
            template: rule.template,
        }
    }
}

/// Evaluate `rules` in declaration order; the first match wins.
///
/// Returns the index of the matching rule and the substituted destination.
pub fn first_match(rules: &[CompiledRule], path: &str) -> Option<(usize, String)> {
    rules
        .iter()
        .enumerate()
        .find_map(|(index, rule)| rule.apply(path).map(|destination| (index, destination)))
}

/// Compile a source pattern and its destination into a [`CompiledRule`].
pub fn compile_rule(source: &str, destination: &str) -> Result<CompiledRule, CompilationError> {
    check_path(source)?;
    check_path(destination)?;

    let tokens = tokenize(source, true).map_err(|position| CompilationError::UnterminatedParameter {
        pattern: source.to_string(),
        position,
    })?;

    let mut expr = String::with_capacity(source.len() * 2 + 2);
    expr.push('^');
    let mut capture_order = Vec::new();
    let mut wildcards = 0;

    for token in tokens {
        match token {
            Token::Literal(text) => expr.push_str(&regex::escape(text)),
            Token::Param(name) => {
                if find_param(&capture_order, name).is_some() {
                    return Err(CompilationError::DuplicateParameter {
                        pattern: source.to_string(),
                        name: name.to_string(),
                    });
                }
                capture_order.push(CaptureSlot::Param(name.to_string()));
                expr.push_str(PARAM_GROUP);
            }
            Token::Wildcard => {
                capture_order.push(CaptureSlot::Wildcard(wildcards));
                wildcards += 1;
                expr.push_str(WILDCARD_GROUP);
            }
        }
    }
    expr.push('$');

    let template = compile_template(source, destination, &capture_order, wildcards)?;

    Ok(CompiledRule {
        source: source.to_string(),
        destination: destination.to_string(),
        regex: Regex::new(&expr)?,
        capture_order,
        template,
    })
}

fn compile_template(
    source: &str,
    destination: &str,
    capture_order: &[CaptureSlot],
    defined_wildcards: usize,
) -> Result<Vec<TemplatePart>, CompilationError> {
    // Destinations treat a bare ':' as literal text, so tokenizing cannot fail.
    let tokens = tokenize(destination, false).unwrap_or_default();

    let used = tokens.iter().filter(|t| matches!(t, Token::Wildcard)).count();
    if used > defined_wildcards {
        return Err(CompilationError::ExcessWildcards {
            source_pattern: source.to_string(),
            destination: destination.to_string(),
            used,
            defined: defined_wildcards,
        });
    }

    let mut template: Vec<TemplatePart> = Vec::new();
    let mut next_wildcard = 0;
    for token in tokens {
        let part = match token {
            Token::Literal(text) => {
                if let Some(TemplatePart::Literal(prev)) = template.last_mut() {
                    prev.push_str(text);
                    continue;
                }
                TemplatePart::Literal(text.to_string())
            }
            Token::Param(name) => match find_param(capture_order, name) {
                Some(slot) => TemplatePart::Capture(slot),
                None => {
                    return Err(CompilationError::UndefinedParameter {
                        source_pattern: source.to_string(),
                        destination: destination.to_string(),
                        name: name.to_string(),
                    })
                }
            },
            Token::Wildcard => {
                let slot = capture_order
                    .iter()
                    .position(|s| *s == CaptureSlot::Wildcard(next_wildcard))
                    .ok_or_else(|| {
                        CompilationError::Inconsistent(format!("wildcard {next_wildcard} of '{source}' has no slot"))
                    })?;
                next_wildcard += 1;
                TemplatePart::Capture(slot)
            }
        };
        template.push(part);
    }
    Ok(template)
}

fn find_param(capture_order: &[CaptureSlot], name: &str) -> Option<usize> {
    capture_order
        .iter()
        .position(|slot| matches!(slot, CaptureSlot::Param(n) if n == name))
}

fn check_path(pattern: &str) -> Result<(), CompilationError> {
    if !pattern.starts_with('/') || pattern.contains(['?', '#']) {
        return Err(CompilationError::InvalidPath {
            pattern: pattern.to_string(),
        });
    }
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum Token<'a> {
    Literal(&'a str),
    Param(&'a str),
    Wildcard,
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Split a pattern into literal runs, parameters and wildcards.
///
/// With `strict`, a `:` not followed by a name is an error at that byte
/// offset; otherwise it stays part of the surrounding literal.
fn tokenize(input: &str, strict: bool) -> Result<Vec<Token<'_>>, usize> {
    let mut tokens = Vec::new();
    let mut literal_start = 0;
    let mut chars = input.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '*' => {
                if literal_start < i {
                    tokens.push(Token::Literal(&input[literal_start..i]));
                }
                tokens.push(Token::Wildcard);
                literal_start = i + 1;
            }
            ':' => {
                let name_start = i + 1;
                let mut name_end = name_start;
                while let Some(&(j, n)) = chars.peek() {
                    if !is_name_char(n) {
                        break;
                    }
                    name_end = j + n.len_utf8();
                    chars.next();
                }
                if name_end == name_start {
                    if strict {
                        return Err(i);
                    }
                    continue;
                }
                if literal_start < i {
                    tokens.push(Token::Literal(&input[literal_start..i]));
                }
                tokens.push(Token::Param(&input[name_start..name_end]));
                literal_start = name_end;
            }
            _ => {}
        }
    }
    if literal_start < input.len() {
        tokens.push(Token::Literal(&input[literal_start..]));
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_pattern_matches_exactly() {
        let rule = compile_rule("/old-page.html", "/new-page.html").unwrap();
        assert!(rule.is_match("/old-page.html"));
        assert!(!rule.is_match("/old-pageXhtml"));
        assert!(!rule.is_match("/old-page.html/extra"));
        assert!(!rule.is_match("/prefix/old-page.html"));
        assert_eq!(rule.apply("/old-page.html").as_deref(), Some("/new-page.html"));
    }

    #[test]
    fn test_named_parameters() {
        let rule = compile_rule("/blog/:year/:month", "/:year/:month").unwrap();
        assert_eq!(rule.apply("/blog/2024/01").as_deref(), Some("/2024/01"));
        assert_eq!(rule.apply("/blog/2024"), None);
        assert_eq!(rule.apply("/blog/2024/01/extra"), None);
        assert_eq!(
            rule.capture_order(),
            &[CaptureSlot::Param("year".into()), CaptureSlot::Param("month".into())]
        );
    }

    #[test]
    fn test_parameters_reordered_in_destination() {
        let rule = compile_rule("/blog/:year/:month", "/archive/:month-:year").unwrap();
        assert_eq!(rule.apply("/blog/2024/01").as_deref(), Some("/archive/01-2024"));
    }

    #[test]
    fn test_wildcard() {
        let rule = compile_rule("/guide/*", "/docs/*").unwrap();
        assert_eq!(rule.apply("/guide/getting-started").as_deref(), Some("/docs/getting-started"));
        assert_eq!(rule.apply("/guide/a/b/c").as_deref(), Some("/docs/a/b/c"));
        assert_eq!(rule.apply("/guide/").as_deref(), Some("/docs/"));
        assert_eq!(rule.apply("/guides"), None);
    }

    #[test]
    fn test_mixed_parameter_and_wildcard() {
        let rule = compile_rule("/:lang/files/*/raw/*", "/raw/*/:lang/*").unwrap();
        assert_eq!(
            rule.apply("/en/files/a/b/raw/c.txt").as_deref(),
            Some("/raw/a/b/en/c.txt")
        );
    }

    #[test]
    fn test_parameter_terminated_by_non_name_char() {
        let rule = compile_rule("/posts/:slug.html", "/p/:slug").unwrap();
        assert_eq!(rule.apply("/posts/hello.html").as_deref(), Some("/p/hello"));
        assert_eq!(rule.apply("/posts/a/b.html"), None);
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let rule = compile_rule("/a+b/(c)/[d]", "/x").unwrap();
        assert!(rule.is_match("/a+b/(c)/[d]"));
        assert!(!rule.is_match("/aab/c/d"));
    }

    #[test]
    fn test_destination_may_drop_captures() {
        let rule = compile_rule("/legacy/*", "/").unwrap();
        assert_eq!(rule.apply("/legacy/anything/here").as_deref(), Some("/"));
    }

    #[test]
    fn test_colon_without_name_in_destination_is_literal() {
        let rule = compile_rule("/a/:id", "/b/:/:id").unwrap();
        assert_eq!(rule.apply("/a/7").as_deref(), Some("/b/:/7"));
    }

    #[test]
    fn test_unterminated_parameter() {
        let err = compile_rule("/users/:/edit", "/x").unwrap_err();
        assert_eq!(
            err,
            CompilationError::UnterminatedParameter {
                pattern: "/users/:/edit".into(),
                position: 7
            }
        );
        assert!(matches!(
            compile_rule("/users/:", "/x"),
            Err(CompilationError::UnterminatedParameter { .. })
        ));
    }

    #[test]
    fn test_duplicate_parameter() {
        assert!(matches!(
            compile_rule("/:id/:id", "/:id"),
            Err(CompilationError::DuplicateParameter { name, .. }) if name == "id"
        ));
    }

    #[test]
    fn test_undefined_destination_parameter() {
        assert!(matches!(
            compile_rule("/blog/:year", "/:year/:month"),
            Err(CompilationError::UndefinedParameter { name, .. }) if name == "month"
        ));
    }

    #[test]
    fn test_excess_destination_wildcards() {
        assert!(matches!(
            compile_rule("/a/*", "/b/*/*"),
            Err(CompilationError::ExcessWildcards { used: 2, defined: 1, .. })
        ));
        assert!(matches!(
            compile_rule("/a/:id", "/b/*"),
            Err(CompilationError::ExcessWildcards { used: 1, defined: 0, .. })
        ));
    }

    #[test]
    fn test_invalid_paths() {
        for (source, destination) in [("no-slash", "/x"), ("/a?b=1", "/x"), ("/a", "/b#top"), ("", "/x")] {
            assert!(
                matches!(compile_rule(source, destination), Err(CompilationError::InvalidPath { .. })),
                "{source} -> {destination}"
            );
        }
    }

    #[test]
    fn test_first_match_wins() {
        let rules = vec![
            compile_rule("/a", "/first").unwrap(),
            compile_rule("/*", "/second").unwrap(),
        ];
        assert_eq!(first_match(&rules, "/a"), Some((0, "/first".to_string())));
        assert_eq!(first_match(&rules, "/b"), Some((1, "/second".to_string())));
        assert_eq!(first_match(&rules[..1], "/b"), None);
    }

    #[test]
    fn test_serialized_form_is_plain_data() {
        let rule = compile_rule("/blog/:year/*", "/y/:year/*").unwrap();
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["pattern"], "^/blog/([^/]+)/(.*)$");
        assert_eq!(json["capture_order"][0]["param"], "year");
        assert_eq!(json["capture_order"][1]["wildcard"], 0);

        let restored: CompiledRule = serde_json::from_value(json).unwrap();
        assert_eq!(restored.apply("/blog/2020/x/y").as_deref(), Some("/y/2020/x/y"));
    }

    #[test]
    fn test_tampered_rule_is_rejected() {
        let rule = compile_rule("/blog/:year", "/:year").unwrap();
        let mut json = serde_json::to_value(&rule).unwrap();
        json["pattern"] = "^/blog/([^/]+)/([^/]+)$".into();
        assert!(serde_json::from_value::<CompiledRule>(json).is_err());

        let mut json = serde_json::to_value(&rule).unwrap();
        json["template"] = serde_json::json!([{ "capture": 3 }]);
        assert!(serde_json::from_value::<CompiledRule>(json).is_err());
    }

    #[test]
    fn test_swapped_pattern_with_same_group_count_is_rejected() {
        let rule = compile_rule("/blog/:year", "/:year").unwrap();
        let mut json = serde_json::to_value(&rule).unwrap();
        json["pattern"] = "^/(.*)$".into();
        let err = serde_json::from_value::<CompiledRule>(json).unwrap_err();
        assert!(err.to_string().contains("does not match its compiled form"), "{err}");
    }

    #[test]
    fn test_rewired_capture_order_is_rejected() {
        let rule = compile_rule("/:a/:b", "/:b/:a").unwrap();
        let mut json = serde_json::to_value(&rule).unwrap();
        json["capture_order"] = serde_json::json!([{ "param": "b" }, { "param": "a" }]);
        assert!(serde_json::from_value::<CompiledRule>(json).is_err());

        let mut json = serde_json::to_value(&rule).unwrap();
        json["template"] = serde_json::json!([{ "literal": "/" }, { "capture": 0 }, { "literal": "/" }, { "capture": 1 }]);
        assert!(serde_json::from_value::<CompiledRule>(json).is_err());
    }

    #[test]
    fn test_stored_source_is_recompiled() {
        let rule = compile_rule("/blog/:year", "/:year").unwrap();
        let mut json = serde_json::to_value(&rule).unwrap();
        json["destination"] = "/:month".into();
        assert!(serde_json::from_value::<CompiledRule>(json).is_err());
    }
}
