//! Regex construction from deprecated API tokens
//!
//! Shapes are tried in order, first applicable wins:
//! 1. legacy-prefixed bare type name -> whole-word match
//! 2. token with `(` -> member access or call of the function name
//! 3. token with `.` -> property access of the last segment
//! 4. anything else -> literal, word-bounded where possible

/// Which construction rule produced a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternShape {
    LegacyType,
    FunctionReference,
    PropertyAccess,
    Literal,
}

/// Build the matching pattern for a token
///
/// The returned string has every literal escaped but is not yet compiled.
pub fn build_pattern(token: &str, legacy_prefixes: &[String]) -> (PatternShape, String) {
    let token = token.trim();

    if is_legacy_type(token, legacy_prefixes) {
        return (PatternShape::LegacyType, format!(r"\b{}\b", regex::escape(token)));
    }

    if let Some(paren) = token.find('(') {
        let member = last_segment(&token[..paren]);
        if !member.is_empty() {
            let escaped = regex::escape(member);
            return (
                PatternShape::FunctionReference,
                format!(
                    r"(?:\.{escaped}{right}|{left}{escaped}\()",
                    left = left_bound(member),
                    right = right_bound(member),
                ),
            );
        }
    }

    if token.contains('.') {
        let member = last_segment(token);
        if !member.is_empty() {
            return (
                PatternShape::PropertyAccess,
                format!(r"\.{}{}", regex::escape(member), right_bound(member)),
            );
        }
    }

    (
        PatternShape::Literal,
        format!("{}{}{}", left_bound(token), regex::escape(token), right_bound(token)),
    )
}

/// A bare identifier starting with a legacy prefix followed by an uppercase letter
fn is_legacy_type(token: &str, legacy_prefixes: &[String]) -> bool {
    let is_identifier = token
        .chars()
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false)
        && token.chars().all(is_word_char);

    is_identifier
        && legacy_prefixes.iter().filter(|p| !p.is_empty()).any(|prefix| {
            token
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.chars().next())
                .map(|c| c.is_ascii_uppercase())
                .unwrap_or(false)
        })
}

fn last_segment(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path).trim()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

// `\b` next to a non-word character would require a word character on the
// other side, so boundaries are only emitted next to word characters.
fn left_bound(literal: &str) -> &'static str {
    match literal.chars().next() {
        Some(c) if is_word_char(c) => r"\b",
        _ => "",
    }
}

fn right_bound(literal: &str) -> &'static str {
    match literal.chars().last() {
        Some(c) if is_word_char(c) => r"\b",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    fn prefixes() -> Vec<String> {
        vec!["HB".to_string()]
    }

    fn compiled(token: &str) -> (PatternShape, Regex) {
        let (shape, pattern) = build_pattern(token, &prefixes());
        (shape, Regex::new(&pattern).unwrap())
    }

    #[test]
    fn legacy_type_is_whole_word() {
        let (shape, re) = compiled("HBApplication");
        assert_eq!(shape, PatternShape::LegacyType);
        assert!(re.is_match("let app = HBApplication()"));
        assert!(!re.is_match("MyHBApplicationWrapper"));
        assert!(!re.is_match("HBApplicationContext"));
    }

    #[test]
    fn prefix_must_precede_an_uppercase_letter() {
        let (shape, _) = compiled("HBase");
        assert_eq!(shape, PatternShape::Literal);
    }

    #[test]
    fn function_reference_matches_member_and_call() {
        let (shape, re) = compiled("Router.add(_:method:use:)");
        assert_eq!(shape, PatternShape::FunctionReference);
        assert!(re.is_match("router.add(\"/\", method: .get)"));
        assert!(re.is_match("let f = router.add"));
        assert!(re.is_match("add(\"/health\")"));
        assert!(!re.is_match("router.addMiddleware(x)"));
        assert!(!re.is_match("readd(1)"));
    }

    #[test]
    fn property_access_is_right_bounded() {
        let (shape, re) = compiled("HBRequest.logger");
        assert_eq!(shape, PatternShape::PropertyAccess);
        assert!(re.is_match("request.logger.info(\"hi\")"));
        assert!(!re.is_match("request.loggerLevel"));
        assert!(!re.is_match("let logger = Logger()"));
    }

    #[test]
    fn literal_fallback_escapes_metacharacters() {
        let (shape, re) = compiled("$request[0]");
        assert_eq!(shape, PatternShape::Literal);
        assert!(re.is_match("print($request[0])"));
        assert!(!re.is_match("print($request[1])"));
    }

    #[test]
    fn plain_identifier_is_word_bounded() {
        let (shape, re) = compiled("middlewares");
        assert_eq!(shape, PatternShape::Literal);
        assert!(re.is_match("app.middlewares.add(x)"));
        assert!(!re.is_match("allmiddlewares"));
    }
}
