//! Identifier validation and free-text sanitization.
//!
//! These checks are defense in depth. The structural defense is that values
//! only ever travel through positional parameters; the SQL and XSS
//! heuristics below are a denylist and will never be complete.
//!
//! Every function here fails softly: `None` means "drop this item", never an
//! error. Builder misuse is reported by the builder itself.
//!
//! ```rust
//! use sift_query::security::{safe_field, safe_value};
//!
//! assert_eq!(safe_field(" preco ", None), Some("preco".to_string()));
//! assert_eq!(safe_field("nome; DROP TABLE x", None), None);
//! assert_eq!(safe_value("1 OR 1=1"), None);
//! assert_eq!(safe_value("  vestido azul "), Some("vestido azul".to_string()));
//! ```

use std::collections::HashSet;
use std::sync::LazyLock;

use regex_lite::Regex;
use unicode_normalization::UnicodeNormalization;

/// Default cap on sanitized value length, in characters.
pub const DEFAULT_MAX_VALUE_LENGTH: usize = 255;

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.]*$").expect("identifier pattern"));

static SQL_HINTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)(\bor\b\s+\d+\s*=\s*\d+)",
        r"|(\band\b\s+\d+\s*=\s*\d+)",
        r"|(--|/\*|\*/)",
        r"|(;\s*$)",
        r"|(\bunion\s+(all\s+)?select)",
        r"|(\b(exec|execute|sp_executesql)\b)",
        r"|(\b(sleep|benchmark|waitfor\s+delay)\b)",
        r"|(\b(drop|delete|insert|update|truncate|alter)\s+table\b)",
    ))
    .expect("sql heuristic pattern")
});

static XSS_HINTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)(<\s*script\b)",
        r"|(<\s*iframe\b)",
        r"|(<\s*object\b)",
        r"|(on\w+\s*=)",
        r"|(javascript\s*:)",
        r"|(vbscript\s*:)",
        r"|(data\s*:\s*text/html)",
        r"|(<\s*img\b)",
        r"|(<\s*svg\b)",
        r"|(<!\[cdata\[)",
    ))
    .expect("xss heuristic pattern")
});

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("html tag pattern"));

/// Check whether `s` is a syntactically safe identifier path.
///
/// Letters, digits, `_` and `.`, not starting with a digit or dot. This
/// blocks whitespace, quotes, semicolons, comment markers and parentheses.
#[inline]
pub fn is_identifier(s: &str) -> bool {
    IDENTIFIER.is_match(s)
}

/// Heuristic check for SQL injection payloads.
pub fn looks_like_sql_injection(s: &str) -> bool {
    SQL_HINTS.is_match(&s.to_lowercase())
}

/// Heuristic check for XSS payloads.
pub fn looks_like_xss(s: &str) -> bool {
    XSS_HINTS.is_match(&s.to_lowercase())
}

/// Remove anything that looks like an HTML tag.
///
/// For display only; never a substitute for parameter binding.
pub fn strip_html(s: &str) -> String {
    HTML_TAG.replace_all(s, "").into_owned()
}

/// Validates field names and sanitizes free-text values from untrusted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sanitizer {
    max_value_length: usize,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self {
            max_value_length: DEFAULT_MAX_VALUE_LENGTH,
        }
    }
}

impl Sanitizer {
    /// Create a sanitizer with the default value length cap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the value length cap (in characters). Zero is treated as one.
    pub fn with_max_value_length(mut self, max: usize) -> Self {
        self.max_value_length = max.max(1);
        self
    }

    /// The value length cap.
    pub fn max_value_length(&self) -> usize {
        self.max_value_length
    }

    /// Validate a field name.
    ///
    /// Returns the trimmed field when it is an identifier, is a member of
    /// `allowed` (when that set is non-empty) and does not trip the SQL
    /// heuristic.
    pub fn safe_field(&self, raw: &str, allowed: Option<&HashSet<String>>) -> Option<String> {
        let field = raw.trim();
        if field.is_empty() || !is_identifier(field) {
            return None;
        }

        // The identifier pattern still admits arbitrary dotted paths.
        if let Some(allowed) = allowed {
            if !allowed.is_empty() && !allowed.contains(field) {
                return None;
            }
        }

        if looks_like_sql_injection(field) {
            return None;
        }

        Some(field.to_string())
    }

    /// Sanitize a free-text value.
    ///
    /// Trims, applies NFKC normalization, strips control characters other
    /// than CR, LF and TAB, truncates to the length cap, then rejects the
    /// value if either heuristic fires.
    pub fn safe_value(&self, raw: &str) -> Option<String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        let mut value: String = trimmed
            .nfkc()
            .filter(|c| !c.is_control() || matches!(c, '\r' | '\n' | '\t'))
            .collect();

        if value.chars().count() > self.max_value_length {
            value = value.chars().take(self.max_value_length).collect();
        }

        if value.trim().is_empty() {
            return None;
        }

        if looks_like_sql_injection(&value) || looks_like_xss(&value) {
            return None;
        }

        Some(value)
    }
}

/// Validate a field name with the default sanitizer.
pub fn safe_field(raw: &str, allowed: Option<&HashSet<String>>) -> Option<String> {
    Sanitizer::default().safe_field(raw, allowed)
}

/// Sanitize a value with the default sanitizer.
pub fn safe_value(raw: &str) -> Option<String> {
    Sanitizer::default().safe_value(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allow(fields: &[&str]) -> HashSet<String> {
        fields.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn test_identifier_pattern() {
        assert!(is_identifier("nome"));
        assert!(is_identifier("_private"));
        assert!(is_identifier("estoque.quantidadeAtual"));
        assert!(!is_identifier("1abc"));
        assert!(!is_identifier(".nome"));
        assert!(!is_identifier("nome desc"));
        assert!(!is_identifier("nome'"));
        assert!(!is_identifier("count(*)"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn test_safe_field_rejects_injection_shapes() {
        assert_eq!(safe_field("nome; DROP TABLE x", None), None);
        assert_eq!(safe_field("nome--", None), None);
        assert_eq!(safe_field("   ", None), None);
        assert_eq!(safe_field("a/*b*/", None), None);
    }

    #[test]
    fn test_safe_field_rescreens_keywords() {
        // Regex-valid, but still a procedure keyword.
        assert_eq!(safe_field("sleep", None), None);
        assert_eq!(safe_field("exec", None), None);
        assert_eq!(safe_field("execucao", None), Some("execucao".to_string()));
    }

    #[test]
    fn test_safe_field_whitelist() {
        let allowed = allow(&["preco", "nome"]);
        assert_eq!(safe_field("preco", Some(&allowed)), Some("preco".to_string()));
        assert_eq!(safe_field(" nome ", Some(&allowed)), Some("nome".to_string()));
        assert_eq!(safe_field("usuario.senha", Some(&allowed)), None);

        // An empty whitelist does not restrict.
        let empty = HashSet::new();
        assert_eq!(safe_field("usuario.senha", Some(&empty)), Some("usuario.senha".to_string()));
    }

    #[test]
    fn test_sql_heuristic() {
        for payload in [
            "1 OR 1=1",
            "x' and 2 = 2",
            "abc -- comment",
            "/* hi */",
            "value;",
            "value ;  ",
            "1 UNION SELECT senha FROM usuario",
            "1 union all select 1",
            "EXEC xp_cmdshell",
            "sp_executesql",
            "SLEEP(5)",
            "benchmark(1000,md5(1))",
            "1; WAITFOR DELAY '0:0:5'",
            "drop table produtos",
            "TRUNCATE TABLE vendas",
        ] {
            assert!(looks_like_sql_injection(payload), "expected hit: {payload}");
        }

        for benign in ["vestido; azul", "orange", "update do pedido", "sleeping bag", "100% algodao"] {
            assert!(!looks_like_sql_injection(benign), "unexpected hit: {benign}");
        }
    }

    #[test]
    fn test_xss_heuristic() {
        for payload in [
            "<script>alert(1)</script>",
            "< SCRIPT src=x>",
            "<iframe src=//evil>",
            "<object data=x>",
            "<img src=x onerror=alert(1)>",
            "<svg/onload=alert(1)>",
            "x onmouseover = y",
            "JavaScript:alert(1)",
            "vbscript:msgbox",
            "data: text/html;base64,xyz",
            "<![CDATA[x]]>",
        ] {
            assert!(looks_like_xss(payload), "expected hit: {payload}");
        }
        assert!(!looks_like_xss("blusa <P> tamanho M"));
    }

    #[test]
    fn test_safe_value_scenarios() {
        assert_eq!(safe_value("1 OR 1=1"), None);
        assert_eq!(safe_value("<script>x</script>"), None);
        assert_eq!(safe_value("   "), None);
        assert_eq!(safe_value("%foo"), Some("%foo".to_string()));
    }

    #[test]
    fn test_safe_value_normalizes_and_strips_controls() {
        // Fullwidth letters fold to ASCII under NFKC.
        assert_eq!(safe_value("ＡＢＣ"), Some("ABC".to_string()));
        assert_eq!(safe_value("a\u{0000}b\u{0007}c"), Some("abc".to_string()));
        assert_eq!(safe_value("linha1\nlinha2\tfim"), Some("linha1\nlinha2\tfim".to_string()));
    }

    #[test]
    fn test_safe_value_normalization_exposes_payload() {
        // Fullwidth "<script" only matches after normalization.
        assert_eq!(safe_value("＜script＞alert(1)"), None);
    }

    #[test]
    fn test_safe_value_truncates() {
        let sanitizer = Sanitizer::new().with_max_value_length(5);
        assert_eq!(sanitizer.safe_value("abcdefgh"), Some("abcde".to_string()));
        assert_eq!(sanitizer.safe_value("ãéîõü!"), Some("ãéîõü".to_string()));

        let long = "x".repeat(400);
        let out = safe_value(&long).unwrap();
        assert_eq!(out.chars().count(), DEFAULT_MAX_VALUE_LENGTH);
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(strip_html("<b>negrito</b> texto"), "negrito texto");
    }
}
