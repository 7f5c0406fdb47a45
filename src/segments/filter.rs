/*!
 * Translatability filters.
 *
 * A candidate run of text is checked against an ordered list of rules; the
 * first rule that excludes it wins. Rules look at the visible text (tags and
 * entities stripped) and at the markup tokens of the document it came from.
 */

use std::fmt::Debug;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Per-document information available to rules
#[derive(Debug, Clone, Default)]
pub struct FilterContext {
    /// Sorted tag names, attribute names and values of the document
    pub markup_tokens: Vec<String>,
}

/// A single exclusion rule
pub trait FilterRule: Send + Sync + Debug {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Whether the rule keeps this text out of translation.
    /// `visible` is trimmed and never contains tags; `raw` is the candidate as written.
    fn excludes(&self, visible: &str, raw: &str, context: &FilterContext) -> bool;
}

/// Blank text
#[derive(Debug, Default)]
pub struct EmptyRule;

impl FilterRule for EmptyRule {
    fn name(&self) -> &'static str {
        "empty"
    }

    fn excludes(&self, visible: &str, _raw: &str, _context: &FilterContext) -> bool {
        visible.is_empty()
    }
}

/// Digits, punctuation and symbols only (`2024`, `+49 30 1234`, `€ 20,00`)
#[derive(Debug, Default)]
pub struct NumericRule;

impl FilterRule for NumericRule {
    fn name(&self) -> &'static str {
        "numeric"
    }

    fn excludes(&self, visible: &str, _raw: &str, _context: &FilterContext) -> bool {
        !visible.chars().any(char::is_alphabetic)
    }
}

static URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:(?:https?|ftp)://|www\.|mailto:|tel:|/)\S*$").expect("Invalid URL regex")
});

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\w.+-]+@[\w-]+(?:\.[\w-]+)+$").expect("Invalid email regex")
});

static FILE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\S+\.(?:jpe?g|png|gif|svg|webp|avif|pdf|mp4|webm|mp3|zip|docx?|xlsx?|pptx?|css|js)$")
        .expect("Invalid file regex")
});

/// URLs, email addresses and file names
#[derive(Debug, Default)]
pub struct UrlRule;

impl FilterRule for UrlRule {
    fn name(&self) -> &'static str {
        "url"
    }

    fn excludes(&self, visible: &str, _raw: &str, _context: &FilterContext) -> bool {
        URL_REGEX.is_match(visible) || EMAIL_REGEX.is_match(visible) || FILE_REGEX.is_match(visible)
    }
}

/// `key: value;` declarations, each terminated by a semicolon
static CSS_DECLARATIONS_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\s*-{0,2}[a-zA-Z][-a-zA-Z0-9]*\s*:\s*[^;{}]+;)+\s*$").expect("Invalid CSS regex")
});

/// `selector { prop: value }` blocks; each block holds at least one declaration
static CSS_BLOCK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[^{}]*\{\s*(?:-{0,2}[a-zA-Z][-a-zA-Z0-9]*\s*:\s*[^;{}]+;?\s*)+\}\s*)+$")
        .expect("Invalid CSS block regex")
});

/// Colors and lengths (`#fff`, `12px`, `1.5em`, `var(--x)`)
static CSS_VALUE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:#[0-9a-f]{3,8}|-?\d+(?:\.\d+)?(?:px|em|rem|vh|vw|vmin|vmax|pt|%|s|ms|deg)|var\(--[-\w]+\)|rgba?\([^)]*\))$")
        .expect("Invalid CSS value regex")
});

/// Style declarations, rule blocks and lone CSS values
#[derive(Debug)]
pub struct CssRule {
    /// Also exclude lone values such as `12px` or `#fff`
    pub values: bool,
}

impl Default for CssRule {
    fn default() -> Self {
        Self { values: true }
    }
}

impl FilterRule for CssRule {
    fn name(&self) -> &'static str {
        "css"
    }

    fn excludes(&self, visible: &str, _raw: &str, _context: &FilterContext) -> bool {
        CSS_DECLARATIONS_REGEX.is_match(visible)
            || CSS_BLOCK_REGEX.is_match(visible)
            || (self.values && CSS_VALUE_REGEX.is_match(visible))
    }
}

/// Text equal to a shortcode tag, attribute name or attribute value
#[derive(Debug, Default)]
pub struct TokenRule {
    /// Extra tokens beyond those found in the document
    pub extra: Vec<String>,
}

impl FilterRule for TokenRule {
    fn name(&self) -> &'static str {
        "markup-token"
    }

    fn excludes(&self, visible: &str, _raw: &str, context: &FilterContext) -> bool {
        context
            .markup_tokens
            .binary_search_by(|t| t.as_str().cmp(visible))
            .is_ok()
            || self.extra.iter().any(|t| t == visible)
    }
}

/// Text containing a marker that means it must not be touched
#[derive(Debug)]
pub struct SkipMarkerRule {
    /// Lowercased markers
    markers: Vec<String>,
}

impl SkipMarkerRule {
    pub fn new(markers: &[String]) -> Self {
        Self {
            markers: markers.iter().map(|m| m.to_lowercase()).collect(),
        }
    }
}

impl FilterRule for SkipMarkerRule {
    fn name(&self) -> &'static str {
        "skip-marker"
    }

    fn excludes(&self, _visible: &str, raw: &str, _context: &FilterContext) -> bool {
        if self.markers.is_empty() {
            return false;
        }
        let lowered = raw.to_lowercase();
        self.markers.iter().any(|m| lowered.contains(m.as_str()))
    }
}

/// User-supplied regular expressions matched against the visible text
#[derive(Debug)]
pub struct PatternRule {
    patterns: Vec<Regex>,
}

impl PatternRule {
    pub fn new(patterns: &[String]) -> Result<Self, regex::Error> {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }
}

impl FilterRule for PatternRule {
    fn name(&self) -> &'static str {
        "pattern"
    }

    fn excludes(&self, visible: &str, _raw: &str, _context: &FilterContext) -> bool {
        self.patterns.iter().any(|p| p.is_match(visible))
    }
}

/// Filter settings as stored in the configuration file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FilterConfig {
    /// Skip text without any letters
    pub skip_numeric: bool,

    /// Skip URLs, email addresses and file names
    pub skip_urls: bool,

    /// Skip CSS declarations and rule blocks
    pub skip_css: bool,

    /// Also treat lone CSS values (`12px`, `#fff`) as CSS
    pub skip_css_values: bool,

    /// Skip text equal to a tag, attribute name or attribute value
    pub skip_markup_tokens: bool,

    /// Extra literal tokens that are never translated
    pub extra_tokens: Vec<String>,

    /// Skip text whose raw form contains any of these markers (case-insensitive)
    pub skip_if_contains: Vec<String>,

    /// Skip text whose visible form matches any of these regular expressions
    pub skip_patterns: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            skip_numeric: true,
            skip_urls: true,
            skip_css: true,
            skip_css_values: true,
            skip_markup_tokens: true,
            extra_tokens: Vec::new(),
            skip_if_contains: vec!["<script".to_string(), "application/ld+json".to_string()],
            skip_patterns: Vec::new(),
        }
    }
}

/// Ordered set of rules
#[derive(Debug, Default)]
pub struct FilterPolicy {
    rules: Vec<Box<dyn FilterRule>>,
}

impl FilterPolicy {
    /// Policy with no rules at all
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Build the rule list from configuration
    pub fn from_config(config: &FilterConfig) -> Result<Self, regex::Error> {
        let mut policy = Self::empty().with_rule(EmptyRule);
        if config.skip_numeric {
            policy = policy.with_rule(NumericRule);
        }
        if config.skip_urls {
            policy = policy.with_rule(UrlRule);
        }
        if config.skip_css {
            policy = policy.with_rule(CssRule {
                values: config.skip_css_values,
            });
        }
        if config.skip_markup_tokens || !config.extra_tokens.is_empty() {
            policy = policy.with_rule(TokenRule {
                extra: config.extra_tokens.clone(),
            });
        }
        if !config.skip_if_contains.is_empty() {
            policy = policy.with_rule(SkipMarkerRule::new(&config.skip_if_contains));
        }
        if !config.skip_patterns.is_empty() {
            policy = policy.with_rule(PatternRule::new(&config.skip_patterns)?);
        }
        Ok(policy)
    }

    /// Append a rule; rules run in insertion order
    pub fn with_rule(mut self, rule: impl FilterRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Name of the first rule excluding the candidate, if any
    pub fn rejection(&self, visible: &str, raw: &str, context: &FilterContext) -> Option<&'static str> {
        self.rules
            .iter()
            .find(|rule| rule.excludes(visible, raw, context))
            .map(|rule| rule.name())
    }

    pub fn accepts(&self, visible: &str, raw: &str, context: &FilterContext) -> bool {
        self.rejection(visible, raw, context).is_none()
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }
}
