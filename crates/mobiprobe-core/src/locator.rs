//! Selectors and the ordered lookup strategies derived from an identifier.
//!
//! UI frameworks expose identifiers inconsistently: React Native test ids
//! surface as a bare `resource-id`, while native views carry the
//! application-qualified `<package>:id/<name>` form. [`LookupStrategy::ORDER`]
//! lists the three forms tried for every identifier, most portable first.
//!
//! # Example
//!
//! ```
//! use mobiprobe_core::locator::LookupStrategy;
//!
//! let selectors: Vec<String> = LookupStrategy::ORDER
//!     .iter()
//!     .map(|s| s.selector("test-button", "com.testapp1").value)
//!     .collect();
//!
//! assert_eq!(selectors, vec![
//!     "//*[@resource-id='test-button']".to_string(),
//!     "test-button".to_string(),
//!     "com.testapp1:id/test-button".to_string(),
//! ]);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// How the automation service should interpret a selector value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorKind {
    /// An XPath expression over the UI hierarchy.
    #[serde(rename = "xpath")]
    XPath,
    /// An accessibility/resource id, plain or namespace-qualified.
    Id,
    /// A platform widget class, e.g. `android.widget.Switch`.
    ClassName,
}

impl SelectorKind {
    /// The W3C `using` value for this kind.
    pub fn as_w3c(&self) -> &'static str {
        match self {
            SelectorKind::XPath => "xpath",
            SelectorKind::Id => "id",
            SelectorKind::ClassName => "class name",
        }
    }
}

/// A (selector-kind, selector-value) pair sent to the automation service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selector {
    pub kind: SelectorKind,
    pub value: String,
}

impl Selector {
    pub fn xpath(value: impl Into<String>) -> Self {
        Self { kind: SelectorKind::XPath, value: value.into() }
    }

    pub fn id(value: impl Into<String>) -> Self {
        Self { kind: SelectorKind::Id, value: value.into() }
    }

    pub fn class_name(value: impl Into<String>) -> Self {
        Self { kind: SelectorKind::ClassName, value: value.into() }
    }

    /// XPath matching any element whose `text` attribute equals `text`.
    pub fn exact_text(text: &str) -> Self {
        Self::xpath(format!("//*[@text={}]", xpath_literal(text)))
    }

    /// XPath matching any element whose `text` attribute contains `text`.
    pub fn text_contains(text: &str) -> Self {
        Self::xpath(format!("//*[contains(@text, {})]", xpath_literal(text)))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.kind.as_w3c(), self.value)
    }
}

/// One form of lookup derived from an element identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupStrategy {
    /// `//*[@resource-id='<id>']`
    XPathResourceId,
    /// The raw identifier as an id lookup.
    DirectId,
    /// `<namespace>:id/<id>` as an id lookup.
    QualifiedId,
}

impl LookupStrategy {
    /// The fixed order in which strategies are attempted.
    pub const ORDER: [LookupStrategy; 3] = [
        LookupStrategy::XPathResourceId,
        LookupStrategy::DirectId,
        LookupStrategy::QualifiedId,
    ];

    /// Every strategy for `identifier`, paired with its selector, in [`ORDER`](Self::ORDER).
    pub fn for_identifier(identifier: &str, namespace: &str) -> [(LookupStrategy, Selector); 3] {
        Self::ORDER.map(|strategy| (strategy, strategy.selector(identifier, namespace)))
    }

    /// Builds the selector for `identifier` under this strategy.
    pub fn selector(&self, identifier: &str, namespace: &str) -> Selector {
        match self {
            LookupStrategy::XPathResourceId => {
                Selector::xpath(format!("//*[@resource-id={}]", xpath_literal(identifier)))
            }
            LookupStrategy::DirectId => Selector::id(identifier),
            LookupStrategy::QualifiedId => Selector::id(qualified_id(namespace, identifier)),
        }
    }

    /// Short label used in transcript lines.
    pub fn label(&self) -> &'static str {
        match self {
            LookupStrategy::XPathResourceId => "XPath",
            LookupStrategy::DirectId => "direct ID",
            LookupStrategy::QualifiedId => "full resource-id",
        }
    }
}

impl fmt::Display for LookupStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// `<namespace>:id/<identifier>`, or the bare identifier if `namespace` is empty.
pub fn qualified_id(namespace: &str, identifier: &str) -> String {
    if namespace.is_empty() {
        identifier.to_string()
    } else {
        format!("{namespace}:id/{identifier}")
    }
}

/// Selectors for the confirm button of a platform alert, in the order they
/// are tried.
pub fn alert_dismiss_selectors() -> [Selector; 3] {
    [
        Selector::id("android:id/button1"),
        Selector::exact_text("OK"),
        Selector::exact_text("ok"),
    ]
}

/// Quotes `s` as an XPath 1.0 string literal.
///
/// XPath 1.0 has no escape sequences, so a value holding both quote kinds is
/// assembled with `concat()`.
pub fn xpath_literal(s: &str) -> String {
    if !s.contains('\'') {
        return format!("'{s}'");
    }
    if !s.contains('"') {
        return format!("\"{s}\"");
    }
    let parts: Vec<String> = s.split('\'').map(|p| format!("'{p}'")).collect();
    format!("concat({})", parts.join(", \"'\", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategies_are_ordered_xpath_raw_qualified() {
        let pairs = LookupStrategy::for_identifier("swipe-area", "com.testapp1");

        assert_eq!(pairs[0], (LookupStrategy::XPathResourceId, Selector::xpath("//*[@resource-id='swipe-area']")));
        assert_eq!(pairs[1], (LookupStrategy::DirectId, Selector::id("swipe-area")));
        assert_eq!(pairs[2], (LookupStrategy::QualifiedId, Selector::id("com.testapp1:id/swipe-area")));
    }

    #[test]
    fn empty_namespace_leaves_id_bare() {
        assert_eq!(qualified_id("", "title"), "title");
        assert_eq!(qualified_id("com.testapp2", "title"), "com.testapp2:id/title");
    }

    #[test]
    fn strategy_labels() {
        assert_eq!(LookupStrategy::XPathResourceId.label(), "XPath");
        assert_eq!(LookupStrategy::DirectId.to_string(), "direct ID");
        assert_eq!(LookupStrategy::QualifiedId.label(), "full resource-id");
    }

    #[test]
    fn xpath_literal_quoting() {
        assert_eq!(xpath_literal("plain"), "'plain'");
        assert_eq!(xpath_literal("it's"), "\"it's\"");
        assert_eq!(
            xpath_literal(r#"say "it's""#),
            r#"concat('say "it', "'", 's"')"#
        );
    }

    #[test]
    fn alert_selectors_try_platform_button_first() {
        let selectors = alert_dismiss_selectors();
        assert_eq!(selectors[0], Selector::id("android:id/button1"));
        assert_eq!(selectors[1].value, "//*[@text='OK']");
        assert_eq!(selectors[2].value, "//*[@text='ok']");
    }

    #[test]
    fn text_contains_selector() {
        assert_eq!(
            Selector::text_contains("Red").value,
            "//*[contains(@text, 'Red')]"
        );
    }

    #[test]
    fn selector_display_and_serde() {
        let sel = Selector::class_name("android.widget.Switch");
        assert_eq!(sel.to_string(), "class name=android.widget.Switch");

        let json = serde_json::to_string(&sel).unwrap();
        assert_eq!(json, r#"{"kind":"class_name","value":"android.widget.Switch"}"#);
        let back: Selector = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sel);
    }
}
