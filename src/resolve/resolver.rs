use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::backend::backend::{AccessibilityBackend, ElementHandle};
use crate::error::BackendError;
use crate::resolve::criteria::{ControlCategory, ElementCriteria, ResolveTarget};
use crate::tree::tree_model::NodeAttributes;

pub const DEFAULT_RESOLVE_DEPTH: usize = 10;

/// Which matching strategy located an element, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    Identifier,
    ExactTitle,
    TitleSubstring,
    TextScan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub handle: ElementHandle,
    pub strategy: MatchStrategy,
}

/// Locates live elements from criteria or free text.
///
/// Strategies, first success wins:
/// 1. exact identifier (backend lookup, or a bounded scan when unsupported)
/// 2. exact title on a control of the expected category
/// 3. case-insensitive title substring on the same category
/// 4. visible text scan over visible, enabled elements
///
/// Every strategy walks the live tree pre-order from the root, examining
/// depths `0..max_depth`. Unreadable nodes are skipped; a node whose children
/// cannot be listed hides its subtree. Resolution never mutates the UI.
#[derive(Debug, Clone, Copy)]
pub struct ElementResolver {
    pub max_depth: usize,
}

impl Default for ElementResolver {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_RESOLVE_DEPTH,
        }
    }
}

/// Normalized view of a target: what each strategy compares against.
struct Query<'a> {
    identifier: Option<&'a str>,
    title: Option<&'a str>,
    role: Option<&'a str>,
    scan: Scan<'a>,
}

enum Scan<'a> {
    Text(String),
    Criteria(&'a ElementCriteria),
}

impl<'a> Query<'a> {
    fn from_target(target: &'a ResolveTarget) -> Self {
        match target {
            ResolveTarget::Criteria(c) => Query {
                identifier: c.identifier(),
                title: c.title(),
                role: c.role(),
                scan: Scan::Criteria(c),
            },
            ResolveTarget::Text(text) => {
                let text = text.trim();
                Query {
                    identifier: Some(text),
                    title: Some(text),
                    role: None,
                    scan: Scan::Text(text.to_lowercase()),
                }
            }
        }
    }
}

impl ElementResolver {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn resolve(
        &self,
        backend: &mut dyn AccessibilityBackend,
        root: &ElementHandle,
        target: &ResolveTarget,
        category: ControlCategory,
    ) -> Option<Resolution> {
        if target.is_empty() {
            debug!("empty target resolves to nothing");
            return None;
        }

        let query = Query::from_target(target);

        let resolution = self
            .by_identifier(backend, root, &query)
            .map(|h| (h, MatchStrategy::Identifier))
            .or_else(|| {
                self.by_exact_title(backend, root, &query, category)
                    .map(|h| (h, MatchStrategy::ExactTitle))
            })
            .or_else(|| {
                self.by_title_substring(backend, root, &query, category)
                    .map(|h| (h, MatchStrategy::TitleSubstring))
            })
            .or_else(|| {
                self.by_text_scan(backend, root, &query)
                    .map(|h| (h, MatchStrategy::TextScan))
            })
            .map(|(handle, strategy)| Resolution { handle, strategy });

        match &resolution {
            Some(r) => debug!(%target, handle = %r.handle, strategy = ?r.strategy, "resolved"),
            None => debug!(%target, "no element matched"),
        }
        resolution
    }

    fn by_identifier(
        &self,
        backend: &mut dyn AccessibilityBackend,
        root: &ElementHandle,
        query: &Query<'_>,
    ) -> Option<ElementHandle> {
        let identifier = query.identifier?;

        match backend.find_by_identifier(root, identifier, self.max_depth) {
            Ok(found) => found,
            Err(BackendError::Unsupported(_)) => self.first_match(backend, root, |attrs| {
                attrs.identifier.as_deref() == Some(identifier)
            }),
            Err(e) => {
                warn!(identifier, error = %e, "identifier lookup failed");
                None
            }
        }
    }

    fn by_exact_title(
        &self,
        backend: &mut dyn AccessibilityBackend,
        root: &ElementHandle,
        query: &Query<'_>,
        category: ControlCategory,
    ) -> Option<ElementHandle> {
        let title = query.title?;
        self.first_match(backend, root, |attrs| {
            attrs.title.as_deref() == Some(title) && is_candidate(attrs, category, query.role)
        })
    }

    fn by_title_substring(
        &self,
        backend: &mut dyn AccessibilityBackend,
        root: &ElementHandle,
        query: &Query<'_>,
        category: ControlCategory,
    ) -> Option<ElementHandle> {
        let title = query.title?;
        let pattern = match substring_pattern(title) {
            Ok(p) => p,
            Err(e) => {
                warn!(title, error = %e, "could not build title pattern");
                return None;
            }
        };

        self.first_match(backend, root, |attrs| {
            attrs.title.as_deref().is_some_and(|t| pattern.is_match(t))
                && is_candidate(attrs, category, query.role)
        })
    }

    fn by_text_scan(
        &self,
        backend: &mut dyn AccessibilityBackend,
        root: &ElementHandle,
        query: &Query<'_>,
    ) -> Option<ElementHandle> {
        self.first_match(backend, root, |attrs| {
            if !attrs.is_visible() || !attrs.is_enabled() {
                return false;
            }
            match &query.scan {
                Scan::Text(needle) => text_contains(attrs, needle),
                Scan::Criteria(criteria) => criteria_matches(attrs, criteria),
            }
        })
    }

    /// First node in pre-order, within the depth bound, accepted by `accept`.
    fn first_match(
        &self,
        backend: &mut dyn AccessibilityBackend,
        root: &ElementHandle,
        mut accept: impl FnMut(&NodeAttributes) -> bool,
    ) -> Option<ElementHandle> {
        let mut stack = vec![(root.clone(), 0usize)];

        while let Some((handle, depth)) = stack.pop() {
            if depth >= self.max_depth {
                continue;
            }

            match backend.read_attributes(&handle) {
                Ok(attrs) => {
                    if accept(&attrs) {
                        return Some(handle);
                    }
                }
                Err(e) => trace!(%handle, error = %e, "skipping unreadable node"),
            }

            if depth + 1 >= self.max_depth {
                continue;
            }

            match backend.children(&handle) {
                Ok(children) => {
                    // Reversed so the first child is popped first
                    stack.extend(children.into_iter().rev().map(|c| (c, depth + 1)));
                }
                Err(e) => trace!(%handle, error = %e, "skipping subtree with unreadable children"),
            }
        }

        None
    }
}

fn substring_pattern(title: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(&regex::escape(title))
        .case_insensitive(true)
        .build()
}

fn is_candidate(attrs: &NodeAttributes, category: ControlCategory, role: Option<&str>) -> bool {
    let node_role = attrs.role.as_deref().unwrap_or("");
    if !category.accepts(node_role) {
        return false;
    }
    match role {
        Some(wanted) => contains_ci(node_role, wanted),
        None => true,
    }
}

fn text_contains(attrs: &NodeAttributes, needle_lower: &str) -> bool {
    attrs
        .visible_text()
        .any(|text| text.to_lowercase().contains(needle_lower))
}

/// Every populated field must match; an absent attribute never matches.
fn criteria_matches(attrs: &NodeAttributes, criteria: &ElementCriteria) -> bool {
    if criteria.is_empty() {
        return false;
    }
    if let Some(title) = criteria.title() {
        if !text_contains(attrs, &title.to_lowercase()) {
            return false;
        }
    }
    if let Some(description) = criteria.description() {
        if !text_contains(attrs, &description.to_lowercase()) {
            return false;
        }
    }
    if let Some(identifier) = criteria.identifier() {
        if !attrs
            .identifier
            .as_deref()
            .is_some_and(|id| contains_ci(id, identifier))
        {
            return false;
        }
    }
    if let Some(role) = criteria.role() {
        if !attrs.role.as_deref().is_some_and(|r| contains_ci(r, role)) {
            return false;
        }
    }
    true
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
