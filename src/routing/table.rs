//! Route entries and the ordered route table.

use std::fmt;
use std::sync::Arc;

use axum::routing::MethodRouter;

/// Something that can produce the axum handler for a route.
///
/// The factory value carries whatever construction arguments its handler
/// needs. Any `MethodRouter` is a factory of itself.
pub trait HandlerFactory: Send + Sync {
    fn method_router(&self) -> MethodRouter;

    /// Short name used in logs.
    fn name(&self) -> &str {
        "handler"
    }
}

impl HandlerFactory for MethodRouter {
    fn method_router(&self) -> MethodRouter {
        self.clone()
    }

    fn name(&self) -> &str {
        "method_router"
    }
}

/// One `(pattern, handler factory)` pair.
#[derive(Clone)]
pub struct RouteEntry {
    pattern: String,
    factory: Arc<dyn HandlerFactory>,
}

impl RouteEntry {
    pub fn new(pattern: impl Into<String>, factory: impl HandlerFactory + 'static) -> Self {
        Self::from_arc(pattern, Arc::new(factory))
    }

    pub fn from_arc(pattern: impl Into<String>, factory: Arc<dyn HandlerFactory>) -> Self {
        Self {
            pattern: pattern.into(),
            factory,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn name(&self) -> &str {
        self.factory.name()
    }

    pub fn factory(&self) -> &Arc<dyn HandlerFactory> {
        &self.factory
    }
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RouteEntry")
            .field(&self.pattern)
            .field(&self.factory.name())
            .finish()
    }
}

/// Ordered route table. For a given pattern the earliest entry wins.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: RouteEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RouteEntry> {
        self.entries.iter()
    }

    pub fn patterns(&self) -> Vec<&str> {
        self.entries.iter().map(RouteEntry::pattern).collect()
    }
}

impl From<Vec<RouteEntry>> for RouteTable {
    fn from(entries: Vec<RouteEntry>) -> Self {
        Self { entries }
    }
}

impl<'a> IntoIterator for &'a RouteTable {
    type Item = &'a RouteEntry;
    type IntoIter = std::slice::Iter<'a, RouteEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
