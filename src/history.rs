//! Navigation history: a stack of visited locations, each optionally holding
//! the raw bytes last fetched for it.

use tracing::debug;

use crate::constants::QUERY_NOT_CACHED_PAGE;
use crate::models::{ItemType, Location, ViewMemory};

#[derive(Debug, Clone)]
pub struct HistoryNode {
    pub location: Location,
    pub view: ViewMemory,
    pub cache: Option<Vec<u8>>,
}

impl HistoryNode {
    fn new(location: Location) -> Self {
        Self {
            location,
            view: ViewMemory::default(),
            cache: None,
        }
    }

    pub fn cache_size(&self) -> usize {
        self.cache.as_ref().map_or(0, Vec::len)
    }

    /// Forget the cached content and the view position, forcing a reload.
    pub fn invalidate(&mut self) {
        self.cache = None;
        self.view = ViewMemory::default();
    }
}

/// Newest node last; the node below the top is where "back" leads.
#[derive(Debug, Default)]
pub struct HistoryStack {
    nodes: Vec<HistoryNode>,
}

impl HistoryStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn top(&self) -> Option<&HistoryNode> {
        self.nodes.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut HistoryNode> {
        self.nodes.last_mut()
    }

    /// Visit `location`. Visiting the page we just came from is a "back".
    pub fn push(&mut self, location: Location) {
        let below_top = self.nodes.len().checked_sub(2).map(|i| &self.nodes[i]);
        if below_top.is_some_and(|node| node.location.is_same(&location)) {
            debug!(host = %location.host, "push of previous location collapsed into back");
            self.pop();
            return;
        }
        self.nodes.push(HistoryNode::new(location));
    }

    /// Drop the top node. A query page left without content gets a
    /// placeholder instead of being silently re-run.
    pub fn pop(&mut self) -> Option<HistoryNode> {
        let popped = self.nodes.pop();
        if let Some(top) = self.nodes.last_mut() {
            if top.location.item_type == ItemType::QUERY && top.cache.is_none() {
                top.cache = Some(QUERY_NOT_CACHED_PAGE.as_bytes().to_vec());
            }
        }
        popped
    }

    /// Release cached content beyond the newest `max_total` bytes. Built-in
    /// pages never keep a cache.
    pub fn cleanup_cache(&mut self, max_total: usize) {
        let mut total = 0usize;
        for node in self.nodes.iter_mut().rev() {
            total = total.saturating_add(node.cache_size());
            if total > max_total || node.location.is_builtin() {
                if let Some(cache) = node.cache.take() {
                    debug!(
                        host = %node.location.host,
                        bytes = cache.len(),
                        "released history cache"
                    );
                }
            }
        }
    }

    pub fn total_cached(&self) -> usize {
        self.nodes.iter().map(HistoryNode::cache_size).sum()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }
}
