use rustc_hash::FxHashMap;
#[cfg(feature = "serde")]
use serde::Serialize;

use super::{ClusterId, ItemId};

/// The items of one syntax script.
///
/// The root script fills the main context, `syn include` creates a context per included syntax so
/// that `ALL`, `TOP` and `CONTAINED` of the including script do not pick up foreign items.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct SyntaxContext {
    name: String,
    items: Vec<ItemId>,
    top_clusters: Vec<ClusterId>,
    keywords: FxHashMap<String, Vec<ItemId>>,
    keywords_ignore_case: FxHashMap<String, Vec<ItemId>>,
}

impl SyntaxContext {
    /// Creates an empty context.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// The name, i.e. the syntax id of the script.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The items in definition order.
    pub fn items(&self) -> &[ItemId] {
        &self.items
    }

    /// The clusters every top-level item of this context belongs to.
    pub fn top_clusters(&self) -> &[ClusterId] {
        &self.top_clusters
    }

    /// The keyword items a word is found by. Available after [crate::SyntaxDefinition::finish].
    /// Case sensitive keywords come first.
    pub fn keyword_items(&self, word: &str) -> Vec<ItemId> {
        let mut items = self.keywords.get(word).cloned().unwrap_or_default();
        if let Some(more) = self.keywords_ignore_case.get(&word.to_lowercase()) {
            items.extend(more.iter().copied().filter(|i| !items.contains(i)).collect::<Vec<_>>());
        }
        items
    }

    pub(crate) fn add_item(&mut self, item: ItemId) {
        self.items.push(item);
    }

    pub(crate) fn add_top_cluster(&mut self, cluster: ClusterId) {
        if !self.top_clusters.contains(&cluster) {
            self.top_clusters.push(cluster);
        }
    }

    pub(crate) fn index_keyword(&mut self, spelling: String, item: ItemId, ignore_case: bool) {
        let index = if ignore_case {
            &mut self.keywords_ignore_case
        } else {
            &mut self.keywords
        };
        index.entry(spelling).or_default().push(item);
    }

    pub(crate) fn clear_keyword_index(&mut self) {
        self.keywords.clear();
        self.keywords_ignore_case.clear();
    }
}
