use log::{debug, trace};
use rustc_hash::FxHashMap;
#[cfg(feature = "serde")]
use serde::Serialize;

use super::{
    Cluster, ClusterId, ClusterType, ContextId, ItemId, ItemKind, KeywordChars, SyntaxContext,
    SyntaxItem,
};
use crate::{
    has_magic_regex_chars, ConversionOptions, Result, VimRegexConverter, VimsynError,
    VimsynErrorKind,
};

/// A highlight group with the items that highlight as that group.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct HighlightGroup {
    name: String,
    items: Vec<ItemId>,
    link: Option<String>,
}

impl HighlightGroup {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// The name as it was first used.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The items of the group.
    pub fn items(&self) -> &[ItemId] {
        &self.items
    }

    /// The group this one links to.
    pub fn link(&self) -> Option<&str> {
        self.link.as_deref()
    }
}

/// The rule model built from a syntax script and the scripts it includes.
///
/// Groups and named clusters are looked up ignoring case. Items, contexts and clusters live in
/// arenas and refer to each other by id.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct SyntaxDefinition {
    syntax_id: String,
    contexts: Vec<SyntaxContext>,
    items: Vec<SyntaxItem>,
    groups: FxHashMap<String, HighlightGroup>,
    clusters: Vec<Cluster>,
    named_clusters: FxHashMap<String, ClusterId>,
    keyword_chars: KeywordChars,
    finished: bool,
}

impl SyntaxDefinition {
    /// Creates an empty definition whose main context is named after the syntax id.
    pub fn new(syntax_id: &str) -> Self {
        Self {
            syntax_id: syntax_id.to_string(),
            contexts: vec![SyntaxContext::new(syntax_id)],
            items: Vec::new(),
            groups: FxHashMap::default(),
            clusters: Vec::new(),
            named_clusters: FxHashMap::default(),
            keyword_chars: KeywordChars::default(),
            finished: false,
        }
    }

    /// The syntax id, i.e. the file stem of the root script.
    pub fn syntax_id(&self) -> &str {
        &self.syntax_id
    }

    /// All contexts, the main context first.
    pub fn contexts(&self) -> &[SyntaxContext] {
        &self.contexts
    }

    /// A context by id.
    pub fn context(&self, id: ContextId) -> &SyntaxContext {
        &self.contexts[id]
    }

    /// The context of the root script.
    pub fn main_context(&self) -> &SyntaxContext {
        &self.contexts[ContextId::MAIN]
    }

    /// Looks up a context by name, ignoring case.
    pub fn context_id(&self, name: &str) -> Option<ContextId> {
        self.contexts
            .iter()
            .position(|c| c.name().eq_ignore_ascii_case(name))
            .map(ContextId::from)
    }

    /// Returns the context with the given name, creating it if needed.
    pub fn get_or_add_context(&mut self, name: &str) -> ContextId {
        self.context_id(name).unwrap_or_else(|| {
            debug!("New syntax context '{name}'");
            self.contexts.push(SyntaxContext::new(name));
            ContextId::from(self.contexts.len() - 1)
        })
    }

    /// All items in definition order.
    pub fn items(&self) -> &[SyntaxItem] {
        &self.items
    }

    /// An item by id.
    pub fn item(&self, id: ItemId) -> &SyntaxItem {
        &self.items[id]
    }

    /// Adds an item to the arena, its context and its group.
    pub fn add_item(&mut self, item: SyntaxItem) -> ItemId {
        let id = ItemId::from(self.items.len());
        trace!("Item {id} of group {}", item.group_name);
        self.contexts[item.context].add_item(id);
        self.group_entry(&item.group_name).items.push(id);
        self.items.push(item);
        id
    }

    /// A group by name, ignoring case.
    pub fn group(&self, name: &str) -> Option<&HighlightGroup> {
        self.groups.get(&name.to_uppercase())
    }

    /// All groups, in no particular order.
    pub fn groups(&self) -> impl Iterator<Item = &HighlightGroup> {
        self.groups.values()
    }

    fn group_entry(&mut self, name: &str) -> &mut HighlightGroup {
        self.groups
            .entry(name.to_uppercase())
            .or_insert_with(|| HighlightGroup::new(name))
    }

    /// Links the highlighting of a group to another group. Both are created if needed.
    pub fn add_highlight_link(&mut self, from: &str, to: &str) {
        trace!("Highlight link {from} -> {to}");
        self.group_entry(to);
        self.group_entry(from).link = Some(to.to_string());
    }

    /// The group a group links to directly.
    pub fn highlight_link(&self, group: &str) -> Option<&str> {
        self.group(group).and_then(HighlightGroup::link)
    }

    /// Follows the links of a group to the group that finally provides the highlighting.
    pub fn resolve_highlight(&self, group: &str) -> String {
        let mut current = group.to_string();
        let mut seen = vec![current.to_uppercase()];
        while let Some(next) = self.highlight_link(&current) {
            if seen.contains(&next.to_uppercase()) {
                break;
            }
            seen.push(next.to_uppercase());
            current = next.to_string();
        }
        current
    }

    /// All clusters, named and anonymous.
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// A cluster by id.
    pub fn cluster(&self, id: ClusterId) -> &Cluster {
        &self.clusters[id]
    }

    /// Looks up a named cluster, ignoring case. The name includes the leading `@`.
    pub fn named_cluster_id(&self, name: &str) -> Option<ClusterId> {
        self.named_clusters.get(&name.to_uppercase()).copied()
    }

    /// A named cluster.
    pub fn named_cluster(&self, name: &str) -> Option<&Cluster> {
        self.named_cluster_id(name).map(|id| &self.clusters[id])
    }

    /// Returns the named cluster, creating it in the given context if needed.
    pub fn get_or_add_named_cluster(&mut self, name: &str, context: ContextId) -> Result<ClusterId> {
        if !name.starts_with('@') || name.len() < 2 {
            return Err(VimsynError::new(VimsynErrorKind::InvalidClusterName(
                name.to_string(),
            )));
        }
        if let Some(id) = self.named_cluster_id(name) {
            return Ok(id);
        }
        let id = ClusterId::from(self.clusters.len());
        self.clusters.push(Cluster::new(Some(name), context));
        self.named_clusters.insert(name.to_uppercase(), id);
        Ok(id)
    }

    /// Creates a cluster for the `contains`, `containedin` or `nextgroup` option of an item.
    pub fn add_anonymous_cluster(&mut self, context: ContextId) -> ClusterId {
        self.clusters.push(Cluster::new(None, context));
        ClusterId::from(self.clusters.len() - 1)
    }

    /// Replaces the contents of a cluster. The first entry may be `ALL`, `ALLBUT`, `TOP`,
    /// `CONTAINED` or `NONE`, entries with regex characters are expanded to the matching groups.
    pub fn set_cluster_contents(&mut self, id: ClusterId, entries: &[String]) -> Result<()> {
        let cluster_type = entries
            .first()
            .map_or(ClusterType::NonMagic, |e| ClusterType::from_entry(e));
        let context = self.clusters[id].context();
        let members = self.expand_set_names(entries, context)?;
        self.clusters[id].set_contents(cluster_type, members);
        Ok(())
    }

    /// Adds groups and clusters to a cluster.
    pub fn add_to_cluster(&mut self, id: ClusterId, entries: &[String]) -> Result<()> {
        let context = self.clusters[id].context();
        let members = self.expand_set_names(entries, context)?;
        self.clusters[id].add_sets(members);
        Ok(())
    }

    /// Removes groups and clusters from a cluster.
    pub fn remove_from_cluster(&mut self, id: ClusterId, entries: &[String]) -> Result<()> {
        let context = self.clusters[id].context();
        let members = self.expand_set_names(entries, context)?;
        self.clusters[id].remove_sets(&members);
        Ok(())
    }

    /// Makes every item of the context that is not `contained` a member of the cluster.
    pub fn add_top_cluster(&mut self, context: ContextId, cluster: ClusterId) {
        self.contexts[context].add_top_cluster(cluster);
    }

    /// The keyword characters.
    pub fn keyword_chars(&self) -> &KeywordChars {
        &self.keyword_chars
    }

    /// The keyword characters, for `iskeyword` commands.
    pub fn keyword_chars_mut(&mut self) -> &mut KeywordChars {
        &mut self.keyword_chars
    }

    /// Returns true once [Self::finish] ran.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Resolves all clusters to items and builds the keyword index of the contexts.
    pub fn finish(&mut self) -> Result<()> {
        let resolved: Vec<Vec<ItemId>> = (0..self.clusters.len())
            .map(|id| self.resolve_cluster(ClusterId::from(id), &mut Vec::new()))
            .collect();
        for (cluster, items) in self.clusters.iter_mut().zip(resolved) {
            cluster.set_items(items);
        }
        for context in &mut self.contexts {
            context.clear_keyword_index();
        }
        for (index, item) in self.items.iter().enumerate() {
            let ignore_case = matches!(item.kind, ItemKind::Keyword { ignore_case: true, .. });
            for spelling in item.keyword_spellings() {
                self.contexts[item.context].index_keyword(
                    spelling,
                    ItemId::from(index),
                    ignore_case,
                );
            }
        }
        self.finished = true;
        debug!(
            "Syntax '{}' finished: {} contexts, {} items, {} clusters",
            self.syntax_id,
            self.contexts.len(),
            self.items.len(),
            self.clusters.len()
        );
        Ok(())
    }

    /// Dumps the definition as JSON.
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn expand_set_names(&mut self, entries: &[String], context: ContextId) -> Result<Vec<String>> {
        let mut names: Vec<String> = Vec::new();
        for entry in entries.iter().map(|e| e.trim()) {
            if entry.is_empty() || ClusterType::from_entry(entry) != ClusterType::NonMagic {
                continue;
            }
            if entry.starts_with('@') {
                self.get_or_add_named_cluster(entry, context)?;
                names.push(entry.to_string());
            } else if has_magic_regex_chars(entry) {
                names.extend(self.groups_matching(entry)?);
            } else {
                names.push(entry.to_string());
            }
        }
        let mut unique: Vec<String> = Vec::with_capacity(names.len());
        for name in names {
            if !unique.iter().any(|u| u.eq_ignore_ascii_case(&name)) {
                unique.push(name);
            }
        }
        Ok(unique)
    }

    /// The names of the known groups a Vim regex matches completely, ignoring case.
    fn groups_matching(&self, vim_regex: &str) -> Result<Vec<String>> {
        let options = ConversionOptions {
            force_multiline_mode: false,
            ..ConversionOptions::default_multiline()
        };
        let converted = VimRegexConverter::new(options).convert(vim_regex)?;
        let regex = fancy_regex::Regex::new(&format!("(?i)^(?:{})$", converted.regex)).map_err(
            |e| {
                VimsynError::new(VimsynErrorKind::RegexVerification {
                    vim_regex: vim_regex.to_string(),
                    converted: converted.regex.clone(),
                    source: Box::new(e),
                })
            },
        )?;
        let mut names: Vec<String> = self
            .groups
            .values()
            .map(|g| g.name().to_string())
            .filter(|name| regex.is_match(name).unwrap_or(false))
            .collect();
        names.sort();
        trace!("'{vim_regex}' expands to {names:?}");
        Ok(names)
    }

    fn resolve_cluster(&self, id: ClusterId, resolving: &mut Vec<ClusterId>) -> Vec<ItemId> {
        let cluster = &self.clusters[id];
        resolving.push(id);
        let context = &self.contexts[cluster.context()];
        let contained = |item: &ItemId| self.items[*item].flags.contained;
        let mut items: Vec<ItemId> = match cluster.cluster_type() {
            ClusterType::None => Vec::new(),
            ClusterType::All => context.items().to_vec(),
            ClusterType::NonMagic => self.member_items(cluster, resolving),
            ClusterType::AllBut => {
                let listed = self.member_items(cluster, resolving);
                except(context.items().iter().copied(), &listed)
            }
            ClusterType::Top => {
                let listed = self.member_items(cluster, resolving);
                except(context.items().iter().copied().filter(|i| !contained(i)), &listed)
            }
            ClusterType::Contained => {
                let listed = self.member_items(cluster, resolving);
                except(context.items().iter().copied().filter(contained), &listed)
            }
        };
        for top_context in self.contexts.iter().filter(|c| c.top_clusters().contains(&id)) {
            items.extend(top_context.items().iter().copied().filter(|i| !contained(i)));
        }
        resolving.pop();
        dedup(items)
    }

    fn member_items(&self, cluster: &Cluster, resolving: &mut Vec<ClusterId>) -> Vec<ItemId> {
        let mut items = Vec::new();
        for member in cluster.members() {
            if member.starts_with('@') {
                match self.named_cluster_id(member) {
                    Some(id) if !resolving.contains(&id) => {
                        items.extend(self.resolve_cluster(id, resolving))
                    }
                    _ => {}
                }
            } else if let Some(group) = self.group(member) {
                items.extend_from_slice(group.items());
            }
        }
        dedup(items)
    }
}

fn except(items: impl Iterator<Item = ItemId>, excluded: &[ItemId]) -> Vec<ItemId> {
    items.filter(|i| !excluded.contains(i)).collect()
}

fn dedup(items: Vec<ItemId>) -> Vec<ItemId> {
    let mut unique = Vec::with_capacity(items.len());
    for item in items {
        if !unique.contains(&item) {
            unique.push(item);
        }
    }
    unique
}
