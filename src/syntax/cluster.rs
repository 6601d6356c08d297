#[cfg(feature = "serde")]
use serde::Serialize;

use super::{ContextId, ItemId};

/// How the member list of a cluster is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum ClusterType {
    /// The members are exactly the listed groups and clusters.
    #[default]
    NonMagic,
    /// `ALL`: every item of the context.
    All,
    /// `ALLBUT`: every item of the context except the listed ones.
    AllBut,
    /// `TOP`: the items without `contained`, except the listed ones.
    Top,
    /// `CONTAINED`: the items with `contained`, except the listed ones.
    Contained,
    /// `NONE`: nothing.
    None,
}

impl ClusterType {
    /// The type a member list entry stands for. Plain names are [ClusterType::NonMagic].
    pub fn from_entry(entry: &str) -> Self {
        match entry.trim().to_uppercase().as_str() {
            "ALL" => ClusterType::All,
            "ALLBUT" => ClusterType::AllBut,
            "TOP" => ClusterType::Top,
            "CONTAINED" => ClusterType::Contained,
            "NONE" => ClusterType::None,
            _ => ClusterType::NonMagic,
        }
    }
}

/// A set of syntax items given by group and cluster names.
///
/// Named clusters come from `syn cluster`, anonymous ones from the `contains`, `containedin`
/// and `nextgroup` options of an item. The member items are resolved by
/// [crate::SyntaxDefinition::finish].
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Cluster {
    name: Option<String>,
    context: ContextId,
    cluster_type: ClusterType,
    members: Vec<String>,
    items: Vec<ItemId>,
}

impl Cluster {
    /// Creates an empty cluster.
    pub fn new(name: Option<&str>, context: ContextId) -> Self {
        Self {
            name: name.map(str::to_string),
            context,
            ..Default::default()
        }
    }

    /// The name including the leading `@`, `None` for anonymous clusters.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The context `ALL`, `TOP` and friends refer to.
    pub fn context(&self) -> ContextId {
        self.context
    }

    /// The interpretation of the members.
    pub fn cluster_type(&self) -> ClusterType {
        self.cluster_type
    }

    /// The group and cluster names in insertion order.
    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// The resolved items. Empty before [crate::SyntaxDefinition::finish].
    pub fn items(&self) -> &[ItemId] {
        &self.items
    }

    /// Returns true if the member list contains the name, ignoring case.
    pub fn has_member(&self, name: &str) -> bool {
        self.members.iter().any(|m| m.eq_ignore_ascii_case(name))
    }

    /// Replaces type and members.
    pub(crate) fn set_contents(&mut self, cluster_type: ClusterType, members: Vec<String>) {
        self.cluster_type = cluster_type;
        self.members.clear();
        self.add_sets(members);
    }

    /// Appends members that are not in the list yet.
    pub(crate) fn add_sets(&mut self, members: Vec<String>) {
        for member in members {
            if !self.has_member(&member) {
                self.members.push(member);
            }
        }
    }

    /// Removes members.
    pub(crate) fn remove_sets(&mut self, members: &[String]) {
        self.members
            .retain(|m| !members.iter().any(|r| r.eq_ignore_ascii_case(m)));
    }

    pub(crate) fn set_items(&mut self, items: Vec<ItemId>) {
        self.items = items;
    }
}
