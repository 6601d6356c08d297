mod cluster;
pub use cluster::{Cluster, ClusterType};

mod context;
pub use context::SyntaxContext;

mod definition;
pub use definition::{HighlightGroup, SyntaxDefinition};

mod ids;
pub use ids::{ClusterId, ContextId, ItemId};

mod item;
pub use item::{ItemFlags, ItemKind, SyntaxItem};

mod keyword_chars;
pub use keyword_chars::{KeywordChars, DEFAULT_KEYWORD_CHARS};

mod pattern;
pub use pattern::{OffsetType, Pattern, PatternOffset, Whence};
