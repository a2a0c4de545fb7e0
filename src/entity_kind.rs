use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Every kind of curated entity the engine knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum EntityKind {
    Venue,
    Show,
    Song,
    SetlistEntry,
    JamAnnotation,
    Person,
    Appearance,
    Link,
    Upload,
    MetadataItem,
    ActivityFeedItem,
}

impl EntityKind {
    /// Order in which a full pass runs the transformers. Dimensions come
    /// before the facts that reference them.
    pub const DEPENDENCY_ORDER: [EntityKind; 11] = [
        EntityKind::Venue,
        EntityKind::Show,
        EntityKind::Song,
        EntityKind::SetlistEntry,
        EntityKind::JamAnnotation,
        EntityKind::Person,
        EntityKind::Appearance,
        EntityKind::Link,
        EntityKind::Upload,
        EntityKind::MetadataItem,
        EntityKind::ActivityFeedItem,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Venue => "venue",
            EntityKind::Show => "show",
            EntityKind::Song => "song",
            EntityKind::SetlistEntry => "setlist_entry",
            EntityKind::JamAnnotation => "jam_annotation",
            EntityKind::Person => "person",
            EntityKind::Appearance => "appearance",
            EntityKind::Link => "link",
            EntityKind::Upload => "upload",
            EntityKind::MetadataItem => "metadata_item",
            EntityKind::ActivityFeedItem => "activity_feed_item",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::DEPENDENCY_ORDER
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
