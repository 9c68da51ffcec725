use std::fmt;

/// Correlation key of a rendered feature back to its backend object.
pub type FeatureId = u64;

/// Backend id of a segment.
pub type SegmentId = u64;

/// Backend id of a spine.
pub type SpineId = u64;

/// Prefix of the synthetic view ids given to minimaps.
pub const OVERVIEW_PREFIX: &str = "overview";

/// Caller-supplied id of a mounted view.
///
/// Ids of the form `overview-<parent>` are reserved for minimaps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(String);

impl ViewId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Id of this view's minimap.
    pub fn minimap(&self) -> ViewId {
        ViewId(format!("{OVERVIEW_PREFIX}-{}", self.0))
    }

    /// Parent view id when this is a minimap id.
    pub fn minimap_parent(&self) -> Option<ViewId> {
        self.0
            .strip_prefix(OVERVIEW_PREFIX)
            .and_then(|rest| rest.strip_prefix('-'))
            .map(ViewId::new)
    }

    pub fn is_minimap(&self) -> bool {
        self.minimap_parent().is_some()
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ViewId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ViewId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimap_id_round_trips_to_parent() {
        let id = ViewId::new("v1");
        let mini = id.minimap();
        assert_eq!(mini.as_str(), "overview-v1");
        assert!(mini.is_minimap());
        assert_eq!(mini.minimap_parent(), Some(id.clone()));
        assert!(!id.is_minimap());
    }

    #[test]
    fn test_prefix_without_separator_is_not_a_minimap() {
        assert!(!ViewId::new("overviewer").is_minimap());
    }
}
