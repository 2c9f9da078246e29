use serde::{Deserialize, Serialize};

/// The catalog entry that stored files are attached to.
///
/// Owned by the surrounding catalog. Ingestion only fills in `title`,
/// `description` and `duration` when they are still empty, and appends the
/// ids of the stored files it creates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: i64,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Seconds
    pub duration: Option<u32>,
    pub files: Vec<i64>,
}

impl ContentItem {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn has_title(&self) -> bool {
        self.title.as_deref().is_some_and(|t| !t.trim().is_empty())
    }

    pub fn has_description(&self) -> bool {
        self.description
            .as_deref()
            .is_some_and(|d| !d.trim().is_empty())
    }

    pub fn has_duration(&self) -> bool {
        self.duration.is_some_and(|d| d > 0)
    }
}
