//! Class label list bundled with a model.

use crate::error::LoadError;
use crate::resource::ResourceStore;

/// Ordered class names, one per non-empty line of the label resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSet {
    labels: Vec<String>,
}

impl LabelSet {
    /// Parse newline-delimited labels. Blank lines are skipped and `\r\n`
    /// endings are accepted; file order is kept.
    pub fn parse(text: &str) -> Self {
        let labels = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect();
        Self { labels }
    }

    /// Load labels from a resource store.
    pub fn load(store: &dyn ResourceStore, path: &str) -> Result<Self, LoadError> {
        let text = store
            .read_to_string(path)
            .map_err(|e| LoadError::Labels {
                path: store.locate(path),
                message: e.to_string(),
            })?;
        let labels = Self::parse(&text);
        tracing::debug!("Loaded {} labels from {:?}", labels.len(), path);
        Ok(labels)
    }

    /// Label for a class index returned by the model.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}
