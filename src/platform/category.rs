use crate::config::{CategoryEntry, Config};

/// Ordered keyword table used to classify records
///
/// Rows are scanned in order and the first row with a keyword contained in
/// the lowercased `title + " " + content` wins.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTable {
    rows: Vec<(String, Vec<String>)>,
    default_category: String,
}

impl CategoryTable {
    pub fn new(entries: &[CategoryEntry], default_category: impl Into<String>) -> Self {
        let rows = entries
            .iter()
            .map(|entry| {
                let keywords = entry.keywords.iter().map(|k| k.to_lowercase()).collect();
                (entry.name.clone(), keywords)
            })
            .collect();

        Self {
            rows,
            default_category: default_category.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.categories, config.default_category.clone())
    }

    pub fn default_category(&self) -> &str {
        &self.default_category
    }

    /// Category names in table order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|(name, _)| name.as_str())
    }

    pub fn classify(&self, title: &str, content: &str) -> String {
        let text = format!("{} {}", title, content).to_lowercase();

        self.rows
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k.as_str())))
            .map(|(name, _)| name.clone())
            .unwrap_or_else(|| self.default_category.clone())
    }
}
