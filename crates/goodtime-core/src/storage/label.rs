//! Label storage operations

use crate::{models::Label, Result};
use std::path::PathBuf;

pub struct LabelStorage {
    data_dir: PathBuf,
}

impl LabelStorage {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Load all labels. The default label is always present.
    pub fn load(&self) -> Result<Vec<Label>> {
        let labels_path = self.data_dir.join("labels.json");

        let mut labels: Vec<Label> = if labels_path.exists() {
            let content = std::fs::read_to_string(&labels_path)?;
            if content.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            Vec::new()
        };

        if !labels.iter().any(Label::is_default) {
            labels.insert(0, Label::default_label());
            self.save(&labels)?;
        }

        Ok(labels)
    }

    pub fn save(&self, labels: &[Label]) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;

        let labels_path = self.data_dir.join("labels.json");
        let content = serde_json::to_string_pretty(labels)?;
        std::fs::write(labels_path, content)?;

        Ok(())
    }
}
