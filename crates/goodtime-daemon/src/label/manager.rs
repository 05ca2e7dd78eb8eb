use std::path::PathBuf;
use tokio::sync::{watch, Mutex};

use goodtime_core::{models::Label, storage::LabelStorage, Result as CoreResult};

use crate::repository::LabelRepository;

#[derive(Debug, thiserror::Error)]
pub enum LabelManagerError {
    #[error("Label not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] goodtime_core::Error),

    #[error("Invalid label: {0}")]
    Invalid(String),

    #[error("Task join error: {0}")]
    JoinError(String),
}

pub type Result<T> = std::result::Result<T, LabelManagerError>;

pub struct LabelManager {
    data_dir: PathBuf,
    labels_tx: watch::Sender<Vec<Label>>,
    write_lock: Mutex<()>,
}

impl LabelManager {
    pub fn new(data_dir: PathBuf) -> CoreResult<Self> {
        let labels = LabelStorage::new(data_dir.clone()).load()?;
        tracing::info!("Loaded {} labels", labels.len());

        let (labels_tx, _) = watch::channel(labels);
        Ok(Self {
            data_dir,
            labels_tx,
            write_lock: Mutex::new(()),
        })
    }

    pub fn get_all(&self) -> Vec<Label> {
        self.labels_tx.borrow().clone()
    }

    pub fn get(&self, name: &str) -> Option<Label> {
        self.labels_tx
            .borrow()
            .iter()
            .find(|label| label.name == name)
            .cloned()
    }

    /// Add a label, or replace the one with the same name keeping its id
    pub async fn upsert(&self, mut label: Label) -> Result<Label> {
        label
            .validate()
            .map_err(|e| LabelManagerError::Invalid(e.to_string()))?;

        let _guard = self.write_lock.lock().await;
        let mut labels = self.get_all();

        match labels.iter_mut().find(|existing| existing.name == label.name) {
            Some(existing) => {
                label.id = existing.id;
                *existing = label.clone();
            }
            None => {
                label.id = labels.iter().map(|l| l.id).max().unwrap_or(0) + 1;
                label.order_index = u32::try_from(labels.len()).unwrap_or(u32::MAX);
                labels.push(label.clone());
            }
        }

        self.store(labels).await?;
        tracing::info!("Saved label '{}' ({})", label.name, label.id);
        Ok(label)
    }

    pub async fn archive(&self, name: &str) -> Result<Label> {
        let mut label = self
            .get(name)
            .ok_or_else(|| LabelManagerError::NotFound(name.to_string()))?;
        label.is_archived = true;
        self.upsert(label).await
    }

    pub async fn delete(&self, name: &str) -> Result<()> {
        if name == Label::DEFAULT_LABEL_NAME {
            return Err(LabelManagerError::Invalid(
                "The default label cannot be deleted".to_string(),
            ));
        }

        let _guard = self.write_lock.lock().await;
        let mut labels = self.get_all();
        let before = labels.len();
        labels.retain(|label| label.name != name);
        if labels.len() == before {
            return Err(LabelManagerError::NotFound(name.to_string()));
        }

        self.store(labels).await?;
        tracing::info!("Deleted label '{}'", name);
        Ok(())
    }

    async fn store(&self, labels: Vec<Label>) -> Result<()> {
        let data_dir = self.data_dir.clone();
        let to_save = labels.clone();

        tokio::task::spawn_blocking(move || LabelStorage::new(data_dir).save(&to_save))
            .await
            .map_err(|e| LabelManagerError::JoinError(e.to_string()))??;

        self.labels_tx.send_replace(labels);
        Ok(())
    }
}

impl LabelRepository for LabelManager {
    fn labels(&self) -> watch::Receiver<Vec<Label>> {
        self.labels_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manager() -> (TempDir, LabelManager) {
        let temp_dir = TempDir::new().unwrap();
        let manager = LabelManager::new(temp_dir.path().to_path_buf()).unwrap();
        (temp_dir, manager)
    }

    #[tokio::test]
    async fn test_default_label_is_seeded() {
        let (_dir, manager) = manager();
        let labels = manager.get_all();
        assert_eq!(labels.len(), 1);
        assert!(labels[0].is_default());
    }

    #[tokio::test]
    async fn test_upsert_assigns_id_and_keeps_it() {
        let (temp_dir, manager) = manager();
        let mut rx = manager.labels();

        let reading = manager
            .upsert(Label::new("reading".to_string()).unwrap())
            .await
            .unwrap();
        assert_eq!(reading.id, 2);
        assert_eq!(reading.order_index, 1);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 2);

        let mut changed = reading.clone();
        changed.color_index = 3;
        let changed = manager.upsert(changed).await.unwrap();
        assert_eq!(changed.id, 2);
        assert_eq!(manager.get_all().len(), 2);

        let reloaded = LabelManager::new(temp_dir.path().to_path_buf()).unwrap();
        assert_eq!(reloaded.get("reading").unwrap().color_index, 3);
    }

    #[tokio::test]
    async fn test_upsert_rejects_invalid_label() {
        let (_dir, manager) = manager();
        let mut label = Label::new("broken".to_string()).unwrap();
        label.timer_profile.work_duration = 0;

        let result = manager.upsert(label).await;
        assert!(matches!(result, Err(LabelManagerError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_default_label_cannot_be_archived_or_deleted() {
        let (_dir, manager) = manager();

        let archived = manager.archive(Label::DEFAULT_LABEL_NAME).await;
        assert!(matches!(archived, Err(LabelManagerError::Invalid(_))));

        let deleted = manager.delete(Label::DEFAULT_LABEL_NAME).await;
        assert!(matches!(deleted, Err(LabelManagerError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_archive_and_delete() {
        let (_dir, manager) = manager();
        manager
            .upsert(Label::new("reading".to_string()).unwrap())
            .await
            .unwrap();

        let archived = manager.archive("reading").await.unwrap();
        assert!(archived.is_archived);

        manager.delete("reading").await.unwrap();
        assert!(manager.get("reading").is_none());

        let missing = manager.delete("reading").await;
        assert!(matches!(missing, Err(LabelManagerError::NotFound(_))));
    }
}
