//! Settings manager

use futures::future::BoxFuture;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

use goodtime_core::{
    models::{AppSettings, BreakBudgetData, Label, LongBreakData},
    storage::SettingsStorage,
    Result as CoreResult,
};

use crate::repository::SettingsRepository;

/// Settings manager error
#[derive(Debug, thiserror::Error)]
pub enum SettingsManagerError {
    #[error("Storage error: {0}")]
    Storage(#[from] goodtime_core::Error),

    #[error("Task join error: {0}")]
    JoinError(String),
}

pub type Result<T> = std::result::Result<T, SettingsManagerError>;

impl From<SettingsManagerError> for goodtime_core::Error {
    fn from(error: SettingsManagerError) -> Self {
        match error {
            SettingsManagerError::Storage(e) => e,
            SettingsManagerError::JoinError(msg) => goodtime_core::Error::Io(std::io::Error::other(msg)),
        }
    }
}

/// Keeps `settings.json` and the observable settings in sync
pub struct SettingsManager {
    storage: Arc<SettingsStorage>,
    settings_tx: watch::Sender<AppSettings>,
    write_lock: Mutex<()>,
}

impl SettingsManager {
    pub fn new(data_dir: PathBuf) -> CoreResult<Self> {
        let storage = SettingsStorage::new(data_dir);

        // Load or create default settings
        let settings = storage.load()?;
        let (settings_tx, _) = watch::channel(settings);

        Ok(Self {
            storage: Arc::new(storage),
            settings_tx,
            write_lock: Mutex::new(()),
        })
    }

    pub fn get(&self) -> AppSettings {
        self.settings_tx.borrow().clone()
    }

    /// Apply `change`, save the result and publish it
    pub async fn update<F>(&self, change: F) -> Result<AppSettings>
    where
        F: FnOnce(&mut AppSettings),
    {
        let _guard = self.write_lock.lock().await;

        let mut settings = self.get();
        change(&mut settings);

        let storage = self.storage.clone();
        let to_save = settings.clone();
        tokio::task::spawn_blocking(move || storage.save(&to_save))
            .await
            .map_err(|e| SettingsManagerError::JoinError(e.to_string()))??;

        self.settings_tx.send_replace(settings.clone());
        Ok(settings)
    }

    pub async fn set_label_name(&self, label_name: String) -> Result<AppSettings> {
        tracing::info!("Activating label '{}'", label_name);
        self.update(|settings| settings.label_name = label_name).await
    }

    pub async fn set_auto_start_work(&self, enabled: bool) -> Result<AppSettings> {
        self.update(|settings| settings.auto_start_work = enabled)
            .await
    }

    pub async fn set_auto_start_break(&self, enabled: bool) -> Result<AppSettings> {
        self.update(|settings| settings.auto_start_break = enabled)
            .await
    }
}

impl SettingsRepository for SettingsManager {
    fn settings(&self) -> watch::Receiver<AppSettings> {
        self.settings_tx.subscribe()
    }

    fn set_long_break_data(&self, data: LongBreakData) -> BoxFuture<'_, CoreResult<()>> {
        Box::pin(async move {
            self.update(|settings| settings.long_break_data = data)
                .await?;
            Ok(())
        })
    }

    fn set_break_budget_data(&self, data: BreakBudgetData) -> BoxFuture<'_, CoreResult<()>> {
        Box::pin(async move {
            self.update(|settings| settings.break_budget_data = data)
                .await?;
            Ok(())
        })
    }

    fn activate_default_label(&self) -> BoxFuture<'_, CoreResult<()>> {
        Box::pin(async move {
            self.set_label_name(Label::DEFAULT_LABEL_NAME.to_string())
                .await?;
            Ok(())
        })
    }
}
