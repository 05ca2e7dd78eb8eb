//! Settings storage operations

use crate::{models::AppSettings, Result};
use std::path::PathBuf;

pub struct SettingsStorage {
    data_dir: PathBuf,
}

impl SettingsStorage {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn load(&self) -> Result<AppSettings> {
        let settings_path = self.data_dir.join("settings.json");

        if !settings_path.exists() {
            let settings = AppSettings::default();
            self.save(&settings)?;
            return Ok(settings);
        }

        let content = std::fs::read_to_string(settings_path)?;

        // Handle empty file case
        if content.trim().is_empty() {
            let settings = AppSettings::default();
            self.save(&settings)?;
            return Ok(settings);
        }

        let settings: AppSettings = serde_json::from_str(&content)?;
        Ok(settings)
    }

    pub fn save(&self, settings: &AppSettings) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;

        let settings_path = self.data_dir.join("settings.json");
        let content = serde_json::to_string_pretty(settings)?;
        std::fs::write(settings_path, content)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LongBreakData;
    use tempfile::TempDir;

    #[test]
    fn test_load_creates_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let storage = SettingsStorage::new(temp_dir.path().to_path_buf());

        let settings = storage.load().unwrap();
        assert_eq!(settings, AppSettings::default());
        assert!(temp_dir.path().join("settings.json").exists());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let storage = SettingsStorage::new(temp_dir.path().to_path_buf());

        let settings = AppSettings {
            auto_start_break: true,
            long_break_data: LongBreakData::new(3, 42_000),
            ..AppSettings::default()
        };
        storage.save(&settings).unwrap();

        assert_eq!(storage.load().unwrap(), settings);
    }

    #[test]
    fn test_empty_file_falls_back_to_defaults() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("settings.json"), "  \n").unwrap();

        let storage = SettingsStorage::new(temp_dir.path().to_path_buf());
        assert_eq!(storage.load().unwrap(), AppSettings::default());
    }
}
