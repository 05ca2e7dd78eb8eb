pub mod manager;

pub use manager::SettingsManager;
