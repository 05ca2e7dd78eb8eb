pub mod label;
pub mod session;
pub mod settings;

pub use label::LabelStorage;
pub use session::SessionStorage;
pub use settings::SettingsStorage;

use std::path::PathBuf;

pub fn get_data_dir() -> crate::Result<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join("goodtime"))
        .ok_or_else(|| crate::Error::NotFound("data directory".to_string()))
}

pub fn init_data_dir() -> crate::Result<PathBuf> {
    let data_dir = get_data_dir()?;
    std::fs::create_dir_all(&data_dir)?;
    Ok(data_dir)
}
