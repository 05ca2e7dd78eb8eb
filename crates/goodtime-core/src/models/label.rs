//! Label data model

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

use super::TimerProfile;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Label {
    pub id: i64,
    pub name: String,
    pub color_index: u32,
    pub order_index: u32,
    pub use_default_time_profile: bool,
    pub timer_profile: TimerProfile,
    pub is_archived: bool,
}

/// A label together with the profile that is actually in effect for it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DomainLabel {
    pub label: Label,
    pub profile: TimerProfile,
}

impl Label {
    pub const DEFAULT_LABEL_NAME: &'static str = "PRODUCTIVITY_DEFAULT_LABEL";

    /// Create a label that inherits the default label's profile
    pub fn new(name: String) -> Result<Self> {
        let label = Self {
            id: 0,
            name,
            color_index: 0,
            order_index: 0,
            use_default_time_profile: true,
            timer_profile: TimerProfile::default(),
            is_archived: false,
        };
        label.validate()?;
        Ok(label)
    }

    pub fn default_label() -> Self {
        Self {
            id: 1,
            name: Self::DEFAULT_LABEL_NAME.to_string(),
            color_index: 0,
            order_index: 0,
            use_default_time_profile: false,
            timer_profile: TimerProfile::default(),
            is_archived: false,
        }
    }

    pub fn is_default(&self) -> bool {
        self.name == Self::DEFAULT_LABEL_NAME
    }

    /// Validate the label data
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("Label name cannot be empty".to_string()));
        }

        if self.is_default() && self.is_archived {
            return Err(Error::Validation(
                "The default label cannot be archived".to_string(),
            ));
        }

        self.timer_profile.validate()
    }
}

impl DomainLabel {
    /// Pair `label` with its effective profile, inheriting from `default_label` if requested
    pub fn resolve(label: Label, default_label: &Label) -> Self {
        let profile = if label.use_default_time_profile {
            default_label.timer_profile.clone()
        } else {
            label.timer_profile.clone()
        };
        Self { label, profile }
    }

    pub fn is_countdown(&self) -> bool {
        self.profile.is_countdown
    }
}

impl Default for DomainLabel {
    fn default() -> Self {
        let label = Label::default_label();
        let profile = label.timer_profile.clone();
        Self { label, profile }
    }
}
