use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::{config::SkipperConfig, models::UserPreferences};

const ENABLE_LOGS: bool = true;

use crate::log_warn;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct UserSettings {
    pub skipper_enabled: bool,
    pub user_preferences: UserPreferences,
    pub timings: SkipperConfig,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            skipper_enabled: true,
            user_preferences: UserPreferences::default(),
            timings: SkipperConfig::default(),
        }
    }
}

/// JSON-backed user settings. Sessions read a snapshot when they start; later
/// edits apply to the next session.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log_warn!("ignoring unreadable settings at {}: {err}", path.display());
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn snapshot(&self) -> UserSettings {
        let mut settings = self.read().clone();
        settings.timings = settings.timings.sanitized();
        settings
    }

    pub fn enabled(&self) -> bool {
        self.read().skipper_enabled
    }

    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        let mut guard = self.write();
        guard.skipper_enabled = enabled;
        self.persist(&guard)
    }

    pub fn preferences(&self) -> UserPreferences {
        self.read().user_preferences.clone()
    }

    pub fn update_preferences(&self, preferences: UserPreferences) -> Result<()> {
        let mut guard = self.write();
        guard.user_preferences = preferences;
        self.persist(&guard)
    }

    pub fn timings(&self) -> SkipperConfig {
        self.read().timings.clone().sanitized()
    }

    pub fn update_timings(&self, timings: SkipperConfig) -> Result<()> {
        let mut guard = self.write();
        guard.timings = timings.sanitized();
        self.persist(&guard)
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: UserSettings = serde_json::from_str(&contents)
            .with_context(|| format!("Invalid settings in {}", self.path.display()))?;
        *self.write() = data;
        Ok(())
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, UserSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
