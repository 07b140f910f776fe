//! Light and dark palettes, persisted under `prestataire_theme`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::session::{KeyValueStore, StorageError, THEME_KEY};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

impl ThemeMode {
    pub fn toggled(self) -> Self {
        match self {
            ThemeMode::Light => ThemeMode::Dark,
            ThemeMode::Dark => ThemeMode::Light,
        }
    }

    pub fn palette(self) -> Palette {
        match self {
            ThemeMode::Light => Palette::LIGHT,
            ThemeMode::Dark => Palette::DARK,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Palette {
    pub primary: &'static str,
    pub secondary: &'static str,
    pub background: &'static str,
    pub surface: &'static str,
    pub text: &'static str,
    pub text_secondary: &'static str,
    pub border: &'static str,
    pub success: &'static str,
    pub warning: &'static str,
    pub error: &'static str,
}

impl Palette {
    pub const LIGHT: Palette = Palette {
        primary: "#1E6FD9",
        secondary: "#00A389",
        background: "#F5F7FA",
        surface: "#FFFFFF",
        text: "#1A1F36",
        text_secondary: "#6B7280",
        border: "#E2E8F0",
        success: "#16A34A",
        warning: "#F59E0B",
        error: "#DC2626",
    };

    pub const DARK: Palette = Palette {
        primary: "#4C8DF0",
        secondary: "#2DD4BF",
        background: "#0F172A",
        surface: "#1E293B",
        text: "#F1F5F9",
        text_secondary: "#94A3B8",
        border: "#334155",
        success: "#22C55E",
        warning: "#FBBF24",
        error: "#F87171",
    };
}

#[derive(Serialize)]
struct PersistedTheme {
    mode: ThemeMode,
    colors: Palette,
}

#[derive(Deserialize)]
struct StoredTheme {
    mode: ThemeMode,
}

/// Current theme, handed to each view explicitly.
pub struct ThemeStore {
    store: Arc<dyn KeyValueStore>,
    mode: ThemeMode,
}

impl ThemeStore {
    /// Read the persisted theme; anything unreadable falls back to light.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let mode = match store.get(THEME_KEY) {
            Ok(Some(raw)) => serde_json::from_str::<StoredTheme>(&raw)
                .map(|t| t.mode)
                .unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "ignoring unreadable theme");
                    ThemeMode::default()
                }),
            Ok(None) => ThemeMode::default(),
            Err(e) => {
                tracing::warn!(error = %e, "could not read theme");
                ThemeMode::default()
            }
        };
        Self { store, mode }
    }

    pub fn mode(&self) -> ThemeMode {
        self.mode
    }

    pub fn is_dark(&self) -> bool {
        self.mode == ThemeMode::Dark
    }

    pub fn palette(&self) -> Palette {
        self.mode.palette()
    }

    /// Switch mode and persist it. The in-memory mode changes even if
    /// persisting fails.
    pub fn set_theme(&mut self, mode: ThemeMode) -> Result<ThemeMode, StorageError> {
        self.mode = mode;
        let raw = serde_json::to_string(&PersistedTheme {
            mode,
            colors: mode.palette(),
        })?;
        self.store.set(THEME_KEY, &raw)?;
        Ok(mode)
    }

    pub fn toggle_theme(&mut self) -> Result<ThemeMode, StorageError> {
        self.set_theme(self.mode.toggled())
    }
}
