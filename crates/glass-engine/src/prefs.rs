//! Persisted effect defaults.

use glass_protocol::{BlurType, EffectParameters};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Defaults applied to new host windows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Default opacity.
    pub opacity: i32,
    /// Default brightness.
    pub brightness: i32,
    /// Default text brightness boost.
    pub text_brightness: i32,
    /// Default blur type.
    pub blur: BlurType,
    /// Render on the GPU.
    pub gpu_enabled: bool,
    /// Enable the effect as soon as a window's controller initialises.
    pub enabled_on_startup: bool,
    /// Switch the shared presentation to high contrast while enabled.
    pub use_high_contrast: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        let p = EffectParameters::default();
        Self {
            opacity: p.opacity,
            brightness: p.brightness,
            text_brightness: p.text_brightness,
            blur: p.blur,
            gpu_enabled: p.gpu,
            enabled_on_startup: false,
            use_high_contrast: true,
        }
    }
}

impl Preferences {
    /// Effect parameters these preferences describe.
    pub fn parameters(&self) -> EffectParameters {
        EffectParameters {
            opacity: self.opacity,
            brightness: self.brightness,
            text_brightness: self.text_brightness,
            blur: self.blur,
            gpu: self.gpu_enabled,
        }
    }

    /// Replace the effect parameters, keeping the startup flags.
    pub fn with_parameters(mut self, params: &EffectParameters) -> Self {
        self.opacity = params.opacity;
        self.brightness = params.brightness;
        self.text_brightness = params.text_brightness;
        self.blur = params.blur;
        self.gpu_enabled = params.gpu;
        self
    }
}

/// Backing store for [`Preferences`].
pub trait PreferenceStore: Send + Sync {
    /// Current defaults; a store that was never written yields `Preferences::default()`.
    fn load(&self) -> Result<Preferences>;

    /// Persist `prefs` as the new defaults.
    fn save(&self, prefs: &Preferences) -> Result<()>;

    /// Overwrite the stored values with the built-in defaults.
    fn reset_to_defaults(&self) -> Result<()> {
        self.save(&Preferences::default())
    }
}

/// Store kept in process memory.
#[derive(Default)]
pub struct MemoryPreferenceStore {
    /// Last saved value; `None` means defaults.
    saved: Mutex<Option<Preferences>>,
}

impl MemoryPreferenceStore {
    /// An empty store that loads defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `prefs`.
    pub fn with_saved(prefs: Preferences) -> Self {
        Self {
            saved: Mutex::new(Some(prefs)),
        }
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load(&self) -> Result<Preferences> {
        Ok(self.saved.lock().clone().unwrap_or_default())
    }

    fn save(&self, prefs: &Preferences) -> Result<()> {
        *self.saved.lock() = Some(prefs.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let p = MemoryPreferenceStore::new().load().unwrap();
        assert_eq!((p.opacity, p.brightness, p.text_brightness), (70, 70, 70));
        assert_eq!(p.blur, BlurType::None);
        assert!(p.gpu_enabled);
        assert!(!p.enabled_on_startup);
        assert!(p.use_high_contrast);
    }

    #[test]
    fn reset_discards_saved_values() {
        let store = MemoryPreferenceStore::with_saved(Preferences {
            opacity: 10,
            enabled_on_startup: true,
            ..Preferences::default()
        });
        assert_eq!(store.load().unwrap().opacity, 10);
        store.reset_to_defaults().unwrap();
        assert_eq!(store.load().unwrap(), Preferences::default());
    }

    #[test]
    fn missing_fields_take_defaults() {
        let p: Preferences = serde_json::from_str(r#"{"opacity": 40, "blur": "high"}"#).unwrap();
        assert_eq!(p.opacity, 40);
        assert_eq!(p.blur, BlurType::High);
        assert_eq!(p.brightness, 70);
        assert!(p.use_high_contrast);
    }

    #[test]
    fn parameters_round_into_preferences() {
        let params = EffectParameters {
            opacity: 1,
            brightness: 2,
            text_brightness: -3,
            blur: BlurType::Medium,
            gpu: false,
        };
        let p = Preferences::default().with_parameters(&params);
        assert_eq!(p.parameters(), params);
        assert!(p.use_high_contrast);
    }
}
