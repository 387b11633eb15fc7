//! Shared high-contrast presentation mode.
//!
//! Any number of controllers may hold a request, but the mode is only applied
//! while at most one host window is open. The appearance in effect before the
//! switch is captured and restored once the mode is torn down.

use std::{fmt, mem, sync::Arc};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{Result, host::HostWindows};

/// An sRGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// WCAG relative luminance in `0.0..=1.0`.
    pub fn luminance(self) -> f64 {
        fn channel(c: u8) -> f64 {
            let c = f64::from(c) / 255.0;
            if c <= 0.039_28 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        }
        0.2126 * channel(self.0) + 0.7152 * channel(self.1) + 0.0722 * channel(self.2)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// Foreground/background colours of one UI element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorPair {
    /// UI element the colours apply to.
    pub element: String,
    /// Foreground.
    pub fg: Rgb,
    /// Background.
    pub bg: Rgb,
}

impl ColorPair {
    /// Pair for `element`.
    pub fn new(element: impl Into<String>, fg: Rgb, bg: Rgb) -> Self {
        Self {
            element: element.into(),
            fg,
            bg,
        }
    }
}

/// A named set of element colours.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    /// Display name.
    pub name: String,
    /// Colours per element.
    pub pairs: Vec<ColorPair>,
}

impl Palette {
    /// Built-in high-contrast palette.
    pub fn high_contrast() -> Self {
        let black = Rgb(0, 0, 0);
        let white = Rgb(255, 255, 255);
        Self {
            name: "High Contrast".into(),
            pairs: vec![
                ColorPair::new("text", white, black),
                ColorPair::new("selection", black, Rgb(0, 255, 255)),
                ColorPair::new("comment", Rgb(0, 255, 0), black),
                ColorPair::new("keyword", Rgb(255, 255, 0), black),
                ColorPair::new("caret_row", white, Rgb(32, 32, 32)),
                ColorPair::new("gutter", Rgb(0, 0, 128), black),
            ],
        }
    }

    /// Swap every pair whose foreground is darker than its background.
    pub fn legible(mut self) -> Self {
        for pair in &mut self.pairs {
            if pair.fg.luminance() < pair.bg.luminance() {
                debug!(element = %pair.element, fg = %pair.fg, bg = %pair.bg, "contrast_swap");
                mem::swap(&mut pair.fg, &mut pair.bg);
            }
        }
        self
    }
}

/// Host-side presentation the contrast mode switches.
pub trait Appearance: Send {
    /// Palette currently presented.
    fn current(&self) -> Result<Palette>;
    /// Present `palette`.
    fn present(&mut self, palette: &Palette) -> Result<()>;
    /// Palette used while the contrast mode is applied.
    fn high_contrast(&self) -> Palette {
        Palette::high_contrast()
    }
}

/// Appearance held in memory. Clones share the presented palette.
#[derive(Clone)]
pub struct MemoryAppearance {
    /// Palette last presented.
    presented: Arc<Mutex<Palette>>,
}

impl MemoryAppearance {
    /// An appearance presenting `initial`.
    pub fn new(initial: Palette) -> Self {
        Self {
            presented: Arc::new(Mutex::new(initial)),
        }
    }

    /// Palette currently presented.
    pub fn presented(&self) -> Palette {
        self.presented.lock().clone()
    }
}

impl Appearance for MemoryAppearance {
    fn current(&self) -> Result<Palette> {
        Ok(self.presented())
    }

    fn present(&mut self, palette: &Palette) -> Result<()> {
        info!(palette = %palette.name, "appearance_present");
        *self.presented.lock() = palette.clone();
        Ok(())
    }
}

/// Mode state behind the coordinator lock.
struct ContrastState {
    /// Outstanding requests.
    holders: usize,
    /// Whether the high-contrast palette is presented.
    applied: bool,
    /// Set exactly while `applied` is true.
    saved: Option<Palette>,
    /// Presentation being switched.
    appearance: Box<dyn Appearance>,
}

impl ContrastState {
    /// Capture the current palette and present the legible high-contrast one.
    fn apply(&mut self) -> Result<()> {
        let saved = self.appearance.current()?;
        let palette = self.appearance.high_contrast().legible();
        self.appearance.present(&palette)?;
        debug!(saved = %saved.name, "contrast_applied");
        self.saved = Some(saved);
        self.applied = true;
        Ok(())
    }

    /// Present the captured palette again, if applied.
    fn restore(&mut self) {
        if !self.applied {
            return;
        }
        if let Some(saved) = self.saved.take()
            && let Err(e) = self.appearance.present(&saved)
        {
            warn!(error = %e, "contrast_restore_failed");
        }
        self.applied = false;
        debug!("contrast_restored");
    }
}

/// Reference-counted owner of the high-contrast mode.
#[derive(Clone)]
pub struct ContrastCoordinator {
    /// Shared mode state.
    state: Arc<Mutex<ContrastState>>,
    /// Open host windows; the mode only applies with at most one.
    windows: HostWindows,
}

impl ContrastCoordinator {
    /// Coordinator switching `appearance`, gated on `windows`.
    pub fn new(appearance: impl Appearance + 'static, windows: HostWindows) -> Self {
        Self {
            state: Arc::new(Mutex::new(ContrastState {
                holders: 0,
                applied: false,
                saved: None,
                appearance: Box::new(appearance),
            })),
            windows,
        }
    }

    /// Add a holder. Applies the mode if at most one window is open and it
    /// is not applied yet; returns whether it is applied afterwards.
    ///
    /// The holder is counted even when applying fails.
    pub fn request(&self) -> Result<bool> {
        let mut st = self.state.lock();
        st.holders += 1;
        if self.windows.count() <= 1 && !st.applied {
            st.apply()?;
        }
        Ok(st.applied)
    }

    /// Drop a holder and restore the prior appearance if the mode is applied.
    pub fn release(&self) {
        let mut st = self.state.lock();
        st.holders = st.holders.saturating_sub(1);
        st.restore();
    }

    /// Bring the mode in line with the current window count.
    pub fn reconcile(&self) -> Result<bool> {
        let mut st = self.state.lock();
        if st.holders == 0 {
            return Ok(st.applied);
        }
        let open = self.windows.count();
        if open <= 1 && !st.applied {
            st.apply()?;
        } else if open > 1 && st.applied {
            st.restore();
        }
        Ok(st.applied)
    }

    /// Whether the high-contrast palette is presented.
    pub fn is_applied(&self) -> bool {
        self.state.lock().applied
    }

    /// Number of outstanding requests.
    pub fn holders(&self) -> usize {
        self.state.lock().holders
    }

    /// Appearance captured when the mode was applied.
    pub fn saved(&self) -> Option<Palette> {
        self.state.lock().saved.clone()
    }

    /// Host windows currently open.
    pub fn open_windows(&self) -> usize {
        self.windows.count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn light() -> Palette {
        Palette {
            name: "Light".into(),
            pairs: vec![ColorPair::new("text", Rgb(0, 0, 0), Rgb(255, 255, 255))],
        }
    }

    struct Broken;

    impl Appearance for Broken {
        fn current(&self) -> Result<Palette> {
            Ok(light())
        }
        fn present(&mut self, _: &Palette) -> Result<()> {
            Err(Error::Appearance("no display".into()))
        }
    }

    #[test]
    fn luminance_orders_black_below_white() {
        assert!(Rgb(0, 0, 0).luminance() < 0.001);
        assert!((Rgb(255, 255, 255).luminance() - 1.0).abs() < 1e-9);
        assert!(Rgb(0, 0, 128).luminance() < Rgb(0, 0, 0).luminance() + 0.05);
    }

    #[test]
    fn legible_swaps_dark_foregrounds() {
        let p = Palette::high_contrast().legible();
        for pair in &p.pairs {
            assert!(pair.fg.luminance() >= pair.bg.luminance(), "{pair:?}");
        }
        let sel = p.pairs.iter().find(|c| c.element == "selection").unwrap();
        assert_eq!(sel.fg, Rgb(0, 255, 255));
        assert_eq!(sel.bg, Rgb(0, 0, 0));
    }

    #[test]
    fn single_window_request_applies_and_release_restores() {
        let windows = HostWindows::new();
        let _w = windows.open();
        let app = MemoryAppearance::new(light());
        let c = ContrastCoordinator::new(app.clone(), windows);
        assert!(c.request().unwrap());
        assert_eq!(c.saved(), Some(light()));
        assert_eq!(app.presented().name, "High Contrast");
        c.release();
        assert!(!c.is_applied());
        assert_eq!(c.saved(), None);
        assert_eq!(app.presented(), light());
        assert_eq!(c.holders(), 0);
    }

    #[test]
    fn release_without_request_is_harmless() {
        let c = ContrastCoordinator::new(MemoryAppearance::new(light()), HostWindows::new());
        c.release();
        assert_eq!(c.holders(), 0);
        assert!(!c.is_applied());
    }

    #[test]
    fn failed_apply_leaves_mode_off() {
        let c = ContrastCoordinator::new(Broken, HostWindows::new());
        assert!(c.request().is_err());
        assert!(!c.is_applied());
        assert_eq!(c.saved(), None);
        assert_eq!(c.holders(), 1);
    }
}
