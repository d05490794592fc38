//! Small PWA-side utilities: pull-to-refresh tracking, keyboard shortcuts,
//! install prompt state, and the connection banner.

use serde::{Deserialize, Serialize};

use crate::{PULL_MAX_PX, PULL_TRIGGER_PX};

/// Tracks a touch-drag from the top of the page. Pure state; the shell
/// feeds it touch coordinates and renders `progress`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PullToRefresh {
    start_y: Option<f64>,
    pub distance: f64,
}

impl PullToRefresh {
    pub fn begin(&mut self, y: f64) {
        self.start_y = Some(y);
        self.distance = 0.0;
    }

    pub fn update(&mut self, y: f64) {
        if let Some(start) = self.start_y {
            self.distance = (y - start).clamp(0.0, PULL_MAX_PX);
        }
    }

    /// Ends the gesture; `true` means the pull went far enough to refresh.
    pub fn finish(&mut self) -> bool {
        let triggered = self.start_y.is_some() && self.distance >= PULL_TRIGGER_PX;
        self.start_y = None;
        self.distance = 0.0;
        triggered
    }

    /// Indicator fill in `0.0..=1.0`.
    #[must_use]
    pub fn progress(&self) -> f64 {
        self.distance / PULL_MAX_PX
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.start_y.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shortcut {
    FocusSearch,
    UploadPhoto,
    CloseOverlays,
}

/// Maps a key event to a shortcut. Ctrl and Cmd are interchangeable so the
/// bindings work on both platforms.
#[must_use]
pub fn shortcut_for(key: &str, ctrl: bool, meta: bool) -> Option<Shortcut> {
    let modified = ctrl || meta;
    match key {
        "k" | "K" if modified => Some(Shortcut::FocusSearch),
        "u" | "U" if modified => Some(Shortcut::UploadPhoto),
        "Escape" => Some(Shortcut::CloseOverlays),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InstallPromptState {
    #[default]
    Hidden,
    /// The browser offered `beforeinstallprompt`; show our install button.
    Available,
    Installed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BannerKind {
    BackOnline,
    Offline,
}

/// Transient connectivity banner; expiry is driven by a delay event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionBanner {
    pub kind: BannerKind,
}

impl ConnectionBanner {
    #[must_use]
    pub fn message(self) -> &'static str {
        match self.kind {
            BannerKind::BackOnline => "Back online",
            BannerKind::Offline => "You are offline. Some features may be unavailable.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_pull_does_not_trigger() {
        let mut pull = PullToRefresh::default();
        pull.begin(10.0);
        pull.update(60.0);
        assert!(!pull.finish());
    }

    #[test]
    fn pull_past_threshold_triggers_once() {
        let mut pull = PullToRefresh::default();
        pull.begin(0.0);
        pull.update(85.0);
        assert!(pull.finish());
        // gesture state is consumed
        assert!(!pull.finish());
    }

    #[test]
    fn distance_is_clamped_to_max() {
        let mut pull = PullToRefresh::default();
        pull.begin(0.0);
        pull.update(250.0);
        assert!((pull.distance - PULL_MAX_PX).abs() < f64::EPSILON);
        assert!((pull.progress() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn upward_drag_counts_as_zero() {
        let mut pull = PullToRefresh::default();
        pull.begin(100.0);
        pull.update(40.0);
        assert!((pull.distance - 0.0).abs() < f64::EPSILON);
        assert!(!pull.finish());
    }

    #[test]
    fn moves_without_begin_are_ignored() {
        let mut pull = PullToRefresh::default();
        pull.update(300.0);
        assert!(!pull.finish());
    }

    #[test]
    fn shortcuts_require_a_modifier_except_escape() {
        assert_eq!(shortcut_for("k", true, false), Some(Shortcut::FocusSearch));
        assert_eq!(shortcut_for("k", false, true), Some(Shortcut::FocusSearch));
        assert_eq!(shortcut_for("k", false, false), None);
        assert_eq!(shortcut_for("U", true, false), Some(Shortcut::UploadPhoto));
        assert_eq!(
            shortcut_for("Escape", false, false),
            Some(Shortcut::CloseOverlays)
        );
        assert_eq!(shortcut_for("x", true, false), None);
    }
}
