//! User feedback after an output attempt: toast, sound, flash.

use std::time::Duration;

use crate::platform::PageSurface;
use crate::settings::Settings;

pub const TOAST_DURATION: Duration = Duration::from_secs(3);
pub const FLASH_DURATION: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: ToastKind::Success,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: ToastKind::Error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sound {
    Capture,
    Success,
    Error,
}

/// A short oscillator sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub start_hz: f32,
    pub end_hz: f32,
    pub duration: Duration,
    pub gain: f32,
}

impl Sound {
    pub fn tone(&self) -> Tone {
        let (start_hz, end_hz) = match self {
            Sound::Capture => (800.0, 400.0),
            Sound::Success => (600.0, 900.0),
            Sound::Error => (300.0, 300.0),
        };
        Tone {
            start_hz,
            end_hz,
            duration: Duration::from_millis(200),
            gain: 0.1,
        }
    }
}

/// Reports an outcome on `page`. Sound and flash follow the settings; the
/// toast is always shown.
pub fn report<P: PageSurface>(page: &mut P, settings: &Settings, toast: Toast) {
    let success = toast.kind != ToastKind::Error;
    if settings.sound_enabled {
        page.play_sound(if success { Sound::Success } else { Sound::Error });
    }
    if settings.animations_enabled && success {
        page.flash(&settings.selection_color);
    }
    page.toast(toast);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_tone_is_flat() {
        let tone = Sound::Error.tone();
        assert_eq!(tone.start_hz, tone.end_hz);
        assert!(Sound::Success.tone().end_hz > Sound::Success.tone().start_hz);
        assert!(Sound::Capture.tone().end_hz < Sound::Capture.tone().start_hz);
    }
}
