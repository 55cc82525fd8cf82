//! System clipboard via `arboard`.
//!
//! On X11 and Wayland the copying process serves the selection itself, so
//! the `Clipboard` is held for the life of the session and [`hand_off`]
//! keeps serving the last image until another client takes it.

use arboard::{Clipboard, ImageData};
use std::borrow::Cow;
use std::cell::RefCell;
use std::time::Duration;

use crate::platform::PlatformError;

struct Held {
    clipboard: Clipboard,
    last: Option<(usize, usize, Vec<u8>)>,
}

thread_local! {
    static HELD: RefCell<Option<Held>> = const { RefCell::new(None) };
}

/// Decodes `png` and places it on the clipboard as an image.
pub fn write_png(png: &[u8]) -> Result<(), PlatformError> {
    let rgba = image::load_from_memory(png)
        .map_err(|e| PlatformError::new(format!("PNG decode failed: {}", e)))?
        .to_rgba8();
    let (width, height) = (rgba.width() as usize, rgba.height() as usize);
    let bytes = rgba.into_raw();

    HELD.with(|held| {
        let mut held = held.borrow_mut();
        if held.is_none() {
            let clipboard = Clipboard::new()
                .map_err(|e| PlatformError::new(format!("Clipboard unavailable: {}", e)))?;
            *held = Some(Held {
                clipboard,
                last: None,
            });
        }
        let Some(held) = held.as_mut() else {
            return Err(PlatformError::new("Clipboard unavailable"));
        };

        held.clipboard
            .set_image(ImageData {
                width,
                height,
                bytes: Cow::Borrowed(&bytes),
            })
            .map_err(|e| PlatformError::new(format!("Clipboard write failed: {}", e)))?;
        held.last = Some((width, height, bytes.clone()));
        Ok(())
    })?;

    log::info!("[DESKTOP] Copied {}x{} image to clipboard", width, height);
    Ok(())
}

/// Releases the clipboard before exit. On Linux the last image is served
/// until another client (usually a clipboard manager) claims it, or until
/// `limit` passes. Elsewhere the OS owns the data and this returns at once.
pub fn hand_off(limit: Duration) {
    let Some(held) = HELD.with(|held| held.borrow_mut().take()) else {
        return;
    };
    let Some((width, height, bytes)) = held.last else {
        return;
    };
    serve_until_claimed(held.clipboard, width, height, bytes, limit);
}

#[cfg(target_os = "linux")]
fn serve_until_claimed(
    mut clipboard: Clipboard,
    width: usize,
    height: usize,
    bytes: Vec<u8>,
    limit: Duration,
) {
    use arboard::SetExtLinux;

    log::debug!("[DESKTOP] Serving clipboard for up to {:?}", limit);
    let served = clipboard
        .set()
        .wait_until(std::time::Instant::now() + limit)
        .image(ImageData {
            width,
            height,
            bytes: Cow::Owned(bytes),
        });
    if let Err(e) = served {
        log::warn!("[DESKTOP] Clipboard hand-off failed: {}", e);
    }
}

#[cfg(not(target_os = "linux"))]
fn serve_until_claimed(
    _clipboard: Clipboard,
    _width: usize,
    _height: usize,
    _bytes: Vec<u8>,
    _limit: Duration,
) {
}
