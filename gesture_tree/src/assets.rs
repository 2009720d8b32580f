//! Background photo loading.
//!
//! Decoding a full-size JPEG takes longer than a frame, so requests go to a
//! worker thread and finished thumbnails come back over a channel that the
//! frame loop drains without blocking.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use thiserror::Error;

use tree_morph::{PhotoAsset, PhotoId};

/// Longest side of a decoded thumbnail, in pixels.
pub const THUMB_MAX: u32 = 96;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("cannot read {path}: {source}")]
    Io {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot decode {path}: {source}")]
    Decode {
        path:   PathBuf,
        #[source]
        source: image::ImageError,
    },
}

// ════════════════════════════════════════════════════════════════════════════
// Decoding
// ════════════════════════════════════════════════════════════════════════════

/// Decode an encoded image into an ARGB thumbnail no larger than
/// `max_side` on either axis.  Smaller images keep their size.
pub fn decode_thumbnail(bytes: &[u8], max_side: u32) -> Result<PhotoAsset, image::ImageError> {
    let img = image::load_from_memory(bytes)?;
    let img = if img.width() > max_side || img.height() > max_side {
        img.thumbnail(max_side, max_side)
    } else {
        img
    };
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let pixels = rgba
        .pixels()
        .map(|p| {
            let [r, g, b, a] = p.0;
            (a as u32) << 24 | (r as u32) << 16 | (g as u32) << 8 | b as u32
        })
        .collect();
    Ok(PhotoAsset { width, height, pixels })
}

pub fn load_thumbnail(path: &Path, max_side: u32) -> Result<PhotoAsset, AssetError> {
    let bytes = fs::read(path).map_err(|source| AssetError::Io { path: path.to_path_buf(), source })?;
    decode_thumbnail(&bytes, max_side)
        .map_err(|source| AssetError::Decode { path: path.to_path_buf(), source })
}

// ════════════════════════════════════════════════════════════════════════════
// AssetLoader
// ════════════════════════════════════════════════════════════════════════════

struct AssetRequest {
    id:   PhotoId,
    path: PathBuf,
}

/// Result of one load request.
#[derive(Debug)]
pub struct AssetOutcome {
    pub id:     PhotoId,
    pub path:   PathBuf,
    pub result: Result<Arc<PhotoAsset>, AssetError>,
}

/// Worker thread that turns image paths into thumbnails.
pub struct AssetLoader {
    tx:     Option<Sender<AssetRequest>>,
    rx:     Receiver<AssetOutcome>,
    thread: Option<JoinHandle<()>>,
}

impl AssetLoader {
    pub fn spawn(max_side: u32) -> Self {
        let (req_tx, req_rx) = mpsc::channel::<AssetRequest>();
        let (out_tx, out_rx) = mpsc::channel::<AssetOutcome>();

        let thread = thread::spawn(move || {
            for AssetRequest { id, path } in req_rx {
                let result = load_thumbnail(&path, max_side).map(Arc::new);
                if out_tx.send(AssetOutcome { id, path, result }).is_err() {
                    break;
                }
            }
        });

        AssetLoader { tx: Some(req_tx), rx: out_rx, thread: Some(thread) }
    }

    /// Queue a load.  The outcome for `id` shows up in a later [`poll`](Self::poll).
    pub fn request(&self, id: PhotoId, path: PathBuf) {
        tracing::debug!(target: "assets", id = id.0, path = %path.display(), "photo load queued");
        let sent = self
            .tx
            .as_ref()
            .map(|tx| tx.send(AssetRequest { id, path }).is_ok())
            .unwrap_or(false);
        if !sent {
            tracing::error!(target: "assets", id = id.0, "asset worker is gone");
        }
    }

    /// Every outcome finished since the last call.  Never blocks.
    pub fn poll(&self) -> Vec<AssetOutcome> {
        let mut out = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(o) => out.push(o),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        out
    }
}

impl Drop for AssetLoader {
    fn drop(&mut self) {
        // Closing the request channel ends the worker's loop.
        self.tx.take();
        if let Some(t) = self.thread.take() {
            if t.join().is_err() {
                tracing::error!(target: "assets", "asset worker panicked");
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::{Duration, Instant};

    fn png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut out, image::ImageOutputFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn wait_for(loader: &AssetLoader) -> AssetOutcome {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(o) = loader.poll().into_iter().next() {
                return o;
            }
            assert!(Instant::now() < deadline, "no outcome");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn pixels_become_argb() {
        let asset = decode_thumbnail(&png(2, 1, [255, 0, 0, 255]), THUMB_MAX).unwrap();
        assert_eq!((asset.width, asset.height), (2, 1));
        assert_eq!(asset.pixels, vec![0xFFFF0000, 0xFFFF0000]);
    }

    #[test]
    fn large_images_are_shrunk_keeping_aspect() {
        let asset = decode_thumbnail(&png(200, 100, [0, 0, 255, 255]), 96).unwrap();
        assert_eq!((asset.width, asset.height), (96, 48));
        assert_eq!(asset.pixels.len(), 96 * 48);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let path = std::env::temp_dir().join(format!("gesture_tree_garbage_{}", std::process::id()));
        fs::write(&path, b"not an image").unwrap();
        let err = load_thumbnail(&path, THUMB_MAX).unwrap_err();
        fs::remove_file(&path).ok();
        assert!(matches!(err, AssetError::Decode { .. }));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_thumbnail(Path::new("/no/such/photo.png"), THUMB_MAX).unwrap_err();
        assert!(matches!(err, AssetError::Io { .. }));
    }

    #[test]
    fn loader_reports_failures_by_id() {
        let loader = AssetLoader::spawn(THUMB_MAX);
        loader.request(PhotoId(7), PathBuf::from("/no/such/photo.png"));
        let o = wait_for(&loader);
        assert_eq!(o.id, PhotoId(7));
        assert!(o.result.is_err());
    }

    #[test]
    fn loader_decodes_in_background() {
        let path = std::env::temp_dir().join(format!("gesture_tree_loader_{}.png", std::process::id()));
        fs::write(&path, png(4, 4, [0, 255, 0, 255])).unwrap();
        let loader = AssetLoader::spawn(THUMB_MAX);
        loader.request(PhotoId(1), path.clone());
        let o = wait_for(&loader);
        fs::remove_file(&path).ok();
        let asset = o.result.unwrap();
        assert_eq!(asset.pixels[0], 0xFF00FF00);
    }
}
