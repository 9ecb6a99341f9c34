//! QR code export: vector QR -> white-backed PNG -> share or download.

use qrcode::render::svg;
use qrcode::{EcLevel, QrCode};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum QrError {
  #[error("QR encoding failed: {0}")]
  Encode(#[from] qrcode::types::QrError),

  #[error("SVG parse error: {0}")]
  Svg(String),

  #[error("Invalid image size {0}px")]
  Size(u32),

  #[error("PNG encode error: {0}")]
  Png(String),

  #[error("Failed to write {path}: {source}")]
  Write {
    path: PathBuf,
    source: std::io::Error,
  },
}

/// Render `data` as an SVG QR code with EC level M and a quiet zone.
pub fn qr_svg(data: &str, size: u32) -> Result<String, QrError> {
  let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::M)?;
  Ok(
    code
      .render::<svg::Color>()
      .min_dimensions(size, size)
      .quiet_zone(true)
      .dark_color(svg::Color("#000000"))
      .light_color(svg::Color("#ffffff"))
      .build(),
  )
}

/// Rasterize a QR SVG onto a white `size * scale` square and encode as PNG.
pub fn rasterize(svg: &str, size: u32, scale: u32) -> Result<Vec<u8>, QrError> {
  let edge = size.saturating_mul(scale.max(1));
  let options = resvg::usvg::Options::default();
  let tree =
    resvg::usvg::Tree::from_str(svg, &options).map_err(|e| QrError::Svg(e.to_string()))?;

  let mut pixmap = resvg::tiny_skia::Pixmap::new(edge, edge).ok_or(QrError::Size(edge))?;
  pixmap.fill(resvg::tiny_skia::Color::WHITE);

  // The vector code may be a few px larger than requested; fit it exactly
  let tree_size = tree.size();
  let transform = resvg::tiny_skia::Transform::from_scale(
    edge as f32 / tree_size.width(),
    edge as f32 / tree_size.height(),
  );
  resvg::render(&tree, transform, &mut pixmap.as_mut());

  pixmap.encode_png().map_err(|e| QrError::Png(e.to_string()))
}

/// PNG bytes of the QR code for `url`.
pub fn qr_png(url: &str, size: u32, scale: u32) -> Result<Vec<u8>, QrError> {
  rasterize(&qr_svg(url, size)?, size, scale)
}

pub fn file_name(short_url: &str) -> String {
  format!("qr-{}.png", short_url)
}

/// Where an exported QR code ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
  Shared(PathBuf),
  Downloaded(PathBuf),
}

/// Hands a finished file to the system share/open handler.
pub trait Sharer: Send + Sync {
  fn share(&self, path: &Path) -> std::io::Result<()>;
}

/// Opens the file with the desktop's default handler.
pub struct SystemOpen;

impl Sharer for SystemOpen {
  fn share(&self, path: &Path) -> std::io::Result<()> {
    open::that(path)
  }
}

fn write_file(path: &Path, png: &[u8]) -> Result<(), QrError> {
  std::fs::write(path, png).map_err(|source| QrError::Write {
    path: path.to_path_buf(),
    source,
  })
}

/// Export the QR code for a link.
///
/// With a sharer, the PNG goes to a temp file that is handed over. Without
/// one, or when sharing fails, it is saved as `qr-{code}.png` in
/// `download_dir`.
pub fn export(
  png: &[u8],
  short_url: &str,
  sharer: Option<&dyn Sharer>,
  download_dir: &Path,
) -> Result<Delivery, QrError> {
  let name = file_name(short_url);

  if let Some(sharer) = sharer {
    let path = std::env::temp_dir().join(&name);
    let shared = write_file(&path, png).and_then(|_| {
      sharer.share(&path).map_err(|source| QrError::Write {
        path: path.clone(),
        source,
      })
    });
    match shared {
      Ok(()) => {
        info!(path = %path.display(), "shared QR code");
        return Ok(Delivery::Shared(path));
      }
      Err(e) => warn!("sharing QR code failed, downloading instead: {}", e),
    }
  }

  std::fs::create_dir_all(download_dir).map_err(|source| QrError::Write {
    path: download_dir.to_path_buf(),
    source,
  })?;
  let path = download_dir.join(&name);
  write_file(&path, png)?;
  info!(path = %path.display(), "saved QR code");
  Ok(Delivery::Downloaded(path))
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};

  fn png_dimensions(png: &[u8]) -> (u32, u32) {
    assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    assert_eq!(&png[12..16], b"IHDR");
    let width = u32::from_be_bytes([png[16], png[17], png[18], png[19]]);
    let height = u32::from_be_bytes([png[20], png[21], png[22], png[23]]);
    (width, height)
  }

  struct FailingShare(AtomicUsize);

  impl Sharer for FailingShare {
    fn share(&self, _path: &Path) -> std::io::Result<()> {
      self.0.fetch_add(1, Ordering::SeqCst);
      Err(std::io::Error::new(std::io::ErrorKind::Unsupported, "no share target"))
    }
  }

  struct AcceptShare;

  impl Sharer for AcceptShare {
    fn share(&self, _path: &Path) -> std::io::Result<()> {
      Ok(())
    }
  }

  #[test]
  fn test_svg_is_at_least_requested_size() {
    let svg = qr_svg("http://localhost:8080/s/abc", 256).unwrap();
    assert!(svg.contains("<svg"));
    assert!(svg.contains("#ffffff"));
  }

  #[test]
  fn test_png_is_upscaled() {
    let png = qr_png("http://localhost:8080/s/abc", 256, 4).unwrap();
    assert_eq!(png_dimensions(&png), (1024, 1024));
  }

  #[test]
  fn test_background_is_white() {
    let png = qr_png("http://localhost:8080/s/abc", 64, 1).unwrap();
    let pixmap = resvg::tiny_skia::Pixmap::decode_png(&png).unwrap();
    // Top-left corner sits in the quiet zone
    let corner = pixmap.pixel(0, 0).unwrap();
    assert_eq!((corner.red(), corner.green(), corner.blue(), corner.alpha()), (255, 255, 255, 255));
  }

  #[test]
  fn test_download_without_sharer() {
    let dir = tempfile::tempdir().unwrap();
    let delivery = export(b"png", "abc", None, dir.path()).unwrap();
    let expected = dir.path().join("qr-abc.png");
    assert_eq!(delivery, Delivery::Downloaded(expected.clone()));
    assert_eq!(std::fs::read(expected).unwrap(), b"png");
  }

  #[test]
  fn test_share_failure_falls_back_to_download() {
    let dir = tempfile::tempdir().unwrap();
    let sharer = FailingShare(AtomicUsize::new(0));
    let delivery = export(b"png", "xyz", Some(&sharer), &dir.path().join("dl")).unwrap();
    assert_eq!(sharer.0.load(Ordering::SeqCst), 1);
    assert_eq!(delivery, Delivery::Downloaded(dir.path().join("dl").join("qr-xyz.png")));
  }

  #[test]
  fn test_successful_share_skips_download() {
    let dir = tempfile::tempdir().unwrap();
    let delivery = export(b"png", "shared1", Some(&AcceptShare), dir.path()).unwrap();
    assert!(matches!(delivery, Delivery::Shared(_)));
    assert!(!dir.path().join("qr-shared1.png").exists());
  }
}
