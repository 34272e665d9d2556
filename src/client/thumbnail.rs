//! First-page thumbnail generation
//!
//! Renders page 1 of a cached PDF at a reduced scale via MuPDF, encodes it
//! as a PNG data URL, and persists it into the cache. Thumbnails are
//! best-effort: any failure degrades to "no thumbnail" and is never fatal.

use std::io::Cursor;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use mupdf::{Colorspace, Document, Matrix};

use crate::error::{AppError, Result};

use super::api::RemoteLibrary;
use super::cache::{LibraryCache, LocalBook};

/// Scale factor for first-page previews
const THUMBNAIL_SCALE: f32 = 0.5;

/// Generates and persists book thumbnails
pub struct ThumbnailGenerator {
    cache: LibraryCache,
    remote: Arc<dyn RemoteLibrary>,
}

impl ThumbnailGenerator {
    pub fn new(cache: LibraryCache, remote: Arc<dyn RemoteLibrary>) -> Self {
        Self { cache, remote }
    }

    /// Produce a thumbnail for a book, returning the updated record
    ///
    /// Uses the cached binary if present, fetches the remote URL once
    /// otherwise, and returns the book unmodified when neither exists or
    /// rendering fails.
    pub async fn generate(&self, book: LocalBook) -> LocalBook {
        if book.thumbnail.is_some() {
            return book;
        }

        let (book, data) = match &book.file {
            Some(data) => {
                let data = data.clone();
                (book, data)
            }
            None => {
                let Some(url) = book.file_url.clone() else {
                    return book;
                };
                match self.remote.fetch_binary(&url).await {
                    Ok(data) => {
                        // Keep the fetched binary so hydration happens once
                        let mut hydrated = book;
                        hydrated.file = Some(data.clone());
                        if let Err(e) = self.cache.put(&hydrated).await {
                            tracing::warn!("Failed to persist hydrated '{}': {}", hydrated.name, e);
                        }
                        (hydrated, data)
                    }
                    Err(e) => {
                        tracing::warn!("Could not fetch '{}' for thumbnail: {}", book.name, e);
                        return book;
                    }
                }
            }
        };

        let (thumbnail, page_count) = match render_first_page(data).await {
            Ok(rendered) => rendered,
            Err(e) => {
                tracing::warn!("Failed to generate thumbnail for '{}': {}", book.name, e);
                return book;
            }
        };

        let updated = async {
            self.cache.update_page_count(&book.id, page_count).await?;
            self.cache.update_thumbnail(&book.id, thumbnail).await
        }
        .await;

        match updated {
            Ok(updated) => updated,
            Err(e) => {
                tracing::warn!("Failed to persist thumbnail for '{}': {}", book.name, e);
                book
            }
        }
    }
}

/// Render page 1 as a PNG data URL, returning it with the page count
pub(crate) async fn render_first_page(data: Vec<u8>) -> Result<(String, i64)> {
    tokio::task::spawn_blocking(move || {
        let doc = Document::from_bytes(&data, "application/pdf").map_err(render_err)?;
        let page_count = doc.page_count().map_err(render_err)? as i64;
        if page_count == 0 {
            return Err(AppError::Render("document has no pages".to_string()));
        }

        let page = doc.load_page(0).map_err(render_err)?;
        let matrix = Matrix::new_scale(THUMBNAIL_SCALE, THUMBNAIL_SCALE);
        let colorspace = Colorspace::device_rgb();
        let pixmap = page
            .to_pixmap(&matrix, &colorspace, true, false)
            .map_err(render_err)?;

        let png = encode_pixmap_png(&pixmap)?;
        let thumbnail = format!("data:image/png;base64,{}", STANDARD.encode(&png));

        Ok((thumbnail, page_count))
    })
    .await
    .map_err(|e| AppError::Render(format!("Render task failed: {}", e)))?
}

/// Count the pages of a PDF binary
pub(crate) async fn count_pages(data: Vec<u8>) -> Result<i64> {
    tokio::task::spawn_blocking(move || {
        let doc = Document::from_bytes(&data, "application/pdf").map_err(render_err)?;
        doc.page_count().map(|n| n as i64).map_err(render_err)
    })
    .await
    .map_err(|e| AppError::Render(format!("Render task failed: {}", e)))?
}

fn render_err(e: mupdf::Error) -> AppError {
    AppError::Render(e.to_string())
}

fn encode_pixmap_png(pixmap: &mupdf::Pixmap) -> Result<Vec<u8>> {
    let width = pixmap.width() as u32;
    let height = pixmap.height() as u32;
    let samples = pixmap.samples();
    let n = pixmap.n() as usize;

    // Convert to RGBA buffer
    let mut rgba_buffer = Vec::with_capacity((width * height * 4) as usize);

    for y in 0..height as usize {
        for x in 0..width as usize {
            let offset = (y * width as usize + x) * n;
            let r = samples.get(offset).copied().unwrap_or(0);
            let g = samples.get(offset + 1).copied().unwrap_or(0);
            let b = samples.get(offset + 2).copied().unwrap_or(0);
            let a = if n >= 4 {
                samples.get(offset + 3).copied().unwrap_or(255)
            } else {
                255
            };
            rgba_buffer.extend_from_slice(&[r, g, b, a]);
        }
    }

    let img = image::RgbaImage::from_raw(width, height, rgba_buffer)
        .ok_or_else(|| AppError::Render("Failed to create image buffer".to_string()))?;

    let mut output = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut output), image::ImageFormat::Png)
        .map_err(|e| AppError::Render(e.to_string()))?;

    Ok(output)
}
