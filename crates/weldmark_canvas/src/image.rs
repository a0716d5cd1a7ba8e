use std::sync::Arc;

use tiny_skia::{IntSize, Pixmap};

use crate::error::{CanvasError, Result};

/// A handle to decoded image pixels, shared between frames.
///
/// Pixels are converted to premultiplied alpha once on construction; cloning
/// the handle only bumps a reference count.
#[derive(Clone, Debug)]
pub struct ImageHandle {
    pixmap: Arc<Pixmap>,
}

impl ImageHandle {
    /// Create a handle from straight-alpha RGBA8 data (4 bytes per pixel).
    pub fn from_rgba8(mut data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(CanvasError::ImageSize {
                expected,
                actual: data.len(),
            });
        }

        for px in data.chunks_exact_mut(4) {
            let a = px[3] as u16;
            if a < 255 {
                px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
                px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
                px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
            }
        }

        let size = IntSize::from_wh(width, height)
            .ok_or(CanvasError::Allocation { width, height })?;
        let pixmap =
            Pixmap::from_vec(data, size).ok_or(CanvasError::Allocation { width, height })?;

        Ok(Self {
            pixmap: Arc::new(pixmap),
        })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub(crate) fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rgba8_dimensions() {
        let handle = ImageHandle::from_rgba8(vec![255; 4 * 6], 3, 2).unwrap();
        assert_eq!(handle.width(), 3);
        assert_eq!(handle.height(), 2);
    }

    #[test]
    fn test_from_rgba8_size_mismatch() {
        let err = ImageHandle::from_rgba8(vec![0; 10], 3, 2).unwrap_err();
        assert!(matches!(
            err,
            CanvasError::ImageSize {
                expected: 24,
                actual: 10
            }
        ));
    }

    #[test]
    fn test_zero_sized_image_rejected() {
        assert!(ImageHandle::from_rgba8(Vec::new(), 0, 0).is_err());
    }

    #[test]
    fn test_premultiplies() {
        let handle = ImageHandle::from_rgba8(vec![200, 100, 50, 128], 1, 1).unwrap();
        let px = handle.pixmap().pixel(0, 0).unwrap();
        assert_eq!(px.alpha(), 128);
        assert_eq!(px.red(), 100);
        assert_eq!(px.green(), 50);
        assert_eq!(px.blue(), 25);
    }
}
