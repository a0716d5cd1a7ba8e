//! Canvas sizing and fit-to-view.

use weldmark_canvas::Surface;

use crate::viewport::Viewport;

/// Container size reported by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasSize {
    /// Logical width in CSS/window pixels.
    pub width: f32,
    /// Logical height in CSS/window pixels.
    pub height: f32,
    pub device_pixel_ratio: f32,
}

impl CanvasSize {
    pub fn new(width: f32, height: f32, device_pixel_ratio: f32) -> Self {
        let dpr = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
            device_pixel_ratio
        } else {
            1.0
        };
        Self {
            width: width.max(0.0),
            height: height.max(0.0),
            device_pixel_ratio: dpr,
        }
    }

    pub fn logical(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    /// Physical backing-store size, at least one pixel per axis.
    pub fn backing_store(&self) -> (u32, u32) {
        let dim = |v: f32| ((v * self.device_pixel_ratio).round() as u32).max(1);
        (dim(self.width), dim(self.height))
    }
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self::new(800.0, 600.0, 1.0)
    }
}

/// Keeps the surface in step with the container and re-fits the view.
#[derive(Debug, Clone)]
pub struct ResizeController {
    size: CanvasSize,
    fit_margin: f32,
}

impl ResizeController {
    pub fn new(size: CanvasSize, fit_margin: f32) -> Self {
        Self { size, fit_margin }
    }

    pub fn size(&self) -> CanvasSize {
        self.size
    }

    /// Re-allocate `surface` for a new container size.
    ///
    /// Returns `Ok(false)` when the size did not change.
    pub fn resize(&mut self, size: CanvasSize, surface: &mut Surface) -> weldmark_canvas::Result<bool> {
        if size == self.size {
            return Ok(false);
        }
        surface.resize(size.width, size.height, size.device_pixel_ratio)?;
        let (bw, bh) = size.backing_store();
        log::debug!(
            "Canvas resized to {:.0}x{:.0} @ {:.2}x ({}x{} backing store)",
            size.width,
            size.height,
            size.device_pixel_ratio,
            bw,
            bh
        );
        self.size = size;
        Ok(true)
    }

    /// Fit an image of `image_size` pixels into the current canvas.
    pub fn fit(&self, viewport: &Viewport, image_size: (u32, u32)) -> Viewport {
        viewport.fit(
            (image_size.0 as f32, image_size.1 as f32),
            self.size.logical(),
            self.fit_margin,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backing_store_rounds_and_clamps() {
        assert_eq!(CanvasSize::new(100.5, 50.0, 2.0).backing_store(), (201, 100));
        assert_eq!(CanvasSize::new(0.0, 0.2, 1.0).backing_store(), (1, 1));
        assert_eq!(CanvasSize::new(10.0, 10.0, f32::NAN).device_pixel_ratio, 1.0);
    }

    #[test]
    fn test_resize_matches_surface() {
        let initial = CanvasSize::new(100.0, 100.0, 1.0);
        let mut surface = Surface::new(100.0, 100.0, 1.0).unwrap();
        let mut controller = ResizeController::new(initial, 0.9);

        assert!(!controller.resize(initial, &mut surface).unwrap());

        let size = CanvasSize::new(320.0, 240.0, 1.5);
        assert!(controller.resize(size, &mut surface).unwrap());
        assert_eq!((surface.width(), surface.height()), size.backing_store());
        assert_eq!(surface.logical_size(), (320.0, 240.0));
    }

    #[test]
    fn test_fit_uses_logical_size() {
        let controller = ResizeController::new(CanvasSize::new(400.0, 300.0, 2.0), 0.9);
        let v = controller.fit(&Viewport::identity(), (800, 600));
        assert!((v.zoom - 0.45).abs() < 0.0001);
        assert!((v.pan_x - 20.0).abs() < 0.001);
        assert!((v.pan_y - 15.0).abs() < 0.001);
    }
}
