pub trait HasSize {
    fn size(&self) -> Size;
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Integer division of both dimensions, never collapsing below one texel.
    pub fn scaled_down(self, divisor: u32) -> Self {
        let divisor = divisor.max(1);
        Self {
            width: (self.width / divisor).max(1),
            height: (self.height / divisor).max(1),
        }
    }

    pub fn aspect_ratio(self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl From<winit::dpi::PhysicalSize<u32>> for Size {
    fn from(size: winit::dpi::PhysicalSize<u32>) -> Self {
        Self {
            width: size.width,
            height: size.height,
        }
    }
}

impl From<Size> for wgpu::Extent3d {
    fn from(size: Size) -> Self {
        Self {
            width: size.width,
            height: size.height,
            depth_or_array_layers: 1,
        }
    }
}

impl HasSize for winit::window::Window {
    fn size(&self) -> Size {
        self.inner_size().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bloom_buffers_are_an_eighth_of_the_viewport() {
        assert_eq!(Size::new(1280, 720).scaled_down(8), Size::new(160, 90));
    }

    #[test]
    fn scaled_down_never_reaches_zero() {
        assert_eq!(Size::new(5, 3).scaled_down(8), Size::new(1, 1));
        assert_eq!(Size::new(64, 64).scaled_down(0), Size::new(64, 64));
    }

    #[test]
    fn minimised_window_is_empty() {
        assert!(Size::new(0, 720).is_empty());
        assert!(!Size::new(1, 1).is_empty());
    }
}
