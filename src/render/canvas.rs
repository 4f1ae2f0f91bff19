//! Drawing surface abstraction.

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect as PixelRect;

use crate::geo::ImageSize;
use crate::tracker::Rect;

/// RGB colour triple.
pub type Color = [u8; 3];

/// The drawing primitives the renderer needs.
pub trait Canvas {
    fn size(&self) -> ImageSize;

    /// Outline `rect` with a border `thickness` pixels wide, growing inwards.
    fn draw_rect(&mut self, rect: &Rect, color: Color, thickness: u32);

    fn fill_rect(&mut self, rect: &Rect, color: Color);

    /// Draw one line of text with its top-left corner at `(x, y)`.
    fn draw_text(&mut self, x: i32, y: i32, text: &str, color: Color, scale: f32);
}

/// Clip `rect` to the image and convert it to whole pixels. The right and
/// bottom edges are exclusive.
fn to_pixel_rect(rect: &Rect, size: ImageSize) -> Option<PixelRect> {
    let [x1, y1, x2, y2] = rect.to_pixel_tlbr();
    let (x1, y1) = (x1.max(0), y1.max(0));
    let x2 = x2.min(size.width as i32);
    let y2 = y2.min(size.height as i32);
    if x2 <= x1 || y2 <= y1 {
        return None;
    }
    Some(PixelRect::at(x1, y1).of_size((x2 - x1) as u32, (y2 - y1) as u32))
}

/// [`Canvas`] over an in-memory RGB frame. Text is dropped without a font.
pub struct RgbCanvas<'a> {
    image: &'a mut RgbImage,
    font: Option<&'a FontVec>,
}

impl<'a> RgbCanvas<'a> {
    pub fn new(image: &'a mut RgbImage, font: Option<&'a FontVec>) -> Self {
        Self { image, font }
    }
}

impl Canvas for RgbCanvas<'_> {
    fn size(&self) -> ImageSize {
        ImageSize::new(self.image.width(), self.image.height())
    }

    fn draw_rect(&mut self, rect: &Rect, color: Color, thickness: u32) {
        let size = self.size();
        for inset in 0..thickness.max(1) {
            let d = inset as f32;
            let inner = Rect::new(
                rect.x + d,
                rect.y + d,
                rect.width - 2.0 * d,
                rect.height - 2.0 * d,
            );
            if inner.width < 1.0 || inner.height < 1.0 {
                break;
            }
            if let Some(r) = to_pixel_rect(&inner, size) {
                draw_hollow_rect_mut(&mut *self.image, r, Rgb(color));
            }
        }
    }

    fn fill_rect(&mut self, rect: &Rect, color: Color) {
        if let Some(r) = to_pixel_rect(rect, self.size()) {
            draw_filled_rect_mut(&mut *self.image, r, Rgb(color));
        }
    }

    fn draw_text(&mut self, x: i32, y: i32, text: &str, color: Color, scale: f32) {
        let Some(font) = self.font else {
            return;
        };
        draw_text_mut(&mut *self.image, Rgb(color), x, y, PxScale::from(scale), font, text);
    }
}
