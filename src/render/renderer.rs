use std::path::Path;

use ab_glyph::FontVec;
use image::RgbImage;
use image::imageops::{self, FilterType};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fusion::{AisLink, FusedTrack};
use crate::geo::ImageSize;
use crate::render::canvas::{Canvas, Color, RgbCanvas};
use crate::tracker::Rect;

/// Box colour of a track carrying AIS identity.
pub const MATCHED_COLOR: Color = [204, 204, 51];
/// Box colour of a track seen only by the camera.
pub const VISUAL_ONLY_COLOR: Color = [0, 0, 255];

const LABEL_BACKGROUND: Color = [255, 255, 255];
const LABEL_TEXT: Color = [0, 0, 0];
const BANNER_BACKGROUND: Color = [0, 0, 0];
const BANNER_TEXT: Color = [255, 255, 255];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Output frames are scaled to this height, keeping the aspect ratio.
    pub display_height: u32,
    pub box_thickness: u32,
    /// Text height in pixels on the original frame.
    pub font_scale: f32,
    pub draw_timestamp: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            display_height: 500,
            box_thickness: 2,
            font_scale: 18.0,
            draw_timestamp: true,
        }
    }
}

impl RenderConfig {
    pub fn display_size(&self, original: ImageSize) -> ImageSize {
        original.scaled_to_height(self.display_height)
    }
}

pub fn box_color(track: &FusedTrack) -> Color {
    if track.has_ais() {
        MATCHED_COLOR
    } else {
        VISUAL_ONLY_COLOR
    }
}

/// Text lines shown in the info box of a matched track.
pub fn info_lines(link: &AisLink) -> [String; 5] {
    [
        format!("MMSI:{}", link.mmsi),
        format!("SOG:{:.1}kn", link.sog),
        format!("COG:{:.1}", link.cog),
        format!("LAT:{:.5}", link.lat),
        format!("LON:{:.5}", link.lon),
    ]
}

pub fn load_font(path: impl AsRef<Path>) -> Result<FontVec> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    FontVec::try_from_vec(bytes)
        .map_err(|_| Error::Config(format!("{} is not a usable font", path.display())))
}

/// Draws fused tracks onto frames.
pub struct Renderer {
    config: RenderConfig,
    font: Option<FontVec>,
}

impl Renderer {
    pub fn new(config: RenderConfig, font: Option<FontVec>) -> Self {
        Self { config, font }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Draw boxes, info boxes and the timestamp banner onto `canvas`.
    pub fn draw(&self, canvas: &mut impl Canvas, tracks: &[FusedTrack], time_name: &str) {
        let scale = self.config.font_scale;
        let line_height = scale.ceil() as i32 + 2;

        for track in tracks {
            canvas.draw_rect(&track.bbox, box_color(track), self.config.box_thickness);

            let (Some(link), Some(info)) = (track.ais.as_ref(), track.info_box.as_ref()) else {
                continue;
            };
            canvas.fill_rect(info, LABEL_BACKGROUND);
            canvas.draw_rect(info, MATCHED_COLOR, 1);
            let (x, mut y) = (info.x.round() as i32 + 3, info.y.round() as i32 + 2);
            for line in info_lines(link) {
                if y + line_height > info.bottom().round() as i32 {
                    break;
                }
                canvas.draw_text(x, y, &line, LABEL_TEXT, scale);
                y += line_height;
            }
        }

        if self.config.draw_timestamp && !time_name.is_empty() {
            let width = (time_name.len() as f32 * scale * 0.6).ceil() + 8.0;
            let banner = Rect::new(0.0, 0.0, width, line_height as f32 + 4.0);
            canvas.fill_rect(&banner, BANNER_BACKGROUND);
            canvas.draw_text(4, 3, time_name, BANNER_TEXT, scale);
        }
    }

    /// Annotate a copy of `frame` and scale it to the display size.
    pub fn render(&self, frame: &RgbImage, tracks: &[FusedTrack], time_name: &str) -> RgbImage {
        let mut annotated = frame.clone();
        self.draw(&mut RgbCanvas::new(&mut annotated, self.font.as_ref()), tracks, time_name);

        let display = self
            .config
            .display_size(ImageSize::new(frame.width(), frame.height()));
        if display.width == frame.width() && display.height == frame.height() {
            return annotated;
        }
        imageops::resize(&annotated, display.width, display.height, FilterType::Triangle)
    }
}
