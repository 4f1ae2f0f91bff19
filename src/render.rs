//! Frame annotation.

mod canvas;
mod renderer;

pub use canvas::{Canvas, Color, RgbCanvas};
pub use renderer::{
    MATCHED_COLOR, RenderConfig, Renderer, VISUAL_ONLY_COLOR, box_color, info_lines, load_font,
};
