//! Video frame input and output.

use std::fs;
use std::path::{Path, PathBuf};

use image::RgbImage;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::geo::ImageSize;

/// One decoded frame. `image` is `None` for sources that only supply timing.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: u64,
    pub image: Option<RgbImage>,
}

/// Sequential frames at a fixed rate and size.
pub trait FrameSource {
    fn frame_size(&self) -> ImageSize;

    fn fps(&self) -> f64;

    /// Next frame, or `None` at the end of the stream.
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

/// Receives annotated frames.
pub trait FrameSink {
    fn write_frame(&mut self, frame_num: u64, image: &RgbImage) -> Result<()>;

    /// Flush anything buffered. Called once, also after a failed run.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Frames stored as image files in one directory, played in lexical order.
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    next: usize,
    size: ImageSize,
    fps: f64,
}

impl ImageSequenceSource {
    pub fn open(dir: impl AsRef<Path>, fps: f64) -> Result<Self> {
        let dir = dir.as_ref();
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            })
            .collect();
        paths.sort();

        let first = paths
            .first()
            .ok_or_else(|| Error::Config(format!("no frame images in {}", dir.display())))?;
        let (width, height) = image::image_dimensions(first)?;
        info!(dir = %dir.display(), frames = paths.len(), width, height, "opened frame sequence");

        Ok(Self {
            paths,
            next: 0,
            size: ImageSize::new(width, height),
            fps,
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FrameSource for ImageSequenceSource {
    fn frame_size(&self) -> ImageSize {
        self.size
    }

    fn fps(&self) -> f64 {
        self.fps
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(path) = self.paths.get(self.next) else {
            return Ok(None);
        };
        let image = image::open(path)?.to_rgb8();
        if image.dimensions() != (self.size.width, self.size.height) {
            return Err(Error::Config(format!(
                "{} is {}x{}, expected {}x{}",
                path.display(),
                image.width(),
                image.height(),
                self.size.width,
                self.size.height
            )));
        }
        let index = self.next as u64;
        self.next += 1;
        Ok(Some(Frame {
            index,
            image: Some(image),
        }))
    }
}

/// A fixed number of image-less frames, for runs without video.
pub struct TimingSource {
    size: ImageSize,
    fps: f64,
    count: u64,
    next: u64,
}

impl TimingSource {
    pub fn new(size: ImageSize, fps: f64, count: u64) -> Self {
        Self {
            size,
            fps,
            count,
            next: 0,
        }
    }
}

impl FrameSource for TimingSource {
    fn frame_size(&self) -> ImageSize {
        self.size
    }

    fn fps(&self) -> f64 {
        self.fps
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.next >= self.count {
            return Ok(None);
        }
        let index = self.next;
        self.next += 1;
        Ok(Some(Frame { index, image: None }))
    }
}

/// Writes frames as numbered PNG files.
pub struct ImageSequenceSink {
    dir: PathBuf,
    written: u64,
}

impl ImageSequenceSink {
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| Error::Output {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir, written: 0 })
    }

    pub fn frame_path(&self, frame_num: u64) -> PathBuf {
        self.dir.join(format!("{frame_num:06}.png"))
    }
}

impl FrameSink for ImageSequenceSink {
    fn write_frame(&mut self, frame_num: u64, image: &RgbImage) -> Result<()> {
        image.save(self.frame_path(frame_num))?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        debug!(dir = %self.dir.display(), frames = self.written, "frame sink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sorvf-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_timing_source_counts_frames() {
        let mut source = TimingSource::new(ImageSize::new(64, 32), 25.0, 2);
        assert_eq!(source.next_frame().unwrap().unwrap().index, 0);
        assert_eq!(source.next_frame().unwrap().unwrap().index, 1);
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_sink_then_source_in_lexical_order() {
        let dir = scratch_dir("frames");
        let mut sink = ImageSequenceSink::create(&dir).unwrap();
        for n in [10u64, 2, 1] {
            let image = RgbImage::from_pixel(8, 4, image::Rgb([n as u8, 0, 0]));
            sink.write_frame(n, &image).unwrap();
        }
        sink.finish().unwrap();

        let mut source = ImageSequenceSource::open(&dir, 25.0).unwrap();
        assert_eq!(source.len(), 3);
        assert_eq!(source.frame_size(), ImageSize::new(8, 4));
        let reds: Vec<u8> = std::iter::from_fn(|| source.next_frame().unwrap())
            .map(|f| f.image.unwrap().get_pixel(0, 0).0[0])
            .collect();
        assert_eq!(reds, vec![1, 2, 10]);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_empty_directory_is_rejected() {
        let dir = scratch_dir("empty");
        fs::create_dir_all(&dir).unwrap();
        assert!(matches!(ImageSequenceSource::open(&dir, 25.0), Err(Error::Config(_))));
        let _ = fs::remove_dir_all(&dir);
    }
}
