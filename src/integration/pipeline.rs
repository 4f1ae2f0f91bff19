//! Frame-synchronous driver wiring AIS, tracking, fusion and output together.

use std::fs;
use std::path::Path;

use ab_glyph::FontVec;
use image::RgbImage;
use tracing::{debug, info, warn};

use crate::ais::{AisProcessor, AisRecord};
use crate::clock::FrameClock;
use crate::config::SorvfConfig;
use crate::error::{Error, Result};
use crate::export::{BoxExporter, StreamRecord, write_match_events};
use crate::fusion::{FusedTrack, FusionEngine, MatchEvent};
use crate::geo::{GeoProjector, ImageSize};
use crate::integration::detector::DetectionSource;
use crate::integration::frames::{FrameSink, FrameSource};
use crate::render::Renderer;
use crate::tracker::{Detection, VisualTracker};

pub const BOX_RECORD_FILE: &str = "bbox_data.json";
pub const MATCH_EVENTS_FILE: &str = "match_events.json";

/// Result of one processed frame.
#[derive(Debug, Clone)]
pub struct FrameOutput {
    pub frame_num: u64,
    pub timestamp: i64,
    pub time_name: String,
    pub tracks: Vec<FusedTrack>,
    /// Annotated frame at display size, when the frame had an image.
    pub rendered: Option<RgbImage>,
}

/// Runs one video/AIS pairing frame by frame.
///
/// Each stage owns its own state: vessels live in the AIS processor, tracks
/// in the visual tracker and bindings in the fusion engine.
pub struct FusionPipeline {
    clock: FrameClock,
    ais: AisProcessor,
    tracker: VisualTracker,
    fusion: FusionEngine,
    renderer: Renderer,
    exporter: BoxExporter,
    frame_size: ImageSize,
    frames_processed: u64,
}

impl FusionPipeline {
    /// Build the stages for frames of `frame_size` at `fps`.
    ///
    /// Fails when the calibration cannot map pixels of this frame size or
    /// none of the AIS reports projects to a finite pixel.
    pub fn new(
        config: &SorvfConfig,
        records: Vec<AisRecord>,
        frame_size: ImageSize,
        fps: f64,
        font: Option<FontVec>,
    ) -> Result<Self> {
        config.check()?;
        config.calibration.validate(frame_size)?;

        let clock = FrameClock::new(&config.clock, fps)?;
        let projector = GeoProjector::new(config.calibration.clone(), frame_size, config.ais.hull);
        let ais = AisProcessor::new(records, projector, config.ais.clone());
        ais.validate_projection()?;

        let display = config.render.display_size(frame_size);
        let exporter = BoxExporter::new(fps.round() as u32, frame_size, display);
        let fusion = FusionEngine::new(config.fusion.clone(), frame_size, clock.frame_interval_ms());

        info!(
            width = frame_size.width,
            height = frame_size.height,
            fps,
            frame_interval_ms = clock.frame_interval_ms(),
            vessels_pending = ais.pending_len(),
            "fusion pipeline ready"
        );

        Ok(Self {
            clock,
            ais,
            tracker: VisualTracker::new(config.tracker.for_frame_rate(fps as f32)),
            fusion,
            renderer: Renderer::new(config.render.clone(), font),
            exporter,
            frame_size,
            frames_processed: 0,
        })
    }

    pub fn frame_size(&self) -> ImageSize {
        self.frame_size
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn record(&self) -> &StreamRecord {
        self.exporter.record()
    }

    pub fn events(&self) -> &[MatchEvent] {
        self.fusion.events()
    }

    /// Process a single frame: AIS advance, visual update, fusion, render and export.
    pub fn process_frame(
        &mut self,
        frame_num: u64,
        image: Option<&RgbImage>,
        detections: &[Detection],
    ) -> FrameOutput {
        let timestamp = self.clock.timestamp(frame_num);
        let time_name = self.clock.time_name(timestamp);

        let vessels = self.ais.advance(timestamp);
        let tracks = self.tracker.update(detections, timestamp);
        let fused = self.fusion.fuse(&vessels, &tracks, timestamp);

        self.exporter.push_frame(frame_num, timestamp, &time_name, &fused);
        let rendered = image.map(|frame| self.renderer.render(frame, &fused, &time_name));
        self.frames_processed += 1;

        debug!(
            frame_num,
            timestamp,
            detections = detections.len(),
            vessels = vessels.len(),
            tracks = tracks.len(),
            "frame processed"
        );

        FrameOutput {
            frame_num,
            timestamp,
            time_name,
            tracks: fused,
            rendered,
        }
    }

    /// Drive the pipeline until `source` is exhausted or a stage fails.
    ///
    /// The sink is finished in both cases. Returns the number of frames
    /// processed by this call.
    pub fn run<F, D, S>(&mut self, source: &mut F, detector: &mut D, sink: Option<&mut S>) -> Result<u64>
    where
        F: FrameSource,
        D: DetectionSource,
        Error: From<D::Error>,
        S: FrameSink,
    {
        if source.frame_size() != self.frame_size {
            return Err(Error::Config(format!(
                "frame source is {}x{}, pipeline expects {}x{}",
                source.frame_size().width,
                source.frame_size().height,
                self.frame_size.width,
                self.frame_size.height
            )));
        }

        let start = self.frames_processed;
        let mut sink = sink;
        let outcome = self.drive(source, detector, sink.as_deref_mut());
        let finished = match sink {
            Some(sink) => sink.finish(),
            None => Ok(()),
        };
        outcome?;
        finished?;

        let processed = self.frames_processed - start;
        info!(frames = processed, "stream finished");
        Ok(processed)
    }

    fn drive<F, D, S>(&mut self, source: &mut F, detector: &mut D, mut sink: Option<&mut S>) -> Result<()>
    where
        F: FrameSource,
        D: DetectionSource,
        Error: From<D::Error>,
        S: FrameSink,
    {
        while let Some(frame) = source.next_frame()? {
            let detections = detector.detect(frame.index, frame.image.as_ref())?;
            let output = self.process_frame(frame.index, frame.image.as_ref(), &detections);
            if let (Some(sink), Some(rendered)) = (sink.as_deref_mut(), output.rendered.as_ref()) {
                sink.write_frame(output.frame_num, rendered)?;
            }
        }
        Ok(())
    }

    /// Write `bbox_data.json` and `match_events.json` into `dir`.
    pub fn write_outputs(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|source| Error::Output {
            path: dir.to_path_buf(),
            source,
        })?;
        self.exporter.write_json(dir.join(BOX_RECORD_FILE))?;
        write_match_events(dir.join(MATCH_EVENTS_FILE), self.fusion.events())?;
        if self.frames_processed == 0 {
            warn!("no frames were processed");
        }
        Ok(())
    }
}
