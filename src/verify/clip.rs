use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use crate::apng::reader::ApngReader;
use crate::apng::writer::ApngWriter;
use crate::diff::{Differ, compare_frames};
use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{ClipError, ClipResult};
use crate::raster::frame::FrameRGBA;
use crate::raster::ops::blank_placeholder;
use crate::verify::reconcile::FrameRateReconciler;
use crate::verify::report::VerificationFailure;

/// Inputs of one clip verification run.
#[derive(Clone, Debug, PartialEq)]
pub struct VerifyOptions {
    /// Golden APNG (or PNG) to compare against.
    pub golden_path: PathBuf,
    /// Where the delta APNG is written when verification fails.
    pub delta_path: PathBuf,
    /// Frame rate of the frames passed to [`ApngVerifier::verify_frame`].
    pub fps: u32,
    /// Number of frames the caller intends to verify.
    pub frame_count: u32,
    /// Largest accepted per-frame difference, in percent.
    pub max_percent_difference: f64,
}

/// Streams rendered frames against a golden clip.
///
/// Both clips are walked on a common timeline (see [`FrameRateReconciler`]); golden frames are
/// decoded lazily as the timeline reaches them. No delta artifact is produced while every frame
/// matches: the delta writer is only created at the first mismatch and is then seeded with
/// "no difference" frames for the ticks already verified. When the golden fps or frame count
/// already differ from the caller's, the writer is created up front.
#[derive(Debug)]
pub struct ApngVerifier {
    options: VerifyOptions,
    differ: Box<dyn Differ>,
    reader: ApngReader<BufReader<File>>,
    reconciler: FrameRateReconciler,
    golden_fps: u32,
    golden_frames: u64,
    blank: FrameRGBA,
    golden: GoldenCursor,
    writer: Option<ApngWriter>,
    last_delta: Option<FrameRGBA>,
    tick: u64,
    frames_verified: u64,
    mismatches: Vec<f32>,
    finished: bool,
}

/// Golden frame currently on screen.
#[derive(Debug)]
struct GoldenCursor {
    index: u64,
    frame: FrameRGBA,
    /// `false` once the golden ran out and `frame` is the blank placeholder.
    real: bool,
}

impl ApngVerifier {
    /// Open the golden and read its first frame.
    pub fn new(options: VerifyOptions, differ: Box<dyn Differ>) -> ClipResult<Self> {
        if options.fps == 0 {
            return Err(ClipError::validation("fps must be > 0"));
        }
        if !options.max_percent_difference.is_finite() || options.max_percent_difference < 0.0 {
            return Err(ClipError::validation(format!(
                "max_percent_difference must be a non-negative number, got {}",
                options.max_percent_difference
            )));
        }

        let mut reader = ApngReader::open(&options.golden_path)?;
        let blank = blank_placeholder(reader.width(), reader.height());
        let first = reader.next_frame()?;
        let delay = reader.delay();
        let golden_fps = if delay.is_unspecified() {
            options.fps
        } else {
            delay.fps().ok_or_else(|| {
                ClipError::format(format!(
                    "golden '{}' has frame delay {delay}, which is not a whole frame rate",
                    options.golden_path.display()
                ))
            })?
        };
        let golden_frames = u64::from(reader.frame_count());
        let reconciler = FrameRateReconciler::new(golden_fps, options.fps)?;

        let golden = GoldenCursor {
            index: 0,
            real: first.is_some(),
            frame: first.unwrap_or_else(|| blank.clone()),
        };

        let mut verifier = Self {
            options,
            differ,
            reader,
            reconciler,
            golden_fps,
            golden_frames,
            blank,
            golden,
            writer: None,
            last_delta: None,
            tick: 0,
            frames_verified: 0,
            mismatches: Vec::new(),
            finished: false,
        };

        if golden_fps != verifier.options.fps
            || golden_frames != u64::from(verifier.options.frame_count)
        {
            tracing::debug!(
                golden_fps,
                fps = verifier.options.fps,
                golden_frames,
                frame_count = verifier.options.frame_count,
                "golden metadata differs, creating delta writer eagerly"
            );
            verifier.ensure_writer()?;
        }
        Ok(verifier)
    }

    pub fn options(&self) -> &VerifyOptions {
        &self.options
    }

    pub fn reconciler(&self) -> FrameRateReconciler {
        self.reconciler
    }

    /// Golden frames decoded so far.
    pub fn golden_frames_read(&self) -> u32 {
        self.reader.frame_number()
    }

    pub fn frames_verified(&self) -> u64 {
        self.frames_verified
    }

    /// Percent differences of the frames recorded as mismatches so far.
    pub fn mismatches(&self) -> &[f32] {
        &self.mismatches
    }

    /// Whether a delta writer has been created.
    pub fn has_delta_writer(&self) -> bool {
        self.writer.is_some()
    }

    /// Compare the next rendered frame with the golden frame on screen at the same time.
    #[tracing::instrument(skip_all, fields(frame = self.frames_verified, tick = self.tick))]
    pub fn verify_frame(&mut self, actual: &FrameRGBA) -> ClipResult<()> {
        if self.finished {
            return Err(ClipError::validation(
                "verify_frame called after assert_finished",
            ));
        }

        self.advance_golden(self.reconciler.golden_index_at(self.tick))?;
        let result = compare_frames(self.differ.as_ref(), &self.golden.frame, actual)?;
        let max = self.options.max_percent_difference;
        if f64::from(result.percent_different) > max {
            tracing::debug!(
                golden = self.golden.index,
                percent = result.percent_different,
                "frame over threshold"
            );
            self.mismatches.push(result.percent_different);
            self.ensure_writer()?;
        }

        let mut delta = result.delta;
        let mut delta_index = self.golden.index;
        for _ in 0..self.reconciler.actual_step() {
            self.advance_golden(self.reconciler.golden_index_at(self.tick))?;
            if let Some(writer) = self.writer.as_mut() {
                if self.golden.index != delta_index {
                    delta = compare_frames(self.differ.as_ref(), &self.golden.frame, actual)?.delta;
                    delta_index = self.golden.index;
                }
                writer.write_image(&delta)?;
            }
            self.tick += 1;
        }

        self.last_delta = Some(delta);
        self.frames_verified += 1;
        Ok(())
    }

    /// Close out the run and report every failure condition at once.
    ///
    /// On failure the delta artifact has been written by the time the error is returned.
    pub fn assert_finished(&mut self) -> ClipResult<()> {
        if self.finished {
            return Err(ClipError::validation("assert_finished called twice"));
        }
        self.finished = true;

        let step = self.reconciler.expected_step();
        while self.tick % step != 0 {
            if let (Some(writer), Some(delta)) = (self.writer.as_mut(), self.last_delta.as_ref()) {
                writer.write_image(delta)?;
            }
            self.tick += 1;
        }

        let mut index = self.tick / step;
        loop {
            self.advance_golden(index)?;
            if !self.golden.real {
                break;
            }
            self.ensure_writer()?;
            let result = compare_frames(self.differ.as_ref(), &self.golden.frame, &self.blank)?;
            tracing::debug!(golden = index, "golden frame has no rendered counterpart");
            self.mismatches.push(result.percent_different);
            if let Some(writer) = self.writer.as_mut() {
                for _ in 0..step {
                    writer.write_image(&result.delta)?;
                }
            }
            self.tick += step;
            index += 1;
        }

        let failure = self.build_failure();
        if !failure.has_failures() {
            tracing::info!(
                golden = %self.options.golden_path.display(),
                frames = self.frames_verified,
                "clip matches golden"
            );
            return Ok(());
        }

        if let Some(mut writer) = self.writer.take() {
            writer.finish()?;
        }
        tracing::warn!(
            golden = %self.options.golden_path.display(),
            delta = %self.options.delta_path.display(),
            mismatched = failure.mismatched_frames.len(),
            "clip differs from golden"
        );
        Err(failure.into())
    }

    /// Finalize the delta writer if one is still open and release the golden.
    pub fn close(mut self) -> ClipResult<()> {
        self.release()
    }

    fn release(&mut self) -> ClipResult<()> {
        match self.writer.take() {
            Some(mut writer) if !writer.is_finalized() && writer.frames_written() > 0 => {
                writer.finish()
            }
            _ => Ok(()),
        }
    }

    fn build_failure(&self) -> VerificationFailure {
        let max = self.options.max_percent_difference;
        let mut failure = VerificationFailure::new(&self.options.delta_path, max)
            .with_mismatches(self.mismatches.clone())
            .with_fps_mismatch(self.golden_fps, self.options.fps);

        let declared = u64::from(self.options.frame_count);
        let supplied = self.frames_verified;
        let count_differs = self.golden_frames != declared
            || (self.reconciler.rates_match() && supplied != self.golden_frames);
        if count_differs {
            let actual = if supplied != self.golden_frames {
                supplied
            } else {
                declared
            };
            failure = failure.with_frame_count_mismatch(self.golden_frames, actual);
        }
        failure.finalize()
    }

    /// Move the golden cursor forward to `index`, decoding frames on the way.
    fn advance_golden(&mut self, index: u64) -> ClipResult<()> {
        while self.golden.index < index {
            self.golden.index += 1;
            if self.golden.real {
                match self.reader.next_frame()? {
                    Some(frame) => self.golden.frame = frame,
                    None => {
                        self.golden.real = false;
                        self.golden.frame = self.blank.clone();
                    }
                }
            }
        }
        Ok(())
    }

    /// Create the delta writer and backfill one "no difference" frame per tick already verified.
    fn ensure_writer(&mut self) -> ClipResult<()> {
        if self.writer.is_some() {
            return Ok(());
        }
        let mut writer = ApngWriter::create(
            &self.options.delta_path,
            fps_u32(self.reconciler.common_rate())?,
        )?;

        if self.tick > 0 {
            let resume = self.reader.frame_number();
            self.reader.reset()?;
            let mut index = 0u64;
            let mut frame = self.reader.next_frame()?;
            let mut delta = self.self_delta(frame.as_ref())?;
            for tick in 0..self.tick {
                let target = self.reconciler.golden_index_at(tick);
                while index < target {
                    index += 1;
                    if frame.is_some() {
                        frame = self.reader.next_frame()?;
                    }
                    delta = self.self_delta(frame.as_ref())?;
                }
                writer.write_image(&delta)?;
            }
            while self.reader.frame_number() < resume && self.reader.next_frame()?.is_some() {}
            tracing::debug!(ticks = self.tick, "seeded delta writer");
        }

        self.writer = Some(writer);
        Ok(())
    }

    fn self_delta(&self, frame: Option<&FrameRGBA>) -> ClipResult<FrameRGBA> {
        let frame = frame.unwrap_or(&self.blank);
        Ok(self.differ.compare(frame, frame)?.delta)
    }
}

fn fps_u32(rate: u64) -> ClipResult<u32> {
    u32::try_from(rate)
        .map_err(|_| ClipError::validation(format!("common frame rate {rate} is too large")))
}

impl Drop for ApngVerifier {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            tracing::warn!(
                delta = %self.options.delta_path.display(),
                error = %e,
                "failed to finalize delta writer"
            );
        }
    }
}

impl FrameSink for ApngVerifier {
    fn begin(&mut self, cfg: SinkConfig) -> ClipResult<()> {
        cfg.validate()?;
        if cfg.fps != self.options.fps {
            return Err(ClipError::validation(format!(
                "sink fps {} does not match verifier fps {}",
                cfg.fps, self.options.fps
            )));
        }
        Ok(())
    }

    fn push_frame(&mut self, _idx: FrameIndex, frame: &FrameRGBA) -> ClipResult<()> {
        self.verify_frame(frame)
    }

    fn end(&mut self) -> ClipResult<()> {
        self.assert_finished()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/verify/clip.rs"]
mod tests;
