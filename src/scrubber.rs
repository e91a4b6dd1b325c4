use std::path::PathBuf;

use image::RgbImage;

use crate::capture;
use crate::error::Result;
use crate::mux::MuxJob;
use crate::session::{Command, Effect, Session};

/// Random access to decoded frames.
pub trait FrameSource {
    fn frame_count(&self) -> u64;

    fn frame_rate(&self) -> f64;

    /// `Ok(None)` means the stream ended before `index`.
    fn frame_at(&mut self, index: u64) -> Result<Option<RgbImage>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    Quit,
    EndOfStream,
    Confirmed(MuxJob),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Continue,
    /// A new frame is available through [`Scrubber::frame`].
    Redraw,
    Paused(bool),
    Muted(bool),
    Captured(PathBuf),
    Finished(SessionEnd),
}

/// Runs a [`Session`] against a frame source. The source is released as soon
/// as the session terminates, whichever way it ends.
pub struct Scrubber<S: FrameSource> {
    session: Session,
    source: Option<S>,
    frame: Option<RgbImage>,
    jpeg_quality: u8,
    captured: bool,
}

impl<S: FrameSource> Scrubber<S> {
    pub fn new(session: Session, source: S, jpeg_quality: u8) -> Self {
        Self {
            session,
            source: Some(source),
            frame: None,
            jpeg_quality,
            captured: false,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn frame(&self) -> Option<&RgbImage> {
        self.frame.as_ref()
    }

    pub fn frame_rate(&self) -> Option<f64> {
        self.source.as_ref().map(|s| s.frame_rate())
    }

    pub fn is_released(&self) -> bool {
        self.source.is_none()
    }

    /// Decodes the frame under the cursor. Running out of frames, or failing
    /// to decode one, ends the session without muxing.
    pub fn load_current(&mut self) -> Step {
        let index = self.session.current_frame_index();
        let Some(source) = self.source.as_mut() else {
            return Step::Continue;
        };

        match source.frame_at(index) {
            Ok(Some(frame)) => {
                self.frame = Some(frame);
                Step::Redraw
            }
            Ok(None) => {
                log::info!("End of video or invalid frame.");
                self.finish(SessionEnd::EndOfStream)
            }
            Err(e) => {
                log::info!("End of video or invalid frame ({}).", e);
                self.finish(SessionEnd::EndOfStream)
            }
        }
    }

    pub fn handle(&mut self, command: Command) -> Step {
        // A cover left over from an earlier run does not count.
        if command == Command::Confirm && !self.session.is_terminated() && !self.captured {
            log::warn!(
                "No frame selected for {} yet, select one before confirming",
                self.session.cover_path().display()
            );
            return Step::Continue;
        }

        match self.session.apply(command) {
            Effect::None => Step::Continue,
            Effect::Moved(_) => self.load_current(),
            Effect::Capture => self.capture(),
            Effect::Paused(paused) => Step::Paused(paused),
            Effect::Muted(muted) => Step::Muted(muted),
            Effect::Quit => self.finish(SessionEnd::Quit),
            Effect::Confirm(job) => self.finish(SessionEnd::Confirmed(job)),
        }
    }

    /// Moves the cursor during playback.
    pub fn advance_to(&mut self, index: u64) -> Step {
        match self.session.advance_to(index) {
            Effect::Moved(_) => self.load_current(),
            _ => Step::Continue,
        }
    }

    fn capture(&mut self) -> Step {
        let Some(frame) = self.frame.as_ref() else {
            log::warn!("No frame to capture yet");
            return Step::Continue;
        };
        let cover_path = self.session.cover_path().to_path_buf();
        match capture::save_cover(frame, &cover_path, self.jpeg_quality) {
            Ok(()) => {
                self.captured = true;
                log::info!("Cover image saved as {}", cover_path.display());
                Step::Captured(cover_path)
            }
            Err(e) => {
                log::error!("Failed to save cover to {}: {}", cover_path.display(), e);
                Step::Continue
            }
        }
    }

    fn finish(&mut self, end: SessionEnd) -> Step {
        self.session.terminate();
        self.source = None;
        self.frame = None;
        Step::Finished(end)
    }
}
