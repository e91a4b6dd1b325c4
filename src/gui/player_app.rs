use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use eframe::egui;

use super::frame_view::FrameView;
use super::SharedOutcome;
use crate::audio::{self, AudioPlayer};
use crate::config::AppConfig;
use crate::error::Result;
use crate::keymap::{self, Variant};
use crate::mux::OutputTarget;
use crate::navigator::FrameNavigator;
use crate::scrubber::{FrameSource, Scrubber, SessionEnd, Step};
use crate::session::{Command, Session};
use crate::video::VideoDecoder;

/// Maps wall-clock time to a frame index while playing.
#[derive(Debug, Clone, Copy)]
pub struct PlaybackClock {
    origin: Instant,
    origin_index: u64,
}

impl PlaybackClock {
    pub fn start(origin: Instant, origin_index: u64) -> Self {
        Self {
            origin,
            origin_index,
        }
    }

    pub fn index_at(&self, now: Instant, frame_rate: f64) -> u64 {
        let elapsed = now.saturating_duration_since(self.origin).as_secs_f64();
        self.origin_index + (elapsed * frame_rate).floor() as u64
    }
}

struct LoadedVideo {
    scrubber: Scrubber<VideoDecoder>,
    audio: Option<AudioPlayer>,
    clock: PlaybackClock,
    frame_rate: f64,
    file_name: String,
}

impl LoadedVideo {
    fn open(path: &Path, config: &AppConfig) -> Result<Self> {
        let decoder = VideoDecoder::open(path)?;
        let frame_rate = decoder.frame_rate();
        let total = decoder.frame_count();
        let navigator = FrameNavigator::new(total, config.player_step(total), config.fine_divisor);
        let mut session = Session::new(
            path.to_path_buf(),
            config.cover_file.clone(),
            OutputTarget::File(config.output_for(path)),
            navigator,
        );
        session.set_muted(true);

        let audio = match audio::decode_track(path) {
            Ok(Some(track)) => match AudioPlayer::new(track, false, true) {
                Ok(player) => Some(player),
                Err(e) => {
                    log::warn!("Playing without sound: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                log::warn!("Could not decode audio of {}: {}", path.display(), e);
                None
            }
        };

        Ok(Self {
            scrubber: Scrubber::new(session, decoder, config.jpeg_quality),
            audio,
            clock: PlaybackClock::start(Instant::now(), 0),
            frame_rate,
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        })
    }

    fn seconds(&self) -> f64 {
        self.scrubber.session().current_frame_index() as f64 / self.frame_rate
    }

    fn resync(&mut self) {
        let index = self.scrubber.session().current_frame_index();
        self.clock = PlaybackClock::start(Instant::now(), index);
        let seconds = self.seconds();
        if let Some(audio) = self.audio.as_mut() {
            if let Err(e) = audio.restart_at(seconds) {
                log::warn!("Audio seek failed: {}", e);
            }
        }
    }
}

/// Plays a video with a button bar; the same commands are bound to keys.
pub struct PlayerApp {
    config: AppConfig,
    loaded: Option<LoadedVideo>,
    view: FrameView,
    outcome: SharedOutcome,
    status: String,
    last_title_refresh: Option<Instant>,
}

impl PlayerApp {
    pub fn new(config: AppConfig, video: Option<PathBuf>, outcome: SharedOutcome) -> Self {
        let mut app = Self {
            config,
            loaded: None,
            view: FrameView::default(),
            outcome,
            status: String::new(),
            last_title_refresh: None,
        };
        if let Some(path) = video {
            app.load(&path);
        }
        app
    }

    fn select_video(&mut self) {
        let picked = rfd::FileDialog::new()
            .add_filter("Video Files", &["mp4", "avi", "mkv", "mov"])
            .pick_file();
        match picked {
            Some(path) => self.load(&path),
            None => log::debug!("No video selected"),
        }
    }

    fn load(&mut self, path: &Path) {
        // Release the previous decoder and audio output before opening the next one.
        self.loaded = None;
        self.view.clear();

        match LoadedVideo::open(path, &self.config) {
            Ok(mut loaded) => match loaded.scrubber.load_current() {
                Step::Redraw => {
                    log::info!("Playing {}", path.display());
                    self.status = keymap::help_line(
                        Variant::Player,
                        loaded.scrubber.session().navigator().coarse_step(),
                        loaded.scrubber.session().navigator().fine_step(),
                    );
                    self.loaded = Some(loaded);
                    self.last_title_refresh = None;
                }
                _ => {
                    self.status = format!("{} has no readable frames", path.display());
                    log::warn!("{}", self.status);
                }
            },
            Err(e) => {
                self.status = format!("Cannot open {}: {}", path.display(), e);
                log::error!("{}", self.status);
            }
        }
    }

    fn run_command(&mut self, ctx: &egui::Context, command: Command) {
        let Some(loaded) = self.loaded.as_mut() else {
            if command == Command::Quit {
                self.finish(ctx, SessionEnd::Quit);
            }
            return;
        };

        let step = loaded.scrubber.handle(command);
        self.on_step(ctx, step, true);
    }

    fn on_step(&mut self, ctx: &egui::Context, step: Step, user_seek: bool) {
        let Some(loaded) = self.loaded.as_mut() else {
            return;
        };
        match step {
            Step::Continue => {}
            Step::Redraw => {
                if let Some(frame) = loaded.scrubber.frame() {
                    self.view.update(ctx, frame);
                }
                if user_seek {
                    loaded.resync();
                }
                self.last_title_refresh = None;
            }
            Step::Paused(paused) => {
                if let Some(audio) = loaded.audio.as_mut() {
                    audio.set_paused(paused);
                }
                loaded.resync();
            }
            Step::Muted(muted) => {
                if let Some(audio) = loaded.audio.as_mut() {
                    audio.set_muted(muted);
                }
            }
            Step::Captured(path) => {
                self.status = format!("Frame saved as {}", path.display());
            }
            Step::Finished(end) => self.finish(ctx, end),
        }
    }

    fn finish(&mut self, ctx: &egui::Context, end: SessionEnd) {
        self.outcome.borrow_mut().get_or_insert(end);
        self.loaded = None;
        self.view.clear();
        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
    }

    fn play(&mut self, ctx: &egui::Context) {
        let Some(loaded) = self.loaded.as_mut() else {
            return;
        };
        if loaded.scrubber.session().is_paused() {
            return;
        }

        let target = loaded.clock.index_at(Instant::now(), loaded.frame_rate);
        let step = loaded.scrubber.advance_to(target);
        let at_end = loaded.scrubber.session().navigator().at_end();
        self.on_step(ctx, step, false);

        if at_end {
            self.run_command(ctx, Command::TogglePause);
        }
    }

    fn refresh_title(&mut self, ctx: &egui::Context) {
        let interval = Duration::from_millis(self.config.title_refresh_ms);
        let due = self
            .last_title_refresh
            .map_or(true, |last| last.elapsed() >= interval);
        if !due {
            return;
        }

        let title = match &self.loaded {
            Some(loaded) => format!(
                "{} - {:.1}% played",
                loaded.file_name,
                loaded.scrubber.session().navigator().percent()
            ),
            None => "Video Player".to_owned(),
        };
        ctx.send_viewport_cmd(egui::ViewportCommand::Title(title));
        self.last_title_refresh = Some(Instant::now());
    }

    fn button_bar(&self, ui: &mut egui::Ui) -> (Vec<Command>, bool) {
        let mut commands = Vec::new();
        let mut select = false;
        let loaded = self.loaded.as_ref();
        let enabled = loaded.is_some();
        let paused = loaded.map_or(false, |l| l.scrubber.session().is_paused());
        let muted = loaded.map_or(true, |l| l.scrubber.session().is_muted());

        ui.horizontal(|ui| {
            if ui.button("Select Video").clicked() {
                select = true;
            }
            let buttons = [
                (if paused { "Play" } else { "Pause" }, Command::TogglePause),
                (" << ", Command::SeekBackwardCoarse),
                (" >> ", Command::SeekForwardCoarse),
                (if muted { "Sound" } else { "Mute" }, Command::ToggleMute),
                ("Select", Command::Capture),
                ("Confirm", Command::Confirm),
            ];
            for (label, command) in buttons {
                if ui.add_enabled(enabled, egui::Button::new(label)).clicked() {
                    commands.push(command);
                }
            }
        });
        (commands, select)
    }
}

impl eframe::App for PlayerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|i| i.viewport().close_requested()) {
            if self.outcome.borrow().is_none() {
                self.finish(ctx, SessionEnd::Quit);
            }
            return;
        }

        let keys = ctx.input(|i| keymap::commands_from_input(i, Variant::Player));
        for command in keys {
            self.run_command(ctx, command);
        }

        let mut clicked = Vec::new();
        let mut select = false;
        egui::TopBottomPanel::bottom("controls").show(ctx, |ui| {
            (clicked, select) = self.button_bar(ui);
            if !self.status.is_empty() {
                ui.label(&self.status);
            }
        });
        for command in clicked {
            self.run_command(ctx, command);
        }
        if select {
            self.select_video();
        }

        self.play(ctx);
        self.refresh_title(ctx);

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(egui::Color32::GRAY))
            .show(ctx, |ui| self.view.show(ui));

        let title_refresh = Duration::from_millis(self.config.title_refresh_ms);
        let next_repaint = match &self.loaded {
            Some(loaded) if !loaded.scrubber.session().is_paused() => {
                Duration::from_secs_f64(1.0 / loaded.frame_rate.max(1.0)).min(title_refresh)
            }
            _ => title_refresh,
        };
        ctx.request_repaint_after(next_repaint);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_counts_frames_since_origin() {
        let origin = Instant::now();
        let clock = PlaybackClock::start(origin, 10);
        assert_eq!(clock.index_at(origin, 25.0), 10);
        assert_eq!(clock.index_at(origin + Duration::from_millis(1000), 25.0), 35);
        assert_eq!(clock.index_at(origin + Duration::from_millis(39), 25.0), 10);
    }

    #[test]
    fn clock_ignores_time_before_origin() {
        let origin = Instant::now() + Duration::from_secs(5);
        let clock = PlaybackClock::start(origin, 3);
        assert_eq!(clock.index_at(Instant::now(), 30.0), 3);
    }
}
