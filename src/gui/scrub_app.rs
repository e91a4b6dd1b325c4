use eframe::egui;

use super::frame_view::FrameView;
use super::SharedOutcome;
use crate::keymap::{self, Variant};
use crate::scrubber::{Scrubber, SessionEnd, Step};
use crate::session::Command;
use crate::video::VideoDecoder;

/// Frame-by-frame picker. Repaints only when input arrives.
pub struct ScrubApp {
    scrubber: Scrubber<VideoDecoder>,
    view: FrameView,
    outcome: SharedOutcome,
    status: String,
    dirty: bool,
}

impl ScrubApp {
    /// `scrubber` must already hold the first frame.
    pub fn new(scrubber: Scrubber<VideoDecoder>, outcome: SharedOutcome) -> Self {
        Self {
            scrubber,
            view: FrameView::default(),
            outcome,
            status: String::new(),
            dirty: true,
        }
    }

    fn title(&self) -> String {
        let navigator = self.scrubber.session().navigator();
        format!(
            "Frame {} - {:.1} %",
            navigator.index(),
            navigator.percent()
        )
    }

    fn on_step(&mut self, ctx: &egui::Context, step: Step) {
        match step {
            Step::Continue | Step::Muted(_) => {}
            Step::Redraw => self.dirty = true,
            Step::Paused(paused) => {
                self.status = if paused { "Paused" } else { "Browsing" }.to_owned();
            }
            Step::Captured(path) => {
                self.status = format!("Cover image saved as {}", path.display());
            }
            Step::Finished(end) => self.finish(ctx, end),
        }
    }

    fn finish(&mut self, ctx: &egui::Context, end: SessionEnd) {
        self.outcome.borrow_mut().get_or_insert(end);
        self.view.clear();
        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
    }
}

impl eframe::App for ScrubApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|i| i.viewport().close_requested()) && !self.scrubber.session().is_terminated()
        {
            let step = self.scrubber.handle(Command::Quit);
            self.on_step(ctx, step);
            return;
        }

        let commands = ctx.input(|i| keymap::commands_from_input(i, Variant::Scrubber));
        for command in commands {
            if self.scrubber.session().is_terminated() {
                break;
            }
            let step = self.scrubber.handle(command);
            self.on_step(ctx, step);
        }

        if self.dirty {
            if let Some(frame) = self.scrubber.frame() {
                self.view.update(ctx, frame);
            }
            ctx.send_viewport_cmd(egui::ViewportCommand::Title(self.title()));
            self.dirty = false;
        }

        if !self.status.is_empty() {
            egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
                ui.label(&self.status);
            });
        }
        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| self.view.show(ui));
    }
}
