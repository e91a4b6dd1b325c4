use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use eframe::egui;

use vcover::gui::{PlayerApp, ScrubApp, SharedOutcome};
use vcover::mux::{self, CoverWriter, MuxBackend, OutputTarget};
use vcover::navigator::FrameNavigator;
use vcover::scrubber::{FrameSource, Scrubber, SessionEnd, Step};
use vcover::session::Session;
use vcover::video::VideoDecoder;
use vcover::{keymap, AppConfig};

#[derive(Parser)]
#[command(name = "vcover")]
#[command(about = "Pick a frame of a video and embed it as the video's cover art", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Step through the frames of a video and pick one
    Scrub(ScrubArgs),
    /// Play a video and pick the frame on screen
    Player(PlayerArgs),
}

#[derive(Args)]
struct ScrubArgs {
    /// Path to video file
    #[arg(short, long)]
    video: PathBuf,
    /// Path to cover file; without --output the video is edited in place
    #[arg(short, long)]
    cover: Option<PathBuf>,
    /// Write the video with its new cover here
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Frames per coarse step
    #[arg(long)]
    step: Option<u64>,
    /// Divisor for the fine step
    #[arg(long)]
    beta: Option<u64>,
    #[arg(long, value_enum)]
    backend: Option<MuxBackend>,
}

impl ScrubArgs {
    fn targets(&self, config: &AppConfig) -> (PathBuf, OutputTarget) {
        match (&self.cover, &self.output) {
            (Some(cover), None) => (cover.clone(), OutputTarget::InPlace),
            (cover, Some(output)) => (
                cover.clone().unwrap_or_else(|| config.cover_file.clone()),
                OutputTarget::File(output.clone()),
            ),
            (None, None) => (
                config.cover_file.clone(),
                OutputTarget::File(config.output_for(&self.video)),
            ),
        }
    }
}

#[derive(Args)]
struct PlayerArgs {
    /// Video to open right away
    video: Option<PathBuf>,
    #[arg(long, value_enum)]
    backend: Option<MuxBackend>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Using default config: {}", e);
        AppConfig::default()
    });

    match cli.command {
        Commands::Scrub(args) => scrub(args, config),
        Commands::Player(args) => player(args, config),
    }
}

fn scrub(args: ScrubArgs, config: AppConfig) -> anyhow::Result<()> {
    if !args.video.is_file() {
        anyhow::bail!("Video file {} does not exist", args.video.display());
    }
    let (cover, output) = args.targets(&config);
    log::info!("Video file selected: {}", args.video.display());
    log::info!("Cover file selected: {}", cover.display());

    let decoder = VideoDecoder::open(&args.video)
        .with_context(|| format!("Failed to open {}", args.video.display()))?;
    let navigator = FrameNavigator::new(
        decoder.frame_count(),
        args.step.unwrap_or(config.step_frames),
        args.beta.unwrap_or(config.fine_divisor),
    );
    log::info!(
        "{}",
        keymap::help_line(
            keymap::Variant::Scrubber,
            navigator.coarse_step(),
            navigator.fine_step()
        )
    );

    let session = Session::new(args.video.clone(), cover, output, navigator);
    let mut scrubber = Scrubber::new(session, decoder, config.jpeg_quality);
    if let Step::Finished(_) = scrubber.load_current() {
        return Ok(());
    }

    let outcome = SharedOutcome::default();
    let app = ScrubApp::new(scrubber, outcome.clone());
    run_window(
        "Select Cover",
        [config.window_width, config.window_height],
        Box::new(app),
    )?;

    let end = outcome.borrow_mut().take();
    let writer = mux::writer_for(
        args.backend.unwrap_or(config.backend),
        &config.ffmpeg_program(),
    );
    finish(end, writer.as_ref())
}

fn player(args: PlayerArgs, config: AppConfig) -> anyhow::Result<()> {
    let writer = mux::writer_for(
        args.backend.unwrap_or(config.backend),
        &config.ffmpeg_program(),
    );
    let outcome = SharedOutcome::default();
    let app = PlayerApp::new(config.clone(), args.video, outcome.clone());
    run_window("Video Player", [800.0, 600.0], Box::new(app))?;

    let end = outcome.borrow_mut().take();
    finish(end, writer.as_ref())
}

fn run_window(title: &str, size: [f32; 2], app: Box<dyn eframe::App>) -> anyhow::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(size)
            .with_title(title),
        ..Default::default()
    };

    eframe::run_native("vcover", options, Box::new(move |_cc| Ok(app)))
        .map_err(|e| anyhow::anyhow!("Failed to run window: {}", e))
}

/// Muxes a confirmed session. Any failure after confirm exits non-zero.
fn finish(end: Option<SessionEnd>, writer: &dyn CoverWriter) -> anyhow::Result<()> {
    let job = match end {
        Some(SessionEnd::Confirmed(job)) => job,
        Some(SessionEnd::EndOfStream) => {
            log::debug!("Session ended at end of stream");
            return Ok(());
        }
        Some(SessionEnd::Quit) | None => return Ok(()),
    };

    match mux::run(writer, &job) {
        Ok(path) => {
            log::info!(
                "Successfully updated cover for {} -> {}",
                job.video.display(),
                path.display()
            );
            Ok(())
        }
        Err(e) => {
            log::error!("Error: {}", e);
            Err(e).context("Attaching the cover failed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scrub_args(argv: &[&str]) -> ScrubArgs {
        let mut full = vec!["vcover", "scrub"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).expect("valid arguments").command {
            Commands::Scrub(args) => args,
            Commands::Player(_) => panic!("expected scrub"),
        }
    }

    #[test]
    fn cover_alone_edits_in_place() {
        let args = scrub_args(&["-v", "test.mp4", "-c", "picked.jpg"]);
        let (cover, output) = args.targets(&AppConfig::default());
        assert_eq!(cover, PathBuf::from("picked.jpg"));
        assert_eq!(output, OutputTarget::InPlace);
    }

    #[test]
    fn output_uses_default_cover() {
        let args = scrub_args(&["--video", "test.mp4", "--output", "out/test.mp4"]);
        let (cover, output) = args.targets(&AppConfig::default());
        assert_eq!(cover, PathBuf::from("selected.jpg"));
        assert_eq!(output, OutputTarget::File(PathBuf::from("out/test.mp4")));
    }

    #[test]
    fn no_targets_writes_to_output_directory() {
        let args = scrub_args(&["-v", "clips/test.mp4"]);
        let (_, output) = args.targets(&AppConfig::default());
        assert_eq!(output, OutputTarget::File(PathBuf::from("output/test.mp4")));
    }

    #[test]
    fn step_and_backend_flags_parse() {
        let args = scrub_args(&["-v", "a.mp4", "--step", "30", "--beta", "3", "--backend", "native"]);
        assert_eq!(args.step, Some(30));
        assert_eq!(args.beta, Some(3));
        assert_eq!(args.backend, Some(MuxBackend::Native));
    }

    struct Failing;

    impl CoverWriter for Failing {
        fn write(&self, job: &mux::MuxJob, _staging: &std::path::Path) -> vcover::error::Result<()> {
            Err(vcover::CoverError::Mux {
                path: job.video.clone(),
                reason: "refused".to_owned(),
            })
        }
    }

    #[test]
    fn failed_mux_after_confirm_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let video = dir.path().join("clip.mp4");
        let cover = dir.path().join("selected.jpg");
        std::fs::write(&video, b"video").expect("write");
        std::fs::write(&cover, b"cover").expect("write");
        let job = mux::MuxJob {
            video,
            cover,
            output: OutputTarget::File(dir.path().join("out.mp4")),
        };

        assert!(finish(Some(SessionEnd::Confirmed(job.clone())), &Failing).is_err());

        std::fs::remove_file(&job.cover).expect("remove");
        assert!(finish(Some(SessionEnd::Confirmed(job)), &Failing).is_err());
    }

    #[test]
    fn quit_and_end_of_stream_do_not_mux() {
        assert!(finish(Some(SessionEnd::Quit), &Failing).is_ok());
        assert!(finish(Some(SessionEnd::EndOfStream), &Failing).is_ok());
        assert!(finish(None, &Failing).is_ok());
    }

    #[test]
    fn video_is_required() {
        assert!(Cli::try_parse_from(["vcover", "scrub", "-c", "x.jpg"]).is_err());
    }
}
