use std::path::{Path, PathBuf};
use std::process::Command;

use vcover::capture;
use vcover::mux::{self, FfmpegCommand, MuxJob, NativeRemux, OutputTarget};
use vcover::navigator::FrameNavigator;
use vcover::scrubber::{FrameSource, Scrubber, SessionEnd, Step};
use vcover::session::{self, Session};
use vcover::video::{self, VideoDecoder};

fn ffmpeg_available() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Four seconds at 25 fps, so exactly 100 frames, plus a sine audio track.
fn make_clip(dir: &Path) -> Option<PathBuf> {
    if !ffmpeg_available() {
        eprintln!("ffmpeg not found, skipping");
        return None;
    }
    let clip = dir.join("clip.mp4");
    let status = Command::new("ffmpeg")
        .args(["-y", "-loglevel", "error"])
        .args(["-f", "lavfi", "-i", "testsrc=duration=4:size=160x120:rate=25"])
        .args(["-f", "lavfi", "-i", "sine=frequency=440:duration=4"])
        .args(["-c:v", "mpeg4", "-c:a", "aac", "-shortest"])
        .arg(&clip)
        .status()
        .expect("run ffmpeg");
    assert!(status.success(), "failed to synthesize test clip");
    Some(clip)
}

fn capture_frame(clip: &Path, index: u64, cover: &Path) {
    let mut decoder = VideoDecoder::open(clip).expect("open clip");
    let frame = decoder
        .frame_at(index)
        .expect("decode")
        .expect("frame exists");
    capture::save_cover(&frame, cover, 95).expect("save cover");
}

#[test]
fn decoder_reports_frames_and_clamps_navigation() {
    let dir = tempfile::tempdir().expect("tempdir");
    let Some(clip) = make_clip(dir.path()) else {
        return;
    };

    let mut decoder = VideoDecoder::open(&clip).expect("open clip");
    assert_eq!(decoder.frame_count(), 100);
    assert_eq!((decoder.width(), decoder.height()), (160, 120));

    let mut navigator = FrameNavigator::new(decoder.frame_count(), 60, 5);
    assert_eq!(navigator.step_forward(), 60);
    let frame = decoder.frame_at(navigator.index()).expect("decode");
    assert!(frame.is_some());
    assert_eq!(navigator.step_forward(), 99);
    let last = decoder.frame_at(navigator.index()).expect("decode");
    assert_eq!(last.map(|f| f.dimensions()), Some((160, 120)));
}

#[test]
fn capture_at_same_index_is_identical() {
    let dir = tempfile::tempdir().expect("tempdir");
    let Some(clip) = make_clip(dir.path()) else {
        return;
    };

    let mut decoder = VideoDecoder::open(&clip).expect("open clip");
    let first = decoder.frame_at(60).expect("decode").expect("frame");
    decoder.frame_at(80).expect("decode");
    let again = decoder.frame_at(60).expect("decode").expect("frame");

    let a = capture::encode_jpeg(&first, 95).expect("encode");
    let b = capture::encode_jpeg(&again, 95).expect("encode");
    assert_eq!(a, b);
}

fn assert_one_more_stream(clip: &Path, output: &Path) {
    let before = video::probe(clip).expect("probe input");
    let after = video::probe(output).expect("probe output");
    assert_eq!(after.streams, before.streams + 1);
    assert_eq!(after.attached_pictures, before.attached_pictures + 1);
}

#[test]
fn ffmpeg_backend_appends_attached_picture() {
    let dir = tempfile::tempdir().expect("tempdir");
    let Some(clip) = make_clip(dir.path()) else {
        return;
    };
    let cover = dir.path().join("selected.jpg");
    capture_frame(&clip, 60, &cover);

    let output = dir.path().join("output").join("clip.mp4");
    let job = MuxJob {
        video: clip.clone(),
        cover,
        output: OutputTarget::File(output.clone()),
    };
    let written = mux::run(&FfmpegCommand::new("ffmpeg"), &job).expect("mux");

    assert_eq!(written, output);
    assert_one_more_stream(&clip, &output);
}

#[test]
fn native_backend_appends_attached_picture() {
    let dir = tempfile::tempdir().expect("tempdir");
    let Some(clip) = make_clip(dir.path()) else {
        return;
    };
    let cover = dir.path().join("selected.jpg");
    capture_frame(&clip, 60, &cover);

    let output = dir.path().join("with_cover.mp4");
    let job = MuxJob {
        video: clip.clone(),
        cover,
        output: OutputTarget::File(output.clone()),
    };
    mux::run(&NativeRemux, &job).expect("mux");

    assert_one_more_stream(&clip, &output);
}

#[test]
fn in_place_edit_replaces_the_input() {
    let dir = tempfile::tempdir().expect("tempdir");
    let Some(clip) = make_clip(dir.path()) else {
        return;
    };
    let original = video::probe(&clip).expect("probe");
    let cover = dir.path().join("selected.jpg");
    capture_frame(&clip, 10, &cover);

    let job = MuxJob {
        video: clip.clone(),
        cover,
        output: OutputTarget::InPlace,
    };
    let written = mux::run(&NativeRemux, &job).expect("mux");

    assert_eq!(written, clip);
    assert!(!job.staging_path().exists());
    let edited = video::probe(&clip).expect("probe");
    assert_eq!(edited.streams, original.streams + 1);
    assert_eq!(edited.attached_pictures, 1);
}

#[test]
fn failing_ffmpeg_produces_no_output() {
    let dir = tempfile::tempdir().expect("tempdir");
    let Some(clip) = make_clip(dir.path()) else {
        return;
    };
    let cover = dir.path().join("selected.jpg");
    capture_frame(&clip, 0, &cover);

    // ffmpeg cannot pick a container for this extension and exits non-zero.
    let output = dir.path().join("broken.notacontainer");
    let job = MuxJob {
        video: clip,
        cover,
        output: OutputTarget::File(output.clone()),
    };
    let err = mux::run(&FfmpegCommand::new("ffmpeg"), &job).unwrap_err();

    assert!(err.is_mux_failure());
    assert!(!output.exists());
}

#[test]
fn scripted_session_capture_then_confirm() {
    let dir = tempfile::tempdir().expect("tempdir");
    let Some(clip) = make_clip(dir.path()) else {
        return;
    };
    let cover = dir.path().join("selected.jpg");
    let output = dir.path().join("out.mp4");

    let decoder = VideoDecoder::open(&clip).expect("open clip");
    let navigator = FrameNavigator::new(decoder.frame_count(), 60, 5);
    let session = Session::new(
        clip.clone(),
        cover.clone(),
        OutputTarget::File(output.clone()),
        navigator,
    );
    let mut scrubber = Scrubber::new(session, decoder, 95);
    assert_eq!(scrubber.load_current(), Step::Redraw);

    assert_eq!(scrubber.handle(session::Command::SeekForwardCoarse), Step::Redraw);
    assert_eq!(
        scrubber.handle(session::Command::Capture),
        Step::Captured(cover.clone())
    );
    let job = match scrubber.handle(session::Command::Confirm) {
        Step::Finished(SessionEnd::Confirmed(job)) => job,
        other => panic!("unexpected step {:?}", other),
    };
    assert!(scrubber.is_released());

    mux::run(&NativeRemux, &job).expect("mux");
    assert_one_more_stream(&clip, &output);
}
