use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};

use crate::error::{CoverError, Result};
use crate::video;

/// Where the muxed container ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Replace the input video.
    InPlace,
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuxJob {
    pub video: PathBuf,
    pub cover: PathBuf,
    pub output: OutputTarget,
}

impl MuxJob {
    /// The file the container is first written to. In-place jobs write a
    /// sibling that replaces the input once the mux succeeded.
    pub fn staging_path(&self) -> PathBuf {
        match &self.output {
            OutputTarget::File(path) => path.clone(),
            OutputTarget::InPlace => {
                let stem = self
                    .video
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "video".to_owned());
                let name = match self.video.extension() {
                    Some(ext) => format!(".{stem}.vcover-staging.{}", ext.to_string_lossy()),
                    None => format!(".{stem}.vcover-staging"),
                };
                self.video.with_file_name(name)
            }
        }
    }

    pub fn final_path(&self) -> &Path {
        match &self.output {
            OutputTarget::File(path) => path,
            OutputTarget::InPlace => &self.video,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MuxBackend {
    /// Run the ffmpeg binary.
    Ffmpeg,
    /// Remux in-process through the ffmpeg libraries.
    Native,
}

pub trait CoverWriter {
    /// Writes `job.cover` into `staging` as an attached-picture stream.
    fn write(&self, job: &MuxJob, staging: &Path) -> Result<()>;
}

pub struct FfmpegCommand {
    program: PathBuf,
}

impl FfmpegCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// `cover_index` is the output index of the appended stream, i.e. the
    /// number of streams in the input.
    pub fn args(job: &MuxJob, staging: &Path, cover_index: usize) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-y", "-loglevel", "error", "-i"]
            .iter()
            .map(OsString::from)
            .collect();
        args.push(job.video.clone().into_os_string());
        args.push("-i".into());
        args.push(job.cover.clone().into_os_string());
        for arg in ["-map", "0", "-map", "1", "-c", "copy"] {
            args.push(arg.into());
        }
        args.push(format!("-disposition:{cover_index}").into());
        args.push("attached_pic".into());
        args.push(staging.as_os_str().to_owned());
        args
    }
}

impl CoverWriter for FfmpegCommand {
    fn write(&self, job: &MuxJob, staging: &Path) -> Result<()> {
        let cover_index = video::probe(&job.video)
            .map_err(|e| CoverError::Mux {
                path: job.video.clone(),
                reason: e.to_string(),
            })?
            .streams;
        let mut command = Command::new(&self.program);
        command
            .args(Self::args(job, staging, cover_index))
            .stdin(Stdio::null());

        log::debug!("Running {:?}", command);
        let output = command.output().map_err(|e| CoverError::Mux {
            path: job.video.clone(),
            reason: format!("failed to run {}: {}", self.program.display(), e),
        })?;

        if !output.status.success() {
            return Err(CoverError::MuxProcess {
                program: self.program.display().to_string(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }
        Ok(())
    }
}

pub struct NativeRemux;

impl CoverWriter for NativeRemux {
    fn write(&self, job: &MuxJob, staging: &Path) -> Result<()> {
        video::attach_cover(&job.video, &job.cover, staging).map_err(|e| CoverError::Mux {
            path: job.video.clone(),
            reason: e.to_string(),
        })
    }
}

pub fn writer_for(backend: MuxBackend, ffmpeg_program: &Path) -> Box<dyn CoverWriter> {
    match backend {
        MuxBackend::Ffmpeg => Box::new(FfmpegCommand::new(ffmpeg_program)),
        MuxBackend::Native => Box::new(NativeRemux),
    }
}

fn mux_failure(job: &MuxJob, what: &str, path: &Path, err: std::io::Error) -> CoverError {
    CoverError::Mux {
        path: job.video.clone(),
        reason: format!("{} {}: {}", what, path.display(), err),
    }
}

/// Runs `job` through `writer`. The final file only appears once the mux
/// succeeded; on failure the partial output is removed.
pub fn run(writer: &dyn CoverWriter, job: &MuxJob) -> Result<PathBuf> {
    if !job.cover.is_file() {
        return Err(CoverError::input(format!(
            "no cover image at {}, capture a frame first",
            job.cover.display()
        )));
    }
    if !job.video.is_file() {
        return Err(CoverError::input(format!(
            "video {} does not exist",
            job.video.display()
        )));
    }

    let staging = job.staging_path();
    if let Some(parent) = staging.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| mux_failure(job, "cannot create output directory", parent, e))?;
    }

    if let Err(e) = writer.write(job, &staging) {
        if staging.exists() {
            if let Err(remove_err) = fs::remove_file(&staging) {
                log::warn!(
                    "Failed to remove partial output {}: {}",
                    staging.display(),
                    remove_err
                );
            }
        }
        return Err(e);
    }

    let final_path = job.final_path().to_path_buf();
    if staging != final_path {
        if let Err(e) = fs::rename(&staging, &final_path) {
            if let Err(remove_err) = fs::remove_file(&staging) {
                log::warn!("Failed to remove {}: {}", staging.display(), remove_err);
            }
            return Err(mux_failure(job, "cannot replace", &final_path, e));
        }
    }

    match video::probe(&final_path) {
        Ok(summary) => log::info!(
            "{} now has {} streams, {} attached picture(s)",
            final_path.display(),
            summary.streams,
            summary.attached_pictures
        ),
        Err(e) => log::warn!("Could not probe {}: {}", final_path.display(), e),
    }

    Ok(final_path)
}
