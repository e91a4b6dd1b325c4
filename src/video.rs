use std::path::{Path, PathBuf};
use std::sync::Once;

use ffmpeg::util::frame::video::Video;
use ffmpeg_next::{
    self as ffmpeg, codec, decoder, encoder, format, media, packet, rescale, software, Dictionary,
    Packet, Rational, Rescale,
};
use image::{ImageFormat, ImageReader, RgbImage};

use crate::error::{CoverError, Result};
use crate::scrubber::FrameSource;

static INIT: Once = Once::new();

/// Frames between the decoder position and the target for which decoding
/// forward is preferred over seeking.
const FORWARD_DECODE_LIMIT: u64 = 64;

// AV_NOPTS_VALUE
const NO_PTS: i64 = i64::MIN;

pub fn init() -> Result<()> {
    let mut result = Ok(());
    INIT.call_once(|| {
        result = ffmpeg::init();
        ffmpeg::util::log::set_level(ffmpeg::util::log::Level::Error);
    });
    result.map_err(CoverError::from)
}

/// An open decode handle on the best video stream of a file.
///
/// Dropping it releases the demuxer, decoder and scaler.
pub struct VideoDecoder {
    path: PathBuf,
    input: format::context::Input,
    decoder: decoder::Video,
    scaler: software::scaling::Context,
    stream_index: usize,
    time_base: Rational,
    frame_rate: Rational,
    start_pts: i64,
    frame_count: u64,
    next_index: Option<u64>,
    drained: bool,
}

impl VideoDecoder {
    pub fn open(path: &Path) -> Result<Self> {
        init()?;

        let input = format::input(&path)?;
        let (stream_index, time_base, frame_rate, start_pts, stream_frames, parameters) = {
            let stream = input
                .streams()
                .best(media::Type::Video)
                .ok_or(ffmpeg::Error::StreamNotFound)?;
            let avg = stream.avg_frame_rate();
            let frame_rate = if avg.numerator() > 0 && avg.denominator() > 0 {
                avg
            } else {
                stream.rate()
            };
            let start_pts = match stream.start_time() {
                NO_PTS => 0,
                start => start,
            };
            (
                stream.index(),
                stream.time_base(),
                frame_rate,
                start_pts,
                stream.frames(),
                stream.parameters(),
            )
        };

        if frame_rate.numerator() <= 0 || frame_rate.denominator() <= 0 {
            return Err(CoverError::Decode {
                path: path.to_path_buf(),
                reason: "unknown frame rate".to_owned(),
            });
        }

        let frame_count = if stream_frames > 0 {
            stream_frames as u64
        } else {
            let seconds = input.duration() as f64 * f64::from(rescale::TIME_BASE);
            (seconds * f64::from(frame_rate)).round().max(0.0) as u64
        };
        if frame_count == 0 {
            return Err(CoverError::input(format!(
                "{} has no video frames",
                path.display()
            )));
        }

        let decoder = codec::context::Context::from_parameters(parameters)?
            .decoder()
            .video()?;
        let scaler = software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            format::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            software::scaling::Flags::BILINEAR,
        )?;

        log::debug!(
            "Opened {}: {} frames at {} fps, {}x{}",
            path.display(),
            frame_count,
            f64::from(frame_rate),
            decoder.width(),
            decoder.height()
        );

        Ok(Self {
            path: path.to_path_buf(),
            input,
            decoder,
            scaler,
            stream_index,
            time_base,
            frame_rate,
            start_pts,
            frame_count,
            next_index: Some(0),
            drained: false,
        })
    }

    pub fn width(&self) -> u32 {
        self.decoder.width()
    }

    pub fn height(&self) -> u32 {
        self.decoder.height()
    }

    fn pts_for(&self, index: u64) -> i64 {
        self.start_pts + (index as i64).rescale(self.frame_rate.invert(), self.time_base)
    }

    fn index_for(&self, pts: i64) -> u64 {
        frame_index(pts, self.start_pts, self.time_base, self.frame_rate)
    }

    fn seek_to(&mut self, index: u64) -> Result<()> {
        let position = self.pts_for(index).rescale(self.time_base, rescale::TIME_BASE);
        self.input.seek(position, ..position)?;
        self.decoder.flush();
        self.next_index = None;
        self.drained = false;
        Ok(())
    }

    fn next_packet(&mut self) -> Option<Packet> {
        let stream_index = self.stream_index;
        self.input
            .packets()
            .find(|(stream, _)| stream.index() == stream_index)
            .map(|(_, packet)| packet)
    }

    fn to_image(&mut self, decoded: &Video) -> Result<RgbImage> {
        let mut rgb = Video::empty();
        self.scaler.run(decoded, &mut rgb)?;
        frame_to_image(&rgb).ok_or_else(|| CoverError::Decode {
            path: self.path.clone(),
            reason: "scaled frame does not match its dimensions".to_owned(),
        })
    }
}

impl FrameSource for VideoDecoder {
    fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn frame_rate(&self) -> f64 {
        f64::from(self.frame_rate)
    }

    fn frame_at(&mut self, index: u64) -> Result<Option<RgbImage>> {
        let needs_seek = match self.next_index {
            Some(next) => index < next || index - next > FORWARD_DECODE_LIMIT,
            None => true,
        };
        if needs_seek {
            self.seek_to(index)?;
        }

        let target = self.pts_for(index);
        let mut decoded = Video::empty();
        loop {
            while self.decoder.receive_frame(&mut decoded).is_ok() {
                let decoded_index = self.index_for(decoded.timestamp().unwrap_or(target));
                if decoded_index < index {
                    continue;
                }
                self.next_index = Some(decoded_index + 1);
                return self.to_image(&decoded).map(Some);
            }

            if self.drained {
                return Ok(None);
            }
            match self.next_packet() {
                Some(packet) => self.decoder.send_packet(&packet)?,
                None => {
                    self.decoder.send_eof()?;
                    self.drained = true;
                }
            }
        }
    }
}

impl Drop for VideoDecoder {
    fn drop(&mut self) {
        log::debug!("Released decoder for {}", self.path.display());
    }
}

/// Nearest frame index for `pts`, so timestamps a tick off still match.
fn frame_index(pts: i64, start_pts: i64, time_base: Rational, frame_rate: Rational) -> u64 {
    (pts - start_pts)
        .rescale(time_base, frame_rate.invert())
        .max(0) as u64
}

/// Copies an RGB24 frame into an image, dropping the per-row padding.
pub fn frame_to_image(frame: &Video) -> Option<RgbImage> {
    let (width, height) = (frame.width(), frame.height());
    let stride = frame.stride(0);
    let row = width as usize * 3;
    let data = frame.data(0);

    let mut pixels = Vec::with_capacity(row * height as usize);
    for y in 0..height as usize {
        let start = y * stride;
        pixels.extend_from_slice(data.get(start..start + row)?);
    }
    RgbImage::from_raw(width, height, pixels)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaSummary {
    pub streams: usize,
    pub attached_pictures: usize,
}

pub fn probe(path: &Path) -> Result<MediaSummary> {
    init()?;
    let input = format::input(&path)?;
    let attached_pictures = input
        .streams()
        .filter(|stream| {
            stream
                .disposition()
                .contains(format::stream::Disposition::ATTACHED_PIC)
        })
        .count();
    Ok(MediaSummary {
        streams: input.nb_streams() as usize,
        attached_pictures,
    })
}

struct CoverImage {
    data: Vec<u8>,
    codec: codec::Id,
    mime: &'static str,
    width: u32,
    height: u32,
}

impl CoverImage {
    /// The codec follows the file's contents, not its extension.
    fn read(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        let format = image::guess_format(&data)?;
        let (codec, mime) = match format {
            ImageFormat::Jpeg => (codec::Id::MJPEG, "image/jpeg"),
            ImageFormat::Png => (codec::Id::PNG, "image/png"),
            other => {
                return Err(CoverError::input(format!(
                    "cover {} is {:?}, expected JPEG or PNG",
                    path.display(),
                    other
                )))
            }
        };
        let (width, height) =
            ImageReader::with_format(std::io::Cursor::new(&data), format).into_dimensions()?;
        Ok(Self {
            data,
            codec,
            mime,
            width,
            height,
        })
    }

    fn parameters(&self) -> codec::Parameters {
        let mut parameters = codec::Parameters::new();
        // SAFETY: `Parameters::new` allocated the codecpar and `parameters` owns it.
        unsafe {
            let raw = parameters.as_mut_ptr();
            (*raw).codec_type = media::Type::Video.into();
            (*raw).codec_id = self.codec.into();
            (*raw).width = self.width as i32;
            (*raw).height = self.height as i32;
        }
        parameters
    }
}

/// Remuxes `input_path` into `output_path`, copying every stream unchanged
/// and appending `cover_path` as an attached-picture stream.
pub fn attach_cover(input_path: &Path, cover_path: &Path, output_path: &Path) -> Result<()> {
    init()?;
    let cover = CoverImage::read(cover_path)?;

    let mut input = format::input(&input_path)?;
    let mut output = format::output(&output_path)?;

    for ist in input.streams() {
        let mut ost = output.add_stream(encoder::find(codec::Id::None))?;
        ost.set_parameters(ist.parameters());
        ost.set_metadata(ist.metadata().to_owned());
        // SAFETY: both streams live in open format contexts borrowed for this loop body.
        unsafe {
            (*ost.parameters().as_mut_ptr()).codec_tag = 0;
            (*ost.as_mut_ptr()).disposition = (*ist.as_ptr()).disposition;
        }
    }

    let cover_index = {
        let mut ost = output.add_stream(encoder::find(codec::Id::None))?;
        ost.set_parameters(cover.parameters());
        ost.set_time_base(Rational(1, 90_000));
        let mut metadata = Dictionary::new();
        if let Some(name) = cover_path.file_name().and_then(|n| n.to_str()) {
            metadata.set("filename", name);
        }
        metadata.set("mimetype", cover.mime);
        ost.set_metadata(metadata);
        // SAFETY: `ost` was just added to `output`, which outlives this block.
        unsafe {
            (*ost.as_mut_ptr()).disposition = ffmpeg::ffi::AV_DISPOSITION_ATTACHED_PIC as i32;
        }
        ost.index()
    };

    output.set_metadata(input.metadata().to_owned());
    output.write_header()?;

    let output_time_bases: Vec<Rational> = output.streams().map(|s| s.time_base()).collect();

    let mut cover_packet = Packet::copy(&cover.data);
    cover_packet.set_stream(cover_index);
    cover_packet.set_pts(Some(0));
    cover_packet.set_dts(Some(0));
    cover_packet.set_flags(packet::Flags::KEY);
    cover_packet.write_interleaved(&mut output)?;

    for (ist, mut packet) in input.packets() {
        let index = ist.index();
        packet.rescale_ts(ist.time_base(), output_time_bases[index]);
        packet.set_position(-1);
        packet.set_stream(index);
        packet.write_interleaved(&mut output)?;
    }

    output.write_trailer()?;
    Ok(())
}
