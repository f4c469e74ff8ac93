//! FfmpegConverter - conversion primitive backed by the `ffmpeg` executable.

use std::ffi::OsString;
use std::path::PathBuf;

use async_trait::async_trait;

use super::process::run_tool;
use crate::domain::{ConversionPlan, TargetFormat};
use crate::error::TaskError;
use crate::ports::Converter;

#[derive(Debug, Clone)]
pub struct FfmpegConverter {
    program: PathBuf,
}

impl FfmpegConverter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn args(plan: &ConversionPlan) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-nostdin".into(),
            "-y".into(),
            "-i".into(),
            plan.source.clone().into_os_string(),
        ];

        if plan.drops_video() {
            args.push("-vn".into());
        }

        let codecs: &[&str] = match plan.target {
            TargetFormat::Mp3 => &["-c:a", "libmp3lame", "-f", "mp3"],
            TargetFormat::Wav => &["-c:a", "pcm_s16le", "-f", "wav"],
            TargetFormat::Mp4 => &["-c:v", "libx264", "-c:a", "aac", "-f", "mp4"],
        };
        args.extend(codecs.iter().map(OsString::from));

        args.push(plan.destination.clone().into_os_string());
        args
    }
}

impl Default for FfmpegConverter {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl Converter for FfmpegConverter {
    async fn convert(&self, plan: &ConversionPlan) -> Result<(), TaskError> {
        tracing::debug!(
            source = %plan.source.display(),
            destination = %plan.destination.display(),
            target = %plan.target,
            "running ffmpeg"
        );
        run_tool(&self.program, Self::args(plan)).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_of(source: &str, destination: &str, target: TargetFormat) -> Vec<String> {
        let plan = ConversionPlan::new(source, destination, target).unwrap();
        FfmpegConverter::args(&plan)
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn video_to_mp3_extracts_audio() {
        let args = args_of("/in/clip.mp4", "/out/clip.mp3", TargetFormat::Mp3);

        assert!(args.contains(&"-vn".to_string()));
        assert!(args.contains(&"libmp3lame".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("/out/clip.mp3"));
    }

    #[test]
    fn video_to_mp4_keeps_video() {
        let args = args_of("/in/clip.mkv", "/out/clip.mp4", TargetFormat::Mp4);

        assert!(!args.contains(&"-vn".to_string()));
        assert!(args.contains(&"libx264".to_string()));
    }

    #[test]
    fn input_comes_before_output() {
        let args = args_of("/in/song.wav", "/out/song.mp3", TargetFormat::Mp3);
        let input = args.iter().position(|a| a == "/in/song.wav").unwrap();
        let output = args.iter().position(|a| a == "/out/song.mp3").unwrap();

        assert_eq!(args[input - 1], "-i");
        assert!(input < output);
    }
}
