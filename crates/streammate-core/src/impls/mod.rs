//! Impls - production implementations of the ports.
//!
//! # Included
//! - **TcpProbe**: reachability via a short TCP connect
//! - **YtDlpDownloader**: download primitive (`yt-dlp` child process)
//! - **FfmpegConverter**: conversion primitive (`ffmpeg` child process)

mod process;

pub mod ffmpeg;
pub mod tcp_probe;
pub mod ytdlp;

pub use self::ffmpeg::FfmpegConverter;
pub use self::tcp_probe::TcpProbe;
pub use self::ytdlp::YtDlpDownloader;
