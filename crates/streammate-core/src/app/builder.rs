//! AppBuilder - record store, task runner, media tools, probe のワイヤリング
//!
//! # 使用例
//! ```ignore
//! let mut app = AppBuilder::new(config).build()?;
//! if let Some(warning) = app.take_startup_warning() {
//!     eprintln!("history reset: {warning}");
//! }
//! let handle = app.download("https://youtu.be/...", None, listener)?;
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use tokio::runtime::Handle;

use super::monitor::{ConnectivityMonitor, MonitorHandle};
use super::runner::{RunOptions, TaskHandle, TaskRunner};
use crate::config::AppConfig;
use crate::domain::format::with_default_extension;
use crate::domain::{Artifact, ConversionPlan, TargetFormat, TaskKind, TaskSnapshot};
use crate::error::{StoreError, TaskError};
use crate::impls::{FfmpegConverter, TcpProbe, YtDlpDownloader};
use crate::ports::{
    Clock, ConnectivityListener, Converter, Downloader, ReachabilityProbe, SystemClock,
    TaskListener, UlidGenerator,
};
use crate::store::RecordStore;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no Tokio runtime: call build() inside a runtime or pass one with runtime()")]
    NoRuntime,

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct AppBuilder {
    config: AppConfig,
    runtime: Option<Handle>,
    store: Option<Arc<RecordStore>>,
    downloader: Option<Arc<dyn Downloader>>,
    converter: Option<Arc<dyn Converter>>,
    probe: Option<Arc<dyn ReachabilityProbe>>,
    clock: Arc<dyn Clock>,
    strict_history: bool,
}

impl AppBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            runtime: None,
            store: None,
            downloader: None,
            converter: None,
            probe: None,
            clock: Arc::new(SystemClock),
            strict_history: false,
        }
    }

    /// Runtime to spawn tasks on. Defaults to the current one.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Use an already open store instead of opening `config.history_file`.
    pub fn store(mut self, store: Arc<RecordStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn downloader(mut self, downloader: Arc<dyn Downloader>) -> Self {
        self.downloader = Some(downloader);
        self
    }

    pub fn converter(mut self, converter: Arc<dyn Converter>) -> Self {
        self.converter = Some(converter);
        self
    }

    pub fn probe(mut self, probe: Arc<dyn ReachabilityProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Fail `build()` on an unreadable history instead of starting empty.
    pub fn strict_history(mut self, strict: bool) -> Self {
        self.strict_history = strict;
        self
    }

    pub fn build(self) -> Result<App, BuildError> {
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|_| BuildError::NoRuntime)?,
        };

        let (store, startup_warning) = match self.store {
            Some(store) => (store, None),
            None if self.strict_history => {
                (Arc::new(RecordStore::open(&self.config.history_file)?), None)
            }
            None => {
                let (store, warning) = RecordStore::open_or_empty(&self.config.history_file);
                (Arc::new(store), warning)
            }
        };

        let runner = TaskRunner::new(runtime.clone(), Arc::clone(&store))
            .with_id_generator(Arc::new(UlidGenerator::new(Arc::clone(&self.clock))))
            .with_default_options(RunOptions {
                timeout: self.config.tasks.timeout(),
            });

        let downloader = self
            .downloader
            .unwrap_or_else(|| Arc::new(YtDlpDownloader::new(&self.config.tools.yt_dlp)));
        let converter = self
            .converter
            .unwrap_or_else(|| Arc::new(FfmpegConverter::new(&self.config.tools.ffmpeg)));
        let probe = self.probe.unwrap_or_else(|| {
            Arc::new(TcpProbe::new(
                self.config.probe.host.clone(),
                self.config.probe.port,
                self.config.probe.timeout(),
            ))
        });

        Ok(App {
            config: self.config,
            runtime,
            store,
            runner,
            downloader,
            converter,
            probe,
            clock: self.clock,
            startup_warning,
        })
    }
}

/// The assembled core. The presentation layer talks only to this.
pub struct App {
    config: AppConfig,
    runtime: Handle,
    store: Arc<RecordStore>,
    runner: TaskRunner,
    downloader: Arc<dyn Downloader>,
    converter: Arc<dyn Converter>,
    probe: Arc<dyn ReachabilityProbe>,
    clock: Arc<dyn Clock>,
    startup_warning: Option<StoreError>,
}

impl App {
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    pub fn runner(&self) -> &TaskRunner {
        &self.runner
    }

    /// Why the history started empty, if it had to. Returned once.
    pub fn take_startup_warning(&mut self) -> Option<StoreError> {
        self.startup_warning.take()
    }

    /// Download `url` into `destination` (or the configured download dir).
    ///
    /// An empty URL is rejected with `InvalidInput`; the listener hears about
    /// it and `Err` carries the rejected task.
    pub fn download(
        &self,
        url: &str,
        destination: Option<PathBuf>,
        listener: Arc<dyn TaskListener>,
    ) -> Result<TaskHandle, TaskSnapshot> {
        let url = url.trim();
        if url.is_empty() {
            return Err(self.runner.reject(
                TaskKind::Download,
                TaskError::invalid_input("please enter a valid URL"),
                listener.as_ref(),
            ));
        }

        let destination = destination.unwrap_or_else(|| self.config.download_dir.clone());
        if destination.as_os_str().is_empty() {
            return Err(self
                .runner
                .reject(TaskKind::Download, TaskError::Cancelled, listener.as_ref()));
        }
        let destination = match absolute(destination) {
            Ok(destination) => destination,
            Err(e) => return Err(self.runner.reject(TaskKind::Download, e, listener.as_ref())),
        };

        let downloader = Arc::clone(&self.downloader);
        let url = url.to_string();
        let operation = async move {
            let path = downloader.download(&url, &destination).await?;
            Ok(Artifact::from_path(path))
        };

        Ok(self.runner.run(TaskKind::Download, operation, listener))
    }

    /// Convert `source` into `destination` as `format`.
    ///
    /// `None` for the source means no file was picked (`InvalidInput`); `None`
    /// for the destination means the save dialog was dismissed (`Cancelled`).
    /// The destination gets the format's extension if it lacks it.
    pub fn convert(
        &self,
        source: Option<PathBuf>,
        destination: Option<PathBuf>,
        format: TargetFormat,
        listener: Arc<dyn TaskListener>,
    ) -> Result<TaskHandle, TaskSnapshot> {
        let reject = |error: TaskError| {
            self.runner
                .reject(TaskKind::Conversion, error, listener.as_ref())
        };

        let Some(source) = source else {
            return Err(reject(TaskError::invalid_input(
                "select or download a file first",
            )));
        };
        let Some(destination) = destination.filter(|d| !d.as_os_str().is_empty()) else {
            return Err(reject(TaskError::Cancelled));
        };

        let destination = match absolute(with_default_extension(destination, format)) {
            Ok(destination) => destination,
            Err(e) => return Err(reject(e)),
        };
        let plan = match ConversionPlan::new(source, destination, format) {
            Ok(plan) => plan,
            Err(e) => return Err(reject(e.into())),
        };

        let converter = Arc::clone(&self.converter);
        let operation = async move {
            converter.convert(&plan).await?;
            Ok(Artifact::from_path(plan.destination))
        };

        Ok(self.runner.run(TaskKind::Conversion, operation, listener))
    }

    /// One reachability check, outside the monitor loop.
    pub async fn check_connectivity(&self) -> bool {
        self.probe.probe().await
    }

    /// Start the periodic connectivity monitor with the configured interval.
    #[must_use = "dropping the handle stops the monitor"]
    pub fn start_monitor(&self, listener: Arc<dyn ConnectivityListener>) -> MonitorHandle {
        ConnectivityMonitor::new(Arc::clone(&self.probe), self.config.probe.interval())
            .with_clock(Arc::clone(&self.clock))
            .start(&self.runtime, listener)
    }
}

// Recorded locations must survive a change of working directory.
fn absolute(path: PathBuf) -> Result<PathBuf, TaskError> {
    std::path::absolute(&path).map_err(|e| {
        TaskError::invalid_input(format!("cannot resolve {}: {e}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskPhase;
    use crate::ports::NoopTaskListener;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;

    struct FakeDownloader;

    #[async_trait]
    impl Downloader for FakeDownloader {
        async fn download(&self, url: &str, destination_dir: &Path) -> Result<PathBuf, TaskError> {
            if url.contains("private") {
                return Err(TaskError::operation("Video unavailable. This video is private"));
            }
            Ok(destination_dir.join("clip.mp4"))
        }
    }

    #[derive(Default)]
    struct FakeConverter {
        plans: Mutex<Vec<ConversionPlan>>,
    }

    #[async_trait]
    impl Converter for FakeConverter {
        async fn convert(&self, plan: &ConversionPlan) -> Result<(), TaskError> {
            self.plans.lock().unwrap().push(plan.clone());
            Ok(())
        }
    }

    struct FixedProbe(bool);

    #[async_trait]
    impl ReachabilityProbe for FixedProbe {
        async fn probe(&self) -> bool {
            self.0
        }
    }

    fn app(dir: &tempfile::TempDir, converter: Arc<FakeConverter>) -> App {
        let config = AppConfig {
            history_file: dir.path().join("history.json"),
            download_dir: dir.path().join("downloads"),
            ..AppConfig::default()
        };
        AppBuilder::new(config)
            .downloader(Arc::new(FakeDownloader))
            .converter(converter)
            .probe(Arc::new(FixedProbe(true)))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn download_records_into_default_dir() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir, Arc::default());

        let handle = app
            .download(" https://youtu.be/abc ", None, Arc::new(NoopTaskListener))
            .unwrap();
        assert_eq!(handle.wait().await.phase, TaskPhase::Succeeded);

        let records = app.store().list(Some(TaskKind::Download));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].label, "clip.mp4");
        assert_eq!(records[0].location, dir.path().join("downloads").join("clip.mp4"));
    }

    #[tokio::test]
    async fn empty_url_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir, Arc::default());

        let rejected = app
            .download("   ", None, Arc::new(NoopTaskListener))
            .err()
            .unwrap();

        assert!(matches!(rejected.error, Some(TaskError::InvalidInput(_))));
        assert!(app.store().is_empty());
    }

    #[tokio::test]
    async fn empty_destination_is_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir, Arc::default());

        let rejected = app
            .download("https://youtu.be/abc", Some(PathBuf::new()), Arc::new(NoopTaskListener))
            .err()
            .unwrap();

        assert_eq!(rejected.error, Some(TaskError::Cancelled));
    }

    #[tokio::test]
    async fn download_failure_surfaces_tool_message() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir, Arc::default());

        let snapshot = app
            .download("https://youtu.be/private", None, Arc::new(NoopTaskListener))
            .unwrap()
            .wait()
            .await;

        assert_eq!(
            snapshot.error,
            Some(TaskError::operation("Video unavailable. This video is private"))
        );
        assert!(app.store().is_empty());
    }

    #[tokio::test]
    async fn convert_applies_default_extension() {
        let dir = tempfile::tempdir().unwrap();
        let converter = Arc::new(FakeConverter::default());
        let app = app(&dir, converter.clone());

        let snapshot = app
            .convert(
                Some(PathBuf::from("/in/clip.mp4")),
                Some(PathBuf::from("/out/converted")),
                TargetFormat::Mp3,
                Arc::new(NoopTaskListener),
            )
            .unwrap()
            .wait()
            .await;

        assert_eq!(snapshot.phase, TaskPhase::Succeeded);
        let plans = converter.plans.lock().unwrap();
        assert_eq!(plans[0].destination, PathBuf::from("/out/converted.mp3"));

        let records = app.store().list(Some(TaskKind::Conversion));
        assert_eq!(records[0].label, "converted.mp3");
    }

    #[tokio::test]
    async fn relative_download_dir_is_recorded_absolute() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir, Arc::default());

        app.download(
            "https://youtu.be/abc",
            Some(PathBuf::from("videos")),
            Arc::new(NoopTaskListener),
        )
        .unwrap()
        .wait()
        .await;

        let records = app.store().list(Some(TaskKind::Download));
        assert!(records[0].location.is_absolute());
        assert_eq!(
            records[0].location,
            std::env::current_dir().unwrap().join("videos").join("clip.mp4")
        );
    }

    #[tokio::test]
    async fn relative_conversion_output_is_recorded_absolute() {
        let dir = tempfile::tempdir().unwrap();
        let converter = Arc::new(FakeConverter::default());
        let app = app(&dir, converter.clone());

        app.convert(
            Some(PathBuf::from("in.mp4")),
            Some(PathBuf::from("out")),
            TargetFormat::Mp3,
            Arc::new(NoopTaskListener),
        )
        .unwrap()
        .wait()
        .await;

        let expected = std::env::current_dir().unwrap().join("out.mp3");
        assert_eq!(converter.plans.lock().unwrap()[0].destination, expected);

        let records = app.store().list(Some(TaskKind::Conversion));
        assert!(records[0].location.is_absolute());
        assert_eq!(records[0].location, expected);
        assert_eq!(records[0].label, "out.mp3");
    }

    #[tokio::test]
    async fn convert_rejections() {
        let dir = tempfile::tempdir().unwrap();
        let converter = Arc::new(FakeConverter::default());
        let app = app(&dir, converter.clone());
        let listener: Arc<dyn TaskListener> = Arc::new(NoopTaskListener);

        let no_source = app
            .convert(None, Some(PathBuf::from("/out/a.mp3")), TargetFormat::Mp3, listener.clone())
            .err()
            .unwrap();
        assert!(matches!(no_source.error, Some(TaskError::InvalidInput(_))));

        let no_destination = app
            .convert(Some(PathBuf::from("/in/a.mp4")), None, TargetFormat::Mp3, listener.clone())
            .err()
            .unwrap();
        assert_eq!(no_destination.error, Some(TaskError::Cancelled));

        let audio_to_video = app
            .convert(
                Some(PathBuf::from("/in/a.wav")),
                Some(PathBuf::from("/out/a.mp4")),
                TargetFormat::Mp4,
                listener,
            )
            .err()
            .unwrap();
        assert!(matches!(audio_to_video.error, Some(TaskError::InvalidInput(_))));

        assert!(converter.plans.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_history_becomes_startup_warning() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("history.json"), "{{{").unwrap();

        let mut app = app(&dir, Arc::default());

        assert!(app.store().is_empty());
        assert!(app.take_startup_warning().is_some_and(|e| e.is_corrupt()));
        assert!(app.take_startup_warning().is_none());
    }

    #[tokio::test]
    async fn strict_history_fails_build() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "{{{").unwrap();

        let config = AppConfig {
            history_file: path,
            ..AppConfig::default()
        };
        let result = AppBuilder::new(config).strict_history(true).build();

        assert!(matches!(result, Err(BuildError::Store(e)) if e.is_corrupt()));
    }

    #[test]
    fn build_outside_runtime_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            history_file: dir.path().join("history.json"),
            ..AppConfig::default()
        };
        assert!(matches!(
            AppBuilder::new(config).build(),
            Err(BuildError::NoRuntime)
        ));
    }

    #[tokio::test]
    async fn connectivity_check_uses_probe() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir, Arc::default());
        assert!(app.check_connectivity().await);
    }
}
