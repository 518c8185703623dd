//! Playback engine: the single owner of recording, playback and export state.

use std::cell::Cell;
use std::io;

use chrono::Utc;
use serde::Serialize;

use super::clock::Clock;
use super::format;
use super::player::{PlaybackState, Player, format_time};
use super::recorder::{CaptureOutcome, Recorder, SessionInfo};
use crate::export::webm::{self, VideoBackend};
use crate::export::{
    DownloadSink, ExportArtifact, ExportError, ExportOptions, Raster, RenderSurface, gif,
};
use crate::schema::{Frame, PlaybackSpeed, Recording, RecordingError, StateSnapshot, VideoConfig};

/// Point-in-time view of the engine for status displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    pub recording: bool,
    pub frames_captured: usize,
    pub recording_elapsed_ms: u32,
    pub exporting: bool,
    pub loaded: bool,
    pub playback: PlaybackState,
    pub current_index: usize,
    pub frame_count: usize,
    pub speed: PlaybackSpeed,
    pub position_ms: u32,
    pub duration_ms: u32,
}

impl EngineStatus {
    /// `m:ss / m:ss` position label.
    pub fn position_label(&self) -> String {
        format!(
            "{} / {}",
            format_time(self.position_ms),
            format_time(self.duration_ms)
        )
    }
}

/// Marks an export as in flight until dropped.
struct ExportGuard<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> ExportGuard<'a> {
    fn acquire(flag: &'a Cell<bool>) -> Option<Self> {
        if flag.replace(true) {
            None
        } else {
            Some(Self { flag })
        }
    }

    /// Take over a flag that was left set by [`ExportGuard::hold`].
    fn adopt(flag: &'a Cell<bool>) -> Self {
        Self { flag }
    }

    /// Keep the flag set after the guard goes away.
    fn hold(self) {
        std::mem::forget(self);
    }
}

impl Drop for ExportGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

/// Owns the recorder, the player and the loaded recording.
///
/// Constructed once by the host and passed by reference to whatever needs
/// it. All time comes from the injected [`Clock`].
pub struct PlaybackEngine<C: Clock> {
    clock: C,
    recorder: Recorder,
    player: Player,
    session: SessionInfo,
    exporting: Cell<bool>,
    host_export: Cell<bool>,
}

impl<C: Clock> PlaybackEngine<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            recorder: Recorder::new(),
            player: Player::new(),
            session: SessionInfo::default(),
            exporting: Cell::new(false),
            host_export: Cell::new(false),
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Model and prompt attached to the next recording that stops.
    pub fn set_session(&mut self, session: SessionInfo) {
        self.session = session;
    }

    pub fn session(&self) -> &SessionInfo {
        &self.session
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    pub fn is_exporting(&self) -> bool {
        self.exporting.get()
    }

    /// The loaded recording, if any.
    pub fn recording(&self) -> Option<&Recording> {
        self.player.recording()
    }

    // Recording

    /// Stop any playback and start recording from `snapshot`.
    ///
    /// Refused while an export is in flight.
    pub fn start_recording(&mut self, snapshot: &StateSnapshot) -> bool {
        if self.recorder.is_recording() {
            return false;
        }
        if self.exporting.get() {
            log::warn!("Recording refused: export in progress");
            return false;
        }
        self.player.stop();
        self.recorder
            .start(self.clock.now_ms(), Utc::now(), snapshot)
    }

    /// Entry point for the visualization owner after every state change.
    pub fn on_state_settled(&mut self, snapshot: &StateSnapshot) -> CaptureOutcome {
        self.recorder.on_state_settled(self.clock.now_ms(), snapshot)
    }

    /// Stop recording and load the result into the player.
    ///
    /// Returns false if nothing was being recorded.
    pub fn stop_recording(&mut self) -> Result<bool, RecordingError> {
        match self.recorder.stop(self.clock.now_ms(), &self.session)? {
            Some(recording) => {
                self.player.load(recording);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // File I/O

    /// Replace the loaded recording with a parsed one.
    pub fn load(&mut self, recording: Recording) {
        log::info!(
            "Loaded recording: {} frames, {} ms, model {}",
            recording.len(),
            recording.duration_ms(),
            recording.model_id()
        );
        self.player.load(recording);
    }

    /// Parse `text` and load it. On failure nothing changes.
    pub fn load_json(&mut self, text: &str) -> Result<(), RecordingError> {
        let recording = format::from_json(text).inspect_err(|e| log::warn!("{e}"))?;
        self.load(recording);
        Ok(())
    }

    /// Read a recording file and load it. On failure nothing changes.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_path<P: AsRef<std::path::Path>>(&mut self, path: P) -> Result<(), RecordingError> {
        let recording = format::load_path(path).inspect_err(|e| log::warn!("{e}"))?;
        self.load(recording);
        Ok(())
    }

    /// Hand the loaded recording to `sink` as a JSON file.
    ///
    /// Returns false if no recording is loaded.
    pub fn save_recording<D: DownloadSink>(&self, sink: &mut D) -> Result<bool, RecordingError> {
        let Some(recording) = self.player.recording() else {
            return Ok(false);
        };
        let artifact = format::recording_artifact(recording, Utc::now())?;
        sink.deliver(&artifact)?;
        log::info!("Saved recording as {}", artifact.file_name);
        Ok(true)
    }

    /// Unload the current recording.
    pub fn close(&mut self) -> Option<Recording> {
        self.player.close()
    }

    // Playback

    pub fn play(&mut self) {
        self.player.play(self.clock.now_ms());
    }

    pub fn pause(&mut self) {
        self.player.pause();
    }

    pub fn stop(&mut self) {
        self.player.stop();
    }

    pub fn seek(&mut self, index: usize) {
        self.player.seek_to(index, self.clock.now_ms());
    }

    pub fn set_speed(&mut self, speed: PlaybackSpeed) {
        self.player.set_speed(speed, self.clock.now_ms());
    }

    /// Call once per host render frame. Returns true if the frame changed.
    pub fn tick(&mut self) -> bool {
        self.player.tick(self.clock.now_ms())
    }

    pub fn current_frame(&self) -> Option<&Frame> {
        self.player.current_frame()
    }

    pub fn status(&self) -> EngineStatus {
        let now = self.clock.now_ms();
        EngineStatus {
            recording: self.recorder.is_recording(),
            frames_captured: self.recorder.frames_captured(),
            recording_elapsed_ms: self.recorder.elapsed_ms(now),
            exporting: self.exporting.get(),
            loaded: self.player.recording().is_some(),
            playback: self.player.state(),
            current_index: self.player.current_index(),
            frame_count: self.player.frame_count(),
            speed: self.player.speed(),
            position_ms: self.player.position_ms(),
            duration_ms: self.player.duration_ms(),
        }
    }

    // Export

    fn begin_export(&self) -> Result<(ExportGuard<'_>, &Recording), ExportError> {
        if self.recorder.is_recording() {
            log::warn!("Export rejected: recording in progress");
            return Err(ExportError::RecordingActive);
        }
        let guard = ExportGuard::acquire(&self.exporting).ok_or_else(|| {
            log::debug!("Export request ignored: another export is running");
            ExportError::ExportInProgress
        })?;
        let recording = self.player.recording().ok_or(ExportError::NoRecording)?;
        Ok((guard, recording))
    }

    /// Export the loaded recording as a GIF and deliver it to `sink`.
    pub async fn export_gif<S: RenderSurface, D: DownloadSink>(
        &self,
        surface: &mut S,
        sink: &mut D,
        options: &mut ExportOptions<'_>,
    ) -> Result<ExportArtifact, ExportError> {
        let (_guard, recording) = self.begin_export()?;
        let artifact = gif::export_gif(recording, surface, options)
            .await
            .inspect_err(|e| log::warn!("GIF export failed: {e}"))?;
        deliver(sink, &artifact)?;
        Ok(artifact)
    }

    /// Start an export whose frames the host renders and captures itself.
    ///
    /// Returns the number of frames to capture. The export stays in flight,
    /// rejecting other exports, until [`finish_host_gif`] or
    /// [`abort_host_export`].
    ///
    /// [`finish_host_gif`]: Self::finish_host_gif
    /// [`abort_host_export`]: Self::abort_host_export
    pub fn begin_host_export(&self) -> Result<usize, ExportError> {
        let (guard, recording) = self.begin_export()?;
        let frames = recording.len();
        guard.hold();
        self.host_export.set(true);
        log::info!("Host export started ({} frames)", frames);
        Ok(frames)
    }

    /// Abandon a host export started with [`begin_host_export`](Self::begin_host_export).
    pub fn abort_host_export(&self) {
        if self.host_export.replace(false) {
            self.exporting.set(false);
            log::info!("Host export aborted");
        }
    }

    /// Encode host-captured rasters, one per recorded frame, as a GIF.
    ///
    /// Completes a pending host export, or runs as a one-shot export with
    /// the usual checks when none is pending. The export ends either way.
    pub fn finish_host_gif(
        &self,
        rasters: &[Raster],
        options: &mut ExportOptions<'_>,
    ) -> Result<ExportArtifact, ExportError> {
        let (_guard, recording) = if self.host_export.replace(false) {
            let guard = ExportGuard::adopt(&self.exporting);
            if self.recorder.is_recording() {
                log::warn!("Export rejected: recording in progress");
                return Err(ExportError::RecordingActive);
            }
            let recording = self.player.recording().ok_or(ExportError::NoRecording)?;
            (guard, recording)
        } else {
            self.begin_export()?
        };
        options.validate()?;
        let artifact = gif::encode_captured(recording, rasters, options.frame_delay_ms())
            .inspect_err(|e| log::warn!("GIF export failed: {e}"))?;
        options.report(1.0);
        Ok(artifact)
    }

    /// Export the loaded recording as WebM and deliver it to `sink`.
    pub async fn export_webm<S: RenderSurface, B: VideoBackend, D: DownloadSink>(
        &self,
        surface: &mut S,
        backend: &mut B,
        video: &VideoConfig,
        sink: &mut D,
        options: &mut ExportOptions<'_>,
    ) -> Result<ExportArtifact, ExportError> {
        let (_guard, recording) = self.begin_export()?;
        let artifact = webm::export_webm(recording, surface, backend, video, options)
            .await
            .inspect_err(|e| log::warn!("WebM export failed: {e}"))?;
        deliver(sink, &artifact)?;
        Ok(artifact)
    }
}

fn deliver<D: DownloadSink>(sink: &mut D, artifact: &ExportArtifact) -> io::Result<()> {
    sink.deliver(artifact)
        .inspect_err(|e| log::warn!("Delivering {} failed: {e}", artifact.file_name))
}
