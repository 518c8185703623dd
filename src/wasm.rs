//! WebAssembly bindings for the replay engine.
//!
//! The browser owns every clock and timer, so each time-dependent call takes
//! the host's current time (e.g. `performance.now()` or the
//! `requestAnimationFrame` timestamp) in milliseconds.

use chrono::Utc;
use serde::Deserialize;
use wasm_bindgen::prelude::*;

use crate::{
    animation::{CaptureOutcome, ManualClock, PlaybackEngine, SessionInfo, format},
    export::{ExportOptions, Raster, artifact_file_name},
    schema::{Payloads, PlaybackSpeed, ScanMode, StateSnapshot},
};

/// Initialize WASM module with panic hook and logging.
#[wasm_bindgen(start)]
pub fn init() {
    // Set panic hook for better error messages in browser
    console_error_panic_hook::set_once();

    // Initialize WASM logger
    wasm_logger::init(wasm_logger::Config::default());
}

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Visualization state as sent from JavaScript.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotInput {
    mode: ScanMode,
    #[serde(default)]
    selected_token_idx: u32,
    #[serde(default)]
    scan_in_progress: bool,
    #[serde(flatten)]
    payloads: Payloads,
}

fn parse_snapshot(snapshot_json: &str) -> Result<StateSnapshot, JsValue> {
    let input: SnapshotInput = serde_json::from_str(snapshot_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid snapshot JSON: {e}")))?;
    Ok(StateSnapshot {
        mode: input.mode,
        selected_token_idx: input.selected_token_idx,
        payloads: input.payloads,
        scan_in_progress: input.scan_in_progress,
    })
}

/// WebAssembly wrapper for [`PlaybackEngine`].
#[wasm_bindgen]
pub struct WasmPlaybackEngine {
    engine: PlaybackEngine<ManualClock>,
}

#[wasm_bindgen]
impl WasmPlaybackEngine {
    #[wasm_bindgen(constructor)]
    pub fn new() -> WasmPlaybackEngine {
        WasmPlaybackEngine {
            engine: PlaybackEngine::new(ManualClock::default()),
        }
    }

    /// Set the model and prompt stored with the next recording.
    #[wasm_bindgen(js_name = setSession)]
    pub fn set_session(&mut self, model_id: &str, prompt: &str) {
        self.engine.set_session(SessionInfo {
            model_id: model_id.to_string(),
            prompt: prompt.to_string(),
        });
    }

    /// Start recording; stops any playback first.
    #[wasm_bindgen(js_name = startRecording)]
    pub fn start_recording(&mut self, now_ms: f64, snapshot_json: &str) -> Result<bool, JsValue> {
        let snapshot = parse_snapshot(snapshot_json)?;
        Ok(self.at(now_ms).start_recording(&snapshot))
    }

    /// Notify the recorder of a settled state change.
    ///
    /// Returns `"captured"`, `"scanInFlight"`, `"duplicate"` or `"idle"`.
    #[wasm_bindgen(js_name = onStateSettled)]
    pub fn on_state_settled(&mut self, now_ms: f64, snapshot_json: &str) -> Result<String, JsValue> {
        let snapshot = parse_snapshot(snapshot_json)?;
        let outcome = self.at(now_ms).on_state_settled(&snapshot);
        let tag = match outcome {
            CaptureOutcome::Captured => "captured",
            CaptureOutcome::ScanInFlight => "scanInFlight",
            CaptureOutcome::Duplicate => "duplicate",
            CaptureOutcome::Idle => "idle",
        };
        Ok(tag.to_string())
    }

    /// Stop recording and load the result for playback.
    #[wasm_bindgen(js_name = stopRecording)]
    pub fn stop_recording(&mut self, now_ms: f64) -> Result<bool, JsValue> {
        self.at(now_ms).stop_recording().map_err(js_error)
    }

    /// Load a recording file's text. On failure the current recording stays.
    #[wasm_bindgen(js_name = loadRecording)]
    pub fn load_recording(&mut self, json: &str) -> Result<(), JsValue> {
        self.engine.load_json(json).map_err(js_error)
    }

    /// The loaded recording as pretty-printed JSON, if any.
    #[wasm_bindgen(js_name = recordingJson)]
    pub fn recording_json(&self) -> Result<Option<String>, JsValue> {
        self.engine
            .recording()
            .map(format::to_json)
            .transpose()
            .map_err(js_error)
    }

    /// Download file name for the loaded recording with `extension`.
    #[wasm_bindgen(js_name = downloadName)]
    pub fn download_name(&self, extension: &str) -> Option<String> {
        let recording = self.engine.recording()?;
        Some(artifact_file_name(recording.model_id(), Utc::now(), extension))
    }

    #[wasm_bindgen]
    pub fn close(&mut self) {
        self.engine.close();
    }

    #[wasm_bindgen]
    pub fn play(&mut self, now_ms: f64) {
        self.at(now_ms).play();
    }

    #[wasm_bindgen]
    pub fn pause(&mut self) {
        self.engine.pause();
    }

    #[wasm_bindgen]
    pub fn stop(&mut self) {
        self.engine.stop();
    }

    #[wasm_bindgen]
    pub fn seek(&mut self, index: usize, now_ms: f64) {
        self.at(now_ms).seek(index);
    }

    /// Set playback speed to 0.5, 1, 2 or 4.
    #[wasm_bindgen(js_name = setSpeed)]
    pub fn set_speed(&mut self, multiplier: f64, now_ms: f64) -> Result<(), JsValue> {
        let speed = PlaybackSpeed::from_multiplier(multiplier)
            .ok_or_else(|| JsValue::from_str(&format!("Unsupported speed: {multiplier}")))?;
        self.at(now_ms).set_speed(speed);
        Ok(())
    }

    /// Advance playback; call from `requestAnimationFrame`.
    #[wasm_bindgen]
    pub fn tick(&mut self, now_ms: f64) -> bool {
        self.at(now_ms).tick()
    }

    /// Current frame as a JS object, or `undefined`.
    #[wasm_bindgen(js_name = currentFrame)]
    pub fn current_frame(&self) -> Result<JsValue, JsValue> {
        match self.engine.current_frame() {
            Some(frame) => serde_wasm_bindgen::to_value(frame)
                .map_err(|e| JsValue::from_str(&format!("Serialization error: {e}"))),
            None => Ok(JsValue::UNDEFINED),
        }
    }

    /// Start a GIF export whose frames the page renders and captures.
    ///
    /// Returns the number of frames to capture, or `undefined` when another
    /// export is already running. Fails while recording or with nothing
    /// loaded, before any frame is touched.
    #[wasm_bindgen(js_name = beginExport)]
    pub fn begin_export(&self) -> Result<Option<usize>, JsValue> {
        match self.engine.begin_host_export() {
            Ok(frames) => Ok(Some(frames)),
            Err(e) if e.is_benign() => Ok(None),
            Err(e) => Err(js_error(e)),
        }
    }

    /// Abandon the export started by `beginExport`.
    #[wasm_bindgen(js_name = abortExport)]
    pub fn abort_export(&self) {
        self.engine.abort_host_export();
    }

    /// Encode `frame_count` RGBA frames of `width` x `height`, concatenated
    /// in `rgba`, as a looping GIF at `fps`.
    ///
    /// Ends the export started by `beginExport`; without one it runs the
    /// same checks itself.
    #[wasm_bindgen(js_name = encodeGif)]
    pub fn encode_gif(
        &self,
        width: u32,
        height: u32,
        rgba: &[u8],
        frame_count: usize,
        fps: u32,
    ) -> Result<Vec<u8>, JsValue> {
        let rasters = match split_frames(width, height, rgba, frame_count) {
            Ok(rasters) => rasters,
            Err(e) => {
                self.engine.abort_host_export();
                return Err(e);
            }
        };
        let mut options = ExportOptions::gif().with_fps(fps);
        self.engine
            .finish_host_gif(&rasters, &mut options)
            .map(|artifact| artifact.bytes)
            .map_err(js_error)
    }

    /// Engine status as a JS object.
    #[wasm_bindgen]
    pub fn status(&mut self, now_ms: f64) -> Result<JsValue, JsValue> {
        let status = self.at(now_ms).status();
        serde_wasm_bindgen::to_value(&status)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {e}")))
    }
}

impl WasmPlaybackEngine {
    /// The engine with its clock moved to `now_ms`.
    fn at(&mut self, now_ms: f64) -> &mut PlaybackEngine<ManualClock> {
        self.engine.clock().set(now_ms);
        &mut self.engine
    }
}

impl Default for WasmPlaybackEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn split_frames(width: u32, height: u32, rgba: &[u8], frame_count: usize) -> Result<Vec<Raster>, JsValue> {
    let frame_len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(4))
        .unwrap_or(0);
    if frame_len == 0 || frame_len.checked_mul(frame_count) != Some(rgba.len()) {
        return Err(JsValue::from_str(&format!(
            "Expected {} frames of {}x{} RGBA, got {} bytes",
            frame_count,
            width,
            height,
            rgba.len()
        )));
    }

    rgba.chunks_exact(frame_len)
        .map(|chunk| {
            Raster::from_rgba(width, height, chunk.to_vec())
                .ok_or_else(|| JsValue::from_str("Frame buffer size mismatch"))
        })
        .collect()
}
