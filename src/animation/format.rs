//! Recording file format: a single JSON document.
//!
//! ```text
//! {
//!   "version": 1,
//!   "modelId": "gpt2",
//!   "prompt": "The cat sat",
//!   "createdAt": "2026-03-07T12:00:00.000Z",
//!   "duration": 4200,
//!   "frames": [
//!     { "timestamp": 0, "mode": "T1", "selectedTokenIdx": 0, "structuralData": { ... } },
//!     ...
//!   ]
//! }
//! ```
//!
//! Payload fields (`structuralData`, `weightData`, `activationData`,
//! `circuitData`, `anomalyData`) are optional and carried verbatim.

use std::io::{Read, Write};
#[cfg(not(target_arch = "wasm32"))]
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::export::{ExportArtifact, artifact_file_name};
use crate::schema::{Recording, RecordingDocument, RecordingError};

/// MIME type of saved recordings.
pub const RECORDING_MIME: &str = "application/json";

/// Parse and validate a recording document.
pub fn from_json(text: &str) -> Result<Recording, RecordingError> {
    let document: RecordingDocument = serde_json::from_str(text)?;
    document.into_recording()
}

/// Parse and validate a recording from a reader.
pub fn read_from<R: Read>(r: R) -> Result<Recording, RecordingError> {
    let document: RecordingDocument = serde_json::from_reader(r)?;
    document.into_recording()
}

/// Pretty-printed JSON for `recording`.
pub fn to_json(recording: &Recording) -> Result<String, RecordingError> {
    Ok(serde_json::to_string_pretty(recording)?)
}

/// Write `recording` as pretty-printed JSON.
pub fn write_to<W: Write>(recording: &Recording, w: &mut W) -> Result<(), RecordingError> {
    serde_json::to_writer_pretty(&mut *w, recording)?;
    w.flush()?;
    Ok(())
}

/// Load a recording file from disk.
#[cfg(not(target_arch = "wasm32"))]
pub fn load_path<P: AsRef<Path>>(path: P) -> Result<Recording, RecordingError> {
    let file = std::fs::File::open(path.as_ref())?;
    read_from(std::io::BufReader::new(file))
}

/// Package `recording` as a downloadable JSON file dated `date`.
pub fn recording_artifact(recording: &Recording, date: DateTime<Utc>) -> Result<ExportArtifact, RecordingError> {
    Ok(ExportArtifact {
        file_name: artifact_file_name(recording.model_id(), date, "json"),
        mime_type: RECORDING_MIME.to_string(),
        bytes: to_json(recording)?.into_bytes(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Frame, Payloads, ScanMode};
    use chrono::TimeZone;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    fn sample() -> Recording {
        let frames = vec![
            Frame {
                timestamp: 0,
                mode: ScanMode::T1,
                selected_token_idx: 0,
                payloads: Payloads {
                    structural_data: Some(Arc::new(json!({"layers": 12}))),
                    ..Default::default()
                },
            },
            Frame {
                timestamp: 480,
                mode: ScanMode::Fmri,
                selected_token_idx: 3,
                payloads: Payloads {
                    activation_data: Some(Arc::new(json!([0.5, 0.25]))),
                    ..Default::default()
                },
            },
            Frame {
                timestamp: 480,
                mode: ScanMode::Flair,
                selected_token_idx: 3,
                payloads: Payloads::default(),
            },
        ];
        Recording::new("gpt2", "The cat sat", "2026-03-07T12:00:00.000Z", 1210, frames).unwrap()
    }

    #[test]
    fn test_save_load_roundtrip() {
        let original = sample();
        let json = to_json(&original).unwrap();
        let loaded = from_json(&json).unwrap();

        assert_eq!(loaded.len(), original.len());
        assert_eq!(loaded.duration_ms(), 1210);
        assert_eq!(loaded.model_id(), "gpt2");
        assert_eq!(loaded.prompt(), "The cat sat");
        assert_eq!(loaded.created_at(), "2026-03-07T12:00:00.000Z");
        for (a, b) in loaded.frames().iter().zip(original.frames()) {
            assert_eq!(a.timestamp, b.timestamp);
            assert_eq!(a.mode, b.mode);
            assert_eq!(a.selected_token_idx, b.selected_token_idx);
        }
        assert_eq!(
            loaded.frames()[1].payloads.activation_data.as_deref(),
            Some(&json!([0.5, 0.25]))
        );
    }

    #[test]
    fn test_wire_field_names() {
        let value: serde_json::Value = serde_json::from_str(&to_json(&sample()).unwrap()).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["modelId"], "gpt2");
        assert_eq!(value["duration"], 1210);
        assert_eq!(value["frames"][1]["mode"], "fMRI");
        assert_eq!(value["frames"][1]["selectedTokenIdx"], 3);
        assert_eq!(value["frames"][0]["structuralData"]["layers"], 12);
        assert!(value["frames"][2].get("anomalyData").is_none());
    }

    #[test]
    fn test_rejects_invalid_documents() {
        for text in [
            r#"{"version": 1, "frames": []}"#,
            r#"{"frames": [{"timestamp": 0, "mode": "T1", "selectedTokenIdx": 0}]}"#,
            r#"{"version": 1}"#,
            r#"{"version": 1, "frames": [
                {"timestamp": 0, "mode": "T1", "selectedTokenIdx": 0},
                {"timestamp": 90, "mode": "T2", "selectedTokenIdx": 0},
                {"timestamp": 50, "mode": "T2", "selectedTokenIdx": 1}]}"#,
        ] {
            assert!(
                matches!(from_json(text), Err(RecordingError::Invalid(_))),
                "accepted {text}"
            );
        }
        assert!(matches!(from_json("{not json"), Err(RecordingError::Malformed(_))));
        assert!(matches!(
            from_json(r#"{"version": 2, "frames": [{"timestamp": 0, "mode": "T1", "selectedTokenIdx": 0}]}"#),
            Err(RecordingError::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn test_file_roundtrip() {
        let mut file = NamedTempFile::new().unwrap();
        write_to(&sample(), &mut file).unwrap();
        let loaded = load_path(file.path()).unwrap();
        assert_eq!(loaded.len(), 3);
        assert!(matches!(
            load_path(file.path().with_extension("missing")),
            Err(RecordingError::Io(_))
        ));
    }

    #[test]
    fn test_recording_artifact() {
        let date = Utc.with_ymd_and_hms(2026, 3, 7, 0, 0, 0).unwrap();
        let artifact = recording_artifact(&sample(), date).unwrap();
        assert_eq!(artifact.file_name, "nmri-recording-gpt2-2026-03-07.json");
        assert_eq!(artifact.mime_type, "application/json");
        assert_eq!(from_json(std::str::from_utf8(&artifact.bytes).unwrap()).unwrap().len(), 3);
    }
}
