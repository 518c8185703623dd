//! Frame types: one time-stamped snapshot of the scan visualization.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Visualization mode active when a frame was captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ScanMode {
    /// Topology: model architecture.
    #[default]
    T1,
    /// Tensor: weight distribution.
    T2,
    /// Functional activation imaging.
    #[serde(rename = "fMRI")]
    Fmri,
    /// Circuit tracing.
    #[serde(rename = "DTI")]
    Dti,
    /// Anomaly detection.
    #[serde(rename = "FLAIR")]
    Flair,
}

impl ScanMode {
    /// All modes, in tab order.
    pub const ALL: [ScanMode; 5] = [
        ScanMode::T1,
        ScanMode::T2,
        ScanMode::Fmri,
        ScanMode::Dti,
        ScanMode::Flair,
    ];

    /// Tag used in recording files.
    pub fn tag(self) -> &'static str {
        match self {
            ScanMode::T1 => "T1",
            ScanMode::T2 => "T2",
            ScanMode::Fmri => "fMRI",
            ScanMode::Dti => "DTI",
            ScanMode::Flair => "FLAIR",
        }
    }
}

/// Shared, immutable scan result carried verbatim by frames.
pub type Payload = Arc<Value>;

/// The five opaque scan results a frame may carry.
///
/// Payloads are never inspected here. They are reference counted so that a
/// frame shares the exact blob the visualization owner handed over, which is
/// also what duplicate detection compares.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payloads {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structural_data: Option<Payload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_data: Option<Payload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation_data: Option<Payload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub circuit_data: Option<Payload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anomaly_data: Option<Payload>,
}

fn same_blob(a: &Option<Payload>, b: &Option<Payload>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

impl Payloads {
    /// Reference equality over every slot. Value-equal but distinct blobs
    /// compare as different.
    pub fn same_as(&self, other: &Payloads) -> bool {
        same_blob(&self.structural_data, &other.structural_data)
            && same_blob(&self.weight_data, &other.weight_data)
            && same_blob(&self.activation_data, &other.activation_data)
            && same_blob(&self.circuit_data, &other.circuit_data)
            && same_blob(&self.anomaly_data, &other.anomaly_data)
    }

    /// Number of populated slots.
    pub fn len(&self) -> usize {
        [
            &self.structural_data,
            &self.weight_data,
            &self.activation_data,
            &self.circuit_data,
            &self.anomaly_data,
        ]
        .iter()
        .filter(|slot| slot.is_some())
        .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A single recorded frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    /// Milliseconds since the recording started.
    pub timestamp: u32,
    /// Active visualization mode.
    pub mode: ScanMode,
    /// Token the visualization was focused on.
    pub selected_token_idx: u32,
    /// Opaque scan results.
    #[serde(flatten)]
    pub payloads: Payloads,
}

impl Frame {
    /// Whether two frames show the same visualization state.
    ///
    /// Timestamps are ignored; payloads are compared by reference.
    pub fn same_state(&self, other: &Frame) -> bool {
        self.mode == other.mode
            && self.selected_token_idx == other.selected_token_idx
            && self.payloads.same_as(&other.payloads)
    }
}

/// Live visualization state handed to the recorder by its owner.
#[derive(Debug, Clone, Default)]
pub struct StateSnapshot {
    pub mode: ScanMode,
    pub selected_token_idx: u32,
    pub payloads: Payloads,
    /// A scan or perturbation request is still in flight.
    pub scan_in_progress: bool,
}

impl StateSnapshot {
    /// Freeze this snapshot into a frame at `timestamp`.
    pub fn to_frame(&self, timestamp: u32) -> Frame {
        Frame {
            timestamp,
            mode: self.mode,
            selected_token_idx: self.selected_token_idx,
            payloads: self.payloads.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mode_tags_roundtrip() {
        for mode in ScanMode::ALL {
            let encoded = serde_json::to_string(&mode).unwrap();
            assert_eq!(encoded, format!("\"{}\"", mode.tag()));
            let decoded: ScanMode = serde_json::from_str(&encoded).unwrap();
            assert_eq!(decoded, mode);
        }
    }

    #[test]
    fn test_frame_json_shape() {
        let blob = Arc::new(json!({"layers": 12}));
        let frame = Frame {
            timestamp: 500,
            mode: ScanMode::Fmri,
            selected_token_idx: 3,
            payloads: Payloads {
                activation_data: Some(blob),
                ..Default::default()
            },
        };

        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["timestamp"], 500);
        assert_eq!(value["mode"], "fMRI");
        assert_eq!(value["selectedTokenIdx"], 3);
        assert_eq!(value["activationData"]["layers"], 12);
        assert!(value["structuralData"].is_null());
    }

    #[test]
    fn test_frame_missing_payloads_default_to_none() {
        let frame: Frame =
            serde_json::from_str(r#"{"timestamp":0,"mode":"DTI","selectedTokenIdx":1}"#).unwrap();
        assert_eq!(frame.mode, ScanMode::Dti);
        assert!(frame.payloads.is_empty());
    }

    #[test]
    fn test_same_state_uses_reference_equality() {
        let blob = Arc::new(json!([1, 2, 3]));
        let a = StateSnapshot {
            payloads: Payloads {
                weight_data: Some(Arc::clone(&blob)),
                ..Default::default()
            },
            ..Default::default()
        };
        let shared = a.clone();
        let copied = StateSnapshot {
            payloads: Payloads {
                weight_data: Some(Arc::new(json!([1, 2, 3]))),
                ..Default::default()
            },
            ..Default::default()
        };

        assert!(a.to_frame(0).same_state(&shared.to_frame(10)));
        assert!(!a.to_frame(0).same_state(&copied.to_frame(0)));
    }

    #[test]
    fn test_payload_count() {
        let payloads = Payloads {
            structural_data: Some(Arc::new(Value::Null)),
            anomaly_data: Some(Arc::new(json!({}))),
            ..Default::default()
        };
        assert_eq!(payloads.len(), 2);
        assert!(!payloads.is_empty());
    }
}
