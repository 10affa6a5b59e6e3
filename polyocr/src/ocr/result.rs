use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::engine::RawOcrResult;
use crate::error::{OcrError, Result};

/// Integers per engine box: four `(x, y)` pairs.
pub const BOX_VALUES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Vertex {
    pub x: i32,
    pub y: i32,
}

/// Text box corners, clockwise from the top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Quad {
    pub top_left: Vertex,
    pub top_right: Vertex,
    pub bottom_right: Vertex,
    pub bottom_left: Vertex,
}

impl Quad {
    /// Map an engine box positionally: the Nth pair is the Nth corner.
    pub fn from_engine_box(values: &[i32]) -> Result<Self> {
        let &[x0, y0, x1, y1, x2, y2, x3, y3] = values else {
            return Err(OcrError::Validation(format!(
                "engine box must have {BOX_VALUES} values, got {}",
                values.len()
            )));
        };

        Ok(Self {
            top_left: Vertex { x: x0, y: y0 },
            top_right: Vertex { x: x1, y: y1 },
            bottom_right: Vertex { x: x2, y: y2 },
            bottom_left: Vertex { x: x3, y: y3 },
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ContextResolution {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub recognition_score: f32,
    /// Text orientation in degrees, as a string. Absent without a classifier.
    pub classification_label: Option<String>,
    pub classification_score: Option<f32>,
    pub bbox: Quad,
}

/// Transport-independent recognition result.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrResponse {
    pub id: String,
    pub context_resolution: ContextResolution,
    pub results: Vec<TextLine>,
}

/// Orientation label for an engine class index: `0` is upright, `1` is
/// upside down; anything else is passed through.
pub fn classification_label(label: i32) -> String {
    match label {
        0 => "0".to_string(),
        1 => "180".to_string(),
        other => other.to_string(),
    }
}

fn short_sequence(name: &str, len: usize, expected: usize) -> OcrError {
    OcrError::Validation(format!(
        "engine returned {len} {name} for {expected} texts"
    ))
}

/// Turn raw engine output into the canonical response.
///
/// Entries keep engine order. No boxes means no results, which is not an
/// error.
pub fn normalize(
    id: impl Into<String>,
    raw: &RawOcrResult,
    context_resolution: ContextResolution,
) -> Result<OcrResponse> {
    let id = id.into();

    if raw.boxes.is_empty() {
        return Ok(OcrResponse {
            id,
            context_resolution,
            results: Vec::new(),
        });
    }

    let count = raw.texts.len();
    if raw.rec_scores.len() < count {
        return Err(short_sequence("recognition scores", raw.rec_scores.len(), count));
    }
    if raw.boxes.len() < count {
        return Err(short_sequence("boxes", raw.boxes.len(), count));
    }
    // An engine that ran no classifier leaves both sequences empty.
    let has_classification = !raw.cls_scores.is_empty() || !raw.cls_labels.is_empty();
    if has_classification {
        if raw.cls_scores.len() < count {
            return Err(short_sequence("classification scores", raw.cls_scores.len(), count));
        }
        if raw.cls_labels.len() < count {
            return Err(short_sequence("classification labels", raw.cls_labels.len(), count));
        }
    }

    let results = raw
        .texts
        .iter()
        .enumerate()
        .map(|(idx, text)| {
            Ok(TextLine {
                text: text.clone(),
                recognition_score: raw.rec_scores[idx],
                classification_label: has_classification
                    .then(|| classification_label(raw.cls_labels[idx])),
                classification_score: has_classification.then(|| raw.cls_scores[idx]),
                bbox: Quad::from_engine_box(&raw.boxes[idx])?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(OcrResponse {
        id,
        context_resolution,
        results,
    })
}
