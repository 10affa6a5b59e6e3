//! Recognition requests and their canonical result.
//!
//! - `codec` turns base64 text and encoded bytes into images
//! - `result` holds the transport-independent response and the normalizer
//! - `service` ties decoding, the pipeline cache and normalization together

mod codec;
mod result;
mod service;

pub use codec::{context_resolution, decode_base64, decode_image};
pub use result::{
    classification_label, normalize, ContextResolution, OcrResponse, Quad, TextLine, Vertex,
    BOX_VALUES,
};
pub use service::RecognitionService;
