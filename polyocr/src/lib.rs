pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod ocr;
pub mod pipeline;
pub mod presets;
pub mod rpc;
