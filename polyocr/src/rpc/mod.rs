//! RPC surface: the recognition service exposed as MCP tools over
//! streamable HTTP, mounted next to the REST routes.

pub mod messages;
mod server;

pub use server::{streamable_http_service, OcrRpcServer};
