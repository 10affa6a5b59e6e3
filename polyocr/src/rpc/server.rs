use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    tool, tool_handler, tool_router,
    transport::{
        streamable_http_server::{
            session::local::LocalSessionManager, tower::StreamableHttpService,
        },
        StreamableHttpServerConfig,
    },
    ErrorData as McpError, ServerHandler,
};
use serde::Serialize;

use super::messages::{
    to_mcp_error, RecognizeBase64Request, RecognizeBytesRequest, RecognizeResponse,
    SupportedLanguagesRequest, SupportedLanguagesResponse, UpdateSettingsRequest,
    UpdateSettingsResponse,
};
use crate::ocr::RecognitionService;

#[derive(Clone)]
pub struct OcrRpcServer {
    service: RecognitionService,
    tool_router: ToolRouter<Self>,
}

impl OcrRpcServer {
    pub fn new(service: RecognitionService) -> Self {
        Self {
            service,
            tool_router: Self::tool_router(),
        }
    }
}

fn json_result<T: Serialize>(payload: &T) -> Result<CallToolResult, McpError> {
    let text = serde_json::to_string(payload)
        .map_err(|e| McpError::internal_error(format!("failed to encode response: {e}"), None))?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

#[tool_router]
impl OcrRpcServer {
    #[tool(
        name = "RecognizeBase64",
        description = "Recognize text in a base64-encoded image using the pipeline for the given language code."
    )]
    async fn recognize_base64_tool(
        &self,
        Parameters(req): Parameters<RecognizeBase64Request>,
    ) -> Result<CallToolResult, McpError> {
        let response = self
            .service
            .infer_base64(&req.id, &req.base64_image, &req.language_code)
            .await
            .map_err(|e| to_mcp_error(&e))?;
        json_result(&RecognizeResponse::from(&response))
    }

    #[tool(
        name = "RecognizeBytes",
        description = "Recognize text in raw encoded image bytes using the pipeline for the given language code."
    )]
    async fn recognize_bytes_tool(
        &self,
        Parameters(req): Parameters<RecognizeBytesRequest>,
    ) -> Result<CallToolResult, McpError> {
        let response = self
            .service
            .infer_encoded(&req.id, req.image_bytes, &req.language_code)
            .await
            .map_err(|e| to_mcp_error(&e))?;
        json_result(&RecognizeResponse::from(&response))
    }

    #[tool(
        name = "SupportedLanguages",
        description = "List the language codes configured in the active settings preset."
    )]
    async fn supported_languages_tool(
        &self,
        Parameters(_req): Parameters<SupportedLanguagesRequest>,
    ) -> Result<CallToolResult, McpError> {
        json_result(&SupportedLanguagesResponse {
            language_codes: self.service.supported_languages(),
        })
    }

    #[tool(
        name = "UpdateSettings",
        description = "Change the active preset, default language, backend or tuning values. Applies to pipelines built afterwards."
    )]
    async fn update_settings_tool(
        &self,
        Parameters(req): Parameters<UpdateSettingsRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.service
            .update_settings(req.into())
            .await
            .map_err(|e| to_mcp_error(&e))?;
        json_result(&UpdateSettingsResponse { success: true })
    }
}

#[tool_handler]
impl ServerHandler for OcrRpcServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "polyocr".to_string(),
                title: Some("polyocr RPC".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Call SupportedLanguages first, then RecognizeBase64 or RecognizeBytes with one of the returned codes."
                    .to_string(),
            ),
        }
    }
}

pub fn streamable_http_service(
    service: RecognitionService,
) -> StreamableHttpService<OcrRpcServer, LocalSessionManager> {
    StreamableHttpService::new(
        move || Ok(OcrRpcServer::new(service.clone())),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig::default(),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{json, Value};
    use tempfile::TempDir;

    use super::*;
    use crate::engine::UnavailableEngine;
    use crate::pipeline::{PipelineBuilder, PipelineCache};
    use crate::presets::{AppOptions, DocumentId, DocumentStore, FileDocumentStore, SettingsManager};

    fn server() -> (TempDir, OcrRpcServer) {
        let dir = TempDir::new().unwrap();
        let store = FileDocumentStore::new(dir.path());
        store
            .write(
                &DocumentId::AppSettings("default".into()),
                &json!({
                    "language_presets": { "en": "english" },
                    "language_code": "en",
                    "inference_backend": "Paddle_CPU",
                    "cpu_threads": 0,
                    "port": 8080,
                    "max_image_width": 1920
                }),
            )
            .unwrap();
        store
            .write(
                &DocumentId::LanguagePreset("english".into()),
                &json!({
                    "detection_model_dir": "en/det",
                    "classification_model_dir": "en/cls",
                    "recognition_model_dir": "en/rec",
                    "recognition_label_file_dir": "en.txt"
                }),
            )
            .unwrap();

        let settings = Arc::new(
            SettingsManager::load(
                Arc::new(store),
                AppOptions {
                    preset_name: "default".into(),
                    ..Default::default()
                },
            )
            .unwrap(),
        );
        let builder = Arc::new(PipelineBuilder::new(
            Arc::new(UnavailableEngine::default()),
            dir.path().join("models"),
            dir.path().join("labels"),
        ));
        let cache = PipelineCache::new(Arc::clone(&settings), builder);
        (dir, OcrRpcServer::new(RecognitionService::new(settings, cache)))
    }

    fn text_payload(result: &CallToolResult) -> Value {
        let text = result.content[0]
            .as_text()
            .map(|t| t.text.clone())
            .expect("text content");
        serde_json::from_str(&text).unwrap()
    }

    #[test]
    fn info_advertises_tools() {
        let (_dir, server) = server();
        let info = server.get_info();
        assert!(info.capabilities.tools.is_some());
        assert_eq!(info.server_info.name, "polyocr");
    }

    #[tokio::test]
    async fn supported_languages_lists_preset_codes() {
        let (_dir, server) = server();
        let result = server
            .supported_languages_tool(Parameters(SupportedLanguagesRequest {}))
            .await
            .unwrap();
        assert_eq!(text_payload(&result), json!({ "language_codes": ["en"] }));
    }

    #[tokio::test]
    async fn unknown_language_is_invalid_params() {
        let (_dir, server) = server();
        let err = server
            .recognize_bytes_tool(Parameters(RecognizeBytesRequest {
                id: "a".into(),
                image_bytes: png_bytes(),
                language_code: "xx".into(),
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        assert_eq!(err.data.unwrap()["kind"], "unknown_language");
    }

    #[tokio::test]
    async fn undecodable_image_is_invalid_params() {
        let (_dir, server) = server();
        let err = server
            .recognize_base64_tool(Parameters(RecognizeBase64Request {
                id: String::new(),
                base64_image: "!!!not base64!!!".into(),
                language_code: "en".into(),
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        assert_eq!(err.data.unwrap()["kind"], "decode");
    }

    #[tokio::test]
    async fn missing_engine_is_internal_error() {
        let (_dir, server) = server();
        let err = server
            .recognize_bytes_tool(Parameters(RecognizeBytesRequest {
                id: "a".into(),
                image_bytes: png_bytes(),
                language_code: "en".into(),
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INTERNAL_ERROR);
        assert_eq!(err.data.unwrap()["kind"], "pipeline_init");
    }

    #[tokio::test]
    async fn update_settings_rejects_unknown_backend() {
        let (_dir, server) = server();
        let err = server
            .update_settings_tool(Parameters(UpdateSettingsRequest {
                inference_backend: Some("Nope".into()),
                ..Default::default()
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);

        let ok = server
            .update_settings_tool(Parameters(UpdateSettingsRequest {
                cpu_threads: Some(4),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(text_payload(&ok), json!({ "success": true }));
    }

    fn png_bytes() -> Vec<u8> {
        let mut out = std::io::Cursor::new(Vec::new());
        image::RgbImage::new(4, 4)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }
}
