//
// backend.rs
//
// tower-lsp language server for N3 and Turtle documents
//

use std::sync::Arc;

use tokio::sync::RwLock;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::Client;
use tower_lsp::LanguageServer;
use tower_lsp::LspService;
use tower_lsp::Server;

use crate::config::parse_settings;
use crate::edit_notifier::{InsertNamespaces, InsertNamespacesParams};
use crate::handlers;
use crate::state::{PassReport, WorldState};

pub const SERVER_NAME: &str = "n3-lsp";

/// Characters that open a completion list
pub const TRIGGER_CHARACTERS: [&str; 3] = ["<", "?", ":"];

pub struct Backend {
    client: Client,
    state: Arc<RwLock<WorldState>>,
}

impl Backend {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            state: Arc::new(RwLock::new(WorldState::new())),
        }
    }

    /// Publish a pass's diagnostics and send the edits it cleared.
    async fn deliver(&self, uri: Url, version: Option<i32>, report: PassReport) {
        self.client
            .publish_diagnostics(uri.clone(), report.diagnostics, version)
            .await;

        if !report.edits.is_empty() {
            log::trace!("Sending {} namespace edits to {}", report.edits.len(), uri);
            self.client
                .send_notification::<InsertNamespaces>(InsertNamespacesParams {
                    uri,
                    edits: report.edits,
                })
                .await;
        }
    }

    async fn show_warnings(&self, warnings: Vec<String>) {
        for warning in warnings {
            self.client.show_message(MessageType::WARNING, warning).await;
        }
    }

    /// Apply a settings payload and revalidate all open documents.
    ///
    /// Returns the warnings produced while loading namespace tables; the
    /// caller decides when they can be shown.
    async fn apply_settings(&self, settings: &serde_json::Value) -> Vec<String> {
        let Some(parsed) = parse_settings(settings) else {
            log::warn!("Failed to parse settings, keeping the current configuration");
            return Vec::new();
        };

        let (warnings, reports) = {
            let mut state = self.state.write().await;
            let warnings = state.apply_settings(parsed);
            let reports: Vec<_> = state
                .revalidate_all()
                .into_iter()
                .map(|(uri, report)| {
                    let version = state.documents.get(&uri).and_then(|d| d.version);
                    (uri, version, report)
                })
                .collect();
            (warnings, reports)
        };

        for (uri, version, report) in reports {
            self.deliver(uri, version, report).await;
        }
        warnings
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        log::info!("Initializing {}", SERVER_NAME);

        if let Some(options) = params.initialization_options {
            // The client drops messages sent before `initialized`
            let warnings = self.apply_settings(&options).await;
            self.state.write().await.startup_warnings.extend(warnings);
        }

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::INCREMENTAL,
                )),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(
                        TRIGGER_CHARACTERS.iter().map(|c| c.to_string()).collect(),
                    ),
                    ..Default::default()
                }),
                code_action_provider: Some(CodeActionProviderCapability::Options(
                    CodeActionOptions {
                        code_action_kinds: Some(vec![CodeActionKind::QUICKFIX]),
                        ..Default::default()
                    },
                )),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: String::from(SERVER_NAME),
                version: Some(String::from(env!("CARGO_PKG_VERSION"))),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        let warnings = {
            let mut state = self.state.write().await;
            log::info!(
                "{} initialized with {} known namespaces",
                SERVER_NAME,
                state.namespaces.known.len()
            );
            std::mem::take(&mut state.startup_warnings)
        };
        self.show_warnings(warnings).await;
    }

    async fn shutdown(&self) -> Result<()> {
        log::info!("{} shutting down", SERVER_NAME);
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        let version = params.text_document.version;

        let report = {
            let mut state = self.state.write().await;
            state.open_document(uri.clone(), &params.text_document.text, Some(version))
        };

        if let Some(report) = report {
            self.deliver(uri, Some(version), report).await;
        }
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let version = params.text_document.version;

        let report = {
            let mut state = self.state.write().await;
            state.change_document(&uri, params.content_changes, Some(version))
        };

        if let Some(report) = report {
            self.deliver(uri, Some(version), report).await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        {
            let mut state = self.state.write().await;
            state.close_document(&uri);
        }
        self.client.publish_diagnostics(uri, Vec::new(), None).await;
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        log::trace!("Configuration changed, reloading namespaces and revalidating");
        let warnings = self.apply_settings(&params.settings).await;
        self.show_warnings(warnings).await;
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let mut state = self.state.write().await;
        Ok(handlers::completion(
            &mut state,
            &params.text_document_position.text_document.uri,
            params.text_document_position.position,
        ))
    }

    async fn code_action(&self, params: CodeActionParams) -> Result<Option<CodeActionResponse>> {
        let state = self.state.read().await;
        let actions = handlers::code_actions(
            &state,
            &params.text_document.uri,
            &params.context.diagnostics,
        );
        Ok(Some(actions))
    }
}

pub async fn start_lsp() -> anyhow::Result<()> {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::build(Backend::new).finish();
    // One message at a time: a pass always completes before the next
    // request observes the index.
    Server::new(stdin, stdout, socket)
        .concurrency_level(1)
        .serve(service)
        .await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_initialize_advertises_capabilities() {
        let (service, _socket) = LspService::new(Backend::new);
        let result = service
            .inner()
            .initialize(InitializeParams::default())
            .await
            .unwrap();

        let completion = result.capabilities.completion_provider.unwrap();
        assert_eq!(
            completion.trigger_characters,
            Some(vec!["<".to_string(), "?".to_string(), ":".to_string()])
        );
        assert!(result.capabilities.code_action_provider.is_some());
        assert_eq!(result.server_info.unwrap().name, SERVER_NAME);
    }

    #[tokio::test]
    async fn test_initialize_holds_back_configuration_warnings() {
        let (service, _socket) = LspService::new(Backend::new);
        let backend = service.inner();
        let params = InitializeParams {
            initialization_options: Some(json!({
                "n3LspServer": { "namespaceFile": "/nonexistent/namespaces.json" }
            })),
            ..Default::default()
        };
        backend.initialize(params).await.unwrap();

        let state = backend.state.read().await;
        assert_eq!(state.startup_warnings.len(), 1);
        assert!(state.namespaces.known.is_empty());
    }
}
