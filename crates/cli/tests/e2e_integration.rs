//! End-to-end integration tests for Papertrail.
//!
//! These tests exercise the full path from discovery through persistence to
//! synthesis, using real stores and a scripted model provider.

use std::sync::{Arc, Mutex};

use papertrail_config::AppConfig;
use papertrail_core::error::{DiscoveryError, ProviderError};
use papertrail_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use papertrail_core::{DiscoverySource, PaperRecord, PaperStore};
use papertrail_discovery::SearchService;
use papertrail_store::{FileStore, InMemoryStore};
use papertrail_synthesis::{
    GenerationInvoker, GenerationSettings, SynthesisPipeline, SynthesisStatus, TaskRequest,
};

// ── Mock Provider ────────────────────────────────────────────────────────

/// A mock provider that returns one scripted reply and records every prompt.
struct ScriptedProvider {
    reply: Result<String, ProviderError>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    fn text(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            reply: Err(ProviderError::Network("connection refused".into())),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        self.reply.clone().map(|text| ProviderResponse {
            text,
            model: request.model,
            usage: Some(Usage {
                prompt_tokens: 100,
                completion_tokens: 20,
                total_tokens: 120,
            }),
        })
    }
}

// ── Mock Discovery ───────────────────────────────────────────────────────

struct FixtureSource;

#[async_trait::async_trait]
impl DiscoverySource for FixtureSource {
    fn name(&self) -> &str {
        "fixture"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<PaperRecord>, DiscoveryError> {
        let papers = vec![
            PaperRecord::new(
                "Quantum Error Correction at Scale",
                vec!["Alice Doe".into(), "Bob Roe".into()],
                "x".repeat(900),
                "2025-03-01T12:00:00",
            )
            .with_url("http://arxiv.org/pdf/2503.00001v1"),
            PaperRecord::new(
                "Variational Quantum Eigensolvers",
                vec!["Carol Poe".into()],
                "Short abstract.",
                "2024-07-15T08:30:00",
            ),
            PaperRecord::new("Early Qubits", vec!["Dan Moe".into()], "Old.", "1999-01-01T00:00:00"),
        ];
        Ok(papers
            .into_iter()
            .take(max_results)
            .map(|p| p.with_topic(query))
            .collect())
    }
}

fn pipeline(store: Arc<dyn PaperStore>, provider: Arc<dyn Provider>) -> SynthesisPipeline {
    let config = AppConfig::default();
    let invoker = GenerationInvoker::new(provider, GenerationSettings::from_config(&config));
    SynthesisPipeline::new(store, invoker, config.synthesis).with_current_year(2025)
}

// ── Discovery → Store → Review ───────────────────────────────────────────

#[tokio::test]
async fn e2e_search_then_review_from_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("papers.jsonl");
    let store: Arc<dyn PaperStore> = Arc::new(FileStore::new(path.clone()));

    let search = SearchService::new(Arc::new(FixtureSource), store.clone(), 10);
    let discovery = search.search("quantum computing", 2020, 2025).await.unwrap();
    assert_eq!(discovery.papers.len(), 2);
    let report = discovery.persist.wait().await;
    assert_eq!(report.stored, 2);

    // A fresh handle on the same file sees the persisted papers.
    let reopened: Arc<dyn PaperStore> = Arc::new(FileStore::new(path));
    assert_eq!(reopened.count().await.unwrap(), 2);

    let provider = Arc::new(ScriptedProvider::text("Quantum hardware matured quickly."));
    let result = pipeline(reopened, provider.clone())
        .generate_review("quantum computing")
        .await
        .unwrap();

    assert_eq!(result.status, SynthesisStatus::Generated);
    assert_eq!(result.text, "Quantum hardware matured quickly.");
    assert_eq!(result.papers_used, 2);

    let prompt = &provider.prompts()[0];
    assert!(prompt.contains("Title: Quantum Error Correction at Scale"));
    assert!(prompt.contains("Title: Variational Quantum Eigensolvers"));
    assert!(!prompt.contains("Early Qubits"));
    // Abstracts are cut to the review budget.
    assert!(prompt.contains(&format!("{}...", "x".repeat(200))));
    assert!(!prompt.contains(&"x".repeat(201)));
}

// ── Q&A with citations ───────────────────────────────────────────────────

#[tokio::test]
async fn e2e_question_answer_cites_mentioned_papers() {
    let store = Arc::new(InMemoryStore::new());
    let search = SearchService::new(Arc::new(FixtureSource), store.clone(), 10);
    search
        .search("quantum computing", 2020, 2025)
        .await
        .unwrap()
        .persist
        .wait()
        .await;

    let provider = Arc::new(ScriptedProvider::text(
        "According to Variational Quantum Eigensolvers, hybrid loops help.",
    ));
    let result = pipeline(store, provider)
        .run(TaskRequest::Question {
            question: "What helps near-term devices?".into(),
            candidate_titles: vec![
                "Variational Quantum Eigensolvers".into(),
                "Quantum Error Correction at Scale".into(),
            ],
        })
        .await
        .unwrap();

    assert_eq!(result.papers_used, 2);
    assert_eq!(
        result.text,
        "According to Variational Quantum Eigensolvers, hybrid loops help.\n\n\
         References:\n[Variational Quantum Eigensolvers] - Carol Poe (2024)"
    );
}

// ── Fail-soft generation ─────────────────────────────────────────────────

#[tokio::test]
async fn e2e_provider_outage_yields_empty_text() {
    let store = Arc::new(InMemoryStore::with_records(vec![
        PaperRecord::new("Stored Paper", vec!["Eve".into()], "abc", "2024-01-01").with_topic("agents"),
    ]));
    let result = pipeline(store, Arc::new(ScriptedProvider::failing()))
        .suggest_future_work("agents")
        .await
        .unwrap();

    assert_eq!(result.status, SynthesisStatus::GenerationFailed);
    assert_eq!(result.text, "");
}

// ── Gateway ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_gateway_search_then_review() {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use papertrail_gateway::{AppState, build_router};
    use tower::ServiceExt;

    let config = AppConfig::default();
    let mut state = AppState::from_parts(
        &config,
        Arc::new(InMemoryStore::new()),
        Arc::new(ScriptedProvider::text("A review.")),
        Arc::new(FixtureSource),
    );
    state.pipeline = state.pipeline.with_current_year(2025);
    let app = build_router(Arc::new(state), 60);

    let search = Request::builder()
        .method("POST")
        .uri("/search_papers")
        .header("Content-Type", "application/json")
        .body(Body::from(r#"{"topic":"quantum computing"}"#))
        .unwrap();
    let response = app.clone().oneshot(search).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["papers"].as_array().unwrap().len(), 2);
    assert!(json["papers"][0]["abstract"].is_string());

    let review = Request::builder()
        .method("POST")
        .uri("/generate_review")
        .header("Content-Type", "application/json")
        .body(Body::from(r#"{"topic":"quantum computing"}"#))
        .unwrap();
    let response = app.oneshot(review).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["review"], "A review.");
    assert_eq!(json["status"], "generated");
    assert_eq!(json["papers_used"], 2);
}

// ── Config ───────────────────────────────────────────────────────────────

#[test]
fn e2e_config_defaults_and_validation() {
    let config = AppConfig::default();
    assert_eq!(config.default_provider, "ollama");
    assert_eq!(config.default_model, "mistral:latest");
    assert_eq!(config.synthesis.review_max_papers, 2);
    assert_eq!(config.synthesis.qa_max_papers, 3);
    assert_eq!(config.synthesis.future_work_max_papers, 2);
    assert!(config.validate().is_ok());

    let parsed: AppConfig = toml::from_str(&AppConfig::default_toml()).unwrap();
    assert_eq!(parsed.gateway.port, config.gateway.port);
}
