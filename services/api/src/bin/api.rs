//! services/api/src/bin/api.rs

use agriqa_core::{
    ports::{AnswerGenerator, QaStore},
    ConversationRouter, QaOrchestrator, ReputationAggregator,
};
use api_lib::{
    adapters::{db::PgQaStore, DisabledAnswerAdapter, OpenAiAnswerAdapter},
    config::Config,
    error::ApiError,
    web::{rest, rest::ApiDoc, state::AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::{delete, get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let store = Arc::new(PgQaStore::new(db_pool));
    info!("Running database migrations...");
    store.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize the Answer Oracle ---
    // Without an API key the oracle declines every question and they stay
    // open for human experts; the rest of the service is unaffected.
    let generator: Arc<dyn AnswerGenerator> = match &config.openai_api_key {
        Some(api_key) => {
            let openai_config = OpenAIConfig::new().with_api_key(api_key);
            let openai_client = Client::with_config(openai_config);
            Arc::new(OpenAiAnswerAdapter::new(
                openai_client,
                config.ai_model.clone(),
            ))
        }
        None => {
            info!("OPENAI_API_KEY not set; AI answer oracle disabled");
            Arc::new(DisabledAnswerAdapter)
        }
    };

    // --- 4. Build the Shared AppState ---
    let qa_store: Arc<dyn QaStore> = store;
    let app_state = Arc::new(AppState {
        qa: QaOrchestrator::new(qa_store.clone(), generator),
        conversations: ConversationRouter::new(qa_store.clone()),
        reputation: ReputationAggregator::with_threshold(
            qa_store,
            config.certificate_threshold,
        ),
        config: config.clone(),
    });

    // --- 5. Create the Web Router ---
    let cors_origin = config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::Internal(format!("Invalid CORS_ORIGIN: {e}")))?;
    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    let api_router = Router::new()
        .route(
            "/questions",
            post(rest::ask_question_handler).get(rest::list_questions_handler),
        )
        .route(
            "/questions/{question_id}",
            get(rest::get_question_handler).delete(rest::delete_question_handler),
        )
        .route("/farmers/{farmer_id}/questions", get(rest::list_farmer_questions_handler))
        .route("/questions/{question_id}/ai-answer", post(rest::request_ai_answer_handler))
        .route(
            "/questions/{question_id}/answers",
            post(rest::submit_answer_handler).get(rest::list_answers_handler),
        )
        .route(
            "/questions/{question_id}/answers/{expert_id}/exists",
            get(rest::has_answered_handler),
        )
        .route(
            "/answers/{answer_id}/replies",
            post(rest::submit_reply_handler).get(rest::list_replies_handler),
        )
        .route("/replies/{reply_id}/decision", post(rest::resolve_reply_handler))
        .route("/answers/{answer_id}/ratings", post(rest::rate_answer_handler))
        .route("/experts/{expert_id}/reputation", get(rest::reputation_handler))
        .route("/messages", post(rest::send_message_handler))
        .route("/conversations", get(rest::list_conversations_handler))
        .route(
            "/conversations/{conversation_key}",
            delete(rest::delete_conversation_handler),
        )
        .route(
            "/conversations/{conversation_key}/messages",
            get(rest::conversation_messages_handler),
        )
        .route(
            "/conversations/{conversation_key}/read",
            post(rest::mark_read_handler),
        )
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
