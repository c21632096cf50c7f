//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use agriqa_core::{ConversationRouter, QaOrchestrator, ReputationAggregator};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
///
/// The orchestrator, router and aggregator all sit over the same `QaStore`,
/// so handlers compose freely without extra wiring.
#[derive(Clone)]
pub struct AppState {
    pub qa: QaOrchestrator,
    pub conversations: ConversationRouter,
    pub reputation: ReputationAggregator,
    pub config: Arc<Config>,
}
