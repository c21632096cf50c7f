//! crates/agriqa_core/src/reputation.rs
//!
//! The reputation aggregator: computes an expert's average rating and
//! certificate eligibility. Pull-based on purpose: nothing is cached or
//! incrementally maintained, every call recomputes from the store. Rating
//! volumes per expert are small and the read rate is a dashboard visit, so
//! the O(n) scan is acceptable.

use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::Rating;
use crate::ports::{QaResult, QaStore};

/// Default minimum average score for the one-time achievement certificate.
pub const DEFAULT_CERTIFICATE_THRESHOLD: f64 = 4.8;

#[derive(Clone)]
pub struct ReputationAggregator {
    store: Arc<dyn QaStore>,
    certificate_threshold: f64,
}

/// A snapshot of one expert's standing, assembled for dashboard display.
#[derive(Debug, Clone)]
pub struct ReputationSummary {
    pub expert_id: i64,
    pub average_rating: Option<f64>,
    pub rating_count: u64,
    pub rated_answer_count: u64,
    pub answer_count: u64,
    pub accepted_reply_count: u64,
    pub certificate_eligible: bool,
}

impl ReputationAggregator {
    pub fn new(store: Arc<dyn QaStore>) -> Self {
        Self::with_threshold(store, DEFAULT_CERTIFICATE_THRESHOLD)
    }

    pub fn with_threshold(store: Arc<dyn QaStore>, certificate_threshold: f64) -> Self {
        Self {
            store,
            certificate_threshold,
        }
    }

    /// Arithmetic mean of every rating score for the expert, or `None` when
    /// no ratings exist. A real average can never be 0.0 because scores are
    /// 1..=5, so the two cases stay distinguishable.
    pub async fn average_rating(&self, expert_id: i64) -> QaResult<Option<f64>> {
        let ratings = self.store.ratings_for_expert(expert_id).await?;
        if ratings.is_empty() {
            return Ok(None);
        }
        let total: i64 = ratings.iter().map(|r| i64::from(r.score)).sum();
        Ok(Some(total as f64 / ratings.len() as f64))
    }

    pub async fn rating_count(&self, expert_id: i64) -> QaResult<u64> {
        Ok(self.store.ratings_for_expert(expert_id).await?.len() as u64)
    }

    /// Distinct answers by the expert that received at least one rating. An
    /// answer rated by two farmers counts once here.
    pub async fn rated_answer_count(&self, expert_id: i64) -> QaResult<u64> {
        let ratings = self.store.ratings_for_expert(expert_id).await?;
        let distinct: HashSet<i64> = ratings.iter().map(|r| r.answer_id).collect();
        Ok(distinct.len() as u64)
    }

    /// True iff the expert's average rating meets the certificate threshold
    /// and at least one rating exists.
    pub async fn is_certificate_eligible(&self, expert_id: i64) -> QaResult<bool> {
        match self.average_rating(expert_id).await? {
            Some(average) => Ok(average >= self.certificate_threshold),
            None => Ok(false),
        }
    }

    /// The rating shown on a generated certificate: the highest score, ties
    /// broken by the most recent. Supplementary display data only; plays no
    /// part in eligibility.
    pub async fn best_rating_for_certificate(&self, expert_id: i64) -> QaResult<Option<Rating>> {
        let ratings = self.store.ratings_for_expert(expert_id).await?;
        Ok(ratings
            .into_iter()
            .max_by_key(|r| (r.score, r.created_at, r.id)))
    }

    /// Assembles the full dashboard snapshot in one place.
    pub async fn summary(&self, expert_id: i64) -> QaResult<ReputationSummary> {
        let ratings = self.store.ratings_for_expert(expert_id).await?;
        let rating_count = ratings.len() as u64;
        let average_rating = if ratings.is_empty() {
            None
        } else {
            let total: i64 = ratings.iter().map(|r| i64::from(r.score)).sum();
            Some(total as f64 / ratings.len() as f64)
        };
        let rated_answer_count = ratings
            .iter()
            .map(|r| r.answer_id)
            .collect::<HashSet<i64>>()
            .len() as u64;
        let certificate_eligible = rating_count > 0
            && average_rating.is_some_and(|avg| avg >= self.certificate_threshold);

        Ok(ReputationSummary {
            expert_id,
            average_rating,
            rating_count,
            rated_answer_count,
            answer_count: self.store.count_original_answers(expert_id).await?,
            accepted_reply_count: self.store.count_accepted_replies(expert_id).await?,
            certificate_eligible,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;

    /// Seeds one question with one answer per expert and applies `scores`
    /// as ratings from distinct farmers against that expert's answer.
    async fn aggregator_with_scores(expert_id: i64, scores: &[i16]) -> ReputationAggregator {
        let store = Arc::new(InMemoryStore::new());
        let question = store
            .create_question(1, "Asha", "pests", "Aphids on okra?")
            .await
            .unwrap();
        let answer = store
            .insert_original_answer(question.id, expert_id, "Dr. Rao", "Spray soap solution.")
            .await
            .unwrap();
        for (i, score) in scores.iter().enumerate() {
            store
                .upsert_rating(100 + i as i64, expert_id, answer.id, *score, None)
                .await
                .unwrap();
        }
        ReputationAggregator::new(store)
    }

    #[tokio::test]
    async fn unrated_expert_has_no_average() {
        let aggregator = aggregator_with_scores(7, &[]).await;
        assert_eq!(aggregator.average_rating(7).await.unwrap(), None);
        assert!(!aggregator.is_certificate_eligible(7).await.unwrap());
    }

    #[tokio::test]
    async fn average_of_four_point_eight_is_eligible() {
        let aggregator = aggregator_with_scores(7, &[5, 5, 5, 5, 4]).await;
        assert_eq!(aggregator.average_rating(7).await.unwrap(), Some(4.8));
        assert!(aggregator.is_certificate_eligible(7).await.unwrap());
    }

    #[tokio::test]
    async fn average_of_four_point_six_is_not_eligible() {
        let aggregator = aggregator_with_scores(7, &[5, 5, 5, 4, 4]).await;
        assert_eq!(aggregator.average_rating(7).await.unwrap(), Some(4.6));
        assert!(!aggregator.is_certificate_eligible(7).await.unwrap());
    }

    #[tokio::test]
    async fn rating_upsert_keeps_one_row_per_farmer_and_answer() {
        let store = Arc::new(InMemoryStore::new());
        let question = store
            .create_question(1, "Asha", "pests", "Aphids on okra?")
            .await
            .unwrap();
        let answer = store
            .insert_original_answer(question.id, 7, "Dr. Rao", "Spray soap solution.")
            .await
            .unwrap();
        store.upsert_rating(3, 7, answer.id, 3, None).await.unwrap();
        store
            .upsert_rating(3, 7, answer.id, 5, Some("worked after all"))
            .await
            .unwrap();

        let aggregator = ReputationAggregator::new(store.clone());
        assert_eq!(aggregator.rating_count(7).await.unwrap(), 1);
        assert_eq!(aggregator.average_rating(7).await.unwrap(), Some(5.0));
        let ratings = store.ratings_for_expert(7).await.unwrap();
        assert_eq!(ratings.len(), 1);
        assert_eq!(ratings[0].score, 5);
        assert_eq!(ratings[0].comment.as_deref(), Some("worked after all"));
    }

    #[tokio::test]
    async fn rated_answer_count_is_distinct_per_answer() {
        let store = Arc::new(InMemoryStore::new());
        let question = store
            .create_question(1, "Asha", "pests", "Aphids on okra?")
            .await
            .unwrap();
        let answer = store
            .insert_original_answer(question.id, 7, "Dr. Rao", "Spray soap solution.")
            .await
            .unwrap();
        store.upsert_rating(3, 7, answer.id, 5, None).await.unwrap();
        store.upsert_rating(4, 7, answer.id, 4, None).await.unwrap();

        let aggregator = ReputationAggregator::new(store);
        assert_eq!(aggregator.rating_count(7).await.unwrap(), 2);
        assert_eq!(aggregator.rated_answer_count(7).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn best_rating_prefers_highest_then_most_recent() {
        let store = Arc::new(InMemoryStore::new());
        let question = store
            .create_question(1, "Asha", "pests", "Aphids on okra?")
            .await
            .unwrap();
        let other_question = store
            .create_question(2, "Binod", "soil", "Low yield this season?")
            .await
            .unwrap();
        let first = store
            .insert_original_answer(question.id, 7, "Dr. Rao", "Soap spray.")
            .await
            .unwrap();
        let second = store
            .insert_original_answer(other_question.id, 7, "Dr. Rao", "Test the soil pH.")
            .await
            .unwrap();
        store.upsert_rating(3, 7, first.id, 5, None).await.unwrap();
        store.upsert_rating(4, 7, second.id, 5, None).await.unwrap();
        store.upsert_rating(5, 7, first.id, 4, None).await.unwrap();

        let aggregator = ReputationAggregator::new(store);
        let best = aggregator
            .best_rating_for_certificate(7)
            .await
            .unwrap()
            .expect("expert has ratings");
        // Two fives: the later one wins the tie.
        assert_eq!(best.score, 5);
        assert_eq!(best.farmer_id, 4);
    }

    #[tokio::test]
    async fn custom_threshold_is_respected() {
        let store = Arc::new(InMemoryStore::new());
        let question = store
            .create_question(1, "Asha", "pests", "Aphids on okra?")
            .await
            .unwrap();
        let answer = store
            .insert_original_answer(question.id, 7, "Dr. Rao", "Soap spray.")
            .await
            .unwrap();
        store.upsert_rating(3, 7, answer.id, 4, None).await.unwrap();

        let strict = ReputationAggregator::with_threshold(store.clone(), 4.5);
        let lenient = ReputationAggregator::with_threshold(store, 4.0);
        assert!(!strict.is_certificate_eligible(7).await.unwrap());
        assert!(lenient.is_certificate_eligible(7).await.unwrap());
    }
}
