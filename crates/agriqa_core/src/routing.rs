//! crates/agriqa_core/src/routing.rs
//!
//! The conversation router: resolves which conversation a new message
//! belongs to using the identity deriver, and enforces read/unread and
//! deletion semantics. Answer references are validated against the answer
//! store before an answer-scoped key is derived.

use std::sync::Arc;

use tracing::{info, warn};

use crate::conversation::{ConversationKey, ConversationShape};
use crate::domain::{Actor, Message, NewMessage, SenderKind};
use crate::ports::{QaError, QaResult, QaStore};

#[derive(Clone)]
pub struct ConversationRouter {
    store: Arc<dyn QaStore>,
}

impl ConversationRouter {
    pub fn new(store: Arc<dyn QaStore>) -> Self {
        Self { store }
    }

    /// Appends a message to the conversation derived from sender and
    /// recipient. When an answer id is supplied for a farmer-expert pair the
    /// answer-scoped key takes priority over the general one, so each
    /// expert's answer keeps its own thread. The message starts unread for
    /// the other participant.
    pub async fn route_message(
        &self,
        sender: Actor,
        sender_name: &str,
        recipient: Actor,
        question_id: Option<i64>,
        answer_id: Option<i64>,
        body: &str,
    ) -> QaResult<Message> {
        // Reject dangling answer references up front rather than storing
        // them as context on an orphaned thread.
        if let Some(answer) = answer_id {
            self.store.answer_by_id(answer).await?;
        }

        let (key, farmer_id, expert_id) = match (sender, recipient) {
            (Actor::Farmer(farmer), Actor::Expert(expert))
            | (Actor::Expert(expert), Actor::Farmer(farmer)) => {
                let key = match answer_id {
                    Some(answer) => ConversationKey::farmer_answer(farmer, answer),
                    None => ConversationKey::farmer_expert(farmer, expert),
                };
                (key, Some(farmer), expert)
            }
            (Actor::Expert(sender_id), Actor::Expert(peer_id)) => (
                ConversationKey::expert_pair(sender_id, peer_id),
                None,
                sender_id,
            ),
            (Actor::Farmer(_), Actor::Farmer(_)) => {
                return Err(QaError::NotAuthorized(
                    "farmer-to-farmer conversations are not supported".to_string(),
                ))
            }
        };

        let message = self
            .store
            .append_message(NewMessage {
                conversation_key: key.as_str().to_string(),
                farmer_id,
                expert_id,
                question_id,
                answer_id,
                sender_kind: sender.kind(),
                sender_name: sender_name.to_string(),
                body: body.to_string(),
            })
            .await?;
        info!(
            conversation = key.as_str(),
            message_id = message.id,
            sender = sender.kind().as_str(),
            "message routed"
        );
        Ok(message)
    }

    /// One preview row per distinct conversation the actor participates in,
    /// newest conversation first. For experts this spans both farmer-expert
    /// and expert-expert shapes.
    pub async fn list_conversations(&self, actor: Actor) -> QaResult<Vec<Message>> {
        let previews = self.store.conversation_previews().await?;
        let mut mine: Vec<Message> = previews
            .into_iter()
            .filter(|preview| self.participates(actor, preview))
            .collect();
        mine.sort_by_key(|m| std::cmp::Reverse((m.sent_at, m.id)));
        Ok(mine)
    }

    /// Every message in one conversation, sent timestamp ascending with ties
    /// broken by insertion order.
    pub async fn conversation_messages(&self, key: &ConversationKey) -> QaResult<Vec<Message>> {
        self.store.conversation_messages(key.as_str()).await
    }

    /// Marks the messages the reader has now seen, i.e. the ones authored by
    /// the *other* kind. A reader's own sent messages are never touched.
    pub async fn mark_read(&self, key: &ConversationKey, reader: SenderKind) -> QaResult<()> {
        self.store
            .mark_conversation_read(key.as_str(), reader.other())
            .await
    }

    /// Removes the conversation and every message in it. Irreversible.
    pub async fn delete_conversation(&self, key: &ConversationKey) -> QaResult<()> {
        self.store.delete_conversation(key.as_str()).await?;
        info!(conversation = key.as_str(), "conversation deleted");
        Ok(())
    }

    fn participates(&self, actor: Actor, message: &Message) -> bool {
        let Some(key) = ConversationKey::parse(&message.conversation_key) else {
            warn!(
                conversation = message.conversation_key.as_str(),
                "skipping message with malformed conversation key"
            );
            return false;
        };
        match (actor, key.shape()) {
            (Actor::Farmer(id), ConversationShape::FarmerExpert { farmer_id, .. }) => {
                id == farmer_id
            }
            (Actor::Farmer(id), ConversationShape::FarmerAnswer { farmer_id, .. }) => {
                id == farmer_id
            }
            (Actor::Expert(id), ConversationShape::ExpertPair { low, high }) => {
                id == low || id == high
            }
            (Actor::Expert(id), ConversationShape::FarmerExpert { expert_id, .. }) => {
                id == expert_id
            }
            // Answer-scoped keys name only the farmer; the expert side is
            // carried on the message row itself.
            (Actor::Expert(id), ConversationShape::FarmerAnswer { .. }) => id == message.expert_id,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;

    async fn router_with_answer() -> (ConversationRouter, Arc<InMemoryStore>, i64) {
        let store = Arc::new(InMemoryStore::new());
        let question = store
            .create_question(3, "Asha", "pests", "Whitefly on brinjal?")
            .await
            .unwrap();
        let answer = store
            .insert_original_answer(question.id, 7, "Dr. Rao", "Yellow sticky traps.")
            .await
            .unwrap();
        (ConversationRouter::new(store.clone()), store, answer.id)
    }

    #[tokio::test]
    async fn answer_scoped_key_takes_priority_over_general() {
        let (router, _, answer_id) = router_with_answer().await;
        let scoped = router
            .route_message(Actor::Farmer(3), "Asha", Actor::Expert(7), None, Some(answer_id), "Will traps be enough?")
            .await
            .unwrap();
        let general = router
            .route_message(Actor::Farmer(3), "Asha", Actor::Expert(7), None, None, "Hello doctor")
            .await
            .unwrap();

        assert_eq!(scoped.conversation_key, format!("farmer_3_answer_{answer_id}"));
        assert_eq!(general.conversation_key, "farmer_3_expert_7");
        assert_ne!(scoped.conversation_key, general.conversation_key);
    }

    #[tokio::test]
    async fn dangling_answer_reference_is_rejected() {
        let (router, _, _) = router_with_answer().await;
        let err = router
            .route_message(Actor::Farmer(3), "Asha", Actor::Expert(7), None, Some(999), "?")
            .await
            .unwrap_err();
        assert!(matches!(err, QaError::NotFound(_)));
    }

    #[tokio::test]
    async fn expert_chat_validates_answer_references_too() {
        let (router, _, answer_id) = router_with_answer().await;
        let err = router
            .route_message(Actor::Expert(7), "Dr. Rao", Actor::Expert(12), None, Some(999), "?")
            .await
            .unwrap_err();
        assert!(matches!(err, QaError::NotFound(_)));

        // A real answer reference is kept as context; the key stays the
        // plain expert pair.
        let message = router
            .route_message(
                Actor::Expert(7),
                "Dr. Rao",
                Actor::Expert(12),
                None,
                Some(answer_id),
                "What do you make of my answer here?",
            )
            .await
            .unwrap();
        assert_eq!(message.conversation_key, "expert_7_expert_12");
        assert_eq!(message.answer_id, Some(answer_id));
    }

    #[tokio::test]
    async fn expert_chat_lands_in_one_conversation_from_either_side() {
        let (router, _, _) = router_with_answer().await;
        let from_high = router
            .route_message(Actor::Expert(12), "Dr. Iyer", Actor::Expert(5), None, None, "Seen this blight before?")
            .await
            .unwrap();
        let from_low = router
            .route_message(Actor::Expert(5), "Dr. Rao", Actor::Expert(12), None, None, "Yes, last monsoon.")
            .await
            .unwrap();

        assert_eq!(from_high.conversation_key, "expert_5_expert_12");
        assert_eq!(from_low.conversation_key, "expert_5_expert_12");

        let key = ConversationKey::expert_pair(12, 5);
        let messages = router.conversation_messages(&key).await.unwrap();
        assert_eq!(messages.len(), 2);
    }

    #[tokio::test]
    async fn messages_keep_insertion_order_within_a_conversation() {
        let (router, _, _) = router_with_answer().await;
        for body in ["one", "two", "three"] {
            router
                .route_message(Actor::Farmer(3), "Asha", Actor::Expert(7), None, None, body)
                .await
                .unwrap();
        }
        let key = ConversationKey::farmer_expert(3, 7);
        let messages = router.conversation_messages(&key).await.unwrap();
        let bodies: Vec<&str> = messages.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, ["one", "two", "three"]);
        let mut ids: Vec<i64> = messages.iter().map(|m| m.id).collect();
        let sorted = ids.clone();
        ids.sort_unstable();
        assert_eq!(ids, sorted);
    }

    #[tokio::test]
    async fn preview_list_spans_both_shapes_for_an_expert() {
        let (router, _, answer_id) = router_with_answer().await;
        router
            .route_message(Actor::Farmer(3), "Asha", Actor::Expert(7), None, Some(answer_id), "About your answer…")
            .await
            .unwrap();
        router
            .route_message(Actor::Expert(7), "Dr. Rao", Actor::Expert(12), None, None, "Second opinion?")
            .await
            .unwrap();
        router
            .route_message(Actor::Farmer(4), "Binod", Actor::Expert(9), None, None, "Different expert entirely")
            .await
            .unwrap();

        let previews = router.list_conversations(Actor::Expert(7)).await.unwrap();
        let keys: Vec<&str> = previews.iter().map(|m| m.conversation_key.as_str()).collect();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&"expert_7_expert_12"));
        assert!(keys.contains(&format!("farmer_3_answer_{answer_id}").as_str()));

        let farmer_previews = router.list_conversations(Actor::Farmer(4)).await.unwrap();
        assert_eq!(farmer_previews.len(), 1);
        assert_eq!(farmer_previews[0].conversation_key, "farmer_4_expert_9");
    }

    #[tokio::test]
    async fn preview_shows_only_the_latest_message() {
        let (router, _, _) = router_with_answer().await;
        for body in ["first", "second", "latest"] {
            router
                .route_message(Actor::Farmer(3), "Asha", Actor::Expert(7), None, None, body)
                .await
                .unwrap();
        }
        let previews = router.list_conversations(Actor::Farmer(3)).await.unwrap();
        assert_eq!(previews.len(), 1);
        assert_eq!(previews[0].body, "latest");
    }

    #[tokio::test]
    async fn mark_read_flips_only_the_other_sides_messages() {
        let (router, _, _) = router_with_answer().await;
        router
            .route_message(Actor::Farmer(3), "Asha", Actor::Expert(7), None, None, "Question")
            .await
            .unwrap();
        router
            .route_message(Actor::Expert(7), "Dr. Rao", Actor::Farmer(3), None, None, "Reply")
            .await
            .unwrap();

        let key = ConversationKey::farmer_expert(3, 7);
        router.mark_read(&key, SenderKind::Farmer).await.unwrap();

        let messages = router.conversation_messages(&key).await.unwrap();
        let farmer_msg = messages.iter().find(|m| m.sender_kind == SenderKind::Farmer).unwrap();
        let expert_msg = messages.iter().find(|m| m.sender_kind == SenderKind::Expert).unwrap();
        // The farmer read the expert's reply; the farmer's own message stays
        // unread until the expert opens the thread.
        assert!(expert_msg.read);
        assert!(!farmer_msg.read);
    }

    #[tokio::test]
    async fn mark_read_leaves_expert_pair_threads_untouched() {
        let (router, _, _) = router_with_answer().await;
        router
            .route_message(Actor::Expert(5), "Dr. Rao", Actor::Expert(12), None, None, "Ping")
            .await
            .unwrap();
        router
            .route_message(Actor::Expert(12), "Dr. Iyer", Actor::Expert(5), None, None, "Pong")
            .await
            .unwrap();

        // Both sides are experts, so "the other kind's messages" is an
        // empty set; read state only tracks the farmer/expert divide.
        let key = ConversationKey::expert_pair(5, 12);
        router.mark_read(&key, SenderKind::Expert).await.unwrap();
        let messages = router.conversation_messages(&key).await.unwrap();
        assert!(messages.iter().all(|m| !m.read));
    }

    #[tokio::test]
    async fn deleting_a_conversation_removes_every_message() {
        let (router, _, _) = router_with_answer().await;
        router
            .route_message(Actor::Farmer(3), "Asha", Actor::Expert(7), None, None, "Question")
            .await
            .unwrap();
        router
            .route_message(Actor::Expert(7), "Dr. Rao", Actor::Farmer(3), None, None, "Reply")
            .await
            .unwrap();

        let key = ConversationKey::farmer_expert(3, 7);
        router.delete_conversation(&key).await.unwrap();
        assert!(router.conversation_messages(&key).await.unwrap().is_empty());
        assert!(router.list_conversations(Actor::Farmer(3)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn farmer_to_farmer_routing_is_refused() {
        let (router, _, _) = router_with_answer().await;
        let err = router
            .route_message(Actor::Farmer(3), "Asha", Actor::Farmer(4), None, None, "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, QaError::NotAuthorized(_)));
    }
}
