//! crates/agriqa_core/src/conversation.rs
//!
//! The conversation identity deriver: pure functions mapping a set of
//! participants (and optionally a specific answer) to a canonical string key.
//! Equal inputs always produce the identical key, so any party can re-derive
//! the key for a lookup without knowing who the "current" caller is.

use std::fmt;

/// The canonical identity of a conversation. Never stored on its own;
/// recomputed deterministically from its defining tuple every time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationKey(String);

/// The parsed form of a conversation key, used by the router when scanning
/// a mixed set of messages for the conversations an actor participates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationShape {
    /// General farmer-to-expert thread.
    FarmerExpert { farmer_id: i64, expert_id: i64 },
    /// Farmer-to-expert thread scoped to one specific answer, so that
    /// multiple experts answering the same question never collide into a
    /// single thread.
    FarmerAnswer { farmer_id: i64, answer_id: i64 },
    /// Expert-to-expert thread; `low` < `high` after canonicalization.
    ExpertPair { low: i64, high: i64 },
}

impl ConversationKey {
    /// Key for a general farmer-to-expert conversation. Asymmetric: the two
    /// ids play distinct roles and are never swapped.
    pub fn farmer_expert(farmer_id: i64, expert_id: i64) -> Self {
        ConversationKey(format!("farmer_{farmer_id}_expert_{expert_id}"))
    }

    /// Key for a farmer-to-expert conversation about one specific answer.
    /// This is the dominant addressing mode for farmer-initiated replies to
    /// an expert's answer.
    pub fn farmer_answer(farmer_id: i64, answer_id: i64) -> Self {
        ConversationKey(format!("farmer_{farmer_id}_answer_{answer_id}"))
    }

    /// Key for an expert-to-expert conversation. Symmetric: either party may
    /// initiate the chat, so the numerically smaller id always comes first.
    pub fn expert_pair(expert_a: i64, expert_b: i64) -> Self {
        let (low, high) = if expert_a <= expert_b {
            (expert_a, expert_b)
        } else {
            (expert_b, expert_a)
        };
        ConversationKey(format!("expert_{low}_expert_{high}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reconstructs a key from its stored string form. Fails when the string
    /// does not match any of the three key shapes.
    pub fn parse(raw: &str) -> Option<Self> {
        shape_of(raw).map(|_| ConversationKey(raw.to_string()))
    }

    /// The parsed shape of this key.
    pub fn shape(&self) -> ConversationShape {
        // Constructors and `parse` only ever produce well-formed keys.
        shape_of(&self.0).expect("conversation key is well-formed by construction")
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn shape_of(raw: &str) -> Option<ConversationShape> {
    if let Some(rest) = raw.strip_prefix("farmer_") {
        if let Some((farmer, expert)) = split_once_id(rest, "_expert_") {
            return Some(ConversationShape::FarmerExpert {
                farmer_id: farmer,
                expert_id: expert,
            });
        }
        if let Some((farmer, answer)) = split_once_id(rest, "_answer_") {
            return Some(ConversationShape::FarmerAnswer {
                farmer_id: farmer,
                answer_id: answer,
            });
        }
        return None;
    }
    if let Some(rest) = raw.strip_prefix("expert_") {
        if let Some((low, high)) = split_once_id(rest, "_expert_") {
            return Some(ConversationShape::ExpertPair { low, high });
        }
    }
    None
}

fn split_once_id(rest: &str, separator: &str) -> Option<(i64, i64)> {
    let (first, second) = rest.split_once(separator)?;
    Some((first.parse().ok()?, second.parse().ok()?))
}
