//! Naive substring search over conversation messages.
//!
//! No index is involved, even on the durable backend: every candidate
//! conversation is materialized and scanned linearly. A message matches
//! when its content contains the query case-insensitively; its relevance
//! is accumulated over whitespace tokens of the lowercased content:
//!
//! - exact token match scores 10
//! - a token containing the query scores 5
//! - a token contained in the query scores 2
//!
//! Hits are sorted descending by relevance with a stable sort, so ties
//! keep their encounter order.

use crate::core::conversation::Conversation;
use crate::core::ids::{ProjectId, SessionId};
use crate::core::message::Message;

/// One matched message with its relevance score.
#[derive(Clone, Debug)]
pub struct SearchHit {
    /// Session the message belongs to.
    pub session_id: SessionId,
    /// Project the conversation belongs to.
    pub project_id: ProjectId,
    /// The matched message.
    pub message: Message,
    /// Accumulated token-overlap score.
    pub relevance: u32,
}

/// Accumulate the token-overlap score of `content` against `query`.
#[must_use]
pub fn score_content(content: &str, query: &str) -> u32 {
    let needle = query.to_lowercase();
    let haystack = content.to_lowercase();
    let mut score = 0;

    for token in haystack.split_whitespace() {
        if token == needle {
            score += 10;
        } else if token.contains(needle.as_str()) {
            score += 5;
        } else if needle.contains(token) {
            score += 2;
        }
    }

    score
}

/// Scan conversations for messages matching `query`, best hits first.
#[must_use]
pub fn search_messages(conversations: &[Conversation], query: &str) -> Vec<SearchHit> {
    let needle = query.to_lowercase();
    let mut hits = Vec::new();

    for conversation in conversations {
        for message in &conversation.messages {
            if message.content.to_lowercase().contains(needle.as_str()) {
                hits.push(SearchHit {
                    session_id: conversation.session_id,
                    project_id: conversation.project_id,
                    message: message.clone(),
                    relevance: score_content(&message.content, query),
                });
            }
        }
    }

    hits.sort_by(|a, b| b.relevance.cmp(&a.relevance));
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::core::message::MessageDraft;

    fn conversation_with(contents: &[&str]) -> Conversation {
        let mut conversation = Conversation::new(SessionId::new(), ProjectId::new(), Utc::now());
        for content in contents {
            let message = Message::from_draft(
                conversation.session_id,
                MessageDraft::new(*content),
                Utc::now(),
            );
            conversation.messages.push(message);
        }
        conversation
    }

    #[test]
    fn test_exact_token_scores_ten() {
        // "hello" matches exactly, "world" contributes nothing.
        assert_eq!(score_content("hello world", "hello"), 10);
    }

    #[test]
    fn test_containing_token_scores_five() {
        assert_eq!(score_content("hello", "ell"), 5);
    }

    #[test]
    fn test_contained_token_scores_two() {
        assert_eq!(score_content("ell", "hello"), 2);
    }

    #[test]
    fn test_scores_accumulate_across_tokens() {
        // "hello" exact (10) + "hello!" containing (5) + "hell" contained (2).
        assert_eq!(score_content("hello hello! hell", "hello"), 17);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let conversations = vec![conversation_with(&["Hello World"])];
        let hits = search_messages(&conversations, "hello");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].relevance, 10);
    }

    #[test]
    fn test_non_matching_messages_are_skipped() {
        let conversations = vec![conversation_with(&["hello there", "goodbye"])];
        let hits = search_messages(&conversations, "hello");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].message.content, "hello there");
    }

    #[test]
    fn test_hits_sorted_descending_with_stable_ties() {
        let conversations = vec![conversation_with(&[
            "deploy went fine",
            "deploy deploy deploy",
            "we should deploy soon",
        ])];
        let hits = search_messages(&conversations, "deploy");

        assert_eq!(hits[0].message.content, "deploy deploy deploy");
        assert_eq!(hits[0].relevance, 30);
        // Equal scores keep encounter order.
        assert_eq!(hits[1].message.content, "deploy went fine");
        assert_eq!(hits[2].message.content, "we should deploy soon");
    }
}
