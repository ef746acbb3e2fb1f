//! Merging of streamed partial responses into one complete response.

use std::collections::BTreeMap;

use crate::types::{
    Candidate, FinishReason, GenerateContentResponse, Part, PromptFeedback, UsageMetadata,
};

/// Accumulates streamed chunks into a complete response.
///
/// Candidates are keyed by their `index`, not by their position in a chunk, so
/// chunks may carry candidates in any order. Finalization yields them in
/// ascending index order.
#[derive(Debug, Default)]
pub struct ResponseAccumulator {
    candidates: BTreeMap<u32, Candidate>,
    /// Latest usage metadata seen.
    usage_metadata: Option<UsageMetadata>,
    prompt_feedback: Option<PromptFeedback>,
    chunks: usize,
}

impl ResponseAccumulator {
    /// Create a new response accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one chunk into the accumulation.
    pub fn add_chunk(&mut self, chunk: GenerateContentResponse) {
        self.chunks += 1;

        if chunk.usage_metadata.is_some() {
            self.usage_metadata = chunk.usage_metadata;
        }
        if chunk.prompt_feedback.is_some() {
            self.prompt_feedback = chunk.prompt_feedback;
        }

        for candidate in chunk.candidates {
            match self.candidates.get_mut(&candidate.index) {
                Some(existing) => merge_candidate(existing, candidate),
                None => {
                    self.candidates.insert(candidate.index, candidate);
                }
            }
        }
    }

    /// Number of chunks folded in so far.
    pub fn chunk_count(&self) -> usize {
        self.chunks
    }

    /// Text accumulated so far for the candidate at `index`.
    pub fn current_text(&self, index: u32) -> Option<String> {
        self.candidates.get(&index).map(Candidate::text)
    }

    /// Finalize and return the merged response.
    pub fn finalize(self) -> GenerateContentResponse {
        GenerateContentResponse {
            candidates: self.candidates.into_values().collect(),
            usage_metadata: self.usage_metadata,
            prompt_feedback: self.prompt_feedback,
        }
    }
}

fn merge_candidate(existing: &mut Candidate, incoming: Candidate) {
    merge_parts(&mut existing.content.parts, incoming.content.parts);

    if let Some(reason) = incoming.finish_reason {
        if reason != FinishReason::Unspecified || existing.finish_reason.is_none() {
            existing.finish_reason = Some(reason);
        }
    }
    if incoming.finish_message.is_some() {
        existing.finish_message = incoming.finish_message;
    }
    if !incoming.safety_ratings.is_empty() {
        existing.safety_ratings = incoming.safety_ratings;
    }

    // Citations accumulate across chunks without deduplication.
    if let Some(incoming_citations) = incoming.citation_metadata {
        existing
            .citation_metadata
            .get_or_insert_with(Default::default)
            .citation_sources
            .extend(incoming_citations.citation_sources);
    }
}

/// Text parts at the same position concatenate; any other part replaces the
/// existing one wholesale.
fn merge_parts(existing: &mut Vec<Part>, incoming: Vec<Part>) {
    for (position, part) in incoming.into_iter().enumerate() {
        if position >= existing.len() {
            existing.push(part);
            continue;
        }
        match (&mut existing[position], part) {
            (Part::Text { text }, Part::Text { text: delta }) => text.push_str(&delta),
            (slot, part) => *slot = part,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        CitationMetadata, CitationSource, Content, HarmCategory, HarmProbability, Role,
        SafetyRating,
    };

    fn candidate(index: u32, text: &str) -> Candidate {
        Candidate {
            index,
            content: Content::new(Role::Model, vec![Part::text(text)]),
            finish_reason: None,
            finish_message: None,
            safety_ratings: Vec::new(),
            citation_metadata: None,
        }
    }

    fn chunk(candidates: Vec<Candidate>) -> GenerateContentResponse {
        GenerateContentResponse {
            candidates,
            ..Default::default()
        }
    }

    fn citation(uri: &str) -> CitationMetadata {
        CitationMetadata {
            citation_sources: vec![CitationSource {
                start_index: Some(0),
                end_index: Some(4),
                uri: Some(uri.to_string()),
                license: None,
            }],
        }
    }

    #[test]
    fn test_empty_stream_yields_no_candidates() {
        let response = ResponseAccumulator::new().finalize();
        assert!(response.candidates.is_empty());
        assert!(response.usage_metadata.is_none());
    }

    #[test]
    fn test_text_concatenates_in_order() {
        let mut accumulator = ResponseAccumulator::new();
        for delta in ["The", " quick", " brown", " fox"] {
            accumulator.add_chunk(chunk(vec![candidate(0, delta)]));
            assert!(accumulator.current_text(0).unwrap().ends_with(delta));
        }

        let response = accumulator.finalize();
        assert_eq!(response.candidates.len(), 1);
        assert_eq!(response.text().as_deref(), Some("The quick brown fox"));
    }

    #[test]
    fn test_candidates_merge_by_index_not_position() {
        let mut accumulator = ResponseAccumulator::new();
        accumulator.add_chunk(chunk(vec![candidate(1, "B1"), candidate(0, "A1")]));
        accumulator.add_chunk(chunk(vec![candidate(0, "A2")]));
        accumulator.add_chunk(chunk(vec![candidate(1, "B2"), candidate(0, "A3")]));

        let response = accumulator.finalize();
        assert_eq!(response.candidates.len(), 2);
        assert_eq!(response.candidates[0].index, 0);
        assert_eq!(response.candidates[0].text(), "A1A2A3");
        assert_eq!(response.candidates[1].index, 1);
        assert_eq!(response.candidates[1].text(), "B1B2");
    }

    #[test]
    fn test_non_text_parts_are_replaced() {
        let mut accumulator = ResponseAccumulator::new();
        let mut first = candidate(0, "caption");
        first
            .content
            .parts
            .push(Part::file_data("image/png", "gs://bucket/v1.png"));
        accumulator.add_chunk(chunk(vec![first]));

        let mut second = candidate(0, " continued");
        second
            .content
            .parts
            .push(Part::file_data("image/png", "gs://bucket/v2.png"));
        accumulator.add_chunk(chunk(vec![second]));

        let response = accumulator.finalize();
        let parts = &response.candidates[0].content.parts;
        assert_eq!(parts[0], Part::text("caption continued"));
        assert_eq!(parts[1], Part::file_data("image/png", "gs://bucket/v2.png"));
    }

    #[test]
    fn test_extra_parts_are_appended() {
        let mut accumulator = ResponseAccumulator::new();
        accumulator.add_chunk(chunk(vec![candidate(0, "one")]));

        let mut wider = candidate(0, "");
        wider.content.parts.push(Part::text("two"));
        accumulator.add_chunk(chunk(vec![wider]));

        let response = accumulator.finalize();
        assert_eq!(
            response.candidates[0].content.parts,
            vec![Part::text("one"), Part::text("two")]
        );
    }

    #[test]
    fn test_citations_are_appended_without_dedup() {
        let mut accumulator = ResponseAccumulator::new();
        let mut first = candidate(0, "a");
        first.citation_metadata = Some(citation("https://one"));
        let mut second = candidate(0, "b");
        second.citation_metadata = Some(citation("https://one"));
        let mut third = candidate(0, "c");
        third.citation_metadata = Some(citation("https://two"));

        accumulator.add_chunk(chunk(vec![first]));
        accumulator.add_chunk(chunk(vec![candidate(0, "-")]));
        accumulator.add_chunk(chunk(vec![second]));
        accumulator.add_chunk(chunk(vec![third]));

        let response = accumulator.finalize();
        let uris: Vec<_> = response.candidates[0]
            .citation_metadata
            .as_ref()
            .unwrap()
            .citation_sources
            .iter()
            .map(|s| s.uri.as_deref().unwrap())
            .collect();
        assert_eq!(uris, vec!["https://one", "https://one", "https://two"]);
    }

    #[test]
    fn test_latest_finish_reason_and_message_win() {
        let mut accumulator = ResponseAccumulator::new();
        let mut first = candidate(0, "a");
        first.finish_reason = Some(FinishReason::Unspecified);
        accumulator.add_chunk(chunk(vec![first]));

        let mut last = candidate(0, "b");
        last.finish_reason = Some(FinishReason::MaxTokens);
        last.finish_message = Some("token limit".to_string());
        accumulator.add_chunk(chunk(vec![last]));

        // A trailing unspecified reason does not erase a real one.
        let mut trailing = candidate(0, "");
        trailing.finish_reason = Some(FinishReason::Unspecified);
        accumulator.add_chunk(chunk(vec![trailing]));

        let response = accumulator.finalize();
        let merged = &response.candidates[0];
        assert_eq!(merged.finish_reason, Some(FinishReason::MaxTokens));
        assert_eq!(merged.finish_message.as_deref(), Some("token limit"));
    }

    #[test]
    fn test_latest_safety_ratings_win() {
        let mut accumulator = ResponseAccumulator::new();
        let rating = |probability| SafetyRating {
            category: HarmCategory::Harassment,
            probability,
            blocked: None,
        };
        let mut first = candidate(0, "a");
        first.safety_ratings = vec![rating(HarmProbability::Low)];
        let mut second = candidate(0, "b");
        second.safety_ratings = vec![rating(HarmProbability::Negligible)];
        accumulator.add_chunk(chunk(vec![first]));
        accumulator.add_chunk(chunk(vec![second]));
        accumulator.add_chunk(chunk(vec![candidate(0, "c")]));

        let response = accumulator.finalize();
        assert_eq!(
            response.candidates[0].safety_ratings,
            vec![rating(HarmProbability::Negligible)]
        );
    }

    #[test]
    fn test_last_usage_metadata_wins() {
        let mut accumulator = ResponseAccumulator::new();
        let usage = |total| UsageMetadata {
            prompt_token_count: 4,
            candidates_token_count: total - 4,
            total_token_count: total,
        };

        let mut first = chunk(vec![candidate(0, "a")]);
        first.usage_metadata = Some(usage(6));
        let mut last = chunk(vec![candidate(0, "b")]);
        last.usage_metadata = Some(usage(9));

        accumulator.add_chunk(first);
        accumulator.add_chunk(last);
        accumulator.add_chunk(chunk(vec![candidate(0, "")]));
        assert_eq!(accumulator.chunk_count(), 3);

        let response = accumulator.finalize();
        assert_eq!(response.usage_metadata.unwrap().total_token_count, 9);
    }
}
