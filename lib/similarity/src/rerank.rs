//! LLM re-ranking of the similarity candidate pool
//!
//! Sends one prompt per query and turns the numbered response back into
//! recommendations, matched to candidates by name.

use pawmatch_core::{AnimalRecord, CompletionProvider, Error, Result};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::parser::{ParsedEntry, ResponseParser};
use crate::prompt::PromptBuilder;
use crate::ranker::RankedCandidate;
use crate::recommendation::{Recommendation, RecommendationSource};

pub struct LlmReranker {
    completer: Arc<dyn CompletionProvider>,
    prompt: PromptBuilder,
    parser: ResponseParser,
}

impl LlmReranker {
    pub fn new(completer: Arc<dyn CompletionProvider>) -> Self {
        Self::with_parts(completer, PromptBuilder::default(), ResponseParser::default())
    }

    pub fn with_parts(
        completer: Arc<dyn CompletionProvider>,
        prompt: PromptBuilder,
        parser: ResponseParser,
    ) -> Self {
        Self {
            completer,
            prompt,
            parser,
        }
    }

    pub fn prompt_builder(&self) -> &PromptBuilder {
        &self.prompt
    }

    pub fn parser(&self) -> &ResponseParser {
        &self.parser
    }

    /// Re-rank `candidates` for `query`, asking the model for `count` picks
    /// (the prompt default when `None`).
    ///
    /// Returns [`Error::Completion`] when the service fails and
    /// [`Error::Parse`] when no entry can be recovered from the response;
    /// both are degradable. No candidates means no service call.
    pub async fn rerank<F>(
        &self,
        query: &str,
        candidates: &[RankedCandidate<'_>],
        count: Option<usize>,
        describe: F,
    ) -> Result<Vec<Recommendation>>
    where
        F: Fn(&AnimalRecord) -> String,
    {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let request = self.prompt.build(query, candidates, count, describe);
        let response = self.completer.complete(&request).await.map_err(|e| {
            warn!(provider = self.completer.name(), error = %e, "re-ranking completion failed");
            Error::Completion(e)
        })?;

        let entries = self.parser.parse(&response);
        if entries.is_empty() {
            warn!(response_chars = response.chars().count(), "re-ranking response had no entries");
            return Err(Error::Parse(format!(
                "no recommendation entries in {} chars of response",
                response.chars().count()
            )));
        }

        let recommendations = attach(&entries, candidates);
        debug!(
            candidates = candidates.len(),
            parsed = entries.len(),
            matched = recommendations.iter().filter(|r| r.uid.is_some()).count(),
            incomplete = recommendations.iter().filter(|r| !r.is_complete()).count(),
            "re-ranking parsed"
        );
        Ok(recommendations)
    }
}

/// Pair parsed entries with candidates by name; each candidate is used at most once.
///
/// Exact (trimmed) name matches are preferred over containment matches.
pub fn attach(entries: &[ParsedEntry], candidates: &[RankedCandidate<'_>]) -> Vec<Recommendation> {
    let mut used = vec![false; candidates.len()];

    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let matched = entry
                .name
                .as_deref()
                .and_then(|name| match_candidate(name, candidates, &mut used));

            Recommendation {
                rank: i + 1,
                name: entry.name.clone(),
                reason: entry.reason.clone(),
                uid: matched.map(|c| c.record.uid.clone()),
                score: matched.map(|c| c.score),
                source: RecommendationSource::Llm,
            }
        })
        .collect()
}

fn match_candidate<'c, 'a>(
    name: &str,
    candidates: &'c [RankedCandidate<'a>],
    used: &mut [bool],
) -> Option<&'c RankedCandidate<'a>> {
    let wanted = name.trim().trim_matches(|c: char| matches!(c, '"' | '\'' | '[' | ']'));
    if wanted.is_empty() {
        return None;
    }

    let exact = candidates
        .iter()
        .enumerate()
        .position(|(i, c)| !used[i] && c.record.name.trim() == wanted);
    let position = exact.or_else(|| {
        candidates.iter().enumerate().position(|(i, c)| {
            let own = c.record.name.trim();
            !used[i] && !own.is_empty() && (wanted.contains(own) || own.contains(wanted))
        })
    })?;

    used[position] = true;
    candidates.get(position)
}
