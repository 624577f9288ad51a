use crate::citations::{format_excerpts, parse_sources};
use crate::condense::condense_conversation;
use crate::embeddings::Embedder;
use crate::error::{AnswerError, ConfigError};
use crate::fallback::rank_by_keywords;
use crate::models::{
    Answer, ChatTurn, IndexQuery, Match, MetadataFilter, PreparedPrompt, RetrievalOptions, Role,
};
use crate::traits::{GenerationRequest, TextGenerator, VectorIndex};
use std::collections::BTreeSet;
use std::sync::Arc;

const LIST_DOCUMENTS_PROBE: &str = "document";
const LIST_DOCUMENTS_TOP_K: usize = 500;

const ASSISTANT_INSTRUCTION: &str = "You are a document assistant. Based on the following \
document excerpts, answer the user's question. If the text does not contain the answer, say you \
don't know.
At the end of your answer, list the file names used to generate the response as source badges in \
this exact format: [Source: filename.pdf, Page N] (one per source; omit \", Page N\" if no page \
number is given in the excerpt label).";

pub fn build_system_prompt(context: &str) -> String {
    format!("{ASSISTANT_INSTRUCTION}\n\nDocument excerpts:\n{context}")
}

/// The flag is true when keyword re-ranking produced the returned list.
pub fn select_matches(
    matches: Vec<Match>,
    raw_question: &str,
    options: &RetrievalOptions,
) -> (Vec<Match>, bool) {
    let top_score = matches.first().map_or(0.0, |best| best.score);

    if top_score < options.threshold && !matches.is_empty() {
        let mut ranked = rank_by_keywords(matches.clone(), raw_question);
        if !ranked.is_empty() {
            ranked.truncate(options.final_results);
            return (ranked, true);
        }
    }

    let mut vector_ranked = matches;
    vector_ranked.truncate(options.final_results);
    (vector_ranked, false)
}

pub struct RetrievalOrchestrator {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    condenser: Arc<dyn TextGenerator>,
    generator: Arc<dyn TextGenerator>,
    options: RetrievalOptions,
}

impl RetrievalOrchestrator {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        condenser: Arc<dyn TextGenerator>,
        generator: Arc<dyn TextGenerator>,
        options: RetrievalOptions,
    ) -> Result<Self, ConfigError> {
        if embedder.dimensions() != index.dimensions() {
            return Err(ConfigError::DimensionMismatch {
                expected: index.dimensions(),
                actual: embedder.dimensions(),
            });
        }

        Ok(Self {
            embedder,
            index,
            condenser,
            generator,
            options,
        })
    }

    pub fn options(&self) -> &RetrievalOptions {
        &self.options
    }

    pub async fn prepare(
        &self,
        turns: &[ChatTurn],
        file_scope: Option<&str>,
    ) -> Result<PreparedPrompt, AnswerError> {
        let raw_question = turns
            .iter()
            .rev()
            .find(|turn| turn.role == Role::User)
            .map(|turn| turn.content.trim().to_string())
            .filter(|question| !question.is_empty())
            .ok_or(AnswerError::NoQuestion)?;

        let search_query = if turns.len() > 1 {
            let condensed =
                condense_conversation(self.condenser.as_ref(), turns, self.options.condense_turns)
                    .await;
            if condensed.trim().is_empty() {
                raw_question.clone()
            } else {
                condensed
            }
        } else {
            raw_question.clone()
        };

        let vector = self.embedder.embed_one(&search_query).await?;
        let matches: Vec<Match> = self
            .index
            .query(&IndexQuery {
                vector,
                top_k: self.options.fallback_candidates,
                filter: MetadataFilter::from_scope(file_scope),
            })
            .await?
            .into_iter()
            .filter(|candidate| !candidate.text.trim().is_empty())
            .collect();

        let top_score = matches.first().map_or(0.0, |best| best.score);
        let candidates = matches.len();
        let (matches, used_keyword_fallback) =
            select_matches(matches, &raw_question, &self.options);

        tracing::info!(
            query = %search_query,
            top_score,
            candidates,
            selected = matches.len(),
            used_keyword_fallback,
            "retrieval complete"
        );

        let context = format_excerpts(&matches);
        Ok(PreparedPrompt {
            system_prompt: build_system_prompt(&context),
            raw_question,
            search_query,
            top_score,
            used_keyword_fallback,
            matches,
            context,
        })
    }

    pub async fn answer(
        &self,
        turns: &[ChatTurn],
        file_scope: Option<&str>,
    ) -> Result<Answer, AnswerError> {
        let prompt = self.prepare(turns, file_scope).await?;

        let request = GenerationRequest {
            system: prompt.system_prompt.clone(),
            messages: turns
                .iter()
                .filter(|turn| turn.role != Role::System)
                .cloned()
                .collect(),
            max_tokens: None,
        };
        let text = self.generator.generate(&request).await?;
        let sources = parse_sources(&text).unwrap_or_default();

        Ok(Answer {
            text,
            sources,
            prompt,
        })
    }

    /// File names present in the vault, sampled through one broad query.
    pub async fn list_documents(&self) -> Result<Vec<String>, AnswerError> {
        let vector = self.embedder.embed_one(LIST_DOCUMENTS_PROBE).await?;
        let matches = self
            .index
            .query(&IndexQuery {
                vector,
                top_k: LIST_DOCUMENTS_TOP_K,
                filter: None,
            })
            .await?;

        let names: BTreeSet<String> = matches
            .into_iter()
            .filter_map(|found| found.file_name)
            .collect();
        Ok(names.into_iter().collect())
    }
}
