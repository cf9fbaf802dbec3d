//! Grounded response composition.
//!
//! [`ResponseComposer::compose`] always returns displayable text. It tries,
//! in order:
//!
//! 1. completion with retrieved knowledge as context (ranked entries, or
//!    the whole corpus when nothing ranks);
//! 2. a lexical knowledge excerpt, or a short listing of what is known;
//! 3. with no corpus at all, completion on the bare system prompt, then a
//!    generic apology.
//!
//! Anything that escapes those steps, panics included, yields a second
//! generic message.

use std::fmt::Write as _;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use deskbot_models::{CompletionProvider, CompletionRequest};
use futures_util::FutureExt;
use tracing::{debug, error, instrument, warn};

use crate::config::BotConfig;
use crate::knowledge::KnowledgeEntry;
use crate::retrieval::{GENERATION_THRESHOLD, KnowledgeIndex, Retrieval, lexical_matches};

/// Reply when there is no knowledge and the completion capability is down.
pub const UNAVAILABLE_MESSAGE: &str =
    "Estou tendo dificuldades para responder agora. Por favor, tente novamente em alguns momentos.";

/// Reply when composition fails unexpectedly.
pub const FAILURE_MESSAGE: &str = "Desculpe, estou tendo dificuldades para responder no momento.";

const ANSWER_INSTRUCTION: &str = "\n\nBaseando-se nas informações acima, responda a pergunta do usuário de forma clara, útil e em português.";

/// Entries listed when no knowledge matches lexically.
const LISTING_LIMIT: usize = 3;
/// Characters of information shown per listed entry.
const LISTING_EXCERPT_CHARS: usize = 200;

#[derive(Clone)]
pub struct ResponseComposer {
    index: KnowledgeIndex,
    completer: Arc<dyn CompletionProvider>,
}

impl ResponseComposer {
    pub fn new(index: KnowledgeIndex, completer: Arc<dyn CompletionProvider>) -> Self {
        Self { index, completer }
    }

    /// Compose a reply to `user_message` grounded in `corpus`. Never fails
    /// and never returns blank text.
    #[instrument(skip_all, fields(corpus = corpus.len()), level = "debug")]
    pub async fn compose(
        &self,
        user_message: &str,
        corpus: &[KnowledgeEntry],
        config: &BotConfig,
    ) -> String {
        let attempt = AssertUnwindSafe(self.compose_with_fallbacks(user_message, corpus, config))
            .catch_unwind()
            .await;

        match attempt {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                warn!("composition produced blank text");
                FAILURE_MESSAGE.to_string()
            }
            Err(_) => {
                error!("response composition panicked");
                FAILURE_MESSAGE.to_string()
            }
        }
    }

    async fn compose_with_fallbacks(
        &self,
        user_message: &str,
        corpus: &[KnowledgeEntry],
        config: &BotConfig,
    ) -> String {
        if corpus.is_empty() {
            let request = CompletionRequest::new(&config.system_prompt, user_message)
                .with_max_tokens(config.max_tokens);
            return match self.completer.complete(request).await {
                Ok(text) => or_fallback(text, &config.fallback_message),
                Err(e) => {
                    warn!(provider = self.completer.name(), error = %e, "completion failed with empty corpus");
                    UNAVAILABLE_MESSAGE.to_string()
                }
            };
        }

        let retrieval = self
            .index
            .retrieve(user_message, corpus, GENERATION_THRESHOLD)
            .await;
        let system_instruction = format!(
            "{}{}{}",
            config.system_prompt,
            context_block(&retrieval, corpus),
            ANSWER_INSTRUCTION
        );
        let request = CompletionRequest::new(system_instruction, user_message)
            .with_max_tokens(config.max_tokens);

        match self.completer.complete(request).await {
            Ok(text) => return or_fallback(text, &config.fallback_message),
            Err(e) => {
                warn!(provider = self.completer.name(), error = %e, "completion failed, answering from knowledge");
            }
        }

        if let Some(entry) = lexical_matches(user_message, corpus).first() {
            debug!(subject = %entry.subject, "lexical knowledge match");
            return format!(
                "📚 Conforme nossa base de conhecimento sobre \"{}\":\n\n{}",
                entry.subject, entry.information
            );
        }

        knowledge_listing(corpus)
    }
}

fn or_fallback(text: String, fallback: &str) -> String {
    if text.trim().is_empty() {
        fallback.to_string()
    } else {
        text
    }
}

/// Knowledge section appended to the system prompt.
fn context_block(retrieval: &Retrieval, corpus: &[KnowledgeEntry]) -> String {
    let mut block = String::new();
    match retrieval {
        Retrieval::Ranked(ranked) => {
            block.push_str("\n\n📚 Informações Relevantes da Base de Conhecimento:\n\n");
            for (i, entry) in ranked.iter().enumerate() {
                let _ = write!(
                    block,
                    "{}. **{}** ({:.0}% relevante):\n{}\n\n",
                    i + 1,
                    entry.subject,
                    entry.similarity * 100.0,
                    entry.information
                );
            }
        }
        Retrieval::FullCorpus => {
            block.push_str("\n\n📚 Base de Conhecimento Disponível:\n\n");
            for (i, entry) in corpus.iter().enumerate() {
                let _ = write!(
                    block,
                    "{}. **{}**:\n{}\n\n",
                    i + 1,
                    entry.subject,
                    entry.information
                );
            }
        }
    }
    block
}

/// Summary of the first few entries when nothing matches the question.
fn knowledge_listing(corpus: &[KnowledgeEntry]) -> String {
    let items: Vec<String> = corpus
        .iter()
        .take(LISTING_LIMIT)
        .map(|entry| {
            let mut excerpt: String = entry.information.chars().take(LISTING_EXCERPT_CHARS).collect();
            if entry.information.chars().count() > LISTING_EXCERPT_CHARS {
                excerpt.push_str("...");
            }
            format!("📌 **{}**:\n{}", entry.subject, excerpt)
        })
        .collect();

    format!(
        "Não encontrei exatamente sobre esse assunto, mas tenho informações sobre:\n\n{}",
        items.join("\n\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockCompleter, MockEmbedder};
    use crate::types::KnowledgeId;
    use chrono::Utc;

    fn entry(subject: &str, information: &str, embedding: Option<Vec<f32>>) -> KnowledgeEntry {
        KnowledgeEntry {
            id: KnowledgeId::new(),
            subject: subject.to_string(),
            information: information.to_string(),
            embedding,
            created_at: Utc::now(),
        }
    }

    fn composer(embedder: MockEmbedder, completer: Arc<MockCompleter>) -> ResponseComposer {
        ResponseComposer::new(KnowledgeIndex::new(Arc::new(embedder)), completer)
    }

    fn refund_corpus() -> Vec<KnowledgeEntry> {
        vec![entry("Refund Policy", "30 days", Some(vec![0.7, 0.714_142_8]))]
    }

    #[tokio::test]
    async fn ranked_context_grounds_the_completion() {
        let completer = Arc::new(MockCompleter::new().with_reply("Refunds are accepted within 30 days."));
        let embedder = MockEmbedder::new().with_vector("what's your refund window", vec![1.0, 0.0]);
        let composer = composer(embedder, completer.clone());

        let reply = composer
            .compose("what's your refund window", &refund_corpus(), &BotConfig::default())
            .await;

        assert!(reply.contains("30 days"));
        let request = &completer.requests()[0];
        assert!(request.system_instruction.starts_with(&BotConfig::default().system_prompt));
        assert!(request.system_instruction.contains("Informações Relevantes"));
        assert!(request.system_instruction.contains("**Refund Policy** (70% relevante):\n30 days"));
        assert!(request.system_instruction.ends_with(ANSWER_INSTRUCTION));
        assert_eq!(request.user_text, "what's your refund window");
        assert_eq!(request.max_tokens, Some(500));
    }

    #[tokio::test]
    async fn embedding_failure_presents_full_corpus() {
        let completer = Arc::new(MockCompleter::new().with_reply("ok"));
        let corpus = vec![
            entry("Refund Policy", "30 days", Some(vec![1.0, 0.0])),
            entry("Hours", "9-18", None),
        ];
        let composer = composer(MockEmbedder::failing(), completer.clone());

        let reply = composer.compose("refund?", &corpus, &BotConfig::default()).await;

        assert_eq!(reply, "ok");
        let system = &completer.requests()[0].system_instruction;
        assert!(system.contains("Base de Conhecimento Disponível"));
        assert!(system.contains("1. **Refund Policy**:\n30 days"));
        assert!(system.contains("2. **Hours**:\n9-18"));
    }

    #[tokio::test]
    async fn both_providers_failing_falls_back_to_lexical_match() {
        let completer = Arc::new(MockCompleter::failing());
        let composer = composer(MockEmbedder::failing(), completer.clone());

        let reply = composer
            .compose("Qual a refund policy de vocês?", &refund_corpus(), &BotConfig::default())
            .await;

        assert_eq!(completer.call_count(), 1);
        assert_eq!(
            reply,
            "📚 Conforme nossa base de conhecimento sobre \"Refund Policy\":\n\n30 days"
        );
    }

    #[tokio::test]
    async fn no_lexical_match_lists_up_to_three_entries() {
        let long = "x".repeat(250);
        let corpus = vec![
            entry("Alpha1", &long, None),
            entry("Bravo2", "short", None),
            entry("Charlie3", "c", None),
            entry("Delta4", "d", None),
        ];
        let composer = composer(MockEmbedder::failing(), Arc::new(MockCompleter::failing()));

        let reply = composer.compose("zzz", &corpus, &BotConfig::default()).await;

        assert!(reply.starts_with("Não encontrei exatamente sobre esse assunto"));
        assert!(reply.contains(&format!("📌 **Alpha1**:\n{}...", "x".repeat(200))));
        assert!(reply.contains("📌 **Bravo2**:\nshort"));
        assert!(!reply.contains("short..."));
        assert!(reply.contains("📌 **Charlie3**"));
        assert!(!reply.contains("📌 **Delta4**"));
    }

    #[tokio::test]
    async fn empty_corpus_uses_bare_prompt() {
        let completer = Arc::new(MockCompleter::new().with_reply("Olá!"));
        let composer = composer(MockEmbedder::new(), completer.clone());

        let reply = composer.compose("oi", &[], &BotConfig::default()).await;

        assert_eq!(reply, "Olá!");
        assert_eq!(
            completer.requests()[0].system_instruction,
            BotConfig::default().system_prompt
        );
    }

    #[tokio::test]
    async fn empty_corpus_and_failed_completion_is_unavailable() {
        let composer = composer(MockEmbedder::new(), Arc::new(MockCompleter::failing()));

        let reply = composer.compose("oi", &[], &BotConfig::default()).await;

        assert_eq!(reply, UNAVAILABLE_MESSAGE);
        assert_ne!(reply, BotConfig::default().fallback_message);
    }

    #[tokio::test]
    async fn empty_completion_uses_fallback_message() {
        let completer = Arc::new(MockCompleter::new().with_reply("   "));
        let composer = composer(MockEmbedder::failing(), completer);

        let with_corpus = composer.compose("q", &refund_corpus(), &BotConfig::default()).await;
        let without = composer.compose("q", &[], &BotConfig::default()).await;

        assert_eq!(with_corpus, BotConfig::default().fallback_message);
        assert_eq!(without, BotConfig::default().fallback_message);
    }

    #[tokio::test]
    async fn panicking_provider_yields_failure_message() {
        let composer = composer(MockEmbedder::new(), Arc::new(MockCompleter::panicking()));

        let reply = composer.compose("oi", &[], &BotConfig::default()).await;

        assert_eq!(reply, FAILURE_MESSAGE);
    }

    #[tokio::test]
    async fn compose_never_returns_blank() {
        let corpora = [
            Vec::new(),
            vec![entry("A", "a", None)],
            refund_corpus(),
        ];
        for corpus in &corpora {
            for completer in [MockCompleter::failing(), MockCompleter::new().with_reply("")] {
                for embedder in [MockEmbedder::failing(), MockEmbedder::new().with_default(vec![1.0, 0.0])] {
                    let mut config = BotConfig::default();
                    config.fallback_message = String::new();
                    let composer = composer(embedder, Arc::new(completer.clone()));

                    let reply = composer.compose("pergunta", corpus, &config).await;

                    assert!(!reply.trim().is_empty());
                }
            }
        }
    }
}
