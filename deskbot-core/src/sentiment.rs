//! Sentiment and urgency classification of inbound messages.

use std::sync::Arc;

use deskbot_models::{CompletionProvider, CompletionRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::ticket::{Sentiment, Urgency};

const CLASSIFIER_INSTRUCTION: &str = r#"Você é um especialista em análise de sentimentos. Analise o sentimento e urgência de mensagens de suporte em português.
Responda com JSON válido neste formato exato:
{
  "sentiment": "positivo",
  "urgency": "alta",
  "confidence": 0.85
}

Diretrizes de urgência:
- alta: Cliente está frustrado, irritado ou enfrentando problemas críticos
- média: Cliente precisa de ajuda mas está paciente
- baixa: Perguntas simples ou consultas gerais"#;

/// Result of classifying one message.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub sentiment: Sentiment,
    pub urgency: Urgency,
    /// Always within `[0, 1]`.
    pub confidence: f32,
}

impl Default for Classification {
    /// Neutral, medium urgency, zero confidence.
    fn default() -> Self {
        Self {
            sentiment: Sentiment::Neutral,
            urgency: Urgency::Medium,
            confidence: 0.0,
        }
    }
}

#[derive(Clone)]
pub struct SentimentClassifier {
    completer: Arc<dyn CompletionProvider>,
}

impl SentimentClassifier {
    pub fn new(completer: Arc<dyn CompletionProvider>) -> Self {
        Self { completer }
    }

    /// Classify `text`. Any provider or parse failure yields
    /// [`Classification::default`].
    #[instrument(skip_all, level = "debug")]
    pub async fn classify(&self, text: &str) -> Classification {
        let request = CompletionRequest::new(CLASSIFIER_INSTRUCTION, text).json();
        match self.completer.complete(request).await {
            Ok(raw) => parse_classification(&raw).unwrap_or_else(|| {
                warn!(raw = %raw, "unparseable classification");
                Classification::default()
            }),
            Err(e) => {
                warn!(provider = self.completer.name(), error = %e, "classification failed");
                Classification::default()
            }
        }
    }
}

/// Parse the provider's JSON object. All three keys must be present with
/// the right JSON types.
pub fn parse_classification(raw: &str) -> Option<Classification> {
    let value: Value = serde_json::from_str(strip_code_fence(raw)).ok()?;
    let sentiment = value.get("sentiment")?.as_str()?;
    let urgency = value.get("urgency")?.as_str()?;
    let confidence = value.get("confidence")?.as_f64()?;

    let classification = Classification {
        sentiment: normalize_sentiment(sentiment),
        urgency: normalize_urgency(urgency),
        confidence: clamp_confidence(confidence),
    };
    debug!(?classification, "classified message");
    Some(classification)
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Map a localized label; unknown labels become neutral.
pub fn normalize_sentiment(label: &str) -> Sentiment {
    match label.trim().to_lowercase().as_str() {
        "positivo" | "positive" => Sentiment::Positive,
        "neutro" | "neutral" => Sentiment::Neutral,
        "negativo" | "negative" => Sentiment::Negative,
        _ => Sentiment::Neutral,
    }
}

/// Map a localized label; unknown labels become medium.
pub fn normalize_urgency(label: &str) -> Urgency {
    match label.trim().to_lowercase().as_str() {
        "alta" | "high" => Urgency::High,
        "média" | "media" | "medium" => Urgency::Medium,
        "baixa" | "low" => Urgency::Low,
        _ => Urgency::Medium,
    }
}

fn clamp_confidence(confidence: f64) -> f32 {
    if confidence.is_nan() {
        return 0.0;
    }
    confidence.clamp(0.0, 1.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockCompleter;

    #[test]
    fn parses_portuguese_labels() {
        let parsed =
            parse_classification(r#"{"sentiment": "negativo", "urgency": "alta", "confidence": 0.9}"#)
                .unwrap();
        assert_eq!(parsed.sentiment, Sentiment::Negative);
        assert_eq!(parsed.urgency, Urgency::High);
        assert!((parsed.confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn parses_english_labels_case_insensitively() {
        let parsed =
            parse_classification(r#"{"sentiment": "Positive", "urgency": "LOW", "confidence": 1}"#)
                .unwrap();
        assert_eq!(parsed.sentiment, Sentiment::Positive);
        assert_eq!(parsed.urgency, Urgency::Low);
    }

    #[test]
    fn accented_medium_label_maps_to_medium() {
        assert_eq!(normalize_urgency("média"), Urgency::Medium);
        assert_eq!(normalize_urgency("MÉDIA"), Urgency::Medium);
        assert_eq!(normalize_sentiment("neutro"), Sentiment::Neutral);
    }

    #[test]
    fn unknown_labels_map_to_defaults() {
        let parsed =
            parse_classification(r#"{"sentiment": "furioso", "urgency": "urgente", "confidence": 0.5}"#)
                .unwrap();
        assert_eq!(parsed.sentiment, Sentiment::Neutral);
        assert_eq!(parsed.urgency, Urgency::Medium);
    }

    #[test]
    fn confidence_is_clamped() {
        let high = parse_classification(r#"{"sentiment":"neutro","urgency":"baixa","confidence":7}"#)
            .unwrap();
        let low = parse_classification(r#"{"sentiment":"neutro","urgency":"baixa","confidence":-2}"#)
            .unwrap();
        assert_eq!(high.confidence, 1.0);
        assert_eq!(low.confidence, 0.0);
    }

    #[test]
    fn fenced_json_is_unwrapped() {
        let raw = "```json\n{\"sentiment\":\"positivo\",\"urgency\":\"baixa\",\"confidence\":0.4}\n```";
        let parsed = parse_classification(raw).unwrap();
        assert_eq!(parsed.sentiment, Sentiment::Positive);
    }

    #[test]
    fn missing_or_mistyped_keys_fail_to_parse() {
        assert!(parse_classification(r#"{"sentiment":"positivo","urgency":"alta"}"#).is_none());
        assert!(
            parse_classification(r#"{"sentiment":"positivo","urgency":"alta","confidence":"high"}"#)
                .is_none()
        );
        assert!(parse_classification("not json").is_none());
        assert!(parse_classification("[]").is_none());
    }

    #[tokio::test]
    async fn malformed_output_classifies_as_default() {
        let classifier = SentimentClassifier::new(Arc::new(
            MockCompleter::new().with_reply("I think the user is upset"),
        ));

        let result = classifier.classify("estou irritado").await;

        assert_eq!(result, Classification::default());
        assert_eq!(result.confidence, 0.0);
    }

    #[tokio::test]
    async fn provider_failure_classifies_as_default() {
        let classifier = SentimentClassifier::new(Arc::new(MockCompleter::failing()));
        assert_eq!(classifier.classify("oi").await, Classification::default());
    }

    #[tokio::test]
    async fn classify_requests_json_output() {
        let completer = Arc::new(MockCompleter::new().with_reply(
            r#"{"sentiment":"negativo","urgency":"alta","confidence":0.85}"#,
        ));
        let classifier = SentimentClassifier::new(completer.clone());

        let result = classifier.classify("nada funciona!").await;

        assert_eq!(result.urgency, Urgency::High);
        let request = &completer.requests()[0];
        assert_eq!(request.format, deskbot_models::OutputFormat::Json);
        assert_eq!(request.user_text, "nada funciona!");
    }
}
