//! Conversational intent extraction. The structured-completion provider
//! is the primary path; when it fails, times out, or returns malformed
//! JSON, a deterministic keyword extractor takes over so the engine
//! never blocks on a slow or broken upstream.

use once_cell::sync::Lazy;
use regex::Regex;
use shoprec_core::config::ContextConfig;
use shoprec_core::providers::IntentProvider;
use shoprec_core::types::{ConversationIntent, PriceRange, Urgency};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

static PRICE_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\$\s*([0-9][0-9,]*(?:\.[0-9]+)?)\s*(?:to|and|-)\s*\$\s*([0-9][0-9,]*(?:\.[0-9]+)?)")
        .expect("price range regex")
});
static PRICE_MAX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:under|below|less than|at most|up to)\s*\$\s*([0-9][0-9,]*(?:\.[0-9]+)?)")
        .expect("price max regex")
});
static PRICE_MIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:over|above|more than|at least)\s*\$\s*([0-9][0-9,]*(?:\.[0-9]+)?)")
        .expect("price min regex")
});
static NEED_PHRASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:need|want|looking for|searching for|shopping for)\s+(?:a|an|some|the)?\s*([a-z0-9][a-z0-9 '\-]{2,40}?)(?:[.,!?;\n]|$)",
    )
    .expect("need phrase regex")
});
static QUOTED_PHRASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""([^"]{2,60})""#).expect("quoted phrase regex"));
static HIGH_URGENCY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(urgent|asap|emergency|today|immediately|right away)\b")
        .expect("high urgency regex")
});
static LOW_URGENCY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(browsing|maybe|considering|someday|just looking)\b")
        .expect("low urgency regex")
});

pub struct ContextAnalyzer {
    provider: Arc<dyn IntentProvider>,
    config: ContextConfig,
}

impl ContextAnalyzer {
    pub fn new(provider: Arc<dyn IntentProvider>, config: ContextConfig) -> Self {
        Self { provider, config }
    }

    /// Extract structured intent from raw conversation text. Never
    /// fails: any provider problem degrades to keyword extraction.
    pub async fn analyze(&self, raw_text: &str, domain_id: &str) -> ConversationIntent {
        let timeout = Duration::from_millis(self.config.provider_timeout_ms);
        match tokio::time::timeout(timeout, self.provider.extract_intent(raw_text)).await {
            Ok(Ok(intent)) => intent,
            Ok(Err(e)) => {
                warn!(domain_id = %domain_id, error = %e,
                    "Intent provider failed, using keyword fallback");
                metrics::counter!("recs.intent_fallbacks").increment(1);
                self.fallback(raw_text)
            }
            Err(_) => {
                warn!(domain_id = %domain_id, timeout_ms = self.config.provider_timeout_ms,
                    "Intent provider timed out, using keyword fallback");
                metrics::counter!("recs.intent_fallbacks").increment(1);
                self.fallback(raw_text)
            }
        }
    }

    /// Deterministic keyword extraction.
    fn fallback(&self, raw_text: &str) -> ConversationIntent {
        ConversationIntent {
            detected_intent: raw_text.chars().take(self.config.intent_snippet_len).collect(),
            mentioned_products: extract_products(raw_text),
            price_range: extract_price_range(raw_text),
            urgency: extract_urgency(raw_text),
        }
    }
}

fn extract_products(text: &str) -> Vec<String> {
    let mut products: Vec<String> = Vec::new();
    for captures in NEED_PHRASE.captures_iter(text) {
        if let Some(m) = captures.get(1) {
            let phrase = m.as_str().trim().to_lowercase();
            if !phrase.is_empty() && !products.contains(&phrase) {
                products.push(phrase);
            }
        }
    }
    for captures in QUOTED_PHRASE.captures_iter(text) {
        if let Some(m) = captures.get(1) {
            let phrase = m.as_str().trim().to_lowercase();
            if !phrase.is_empty() && !products.contains(&phrase) {
                products.push(phrase);
            }
        }
    }
    products
}

fn extract_price_range(text: &str) -> Option<PriceRange> {
    if let Some(captures) = PRICE_RANGE.captures(text) {
        let min = parse_amount(captures.get(1)?.as_str())?;
        let max = parse_amount(captures.get(2)?.as_str())?;
        return Some(PriceRange {
            min: Some(min.min(max)),
            max: Some(min.max(max)),
        });
    }

    let max = PRICE_MAX
        .captures(text)
        .and_then(|c| parse_amount(c.get(1)?.as_str()));
    let min = PRICE_MIN
        .captures(text)
        .and_then(|c| parse_amount(c.get(1)?.as_str()));
    if max.is_none() && min.is_none() {
        return None;
    }
    Some(PriceRange { min, max })
}

fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn extract_urgency(text: &str) -> Urgency {
    if HIGH_URGENCY.is_match(text) {
        Urgency::High
    } else if LOW_URGENCY.is_match(text) {
        Urgency::Low
    } else {
        Urgency::Medium
    }
}
