//! Advisory analysis with guardrails.
//!
//! The advisor annotates a finished decision. It cannot change the status,
//! reason codes, or questions of the decision record; every model response
//! is passed through [`sanitize`] before it is returned.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::time::Instant;

use invoice_recon_core::{DecisionStatus, ProcessedInvoice, RawInvoice, StoreStats};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::prompts::{build_user_prompt, SYSTEM_PROMPT};

pub const MAX_INSIGHTS: usize = 5;
pub const MAX_QUESTIONS: usize = 3;
pub const MAX_EXPLANATION_LEN: usize = 500;
pub const MAX_ITEM_LEN: usize = 300;
/// Retries after the first failed backend call.
pub const MAX_RETRIES: u32 = 1;

/// Guardrails enforced on every advisory response.
pub const GUARDRAILS: &[&str] = &[
    "Advisor cannot override deterministic flags",
    "Advisor cannot approve FLAGGED invoices",
    "Risk level cannot be 'low' when the invoice is FLAGGED",
    "All outputs are validated, truncated and capped",
    "Structured JSON output only; free text is ignored",
];

/// Advisor errors.
#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid response format: {0}")]
    InvalidFormat(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

pub type AdvisorResult<T> = Result<T, AdvisorError>;

/// Overall risk assessment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Parse a model-supplied level, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Some(RiskLevel::Low),
            "medium" => Some(RiskLevel::Medium),
            "high" => Some(RiskLevel::High),
            "critical" => Some(RiskLevel::Critical),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

/// Sanitized advisory output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdvisoryAnalysis {
    pub risk_level: RiskLevel,
    pub executive_summary: String,
    pub insights: Vec<String>,
    pub recommended_questions: Vec<String>,
    pub explanation: String,
    /// Whether the content came from a backend (false for fallbacks)
    pub ai_available: bool,
    pub model: Option<String>,
    pub latency_ms: u64,
}

impl AdvisoryAnalysis {
    /// Deterministic result used when no usable model output exists.
    pub fn fallback(invoice_number: &str, status: DecisionStatus, explanation: impl Into<String>) -> Self {
        Self {
            risk_level: match status {
                DecisionStatus::Flagged => RiskLevel::Medium,
                DecisionStatus::Approved => RiskLevel::Low,
            },
            executive_summary: format!(
                "Invoice {} was {} by the deterministic system.",
                invoice_number, status
            ),
            insights: Vec::new(),
            recommended_questions: Vec::new(),
            explanation: explanation.into(),
            ai_available: false,
            model: None,
            latency_ms: 0,
        }
    }
}

/// Parse a model response into a JSON object.
///
/// Models sometimes wrap JSON in prose or code fences; the outermost
/// `{ ... }` span is used.
pub fn parse_advisory_response(text: &str) -> AdvisorResult<Value> {
    let start = text.find('{').ok_or_else(|| {
        AdvisorError::InvalidFormat("No JSON object found in response".into())
    })?;
    let end = text.rfind('}').ok_or_else(|| {
        AdvisorError::InvalidFormat("No closing brace found in response".into())
    })?;
    if end < start {
        return Err(AdvisorError::InvalidFormat("Malformed JSON object span".into()));
    }

    let value: Value = serde_json::from_str(&text[start..=end])?;
    if !value.is_object() {
        return Err(AdvisorError::InvalidFormat("Response is not a JSON object".into()));
    }
    Ok(value)
}

/// Apply guardrails to a raw model response.
///
/// Unknown or missing risk levels become medium, and a FLAGGED invoice is
/// never reported as low risk. Text fields are truncated and lists capped.
pub fn sanitize(raw: &Value, status: DecisionStatus) -> AdvisoryAnalysis {
    let mut risk_level = raw
        .get("risk_level")
        .map(value_text)
        .and_then(|s| RiskLevel::parse(&s))
        .unwrap_or(RiskLevel::Medium);
    if status == DecisionStatus::Flagged && risk_level == RiskLevel::Low {
        risk_level = RiskLevel::Medium;
    }

    let summary = truncate(&field_text(raw, "executive_summary"), MAX_EXPLANATION_LEN);
    let explanation = truncate(&field_text(raw, "explanation"), MAX_EXPLANATION_LEN);

    AdvisoryAnalysis {
        risk_level,
        executive_summary: or_default(summary, "No summary generated."),
        insights: capped_list(raw.get("insights"), MAX_INSIGHTS),
        recommended_questions: capped_list(raw.get("recommended_questions"), MAX_QUESTIONS),
        explanation: or_default(explanation, "No explanation generated."),
        ai_available: true,
        model: None,
        latency_ms: 0,
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn field_text(raw: &Value, key: &str) -> String {
    raw.get(key).map(value_text).unwrap_or_default()
}

fn or_default(s: String, default: &str) -> String {
    if s.is_empty() {
        default.to_string()
    } else {
        s
    }
}

/// Take the first `max` entries, keeping non-blank strings only.
fn capped_list(value: Option<&Value>, max: usize) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .take(max)
            .filter_map(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .map(|s| truncate(s, MAX_ITEM_LEN))
            .collect(),
        _ => Vec::new(),
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// A text completion backend.
///
/// Implementations return [`AdvisorError::Unavailable`] when they are not
/// configured; the advisor then skips straight to the fallback.
pub trait CompletionBackend {
    /// Model identifier reported in results.
    fn model(&self) -> &str;

    fn complete(&self, system: &str, user: &str) -> AdvisorResult<String>;
}

/// Runs the advisory pass for processed invoices.
pub struct Advisor<B: CompletionBackend> {
    backend: B,
    max_retries: u32,
}

impl<B: CompletionBackend> Advisor<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            max_retries: MAX_RETRIES,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Annotate a processed invoice. Never fails; falls back to a
    /// deterministic result when the backend is unusable.
    pub fn analyze(
        &self,
        invoice: &RawInvoice,
        processed: &ProcessedInvoice,
        stats: Option<&StoreStats>,
    ) -> AdvisoryAnalysis {
        let status = processed.decision.status();
        let number = processed.invoice_number.as_str();
        let user_prompt = build_user_prompt(invoice, processed, stats);

        let started = Instant::now();
        let mut attempt = 0;
        let text = loop {
            match self.backend.complete(SYSTEM_PROMPT, &user_prompt) {
                Ok(text) => break text,
                Err(AdvisorError::Unavailable(reason)) => {
                    debug!(invoice = number, %reason, "Advisor backend unavailable");
                    return AdvisoryAnalysis::fallback(
                        number,
                        status,
                        format!("Advisory analysis skipped ({}). Deterministic results only.", reason),
                    );
                }
                Err(e) if attempt < self.max_retries => {
                    warn!(invoice = number, attempt, error = %e, "Advisor call failed, retrying");
                    attempt += 1;
                }
                Err(e) => {
                    warn!(invoice = number, error = %e, "Advisor call failed");
                    return AdvisoryAnalysis::fallback(
                        number,
                        status,
                        format!(
                            "Advisory call failed after {} attempts: {}",
                            self.max_retries + 1,
                            e
                        ),
                    );
                }
            }
        };
        let latency_ms = started.elapsed().as_millis() as u64;

        let raw = match parse_advisory_response(&text) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(invoice = number, error = %e, "Advisor returned invalid JSON");
                let mut fallback = AdvisoryAnalysis::fallback(
                    number,
                    status,
                    "Advisor returned invalid JSON. Deterministic results only.",
                );
                fallback.latency_ms = latency_ms;
                return fallback;
            }
        };

        let mut analysis = sanitize(&raw, status);
        analysis.model = Some(self.backend.model().to_string());
        analysis.latency_ms = latency_ms;
        analysis
    }
}

/// Scripted backend for tests and offline runs.
///
/// Replays queued responses in order; once the script is exhausted every
/// call reports the backend as unavailable.
#[derive(Default)]
pub struct MockBackend {
    responses: RefCell<VecDeque<AdvisorResult<String>>>,
    calls: Cell<u32>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful completion.
    pub fn respond(self, text: impl Into<String>) -> Self {
        self.responses.borrow_mut().push_back(Ok(text.into()));
        self
    }

    /// Queue a failed completion.
    pub fn fail(self, message: impl Into<String>) -> Self {
        self.responses
            .borrow_mut()
            .push_back(Err(AdvisorError::Backend(message.into())));
        self
    }

    /// Number of completions requested so far.
    pub fn calls(&self) -> u32 {
        self.calls.get()
    }
}

impl CompletionBackend for MockBackend {
    fn model(&self) -> &str {
        "mock"
    }

    fn complete(&self, _system: &str, _user: &str) -> AdvisorResult<String> {
        self.calls.set(self.calls.get() + 1);
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(AdvisorError::Unavailable("no scripted response".into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use invoice_recon_core::{InvoiceLineItem, InvoiceProcessor, ReconPolicy, ReferenceData};
    use proptest::prelude::*;
    use serde_json::json;

    fn process(price: f64) -> (RawInvoice, ProcessedInvoice) {
        let reference = ReferenceData::builtin();
        let policy = ReconPolicy::default();
        let invoice = RawInvoice {
            vendor_name: Some("Acme Supplies Inc.".into()),
            invoice_number: Some("INV-7".into()),
            line_items: vec![InvoiceLineItem::new("A4 Paper Box", 24.0, price, 24.0 * price)],
            subtotal: Some(24.0 * price),
            ..Default::default()
        };
        let processed = InvoiceProcessor::new(&reference, &policy)
            .process(&invoice)
            .unwrap();
        (invoice, processed)
    }

    const GOOD_RESPONSE: &str = r#"Here is my analysis:
{"risk_level": "HIGH", "executive_summary": "Paper is 3x the usual price.",
 "insights": ["Single overpriced line"], "recommended_questions": ["Was a premium grade shipped?"],
 "explanation": "The unit price far exceeds history."}"#;

    #[test]
    fn test_parse_embedded_json() {
        let value = parse_advisory_response(GOOD_RESPONSE).unwrap();
        assert_eq!(value["risk_level"], "HIGH");
    }

    #[test]
    fn test_parse_rejects_non_json() {
        assert!(matches!(
            parse_advisory_response("I cannot help with that."),
            Err(AdvisorError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_advisory_response("{not json}"),
            Err(AdvisorError::JsonParse(_))
        ));
    }

    #[test]
    fn test_sanitize_never_low_when_flagged() {
        let raw = json!({"risk_level": "low"});
        assert_eq!(sanitize(&raw, DecisionStatus::Flagged).risk_level, RiskLevel::Medium);
        assert_eq!(sanitize(&raw, DecisionStatus::Approved).risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_sanitize_defaults() {
        let raw = json!({"risk_level": "catastrophic", "insights": "not a list"});
        let analysis = sanitize(&raw, DecisionStatus::Approved);

        assert_eq!(analysis.risk_level, RiskLevel::Medium);
        assert_eq!(analysis.executive_summary, "No summary generated.");
        assert_eq!(analysis.explanation, "No explanation generated.");
        assert!(analysis.insights.is_empty());
        assert!(analysis.recommended_questions.is_empty());
    }

    #[test]
    fn test_sanitize_caps_and_truncates() {
        let raw = json!({
            "executive_summary": "s".repeat(800),
            "insights": ["a", "", "b", 42, "c", "d", "e", "f"],
            "recommended_questions": ["q".repeat(400), "q2", "q3", "q4"],
        });
        let analysis = sanitize(&raw, DecisionStatus::Flagged);

        assert_eq!(analysis.executive_summary.chars().count(), MAX_EXPLANATION_LEN);
        // First five entries, minus the blank and the non-string
        assert_eq!(analysis.insights, vec!["a", "b", "c"]);
        assert_eq!(analysis.recommended_questions.len(), MAX_QUESTIONS);
        assert_eq!(analysis.recommended_questions[0].chars().count(), MAX_ITEM_LEN);
    }

    #[test]
    fn test_advisor_success() {
        let (invoice, processed) = process(200.0);
        let advisor = Advisor::new(MockBackend::new().respond(GOOD_RESPONSE));
        let analysis = advisor.analyze(&invoice, &processed, None);

        assert!(analysis.ai_available);
        assert_eq!(analysis.model.as_deref(), Some("mock"));
        assert_eq!(analysis.risk_level, RiskLevel::High);
        assert_eq!(analysis.recommended_questions, vec!["Was a premium grade shipped?"]);
        // The decision itself is untouched
        assert_eq!(processed.decision.status(), DecisionStatus::Flagged);
    }

    #[test]
    fn test_advisor_retries_once() {
        let (invoice, processed) = process(200.0);
        let advisor = Advisor::new(MockBackend::new().fail("timeout").respond(GOOD_RESPONSE));
        let analysis = advisor.analyze(&invoice, &processed, None);

        assert_eq!(advisor.backend().calls(), 2);
        assert!(analysis.ai_available);
    }

    #[test]
    fn test_advisor_falls_back_after_retry_budget() {
        let (invoice, processed) = process(200.0);
        let advisor = Advisor::new(MockBackend::new().fail("timeout").fail("timeout"));
        let analysis = advisor.analyze(&invoice, &processed, None);

        assert_eq!(advisor.backend().calls(), 2);
        assert!(!analysis.ai_available);
        assert_eq!(analysis.risk_level, RiskLevel::Medium);
        assert_eq!(
            analysis.executive_summary,
            "Invoice INV-7 was FLAGGED by the deterministic system."
        );
        assert!(analysis.explanation.starts_with("Advisory call failed after 2 attempts"));
    }

    #[test]
    fn test_advisor_unavailable_skips_retries() {
        let (invoice, processed) = process(90.0);
        let advisor = Advisor::new(MockBackend::new());
        let analysis = advisor.analyze(&invoice, &processed, None);

        assert_eq!(advisor.backend().calls(), 1);
        assert!(!analysis.ai_available);
        assert_eq!(analysis.risk_level, RiskLevel::Low);
        assert!(analysis.explanation.starts_with("Advisory analysis skipped"));
    }

    #[test]
    fn test_advisor_invalid_json_falls_back() {
        let (invoice, processed) = process(200.0);
        let advisor = Advisor::new(MockBackend::new().respond("Looks fine to me!"));
        let analysis = advisor.analyze(&invoice, &processed, None);

        assert!(!analysis.ai_available);
        assert_eq!(
            analysis.explanation,
            "Advisor returned invalid JSON. Deterministic results only."
        );
    }

    proptest! {
        #[test]
        fn prop_sanitize_respects_limits(
            risk in "[a-zA-Z]{0,10}",
            summary in ".{0,700}",
            insights in prop::collection::vec(".{0,400}", 0..10),
            questions in prop::collection::vec(".{0,400}", 0..10),
            flagged in any::<bool>(),
        ) {
            let status = if flagged { DecisionStatus::Flagged } else { DecisionStatus::Approved };
            let raw = json!({
                "risk_level": risk,
                "executive_summary": summary,
                "insights": insights,
                "recommended_questions": questions,
            });
            let analysis = sanitize(&raw, status);

            prop_assert!(analysis.executive_summary.chars().count() <= MAX_EXPLANATION_LEN);
            prop_assert!(analysis.insights.len() <= MAX_INSIGHTS);
            prop_assert!(analysis.recommended_questions.len() <= MAX_QUESTIONS);
            prop_assert!(analysis.insights.iter().all(|i| i.chars().count() <= MAX_ITEM_LEN));
            prop_assert!(analysis.recommended_questions.iter().all(|q| q.chars().count() <= MAX_ITEM_LEN));
            if flagged {
                prop_assert_ne!(analysis.risk_level, RiskLevel::Low);
            }
        }
    }
}
