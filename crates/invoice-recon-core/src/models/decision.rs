//! Decision records and policy check results.

use serde::{Deserialize, Serialize};

/// Final status of an invoice.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionStatus {
    Approved,
    Flagged,
}

impl DecisionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionStatus::Approved => "APPROVED",
            DecisionStatus::Flagged => "FLAGGED",
        }
    }
}

impl std::fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Machine-readable cause for flagging an invoice.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonKind {
    VendorNotInApprovedList,
    VendorLowConfidenceMatch,
    MissingPrice,
    NewItemNoRateHistory,
    PriceAnomaly,
    PriceOutsideRange,
    MathDiscrepancy,
    ExtractionFailure,
}

/// How strongly a reason code argues against approval.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Hard,
    Soft,
}

impl ReasonKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonKind::VendorNotInApprovedList => "VENDOR_NOT_IN_APPROVED_LIST",
            ReasonKind::VendorLowConfidenceMatch => "VENDOR_LOW_CONFIDENCE_MATCH",
            ReasonKind::MissingPrice => "MISSING_PRICE",
            ReasonKind::NewItemNoRateHistory => "NEW_ITEM_NO_RATE_HISTORY",
            ReasonKind::PriceAnomaly => "PRICE_ANOMALY",
            ReasonKind::PriceOutsideRange => "PRICE_OUTSIDE_RANGE",
            ReasonKind::MathDiscrepancy => "MATH_DISCREPANCY",
            ReasonKind::ExtractionFailure => "EXTRACTION_FAILURE",
        }
    }

    /// Both severities flag the invoice; soft ones are price variance within
    /// the ratio gate.
    pub fn severity(&self) -> Severity {
        match self {
            ReasonKind::PriceOutsideRange => Severity::Soft,
            _ => Severity::Hard,
        }
    }
}

/// A reason code: a kind plus the item or warning it concerns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ReasonCode {
    pub kind: ReasonKind,
    pub subject: Option<String>,
}

impl ReasonCode {
    pub fn new(kind: ReasonKind) -> Self {
        Self { kind, subject: None }
    }

    pub fn with_subject(kind: ReasonKind, subject: impl Into<String>) -> Self {
        Self {
            kind,
            subject: Some(subject.into()),
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.subject {
            Some(subject) => write!(f, "{}:{}", self.kind.as_str(), subject),
            None => f.write_str(self.kind.as_str()),
        }
    }
}

/// Question attached to every decision that nothing else questioned.
pub const DEFAULT_QUESTION: &str = "This invoice passed all automated checks. Please confirm the \
    quantities and descriptions match what was actually received before final approval.";

/// Upper bound on clarifying questions per decision.
pub const MAX_QUESTIONS: usize = 3;

/// The approve/flag decision for one invoice.
///
/// Fields are read-only; the constructor derives `status` from the reason
/// codes and enforces 1..=`MAX_QUESTIONS` clarifying questions.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DecisionRecord {
    status: DecisionStatus,
    reason_codes: Vec<ReasonCode>,
    observations: Vec<String>,
    clarifying_questions: Vec<String>,
}

impl DecisionRecord {
    /// Build a decision record.
    ///
    /// Duplicate reason codes are dropped (first occurrence wins). Questions
    /// beyond `max_questions` are truncated in generation order; an empty
    /// question list gets [`DEFAULT_QUESTION`].
    pub fn new(
        reason_codes: Vec<ReasonCode>,
        observations: Vec<String>,
        mut clarifying_questions: Vec<String>,
        max_questions: usize,
    ) -> Self {
        let mut deduped: Vec<ReasonCode> = Vec::with_capacity(reason_codes.len());
        for code in reason_codes {
            if !deduped.contains(&code) {
                deduped.push(code);
            }
        }

        let status = if deduped.is_empty() {
            DecisionStatus::Approved
        } else {
            DecisionStatus::Flagged
        };

        if clarifying_questions.is_empty() {
            clarifying_questions.push(DEFAULT_QUESTION.to_string());
        }
        clarifying_questions.truncate(max_questions.clamp(1, MAX_QUESTIONS));

        Self {
            status,
            reason_codes: deduped,
            observations,
            clarifying_questions,
        }
    }

    pub fn status(&self) -> DecisionStatus {
        self.status
    }

    pub fn reason_codes(&self) -> &[ReasonCode] {
        &self.reason_codes
    }

    pub fn observations(&self) -> &[String] {
        &self.observations
    }

    pub fn clarifying_questions(&self) -> &[String] {
        &self.clarifying_questions
    }

    pub fn is_approved(&self) -> bool {
        self.status == DecisionStatus::Approved
    }

    /// Whether any reason code of the given kind is present.
    pub fn has_reason(&self, kind: ReasonKind) -> bool {
        self.reason_codes.iter().any(|c| c.kind == kind)
    }

    /// Strongest severity among the reason codes; `None` when approved.
    pub fn severity(&self) -> Option<Severity> {
        if self.reason_codes.is_empty() {
            None
        } else if self.reason_codes.iter().any(|c| c.kind.severity() == Severity::Hard) {
            Some(Severity::Hard)
        } else {
            Some(Severity::Soft)
        }
    }

    /// Reason codes rendered as `KIND:subject` strings.
    pub fn reason_strings(&self) -> Vec<String> {
        self.reason_codes.iter().map(|c| c.to_string()).collect()
    }
}

/// Outcome of a non-blocking policy observation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckStatus {
    Ok,
    Observation,
}

/// Tax or shipping observation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PolicyCheck {
    pub status: CheckStatus,
    /// Effective tax rate in percent (tax checks only)
    pub effective_rate_pct: Option<f64>,
    pub note: String,
}

impl PolicyCheck {
    pub fn ok(note: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Ok,
            effective_rate_pct: None,
            note: note.into(),
        }
    }

    pub fn observation(note: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Observation,
            effective_rate_pct: None,
            note: note.into(),
        }
    }

    pub fn with_rate(mut self, rate_pct: f64) -> Self {
        self.effective_rate_pct = Some(rate_pct);
        self
    }
}
