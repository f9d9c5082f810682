use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;
use stockpilot_models::{DecisionDraft, Opportunity, OpportunityType, RiskLevel, Urgency};
use tracing::debug;

use crate::error::AgentError;

/// Extract the first JSON object from a string that may contain surrounding text.
///
/// Handles common oracle response formats:
/// - Clean JSON: `{"key": "value"}`
/// - Markdown-wrapped: ```json\n{"key": "value"}\n```
/// - Prefix text: `Here is the analysis:\n{"key": "value"}`
pub fn extract_json(text: &str) -> Result<String, AgentError> {
    let trimmed = text.trim();

    // Try parsing the whole thing as JSON first
    if trimmed.starts_with('{') && serde_json::from_str::<Value>(trimmed).is_ok() {
        return Ok(trimmed.to_string());
    }

    // Try extracting from markdown code block
    if let Some(json_str) = extract_from_markdown_block(trimmed) {
        if json_str.starts_with('{') && serde_json::from_str::<Value>(&json_str).is_ok() {
            return Ok(json_str);
        }
    }

    // Try finding the first { ... } pair using brace matching
    if let Some(json_str) = extract_first_object(trimmed) {
        if serde_json::from_str::<Value>(&json_str).is_ok() {
            return Ok(json_str);
        }
    }

    Err(AgentError::MalformedOracleResponse(format!(
        "no JSON object found in response (length={})",
        text.len()
    )))
}

/// Extract JSON from a markdown code block (```json ... ``` or ``` ... ```)
fn extract_from_markdown_block(text: &str) -> Option<String> {
    let start_markers = ["```json\n", "```json\r\n", "```\n", "```\r\n"];

    for marker in &start_markers {
        if let Some(start) = text.find(marker) {
            let json_start = start + marker.len();
            if let Some(end) = text[json_start..].find("```") {
                let extracted = text[json_start..json_start + end].trim();
                return Some(extracted.to_string());
            }
        }
    }

    None
}

/// Find the first balanced { ... } in the text.
fn extract_first_object(text: &str) -> Option<String> {
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in text.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if !in_string && depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start {
                        return Some(text[s..=i].to_string());
                    }
                }
            }
            _ => {}
        }
    }

    None
}

/// Typed result of one oracle reply.
#[derive(Debug, Clone, PartialEq)]
pub struct OracleAnalysis {
    pub draft: DecisionDraft,
    /// Opportunity entries discarded because a numeric field could not be coerced.
    pub dropped: usize,
}

/// Turn raw oracle output into a decision draft.
///
/// Fails with `MalformedOracleResponse` when no JSON object can be found or
/// `opportunities` is present but not an array. Individual entries with
/// unusable numbers are dropped and counted rather than failing the reply.
pub fn parse_oracle_response(raw: &str) -> Result<OracleAnalysis, AgentError> {
    let json_str = extract_json(raw)?;
    let root: Value = serde_json::from_str(&json_str)
        .map_err(|e| AgentError::MalformedOracleResponse(format!("invalid JSON: {e}")))?;
    let Value::Object(root) = root else {
        return Err(AgentError::MalformedOracleResponse(
            "top level is not an object".to_string(),
        ));
    };

    let entries = match root.get("opportunities") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(other) => {
            return Err(AgentError::MalformedOracleResponse(format!(
                "opportunities is not an array: {other}"
            )))
        }
    };

    let mut opportunities = Vec::with_capacity(entries.len());
    let mut dropped = 0;
    for (index, entry) in entries.iter().enumerate() {
        match coerce_opportunity(entry) {
            Some(opportunity) => opportunities.push(opportunity),
            None => {
                debug!(index, entry = %entry, "Dropping unusable opportunity entry");
                dropped += 1;
            }
        }
    }

    let draft = DecisionDraft {
        opportunities,
        analysis_summary: root
            .get("analysis")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        recommendations: root
            .get("recommendations")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        risk_level: root
            .get("risk_level")
            .and_then(Value::as_str)
            .map(RiskLevel::from_label)
            .unwrap_or_default(),
        confidence_score: coerce_decimal(root.get("confidence_score"))
            .map(clamp_unit)
            .unwrap_or_default(),
    };

    Ok(OracleAnalysis { draft, dropped })
}

/// Coerce one opportunity entry; `None` when a numeric field is unusable.
fn coerce_opportunity(entry: &Value) -> Option<Opportunity> {
    let fields = entry.as_object()?;

    let kind = fields
        .get("type")
        .and_then(Value::as_str)
        .map(OpportunityType::from_label)
        .unwrap_or(OpportunityType::Unknown);

    Some(Opportunity {
        kind,
        confidence: clamp_unit(coerce_decimal(fields.get("confidence"))?),
        potential_profit: coerce_decimal(fields.get("potential_profit"))?,
        source_store: coerce_store(fields.get("source_store")),
        target_store: coerce_store(fields.get("target_store")),
        quantity: coerce_quantity(fields.get("quantity"))?,
        reasoning: fields
            .get("reasoning")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        urgency: fields
            .get("urgency")
            .and_then(Value::as_str)
            .map(Urgency::from_label)
            .unwrap_or_default(),
    })
}

/// Missing or null → 0; numbers and numeric strings parse; anything else fails.
fn coerce_decimal(value: Option<&Value>) -> Option<Decimal> {
    match value {
        None | Some(Value::Null) => Some(Decimal::ZERO),
        Some(Value::Number(n)) => parse_decimal(&n.to_string()),
        Some(Value::String(s)) => parse_decimal(s.trim()),
        Some(_) => None,
    }
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

fn clamp_unit(value: Decimal) -> Decimal {
    value.clamp(Decimal::ZERO, Decimal::ONE)
}

/// Non-negative whole units; fractions truncate, negatives fail.
fn coerce_quantity(value: Option<&Value>) -> Option<u32> {
    let quantity = coerce_decimal(value)?;
    if quantity.is_sign_negative() && !quantity.is_zero() {
        return None;
    }
    quantity.trunc().to_u32()
}

fn coerce_store(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}
