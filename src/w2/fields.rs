//! W-2 field schema and post-processing of the model's answer.

use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// Keys the model returned beyond the known schema. Kept as-is and written
/// back out next to the known fields.
pub type ExtraFields = Map<String, Value>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    #[serde(deserialize_with = "de_text")]
    pub street: String,
    #[serde(deserialize_with = "de_text")]
    pub city: String,
    #[serde(deserialize_with = "de_text")]
    pub state: String,
    #[serde(deserialize_with = "de_text")]
    pub zip: String,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Employee {
    #[serde(deserialize_with = "de_text")]
    pub name: String,
    #[serde(deserialize_with = "de_address")]
    pub address: Address,
    #[serde(deserialize_with = "de_text")]
    pub ssn_last4: String,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Employer {
    #[serde(deserialize_with = "de_text")]
    pub name: String,
    #[serde(deserialize_with = "de_address")]
    pub address: Address,
    #[serde(deserialize_with = "de_text")]
    pub ein: String,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// Only boxes 1-3 feed the insights; the rest are carried for display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FederalBoxes {
    #[serde(deserialize_with = "de_amount")]
    pub box1_wages: f64,
    #[serde(deserialize_with = "de_amount")]
    pub box2_federal_tax: f64,
    #[serde(deserialize_with = "de_amount")]
    pub box3_ss_wages: f64,
    #[serde(deserialize_with = "de_amount")]
    pub box4_ss_tax: f64,
    #[serde(deserialize_with = "de_amount")]
    pub box5_medicare_wages: f64,
    #[serde(deserialize_with = "de_amount")]
    pub box6_medicare_tax: f64,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateLocal {
    #[serde(deserialize_with = "de_text")]
    pub state_code: String,
    #[serde(deserialize_with = "de_amount")]
    pub state_wages: f64,
    #[serde(deserialize_with = "de_amount")]
    pub state_tax: f64,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct W2Fields {
    #[serde(deserialize_with = "de_section")]
    pub employee: Employee,
    #[serde(deserialize_with = "de_section")]
    pub employer: Employer,
    #[serde(deserialize_with = "de_section")]
    pub federal_boxes: FederalBoxes,
    #[serde(deserialize_with = "de_section")]
    pub state_local: StateLocal,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// Extracted fields, or the reason extraction failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExtractedFields {
    Fields(W2Fields),
    Error { error: String },
}

impl ExtractedFields {
    pub fn failed(reason: impl std::fmt::Display) -> Self {
        Self::Error {
            error: format!("Extraction failed: {reason}"),
        }
    }

    pub fn fields(&self) -> Option<&W2Fields> {
        match self {
            Self::Fields(f) => Some(f),
            Self::Error { .. } => None,
        }
    }
}

// Null or numeric values where text is expected ("zip": 12345).
fn de_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

// Models return amounts as numbers, numeric strings ("1,234.50"), null, or
// placeholders like "N/A". Anything that is not a number counts as 0.
fn de_amount<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| !matches!(c, ',' | '$' | ' '))
                .collect();
            cleaned.parse::<f64>().unwrap_or(0.0)
        }
        _ => 0.0,
    })
}

// A section the model left null or filled with something other than an
// object is treated as empty.
fn de_section<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned + Default,
{
    match Value::deserialize(deserializer)? {
        obj @ Value::Object(_) => serde_json::from_value(obj).map_err(serde::de::Error::custom),
        _ => Ok(T::default()),
    }
}

// Addresses sometimes come back as a single line of text.
fn de_address<'de, D>(deserializer: D) -> std::result::Result<Address, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(street) => Ok(Address {
            street,
            ..Default::default()
        }),
        obj @ Value::Object(_) => serde_json::from_value(obj).map_err(serde::de::Error::custom),
        _ => Ok(Address::default()),
    }
}

fn ssn_pattern() -> &'static Regex {
    static SSN: OnceLock<Regex> = OnceLock::new();
    // literal pattern; cannot fail at runtime
    SSN.get_or_init(|| Regex::new(r"\b\d{3}-\d{2}-(\d{4})\b").expect("SSN pattern is valid"))
}

/// Replace every `ddd-dd-dddd` with `XXX-XX-dddd`.
pub fn mask_ssn(text: &str) -> String {
    ssn_pattern().replace_all(text, "XXX-XX-$1").into_owned()
}

/// Slice from the first `{` to the last `}`; models like to wrap JSON in prose
/// or code fences.
pub fn extract_json_block(text: &str) -> &str {
    let text = text.trim();
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => &text[start..=end],
        _ => text,
    }
}

/// Parse a raw model answer into masked, typed fields.
///
/// Only a missing or malformed JSON object fails. Unreadable amounts become
/// 0 and unknown keys are kept in `extra`.
pub fn parse_model_output(raw: &str) -> Result<W2Fields> {
    let value: Value =
        serde_json::from_str(extract_json_block(raw)).context("model output is not JSON")?;
    let masked = mask_ssn(&serde_json::to_string(&value).context("re-serialize fields")?);
    let masked: Value = serde_json::from_str(&masked).context("re-parse masked fields")?;
    if !masked.is_object() {
        bail!("model output is not a JSON object");
    }
    serde_json::from_value(masked).context("model output does not match the W-2 schema")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_ssn() {
        assert_eq!(mask_ssn("ssn 123-45-6789."), "ssn XXX-XX-6789.");
        assert_eq!(
            mask_ssn("a 111-22-3333 b 444-55-6666"),
            "a XXX-XX-3333 b XXX-XX-6666"
        );
        // not a standalone SSN
        assert_eq!(mask_ssn("1123-45-67890"), "1123-45-67890");
        assert_eq!(mask_ssn("12-3456789"), "12-3456789");
    }

    #[test]
    fn test_extract_json_block() {
        assert_eq!(extract_json_block("```json\n{\"a\": {}}\n```"), "{\"a\": {}}");
        assert_eq!(extract_json_block("  plain  "), "plain");
        assert_eq!(extract_json_block("} backwards {"), "} backwards {");
    }

    #[test]
    fn test_parse_masks_nested_values() {
        let raw = r#"Here you go:
        {"employee": {"name": "JANE", "ssn_last4": "987-65-4321", "address": {"zip": 10001, "city": null}},
         "federal_boxes": {"box1_wages": "52,000.00", "box2_federal_tax": 5200, "box3_ss_wages": null},
         "state_local": {"state_code": "NY"}}"#;
        let fields = parse_model_output(raw).unwrap();
        assert_eq!(fields.employee.name, "JANE");
        assert_eq!(fields.employee.ssn_last4, "XXX-XX-4321");
        assert_eq!(fields.employee.address.zip, "10001");
        assert_eq!(fields.employee.address.city, "");
        assert_eq!(fields.federal_boxes.box1_wages, 52_000.0);
        assert_eq!(fields.federal_boxes.box2_federal_tax, 5_200.0);
        assert_eq!(fields.federal_boxes.box3_ss_wages, 0.0);
        assert_eq!(fields.state_local.state_code, "NY");
        assert_eq!(fields.employer, Employer::default());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_model_output("I cannot read this image").is_err());
        assert!(parse_model_output("[1, 2, 3]").is_err());
    }

    #[test]
    fn test_placeholder_amounts_count_as_zero() {
        let raw = r#"{"federal_boxes": {"box1_wages": 50000, "box2_federal_tax": 5000,
                      "box4_ss_tax": "N/A", "box6_medicare_tax": "lots", "box5_medicare_wages": [1]},
                      "state_local": {"state_code": "NY", "state_tax": "n/a"}}"#;
        let fields = parse_model_output(raw).unwrap();
        assert_eq!(fields.federal_boxes.box1_wages, 50_000.0);
        assert_eq!(fields.federal_boxes.box2_federal_tax, 5_000.0);
        assert_eq!(fields.federal_boxes.box4_ss_tax, 0.0);
        assert_eq!(fields.federal_boxes.box5_medicare_wages, 0.0);
        assert_eq!(fields.federal_boxes.box6_medicare_tax, 0.0);
        assert_eq!(fields.state_local.state_tax, 0.0);
    }

    #[test]
    fn test_unknown_keys_survive() {
        let raw = r#"{"tax_year": 2023,
                      "employee": {"name": "JANE", "ssn_full": "123-45-6789"},
                      "federal_boxes": {"box1_wages": 1000, "box12_codes": [{"code": "D", "amount": 500}]},
                      "employer": {"name": "ACME", "address": "1 MAIN ST, SPRINGFIELD"}}"#;
        let fields = parse_model_output(raw).unwrap();
        assert_eq!(fields.extra["tax_year"], 2023);
        assert_eq!(fields.employee.extra["ssn_full"], "XXX-XX-6789");
        assert_eq!(fields.employer.address.street, "1 MAIN ST, SPRINGFIELD");

        let out = serde_json::to_value(&fields).unwrap();
        assert_eq!(out["tax_year"], 2023);
        assert_eq!(out["federal_boxes"]["box12_codes"][0]["code"], "D");
        assert_eq!(out["federal_boxes"]["box1_wages"], 1000.0);
        assert_eq!(out["employee"]["name"], "JANE");
    }

    #[test]
    fn test_null_section_is_empty() {
        let fields = parse_model_output(r#"{"employer": null, "state_local": "none"}"#).unwrap();
        assert_eq!(fields.employer, Employer::default());
        assert_eq!(fields.state_local, StateLocal::default());
    }

    #[test]
    fn test_error_serializes_flat() {
        let v = serde_json::to_value(ExtractedFields::failed("boom")).unwrap();
        assert_eq!(v, serde_json::json!({"error": "Extraction failed: boom"}));
    }
}
