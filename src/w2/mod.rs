//! W-2 tax form extraction
//!
//! Sends a form image to a vision model, masks identification numbers in
//! the answer, and derives withholding insights. Extraction failures are
//! reported inside the result rather than raised.

pub mod fields;
pub mod gemini;
pub mod insights;

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::W2Config;
pub use fields::{mask_ssn, ExtractedFields, W2Fields};
pub use gemini::{GeminiClient, ImageExtractor};
pub use insights::generate_insights;

pub const EXTRACTION_PROMPT: &str = r#"
Analyze this W-2 tax form image and extract the data. Return your response as valid JSON only, with no additional text or explanation.

{
    "employee": {
        "name": "",
        "address": {"street": "", "city": "", "state": "", "zip": ""},
        "ssn_last4": ""
    },
    "employer": {
        "name": "",
        "address": {"street": "", "city": "", "state": "", "zip": ""},
        "ein": ""
    },
    "federal_boxes": {
        "box1_wages": 0,
        "box2_federal_tax": 0,
        "box3_ss_wages": 0,
        "box4_ss_tax": 0,
        "box5_medicare_wages": 0,
        "box6_medicare_tax": 0
    },
    "state_local": {
        "state_code": "",
        "state_wages": 0,
        "state_tax": 0
    }
}

Extract the exact values from the W-2 form. For SSN, only include last 4 digits. Convert amounts to numbers.
"#;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quality {
    pub confidence: String,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct W2Report {
    pub fields: ExtractedFields,
    pub insights: Vec<String>,
    pub quality: Quality,
}

/// Mime type from the file extension; JPEG when unknown.
pub fn mime_for_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("pdf") => "application/pdf",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

#[derive(Clone)]
pub struct W2Analyzer {
    extractor: Option<Arc<dyn ImageExtractor>>,
}

impl W2Analyzer {
    /// Test mode needs no credentials; live mode requires a Gemini key.
    pub fn new(config: &W2Config) -> Result<Self> {
        if config.test_mode {
            info!("W-2 analyzer in test mode (mock data)");
            return Ok(Self { extractor: None });
        }
        let client = GeminiClient::new(config)?;
        info!(model = client.model(), "W-2 analyzer using Gemini");
        Ok(Self::with_extractor(Arc::new(client)))
    }

    pub fn with_extractor(extractor: Arc<dyn ImageExtractor>) -> Self {
        Self {
            extractor: Some(extractor),
        }
    }

    pub fn is_test_mode(&self) -> bool {
        self.extractor.is_none()
    }

    pub async fn process_file(&self, path: &Path) -> Result<W2Report> {
        if self.is_test_mode() {
            return Ok(mock_report());
        }
        let image = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read W-2 file {}", path.display()))?;
        Ok(self.process_bytes(&image, mime_for_path(path)).await)
    }

    pub async fn process_bytes(&self, image: &[u8], mime_type: &str) -> W2Report {
        let Some(extractor) = &self.extractor else {
            return mock_report();
        };

        let fields = match extractor.extract(EXTRACTION_PROMPT, image, mime_type).await {
            Ok(raw) => match fields::parse_model_output(&raw) {
                Ok(f) => ExtractedFields::Fields(f),
                Err(e) => {
                    warn!(error = %format!("{e:#}"), "W-2 model output unusable");
                    ExtractedFields::failed(format!("{e:#}"))
                }
            },
            Err(e) => {
                warn!(error = %format!("{e:#}"), "W-2 extraction call failed");
                ExtractedFields::failed(format!("{e:#}"))
            }
        };

        let insights = fields.fields().map(generate_insights).unwrap_or_default();

        W2Report {
            fields,
            insights,
            quality: Quality {
                confidence: "medium".to_string(),
                warnings: Vec::new(),
            },
        }
    }
}

pub fn mock_fields() -> W2Fields {
    use fields::{Address, Employee, Employer, FederalBoxes, StateLocal};

    W2Fields {
        employee: Employee {
            name: "SAMPLE EMPLOYEE".to_string(),
            address: Address {
                street: "123 TEST ST".to_string(),
                city: "TESTVILLE".to_string(),
                state: "TX".to_string(),
                zip: "12345".to_string(),
                ..Default::default()
            },
            ssn_last4: "9999".to_string(),
            ..Default::default()
        },
        employer: Employer {
            name: "TEST COMPANY LLC".to_string(),
            address: Address {
                street: "456 CORP BLVD".to_string(),
                city: "BUSINESS CITY".to_string(),
                state: "TX".to_string(),
                zip: "54321".to_string(),
                ..Default::default()
            },
            ein: "XX-XXXXXXX99".to_string(),
            ..Default::default()
        },
        federal_boxes: FederalBoxes {
            box1_wages: 65_000.00,
            box2_federal_tax: 9_750.00,
            box3_ss_wages: 65_000.00,
            box4_ss_tax: 4_030.00,
            box5_medicare_wages: 65_000.00,
            box6_medicare_tax: 942.50,
            ..Default::default()
        },
        state_local: StateLocal {
            state_code: "TX".to_string(),
            state_wages: 65_000.00,
            state_tax: 0.00,
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn mock_report() -> W2Report {
    let fields = mock_fields();
    W2Report {
        insights: generate_insights(&fields),
        fields: ExtractedFields::Fields(fields),
        quality: Quality {
            confidence: "test".to_string(),
            warnings: vec!["Mock data used".to_string()],
        },
    }
}
