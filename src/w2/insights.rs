use super::fields::W2Fields;

/// Federal withholding below this share of wages is flagged as low.
pub const LOW_WITHHOLDING_PCT: f64 = 12.0;
/// Federal withholding above this share of wages is flagged as high.
pub const HIGH_WITHHOLDING_PCT: f64 = 22.0;
/// Social Security wage base used for the cap warning.
pub const SS_WAGE_CAP_WARN: f64 = 160_000.0;

/// Box 2 as a percentage of box 1, when there are wages.
pub fn federal_withholding_rate(fields: &W2Fields) -> Option<f64> {
    let fb = &fields.federal_boxes;
    (fb.box1_wages > 0.0).then(|| fb.box2_federal_tax / fb.box1_wages * 100.0)
}

/// State tax as a percentage of state wages, when both are present.
pub fn state_withholding_rate(fields: &W2Fields) -> Option<f64> {
    let sl = &fields.state_local;
    (sl.state_wages > 0.0 && sl.state_tax > 0.0).then(|| sl.state_tax / sl.state_wages * 100.0)
}

pub fn generate_insights(fields: &W2Fields) -> Vec<String> {
    let mut insights = Vec::new();

    if let Some(rate) = federal_withholding_rate(fields) {
        insights.push(format!("Federal withholding: {rate:.1}% of wages"));
        if rate < LOW_WITHHOLDING_PCT {
            insights.push("Low withholding - may owe taxes at filing".to_string());
        } else if rate > HIGH_WITHHOLDING_PCT {
            insights.push("High withholding - likely refund".to_string());
        }
    }

    if fields.federal_boxes.box3_ss_wages >= SS_WAGE_CAP_WARN {
        insights.push("Near Social Security wage cap".to_string());
    }

    if let Some(rate) = state_withholding_rate(fields) {
        insights.push(format!("State withholding: {rate:.1}% of state wages"));
    }

    let state_code = fields.state_local.state_code.trim();
    if !state_code.is_empty() {
        insights.push(format!("State tax filing required: {state_code}"));
    }

    insights
}
