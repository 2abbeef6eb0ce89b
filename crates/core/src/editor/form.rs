//! Turns raw editor strings into a typed asset.
//!
//! Nothing here fails: every problem becomes a message in [`NormalizedAsset::errors`] and a
//! best-effort value still lands in the asset, so the caller decides whether to block the save.

use crate::domain::asset_view::{
    Asset, Chart, ChartPoint, Direction, Horizon, KeyLevels, Level, PriceOutlook,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const SUPPORT_FIELD: &str = "Support levels";
pub const RESISTANCE_FIELD: &str = "Resistance levels";
pub const POINTS_FIELD: &str = "Chart points";

/// Every editable field of an asset, as the editor submits it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssetForm {
    pub stance: String,
    pub direction: String,
    pub confidence: String,
    pub horizon: String,
    pub narrative_markdown: String,
    pub base_case: String,
    pub bull_case: String,
    pub bear_case: String,
    /// Comma or newline separated.
    pub catalysts: String,
    pub risks: String,
    pub tags: String,
    /// JSON arrays of `{label, value}` / `{time, value}`.
    pub support: String,
    pub resistance: String,
    pub series_name: String,
    pub unit: String,
    pub points: String,
}

impl AssetForm {
    /// Pre-filled form for editing `asset`.
    pub fn from_asset(asset: &Asset) -> Self {
        Self {
            stance: asset.stance.clone(),
            direction: asset.direction.to_string(),
            confidence: asset.confidence.to_string(),
            horizon: asset.horizon.to_string(),
            narrative_markdown: asset.narrative_markdown.clone(),
            base_case: asset.price_outlook.base_case.clone(),
            bull_case: asset.price_outlook.bull_case.clone(),
            bear_case: asset.price_outlook.bear_case.clone(),
            catalysts: asset.catalysts.join(", "),
            risks: asset.risks.join(", "),
            tags: asset.tags.join(", "),
            support: format_json(&asset.key_levels.support),
            resistance: format_json(&asset.key_levels.resistance),
            series_name: asset.chart.series_name.clone(),
            unit: asset.chart.unit.clone(),
            points: format_json(&asset.chart.points),
        }
    }
}

fn format_json<T: Serialize>(items: &[T]) -> String {
    serde_json::to_string_pretty(items).unwrap_or_else(|_| "[]".to_string())
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedAsset {
    pub asset: Asset,
    pub errors: Vec<String>,
}

pub fn parse_list(text: &str) -> Vec<String> {
    text.split(['\n', ','])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Blank input is an empty list, not an error.
pub fn parse_json_array(text: &str, field: &str, errors: &mut Vec<String>) -> Vec<Value> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(items)) => items,
        Ok(_) => {
            errors.push(format!("{field} must be a JSON array."));
            Vec::new()
        }
        Err(_) => {
            errors.push(format!("{field} must be valid JSON."));
            Vec::new()
        }
    }
}

pub fn normalize_levels(items: &[Value], field: &str, errors: &mut Vec<String>) -> Vec<Level> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let label = trimmed_str(item.get("label"));
            let value = coerce_number(item.get("value"));
            if label.is_empty() {
                errors.push(format!("{field}[{i}].label is required."));
            }
            if !value.is_finite() {
                errors.push(format!("{field}[{i}].value must be a number."));
            }
            Level { label, value }
        })
        .collect()
}

pub fn normalize_points(items: &[Value], field: &str, errors: &mut Vec<String>) -> Vec<ChartPoint> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let time = trimmed_str(item.get("time"));
            let value = coerce_number(item.get("value"));
            if time.is_empty() {
                errors.push(format!("{field}[{i}].time is required."));
            }
            if !value.is_finite() {
                errors.push(format!("{field}[{i}].value must be a number."));
            }
            ChartPoint { time, value }
        })
        .collect()
}

pub fn normalize_asset(form: &AssetForm, baseline: &Asset) -> NormalizedAsset {
    let mut errors = Vec::new();

    let support_raw = parse_json_array(&form.support, SUPPORT_FIELD, &mut errors);
    let resistance_raw = parse_json_array(&form.resistance, RESISTANCE_FIELD, &mut errors);
    let points_raw = parse_json_array(&form.points, POINTS_FIELD, &mut errors);

    // An unknown enum cannot live in the typed asset; the baseline value stands in.
    let direction = Direction::parse(&form.direction).unwrap_or_else(|| {
        errors.push("Direction must be Bullish, Bearish, or Neutral.".to_string());
        baseline.direction
    });
    let horizon = Horizon::parse(&form.horizon).unwrap_or_else(|| {
        errors.push("Horizon must be 1W, 1M, 3M, or 6M.".to_string());
        baseline.horizon
    });

    let confidence = string_to_number(&form.confidence);
    if !confidence.is_finite() || !(0.0..=100.0).contains(&confidence) {
        errors.push("Confidence must be a number between 0 and 100.".to_string());
    }

    let support = normalize_levels(&support_raw, SUPPORT_FIELD, &mut errors);
    let resistance = normalize_levels(&resistance_raw, RESISTANCE_FIELD, &mut errors);
    let points = normalize_points(&points_raw, POINTS_FIELD, &mut errors);

    let series_name = non_empty_or(&form.series_name, &baseline.chart.series_name);
    let unit = non_empty_or(&form.unit, &baseline.chart.unit);

    let asset = Asset {
        stance: form.stance.trim().to_string(),
        direction,
        confidence,
        horizon,
        narrative_markdown: form.narrative_markdown.trim().to_string(),
        price_outlook: PriceOutlook {
            base_case: form.base_case.trim().to_string(),
            bull_case: form.bull_case.trim().to_string(),
            bear_case: form.bear_case.trim().to_string(),
        },
        catalysts: parse_list(&form.catalysts),
        risks: parse_list(&form.risks),
        tags: parse_list(&form.tags),
        key_levels: KeyLevels {
            support,
            resistance,
        },
        chart: Chart {
            series_name,
            unit,
            points,
        },
        ..baseline.clone()
    };

    NormalizedAsset { asset, errors }
}

fn non_empty_or(raw: &str, fallback: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

fn trimmed_str(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Loose numeric conversion for editor input: numbers pass through, numeric strings parse,
/// blank strings, `null` and `false` are 0, `true` is 1, anything else is NaN.
fn coerce_number(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => string_to_number(s),
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        Some(Value::Null) => 0.0,
        _ => f64::NAN,
    }
}

fn string_to_number(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::asset_view::fixtures::document;
    use serde_json::json;

    fn baseline() -> Asset {
        document().assets.remove(0)
    }

    #[test]
    fn parse_list_splits_on_commas_and_newlines() {
        assert_eq!(parse_list("a, b\nc"), vec!["a", "b", "c"]);
        assert_eq!(parse_list(""), Vec::<String>::new());
        assert_eq!(parse_list("  ,  "), Vec::<String>::new());
        assert_eq!(parse_list("x,\n\n x ,y"), vec!["x", "x", "y"]);
    }

    #[test]
    fn json_array_fields_follow_the_empty_input_rule() {
        let mut errors = Vec::new();
        assert!(parse_json_array("", "Support levels", &mut errors).is_empty());
        assert!(parse_json_array("   \n", "Support levels", &mut errors).is_empty());
        assert!(errors.is_empty());

        assert!(parse_json_array("not json", "Support levels", &mut errors).is_empty());
        assert_eq!(errors, vec!["Support levels must be valid JSON."]);

        errors.clear();
        assert!(parse_json_array("{}", "Chart points", &mut errors).is_empty());
        assert_eq!(errors, vec!["Chart points must be a JSON array."]);
    }

    #[test]
    fn levels_keep_alignment_with_input_on_errors() {
        let items = vec![
            json!({"label": " S1 ", "value": "1980.5"}),
            json!({"value": 1950}),
            json!({"label": "S3", "value": "abc"}),
            json!(7),
        ];
        let mut errors = Vec::new();
        let levels = normalize_levels(&items, SUPPORT_FIELD, &mut errors);

        assert_eq!(levels.len(), 4);
        assert_eq!(levels[0], Level { label: "S1".to_string(), value: 1980.5 });
        assert_eq!(levels[1].label, "");
        assert!(levels[2].value.is_nan());
        assert_eq!(
            errors,
            vec![
                "Support levels[1].label is required.",
                "Support levels[2].value must be a number.",
                "Support levels[3].label is required.",
                "Support levels[3].value must be a number.",
            ]
        );
    }

    #[test]
    fn points_require_time_and_finite_value() {
        let items = vec![json!({"time": "2026-02-01", "value": 2036.9}), json!({"time": "  "})];
        let mut errors = Vec::new();
        let points = normalize_points(&items, POINTS_FIELD, &mut errors);
        assert_eq!(points.len(), 2);
        assert_eq!(
            errors,
            vec![
                "Chart points[1].time is required.",
                "Chart points[1].value must be a number.",
            ]
        );
    }

    #[test]
    fn unchanged_form_reproduces_the_baseline() {
        let base = baseline();
        let normalized = normalize_asset(&AssetForm::from_asset(&base), &base);
        assert!(normalized.errors.is_empty(), "{:?}", normalized.errors);
        assert_eq!(normalized.asset, base);
    }

    #[test]
    fn applies_edits_over_the_baseline() {
        let base = baseline();
        let form = AssetForm {
            stance: "  Trim into strength ".to_string(),
            direction: "Neutral".to_string(),
            confidence: "40".to_string(),
            horizon: "3M".to_string(),
            catalysts: "Payrolls\nFOMC, ".to_string(),
            support: r#"[{"label":"S1","value":1990}]"#.to_string(),
            resistance: String::new(),
            ..AssetForm::from_asset(&base)
        };
        let normalized = normalize_asset(&form, &base);

        assert!(normalized.errors.is_empty());
        let asset = normalized.asset;
        assert_eq!(asset.stance, "Trim into strength");
        assert_eq!(asset.direction, Direction::Neutral);
        assert_eq!(asset.confidence, 40.0);
        assert_eq!(asset.horizon, Horizon::ThreeMonths);
        assert_eq!(asset.catalysts, vec!["Payrolls", "FOMC"]);
        assert_eq!(asset.key_levels.support[0].value, 1990.0);
        assert!(asset.key_levels.resistance.is_empty());
        assert_eq!(asset.id, base.id);
        assert_eq!(asset.updated_at, base.updated_at);
    }

    #[test]
    fn reports_enum_and_confidence_problems() {
        let base = baseline();
        let form = AssetForm {
            direction: "Sideways".to_string(),
            horizon: "1Y".to_string(),
            confidence: "101".to_string(),
            ..AssetForm::from_asset(&base)
        };
        let normalized = normalize_asset(&form, &base);
        assert_eq!(
            normalized.errors,
            vec![
                "Direction must be Bullish, Bearish, or Neutral.",
                "Horizon must be 1W, 1M, 3M, or 6M.",
                "Confidence must be a number between 0 and 100.",
            ]
        );
        assert_eq!(normalized.asset.confidence, 101.0);
        assert_eq!(normalized.asset.direction, base.direction);

        let garbage = AssetForm {
            confidence: "lots".to_string(),
            ..AssetForm::from_asset(&base)
        };
        let normalized = normalize_asset(&garbage, &base);
        assert_eq!(normalized.errors.len(), 1);
        assert!(normalized.asset.confidence.is_nan());
    }

    #[test]
    fn blank_series_name_and_unit_fall_back_to_baseline() {
        let base = baseline();
        let form = AssetForm {
            series_name: "   ".to_string(),
            unit: String::new(),
            ..AssetForm::from_asset(&base)
        };
        let asset = normalize_asset(&form, &base).asset;
        assert_eq!(asset.chart.series_name, "Spot");
        assert_eq!(asset.chart.unit, "USD/oz");
    }
}
