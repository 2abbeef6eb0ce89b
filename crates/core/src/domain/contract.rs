//! The schema contract for asset view documents.
//!
//! Every externally sourced document (default dataset, stored override, imported file) goes
//! through [`validate`] before it is turned into typed values. The checks accumulate: one
//! message per violation, in document order.

use crate::domain::asset_view::{AssetViewDocument, Direction, Horizon, SCHEMA_VERSION};
use crate::error::ViewError;
use serde::Serialize;
use serde_json::{Map, Value};

pub const MAX_REVISIONS: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> Result<(), ViewError> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(ViewError::Validation(self.errors))
        }
    }
}

pub fn validate(candidate: &Value) -> ValidationReport {
    let Some(doc) = candidate.as_object() else {
        return ValidationReport {
            errors: vec!["Data must be an object.".to_string()],
        };
    };

    let mut errors = Vec::new();

    if doc.get("schemaVersion").and_then(Value::as_i64) != Some(SCHEMA_VERSION) {
        errors.push(format!("schemaVersion must be {SCHEMA_VERSION}."));
    }

    match doc.get("assets").and_then(Value::as_array) {
        Some(assets) if !assets.is_empty() => {
            for (index, asset) in assets.iter().enumerate() {
                check_asset(&format!("assets[{index}]"), asset, &mut errors);
            }
        }
        _ => errors.push("assets must be a non-empty array.".to_string()),
    }

    ValidationReport { errors }
}

/// Validates a typed document with the same rules as untrusted JSON.
///
/// Non-finite floats serialize to `null`, so a NaN confidence or level value produced by the
/// form normalizer is reported like any other non-number.
pub fn validate_document(doc: &AssetViewDocument) -> ValidationReport {
    match serde_json::to_value(doc) {
        Ok(value) => validate(&value),
        Err(err) => ValidationReport {
            errors: vec![format!("Document could not be serialized: {err}")],
        },
    }
}

impl AssetViewDocument {
    /// Validate, then deserialize. The only path from untrusted JSON to a typed document.
    pub fn from_untrusted(value: Value) -> Result<Self, ViewError> {
        validate(&value).into_result()?;
        serde_json::from_value(value).map_err(|e| ViewError::Parse(e.to_string()))
    }
}

pub fn parse_document(text: &str) -> Result<AssetViewDocument, ViewError> {
    let value = serde_json::from_str::<Value>(text).map_err(|e| ViewError::Parse(e.to_string()))?;
    AssetViewDocument::from_untrusted(value)
}

fn check_asset(prefix: &str, asset: &Value, errors: &mut Vec<String>) {
    let Some(asset) = asset.as_object() else {
        errors.push(format!("{prefix} must be an object."));
        return;
    };

    for key in ["id", "name", "ticker", "updatedAt"] {
        require_non_empty_string(asset.get(key), &format!("{prefix}.{key}"), errors);
    }
    require_string(asset.get("stance"), &format!("{prefix}.stance"), errors);
    require_direction(asset.get("direction"), &format!("{prefix}.direction"), errors);

    let confidence_ok = asset
        .get("confidence")
        .and_then(finite_number)
        .is_some_and(|c| (0.0..=100.0).contains(&c));
    if !confidence_ok {
        errors.push(format!(
            "{prefix}.confidence must be a number between 0 and 100."
        ));
    }

    let horizon_ok = asset
        .get("horizon")
        .and_then(Value::as_str)
        .and_then(Horizon::parse)
        .is_some();
    if !horizon_ok {
        let options: Vec<_> = Horizon::ALL.iter().map(|h| h.as_str()).collect();
        errors.push(format!("{prefix}.horizon must be {}.", options.join("/")));
    }

    let levels_path = format!("{prefix}.keyLevels");
    if let Some(levels) = require_object(asset.get("keyLevels"), &levels_path, errors) {
        for side in ["support", "resistance"] {
            let side_path = format!("{levels_path}.{side}");
            if let Some(items) = require_array(levels.get(side), &side_path, errors) {
                for (i, level) in items.iter().enumerate() {
                    let level = as_object_or_empty(level);
                    require_non_empty_string(
                        level.get("label"),
                        &format!("{side_path}[{i}].label"),
                        errors,
                    );
                    require_finite(level.get("value"), &format!("{side_path}[{i}].value"), errors);
                }
            }
        }
    }

    require_string(
        asset.get("narrativeMarkdown"),
        &format!("{prefix}.narrativeMarkdown"),
        errors,
    );

    let outlook_path = format!("{prefix}.priceOutlook");
    if let Some(outlook) = require_object(asset.get("priceOutlook"), &outlook_path, errors) {
        for case in ["baseCase", "bullCase", "bearCase"] {
            require_string(outlook.get(case), &format!("{outlook_path}.{case}"), errors);
        }
    }

    for key in ["catalysts", "risks"] {
        let path = format!("{prefix}.{key}");
        if let Some(items) = require_array(asset.get(key), &path, errors) {
            for (i, item) in items.iter().enumerate() {
                require_non_empty_string(Some(item), &format!("{path}[{i}]"), errors);
            }
        }
    }
    let tags_path = format!("{prefix}.tags");
    if let Some(tags) = require_array(asset.get("tags"), &tags_path, errors) {
        for (i, tag) in tags.iter().enumerate() {
            require_string(Some(tag), &format!("{tags_path}[{i}]"), errors);
        }
    }

    let chart_path = format!("{prefix}.chart");
    if let Some(chart) = require_object(asset.get("chart"), &chart_path, errors) {
        require_string(chart.get("seriesName"), &format!("{chart_path}.seriesName"), errors);
        require_string(chart.get("unit"), &format!("{chart_path}.unit"), errors);
        let points_path = format!("{chart_path}.points");
        if let Some(points) = require_array(chart.get("points"), &points_path, errors) {
            for (i, point) in points.iter().enumerate() {
                let point = as_object_or_empty(point);
                require_non_empty_string(
                    point.get("time"),
                    &format!("{points_path}[{i}].time"),
                    errors,
                );
                require_finite(point.get("value"), &format!("{points_path}[{i}].value"), errors);
            }
        }
    }

    // Absent and null both mean "no history".
    let revisions_path = format!("{prefix}.revisions");
    match asset.get("revisions") {
        None | Some(Value::Null) => {}
        Some(Value::Array(revisions)) => {
            if revisions.len() > MAX_REVISIONS {
                errors.push(format!(
                    "{revisions_path} must have at most {MAX_REVISIONS} entries."
                ));
            }
            for (i, revision) in revisions.iter().enumerate() {
                let path = format!("{revisions_path}[{i}]");
                let revision = as_object_or_empty(revision);
                require_string(revision.get("updatedAt"), &format!("{path}.updatedAt"), errors);
                require_direction(revision.get("direction"), &format!("{path}.direction"), errors);
                require_string(revision.get("stance"), &format!("{path}.stance"), errors);
                require_string(
                    revision.get("narrativeMarkdown"),
                    &format!("{path}.narrativeMarkdown"),
                    errors,
                );
            }
        }
        Some(_) => errors.push(format!("{revisions_path} must be an array.")),
    }
}

fn as_object_or_empty(value: &Value) -> &Map<String, Value> {
    static EMPTY: std::sync::OnceLock<Map<String, Value>> = std::sync::OnceLock::new();
    value
        .as_object()
        .unwrap_or_else(|| EMPTY.get_or_init(Map::new))
}

fn finite_number(value: &Value) -> Option<f64> {
    value.as_f64().filter(|v| v.is_finite())
}

fn require_string(value: Option<&Value>, path: &str, errors: &mut Vec<String>) {
    if !matches!(value, Some(Value::String(_))) {
        errors.push(format!("{path} must be a string."));
    }
}

fn require_non_empty_string(value: Option<&Value>, path: &str, errors: &mut Vec<String>) {
    match value {
        Some(Value::String(s)) if !s.is_empty() => {}
        _ => errors.push(format!("{path} must be a non-empty string.")),
    }
}

fn require_finite(value: Option<&Value>, path: &str, errors: &mut Vec<String>) {
    if value.and_then(finite_number).is_none() {
        errors.push(format!("{path} must be a finite number."));
    }
}

fn require_direction(value: Option<&Value>, path: &str, errors: &mut Vec<String>) {
    if value.and_then(Value::as_str).and_then(Direction::parse).is_none() {
        let options: Vec<_> = Direction::ALL.iter().map(|d| d.as_str()).collect();
        errors.push(format!("{path} must be {}.", options.join("/")));
    }
}

fn require_object<'a>(
    value: Option<&'a Value>,
    path: &str,
    errors: &mut Vec<String>,
) -> Option<&'a Map<String, Value>> {
    let obj = value.and_then(Value::as_object);
    if obj.is_none() {
        errors.push(format!("{path} must be an object."));
    }
    obj
}

fn require_array<'a>(
    value: Option<&'a Value>,
    path: &str,
    errors: &mut Vec<String>,
) -> Option<&'a Vec<Value>> {
    let arr = value.and_then(Value::as_array);
    if arr.is_none() {
        errors.push(format!("{path} must be an array."));
    }
    arr
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::asset_view::fixtures::{asset_json, document, document_json};
    use serde_json::json;

    #[test]
    fn accepts_a_well_formed_document() {
        let report = validate(&document_json());
        assert!(report.is_ok(), "{:?}", report.errors);
        assert!(validate_document(&document()).is_ok());
    }

    #[test]
    fn non_object_fails_fast_with_one_error() {
        for candidate in [json!(null), json!([1, 2]), json!("doc"), json!(42)] {
            assert_eq!(validate(&candidate).errors, vec!["Data must be an object."]);
        }
    }

    #[test]
    fn empty_or_missing_assets_is_reported_after_schema_version() {
        let report = validate(&json!({"schemaVersion": 2, "assets": []}));
        assert_eq!(
            report.errors,
            vec!["schemaVersion must be 1.", "assets must be a non-empty array."]
        );
        assert_eq!(validate(&json!({"schemaVersion": 1})).errors.len(), 1);
        // 1.0 is not the integer version tag.
        let mut doc = document_json();
        doc["schemaVersion"] = json!(1.0);
        assert_eq!(validate(&doc).errors, vec!["schemaVersion must be 1."]);
    }

    #[test]
    fn rejects_unknown_direction_naming_the_options() {
        let mut doc = document_json();
        doc["assets"][0]["direction"] = json!("Sideways");
        let report = validate(&doc);
        assert!(!report.is_ok());
        assert_eq!(
            report.errors,
            vec!["assets[0].direction must be Bullish/Bearish/Neutral."]
        );

        doc["assets"][0]["direction"] = json!("bullish");
        assert_eq!(validate(&doc).errors.len(), 1);
    }

    #[test]
    fn collects_every_defect_in_document_order() {
        let mut doc = document_json();
        doc["assets"][0]["direction"] = json!("Sideways");
        doc["assets"][0]["confidence"] = json!(140);
        doc["assets"][1]["chart"]["points"][1]["value"] = json!("2036.9");
        doc["assets"][1]["keyLevels"]["support"][0]["label"] = json!("");

        let report = validate(&doc);
        assert_eq!(
            report.errors,
            vec![
                "assets[0].direction must be Bullish/Bearish/Neutral.",
                "assets[0].confidence must be a number between 0 and 100.",
                "assets[1].keyLevels.support[0].label must be a non-empty string.",
                "assets[1].chart.points[1].value must be a finite number.",
            ]
        );
    }

    #[test]
    fn confidence_boundaries() {
        for (confidence, ok) in [
            (-0.0001, false),
            (0.0, true),
            (100.0, true),
            (100.0001, false),
        ] {
            let mut doc = document_json();
            doc["assets"][0]["confidence"] = json!(confidence);
            assert_eq!(validate(&doc).is_ok(), ok, "confidence {confidence}");
        }
    }

    #[test]
    fn non_finite_values_in_typed_documents_are_rejected() {
        let mut doc = document();
        doc.assets[0].confidence = f64::NAN;
        doc.assets[1].key_levels.resistance[0].value = f64::INFINITY;
        let report = validate_document(&doc);
        assert_eq!(
            report.errors,
            vec![
                "assets[0].confidence must be a number between 0 and 100.",
                "assets[1].keyLevels.resistance[0].value must be a finite number.",
            ]
        );
    }

    #[test]
    fn checks_revisions_when_present() {
        let mut doc = document_json();
        doc["assets"][0]["revisions"] = json!([
            {"updatedAt": "2026-01-01T00:00:00.000Z", "direction": "Neutral", "stance": "", "narrativeMarkdown": ""},
            {"updatedAt": 5, "direction": "Up", "stance": "x", "narrativeMarkdown": "y"}
        ]);
        assert_eq!(
            validate(&doc).errors,
            vec![
                "assets[0].revisions[1].updatedAt must be a string.",
                "assets[0].revisions[1].direction must be Bullish/Bearish/Neutral.",
            ]
        );

        let revision = json!({"updatedAt": "t", "direction": "Bearish", "stance": "", "narrativeMarkdown": ""});
        doc["assets"][0]["revisions"] = json!(vec![revision; MAX_REVISIONS + 1]);
        assert_eq!(
            validate(&doc).errors,
            vec!["assets[0].revisions must have at most 10 entries."]
        );

        doc["assets"][0]["revisions"] = Value::Null;
        assert!(validate(&doc).is_ok());
    }

    #[test]
    fn list_fields_require_strings() {
        let mut asset = asset_json("gold");
        asset["catalysts"] = json!(["CPI", ""]);
        asset["tags"] = json!(["", 3]);
        asset["risks"] = json!("Fed");
        let report = validate(&json!({"schemaVersion": 1, "assets": [asset]}));
        assert_eq!(
            report.errors,
            vec![
                "assets[0].catalysts[1] must be a non-empty string.",
                "assets[0].risks must be an array.",
                "assets[0].tags[1] must be a string.",
            ]
        );
    }

    #[test]
    fn ignores_unknown_fields_and_flags_non_object_assets() {
        let mut doc = document_json();
        doc["theme"] = json!("dark");
        doc["assets"][0]["analyst"] = json!({"name": "A"});
        assert!(validate(&doc).is_ok());

        doc["assets"][1] = json!("spx");
        assert_eq!(validate(&doc).errors, vec!["assets[1] must be an object."]);
    }

    #[test]
    fn validation_does_not_mutate_input() {
        let mut doc = document_json();
        doc["assets"][0]["horizon"] = json!("2Y");
        let before = doc.clone();
        let _ = validate(&doc);
        let _ = validate(&doc);
        assert_eq!(doc, before);
    }

    #[test]
    fn parse_document_distinguishes_parse_and_validation_failures() {
        assert!(matches!(parse_document("{not json"), Err(ViewError::Parse(_))));
        assert!(matches!(
            parse_document("{\"schemaVersion\": 1, \"assets\": []}"),
            Err(ViewError::Validation(errors)) if errors.len() == 1
        ));
        let doc = parse_document(&document_json().to_string()).unwrap();
        assert_eq!(doc.assets.len(), 2);
    }
}
