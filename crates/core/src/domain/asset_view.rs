use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

pub const SCHEMA_VERSION: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Bullish,
    Bearish,
    Neutral,
}

impl Direction {
    pub const ALL: [Direction; 3] = [Direction::Bullish, Direction::Bearish, Direction::Neutral];

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Bullish => "Bullish",
            Direction::Bearish => "Bearish",
            Direction::Neutral => "Neutral",
        }
    }

    /// Exact, case-sensitive match against the wire names.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_str() == s)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Horizon {
    #[serde(rename = "1W")]
    OneWeek,
    #[serde(rename = "1M")]
    OneMonth,
    #[serde(rename = "3M")]
    ThreeMonths,
    #[serde(rename = "6M")]
    SixMonths,
}

impl Horizon {
    pub const ALL: [Horizon; 4] = [
        Horizon::OneWeek,
        Horizon::OneMonth,
        Horizon::ThreeMonths,
        Horizon::SixMonths,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Horizon::OneWeek => "1W",
            Horizon::OneMonth => "1M",
            Horizon::ThreeMonths => "3M",
            Horizon::SixMonths => "6M",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|h| h.as_str() == s)
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The whole persisted dataset. Unknown top-level fields ride along in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetViewDocument {
    pub schema_version: i64,
    pub assets: Vec<Asset>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AssetViewDocument {
    /// Placeholder used by export when nothing has been loaded yet. Not a valid document.
    pub fn empty() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            assets: Vec::new(),
            extra: Map::new(),
        }
    }

    /// First asset with the given id. Later duplicates are unreachable through this lookup.
    pub fn find_asset(&self, id: &str) -> Option<&Asset> {
        self.assets.iter().find(|a| a.id == id)
    }

    pub fn duplicate_ids(&self) -> Vec<&str> {
        let mut seen = std::collections::BTreeSet::new();
        let mut dups = Vec::new();
        for asset in &self.assets {
            if !seen.insert(asset.id.as_str()) && !dups.contains(&asset.id.as_str()) {
                dups.push(asset.id.as_str());
            }
        }
        dups
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: String,
    pub name: String,
    pub ticker: String,
    pub updated_at: String,
    pub stance: String,
    pub direction: Direction,
    pub confidence: f64,
    pub horizon: Horizon,
    pub key_levels: KeyLevels,
    pub narrative_markdown: String,
    pub price_outlook: PriceOutlook,
    pub catalysts: Vec<String>,
    pub risks: Vec<String>,
    pub tags: Vec<String>,
    pub chart: Chart,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revisions: Option<Vec<Revision>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct KeyLevels {
    pub support: Vec<Level>,
    pub resistance: Vec<Level>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceOutlook {
    pub base_case: String,
    pub bull_case: String,
    pub bear_case: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    pub series_name: String,
    pub unit: String,
    pub points: Vec<ChartPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub time: String,
    pub value: f64,
}

/// Snapshot of an asset's stance fields taken right before an edit replaced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Revision {
    pub updated_at: String,
    pub direction: Direction,
    pub stance: String,
    pub narrative_markdown: String,
}

impl Revision {
    pub fn snapshot_of(asset: &Asset) -> Self {
        Self {
            updated_at: asset.updated_at.clone(),
            direction: asset.direction,
            stance: asset.stance.clone(),
            narrative_markdown: asset.narrative_markdown.clone(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn enums_use_wire_names() {
        assert_eq!(serde_json::to_value(Horizon::ThreeMonths).unwrap(), json!("3M"));
        assert_eq!(Direction::parse("Bearish"), Some(Direction::Bearish));
        assert_eq!(Direction::parse("bearish"), None);
        assert_eq!(Horizon::parse("6M"), Some(Horizon::SixMonths));
        assert_eq!(Horizon::parse("1Y"), None);
    }

    #[test]
    fn unknown_fields_survive_a_round_trip() {
        let mut value = fixtures::document_json();
        value["generator"] = json!("desk-notes");
        value["assets"][0]["sector"] = json!("metals");

        let doc: AssetViewDocument = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(doc.extra.get("generator"), Some(&json!("desk-notes")));
        assert_eq!(doc.assets[0].extra.get("sector"), Some(&json!("metals")));
        assert_eq!(serde_json::to_value(&doc).unwrap(), value);
    }

    #[test]
    fn duplicate_ids_are_reported_once() {
        let mut doc = fixtures::document();
        doc.assets.push(doc.assets[0].clone());
        doc.assets.push(doc.assets[0].clone());
        assert_eq!(doc.duplicate_ids(), vec!["gold"]);
        assert_eq!(doc.find_asset("spx").map(|a| a.ticker.as_str()), Some("SPX"));
    }
}
