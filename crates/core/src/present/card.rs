use crate::domain::asset_view::{Asset, AssetViewDocument, ChartPoint, Direction, Level};
use crate::present::chart::{render_chart, ChartWidget};
use crate::present::markdown::MarkdownRenderer;
use crate::time::clock::display_date;
use serde::Serialize;
use std::fmt;

/// Cards show only the newest revisions; the document keeps up to ten.
pub const HISTORY_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelLine {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlookBlock {
    pub label: &'static str,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub title: String,
    pub stance: String,
    pub note_html: String,
}

/// Display-ready view of one asset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetCard {
    pub id: String,
    pub title: String,
    pub subtitle: String,
    pub direction: Direction,
    pub stance: String,
    pub metrics: Vec<Metric>,
    pub support: Vec<LevelLine>,
    pub resistance: Vec<LevelLine>,
    pub narrative_html: String,
    pub outlook: Vec<OutlookBlock>,
    pub catalysts: Vec<String>,
    pub risks: Vec<String>,
    pub tags: Vec<String>,
    pub history: Vec<HistoryEntry>,
    /// Rendered by the chart widget, `None` when no widget is available.
    pub chart: Option<String>,
    pub chart_points: Vec<ChartPoint>,
}

impl AssetCard {
    pub fn build(
        asset: &Asset,
        renderer: &dyn MarkdownRenderer,
        chart: Option<&dyn ChartWidget>,
    ) -> Self {
        let metrics = vec![
            Metric {
                label: "Confidence",
                value: format!("{}%", asset.confidence),
            },
            Metric {
                label: "Horizon",
                value: asset.horizon.to_string(),
            },
            Metric {
                label: "Series",
                value: format!("{} ({})", asset.chart.series_name, asset.chart.unit),
            },
            Metric {
                label: "Catalysts",
                value: format!("{} items", asset.catalysts.len()),
            },
        ];

        let outlook = vec![
            OutlookBlock {
                label: "Base Case",
                html: renderer.render(&asset.price_outlook.base_case),
            },
            OutlookBlock {
                label: "Bull Case",
                html: renderer.render(&asset.price_outlook.bull_case),
            },
            OutlookBlock {
                label: "Bear Case",
                html: renderer.render(&asset.price_outlook.bear_case),
            },
        ];

        let history = asset
            .revisions
            .iter()
            .flatten()
            .take(HISTORY_LIMIT)
            .map(|r| HistoryEntry {
                title: format!("{} - {}", display_date(&r.updated_at), r.direction),
                stance: r.stance.clone(),
                note_html: renderer.render(&r.narrative_markdown),
            })
            .collect();

        Self {
            id: asset.id.clone(),
            title: asset.name.clone(),
            subtitle: format!("{} | Updated {}", asset.ticker, display_date(&asset.updated_at)),
            direction: asset.direction,
            stance: asset.stance.clone(),
            metrics,
            support: level_lines(&asset.key_levels.support),
            resistance: level_lines(&asset.key_levels.resistance),
            narrative_html: renderer.render(&asset.narrative_markdown),
            outlook,
            catalysts: asset.catalysts.clone(),
            risks: asset.risks.clone(),
            tags: asset.tags.clone(),
            history,
            chart: render_chart(chart, &asset.chart),
            chart_points: asset.chart.points.clone(),
        }
    }
}

pub fn build_cards(
    doc: &AssetViewDocument,
    renderer: &dyn MarkdownRenderer,
    chart: Option<&dyn ChartWidget>,
) -> Vec<AssetCard> {
    doc.assets
        .iter()
        .map(|asset| AssetCard::build(asset, renderer, chart))
        .collect()
}

fn level_lines(levels: &[Level]) -> Vec<LevelLine> {
    levels
        .iter()
        .map(|l| LevelLine {
            label: l.label.clone(),
            value: format_number(l.value),
        })
        .collect()
}

/// At most two decimals with thousands separators; non-finite values show as `-`.
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return "-".to_string();
    }
    let fixed = format!("{:.2}", value.abs());
    let fixed = fixed.trim_end_matches('0').trim_end_matches('.');
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed, None),
    };

    let mut out = String::with_capacity(fixed.len() + int_part.len() / 3 + 1);
    if value < 0.0 && fixed != "0" {
        out.push('-');
    }
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

impl fmt::Display for AssetCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} [{}]", self.title, self.direction)?;
        writeln!(f, "  {}", self.subtitle)?;
        if !self.stance.is_empty() {
            writeln!(f, "  {}", self.stance)?;
        }
        let metrics: Vec<String> = self
            .metrics
            .iter()
            .map(|m| format!("{}: {}", m.label, m.value))
            .collect();
        writeln!(f, "  {}", metrics.join(" | "))?;
        writeln!(f, "  Support: {}", join_levels(&self.support))?;
        writeln!(f, "  Resistance: {}", join_levels(&self.resistance))?;
        if !self.narrative_html.is_empty() {
            writeln!(f, "  Narrative: {}", self.narrative_html.trim())?;
        }
        for block in &self.outlook {
            writeln!(f, "  {}: {}", block.label, block.html.trim())?;
        }
        writeln!(f, "  Catalysts: {}", join_or(&self.catalysts, "None"))?;
        writeln!(f, "  Risks: {}", join_or(&self.risks, "None"))?;
        writeln!(f, "  Tags: {}", join_or(&self.tags, "no tags"))?;
        if let Some(chart) = &self.chart {
            writeln!(f, "  Chart: {chart}")?;
        }
        if self.history.is_empty() {
            writeln!(f, "  History: No revisions yet.")?;
        } else {
            writeln!(f, "  History:")?;
            for entry in &self.history {
                writeln!(f, "    {}: {}", entry.title, entry.stance)?;
            }
        }
        Ok(())
    }
}

fn join_levels(levels: &[LevelLine]) -> String {
    if levels.is_empty() {
        return "None".to_string();
    }
    levels
        .iter()
        .map(|l| format!("{} {}", l.label, l.value))
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_or(items: &[String], empty: &str) -> String {
    if items.is_empty() {
        empty.to_string()
    } else {
        items.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::asset_view::fixtures::document;
    use crate::domain::asset_view::Revision;
    use crate::present::chart::SparklineChart;
    use crate::present::markdown::PulldownRenderer;

    #[test]
    fn format_number_matches_display_rules() {
        assert_eq!(format_number(2036.9), "2,036.9");
        assert_eq!(format_number(1980.0), "1,980");
        assert_eq!(format_number(1234567.891), "1,234,567.89");
        assert_eq!(format_number(-0.004), "0");
        assert_eq!(format_number(-12.5), "-12.5");
        assert_eq!(format_number(f64::NAN), "-");
    }

    #[test]
    fn builds_card_from_asset() {
        let doc = document();
        let card = AssetCard::build(&doc.assets[0], &PulldownRenderer, None);

        assert_eq!(card.title, "Asset gold");
        assert_eq!(card.subtitle, "GOLD | Updated Feb 01, 2026, 09:00");
        assert_eq!(card.metrics[0].value, "65%");
        assert_eq!(card.metrics[2].value, "Spot (USD/oz)");
        assert_eq!(card.support[0].value, "1,980");
        assert!(card.narrative_html.contains("<strong>rolling over</strong>"));
        assert!(card.chart.is_none());
        assert_eq!(card.chart_points.len(), 2);
        assert!(card.to_string().contains("History: No revisions yet."));
    }

    #[test]
    fn history_is_limited_and_charts_render_with_a_widget() {
        let mut doc = document();
        let revision = Revision::snapshot_of(&doc.assets[0]);
        doc.assets[0].revisions = Some(vec![revision; 8]);
        doc.assets[0].tags.clear();

        let cards = build_cards(&doc, &PulldownRenderer, Some(&SparklineChart));
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].history.len(), HISTORY_LIMIT);
        assert_eq!(cards[0].history[0].title, "Feb 01, 2026, 09:00 - Bullish");
        assert!(cards[0].chart.as_deref().unwrap().starts_with("Spot (USD/oz)"));
        assert!(cards[0].to_string().contains("Tags: no tags"));
    }
}
