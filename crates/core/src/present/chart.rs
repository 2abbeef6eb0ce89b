use crate::domain::asset_view::{Chart, ChartPoint};
use crate::present::card::format_number;

pub const NO_CHART_DATA: &str = "No chart data available.";

pub trait ChartWidget: Send + Sync {
    fn render(&self, series_name: &str, unit: &str, points: &[ChartPoint]) -> String;
}

/// `None` when no widget is available: charts are skipped, not an error.
pub fn render_chart(widget: Option<&dyn ChartWidget>, chart: &Chart) -> Option<String> {
    let widget = widget?;
    if chart.points.is_empty() {
        return Some(NO_CHART_DATA.to_string());
    }
    Some(widget.render(&chart.series_name, &chart.unit, &chart.points))
}

/// One-line terminal chart: `Spot (USD/oz) ▁▄█ 2,021.4 -> 2,036.9`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SparklineChart;

const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

impl ChartWidget for SparklineChart {
    fn render(&self, series_name: &str, unit: &str, points: &[ChartPoint]) -> String {
        let values: Vec<f64> = points
            .iter()
            .map(|p| p.value)
            .filter(|v| v.is_finite())
            .collect();
        let (Some(first), Some(last)) = (values.first(), values.last()) else {
            return NO_CHART_DATA.to_string();
        };

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let range = max - min;
        let top = (BARS.len() - 1) as f64;

        let spark: String = values
            .iter()
            .map(|v| {
                let idx = if range > 0.0 {
                    ((v - min) / range * top).round() as usize
                } else {
                    0
                };
                BARS[idx.min(BARS.len() - 1)]
            })
            .collect();

        format!(
            "{series_name} ({unit}) {spark} {} -> {}",
            format_number(*first),
            format_number(*last)
        )
    }
}
