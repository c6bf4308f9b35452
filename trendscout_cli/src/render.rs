use crate::options::OutputFormat;
use trendscout::{InterestSeries, RegionCode, RunStatus, TimeWindow, TrendTable};

const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
/// Max sparkline characters.
const SPARK_WIDTH: usize = 52;

/// Render the table in the requested format.
pub fn render(
    table: &TrendTable,
    region: &RegionCode,
    window: TimeWindow,
    format: OutputFormat,
) -> String {
    match format {
        OutputFormat::Text => text(table, region, window),
        OutputFormat::Csv => csv(table),
        OutputFormat::Json => serde_json::to_string_pretty(table).unwrap_or_default(),
    }
}

/// Scores as block characters, averaged down to [`SPARK_WIDTH`].
pub fn sparkline(scores: &[u8]) -> String {
    if scores.is_empty() {
        return String::new();
    }

    let buckets = scores.len().min(SPARK_WIDTH);

    (0..buckets)
        .map(|b| {
            let start = b * scores.len() / buckets;
            let end = ((b + 1) * scores.len() / buckets).max(start + 1);
            let slice = &scores[start..end];
            let avg = slice.iter().map(|s| *s as usize).sum::<usize>() / slice.len();
            BARS[(avg.min(100) * (BARS.len() - 1) + 50) / 100]
        })
        .collect()
}

fn summary_line(series: &InterestSeries, width: usize) -> String {
    let scores: Vec<u8> = series.scores().collect();
    format!(
        "{:<width$}  {}  peak {:>3}  mean {:>5.1}  latest {:>3}",
        series.keyword,
        sparkline(&scores),
        series.peak().unwrap_or_default(),
        series.mean().unwrap_or_default(),
        series.latest().unwrap_or_default(),
        width = width
    )
}

fn text(table: &TrendTable, region: &RegionCode, window: TimeWindow) -> String {
    let mut out = format!("Interest over time, {} ({})\n", region.label(), window);

    if table.is_no_data() {
        out.push_str("no data found\n");
        return out;
    }

    let width = table.keywords().map(|k| k.chars().count()).max().unwrap_or(0);

    for series in table.iter() {
        out.push_str(&summary_line(series, width));
        out.push('\n');
    }

    if !table.no_data.is_empty() {
        out.push_str(&format!("no data found for: {}\n", table.no_data.join(", ")));
    }

    for failure in &table.failures {
        out.push_str(&format!(
            "request failed for {}: {}\n",
            failure.keywords.join(", "),
            failure.error
        ));
    }

    match table.status {
        RunStatus::Complete => (),
        status => out.push_str(&format!("stopped early ({}), results are partial\n", status)),
    }

    if table.spans_batches() {
        out.push_str(
            "note: scores are scaled per group of five keywords, compare shapes across groups, not values\n",
        );
    }

    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv(table: &TrendTable) -> String {
    let mut out = String::from("date");

    for keyword in table.keywords() {
        out.push(',');
        out.push_str(&csv_field(keyword));
    }
    out.push('\n');

    for (timestamp, cells) in table.rows() {
        out.push_str(&timestamp.format("%Y-%m-%d").to_string());
        for cell in cells {
            out.push(',');
            if let Some(score) = cell {
                out.push_str(&score.to_string());
            }
        }
        out.push('\n');
    }

    out
}
