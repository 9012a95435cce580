//! Formats an `Analysis` as plain text, CSV, HTML or a comparative matrix,
//! and writes it to a timestamped file.
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fmt::{self, Write};
use std::fs;
use std::path::{Path, PathBuf};

use crate::report::{Analysis, PairReport, SetSummary, Similarity};
use crate::typed::Summary;

/// Dates inside reports
pub const REPORT_DATE: &str = "%d/%m/%Y %H:%M:%S";

/// The plain text report lists at most this many unique elements
pub const UNIQUE_SHOWN: usize = 20;

/// The comparative matrix's cell width
const CELL: usize = 12;

// Column widths of the plain text tables
const KIND: usize = 10;
const COUNT: usize = 10;
const RATIO: usize = 9;
const RELATION: usize = 16;

/// The available renderings
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum ReportFormat {
    /// The full plain text report
    Text,
    /// One CSV row per set
    Csv,
    /// A self-contained HTML page
    Html,
    /// The Jaccard matrix, pairwise figures and ranking, as text
    Comparative,
}

impl ReportFormat {
    /// File extension, without the dot
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Text | ReportFormat::Comparative => "txt",
            ReportFormat::Csv => "csv",
            ReportFormat::Html => "html",
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            ReportFormat::Text => "relatorio_conjuntos",
            ReportFormat::Csv | ReportFormat::Html => "conjuntos",
            ReportFormat::Comparative => "relatorio_comparativo",
        }
    }

    /// `<prefix>_<milliseconds since the epoch>.<extension>`
    #[must_use]
    pub fn file_name(self, at: DateTime<Local>) -> String {
        format!("{}_{}.{}", self.prefix(), at.timestamp_millis(), self.extension())
    }
}

/// Renders `analysis` in `format`
pub fn render(analysis: &Analysis, format: ReportFormat) -> Result<String, fmt::Error> {
    let mut out = String::new();
    match format {
        ReportFormat::Text => text(analysis, &mut out)?,
        ReportFormat::Csv => csv(analysis, &mut out)?,
        ReportFormat::Html => html(analysis, &mut out)?,
        ReportFormat::Comparative => comparative(analysis, &mut out)?,
    }
    Ok(out)
}

/// Renders `analysis` into a new file in `out_dir`, named after the format
/// and the analysis time, and returns its path.
pub fn write_report(analysis: &Analysis, format: ReportFormat, out_dir: &Path) -> Result<PathBuf> {
    let path = out_dir.join(format.file_name(analysis.generated));
    let rendered = render(analysis, format).context("Can't format report")?;
    fs::write(&path, rendered).with_context(|| format!("Can't write report: {}", path.display()))?;
    tracing::info!(path = %path.display(), ?format, "report written");
    Ok(path)
}

fn braced(elements: &[String]) -> String {
    format!("{{{}}}", elements.join(", "))
}

fn pair_title(analysis: &Analysis, pair: &PairReport) -> String {
    let (a, b) = analysis.names(pair);
    format!("{a} x {b}")
}

/// Widest of `header` and `cells`, in characters
fn column_width<'a>(header: &str, cells: impl Iterator<Item = &'a str>) -> usize {
    cells.map(|cell| cell.chars().count()).fold(header.chars().count(), usize::max)
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 * 100.0 / whole as f64
}

fn summary_lines(set: &SetSummary, out: &mut String) -> fmt::Result {
    match &set.summary {
        Summary::Numeric(Some(n)) => writeln!(
            out,
            "   Min: {}  Max: {}  Sum: {}  Mean: {:.2}",
            n.min, n.max, n.sum, n.mean
        ),
        Summary::Words(Some(w)) => writeln!(
            out,
            "   Words: {}  Characters: {}  Mean length: {:.2}  Shortest: {}  Longest: {}",
            w.words, w.characters, w.mean_length, w.shortest, w.longest
        ),
        Summary::Numeric(None) | Summary::Words(None) => Ok(()),
    }
}

fn text(analysis: &Analysis, out: &mut String) -> fmt::Result {
    writeln!(out, "=== SET REPORT ===")?;
    writeln!(out, "Generated: {}", analysis.generated.format(REPORT_DATE))?;
    writeln!(out, "Sets analysed: {}", analysis.sets.len())?;

    writeln!(out, "\n--- SETS ---")?;
    let name = column_width("Set", analysis.sets.iter().map(|set| set.name.as_str()));
    writeln!(out, "{:>3}  {:<name$}  {:<KIND$}{:>6}  {:<CELL$}  {}", "#", "Set", "Type", "Size", "First", "Last")?;
    for (i, set) in analysis.sets.iter().enumerate() {
        writeln!(
            out,
            "{:>3}  {:<name$}  {:<KIND$}{:>6}  {:<CELL$}  {}",
            i + 1,
            set.name,
            set.kind.label(),
            set.size(),
            set.first.as_deref().unwrap_or("-"),
            set.last.as_deref().unwrap_or("-")
        )?;
    }
    writeln!(out)?;
    for set in &analysis.sets {
        writeln!(out, "{} = {}", set.name, braced(&set.elements))?;
        summary_lines(set, out)?;
    }

    let stats = &analysis.statistics;
    writeln!(out, "\n--- GENERAL STATISTICS ---")?;
    writeln!(out, "Total elements (with repetition): {}", stats.total_elements)?;
    writeln!(out, "Distinct elements: {}", stats.distinct_elements)?;
    writeln!(out, "Mean size: {:.2}", stats.mean_size)?;
    writeln!(out, "Largest set: {}  Smallest set: {}", stats.largest, stats.smallest)?;
    writeln!(out, "Size spread: {}", stats.spread())?;
    writeln!(out, "Size distribution:")?;
    for &(size, count) in &stats.size_distribution {
        let share = percent(count, analysis.sets.len());
        writeln!(out, "  {size} elements: {count} set(s) ({share:.1}%)")?;
    }

    writeln!(out, "\n--- PAIRWISE COMPARISON ---")?;
    let titles: Vec<String> = analysis.pairs.iter().map(|pair| pair_title(analysis, pair)).collect();
    let title = column_width("Pair", titles.iter().map(String::as_str));
    writeln!(
        out,
        "{:<title$}{:>COUNT$}{:>COUNT$}{:>COUNT$}{:>COUNT$}{:>COUNT$}{:>RATIO$}{:>RATIO$}  {:<RELATION$}{}",
        "Pair", "|A U B|", "|A INT B|", "|A - B|", "|B - A|", "|A XOR B|", "Jaccard", "Dice", "Relation", "Identity"
    )?;
    for (pair, name) in analysis.pairs.iter().zip(&titles) {
        writeln!(
            out,
            "{name:<title$}{:>COUNT$}{:>COUNT$}{:>COUNT$}{:>COUNT$}{:>COUNT$}{:>RATIO$.3}{:>RATIO$.3}  {:<RELATION$}{} = {} ({})",
            pair.union,
            pair.intersection,
            pair.left_only,
            pair.right_only,
            pair.symmetric_difference,
            pair.jaccard,
            pair.dice,
            pair.relation.label(),
            pair.identity.lhs,
            pair.identity.rhs,
            if pair.identity.holds() { "holds" } else { "FAILS" }
        )?;
    }

    writeln!(out, "\n--- SIMILARITY RANKING ---")?;
    for (rank, pair) in analysis.ranked().enumerate() {
        let bucket = Similarity::of(pair.jaccard).label();
        writeln!(out, "{:>3}. {:<title$}  {:.3}  {bucket}", rank + 1, pair_title(analysis, pair), pair.jaccard)?;
    }

    writeln!(out, "\n--- ELEMENT FREQUENCY ---")?;
    writeln!(out, "Most shared:")?;
    for f in analysis.most_shared() {
        writeln!(out, "  {}: {} set(s)", f.element, f.sets)?;
    }
    let unique: Vec<&str> = analysis.unique().map(|f| f.element.as_str()).collect();
    writeln!(out, "Unique to one set: {}", unique.len())?;
    if !unique.is_empty() {
        let shown = &unique[..unique.len().min(UNIQUE_SHOWN)];
        write!(out, "  {}", shown.join(", "))?;
        if unique.len() > UNIQUE_SHOWN {
            write!(out, " ... and {} more", unique.len() - UNIQUE_SHOWN)?;
        }
        writeln!(out)?;
    }

    if let Some(mean) = stats.mean_jaccard {
        writeln!(out, "\n--- OVERALL SIMILARITY ---")?;
        writeln!(out, "Mean Jaccard: {mean:.3} ({})", Similarity::of(mean).label())?;
    }
    Ok(())
}

fn csv_field(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn csv(analysis: &Analysis, out: &mut String) -> fmt::Result {
    writeln!(out, "Nome,Elementos,Cardinalidade,Primeiro,Ultimo")?;
    for set in &analysis.sets {
        writeln!(
            out,
            "{},{},{},{},{}",
            csv_field(&set.name),
            csv_field(&set.elements.join("; ")),
            set.size(),
            csv_field(set.first.as_deref().unwrap_or("")),
            csv_field(set.last.as_deref().unwrap_or("")),
        )?;
    }
    Ok(())
}

/// Escapes the characters HTML gives a meaning to
fn escaped(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

const STYLE: &str = "body { font-family: sans-serif; margin: 2em; color: #222; }
h1 { color: #2c5f2d; }
table { border-collapse: collapse; margin-bottom: 2em; }
th, td { border: 1px solid #bbb; padding: 4px 10px; text-align: left; }
th { background: #e8f0e8; }
td.number { text-align: right; }";

fn html(analysis: &Analysis, out: &mut String) -> fmt::Result {
    writeln!(out, "<!DOCTYPE html>")?;
    writeln!(out, "<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">")?;
    writeln!(out, "<title>Set report</title>\n<style>\n{STYLE}\n</style>\n</head>\n<body>")?;
    writeln!(out, "<h1>Set report</h1>")?;
    writeln!(out, "<p>Generated: {}</p>", analysis.generated.format(REPORT_DATE))?;

    writeln!(out, "<h2>Sets</h2>\n<table>")?;
    writeln!(out, "<tr><th>Name</th><th>Type</th><th>Elements</th><th>Cardinality</th></tr>")?;
    for set in &analysis.sets {
        writeln!(
            out,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td class=\"number\">{}</td></tr>",
            escaped(&set.name),
            set.kind.label(),
            escaped(&braced(&set.elements)),
            set.size()
        )?;
    }
    writeln!(out, "</table>")?;

    if !analysis.pairs.is_empty() {
        writeln!(out, "<h2>Pairwise comparison</h2>\n<table>")?;
        writeln!(
            out,
            "<tr><th>Pair</th><th>Union</th><th>Intersection</th><th>Jaccard</th>\
             <th>Dice</th><th>Relation</th></tr>"
        )?;
        for pair in analysis.ranked() {
            writeln!(
                out,
                "<tr><td>{}</td><td class=\"number\">{}</td><td class=\"number\">{}</td>\
                 <td class=\"number\">{:.3}</td><td class=\"number\">{:.3}</td><td>{}</td></tr>",
                escaped(&pair_title(analysis, pair)),
                pair.union,
                pair.intersection,
                pair.jaccard,
                pair.dice,
                pair.relation.label()
            )?;
        }
        writeln!(out, "</table>")?;
    }

    let stats = &analysis.statistics;
    writeln!(out, "<h2>Statistics</h2>\n<ul>")?;
    writeln!(out, "<li>Total elements: {}</li>", stats.total_elements)?;
    writeln!(out, "<li>Distinct elements: {}</li>", stats.distinct_elements)?;
    writeln!(out, "<li>Mean size: {:.2}</li>", stats.mean_size)?;
    if let Some(mean) = stats.mean_jaccard {
        writeln!(out, "<li>Mean Jaccard: {mean:.3} ({})</li>", Similarity::of(mean).label())?;
    }
    writeln!(out, "</ul>\n</body>\n</html>")?;
    Ok(())
}

fn comparative(analysis: &Analysis, out: &mut String) -> fmt::Result {
    writeln!(out, "=== COMPARATIVE REPORT ===")?;
    writeln!(out, "Generated: {}", analysis.generated.format(REPORT_DATE))?;

    writeln!(out, "\nJACCARD MATRIX")?;
    write!(out, "{:>CELL$}", "")?;
    for set in &analysis.sets {
        write!(out, "{:>CELL$}", set.name)?;
    }
    writeln!(out)?;
    for (set, row) in analysis.sets.iter().zip(&analysis.matrix) {
        write!(out, "{:>CELL$}", set.name)?;
        for j in row {
            write!(out, "{j:>CELL$.3}")?;
        }
        writeln!(out)?;
    }

    writeln!(out, "\nPAIRS")?;
    for pair in &analysis.pairs {
        writeln!(
            out,
            "{}: union {}, intersection {}, differences {}/{}, Jaccard {:.3}, Dice {:.3}, {}",
            pair_title(analysis, pair),
            pair.union,
            pair.intersection,
            pair.left_only,
            pair.right_only,
            pair.jaccard,
            pair.dice,
            pair.relation.label()
        )?;
    }

    writeln!(out, "\nRANKING")?;
    for (rank, pair) in analysis.ranked().enumerate() {
        writeln!(out, "{:>3}. {:<30} {:.3}", rank + 1, pair_title(analysis, pair), pair.jaccard)?;
    }
    Ok(())
}

#[allow(clippy::pedantic)]
#[cfg(test)]
mod test {
    use super::*;
    use crate::typed::{self, SetKind, TypedSet};
    use assert_fs::TempDir;
    use chrono::TimeZone;

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap()
    }

    fn sample() -> Analysis {
        let a = typed::parse("1 2 3 4 5", SetKind::Integer).set;
        let b = typed::parse("4 5 6 7 8", SetKind::Integer).set;
        let w = TypedSet::tokens(["say \"hi\"", "<b>"]);
        Analysis::compute([("A", &a), ("B", &b), ("W&Co", &w)], at())
    }

    #[test]
    fn file_names_carry_the_timestamp() {
        let millis = at().timestamp_millis();
        assert_eq!(ReportFormat::Text.file_name(at()), format!("relatorio_conjuntos_{millis}.txt"));
        assert_eq!(ReportFormat::Csv.file_name(at()), format!("conjuntos_{millis}.csv"));
        assert_eq!(ReportFormat::Html.file_name(at()), format!("conjuntos_{millis}.html"));
        assert_eq!(
            ReportFormat::Comparative.file_name(at()),
            format!("relatorio_comparativo_{millis}.txt")
        );
    }

    #[test]
    fn csv_rows_are_quoted() {
        let csv = render(&sample(), ReportFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "Nome,Elementos,Cardinalidade,Primeiro,Ultimo");
        assert_eq!(lines[1], "\"A\",\"1; 2; 3; 4; 5\",5,\"1\",\"5\"");
        assert_eq!(lines[3], "\"W&Co\",\"<b>; say \"\"hi\"\"\",2,\"<b>\",\"say \"\"hi\"\"\"");
    }

    #[test]
    fn html_is_escaped() {
        let html = render(&sample(), ReportFormat::Html).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<td>W&amp;Co</td>"));
        assert!(html.contains("{&lt;b&gt;, say &quot;hi&quot;}"));
        assert!(!html.contains("<b>"));
        assert!(html.trim_end().ends_with("</html>"));
    }

    #[test]
    fn text_report_sections() {
        let text = render(&sample(), ReportFormat::Text).unwrap();
        assert!(text.contains("Generated: 09/03/2024 14:05:00"));
        assert!(text.contains("A = {1, 2, 3, 4, 5}\n   Min: 1  Max: 5  Sum: 15  Mean: 3.00\n"), "{text}");
        assert!(text.contains(&format!("{:>3}. {:<8}  0.250  low similarity", 1, "A x B")));
        assert!(text.contains("Size distribution:\n  2 elements: 1 set(s) (33.3%)\n  5 elements: 2 set(s) (66.7%)"));
    }

    #[test]
    fn text_tables_have_padded_columns() {
        let text = render(&sample(), ReportFormat::Text).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        let sets = lines.iter().position(|line| *line == "--- SETS ---").unwrap();
        assert_eq!(lines[sets + 1], format!("{:>3}  {:<4}  {:<10}{:>6}  {:<12}  {}", "#", "Set", "Type", "Size", "First", "Last"));
        assert_eq!(lines[sets + 2], format!("{:>3}  {:<4}  {:<10}{:>6}  {:<12}  {}", 1, "A", "Integers", 5, "1", "5"));
        assert_eq!(lines[sets + 4], format!("{:>3}  {:<4}  {:<10}{:>6}  {:<12}  {}", 3, "W&Co", "Words/Text", 2, "<b>", "say \"hi\""));

        let pairs = lines.iter().position(|line| *line == "--- PAIRWISE COMPARISON ---").unwrap();
        let header = lines[pairs + 1];
        let row = lines[pairs + 2];
        assert!(header.starts_with("Pair       |A U B| |A INT B|"), "{header}");
        assert_eq!(
            row,
            format!(
                "{:<8}{:>10}{:>10}{:>10}{:>10}{:>10}{:>9}{:>9}  {:<16}{}",
                "A x B", 8, 2, 3, 3, 6, "0.250", "0.400", "overlapping", "8 = 8 (holds)"
            )
        );
        assert_eq!(row.find("0.250"), header.find("Jaccard").map(|at| at + 2));
    }

    #[test]
    fn unique_elements_are_cut_at_twenty() {
        let many = typed::parse(&(1..=25).map(|n| n.to_string()).collect::<Vec<_>>().join(" "), SetKind::Integer).set;
        let none = TypedSet::empty(SetKind::Integer);
        let analysis = Analysis::compute([("Many", &many), ("None", &none)], at());
        let text = render(&analysis, ReportFormat::Text).unwrap();
        assert!(text.contains("Unique to one set: 25"));
        assert!(text.contains("  1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20 ... and 5 more\n"));
    }

    #[test]
    fn comparative_matrix_has_fixed_cells() {
        let text = render(&sample(), ReportFormat::Comparative).unwrap();
        let header = format!("{:>12}{:>12}{:>12}{:>12}", "", "A", "B", "W&Co");
        assert!(text.contains(&header), "{text}");
        assert!(text.contains(&format!("{:>12}{:>12}{:>12}{:>12}", "A", "1.000", "0.250", "0.000")));
    }

    #[test]
    fn reports_are_written_to_the_output_directory() {
        let temp = TempDir::new().unwrap();
        let path = write_report(&sample(), ReportFormat::Csv, temp.path()).unwrap();
        assert_eq!(path, temp.path().join(ReportFormat::Csv.file_name(at())));
        assert!(fs::read_to_string(path).unwrap().starts_with("Nome,"));
    }
}
