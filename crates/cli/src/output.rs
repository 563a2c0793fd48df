//! Output formatting utilities
//!
//! Rendering is pure: every function returns a `String` and takes the
//! `Theme` explicitly, so output is testable without a terminal.

use analyzer_lib::{AnalyzeFailure, EfficiencyLevel, ReliabilityRisk, Report};
use clap::ValueEnum;
use colored::Colorize;
use std::fmt::Write;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Semantic colour of a piece of output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Good,
    Warn,
    Bad,
    Accent,
    Muted,
}

/// Colour palette for terminal output
#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub color: bool,
}

impl Theme {
    pub fn colored() -> Self {
        Self { color: true }
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    /// Colour output unless disabled or `NO_COLOR` is set
    pub fn detect(no_color: bool) -> Self {
        if no_color || std::env::var_os("NO_COLOR").is_some() {
            Self::plain()
        } else {
            Self::colored()
        }
    }

    pub fn paint(&self, text: &str, tone: Tone) -> String {
        if !self.color {
            return text.to_string();
        }
        match tone {
            Tone::Good => text.green().to_string(),
            Tone::Warn => text.yellow().to_string(),
            Tone::Bad => text.red().to_string(),
            Tone::Accent => text.cyan().bold().to_string(),
            Tone::Muted => text.dimmed().to_string(),
        }
    }
}

fn efficiency_tone(level: EfficiencyLevel) -> Tone {
    match level {
        EfficiencyLevel::High => Tone::Good,
        EfficiencyLevel::Medium => Tone::Warn,
        EfficiencyLevel::Low => Tone::Bad,
        EfficiencyLevel::NotAvailable => Tone::Muted,
    }
}

/// Risk colours run opposite to efficiency: low risk is good
fn risk_tone(risk: ReliabilityRisk) -> Tone {
    match risk {
        ReliabilityRisk::Low => Tone::Good,
        ReliabilityRisk::Medium => Tone::Warn,
        ReliabilityRisk::High => Tone::Bad,
        ReliabilityRisk::Unknown => Tone::Muted,
    }
}

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

fn field(name: &str, value: impl Into<String>) -> FieldRow {
    FieldRow {
        field: name.to_string(),
        value: value.into(),
    }
}

fn table(rows: Vec<FieldRow>) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn or_dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}

/// Render a report for the terminal
pub fn render_report(report: &Report, theme: &Theme) -> String {
    let workload = report.workload();
    let facts = report.facts();
    let metrics = report.metrics();
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{}",
        theme.paint(&format!("Workload Analysis: {}", workload), Tone::Accent)
    );
    let _ = writeln!(
        out,
        "{}",
        theme.paint(
            &format!("Generated {}", report.generated_at().format("%Y-%m-%d %H:%M:%S UTC")),
            Tone::Muted
        )
    );
    let _ = writeln!(out);

    let _ = writeln!(
        out,
        "{}",
        table(vec![
            field("Namespace", workload.namespace.as_str()),
            field("Kind", workload.kind.as_str()),
            field("Name", workload.name.as_str()),
            field("Main Container", or_dash(facts.main_container.as_deref())),
            field("Container Count", facts.container_count.to_string()),
            field("Priority Class", or_dash(facts.priority_class_name.as_deref())),
        ])
    );

    let efficiency = report.efficiency();
    let _ = writeln!(
        out,
        "{}",
        table(vec![
            field("Replica Count", report.replica_count()),
            field(
                "Avg CPU",
                metrics.avg_cpu_millicores.map(format_cpu).unwrap_or_else(|| "N/A".to_string()),
            ),
            field(
                "Avg Memory",
                metrics.avg_memory_bytes.map(format_bytes).unwrap_or_else(|| "N/A".to_string()),
            ),
            field(
                "Pods Sampled",
                format!("{} ({} failed)", metrics.pods_sampled, metrics.pods_failed),
            ),
            field(
                "Efficiency",
                theme.paint(&efficiency.to_string(), efficiency_tone(efficiency.level())),
            ),
            field(
                "Reliability Risk",
                theme.paint(&report.reliability_risk().to_string(), risk_tone(report.reliability_risk())),
            ),
        ])
    );

    let analysis = report.analysis();
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", theme.paint("Analysis", Tone::Accent));
    if analysis.narrative.trim().is_empty() {
        let _ = writeln!(out, "  {}", theme.paint("(no narrative)", Tone::Muted));
    } else {
        for line in analysis.narrative.lines() {
            let _ = writeln!(out, "  {}", line);
        }
    }

    for (title, items, tone) in [
        ("Opportunities", &analysis.opportunities, Tone::Good),
        ("Cautions", &analysis.cautions, Tone::Warn),
        ("Blockers", &analysis.blockers, Tone::Bad),
        ("Recommendations", &analysis.recommendations, Tone::Good),
    ] {
        let _ = writeln!(out);
        let _ = write!(out, "{}", render_section(title, items, tone, theme));
    }

    out
}

fn render_section(title: &str, items: &[String], tone: Tone, theme: &Theme) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", theme.paint(title, Tone::Accent));
    if items.is_empty() {
        let _ = writeln!(out, "  {}", theme.paint("(none)", Tone::Muted));
    }
    for item in items {
        let _ = writeln!(out, "  {} {}", theme.paint("•", tone), item);
    }
    out
}

/// Render what is known about a workload whose analysis failed
pub fn render_failure(failure: &AnalyzeFailure, theme: &Theme) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {}",
        theme.paint("✗", Tone::Bad),
        theme.paint(&format!("Analysis failed: {}", failure.error), Tone::Bad)
    );

    if let Some(facts) = &failure.facts {
        let mut rows = vec![
            field("Workload", failure.workload.to_string()),
            field("Main Container", or_dash(facts.main_container.as_deref())),
            field("Container Count", facts.container_count.to_string()),
        ];
        if let Some(metrics) = &failure.metrics {
            rows.push(field("Replica Count", metrics.replica_count.as_str()));
            rows.push(field("Efficiency", metrics.efficiency.to_string()));
        }
        let _ = writeln!(out, "{}", table(rows));
    }

    out
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2}Gi", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.0}Mi", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.0}Ki", bytes as f64 / KB as f64)
    } else {
        format!("{}B", bytes)
    }
}

/// Format millicores as human-readable string
pub fn format_cpu(millicores: u64) -> String {
    if millicores >= 1000 {
        format!("{:.2} cores", millicores as f64 / 1000.0)
    } else {
        format!("{}m", millicores)
    }
}
