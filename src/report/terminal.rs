use anyhow::Result;
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use crate::error::AnalysisFailure;
use crate::models::{Analysis, DiagnosisResult, RiskAssessment, RiskTier};

pub const NOT_A_MOLE_TITLE: &str = "Image Not a Mole";
pub const NOT_A_MOLE_MESSAGE: &str = "The uploaded image does not appear to be a skin mole. \
     Please upload a clear, close-up image of a mole for analysis.";
const DISCLAIMER: &str =
    "For informational purposes only. Consult a medical professional for diagnosis.";

/// Render an analysis as a colored terminal report.
pub fn render(analysis: &Analysis, image_name: &str, verbose: bool, quiet: bool) -> Result<()> {
    match analysis {
        Analysis::NotASubject {
            subject_confidence,
            model_identifier,
        } => {
            render_not_subject(*subject_confidence, model_identifier.as_deref(), verbose, quiet);
        }
        Analysis::Classified {
            results,
            risk,
            model_identifier,
            subject_confidence,
        } => {
            if quiet {
                println!("{}", summary_line(results, risk));
                return Ok(());
            }

            println!("\n {} v{}", "skinsight".bold(), env!("CARGO_PKG_VERSION"));
            println!(" Original Image: {}\n", image_name.italic());

            render_risk_banner(risk);
            render_table(results);

            if verbose {
                if let Some(model) = model_identifier {
                    println!(" Model            : {}", model);
                }
                if let Some(confidence) = subject_confidence {
                    println!(" Mole detection   : {:.1}%", confidence * 100.0);
                }
            }
            println!("\n {}\n", DISCLAIMER.dimmed());
        }
    }
    Ok(())
}

/// Print a failure as the single user-visible error message.
pub fn render_failure(failure: &AnalysisFailure) {
    eprintln!("{} {}", "✗".red().bold(), failure.to_string().red());
    if let Some(hint) = failure.error.hint() {
        eprintln!("  {}", hint.dimmed());
    }
}

fn render_not_subject(confidence: Option<f64>, model: Option<&str>, verbose: bool, quiet: bool) {
    if quiet {
        println!("{}", NOT_A_MOLE_TITLE);
        return;
    }
    println!();
    println!(" {} {}", "ℹ".blue().bold(), NOT_A_MOLE_TITLE.bold());
    println!(" {}", NOT_A_MOLE_MESSAGE);
    if verbose {
        if let Some(c) = confidence {
            println!(" Mole detection probability: {:.1}%", c * 100.0);
        }
        if let Some(m) = model {
            println!(" Model: {}", m);
        }
    }
    println!();
}

fn render_risk_banner(risk: &RiskAssessment) {
    let headline = format!("{}  {} Risk of Melanoma", risk.percent_label(), risk.tier);
    let colored = match risk.tier {
        RiskTier::Low => headline.green(),
        RiskTier::Medium => headline.yellow(),
        RiskTier::High => headline.red(),
    };
    println!(" ┌────────────────────────────────────────────────────┐");
    println!(" │  {:<48}  │", colored.bold());
    println!(" └────────────────────────────────────────────────────┘\n");
}

fn render_table(results: &[DiagnosisResult]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Probability").add_attribute(Attribute::Bold),
            Cell::new("Diagnosis").add_attribute(Attribute::Bold),
            Cell::new("Code").add_attribute(Attribute::Bold),
        ]);

    for result in results {
        let color = if result.probability > 0.0 {
            Color::Red
        } else {
            Color::DarkGrey
        };
        table.add_row(vec![
            Cell::new(result.percent_label())
                .fg(color)
                .set_alignment(CellAlignment::Right),
            Cell::new(&result.display_name),
            Cell::new(&result.code),
        ]);
    }

    println!("{}", table);
}

fn summary_line(results: &[DiagnosisResult], risk: &RiskAssessment) -> String {
    let top = results
        .first()
        .map(|r| format!("{} ({})", r.display_name, r.percent_label()))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "Melanoma: {}  Risk: {}  Top: {}",
        risk.percent_label(),
        risk.tier,
        top
    )
}
