//! Criteria command: list the criteria of a rule set

use super::{load_rules, output};
use anyhow::Result;
use octofhir_acmg_eval::RuleSet;
use octofhir_acmg_model::Polarity;
use serde_json::json;
use std::path::PathBuf;
use tabled::{Table, Tabled, settings::Style};

pub struct CriteriaConfig {
    pub rules: Option<PathBuf>,
    pub output_format: Option<String>,
    pub output_file: Option<PathBuf>,
}

#[derive(Tabled)]
struct CriterionRow {
    #[tabled(rename = "Code")]
    code: String,
    #[tabled(rename = "Polarity")]
    polarity: &'static str,
    #[tabled(rename = "Nominal")]
    nominal: String,
    #[tabled(rename = "Levels")]
    levels: String,
    #[tabled(rename = "Description")]
    description: String,
}

fn polarity_name(polarity: Polarity) -> &'static str {
    match polarity {
        Polarity::Pathogenic => "pathogenic",
        Polarity::Benign => "benign",
    }
}

/// Criteria in evaluation order
pub fn criteria_table(rules: &RuleSet) -> String {
    let rows = rules.ordered().map(|criterion| CriterionRow {
        code: criterion.code.clone(),
        polarity: polarity_name(criterion.polarity),
        nominal: criterion.nominal.to_string(),
        levels: criterion
            .conditions()
            .map(|(level, _)| level.to_string())
            .collect::<Vec<_>>()
            .join(", "),
        description: criterion.description.clone(),
    });
    Table::new(rows).with(Style::modern()).to_string()
}

pub async fn list(config: CriteriaConfig) -> Result<()> {
    let rules = load_rules(config.rules.as_deref())?;
    let format = output::OutputFormat::from_name(config.output_format.as_deref().unwrap_or("table"));

    let content = match format {
        output::OutputFormat::Table => criteria_table(&rules),
        _ => {
            let items: Vec<_> = rules
                .ordered()
                .map(|criterion| {
                    json!({
                        "code": criterion.code,
                        "polarity": criterion.polarity,
                        "nominal": criterion.nominal.to_string(),
                        "levels": criterion.conditions().map(|(level, _)| level.key()).collect::<Vec<_>>(),
                        "description": criterion.description,
                    })
                })
                .collect();
            output::format_json(&items, format == output::OutputFormat::JsonPretty)?
        }
    };
    output::write_output(&content, config.output_file.as_deref())
}
