//! Variant, gene and phenotype documents
//!
//! Every struct keeps unknown fields in `extra` so a record read from the
//! variant store is written back with nothing lost.

use crate::classification::Classification;
use crate::criterion::CriterionResult;
use indexmap::IndexMap;
use octofhir_acmg_diagnostics::{ACMG0303, AcmgError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

type Extra = IndexMap<String, serde_json::Value>;

/// One sequence variant with its gene/phenotype tree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantRecord {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub chromosome: Option<String>,
    #[serde(default)]
    pub position: Option<i64>,
    #[serde(default)]
    pub change: Option<AlleleChange>,
    #[serde(default)]
    pub zygosity: Option<String>,
    #[serde(default)]
    pub read_depth: Option<i64>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub frequency: Option<Decimal>,
    #[serde(default)]
    pub variant_type: Option<String>,
    #[serde(default)]
    pub genes: Vec<GeneEntry>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlleleChange {
    #[serde(rename = "ref", default)]
    pub reference: Allele,
    #[serde(default)]
    pub alt: Allele,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Allele {
    #[serde(default)]
    pub base: String,
    #[serde(default)]
    pub allelic_depth: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneEntry {
    pub gene: String,
    #[serde(default)]
    pub strand: Option<String>,
    #[serde(default)]
    pub tier: Option<i64>,
    #[serde(default)]
    pub mitochondrial: bool,
    #[serde(default)]
    pub annotations: Annotation,
    #[serde(default)]
    pub phenotypes: PhenotypeSources,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Transcript-level annotation block of a gene entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(default)]
    pub impact: Option<String>,
    #[serde(default)]
    pub dna_change: Option<String>,
    #[serde(default)]
    pub protein_change: Option<String>,
    #[serde(default)]
    pub codon: Option<i64>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub revel_score: Option<Decimal>,
    #[serde(default)]
    pub maf: Option<MafSummary>,
    #[serde(default)]
    pub protein_domains: Vec<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Population allele frequency summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MafSummary {
    #[serde(default)]
    pub values: Vec<serde_json::Value>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub max: Option<Decimal>,
    #[serde(default)]
    pub max_subpop: Option<String>,
}

/// Where a phenotype association came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhenotypeSource {
    Custom,
    Omim,
    Orpha,
}

impl PhenotypeSource {
    pub const ALL: [PhenotypeSource; 3] = [Self::Custom, Self::Omim, Self::Orpha];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Custom => "custom",
            Self::Omim => "omim",
            Self::Orpha => "orpha",
        }
    }
}

impl fmt::Display for PhenotypeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhenotypeSources {
    #[serde(default)]
    pub custom: Vec<PhenotypeEntry>,
    #[serde(default)]
    pub omim: Vec<PhenotypeEntry>,
    #[serde(default)]
    pub orpha: Vec<PhenotypeEntry>,
}

impl PhenotypeSources {
    pub fn get(&self, source: PhenotypeSource) -> &[PhenotypeEntry] {
        match source {
            PhenotypeSource::Custom => &self.custom,
            PhenotypeSource::Omim => &self.omim,
            PhenotypeSource::Orpha => &self.orpha,
        }
    }

    pub fn get_mut(&mut self, source: PhenotypeSource) -> &mut Vec<PhenotypeEntry> {
        match source {
            PhenotypeSource::Custom => &mut self.custom,
            PhenotypeSource::Omim => &mut self.omim,
            PhenotypeSource::Orpha => &mut self.orpha,
        }
    }

    /// All entries tagged with their source, in `custom`, `omim`, `orpha` order
    pub fn iter(&self) -> impl Iterator<Item = (PhenotypeSource, usize, &PhenotypeEntry)> {
        PhenotypeSource::ALL.into_iter().flat_map(move |source| {
            self.get(source)
                .iter()
                .enumerate()
                .map(move |(index, entry)| (source, index, entry))
        })
    }

    pub fn len(&self) -> usize {
        self.custom.len() + self.omim.len() + self.orpha.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Inheritance pattern derived from the free-text `inheritance_mode`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Inheritance {
    Dominant,
    Recessive,
    Mitochondrial,
    Unknown,
}

impl Inheritance {
    /// Accepts OMIM-style abbreviations (`AD`, `AR`, `XLD`, `XLR`, `MT`) and spelled-out forms
    pub fn from_mode(mode: &str) -> Self {
        let mode = mode.trim().to_ascii_lowercase();
        match mode.as_str() {
            "ad" | "xld" | "xl" | "yl" => Self::Dominant,
            "ar" | "xlr" => Self::Recessive,
            "mt" | "mi" | "mito" => Self::Mitochondrial,
            _ if mode.contains("dominant") => Self::Dominant,
            _ if mode.contains("recessive") => Self::Recessive,
            _ if mode.contains("mitochondrial") => Self::Mitochondrial,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhenotypeEntry {
    #[serde(default)]
    pub phenotype: String,
    #[serde(default)]
    pub inheritance_mode: Option<String>,
    #[serde(default)]
    pub acmg: AcmgBlock,
    #[serde(flatten)]
    pub extra: Extra,
}

impl PhenotypeEntry {
    pub fn inheritance(&self) -> Inheritance {
        self.inheritance_mode
            .as_deref()
            .map_or(Inheritance::Unknown, Inheritance::from_mode)
    }
}

/// ACMG results of one phenotype: criterion results keyed by code plus the labels
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AcmgBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculated_classification: Option<Classification>,
    /// Reviewer-confirmed label; never written by the engine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
    /// Set when the calculated label fell back to `US` because of bad inputs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification_error: Option<String>,
    #[serde(flatten)]
    pub criteria: IndexMap<String, CriterionResult>,
}

impl VariantRecord {
    pub fn from_json_str(text: &str) -> Result<Self, AcmgError> {
        serde_json::from_str(text).map_err(|e| AcmgError::record(ACMG0303, None, e.to_string()))
    }

    /// Required-field check run before any evaluation
    pub fn validate(&self) -> Result<(), AcmgError> {
        let record_id = (!self.id.is_empty()).then(|| self.id.clone());
        let fail = |message: String| AcmgError::record(ACMG0303, record_id.clone(), message);

        if self.id.trim().is_empty() {
            return Err(fail("record has no `_id`".to_string()));
        }
        if self.chromosome.as_deref().is_none_or(|c| c.trim().is_empty()) {
            return Err(fail("record has no `chromosome`".to_string()));
        }
        if self.position.is_none_or(|p| p < 1) {
            return Err(fail("record has no valid `position`".to_string()));
        }
        for (index, gene) in self.genes.iter().enumerate() {
            if gene.gene.trim().is_empty() {
                return Err(fail(format!("genes[{index}] has no gene symbol")));
            }
        }
        Ok(())
    }

    /// Alternate base, when the change block is present
    pub fn alt(&self) -> Option<&str> {
        self.change.as_ref().map(|c| c.alt.base.as_str())
    }

    pub fn reference(&self) -> Option<&str> {
        self.change.as_ref().map(|c| c.reference.base.as_str())
    }
}
