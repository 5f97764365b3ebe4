//! Core domain types for melt calculations.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ConcentrationParameters
// ---------------------------------------------------------------------------

/// Solution conditions sent alongside every sequence.
///
/// Oligo and target concentrations are in µM, cation and dNTP
/// concentrations in mM, matching the units of the remote form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConcentrationParameters {
    /// Oligonucleotide concentration.
    pub oligo: f64,
    /// Target concentration.
    pub target: f64,
    /// Na+ concentration.
    pub na: f64,
    /// Mg2+ concentration.
    pub mg: f64,
    /// dNTP concentration.
    pub dntp: f64,
}

impl ConcentrationParameters {
    /// Preset tuned for approximating primer melting temperatures in
    /// amplicon panels. Used by the batch driver unless overridden.
    pub fn primer() -> Self {
        Self {
            oligo: 0.05,
            target: 0.0,
            na: 100.0,
            mg: 2.5,
            dntp: 0.2,
        }
    }
}

/// The calculator's own form defaults.
impl Default for ConcentrationParameters {
    fn default() -> Self {
        Self {
            oligo: 0.2,
            target: 0.2,
            na: 50.0,
            mg: 0.0,
            dntp: 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// ThermodynamicResult
// ---------------------------------------------------------------------------

/// Hybridization thermodynamics for one sequence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThermodynamicResult {
    /// Melting temperature, °C.
    pub tm: f64,
    /// Gibbs free energy, kcal/mol.
    pub dg: f64,
    /// Enthalpy, kcal/mol.
    pub dh: f64,
    /// Entropy, cal/(mol·K).
    pub ds: f64,
}

impl ThermodynamicResult {
    /// Value of a single field.
    pub fn get(&self, field: ThermoField) -> f64 {
        match field {
            ThermoField::Tm => self.tm,
            ThermoField::Dg => self.dg,
            ThermoField::Dh => self.dh,
            ThermoField::Ds => self.ds,
        }
    }
}

// ---------------------------------------------------------------------------
// ThermoField
// ---------------------------------------------------------------------------

/// The four values scraped from a result page, in output column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThermoField {
    Tm,
    Dg,
    Dh,
    Ds,
}

impl ThermoField {
    /// All fields in output column order.
    pub const ALL: [ThermoField; 4] = [Self::Tm, Self::Dg, Self::Dh, Self::Ds];

    /// Element id holding this value in the calculator's result page.
    pub fn element_id(self) -> &'static str {
        match self {
            Self::Tm => "Seq1TmOut",
            Self::Dg => "Seq1dGOut",
            Self::Dh => "Seq1dHOut",
            Self::Ds => "Seq1dSOut",
        }
    }

    /// Column label used in CSV headers.
    pub fn label(self) -> &'static str {
        match self {
            Self::Tm => "Tm",
            Self::Dg => "dG",
            Self::Dh => "dH",
            Self::Ds => "dS",
        }
    }
}

impl std::fmt::Display for ThermoField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// RowErrorPolicy
// ---------------------------------------------------------------------------

/// What the batch driver does when a row cannot be processed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowErrorPolicy {
    /// Stop the run at the first failing row.
    #[default]
    Abort,
    /// Log the failure and continue with the next row.
    ///
    /// Covers malformed and non-UTF-8 lines as well as calculator errors.
    /// Read/write failures on the files themselves still end the run.
    Skip,
}

impl std::fmt::Display for RowErrorPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Abort => f.write_str("abort"),
            Self::Skip => f.write_str("skip"),
        }
    }
}

impl std::str::FromStr for RowErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "skip" => Ok(Self::Skip),
            other => Err(format!("unknown row error policy '{other}': expected 'abort' or 'skip'")),
        }
    }
}
