//! Result-page extraction.
//!
//! The melt calculator answers with an HTML page that carries each value in
//! an element with a fixed id (`Seq1TmOut`, `Seq1dGOut`, ...). Only those four
//! elements are read; nothing else on the page is interpreted.

use oligocalc_shared::{OligoCalcError, Result, ThermoField, ThermodynamicResult};
use scraper::{Html, Selector};
use tracing::debug;

/// Pull Tm, dG, dH and dS out of a result page.
///
/// Fails with [`OligoCalcError::Extraction`] if any element is missing and
/// with [`OligoCalcError::Parse`] if its text is not a finite number. Never
/// returns a partially filled result.
pub fn extract(body: &str) -> Result<ThermodynamicResult> {
    let doc = Html::parse_document(body);

    let result = ThermodynamicResult {
        tm: read_field(&doc, ThermoField::Tm)?,
        dg: read_field(&doc, ThermoField::Dg)?,
        dh: read_field(&doc, ThermoField::Dh)?,
        ds: read_field(&doc, ThermoField::Ds)?,
    };

    debug!(?result, "extracted thermodynamic values");
    Ok(result)
}

fn read_field(doc: &Html, field: ThermoField) -> Result<f64> {
    let selector = Selector::parse(&format!("#{}", field.element_id())).map_err(|e| {
        OligoCalcError::validation(format!("invalid selector for {field}: {e:?}"))
    })?;

    let element = doc
        .select(&selector)
        .next()
        .ok_or(OligoCalcError::Extraction { field })?;

    let text = element.text().collect::<String>();
    let trimmed = text.trim();

    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(OligoCalcError::Parse {
            field,
            text: trimmed.to_string(),
        }),
    }
}
