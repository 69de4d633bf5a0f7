//! Renders inline HTML to a PDF document.
//!
//! Option normalization mirrors the print defaults of the underlying engine:
//! A4-ish page (8.27in x 11.69in), 0.4in margins, backgrounds printed. Bare
//! numbers are inches; strings accept `in`, `cm`, `mm`, and `px` suffixes,
//! with unitless strings read as pixels.

use bytes::Bytes;
use serde::Deserialize;
use serde_json::Value;
use tokio::time::timeout;

use super::ActionOutcome;
use crate::config::Timeouts;
use crate::engine::{Page, PdfRenderOptions};
use crate::{ActionError, Result};

pub const DEFAULT_PAGE_WIDTH_IN: f64 = 8.27;
pub const DEFAULT_PAGE_HEIGHT_IN: f64 = 11.69;
pub const DEFAULT_MARGIN_IN: f64 = 0.4;

#[derive(Debug, Clone, Deserialize)]
pub struct PdfParams {
    pub html: String,
    #[serde(default)]
    pub options: PdfOptions,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PdfOptions {
    pub width: Option<Dimension>,
    pub height: Option<Dimension>,
    pub margin: PdfMargins,
    pub print_background: Option<bool>,
    pub landscape: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PdfMargins {
    pub top: Option<Dimension>,
    pub bottom: Option<Dimension>,
    pub left: Option<Dimension>,
    pub right: Option<Dimension>,
}

/// A page length: a bare number (inches) or a string with a unit suffix.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Dimension {
    Number(f64),
    Text(String),
}

impl Dimension {
    pub fn to_inches(&self) -> Result<f64> {
        match self {
            Dimension::Number(n) => Ok(*n),
            Dimension::Text(s) => parse_length(s),
        }
    }
}

fn parse_length(value: &str) -> Result<f64> {
    let trimmed = value.trim();
    let (number, per_inch) = if let Some(v) = trimmed.strip_suffix("in") {
        (v, 1.0)
    } else if let Some(v) = trimmed.strip_suffix("cm") {
        (v, 2.54)
    } else if let Some(v) = trimmed.strip_suffix("mm") {
        (v, 25.4)
    } else if let Some(v) = trimmed.strip_suffix("px") {
        (v, 96.0)
    } else {
        // Unitless strings are pixels, matching the engine's convention.
        (trimmed, 96.0)
    };

    let parsed: f64 = number.trim().parse().map_err(|_| {
        ActionError::automation(format!("Failed to parse length '{}'", value))
    })?;
    Ok(parsed / per_inch)
}

fn inches_or(dim: &Option<Dimension>, default: f64) -> Result<f64> {
    match dim {
        Some(d) => d.to_inches(),
        None => Ok(default),
    }
}

/// Applies default page dimensions and margins to unspecified options.
pub fn normalize(options: &PdfOptions) -> Result<PdfRenderOptions> {
    Ok(PdfRenderOptions {
        paper_width: inches_or(&options.width, DEFAULT_PAGE_WIDTH_IN)?,
        paper_height: inches_or(&options.height, DEFAULT_PAGE_HEIGHT_IN)?,
        margin_top: inches_or(&options.margin.top, DEFAULT_MARGIN_IN)?,
        margin_bottom: inches_or(&options.margin.bottom, DEFAULT_MARGIN_IN)?,
        margin_left: inches_or(&options.margin.left, DEFAULT_MARGIN_IN)?,
        margin_right: inches_or(&options.margin.right, DEFAULT_MARGIN_IN)?,
        print_background: options.print_background.unwrap_or(true),
        landscape: options.landscape.unwrap_or(false),
    })
}

pub async fn run(params: &Value, page: &dyn Page, timeouts: &Timeouts) -> Result<ActionOutcome> {
    let params: PdfParams = serde_json::from_value(params.clone())?;
    let render = normalize(&params.options)?;

    timeout(timeouts.navigation, page.set_content(&params.html))
        .await
        .map_err(|_| {
            ActionError::automation(format!(
                "Navigation timeout of {} ms exceeded",
                timeouts.navigation.as_millis()
            ))
        })??;

    let pdf = page.render_pdf(&render).await?;
    Ok(ActionOutcome::Pdf(Bytes::from(pdf)))
}
