//! HTML rendering for the form, verdict and error pages.

use std::fmt::Write as _;

use crate::align::{RawInput, RawValue};
use crate::common::error::EligibilityError;
use crate::inference::PredictionResult;

use super::form::{FieldKind, FormSpec};

/// Escape text for inclusion in HTML bodies and attribute values.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"fr\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n</head>\n<body>\n<h1>📊 {title}</h1>\n{body}</body>\n</html>\n",
        title = escape_html(title),
    )
}

fn form_html(spec: &FormSpec, values: &RawInput) -> String {
    let mut out = String::from("<form method=\"post\" action=\"/predict\">\n");
    for field in &spec.fields {
        let name = escape_html(&field.name);
        let current = values.get(&field.name).cloned().unwrap_or_else(|| field.default_value());
        let _ = write!(
            out,
            "<p><label for=\"{name}\">{}</label><br>\n",
            escape_html(&field.label)
        );
        match &field.kind {
            FieldKind::Number { min, max, .. } => {
                let _ = write!(out, "<input type=\"number\" step=\"any\" id=\"{name}\" name=\"{name}\"");
                if let Some(min) = min {
                    let _ = write!(out, " min=\"{min}\"");
                }
                if let Some(max) = max {
                    let _ = write!(out, " max=\"{max}\"");
                }
                let _ = writeln!(
                    out,
                    " value=\"{}\" required></p>",
                    escape_html(&current.to_string())
                );
            }
            FieldKind::Select { options } => {
                let _ = writeln!(out, "<select id=\"{name}\" name=\"{name}\">");
                for option in options {
                    let selected = matches!(&current, RawValue::Category(c) if c == option);
                    let _ = writeln!(
                        out,
                        "<option value=\"{v}\"{sel}>{v}</option>",
                        v = escape_html(option),
                        sel = if selected { " selected" } else { "" },
                    );
                }
                out.push_str("</select></p>\n");
            }
        }
    }
    out.push_str("<p><button type=\"submit\">Prédire</button></p>\n</form>\n");
    out
}

/// Fresh form, or the form re-filled with `values`.
pub fn render_form(spec: &FormSpec, values: Option<&RawInput>) -> String {
    let defaults;
    let values = match values {
        Some(v) => v,
        None => {
            defaults = spec.defaults();
            &defaults
        }
    };
    page(&spec.title, &form_html(spec, values))
}

/// Verdict banner followed by the submitted form.
pub fn render_result(spec: &FormSpec, result: &PredictionResult, values: &RawInput) -> String {
    let mut body = String::new();
    let _ = writeln!(
        body,
        "<p>🔍 <strong>Statut du compte checking prédit</strong> : <code>{}</code></p>",
        result.verdict
    );
    if result.verdict.is_eligible() {
        body.push_str("<p class=\"success\">✅ Le client est éligible au crédit !</p>\n");
    } else {
        body.push_str("<p class=\"error\">❌ Le client n'est pas éligible au crédit.</p>\n");
    }
    if let Some(pct) = result.probability_percent() {
        let _ = writeln!(body, "<p>Probabilité d'éligibilité : {pct:.1} %</p>");
    }
    if !result.warnings.is_empty() {
        body.push_str("<ul class=\"warnings\">\n");
        for warning in &result.warnings {
            let _ = writeln!(body, "<li>⚠️ {}</li>", escape_html(&warning.to_string()));
        }
        body.push_str("</ul>\n");
    }
    body.push_str(&form_html(spec, values));
    page(&spec.title, &body)
}

/// Error banner followed by the form, re-filled when the submission decoded.
pub fn render_error(spec: &FormSpec, err: &EligibilityError, values: Option<&RawInput>) -> String {
    let defaults;
    let values = match values {
        Some(v) => v,
        None => {
            defaults = spec.defaults();
            &defaults
        }
    };
    let body = format!(
        "<p class=\"error\">Erreur : {}</p>\n{}",
        escape_html(&err.to_string()),
        form_html(spec, values)
    );
    page(&spec.title, &body)
}
