//! Applicant form definition and validation of submitted values.
//!
//! TODO: Derive select options from the loaded schema vocabularies so the form cannot drift from the model.

use serde::Serialize;

use crate::align::{RawInput, RawValue};
use crate::common::error::{EligibilityError, EligibilityResult};

/// Widget type and constraints for one form field.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "widget", rename_all = "snake_case")]
pub enum FieldKind {
    Number {
        min: Option<f64>,
        max: Option<f64>,
        default: f64,
    },
    Select {
        options: Vec<String>,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FormField {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
}

impl FormField {
    pub fn number(name: &str, label: &str, min: Option<f64>, max: Option<f64>, default: f64) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind: FieldKind::Number { min, max, default },
        }
    }

    pub fn select(name: &str, label: &str, options: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind: FieldKind::Select {
                options: options.iter().map(|o| o.to_string()).collect(),
            },
        }
    }

    /// Value pre-filled when the form is first shown.
    pub fn default_value(&self) -> RawValue {
        match &self.kind {
            FieldKind::Number { default, .. } => RawValue::Number(*default),
            FieldKind::Select { options } => {
                RawValue::Category(options.first().cloned().unwrap_or_default())
            }
        }
    }

    fn validate(&self, raw: &str) -> EligibilityResult<RawValue> {
        let raw = raw.trim();
        match &self.kind {
            FieldKind::Number { min, max, .. } => {
                let value: f64 = raw.parse().map_err(|_| {
                    EligibilityError::invalid(format!("{} : `{raw}` n'est pas un nombre", self.label))
                })?;
                if !value.is_finite() {
                    return Err(EligibilityError::invalid(format!(
                        "{} : valeur non finie",
                        self.label
                    )));
                }
                if let Some(min) = min {
                    if value < *min {
                        return Err(EligibilityError::invalid(format!(
                            "{} : la valeur minimale est {min}",
                            self.label
                        )));
                    }
                }
                if let Some(max) = max {
                    if value > *max {
                        return Err(EligibilityError::invalid(format!(
                            "{} : la valeur maximale est {max}",
                            self.label
                        )));
                    }
                }
                Ok(RawValue::Number(value))
            }
            FieldKind::Select { options } => {
                if options.iter().any(|o| o == raw) {
                    Ok(RawValue::Category(raw.to_string()))
                } else {
                    Err(EligibilityError::invalid(format!(
                        "{} : choix `{raw}` inconnu",
                        self.label
                    )))
                }
            }
        }
    }
}

/// The full applicant form.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FormSpec {
    pub title: String,
    pub fields: Vec<FormField>,
}

impl FormSpec {
    /// Loan application form: numeric amounts plus the categorical selectors.
    pub fn loan_application() -> Self {
        Self {
            title: "Prédiction de l'Éligibilité au Crédit".to_string(),
            fields: vec![
                FormField::number("age", "Âge du client", Some(18.0), Some(100.0), 30.0),
                FormField::number("revenu", "Revenu mensuel (€)", Some(0.0), None, 3000.0),
                FormField::number(
                    "montant_loan",
                    "Montant du prêt demandé (€)",
                    Some(0.0),
                    None,
                    5000.0,
                ),
                FormField::number(
                    "credits_existants",
                    "Nombre de crédits existants",
                    Some(0.0),
                    Some(10.0),
                    1.0,
                ),
                FormField::select("historique_credit", "Historique de crédit", &["Bon", "Mauvais"]),
                FormField::select(
                    "logement",
                    "Logement",
                    &["Propriétaire", "Locataire", "Gratuit"],
                ),
                FormField::select(
                    "emploi",
                    "Emploi",
                    &["Qualifié", "Non qualifié", "Hautement qualifié", "Sans emploi"],
                ),
                FormField::select(
                    "epargne",
                    "Épargne",
                    &["Faible", "Modérée", "Élevée", "Inconnue"],
                ),
                FormField::select(
                    "objet",
                    "Objet du prêt",
                    &["Voiture", "Mobilier", "Éducation", "Entreprise", "Autre"],
                ),
            ],
        }
    }

    /// Pre-filled values for a fresh form.
    pub fn defaults(&self) -> RawInput {
        self.fields
            .iter()
            .map(|f| (f.name.clone(), f.default_value()))
            .collect()
    }

    /// Validate submitted `name=value` pairs. Every field is required; unknown
    /// names are ignored.
    pub fn collect<K, V, I>(&self, pairs: I) -> EligibilityResult<RawInput>
    where
        K: AsRef<str>,
        V: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
    {
        let submitted: Vec<(String, String)> = pairs
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
            .collect();
        let mut input = RawInput::new();
        for field in &self.fields {
            let raw = submitted
                .iter()
                .find(|(k, _)| *k == field.name)
                .map(|(_, v)| v.as_str())
                .ok_or_else(|| {
                    EligibilityError::invalid(format!("{} : champ manquant", field.label))
                })?;
            input.insert(field.name.clone(), field.validate(raw)?);
        }
        Ok(input)
    }

    /// Decode an `application/x-www-form-urlencoded` body and validate it.
    pub fn collect_urlencoded(&self, body: &[u8]) -> EligibilityResult<RawInput> {
        self.collect(url::form_urlencoded::parse(body))
    }
}

impl Default for FormSpec {
    fn default() -> Self {
        Self::loan_application()
    }
}
