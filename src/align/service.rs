//! Feature alignment: raw form values → ordered numeric vector.
//!
//! Steps, in order:
//! 1. categorical labels expand to `{field}_{value}` indicator columns,
//! 2. schema columns absent from the expansion are filled with [`DEFAULT_FILL`],
//! 3. columns are selected in schema order and extras are discarded,
//! 4. the resulting length is checked against the schema.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::common::error::{EligibilityError, EligibilityResult};
use crate::schema::{one_hot_column, ExpectedSchema};

use super::domain::{AlignWarning, Alignment, FeatureVector, RawInput, RawValue};

/// Value used for every schema column the submission does not provide.
pub const DEFAULT_FILL: f64 = 0.0;

/// Aligner bound to the schema loaded at startup.
#[derive(Clone, Debug)]
pub struct FeatureAligner {
    schema: Arc<ExpectedSchema>,
}

impl FeatureAligner {
    pub fn new(schema: Arc<ExpectedSchema>) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &ExpectedSchema {
        &self.schema
    }

    pub fn align(&self, input: &RawInput) -> EligibilityResult<Alignment> {
        align(input, &self.schema)
    }
}

/// Align `input` against `schema`.
pub fn align(input: &RawInput, schema: &ExpectedSchema) -> EligibilityResult<Alignment> {
    let mut warnings = Vec::new();
    let mut expanded: BTreeMap<String, f64> = BTreeMap::new();
    let mut unseen: BTreeSet<String> = BTreeSet::new();
    let mut categorical_fields = Vec::new();

    for (field, value) in input.iter() {
        match value {
            RawValue::Number(n) => {
                if !n.is_finite() {
                    return Err(EligibilityError::invalid(format!(
                        "`{field}` must be a finite number"
                    )));
                }
                expanded.insert(field.to_string(), *n);
            }
            RawValue::Category(label) => {
                if schema.contains(field) {
                    return Err(EligibilityError::invalid(format!(
                        "`{field}` expects a number, got `{label}`"
                    )));
                }
                categorical_fields.push(field);
                let column = one_hot_column(field, label);
                // A field with no indicator columns at all is reported as dropped below.
                if !schema.contains(&column) && !schema.one_hot_group(field).is_empty() {
                    warnings.push(AlignWarning::UnseenCategory {
                        field: field.to_string(),
                        value: label.clone(),
                    });
                    unseen.insert(column.clone());
                }
                expanded.insert(column, 1.0);
            }
        }
    }

    // Indicator columns of a supplied categorical field are expected to be 0.
    let covered: BTreeSet<&str> = categorical_fields
        .iter()
        .flat_map(|field| schema.one_hot_group(field))
        .collect();

    let mut values = Vec::with_capacity(schema.len());
    for column in schema.names() {
        match expanded.get(column) {
            Some(v) => values.push(*v),
            None => {
                if !covered.contains(column.as_str()) {
                    warnings.push(AlignWarning::MissingColumn {
                        column: column.clone(),
                    });
                }
                values.push(DEFAULT_FILL);
            }
        }
    }

    for column in expanded.keys() {
        if !schema.contains(column) && !unseen.contains(column) {
            warnings.push(AlignWarning::DroppedColumn {
                column: column.clone(),
            });
        }
    }

    let vector = FeatureVector::new(values);
    vector.ensure_len(schema.len())?;

    if !warnings.is_empty() {
        tracing::debug!(
            warnings = warnings.len(),
            columns = vector.len(),
            "feature alignment completed with warnings"
        );
    }

    Ok(Alignment { vector, warnings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn loan_schema() -> ExpectedSchema {
        ExpectedSchema::from_names([
            "age",
            "revenu",
            "montant_loan",
            "historique_credit_Bon",
            "historique_credit_Mauvais",
        ])
        .unwrap()
    }

    fn applicant() -> RawInput {
        RawInput::new()
            .with("age", 30.0)
            .with("revenu", 3000.0)
            .with("historique_credit", "Bon")
            .with("montant_loan", 5000.0)
    }

    #[test]
    fn aligns_reference_applicant() {
        let out = align(&applicant(), &loan_schema()).unwrap();
        assert_eq!(out.vector.as_slice(), &[30.0, 3000.0, 5000.0, 1.0, 0.0]);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn alignment_is_deterministic() {
        let schema = loan_schema();
        let first = align(&applicant(), &schema).unwrap();
        let second = align(&applicant(), &schema).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn missing_categorical_field_zeroes_its_group() {
        let input = RawInput::new()
            .with("age", 45.0)
            .with("revenu", 2100.0)
            .with("montant_loan", 800.0);
        let out = align(&input, &loan_schema()).unwrap();
        assert_eq!(out.vector.as_slice(), &[45.0, 2100.0, 800.0, 0.0, 0.0]);
        assert_eq!(
            out.warnings,
            vec![
                AlignWarning::MissingColumn {
                    column: "historique_credit_Bon".into()
                },
                AlignWarning::MissingColumn {
                    column: "historique_credit_Mauvais".into()
                },
            ]
        );
    }

    #[test]
    fn unseen_category_is_flagged_and_zeroed() {
        let input = applicant().with("historique_credit", "Inconnu");
        let out = align(&input, &loan_schema()).unwrap();
        assert_eq!(out.vector.as_slice(), &[30.0, 3000.0, 5000.0, 0.0, 0.0]);
        assert_eq!(
            out.warnings,
            vec![AlignWarning::UnseenCategory {
                field: "historique_credit".into(),
                value: "Inconnu".into(),
            }]
        );
    }

    #[test]
    fn extra_columns_are_dropped_with_a_warning() {
        let input = applicant().with("nb_enfants", 2.0);
        let out = align(&input, &loan_schema()).unwrap();
        assert_eq!(out.vector.len(), 5);
        assert_eq!(
            out.warnings,
            vec![AlignWarning::DroppedColumn {
                column: "nb_enfants".into()
            }]
        );
    }

    #[test]
    fn field_without_indicator_columns_is_dropped() {
        let schema = ExpectedSchema::from_names(["age"]).unwrap();
        let input = RawInput::new().with("age", 1.0).with("logement", "Locataire");
        let out = align(&input, &schema).unwrap();
        assert_eq!(out.vector.as_slice(), &[1.0]);
        assert_eq!(
            out.warnings,
            vec![AlignWarning::DroppedColumn {
                column: "logement_Locataire".into()
            }]
        );
    }

    #[test]
    fn output_length_always_matches_schema() {
        let schema = loan_schema();
        let inputs = [
            RawInput::new(),
            applicant(),
            RawInput::new().with("logement", "Locataire").with("x", 1.0),
        ];
        for input in &inputs {
            assert_eq!(align(input, &schema).unwrap().vector.len(), schema.len());
        }
    }

    #[test]
    fn label_for_numeric_column_is_invalid() {
        let input = applicant().with("age", "trente");
        let err = align(&input, &loan_schema()).unwrap_err();
        assert!(matches!(err, EligibilityError::InvalidInput(_)));
    }

    #[test]
    fn non_finite_number_is_invalid() {
        let input = applicant().with("revenu", f64::INFINITY);
        assert!(align(&input, &loan_schema()).is_err());
    }

    #[test]
    fn aligner_wraps_shared_schema() {
        let aligner = FeatureAligner::new(Arc::new(loan_schema()));
        let out = aligner.align(&applicant()).unwrap();
        assert_eq!(out.vector.len(), aligner.schema().len());
    }
}
