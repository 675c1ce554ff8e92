use std::path::PathBuf;

use loan_eligibility::api::FormSpec;
use loan_eligibility::model::load_bundle;
use loan_eligibility::{FsArtifactRepo, Predictor, RawValue, Verdict};

fn demo_predictor() -> Predictor {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos");
    let repo = FsArtifactRepo::with_paths(
        dir.join("log_reg_model.json"),
        Some(dir.join("scaler.json")),
        Some(dir.join("features.json")),
    );
    Predictor::new(load_bundle(&repo).unwrap())
}

#[test]
fn demo_bundle_matches_the_form() {
    let predictor = demo_predictor();
    let form = FormSpec::loan_application();
    assert_eq!(predictor.schema().len(), predictor.metadata().n_features);

    // Every form option has an indicator column, so the defaults align cleanly.
    let result = predictor.predict(&form.defaults()).unwrap();
    assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    assert_eq!(result.verdict, Verdict::Good);
    assert!(result.probability.is_some());
}

#[test]
fn bad_history_flips_the_demo_verdict() {
    let predictor = demo_predictor();
    let mut input = FormSpec::loan_application().defaults();
    input.insert("historique_credit", RawValue::Category("Mauvais".into()));
    let result = predictor.predict(&input).unwrap();
    assert_eq!(result.verdict, Verdict::Bad);
}
