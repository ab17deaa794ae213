use std::fs;
use std::path::PathBuf;

use gridline_terminal::features::FEATURE_COLUMNS;
use gridline_terminal::logistic::{self, LogisticConfig, LogisticModel};
use gridline_terminal::train::{Family, Market, load_artifact, write_artifact};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir()
        .join("gridline_tests")
        .join(format!("{name}_{}", std::process::id()));
    fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

fn toy_model() -> LogisticModel {
    let x = (0..60)
        .map(|i| {
            let mut row = vec![0.0; FEATURE_COLUMNS.len()];
            row[0] = f64::from(i);
            row
        })
        .collect::<Vec<_>>();
    let y = (0..60)
        .map(|i| if i >= 30 { 1.0 } else { 0.0 })
        .collect::<Vec<_>>();
    logistic::train(&x, &y, &LogisticConfig::default())
}

#[test]
fn artifact_roundtrip_preserves_predictions() {
    let dir = scratch_dir("roundtrip");
    let model = toy_model();

    let mut probe = vec![0.0; FEATURE_COLUMNS.len()];
    probe[0] = 45.0;
    let before = model.predict_proba(&probe);

    write_artifact(&dir, Family::LogReg, Market::HomeWin, &model).expect("write artifact");
    let loaded: LogisticModel = load_artifact(&dir, Family::LogReg, Market::HomeWin)
        .expect("load artifact")
        .expect("artifact present");
    let after = loaded.predict_proba(&probe);

    assert!((before - after).abs() < 1e-12);
    fs::remove_dir_all(&dir).ok();
}

#[test]
fn missing_artifact_is_none_not_error() {
    let dir = scratch_dir("missing");
    let loaded: Option<LogisticModel> =
        load_artifact(&dir, Family::Net, Market::OverUnder).expect("absent artifact is ok");
    assert!(loaded.is_none());
    fs::remove_dir_all(&dir).ok();
}

#[test]
fn stale_feature_layout_refuses_to_load() {
    let dir = scratch_dir("stale");
    let model = toy_model();
    let path = write_artifact(&dir, Family::LogReg, Market::HomeWin, &model).expect("write");

    // Simulate an artifact from an older build with a different layout.
    let raw = fs::read_to_string(&path).unwrap();
    let tampered = raw.replace("spread_line", "point_spread");
    fs::write(&path, tampered).unwrap();

    let loaded: anyhow::Result<Option<LogisticModel>> =
        load_artifact(&dir, Family::LogReg, Market::HomeWin);
    let err = loaded.expect_err("stale layout must be rejected");
    assert!(err.to_string().contains("different feature layout"));
    fs::remove_dir_all(&dir).ok();
}
