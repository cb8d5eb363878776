use std::io::Write;

use wdn_algo::{BuildConfig, Formulation, DEFAULT_FLOW_EPSILON};

#[test]
fn loads_config_from_toml_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "formulation = \"oa\"").unwrap();
    writeln!(file, "oa_cut_points = 8").unwrap();
    writeln!(file, "tanks_dispatchable = true").unwrap();

    let config = BuildConfig::from_file(file.path()).unwrap();
    assert_eq!(config.formulation, Formulation::OuterApproximation);
    assert_eq!(config.oa_cut_points, 8);
    assert_eq!(config.tanks_dispatchable, Some(true));
    assert_eq!(config.flow_epsilon, DEFAULT_FLOW_EPSILON);
}

#[test]
fn saved_config_reloads_identically() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("build.toml");
    let config = BuildConfig::new(Formulation::ContinuousRelaxation).with_tanks_dispatchable(false);
    std::fs::write(&path, config.to_toml_string().unwrap()).unwrap();
    assert_eq!(BuildConfig::from_file(&path).unwrap(), config);
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = BuildConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, wdn_core::WdnError::Io(_)));
}

#[test]
fn invalid_values_are_rejected_on_load() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "flow_epsilon = -1.0").unwrap();
    assert!(BuildConfig::from_file(file.path()).is_err());
}
