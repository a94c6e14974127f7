//! Loading surfaces and config from files.

use mimicry::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

const USER_YAML: &str = "\
name: RealUser
singleton:
  find: 1
instance:
  initialize: 1
  name: 0
  tags:
    required: 0
    variadic: true
";

fn write_temp(suffix: &str, contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn user_double() -> DoubleType {
    let user = DoubleType::new("User");
    user.declare_singleton(Declaration::new("find").arity(1));
    user.declare_instance(Declaration::new(INITIALIZER).arity(1));
    user.declare_instance(Declaration::new("name"));
    user.declare_instance(Declaration::new("tags").variadic(0));
    user
}

#[test]
fn test_yaml_manifest_from_path() {
    let file = write_temp(".yaml", USER_YAML);
    let surface = SurfaceDescriptor::from_path(file.path()).unwrap();
    assert_eq!(surface.name, "RealUser");
    assert_eq!(surface.arity(SurfaceKind::Instance, "tags"), Some(Arity::at_least(0)));
    expect_substitutable(&user_double(), &surface).unwrap();
}

#[test]
fn test_json_manifest_from_path() {
    let json = r#"{"name": "RealUser", "singleton": {"find": 2}, "instance": {}}"#;
    let file = write_temp(".json", json);
    let surface = SurfaceDescriptor::from_path(file.path()).unwrap();
    let report = user_double().substitutability(&surface);
    assert!(!report.is_substitutable());
    assert_eq!(report.arity_mismatches.len(), 1);
    assert_eq!(report.missing.len(), 3);
}

#[test]
fn test_unknown_extension_is_rejected() {
    let file = write_temp(".txt", USER_YAML);
    let err = SurfaceDescriptor::from_path(file.path()).unwrap_err();
    assert!(matches!(err, MimicryError::Manifest { .. }));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = SurfaceDescriptor::from_path(dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, MimicryError::Io(_)));
}

#[test]
fn test_declared_surface_round_trips_through_yaml() {
    let surface = user_double().surface();
    let yaml = surface.to_yaml().unwrap();
    assert_eq!(SurfaceDescriptor::from_yaml_str(&yaml).unwrap(), surface);
}

#[test]
fn test_config_from_path() {
    let file = write_temp(".yaml", "check_arity: false\nfailure_context: 3\n");
    let config = DoubleConfig::from_path(file.path()).unwrap();
    assert!(!config.check_arity);
    assert_eq!(config.failure_context, 3);

    let double = DoubleType::with_config("Loose", config);
    double.declare_singleton(Declaration::new("ping").default_value(true));
    assert_eq!(double.call("ping", args![1, 2]).unwrap(), Value::Bool(true));
}
