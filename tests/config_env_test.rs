use progline::ProgressSettings;
use std::env;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_load_defaults_without_file() {
    let temp_dir = TempDir::new().unwrap();
    let settings = ProgressSettings::load_from(temp_dir.path().join("progline.toml")).unwrap();

    assert_eq!(settings.delay, 3.0);
    assert_eq!(settings.refresh, 0.1);
    assert_eq!(settings.format, vec!["topic", "bar", "number", "estimate"]);
    assert!(settings.clear_complete);
}

#[test]
fn test_toml_file_overrides_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("progline.toml");
    fs::write(
        &path,
        r#"
refresh = 0.25
format = ["topic", "number", "bar"]
clear_complete = false
width = 100
"#,
    )
    .unwrap();

    let settings = ProgressSettings::load_from(&path).unwrap();
    assert_eq!(settings.refresh, 0.25);
    assert_eq!(settings.format, vec!["topic", "number", "bar"]);
    assert!(!settings.clear_complete);
    assert_eq!(settings.width, Some(100));
    // untouched keys keep their defaults
    assert_eq!(settings.delay, 3.0);
}

#[test]
fn test_env_override() {
    let temp_dir = TempDir::new().unwrap();

    unsafe {
        env::set_var("PROGLINE_CHANGEDELAY", "2.5");
        env::set_var("PROGLINE_DISABLE", "true");
    }

    let settings = ProgressSettings::load_from(temp_dir.path().join("progline.toml")).unwrap();

    unsafe {
        env::remove_var("PROGLINE_CHANGEDELAY");
        env::remove_var("PROGLINE_DISABLE");
    }

    assert_eq!(settings.changedelay, 2.5);
    assert!(settings.disable);
}

#[test]
fn test_env_beats_toml_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("progline.toml");
    fs::write(&path, "estimateinterval = 10.0\n").unwrap();

    unsafe {
        env::set_var("PROGLINE_ESTIMATEINTERVAL", "30.0");
    }
    let settings = ProgressSettings::load_from(&path).unwrap();
    unsafe {
        env::remove_var("PROGLINE_ESTIMATEINTERVAL");
    }

    assert_eq!(settings.estimateinterval, 30.0);
}
