//! Layered `.env` loading for the configuration directory.
//!
//! Precedence, highest first: values already set in the process
//! environment (never overridden) > `.env.{APP_ENV}.local` >
//! `.env.{APP_ENV}` > `.env.local` > `.env`. Problems with these optional
//! files are logged and skipped; they never abort a registry load.

use std::path::Path;

use tracing::{debug, warn};

/// Names the active environment, e.g. `production` or `test`.
const APP_ENV_VAR: &str = "APP_ENV";

pub fn load_env_files(config_dir: &Path) {
    let mut candidates: Vec<String> = Vec::new();
    if let Ok(env_name) = std::env::var(APP_ENV_VAR) {
        let env_name = env_name.trim();
        if !env_name.is_empty() {
            candidates.push(format!(".env.{env_name}.local"));
            candidates.push(format!(".env.{env_name}"));
        }
    }
    candidates.push(".env.local".to_string());
    candidates.push(".env".to_string());

    // dotenvy never overrides variables that are already set, so loading
    // in precedence order yields the layering above.
    for name in candidates {
        let path = config_dir.join(&name);
        if !path.is_file() {
            continue;
        }
        match dotenvy::from_path(&path) {
            Ok(()) => debug!("Loaded environment file {}", path.display()),
            Err(err) => warn!("Skipping environment file {}: {err}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serial_test::serial;
    use tempfile::TempDir;

    use super::*;

    #[test]
    #[serial]
    fn local_file_takes_precedence_over_base() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(".env"),
            "OPGATE_ENVTEST_A=base\nOPGATE_ENVTEST_B=only_base\n",
        )
        .unwrap();
        fs::write(dir.path().join(".env.local"), "OPGATE_ENVTEST_A=local\n").unwrap();
        std::env::remove_var("OPGATE_ENVTEST_A");
        std::env::remove_var("OPGATE_ENVTEST_B");

        load_env_files(dir.path());

        assert_eq!(std::env::var("OPGATE_ENVTEST_A").unwrap(), "local");
        assert_eq!(std::env::var("OPGATE_ENVTEST_B").unwrap(), "only_base");

        std::env::remove_var("OPGATE_ENVTEST_A");
        std::env::remove_var("OPGATE_ENVTEST_B");
    }

    #[test]
    #[serial]
    fn shell_values_are_never_overridden() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".env"), "OPGATE_ENVTEST_SHELL=from_file\n").unwrap();
        std::env::set_var("OPGATE_ENVTEST_SHELL", "from_shell");

        load_env_files(dir.path());

        assert_eq!(std::env::var("OPGATE_ENVTEST_SHELL").unwrap(), "from_shell");
        std::env::remove_var("OPGATE_ENVTEST_SHELL");
    }

    #[test]
    #[serial]
    fn environment_specific_file_outranks_generic_local() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".env.staging"), "OPGATE_ENVTEST_C=staging\n").unwrap();
        fs::write(dir.path().join(".env.local"), "OPGATE_ENVTEST_C=local\n").unwrap();
        std::env::remove_var("OPGATE_ENVTEST_C");
        std::env::set_var(APP_ENV_VAR, "staging");

        load_env_files(dir.path());

        assert_eq!(std::env::var("OPGATE_ENVTEST_C").unwrap(), "staging");
        std::env::remove_var("OPGATE_ENVTEST_C");
        std::env::remove_var(APP_ENV_VAR);
    }

    #[test]
    #[serial]
    fn malformed_file_is_skipped_without_panicking() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".env"), "not a valid line\u{0}\n").unwrap();
        fs::write(dir.path().join(".env.local"), "OPGATE_ENVTEST_D=ok\n").unwrap();
        std::env::remove_var("OPGATE_ENVTEST_D");

        load_env_files(dir.path());

        assert_eq!(std::env::var("OPGATE_ENVTEST_D").unwrap(), "ok");
        std::env::remove_var("OPGATE_ENVTEST_D");
    }

    #[test]
    #[serial]
    fn missing_files_are_fine() {
        let dir = TempDir::new().unwrap();
        load_env_files(dir.path());
    }
}
