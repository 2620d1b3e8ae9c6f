//! Integration tests for Menushot

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn menushot() -> Command {
        cargo_bin_cmd!("menushot")
    }

    /// Config file pointing every path into `dir`
    fn write_config(dir: &Path) -> PathBuf {
        let path = dir.join("config.toml");
        let data_dir = dir.join("data");
        let content = format!(
            "[paths]\ndata_dir = {:?}\ntemplate = {:?}\n\n[compiler]\nbinary = \"menushot-missing-typst\"\n\n[delivery]\nsend_hint = false\ncleanup_delay_secs = 0.0\n",
            data_dir.display().to_string(),
            dir.join("base.typ").display().to_string(),
        );
        std::fs::write(&path, content).unwrap();
        path
    }

    fn write_catalog(dir: &Path) -> PathBuf {
        let path = dir.join("catalog.json");
        std::fs::write(
            &path,
            r#"[
                {"name": "git_tools", "desc": "Repository helpers",
                 "nodes": [{"name": "git.log", "desc": "Show history"}]},
                {"name": "weather", "nodes": [{"name": "forecast"}]}
            ]"#,
        )
        .unwrap();
        path
    }

    #[test]
    fn help_displays() {
        menushot()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("cached raster menus"))
            .stdout(predicate::str::contains("render"))
            .stdout(predicate::str::contains("worker").not());
    }

    #[test]
    fn version_displays() {
        menushot()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("menushot"));
    }

    #[test]
    fn config_path_follows_flag() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("custom.toml");

        menushot()
            .arg("--config")
            .arg(&config)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("custom.toml"));
    }

    #[test]
    fn config_show() {
        let temp = TempDir::new().unwrap();
        let config = write_config(temp.path());

        menushot()
            .arg("--config")
            .arg(&config)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[rendering]"))
            .stdout(predicate::str::contains("giant_threshold = 1200"));
    }

    #[test]
    fn config_init_writes_defaults() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("nested").join("config.toml");

        menushot()
            .arg("--config")
            .arg(&config)
            .args(["config", "init"])
            .assert()
            .success();

        assert!(config.exists());
    }

    #[test]
    fn invalid_config_fails() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("config.toml");
        std::fs::write(&config, "[rendering]\nppi = \"high\"\n").unwrap();

        menushot()
            .arg("--config")
            .arg(&config)
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn cache_status_empty() {
        let temp = TempDir::new().unwrap();
        let config = write_config(temp.path());

        menushot()
            .arg("--config")
            .arg(&config)
            .args(["cache", "status"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No cached render"));
    }

    #[test]
    fn clean_removes_temp_files_only() {
        let temp = TempDir::new().unwrap();
        let config = write_config(temp.path());
        let data = temp.path().join("data");
        std::fs::create_dir_all(&data).unwrap();
        std::fs::write(data.join("temp_abc.json"), "{}").unwrap();
        std::fs::write(data.join("cache_menu_event.json"), "{}").unwrap();

        menushot()
            .arg("--config")
            .arg(&config)
            .arg("clean")
            .assert()
            .success()
            .stdout(predicate::str::contains("Removed 1"));

        assert!(!data.join("temp_abc.json").exists());
        assert!(data.join("cache_menu_event.json").exists());
    }

    #[test]
    fn worker_reports_bad_task() {
        menushot()
            .arg("worker")
            .write_stdin("not a task")
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""status":"failed""#))
            .stdout(predicate::str::contains("invalid render task"));
    }

    #[test]
    fn render_missing_catalog() {
        let temp = TempDir::new().unwrap();
        let config = write_config(temp.path());

        menushot()
            .arg("--config")
            .arg(&config)
            .args(["render", "--catalog"])
            .arg(temp.path().join("missing.json"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("Path not found"));
    }

    #[test]
    fn render_query_without_matches() {
        let temp = TempDir::new().unwrap();
        let config = write_config(temp.path());
        let catalog = write_catalog(temp.path());

        menushot()
            .arg("--config")
            .arg(&config)
            .args(["render", "--query", "zzz-nothing", "--catalog"])
            .arg(&catalog)
            .assert()
            .success()
            .stdout(predicate::str::contains("No entries match"));

        let leftovers: Vec<_> = std::fs::read_dir(temp.path().join("data"))
            .unwrap()
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn render_with_missing_compiler_fails_cleanly() {
        let temp = TempDir::new().unwrap();
        let config = write_config(temp.path());
        let catalog = write_catalog(temp.path());

        menushot()
            .arg("--config")
            .arg(&config)
            .args(["render", "--mode", "event", "--catalog"])
            .arg(&catalog)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Compilation failed"));

        let data = temp.path().join("data");
        assert!(data.join("cache_menu_event.json").exists());
        assert!(!data.join("cache_menu_event.hash").exists());
    }
}
