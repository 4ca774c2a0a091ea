//! Integration tests for npm-install

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;

    fn npm_install() -> Command {
        cargo_bin_cmd!("npm-install")
    }

    #[test]
    fn help_displays() {
        npm_install()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("dependency installation"));
    }

    #[test]
    fn version_displays() {
        npm_install()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("npm-install"));
    }

    #[test]
    fn build_help() {
        npm_install()
            .args(["build", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--layers-dir"));
    }

    #[test]
    fn build_requires_build_or_launch() {
        npm_install()
            .args(["build", "--layers-dir", "/tmp/layers"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--build"));
    }
}

mod build_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// Stands in for npm: reports a user-agent and writes a tree on
    /// install/ci; every other subcommand succeeds silently.
    const FAKE_NPM: &str = r#"#!/bin/sh
case "$1" in
  get) echo "npm/10.2.4 node/v20.11.0 linux x64" ;;
  install|ci)
    mkdir -p node_modules/leftpad
    echo "module.exports = 1" > node_modules/leftpad/index.js
    ;;
esac
exit 0
"#;

    struct Workspace {
        _temp: TempDir,
        bin: PathBuf,
        app: PathBuf,
        layers: PathBuf,
        tmp: PathBuf,
    }

    fn workspace() -> Workspace {
        let temp = TempDir::new().unwrap();
        let bin = temp.path().join("bin");
        let app = temp.path().join("app");
        let layers = temp.path().join("layers");
        let tmp = temp.path().join("tmp");
        for dir in [&bin, &app, &layers, &tmp] {
            fs::create_dir_all(dir).unwrap();
        }

        let npm = bin.join("npm");
        fs::write(&npm, FAKE_NPM).unwrap();
        fs::set_permissions(&npm, fs::Permissions::from_mode(0o755)).unwrap();

        fs::write(app.join("package.json"), r#"{"name": "app"}"#).unwrap();

        Workspace {
            _temp: temp,
            bin,
            app,
            layers,
            tmp,
        }
    }

    fn npm_install(ws: &Workspace) -> Command {
        let path = format!(
            "{}:{}",
            ws.bin.display(),
            std::env::var("PATH").unwrap_or_default()
        );
        let mut cmd = cargo_bin_cmd!("npm-install");
        cmd.env("PATH", path)
            .env_remove("BP_NODE_PROJECT_PATH")
            .env_remove("NPM_CONFIG_GLOBALCONFIG");
        cmd
    }

    fn build(ws: &Workspace, plan: &[&str]) -> Command {
        let mut cmd = npm_install(ws);
        cmd.arg("build")
            .arg("--app-dir")
            .arg(&ws.app)
            .arg("--layers-dir")
            .arg(&ws.layers)
            .arg("--tmp-dir")
            .arg(&ws.tmp)
            .args(plan);
        cmd
    }

    fn resolves_to(link: &Path) -> PathBuf {
        fs::canonicalize(link).unwrap()
    }

    #[test]
    fn build_installs_into_build_layer() {
        let ws = workspace();

        build(&ws, &["--build"])
            .assert()
            .success()
            .stdout(predicate::str::contains("build-modules"));

        let record = fs::read_to_string(ws.layers.join("build-modules.toml")).unwrap();
        assert!(record.contains("build = true"));
        assert!(ws
            .layers
            .join("build-modules/node_modules/leftpad/index.js")
            .is_file());
        assert_eq!(
            resolves_to(&ws.app.join("node_modules")),
            resolves_to(&ws.layers.join("build-modules/node_modules"))
        );
    }

    #[test]
    fn locked_project_is_skipped_when_unchanged() {
        let ws = workspace();
        fs::write(ws.app.join("package-lock.json"), r#"{"packages": {}}"#).unwrap();
        fs::create_dir_all(ws.app.join("npm-cache")).unwrap();

        build(&ws, &["--build"]).assert().success();
        let first = fs::read_to_string(ws.layers.join("build-modules.toml")).unwrap();
        assert!(first.contains("cache_sha"));

        fs::remove_file(ws.app.join("node_modules")).unwrap();
        fs::create_dir_all(ws.app.join("npm-cache")).unwrap();

        build(&ws, &["--build", "-v"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Reusing cached layer"));
    }

    #[test]
    fn resolver_logs_every_probe_result() {
        let ws = workspace();

        build(&ws, &["--build"])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "package-lock.json: Not found, node_modules: Not found, \
                 npm-cache: Not found; selected 'npm install'",
            ));

        let ws = workspace();
        fs::write(ws.app.join("package-lock.json"), r#"{"packages": {}}"#).unwrap();
        fs::create_dir_all(ws.app.join("node_modules")).unwrap();
        fs::create_dir_all(ws.app.join("npm-cache")).unwrap();

        build(&ws, &["--build"])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "package-lock.json: Found, node_modules: Found, \
                 npm-cache: Found; selected 'npm ci'",
            ));
    }

    #[test]
    fn invalid_project_path_fails() {
        let ws = workspace();

        build(&ws, &["--launch"])
            .env("BP_NODE_PROJECT_PATH", "does-not-exist")
            .assert()
            .failure()
            .stderr(predicate::str::contains("BP_NODE_PROJECT_PATH"));
    }

    #[test]
    fn failing_npm_reports_step() {
        let ws = workspace();
        let npm = ws.bin.join("npm");
        fs::write(&npm, "#!/bin/sh\necho 'npm ERR! boom' >&2\nexit 1\n").unwrap();
        fs::set_permissions(&npm, fs::Permissions::from_mode(0o755)).unwrap();

        build(&ws, &["--build"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("npm install failed"));
    }

    #[test]
    fn setup_symlinks_repoints_to_launch_layer() {
        let ws = workspace();

        build(&ws, &["--build", "--launch"]).assert().success();
        assert!(fs::symlink_metadata(ws.app.join("node_modules"))
            .unwrap()
            .file_type()
            .is_symlink());

        // the build layer is not part of the runtime image
        fs::remove_dir_all(ws.layers.join("build-modules")).unwrap();

        let launch = ws.layers.join("launch-modules");
        npm_install(&ws)
            .arg("setup-symlinks")
            .arg("--app-dir")
            .arg(&ws.app)
            .arg("--layer")
            .arg(&launch)
            .assert()
            .success();

        assert!(ws.app.join("node_modules/leftpad/index.js").is_file());
        assert_eq!(
            resolves_to(&ws.app.join("node_modules")),
            resolves_to(&launch.join("node_modules"))
        );
    }

    #[test]
    fn setup_symlinks_without_links_fails() {
        let ws = workspace();

        npm_install(&ws)
            .arg("setup-symlinks")
            .arg("--app-dir")
            .arg(&ws.app)
            .arg("--layer")
            .arg(ws.layers.join("launch-modules"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("node_modules"));
    }
}
