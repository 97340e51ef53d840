use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Path to the relink binary built for this test run.
fn relink_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_relink"))
}

/// A throwaway monorepo in a temp directory.
struct TestProject {
    dir: tempfile::TempDir,
}

impl TestProject {
    fn new() -> Self {
        Self {
            dir: tempfile::TempDir::new().unwrap(),
        }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Create a file relative to the project root.
    fn write_file(&self, rel_path: &str, content: &str) {
        let full = self.dir.path().join(rel_path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&full, content).unwrap();
    }

    fn read_file(&self, rel_path: &str) -> String {
        fs::read_to_string(self.dir.path().join(rel_path)).unwrap()
    }

    /// Run relink with the given args, with cwd set to project root.
    fn run(&self, args: &[&str]) -> std::process::Output {
        Command::new(relink_bin())
            .args(args)
            .current_dir(self.dir.path())
            .env_remove("RUST_LOG")
            .output()
            .expect("failed to run relink")
    }

    fn stdout(&self, args: &[&str]) -> String {
        let output = self.run(args);
        String::from_utf8_lossy(&output.stdout).to_string()
    }
}

/// Two packages, one consuming the other through its alias:
///
///   packages/main/src/components/Button.ts  -->  packages/main/src/utils/helper.ts
///   packages/other/src/Card.ts              -->  @alias/main/lib/utils/helper
fn create_basic_project() -> TestProject {
    let project = TestProject::new();
    project.write_file(
        "packages/main/src/utils/helper.ts",
        "export const helper = () => 1;\n",
    );
    project.write_file(
        "packages/main/src/components/Button.ts",
        "import { helper } from '../utils/helper';\nexport const Button = helper;\n",
    );
    project.write_file(
        "packages/other/src/Card.ts",
        "import { helper } from '@alias/main/lib/utils/helper';\nexport const Card = helper;\n",
    );
    project
}

#[test]
fn test_move_rewrites_imports() {
    let project = create_basic_project();
    let output = project.run(&[
        "move",
        "packages/main/src/utils/helper.ts",
        "packages/main/src/shared/helper.ts",
    ]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("2 files, 2 references updated"), "{}", stdout);
    assert!(project
        .read_file("packages/main/src/components/Button.ts")
        .starts_with("import { helper } from '../shared/helper';"));
    assert!(project
        .read_file("packages/other/src/Card.ts")
        .starts_with("import { helper } from '@alias/main/lib/shared/helper';"));
}

#[test]
fn test_dry_run_json_output() {
    let project = create_basic_project();
    let stdout = project.stdout(&[
        "move",
        "packages/main/src/utils/helper.ts",
        "packages/main/src/shared/helper.ts",
        "--dry-run",
        "--format",
        "json",
    ]);

    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["dry_run"], true);
    assert_eq!(report["moves"][0]["status"], "applied");
    assert_eq!(report["moves"][0]["files_updated"], 2);
    assert!(project.path().join("packages/main/src/utils/helper.ts").exists());
    assert!(project
        .read_file("packages/main/src/components/Button.ts")
        .starts_with("import { helper } from '../utils/helper';"));
}

#[test]
fn test_verbose_lists_rewritten_references() {
    let project = create_basic_project();
    let stdout = project.stdout(&[
        "--verbose",
        "move",
        "packages/main/src/utils/helper.ts",
        "packages/main/src/shared/helper.ts",
    ]);
    assert!(
        stdout.contains("[self] '../utils/helper' -> '../shared/helper'"),
        "{}",
        stdout
    );
    assert!(
        stdout.contains("[cross-module] '@alias/main/lib/utils/helper' -> '@alias/main/lib/shared/helper'"),
        "{}",
        stdout
    );
}

#[test]
fn test_batch_with_failed_move_exits_nonzero() {
    let project = create_basic_project();
    project.write_file(
        "moves.json",
        r#"[
  {"from": "packages/main/src/missing.ts", "to": "packages/main/src/found.ts"},
  {"from": "packages/main/src/utils", "to": "packages/main/src/lib"}
]"#,
    );

    let output = project.run(&["batch", "moves.json"]);
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("FAILED packages/main/src/missing.ts"), "{}", stdout);
    assert!(project.path().join("packages/main/src/lib/helper.ts").exists());
    assert!(!project.path().join("packages/main/src/utils").exists());
    assert!(project
        .read_file("packages/main/src/components/Button.ts")
        .starts_with("import { helper } from '../lib/helper';"));
}

#[test]
fn test_malformed_batch_aborts_before_moving() {
    let project = create_basic_project();
    project.write_file("moves.json", r#"{"from": "a", "to": "b"}"#);

    let output = project.run(&["batch", "moves.json"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid batch file"), "{}", stderr);
    assert!(project.path().join("packages/main/src/utils/helper.ts").exists());
}

#[test]
fn test_config_file_changes_alias_convention() {
    let project = TestProject::new();
    project.write_file(
        "relink.toml",
        "package_roots = [\"libs\"]\nalias_prefix = \"@acme\"\noutput_folder = \"dist\"\n",
    );
    project.write_file("libs/core/src/a.ts", "export const a = 1;\n");
    project.write_file(
        "libs/ui/src/b.ts",
        "import { a } from '@acme/core/dist/a';\nexport const b = a;\n",
    );

    let output = project.run(&["move", "libs/core/src/a.ts", "libs/core/src/nested/a.ts"]);
    assert!(output.status.success());
    assert!(project
        .read_file("libs/ui/src/b.ts")
        .starts_with("import { a } from '@acme/core/dist/nested/a';"));
}

#[test]
fn test_missing_root_is_an_error() {
    let project = create_basic_project();
    let output = project.run(&["--root", "does-not-exist", "move", "a.ts", "b.ts"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Project root not found"));
}
