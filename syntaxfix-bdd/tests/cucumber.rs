use assert_cmd::Command;
use camino::Utf8PathBuf;
use cucumber::gherkin::Step;
use cucumber::{given, then, when, World};
use fs_err as fs;
use syntaxfix_bdd::docstring_body;
use syntaxfix_cli::config::CONFIG_FILE_NAME;
use syntaxfix_types::report::{Convergence, FileOutcome, FileStatus, RunReport};
use tempfile::TempDir;

#[derive(Debug, Default, World)]
pub struct SyntaxfixWorld {
    temp: Option<TempDir>,
    root: Option<Utf8PathBuf>,
    exit_code: Option<i32>,
    report: Option<RunReport>,
}

impl SyntaxfixWorld {
    fn root(&mut self) -> Utf8PathBuf {
        if self.root.is_none() {
            let td = tempfile::tempdir().expect("tempdir");
            let root = Utf8PathBuf::from_path_buf(td.path().to_path_buf()).expect("utf8 tempdir");
            self.temp = Some(td);
            self.root = Some(root);
        }
        self.root.clone().expect("root set")
    }

    fn report(&self) -> &RunReport {
        self.report.as_ref().expect("syntaxfix has run")
    }

    fn file(&self, path: &str) -> &FileOutcome {
        self.report()
            .files
            .iter()
            .find(|f| f.path == path)
            .unwrap_or_else(|| panic!("no outcome for {path}"))
    }

    fn run(&mut self, args: &[&str]) {
        let root = self.root();
        let output = Command::cargo_bin("syntaxfix")
            .expect("syntaxfix binary")
            .current_dir(root.as_str())
            .args(["--format", "json"])
            .args(args)
            .output()
            .expect("run syntaxfix");
        self.exit_code = output.status.code();
        let report: RunReport =
            serde_json::from_slice(&output.stdout).expect("json report on stdout");
        self.report = Some(report);
    }
}

fn write_file(world: &mut SyntaxfixWorld, rel: &str, step: &Step) {
    let path = world.root().join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let body = docstring_body(step.docstring.as_deref().expect("doc string"));
    fs::write(&path, body).unwrap();
}

#[given(expr = "a TypeScript file {string} with:")]
async fn typescript_file(world: &mut SyntaxfixWorld, step: &Step, rel: String) {
    write_file(world, &rel, step);
}

#[given(expr = "a rule file {string} with:")]
async fn rule_file(world: &mut SyntaxfixWorld, step: &Step, rel: String) {
    write_file(world, &rel, step);
}

#[given(expr = "a config file excluding {string}")]
async fn config_excluding(world: &mut SyntaxfixWorld, pattern: String) {
    let path = world.root().join(CONFIG_FILE_NAME);
    fs::write(&path, format!("[run]\nexclude = [\"{pattern}\"]\n")).unwrap();
}

#[when("I run syntaxfix")]
async fn run_default(world: &mut SyntaxfixWorld) {
    world.run(&[]);
}

#[when("I run syntaxfix with --dry-run")]
async fn run_dry(world: &mut SyntaxfixWorld) {
    world.run(&["--dry-run"]);
}

#[when(expr = "I run syntaxfix with only the rule file {string}")]
async fn run_with_rule_file(world: &mut SyntaxfixWorld, rel: String) {
    world.run(&["--no-builtin-rules", "--rules", &rel]);
}

#[then("the run succeeds")]
async fn run_succeeds(world: &mut SyntaxfixWorld) {
    assert_eq!(world.exit_code, Some(0));
}

#[then(expr = "the run exits with code {int}")]
async fn run_exits_with(world: &mut SyntaxfixWorld, code: i32) {
    assert_eq!(world.exit_code, Some(code));
}

#[then(expr = "the file {string} contains {string}")]
async fn file_contains(world: &mut SyntaxfixWorld, rel: String, needle: String) {
    let body = fs::read_to_string(world.root().join(&rel)).unwrap();
    assert!(
        body.lines().any(|line| line == needle),
        "expected a line {needle:?} in {rel}, got:\n{body}"
    );
}

#[then(expr = "the report lists {string} as modified")]
async fn listed_as_modified(world: &mut SyntaxfixWorld, rel: String) {
    assert_eq!(world.file(&rel).status, FileStatus::Modified);
}

#[then("the report lists no modified files")]
async fn no_modified_files(world: &mut SyntaxfixWorld) {
    assert_eq!(world.report().summary.files_modified, 0);
    assert_eq!(world.report().modified_paths().count(), 0);
}

#[then(expr = "{string} converged after {int} pass")]
async fn converged_after(world: &mut SyntaxfixWorld, rel: String, passes: u32) {
    let file = world.file(&rel);
    assert_eq!(file.convergence, Convergence::Converged);
    assert_eq!(file.passes_used, passes);
}

#[then(expr = "{string} is reported as oscillating")]
async fn reported_oscillating(world: &mut SyntaxfixWorld, rel: String) {
    let file = world.file(&rel);
    assert_eq!(file.status, FileStatus::Held);
    assert!(matches!(file.convergence, Convergence::Oscillating { .. }));
    assert!(world.report().non_converged.contains(&rel));
}

#[then(expr = "the report lists {string} as skipped")]
async fn listed_as_skipped(world: &mut SyntaxfixWorld, rel: String) {
    let report = world.report();
    assert!(
        report.skipped.iter().any(|s| s.path.ends_with(&rel)),
        "expected {rel} among skipped: {:?}",
        report.skipped
    );
    assert!(report.files.iter().all(|f| f.path != rel));
}

#[tokio::main]
async fn main() {
    let features_path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("features");
    SyntaxfixWorld::cucumber().run(features_path).await;
}
