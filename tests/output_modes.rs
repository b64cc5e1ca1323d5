use std::error::Error;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::tempdir;

use protowatch::config::ConfigFile;
use protowatch::emit::{DependencySet, NoopHost, OutputCoordinator};
use protowatch::track::ChangeTracker;
use protowatch::watch::InputPatterns;

type TestResult = Result<(), Box<dyn Error>>;

/// Write a stand-in schema compiler: a shell script that logs each
/// invocation, cats every file argument to stdout, and (optionally) exits
/// nonzero when a file contains `fail_marker`.
fn write_fake_compiler(
    dir: &Path,
    log: &Path,
    fail_marker: Option<&str>,
) -> Result<PathBuf, Box<dyn Error>> {
    let marker = fail_marker.unwrap_or("");
    let script = format!(
        r#"#!/bin/sh
echo "invoked: $*" >> "{log}"
for arg in "$@"; do
  if [ -f "$arg" ]; then
    if [ -n "{marker}" ] && grep -q "{marker}" "$arg"; then
      exit 1
    fi
    cat "$arg"
  fi
done
"#,
        log = log.display(),
        marker = marker,
    );

    let path = dir.join("fake-compiler.sh");
    fs::write(&path, script)?;
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
    Ok(path)
}

fn invocations(log: &Path) -> Vec<String> {
    fs::read_to_string(log)
        .unwrap_or_default()
        .lines()
        .filter(|l| l.starts_with("invoked:"))
        .map(str::to_string)
        .collect()
}

fn setup_schemas(root: &Path) -> Result<(PathBuf, PathBuf), Box<dyn Error>> {
    let schemas = root.join("schemas");
    fs::create_dir_all(&schemas)?;
    let a = schemas.join("a.proto");
    let b = schemas.join("b.proto");
    fs::write(&a, "message A {}\n")?;
    fs::write(&b, "message B {}\n")?;
    Ok((a, b))
}

fn coordinator(toml_src: &str) -> Result<OutputCoordinator, Box<dyn Error>> {
    let cfg: ConfigFile = toml::from_str(toml_src)?;
    Ok(OutputCoordinator::new(cfg))
}

#[tokio::test]
async fn combined_mode_writes_one_merged_module_into_a_directory() -> TestResult {
    let dir = tempdir()?;
    let root = dir.path();
    setup_schemas(root)?;
    let log = root.join("compiler.log");
    let compiler = write_fake_compiler(root, &log, None)?;
    let out_dir = root.join("generated");

    let coord = coordinator(&format!(
        r#"
        input = "{root}/schemas/*.proto"
        output = "{out}"
        output_mode = "combined"
        compiler = "{compiler}"
        "#,
        root = root.display(),
        out = out_dir.display(),
        compiler = compiler.display(),
    ))?;

    let patterns = InputPatterns::compile(&format!("{}/schemas/*.proto", root.display()))?;
    let mut tracker = ChangeTracker::new();
    let summary = coord
        .run_pass(&patterns, &mut tracker, &mut NoopHost)
        .await;

    assert_eq!(summary.matched, 2);
    assert_eq!(invocations(&log).len(), 1);

    let merged = fs::read_to_string(out_dir.join("basic.proto.js"))?;
    assert!(merged.contains("message A {}"));
    assert!(merged.contains("message B {}"));

    // Exactly one output file was produced.
    assert_eq!(fs::read_dir(&out_dir)?.count(), 1);

    Ok(())
}

#[tokio::test]
async fn combined_mode_uses_an_explicit_js_output_path_verbatim() -> TestResult {
    let dir = tempdir()?;
    let root = dir.path();
    setup_schemas(root)?;
    let log = root.join("compiler.log");
    let compiler = write_fake_compiler(root, &log, None)?;
    let out_file = root.join("generated/bundle.js");

    let coord = coordinator(&format!(
        r#"
        input = "{root}/schemas/*.proto"
        output = "{out}"
        output_mode = "combined"
        compiler = "{compiler}"
        "#,
        root = root.display(),
        out = out_file.display(),
        compiler = compiler.display(),
    ))?;

    let patterns = InputPatterns::compile(&format!("{}/schemas/*.proto", root.display()))?;
    let mut tracker = ChangeTracker::new();
    coord.run_pass(&patterns, &mut tracker, &mut NoopHost).await;

    assert!(out_file.is_file());
    Ok(())
}

#[tokio::test]
async fn combined_mode_failure_writes_nothing_and_completes() -> TestResult {
    let dir = tempdir()?;
    let root = dir.path();
    setup_schemas(root)?;
    let log = root.join("compiler.log");
    // Every schema contains "message", so the compiler always exits nonzero.
    let compiler = write_fake_compiler(root, &log, Some("message"))?;
    let out_dir = root.join("generated");

    let coord = coordinator(&format!(
        r#"
        input = "{root}/schemas/*.proto"
        output = "{out}"
        output_mode = "combined"
        compiler = "{compiler}"
        "#,
        root = root.display(),
        out = out_dir.display(),
        compiler = compiler.display(),
    ))?;

    let patterns = InputPatterns::compile(&format!("{}/schemas/*.proto", root.display()))?;
    let mut tracker = ChangeTracker::new();

    // The pass completes despite the compiler failure and creates neither the
    // output file nor its directory.
    let summary = coord.run_pass(&patterns, &mut tracker, &mut NoopHost).await;
    assert_eq!(summary.matched, 2);
    assert_eq!(invocations(&log).len(), 1);
    assert!(!out_dir.exists());

    Ok(())
}

#[tokio::test]
async fn combined_mode_recompiles_all_inputs_even_when_unchanged() -> TestResult {
    let dir = tempdir()?;
    let root = dir.path();
    setup_schemas(root)?;
    let log = root.join("compiler.log");
    let compiler = write_fake_compiler(root, &log, None)?;

    let coord = coordinator(&format!(
        r#"
        input = "{root}/schemas/*.proto"
        output = "{root}/generated"
        output_mode = "combined"
        compiler = "{compiler}"
        "#,
        root = root.display(),
        compiler = compiler.display(),
    ))?;

    let patterns = InputPatterns::compile(&format!("{}/schemas/*.proto", root.display()))?;
    let mut tracker = ChangeTracker::new();

    coord.run_pass(&patterns, &mut tracker, &mut NoopHost).await;
    let second = coord.run_pass(&patterns, &mut tracker, &mut NoopHost).await;

    // Nothing changed, yet the merged output must reflect all inputs, so the
    // compiler ran again over both files.
    assert_eq!(second.changed, 0);
    let lines = invocations(&log);
    assert_eq!(lines.len(), 2);
    assert!(lines[1].contains("a.proto"));
    assert!(lines[1].contains("b.proto"));

    Ok(())
}

#[tokio::test]
async fn per_file_mode_compiles_only_the_changed_subset() -> TestResult {
    let dir = tempdir()?;
    let root = dir.path();
    let (a, _b) = setup_schemas(root)?;
    let log = root.join("compiler.log");
    let compiler = write_fake_compiler(root, &log, None)?;
    let out_dir = root.join("generated");

    let coord = coordinator(&format!(
        r#"
        input = "{root}/schemas/*.proto"
        output = "{out}"
        compiler = "{compiler}"
        "#,
        root = root.display(),
        out = out_dir.display(),
        compiler = compiler.display(),
    ))?;

    let patterns = InputPatterns::compile(&format!("{}/schemas/*.proto", root.display()))?;
    let mut tracker = ChangeTracker::new();

    // First pass: everything is new, both files compile.
    let first = coord.run_pass(&patterns, &mut tracker, &mut NoopHost).await;
    assert_eq!(first.changed, 2);
    assert!(out_dir.join("a.js").is_file());
    assert!(out_dir.join("b.js").is_file());
    assert_eq!(invocations(&log).len(), 2);

    // Second pass: only a.proto changed.
    fs::write(&a, "message A { int32 id = 1; }\n")?;
    fs::remove_file(&log).ok();

    let second = coord.run_pass(&patterns, &mut tracker, &mut NoopHost).await;
    assert_eq!(second.matched, 2);
    assert_eq!(second.changed, 1);

    let lines = invocations(&log);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("a.proto"));
    assert!(!lines[0].contains("b.proto"));

    let regenerated = fs::read_to_string(out_dir.join("a.js"))?;
    assert!(regenerated.contains("int32 id"));

    Ok(())
}

#[tokio::test]
async fn per_file_mode_short_circuits_on_an_empty_change_set() -> TestResult {
    let dir = tempdir()?;
    let root = dir.path();
    setup_schemas(root)?;
    let log = root.join("compiler.log");
    let compiler = write_fake_compiler(root, &log, None)?;
    let out_dir = root.join("generated");

    let coord = coordinator(&format!(
        r#"
        input = "{root}/schemas/*.proto"
        output = "{out}"
        compiler = "{compiler}"
        "#,
        root = root.display(),
        out = out_dir.display(),
        compiler = compiler.display(),
    ))?;

    let patterns = InputPatterns::compile(&format!("{}/schemas/*.proto", root.display()))?;
    let mut tracker = ChangeTracker::new();

    coord.run_pass(&patterns, &mut tracker, &mut NoopHost).await;

    // Remove the outputs; an empty change set must not recreate anything.
    fs::remove_dir_all(&out_dir)?;
    fs::remove_file(&log)?;

    let second = coord.run_pass(&patterns, &mut tracker, &mut NoopHost).await;
    assert_eq!(second.changed, 0);
    assert!(invocations(&log).is_empty());
    assert!(!out_dir.exists());

    Ok(())
}

#[tokio::test]
async fn abort_policy_voids_the_whole_batch_on_one_failure() -> TestResult {
    let dir = tempdir()?;
    let root = dir.path();
    let (_a, b) = setup_schemas(root)?;
    fs::write(&b, "message B {} // BAD\n")?;
    let log = root.join("compiler.log");
    let compiler = write_fake_compiler(root, &log, Some("BAD"))?;
    let out_dir = root.join("generated");

    let coord = coordinator(&format!(
        r#"
        input = "{root}/schemas/*.proto"
        output = "{out}"
        compiler = "{compiler}"
        "#,
        root = root.display(),
        out = out_dir.display(),
        compiler = compiler.display(),
    ))?;

    let patterns = InputPatterns::compile(&format!("{}/schemas/*.proto", root.display()))?;
    let mut tracker = ChangeTracker::new();

    // The pass completes despite the failure; no outputs appear.
    coord.run_pass(&patterns, &mut tracker, &mut NoopHost).await;

    assert!(!out_dir.join("a.js").exists());
    assert!(!out_dir.join("b.js").exists());

    Ok(())
}

#[tokio::test]
async fn continue_policy_writes_the_outputs_that_succeeded() -> TestResult {
    let dir = tempdir()?;
    let root = dir.path();
    let (_a, b) = setup_schemas(root)?;
    fs::write(&b, "message B {} // BAD\n")?;
    let log = root.join("compiler.log");
    let compiler = write_fake_compiler(root, &log, Some("BAD"))?;
    let out_dir = root.join("generated");

    let coord = coordinator(&format!(
        r#"
        input = "{root}/schemas/*.proto"
        output = "{out}"
        compiler = "{compiler}"

        [batch]
        on_error = "continue"
        "#,
        root = root.display(),
        out = out_dir.display(),
        compiler = compiler.display(),
    ))?;

    let patterns = InputPatterns::compile(&format!("{}/schemas/*.proto", root.display()))?;
    let mut tracker = ChangeTracker::new();
    coord.run_pass(&patterns, &mut tracker, &mut NoopHost).await;

    assert!(out_dir.join("a.js").is_file());
    assert!(!out_dir.join("b.js").exists());

    Ok(())
}

#[tokio::test]
async fn bounded_concurrency_still_compiles_every_changed_file() -> TestResult {
    let dir = tempdir()?;
    let root = dir.path();
    let schemas = root.join("schemas");
    fs::create_dir_all(&schemas)?;
    for i in 0..6 {
        fs::write(schemas.join(format!("m{i}.proto")), format!("message M{i} {{}}\n"))?;
    }
    let log = root.join("compiler.log");
    let compiler = write_fake_compiler(root, &log, None)?;
    let out_dir = root.join("generated");

    let coord = coordinator(&format!(
        r#"
        input = "{root}/schemas/*.proto"
        output = "{out}"
        compiler = "{compiler}"

        [batch]
        concurrency = 2
        "#,
        root = root.display(),
        out = out_dir.display(),
        compiler = compiler.display(),
    ))?;

    let patterns = InputPatterns::compile(&format!("{}/schemas/*.proto", root.display()))?;
    let mut tracker = ChangeTracker::new();
    let summary = coord.run_pass(&patterns, &mut tracker, &mut NoopHost).await;

    assert_eq!(summary.changed, 6);
    assert_eq!(invocations(&log).len(), 6);
    for i in 0..6 {
        assert!(out_dir.join(format!("m{i}.js")).is_file());
    }

    Ok(())
}

#[tokio::test]
async fn every_matched_file_is_registered_with_the_host() -> TestResult {
    let dir = tempdir()?;
    let root = dir.path();
    let (a, b) = setup_schemas(root)?;
    let log = root.join("compiler.log");
    let compiler = write_fake_compiler(root, &log, None)?;

    let coord = coordinator(&format!(
        r#"
        input = "{root}/schemas/*.proto"
        output = "{root}/generated"
        compiler = "{compiler}"
        "#,
        root = root.display(),
        compiler = compiler.display(),
    ))?;

    let patterns = InputPatterns::compile(&format!("{}/schemas/*.proto", root.display()))?;
    let mut tracker = ChangeTracker::new();

    coord
        .run_pass(&patterns, &mut tracker, &mut DependencySet::new())
        .await;

    // Unchanged files are still build inputs on subsequent passes.
    let mut host = DependencySet::new();
    coord.run_pass(&patterns, &mut tracker, &mut host).await;
    assert_eq!(host.len(), 2);
    assert!(host.contains(&a));
    assert!(host.contains(&b));

    // Registered dependencies are stored as absolute paths.
    assert!(host.iter().all(|p| p.is_absolute()));

    Ok(())
}
