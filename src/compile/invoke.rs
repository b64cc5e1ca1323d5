// src/compile/invoke.rs

use std::process::Stdio;

use anyhow::{anyhow, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

/// Run the external schema compiler once and capture the generated source.
///
/// `args` is the full argument list: the static command template plus the
/// input file paths for this invocation. Stdout is the generated module
/// text; stderr is drained concurrently and logged at debug so the pipe
/// buffer never fills up on chatty compilers.
///
/// Fails if the program cannot be spawned or exits nonzero. Callers decide
/// whether that failure is fatal (it never is — emit passes log and move on).
pub async fn invoke_compiler(program: &str, args: &[String]) -> Result<String> {
    debug!(program = %program, ?args, "invoking schema compiler");

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("spawning schema compiler '{program}'"))?;

    let stderr = child.stderr.take();
    let stderr_task = tokio::spawn(async move {
        let mut captured = String::new();
        if let Some(stderr) = stderr {
            let reader = BufReader::new(stderr);
            let mut lines = reader.lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!("compiler stderr: {}", line);
                captured.push_str(&line);
                captured.push('\n');
            }
        }
        captured
    });

    let output = child
        .wait_with_output()
        .await
        .with_context(|| format!("waiting for schema compiler '{program}'"))?;

    let stderr_text = stderr_task.await.unwrap_or_default();

    if !output.status.success() {
        let code = output.status.code().unwrap_or(-1);
        return Err(anyhow!(
            "schema compiler '{program}' exited with code {code}: {}",
            stderr_text.trim()
        ));
    }

    let text = String::from_utf8(output.stdout)
        .context("schema compiler produced non-UTF-8 output")?;

    Ok(text)
}
