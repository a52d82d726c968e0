use anyhow::{Context, Result};
use std::io::Read;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

static ATTACHED: AtomicBool = AtomicBool::new(false);
static INTERRUPT_HANDLER: Once = Once::new();

/// Builds a [`Command`] from a configured prefix such as `["docker", "compose"]`.
///
/// # Errors
///
/// Returns an error if the prefix is empty.
pub fn command_from(prefix: &[String]) -> Result<Command> {
    let (program, args) = prefix
        .split_first()
        .context("Command prefix must contain at least the program name")?;
    let mut cmd = Command::new(program);
    cmd.args(args);
    Ok(cmd)
}

/// Shell-quoted rendering of `cmd`'s argv, for logs and messages.
pub fn argv(cmd: &Command) -> String {
    let parts: Vec<String> = std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|s| s.to_string_lossy().into_owned())
        .collect();
    shlex::try_join(parts.iter().map(String::as_str)).unwrap_or_else(|_| parts.join(" "))
}

fn report(cmd: &Command, status: ExitStatus) -> ExitStatus {
    if !status.success() {
        match status.code() {
            Some(code) => warn!("`{}` exited with code {}", argv(cmd), code),
            None => warn!("`{}` was terminated by a signal", argv(cmd)),
        }
    }
    status
}

/// Runs `cmd` to completion with inherited stdio.
///
/// A non-zero exit is logged and handed back, not turned into an error: the caller decides
/// whether it matters.
///
/// # Errors
///
/// Returns an error if the process cannot be spawned.
pub fn run_logged(cmd: &mut Command) -> Result<ExitStatus> {
    debug!("Running `{}`", argv(cmd));
    let status = cmd
        .status()
        .with_context(|| format!("Failed to execute `{}`", argv(cmd)))?;
    Ok(report(cmd, status))
}

/// Runs `cmd` and returns its stdout. Stderr is passed through.
///
/// # Errors
///
/// Returns an error if the process cannot be spawned or its output is not UTF-8.
pub fn capture(cmd: &mut Command) -> Result<(ExitStatus, String)> {
    debug!("Running `{}`", argv(cmd));
    let output = cmd
        .stdin(Stdio::null())
        .stderr(Stdio::inherit())
        .output()
        .with_context(|| format!("Failed to execute `{}`", argv(cmd)))?;
    let stdout = String::from_utf8(output.stdout)
        .with_context(|| format!("`{}` printed invalid UTF-8", argv(cmd)))?;
    Ok((report(cmd, output.status), stdout))
}

/// Runs `cmd` with `input` fed to its stdin.
///
/// # Errors
///
/// Returns an error if the process cannot be spawned or the input cannot be copied.
pub fn run_with_input(cmd: &mut Command, mut input: impl Read) -> Result<ExitStatus> {
    debug!("Running `{}` with piped input", argv(cmd));
    let mut child = cmd
        .stdin(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to execute `{}`", argv(cmd)))?;
    if let Some(mut stdin) = child.stdin.take() {
        std::io::copy(&mut input, &mut stdin)
            .with_context(|| format!("Failed to feed input to `{}`", argv(cmd)))?;
    }
    let status = child
        .wait()
        .with_context(|| format!("Failed to wait for `{}`", argv(cmd)))?;
    Ok(report(cmd, status))
}

/// Runs a long-lived foreground session such as `logs -f` or `exec -it`.
///
/// While the session runs, Ctrl+C is left to the child (it shares our process group) and
/// does not terminate svcmgr, so control returns to the caller once the child exits.
///
/// # Errors
///
/// Returns an error if the process cannot be spawned.
pub fn attach(cmd: &mut Command) -> Result<ExitStatus> {
    install_interrupt_handler();

    debug!("Attaching to `{}`", argv(cmd));
    let mut child = cmd
        .spawn()
        .with_context(|| format!("Failed to execute `{}`", argv(cmd)))?;

    ATTACHED.store(true, Ordering::SeqCst);
    let status = child.wait();
    ATTACHED.store(false, Ordering::SeqCst);

    let status = status.with_context(|| format!("Failed to wait for `{}`", argv(cmd)))?;
    Ok(report(cmd, status))
}

fn install_interrupt_handler() {
    INTERRUPT_HANDLER.call_once(|| {
        let installed = ctrlc::set_handler(|| {
            if !ATTACHED.load(Ordering::SeqCst) {
                std::process::exit(130);
            }
            // Let the child handle it.
        });
        if let Err(e) = installed {
            warn!("Failed to install Ctrl+C handler: {}", e);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argv_quotes_arguments() {
        let mut cmd = Command::new("docker");
        cmd.args(["compose", "-f", "/srv/a b/docker-compose.yml"]);
        let shown = argv(&cmd);
        assert!(shown.starts_with("docker compose -f "));
        assert_eq!(
            shlex::split(&shown).unwrap(),
            vec!["docker", "compose", "-f", "/srv/a b/docker-compose.yml"]
        );
    }

    #[test]
    fn command_from_requires_a_program() {
        assert!(command_from(&[]).is_err());
        let cmd = command_from(&["docker".into(), "compose".into()]).unwrap();
        assert_eq!(argv(&cmd), "docker compose");
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_not_an_error() {
        let status = run_logged(Command::new("sh").args(["-c", "exit 3"])).unwrap();
        assert_eq!(status.code(), Some(3));
    }

    #[cfg(unix)]
    #[test]
    fn capture_and_input() {
        let (status, out) = capture(Command::new("sh").args(["-c", "echo mysql; echo web"])).unwrap();
        assert!(status.success());
        assert_eq!(out, "mysql\nweb\n");

        let status = run_with_input(
            Command::new("sh").args(["-c", "test \"$(cat)\" = dump"]),
            "dump".as_bytes(),
        )
        .unwrap();
        assert!(status.success());
    }

    #[test]
    fn missing_program_is_an_error() {
        assert!(run_logged(&mut Command::new("svcmgr-test-no-such-program")).is_err());
    }
}
