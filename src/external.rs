use crate::command::ExitCode;
use crate::env::Environment;
use anyhow::Result;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tracing::debug;

/// Resolve a command name the way a typical shell would.
///
/// Behavior:
/// - Absolute path: returned if it names an executable file.
/// - Path with multiple components (e.g. `bin/tool`) or a `./` prefix:
///   resolved against the session working directory.
/// - Single bare component: each directory on the search path is consulted in
///   order and the first executable match wins.
/// - Empty name: `None`.
pub fn resolve(env: &Environment, name: &str) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }

    let path = Path::new(name);
    if path.is_absolute() {
        return is_executable(path).then(|| path.to_path_buf());
    }

    if path.components().count() > 1 || name.starts_with("./") {
        let candidate = env.current_dir.join(path);
        return is_executable(&candidate).then_some(candidate);
    }

    for dir in env.search_paths() {
        let candidate = dir.join(name);
        if is_executable(&candidate) {
            debug!(path = %candidate.display(), "resolved command on search path");
            return Some(candidate);
        }
    }
    None
}

/// Basenames of every executable regular file visible on the search path.
///
/// Recomputed on each call; directories that cannot be listed are skipped
/// silently.
pub fn list_executables(env: &Environment) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for dir in env.search_paths() {
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if is_executable(&path) {
                if let Some(name) = path.file_name() {
                    names.insert(name.to_string_lossy().into_owned());
                }
            }
        }
    }
    names
}

fn is_executable(path: &Path) -> bool {
    let Ok(meta) = fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

/// Spawn the program at `path` with the full `argv`, blocking until the child
/// terminates.
///
/// The child sees `argv[0]` exactly as the user typed it, inherits the
/// session's working directory and captured variables, and writes to the
/// provided stream destinations. Standard input is inherited.
pub fn spawn_and_wait(
    env: &Environment,
    path: &Path,
    argv: &[String],
    stdout: Stdio,
    stderr: Stdio,
) -> Result<ExitCode> {
    let mut command = std::process::Command::new(path);
    command
        .args(&argv[1..])
        .envs(env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .current_dir(&env.current_dir)
        .stdin(Stdio::inherit())
        .stdout(stdout)
        .stderr(stderr);
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.arg0(&argv[0]);
    }

    let mut child = command.spawn()?;
    let exit_status = child.wait()?;
    debug!(status = ?exit_status, "child finished");
    match exit_status.code() {
        Some(code) => Ok(code),
        None => Ok(terminated_by_signal(exit_status)),
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_with_path(path: &str, current_dir: PathBuf) -> Environment {
        let mut vars = HashMap::new();
        vars.insert("PATH".to_string(), path.to_string());
        Environment {
            vars,
            current_dir,
            should_exit: false,
        }
    }

    #[cfg(unix)]
    fn make_executable(dir: &Path, name: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        fs::write(&path, b"#!/bin/sh\nexit 0\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    #[cfg(unix)]
    fn absolute_executable_resolves_to_itself() {
        let tmp = tempfile::tempdir().unwrap();
        let exe = make_executable(tmp.path(), "tool");
        let env = env_with_path("/nowhere", tmp.path().to_path_buf());

        let found = resolve(&env, exe.to_str().unwrap()).unwrap();
        assert_eq!(found, exe);
    }

    #[test]
    fn absolute_nonexisting_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let env = env_with_path("/nowhere", tmp.path().to_path_buf());
        assert_eq!(resolve(&env, "/definitely/not/here"), None);
    }

    #[test]
    #[cfg(unix)]
    fn bare_name_found_on_search_path() {
        let tmp = tempfile::tempdir().unwrap();
        make_executable(tmp.path(), "tool");
        let env = env_with_path(tmp.path().to_str().unwrap(), std::env::temp_dir());

        let found = resolve(&env, "tool").unwrap();
        assert!(found.starts_with(tmp.path()));
        assert!(found.ends_with("tool"));
    }

    #[test]
    #[cfg(unix)]
    fn first_search_path_directory_wins() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        make_executable(first.path(), "tool");
        make_executable(second.path(), "tool");
        let joined = format!(
            "{}:{}",
            first.path().to_str().unwrap(),
            second.path().to_str().unwrap()
        );
        let env = env_with_path(&joined, std::env::temp_dir());

        let found = resolve(&env, "tool").unwrap();
        assert!(found.starts_with(first.path()));
    }

    #[test]
    #[cfg(unix)]
    fn non_executable_file_is_not_resolved() {
        let tmp = tempfile::tempdir().unwrap();
        use std::os::unix::fs::PermissionsExt;
        let path = tmp.path().join("data");
        fs::write(&path, b"not a program").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
        let env = env_with_path(tmp.path().to_str().unwrap(), std::env::temp_dir());

        assert_eq!(resolve(&env, "data"), None);
    }

    #[test]
    fn bare_name_not_found_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let env = env_with_path(tmp.path().to_str().unwrap(), std::env::temp_dir());
        assert_eq!(resolve(&env, "nonexisting"), None);
    }

    #[test]
    fn empty_name_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let env = env_with_path(tmp.path().to_str().unwrap(), std::env::temp_dir());
        assert_eq!(resolve(&env, ""), None);
    }

    #[test]
    #[cfg(unix)]
    fn relative_path_resolves_against_session_cwd() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("bin")).unwrap();
        make_executable(&tmp.path().join("bin"), "tool");
        // The session cwd, not the process cwd, anchors the lookup.
        let env = env_with_path("/nowhere", tmp.path().to_path_buf());

        let found = resolve(&env, "bin/tool").unwrap();
        assert_eq!(found, tmp.path().join("bin/tool"));
    }

    #[test]
    #[cfg(unix)]
    fn list_executables_skips_non_executables_and_missing_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        make_executable(tmp.path(), "alpha");
        make_executable(tmp.path(), "beta");
        use std::os::unix::fs::PermissionsExt;
        let plain = tmp.path().join("notes.txt");
        fs::write(&plain, b"x").unwrap();
        fs::set_permissions(&plain, fs::Permissions::from_mode(0o644)).unwrap();

        let joined = format!("{}:/no/such/dir", tmp.path().to_str().unwrap());
        let env = env_with_path(&joined, std::env::temp_dir());

        let names = list_executables(&env);
        assert!(names.contains("alpha"));
        assert!(names.contains("beta"));
        assert!(!names.contains("notes.txt"));
    }

    #[test]
    #[cfg(unix)]
    fn spawn_and_wait_reports_exit_code() {
        let tmp = tempfile::tempdir().unwrap();
        use std::os::unix::fs::PermissionsExt;
        let path = tmp.path().join("fail7");
        fs::write(&path, b"#!/bin/sh\nexit 7\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        let env = env_with_path("/usr/bin:/bin", tmp.path().to_path_buf());

        let argv = vec!["fail7".to_string()];
        let code =
            spawn_and_wait(&env, &path, &argv, Stdio::null(), Stdio::null()).unwrap();
        assert_eq!(code, 7);
    }
}
