use crate::builtin;
use crate::env::Environment;
use crate::external;
use std::collections::BTreeSet;
use tracing::debug;

/// Source of command-name completion candidates.
///
/// The raw input reader talks to this trait only, so tests can drive the
/// completion state machine with a fixed candidate list.
pub trait CompletionSource {
    /// All candidate command names starting with `prefix` (byte-wise match),
    /// lexicographically sorted, deduplicated.
    fn candidates(&self, prefix: &str) -> Vec<String>;
}

/// The interpreter's completion engine: builtin names plus every executable
/// basename visible on the search path.
///
/// The candidate set is recomputed on every request — directory contents may
/// change between keystrokes.
pub struct CommandCompleter<'a> {
    env: &'a Environment,
}

impl<'a> CommandCompleter<'a> {
    pub fn new(env: &'a Environment) -> Self {
        Self { env }
    }
}

impl CompletionSource for CommandCompleter<'_> {
    fn candidates(&self, prefix: &str) -> Vec<String> {
        let mut names = BTreeSet::new();
        for builtin in builtin::BUILTIN_NAMES {
            if builtin.starts_with(prefix) {
                names.insert(builtin.to_string());
            }
        }
        for name in external::list_executables(self.env) {
            if name.starts_with(prefix) {
                names.insert(name);
            }
        }
        debug!(prefix, count = names.len(), "completion candidates computed");
        names.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_with_path(path: &str) -> Environment {
        let mut vars = HashMap::new();
        vars.insert("PATH".to_string(), path.to_string());
        Environment {
            vars,
            current_dir: std::env::temp_dir(),
            should_exit: false,
        }
    }

    #[test]
    fn unambiguous_builtin_prefix() {
        let env = env_with_path("/no/such/dir");
        let completer = CommandCompleter::new(&env);
        assert_eq!(completer.candidates("ech"), ["echo"]);
    }

    #[test]
    fn ambiguous_builtin_prefix_is_sorted() {
        let env = env_with_path("/no/such/dir");
        let completer = CommandCompleter::new(&env);
        assert_eq!(completer.candidates("e"), ["echo", "exit"]);
    }

    #[test]
    fn no_match_yields_empty() {
        let env = env_with_path("/no/such/dir");
        let completer = CommandCompleter::new(&env);
        assert!(completer.candidates("zzz").is_empty());
    }

    #[test]
    fn empty_prefix_matches_every_builtin() {
        let env = env_with_path("/no/such/dir");
        let completer = CommandCompleter::new(&env);
        let all = completer.candidates("");
        for name in builtin::BUILTIN_NAMES {
            assert!(all.contains(&name.to_string()));
        }
    }

    #[test]
    #[cfg(unix)]
    fn path_executables_merge_with_builtins_and_dedup() {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        for name in ["echo", "eject"] {
            let p = tmp.path().join(name);
            fs::write(&p, b"#!/bin/sh\n").unwrap();
            fs::set_permissions(&p, fs::Permissions::from_mode(0o755)).unwrap();
        }

        let env = env_with_path(tmp.path().to_str().unwrap());
        let completer = CommandCompleter::new(&env);
        // "echo" appears once even though it is both a builtin and on PATH.
        assert_eq!(completer.candidates("e"), ["echo", "eject", "exit"]);
    }
}
