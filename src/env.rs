use std::collections::HashMap;
use std::env as stdenv;
use std::path::PathBuf;

/// Mutable, session-level view of the process environment used by the interpreter.
///
/// The environment contains:
/// - `vars`: a map of environment variables visible to executed commands.
/// - `current_dir`: the working directory for command execution. Only `cd`
///   mutates it; path resolution and `pwd` read it. The process-global working
///   directory is never touched, so independent sessions stay isolated.
/// - `should_exit`: a flag the REPL loop checks to know when to terminate.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Key-value store of environment variables (e.g., PATH, HOME).
    pub vars: HashMap<String, String>,
    /// The current working directory for command execution.
    pub current_dir: PathBuf,
    /// When set to true, indicates that the interactive loop should exit.
    pub should_exit: bool,
}

impl Environment {
    /// Capture the current process state into a new `Environment` instance.
    ///
    /// Variables are copied from `std::env::vars()` once; later lookups read
    /// only the captured map. `current_dir` starts at `std::env::current_dir()`.
    pub fn new() -> Self {
        let mut vars = HashMap::new();
        for (k, v) in stdenv::vars() {
            vars.insert(k, v);
        }
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            vars,
            current_dir,
            should_exit: false,
        }
    }

    /// Get the value of an environment variable from the captured map.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }

    /// Set or override an environment variable.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    /// The directories named by PATH, in search order. Empty when PATH is unset.
    pub fn search_paths(&self) -> Vec<PathBuf> {
        match self.get_var("PATH") {
            Some(paths) => stdenv::split_paths(&paths).collect(),
            None => Vec::new(),
        }
    }

    /// The home directory, if HOME is set.
    pub fn home(&self) -> Option<PathBuf> {
        self.get_var("HOME").map(PathBuf::from)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
