use crate::builtin::{Cd, Echo, Exit, Pwd, Type};
use crate::command::{CommandFactory, ExitCode};
use crate::completion::CommandCompleter;
use crate::env::Environment;
use crate::external;
use crate::lexer;
use crate::parser::{self, CommandLine, Redirect, RedirectMode};
use crate::reader::LineReader;
use crate::terminal::RawModeGuard;
use anyhow::{Result, anyhow};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, IsTerminal, Write};
use std::process::Stdio;
use tracing::debug;

const PROMPT: &str = "$ ";

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports the builtin commands defined in this crate.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// Where one of the two output streams of a command leads for the duration of
/// a single dispatch.
///
/// The process-level descriptors are never rebound: builtins borrow the
/// destination as a writer and external commands receive it as a spawn
/// `Stdio`. Dropping the value closes an opened file, so the prior
/// destinations are back in effect on every exit path by construction.
enum OutputTarget {
    Inherited,
    File(File),
}

impl OutputTarget {
    fn into_stdout_sink(self) -> Sink {
        match self {
            OutputTarget::Inherited => Sink::Stdout(io::stdout()),
            OutputTarget::File(file) => Sink::File(file),
        }
    }

    fn into_stderr_sink(self) -> Sink {
        match self {
            OutputTarget::Inherited => Sink::Stderr(io::stderr()),
            OutputTarget::File(file) => Sink::File(file),
        }
    }

    fn into_stdio(self) -> Stdio {
        match self {
            OutputTarget::Inherited => Stdio::inherit(),
            OutputTarget::File(file) => Stdio::from(file),
        }
    }

    /// A second writer onto the same destination, used to report a spawn
    /// failure after the primary handles have been given to the child.
    fn reporter(&self) -> Sink {
        match self {
            OutputTarget::Inherited => Sink::Stderr(io::stderr()),
            OutputTarget::File(file) => match file.try_clone() {
                Ok(clone) => Sink::File(clone),
                Err(_) => Sink::Stderr(io::stderr()),
            },
        }
    }
}

/// Concrete writer for a resolved [`OutputTarget`].
enum Sink {
    Stdout(io::Stdout),
    Stderr(io::Stderr),
    File(File),
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Sink::Stdout(s) => s.write(buf),
            Sink::Stderr(s) => s.write(buf),
            Sink::File(f) => f.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Sink::Stdout(s) => s.flush(),
            Sink::Stderr(s) => s.flush(),
            Sink::File(f) => f.flush(),
        }
    }
}

/// Save/restore record for a command's stream destinations.
///
/// Held for exactly one dispatch; torn down unconditionally afterwards.
struct RedirectionScope {
    stdout: OutputTarget,
    stderr: OutputTarget,
}

fn open_target(redirect: &Option<Redirect>, env: &Environment) -> Result<OutputTarget> {
    let Some(redirect) = redirect else {
        return Ok(OutputTarget::Inherited);
    };

    let path = std::path::Path::new(&redirect.target);
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env.current_dir.join(path)
    };

    let mut options = OpenOptions::new();
    options.create(true).write(true);
    match redirect.mode {
        RedirectMode::Truncate => options.truncate(true),
        RedirectMode::Append => options.append(true),
    };
    let file = options
        .open(&path)
        .map_err(|e| anyhow!("{}: {}", redirect.target, e))?;
    debug!(file = %path.display(), mode = ?redirect.mode, "redirection target opened");
    Ok(OutputTarget::File(file))
}

/// A minimal shell-like interpreter that executes builtin and external
/// commands with redirection-aware stream wiring.
///
/// The interpreter owns an [`Environment`] and a list of builtin
/// [`CommandFactory`] objects queried by name. See [`Default`] for the
/// builtin set included out of the box.
pub struct Interpreter {
    env: Environment,
    builtins: Vec<Box<dyn CommandFactory>>,
}

impl Interpreter {
    /// Create an interpreter around an explicit session environment, with the
    /// default builtin set.
    pub fn new(env: Environment) -> Self {
        Self {
            env,
            builtins: vec![
                Box::new(Factory::<Pwd>::default()),
                Box::new(Factory::<Cd>::default()),
                Box::new(Factory::<Echo>::default()),
                Box::new(Factory::<Type>::default()),
                Box::new(Factory::<Exit>::default()),
            ],
        }
    }

    /// The session environment (current directory, variables, exit flag).
    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Read-eval loop: prompt, read one line, dispatch, repeat until
    /// end-of-input or an exit directive.
    ///
    /// On a terminal, lines are acquired through the raw-mode reader with tab
    /// completion; otherwise input is consumed as plain buffered lines so the
    /// interpreter can be driven by a pipe.
    pub fn repl(&mut self) -> Result<()> {
        let interactive = io::stdin().is_terminal();
        while !self.env.should_exit {
            let line = if interactive {
                self.read_line_raw()?
            } else {
                self.read_line_buffered()?
            };
            let Some(line) = line else {
                break;
            };
            self.dispatch_line(&line)?;
        }
        Ok(())
    }

    fn read_line_raw(&self) -> Result<Option<String>> {
        let mut stdout = io::stdout();
        write!(stdout, "{PROMPT}")?;
        stdout.flush()?;

        // Raw mode is held only while the line is being collected; the guard
        // restores the prior mode on every path out of this function.
        let _guard = RawModeGuard::enter()?;
        let completer = CommandCompleter::new(&self.env);
        let mut reader = LineReader::new(io::stdin().lock(), stdout, &completer, PROMPT);
        reader.read_line()
    }

    fn read_line_buffered(&self) -> Result<Option<String>> {
        let mut stdout = io::stdout();
        write!(stdout, "{PROMPT}")?;
        stdout.flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
    }

    /// Tokenize, build and dispatch a single line. Blank lines are a no-op.
    pub fn dispatch_line(&mut self, line: &str) -> Result<()> {
        let tokens = lexer::tokenize(line);
        let Some(cmd) = parser::build(tokens) else {
            return Ok(());
        };
        let code = self.dispatch(&cmd)?;
        debug!(command = %cmd.argv[0], code, "dispatch finished");
        Ok(())
    }

    /// Run one structured command: wire redirections, route to a builtin or
    /// an external program, and put the streams back afterwards.
    pub fn dispatch(&mut self, cmd: &CommandLine) -> Result<ExitCode> {
        if cmd.argv[0] == "exit" && cmd.argv.len() == 2 && cmd.argv[1] == "0" {
            self.env.should_exit = true;
            return Ok(0);
        }

        // The stderr target is opened first so that a failure to open the
        // stdout target is reported where the command's errors would go.
        let stderr = match open_target(&cmd.stderr, &self.env) {
            Ok(target) => target,
            Err(e) => {
                let mut err = OutputTarget::Inherited.into_stderr_sink();
                writeln!(err, "{e}")?;
                return Ok(1);
            }
        };
        let stdout = match open_target(&cmd.stdout, &self.env) {
            Ok(target) => target,
            Err(e) => {
                let mut err = stderr.into_stderr_sink();
                writeln!(err, "{e}")?;
                return Ok(1);
            }
        };

        self.run_redirected(cmd, RedirectionScope { stdout, stderr })
    }

    fn run_redirected(&mut self, cmd: &CommandLine, scope: RedirectionScope) -> Result<ExitCode> {
        let name = cmd.argv[0].as_str();
        let args: Vec<&str> = cmd.argv[1..].iter().map(String::as_str).collect();

        let builtin = self
            .builtins
            .iter()
            .find_map(|factory| factory.try_create(name, &args));
        if let Some(command) = builtin {
            debug!(command = %name, "running builtin");
            let RedirectionScope { stdout, stderr } = scope;
            let mut out = stdout.into_stdout_sink();
            let mut err = stderr.into_stderr_sink();
            let code = command.execute(&mut out, &mut err, &mut self.env)?;
            out.flush()?;
            err.flush()?;
            return Ok(code);
        }

        match external::resolve(&self.env, name) {
            Some(path) => {
                debug!(command = %name, path = %path.display(), "spawning external command");
                let RedirectionScope { stdout, stderr } = scope;
                let mut report = stderr.reporter();
                match external::spawn_and_wait(
                    &self.env,
                    &path,
                    &cmd.argv,
                    stdout.into_stdio(),
                    stderr.into_stdio(),
                ) {
                    Ok(code) => Ok(code),
                    Err(e) => {
                        writeln!(report, "{name}: {e}")?;
                        Ok(127)
                    }
                }
            }
            None => {
                let RedirectionScope { stdout: _, stderr } = scope;
                let mut err = stderr.into_stderr_sink();
                writeln!(err, "{name}: command not found")?;
                err.flush()?;
                Ok(127)
            }
        }
    }
}

impl Default for Interpreter {
    /// Create an interpreter capturing the current process environment, with
    /// the builtins `pwd`, `cd`, `echo`, `type` and `exit`.
    fn default() -> Self {
        Self::new(Environment::new())
    }
}
