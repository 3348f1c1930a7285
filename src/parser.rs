//! Builds a structured command out of the lexer's token stream, separating
//! redirection operators from positional arguments.

/// How a redirection target file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectMode {
    /// `>` / `1>` / `2>`: create if absent, discard previous contents.
    Truncate,
    /// `>>` / `1>>` / `2>>`: create if absent, write at the end.
    Append,
}

/// A single stream redirection: target path (as typed) plus open mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub target: String,
    pub mode: RedirectMode,
}

/// A parsed command invocation.
///
/// `argv[0]` is the command name. Redirection operators and their filename
/// operands never appear in `argv`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub argv: Vec<String>,
    pub stdout: Option<Redirect>,
    pub stderr: Option<Redirect>,
}

struct CommandBuilder {
    tokens: Vec<String>,
    pos: usize,
}

impl CommandBuilder {
    fn from(tokens: Vec<String>) -> Self {
        CommandBuilder { tokens, pos: 0 }
    }

    fn consume(&mut self) -> Option<String> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn build(mut self) -> Option<CommandLine> {
        let mut argv = Vec::new();
        let mut stdout = None;
        let mut stderr = None;

        while let Some(token) = self.consume() {
            let (slot, mode) = match token.as_str() {
                ">" | "1>" => (&mut stdout, RedirectMode::Truncate),
                ">>" | "1>>" => (&mut stdout, RedirectMode::Append),
                "2>" => (&mut stderr, RedirectMode::Truncate),
                "2>>" => (&mut stderr, RedirectMode::Append),
                _ => {
                    argv.push(token);
                    continue;
                }
            };
            // An operator with no operand is silently dropped; later
            // occurrences of the same redirection kind overwrite earlier ones.
            if let Some(target) = self.consume() {
                *slot = Some(Redirect { target, mode });
            }
        }

        if argv.is_empty() {
            return None;
        }
        Some(CommandLine {
            argv,
            stdout,
            stderr,
        })
    }
}

/// Scan tokens left to right into a [`CommandLine`].
///
/// Returns `None` when no positional argument remains after redirections are
/// stripped (blank input, or a line consisting only of operators).
pub fn build(tokens: Vec<String>) -> Option<CommandLine> {
    CommandBuilder::from(tokens).build()
}
