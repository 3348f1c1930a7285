//! Character-at-a-time line editor.
//!
//! The reader is driven byte by byte from an input source that delivers
//! keystrokes immediately (the caller puts the terminal in raw mode first,
//! see [`crate::terminal::RawModeGuard`]). It echoes printable input, erases
//! on backspace, and runs command-name completion on Tab. Being generic over
//! `Read`/`Write` lets tests feed it byte slices and capture the echo.

use crate::completion::CompletionSource;
use anyhow::Result;
use std::io::{Read, Write};

const EOT: u8 = 0x04;
const BELL: u8 = 0x07;
const BACKSPACE: u8 = 0x08;
const TAB: u8 = 0x09;
const DELETE: u8 = 0x7f;

/// Completion ambiguity state, held per line.
///
/// A first Tab on an ambiguous prefix stores the candidates and rings the
/// bell; only a second Tab with no intervening edit prints the candidate
/// list. Any printable character or backspace drops back to `Idle`.
enum CompletionState {
    Idle,
    PendingAmbiguous(Vec<String>),
}

pub struct LineReader<'a, R, W> {
    input: R,
    output: W,
    completer: &'a dyn CompletionSource,
    prompt: &'a str,
}

impl<'a, R: Read, W: Write> LineReader<'a, R, W> {
    pub fn new(input: R, output: W, completer: &'a dyn CompletionSource, prompt: &'a str) -> Self {
        Self {
            input,
            output,
            completer,
            prompt,
        }
    }

    /// Collect one line of input.
    ///
    /// Returns `Ok(None)` when the input source is exhausted (or the user
    /// sends Ctrl-D); otherwise the finished line, without its newline.
    pub fn read_line(&mut self) -> Result<Option<String>> {
        let mut buffer: Vec<u8> = Vec::new();
        let mut state = CompletionState::Idle;

        loop {
            let mut byte = [0u8; 1];
            if self.input.read(&mut byte)? == 0 {
                return Ok(None);
            }
            match byte[0] {
                EOT => return Ok(None),
                b'\n' | b'\r' => {
                    self.output.write_all(b"\n")?;
                    self.output.flush()?;
                    return Ok(Some(String::from_utf8_lossy(&buffer).into_owned()));
                }
                BACKSPACE | DELETE => {
                    state = CompletionState::Idle;
                    if buffer.pop().is_some() {
                        self.output.write_all(b"\x08 \x08")?;
                        self.output.flush()?;
                    }
                }
                TAB => {
                    state = self.handle_tab(&mut buffer, state)?;
                }
                byte if byte >= 0x20 => {
                    state = CompletionState::Idle;
                    buffer.push(byte);
                    self.output.write_all(&[byte])?;
                    self.output.flush()?;
                }
                // Remaining control bytes (escape sequences, etc.) are ignored.
                _ => {}
            }
        }
    }

    /// Apply the completion policy for one Tab press.
    ///
    /// Completion only applies while the buffer holds a bare command-name
    /// prefix; once an argument is being typed the keystroke does nothing.
    fn handle_tab(
        &mut self,
        buffer: &mut Vec<u8>,
        state: CompletionState,
    ) -> Result<CompletionState> {
        if buffer.iter().any(|b| b.is_ascii_whitespace()) {
            return Ok(CompletionState::Idle);
        }

        let prefix = String::from_utf8_lossy(buffer).into_owned();
        let candidates = self.completer.candidates(&prefix);

        match candidates.len() {
            0 => {
                self.ring_bell()?;
                Ok(CompletionState::Idle)
            }
            1 => {
                buffer.clear();
                buffer.extend_from_slice(candidates[0].as_bytes());
                buffer.push(b' ');
                self.redraw(buffer)?;
                Ok(CompletionState::Idle)
            }
            _ => match state {
                CompletionState::Idle => {
                    self.ring_bell()?;
                    Ok(CompletionState::PendingAmbiguous(candidates))
                }
                CompletionState::PendingAmbiguous(stored) => {
                    self.output.write_all(b"\n")?;
                    self.output.write_all(stored.join("  ").as_bytes())?;
                    self.output.write_all(b"\n")?;
                    self.output.write_all(self.prompt.as_bytes())?;
                    self.output.write_all(buffer)?;
                    self.output.flush()?;
                    Ok(CompletionState::Idle)
                }
            },
        }
    }

    fn ring_bell(&mut self) -> Result<()> {
        self.output.write_all(&[BELL])?;
        self.output.flush()?;
        Ok(())
    }

    fn redraw(&mut self, buffer: &[u8]) -> Result<()> {
        self.output.write_all(b"\r")?;
        self.output.write_all(self.prompt.as_bytes())?;
        self.output.write_all(buffer)?;
        self.output.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedCandidates(&'static [&'static str]);

    impl CompletionSource for FixedCandidates {
        fn candidates(&self, prefix: &str) -> Vec<String> {
            self.0
                .iter()
                .filter(|name| name.starts_with(prefix))
                .map(|name| name.to_string())
                .collect()
        }
    }

    fn read(input: &[u8], candidates: &'static [&'static str]) -> (Option<String>, String) {
        let source = FixedCandidates(candidates);
        let mut echoed = Vec::new();
        let line = {
            let mut reader = LineReader::new(input, &mut echoed, &source, "$ ");
            reader.read_line().unwrap()
        };
        (line, String::from_utf8_lossy(&echoed).into_owned())
    }

    #[test]
    fn plain_line_is_collected_and_echoed() {
        let (line, echoed) = read(b"hello\n", &[]);
        assert_eq!(line.as_deref(), Some("hello"));
        assert_eq!(echoed, "hello\n");
    }

    #[test]
    fn carriage_return_finishes_the_line_too() {
        let (line, _) = read(b"hello\r", &[]);
        assert_eq!(line.as_deref(), Some("hello"));
    }

    #[test]
    fn end_of_input_yields_none() {
        let (line, _) = read(b"", &[]);
        assert_eq!(line, None);
        // A partial line at end-of-input is discarded as well.
        let (line, _) = read(b"abc", &[]);
        assert_eq!(line, None);
    }

    #[test]
    fn ctrl_d_ends_input() {
        let (line, _) = read(b"abc\x04", &[]);
        assert_eq!(line, None);
    }

    #[test]
    fn backspace_removes_last_character_and_erases_it() {
        let (line, echoed) = read(b"ecx\x7fho\n", &[]);
        assert_eq!(line.as_deref(), Some("echo"));
        assert!(echoed.contains("\x08 \x08"));
    }

    #[test]
    fn backspace_on_empty_buffer_does_nothing() {
        let (line, echoed) = read(b"\x7fhi\n", &[]);
        assert_eq!(line.as_deref(), Some("hi"));
        assert!(!echoed.contains("\x08 \x08"));
    }

    #[test]
    fn unique_candidate_completes_with_trailing_space() {
        let (line, echoed) = read(b"ech\t\n", &["echo", "exit"]);
        assert_eq!(line.as_deref(), Some("echo "));
        // The prompt line is redrawn with the completed buffer.
        assert!(echoed.contains("\r$ echo "));
    }

    #[test]
    fn no_candidate_rings_the_bell_and_leaves_buffer_alone() {
        let (line, echoed) = read(b"zz\t\n", &["echo", "exit"]);
        assert_eq!(line.as_deref(), Some("zz"));
        assert!(echoed.contains('\x07'));
    }

    #[test]
    fn first_ambiguous_tab_rings_bell_without_listing() {
        let (line, echoed) = read(b"e\t\n", &["echo", "exit"]);
        assert_eq!(line.as_deref(), Some("e"));
        assert!(echoed.contains('\x07'));
        assert!(!echoed.contains("echo  exit"));
    }

    #[test]
    fn second_consecutive_tab_lists_candidates_two_spaces_apart() {
        let (line, echoed) = read(b"e\t\t\n", &["echo", "exit"]);
        assert_eq!(line.as_deref(), Some("e"));
        assert!(echoed.contains("\necho  exit\n$ e"));
    }

    #[test]
    fn edit_between_tabs_resets_the_ambiguity_state() {
        // Tab, then an edit pair (type + erase), then Tab again: still only
        // bells, never the candidate listing.
        let (line, echoed) = read(b"e\tx\x7f\t\n", &["echo", "exit"]);
        assert_eq!(line.as_deref(), Some("e"));
        assert_eq!(echoed.matches('\x07').count(), 2);
        assert!(!echoed.contains("echo  exit"));
    }

    #[test]
    fn tab_after_arguments_started_is_ignored() {
        let (line, echoed) = read(b"echo a\tb\n", &["echo", "exit"]);
        assert_eq!(line.as_deref(), Some("echo ab"));
        assert!(!echoed.contains('\x07'));
    }

    #[test]
    fn empty_prefix_tab_is_ambiguous_over_everything() {
        let (line, echoed) = read(b"\t\t\n", &["echo", "exit"]);
        assert_eq!(line.as_deref(), Some(""));
        assert!(echoed.contains("echo  exit"));
    }
}
