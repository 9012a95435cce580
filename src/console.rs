//! Line oriented input and output for the interactive shell.
use anyhow::{Context, Result};
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

use crate::styles::{as_error, ColorChoice};

/// Reads lines from the user and shows text. Implementors supply the two
/// primitives; the prompting helpers are built on them.
pub trait Console {
    /// The next line, without its line terminator but otherwise untouched.
    /// `None` at end of input.
    fn read_line(&mut self) -> Result<Option<String>>;

    /// Shows `text` as is
    fn write_str(&mut self, text: &str) -> Result<()>;

    /// Shows `text` followed by a newline
    fn say(&mut self, text: &str) -> Result<()> {
        self.write_str(text)?;
        self.write_str("\n")
    }

    /// Shows `text` as a problem
    fn warn(&mut self, text: &str) -> Result<()> {
        self.say(&as_error(text).to_string())
    }

    /// Shows `prompt` and reads the answer
    fn ask(&mut self, prompt: &str) -> Result<Option<String>> {
        self.write_str(prompt)?;
        self.read_line()
    }

    /// Asks until the answer is a whole number. `None` at end of input.
    fn read_validated_integer(&mut self, prompt: &str) -> Result<Option<i64>> {
        loop {
            let Some(answer) = self.ask(prompt)? else { return Ok(None) };
            match answer.trim().parse() {
                Ok(n) => return Ok(Some(n)),
                Err(_) => self.warn("Please type a whole number.")?,
            }
        }
    }

    /// Asks a yes/no question. Answers starting with `s` or `y` mean yes;
    /// anything else, end of input included, means no.
    fn confirm(&mut self, question: &str) -> Result<bool> {
        let answer = self.ask(&format!("{question} (y/n): "))?.unwrap_or_default();
        Ok(matches!(answer.trim().chars().next(), Some('s' | 'S' | 'y' | 'Y')))
    }
}

/// Standard input and output
pub struct Terminal {
    input: io::StdinLock<'static>,
    output: anstream::AutoStream<io::Stdout>,
}

impl Terminal {
    /// Locks standard input, and colors standard output according to `color`
    #[must_use]
    pub fn new(color: ColorChoice) -> Terminal {
        Terminal {
            input: io::stdin().lock(),
            output: anstream::AutoStream::new(io::stdout(), color.into()),
        }
    }
}

impl Console for Terminal {
    fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line).context("Can't read standard input")? == 0 {
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }

    fn write_str(&mut self, text: &str) -> Result<()> {
        self.output.write_all(text.as_bytes()).context("Can't write to standard output")?;
        self.output.flush().context("Can't write to standard output")
    }
}

/// A console that answers from a list of lines and records what is shown,
/// with escape codes removed.
#[derive(Debug, Default)]
pub struct Scripted {
    answers: VecDeque<String>,
    /// Everything shown so far
    pub shown: String,
}

impl Scripted {
    /// A console whose input is `answers`, in order
    pub fn new<'a>(answers: impl IntoIterator<Item = &'a str>) -> Scripted {
        Scripted { answers: answers.into_iter().map(str::to_owned).collect(), shown: String::new() }
    }
}

impl Console for Scripted {
    fn read_line(&mut self) -> Result<Option<String>> {
        Ok(self.answers.pop_front())
    }

    fn write_str(&mut self, text: &str) -> Result<()> {
        self.shown.push_str(&anstream::adapter::strip_str(text).to_string());
        Ok(())
    }
}

#[allow(clippy::pedantic)]
#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn integers_are_asked_for_until_valid() {
        let mut console = Scripted::new(["abc", "", " 42 "]);
        assert_eq!(console.read_validated_integer("Option: ").unwrap(), Some(42));
        assert_eq!(console.shown.matches("Option: ").count(), 3);
        assert_eq!(console.shown.matches("Please type a whole number.").count(), 2);
    }

    #[test]
    fn integer_prompt_gives_up_at_end_of_input() {
        let mut console = Scripted::new(["x"]);
        assert_eq!(console.read_validated_integer("Option: ").unwrap(), None);
    }

    #[test]
    fn confirmation_accepts_s_and_y() {
        let mut console = Scripted::new(["s", "Yes", "n", ""]);
        assert!(console.confirm("Replace?").unwrap());
        assert!(console.confirm("Replace?").unwrap());
        assert!(!console.confirm("Replace?").unwrap());
        assert!(!console.confirm("Replace?").unwrap());
        assert!(!console.confirm("Replace?").unwrap());
        assert!(console.shown.contains("Replace? (y/n): "));
    }

    #[test]
    fn lines_are_not_trimmed() {
        let mut console = Scripted::new(["  a b  "]);
        assert_eq!(console.read_line().unwrap().as_deref(), Some("  a b  "));
        assert_eq!(console.read_line().unwrap(), None);
    }
}
