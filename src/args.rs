//! Code to parse the command line using `clap`, and definitions of the
//! parsed result

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::algebra::SetOp;
use crate::archive::{DEFAULT_DIR, DEFAULT_HISTORY};
use crate::render::ReportFormat;
use crate::styles::ColorChoice;
use crate::typed::SetKind;

/// Returns the parsed command line
#[must_use]
pub fn parsed() -> Args {
    from_cli(CliArgs::parse())
}

/// The parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    /// Directory holding the `*.conjunto` files
    pub dir: PathBuf,
    /// The history file
    pub history: PathBuf,
    /// Where reports and backups are written
    pub out: PathBuf,
    /// When to color output
    pub color: ColorChoice,
    /// What to do
    pub command: Command,
}

/// A set given on the command line as `NAME=ELEMENTS`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedText {
    /// The part before the first `=`
    pub name: String,
    /// The part after it, not yet typed
    pub elements: String,
}

/// The requested operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the interactive menu
    Shell {
        /// Start with the example sets
        examples: bool,
    },
    /// Type some text and show the set it makes
    Parse {
        /// Kind to parse as
        kind: SetKind,
        /// The raw elements
        text: String,
    },
    /// Sort tokens into integers, decimals and words
    Classify {
        /// The raw tokens
        text: String,
    },
    /// Combine two sets given on the command line
    Combine {
        /// Kind both sets are parsed as
        kind: SetKind,
        /// The operation, or `None` for union, intersection and difference
        op: Option<SetOp>,
        /// First operand
        left: NamedText,
        /// Second operand
        right: NamedText,
    },
    /// Write a set file
    Save {
        /// File name, with or without the extension
        file: String,
        /// The set's name
        name: String,
        /// Kind of its elements
        kind: SetKind,
        /// The raw elements, stored as given
        elements: String,
    },
    /// Read a set file and show the set
    Load {
        /// File name, with or without the extension
        file: String,
    },
    /// List the set files
    List,
    /// Delete a set file
    Delete {
        /// File name, with or without the extension
        file: String,
        /// Whether deletion was confirmed with `--yes`
        confirmed: bool,
    },
    /// Save the words of a text file as a set
    Import {
        /// The text file
        source: PathBuf,
        /// Name of the new set
        name: String,
    },
    /// Write a backup of every set file and the history
    Backup,
    /// Show the history file
    History,
    /// Write reports about a collection of sets
    Report {
        /// The renderings wanted
        formats: Vec<ReportFormat>,
        /// Kind the sets on the command line are parsed as
        kind: SetKind,
        /// Sets given on the command line
        sets: Vec<NamedText>,
        /// Also include every saved set
        saved: bool,
    },
    /// Solve the three clubs problem
    Clubs {
        /// Size of the town
        population: u64,
    },
}

fn from_cli(cli: CliArgs) -> Args {
    let command = match cli.command {
        CliCommand::Shell { empty } => Command::Shell { examples: !empty },
        CliCommand::Parse { kind, elements } => {
            Command::Parse { kind: kind.set_kind(), text: elements.join(" ") }
        }
        CliCommand::Classify { text } => Command::Classify { text: text.join(" ") },
        CliCommand::Combine { kind, op, left, right } => Command::Combine {
            kind: kind.set_kind(),
            op: match op {
                OpName::Union => Some(SetOp::Union),
                OpName::Intersection => Some(SetOp::Intersection),
                OpName::Difference => Some(SetOp::Difference),
                OpName::SymmetricDifference => Some(SetOp::SymmetricDifference),
                OpName::All => None,
            },
            left,
            right,
        },
        CliCommand::Save { file, name, kind, elements } => Command::Save {
            name: name.unwrap_or_else(|| file.clone()),
            file,
            kind: kind.set_kind(),
            elements: elements.join(" "),
        },
        CliCommand::Load { file } => Command::Load { file },
        CliCommand::List => Command::List,
        CliCommand::Delete { file, yes } => Command::Delete { file, confirmed: yes },
        CliCommand::Import { source, name } => Command::Import { source, name },
        CliCommand::Backup => Command::Backup,
        CliCommand::History => Command::History,
        CliCommand::Report { format, kind, sets, saved } => Command::Report {
            formats: match format {
                FormatName::Text => vec![ReportFormat::Text],
                FormatName::Csv => vec![ReportFormat::Csv],
                FormatName::Html => vec![ReportFormat::Html],
                FormatName::Comparative => vec![ReportFormat::Comparative],
                FormatName::All => vec![
                    ReportFormat::Text,
                    ReportFormat::Csv,
                    ReportFormat::Html,
                    ReportFormat::Comparative,
                ],
            },
            kind: kind.set_kind(),
            sets,
            saved,
        },
        CliCommand::Clubs { population } => Command::Clubs { population },
    };
    Args { dir: cli.dir, history: cli.history, out: cli.out, color: cli.color, command }
}

fn named_text(raw: &str) -> Result<NamedText, String> {
    match raw.split_once('=') {
        Some((name, elements)) if !name.trim().is_empty() => {
            Ok(NamedText { name: name.trim().to_owned(), elements: elements.to_owned() })
        }
        _ => Err(format!("expected NAME=ELEMENTS, got '{raw}'")),
    }
}

#[derive(Debug, Parser)]
#[command(name = "setkeeper", version, about)]
struct CliArgs {
    /// Directory of saved set files
    #[arg(long, global = true, default_value = DEFAULT_DIR)]
    dir: PathBuf,
    /// File the operation history is appended to
    #[arg(long, global = true, default_value = DEFAULT_HISTORY)]
    history: PathBuf,
    /// Directory reports and backups are written to
    #[arg(long, global = true, default_value = ".")]
    out: PathBuf,
    /// When to color output
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Run the interactive menu
    Shell {
        /// Start without the example sets
        #[arg(long)]
        empty: bool,
    },
    /// Show the set some elements make
    Parse {
        /// How to read the elements
        #[arg(long, value_enum, default_value_t = KindName::Word)]
        kind: KindName,
        /// The elements
        #[arg(allow_negative_numbers = true)]
        elements: Vec<String>,
    },
    /// Sort tokens into integers, decimals and words
    Classify {
        /// The tokens
        #[arg(allow_negative_numbers = true)]
        text: Vec<String>,
    },
    /// Combine two sets
    Combine {
        /// How to read the elements
        #[arg(long, value_enum, default_value_t = KindName::Word)]
        kind: KindName,
        /// The operation
        #[arg(value_enum)]
        op: OpName,
        /// First set, as NAME=ELEMENTS
        #[arg(value_parser = named_text)]
        left: NamedText,
        /// Second set, as NAME=ELEMENTS
        #[arg(value_parser = named_text)]
        right: NamedText,
    },
    /// Save a set file
    Save {
        /// File name; `.conjunto` is added if missing
        file: String,
        /// Name of the set; defaults to the file name
        #[arg(long)]
        name: Option<String>,
        /// How to read the elements
        #[arg(long, value_enum, default_value_t = KindName::Word)]
        kind: KindName,
        /// The elements
        #[arg(allow_negative_numbers = true)]
        elements: Vec<String>,
    },
    /// Load a set file and show it
    Load {
        /// File name; `.conjunto` is added if missing
        file: String,
    },
    /// List the saved set files
    List,
    /// Delete a saved set file
    Delete {
        /// File name; `.conjunto` is added if missing
        file: String,
        /// Really delete it
        #[arg(long, short)]
        yes: bool,
    },
    /// Save the words of a text file as a set
    Import {
        /// The text file
        source: PathBuf,
        /// Name of the new set
        name: String,
    },
    /// Back up every saved set and the history into one file
    Backup,
    /// Show the history file
    History,
    /// Write reports comparing sets
    Report {
        /// Which report
        #[arg(long, value_enum, default_value_t = FormatName::Text)]
        format: FormatName,
        /// How to read the elements of sets given as arguments
        #[arg(long, value_enum, default_value_t = KindName::Word)]
        kind: KindName,
        /// Include every saved set
        #[arg(long)]
        saved: bool,
        /// Sets, as NAME=ELEMENTS
        #[arg(value_parser = named_text)]
        sets: Vec<NamedText>,
    },
    /// Solve the three clubs problem
    Clubs {
        /// Size of the town
        #[arg(long, default_value_t = 40_000)]
        population: u64,
    },
}

#[derive(PartialEq, Eq, Debug, Clone, Copy, ValueEnum)]
/// How to read elements
enum KindName {
    /// Whole numbers
    Integer,
    /// Decimal numbers
    Decimal,
    /// Words, lowercased
    Word,
}

impl KindName {
    fn set_kind(self) -> SetKind {
        match self {
            KindName::Integer => SetKind::Integer,
            KindName::Decimal => SetKind::Decimal,
            KindName::Word => SetKind::Token,
        }
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Copy, ValueEnum)]
/// Name of the requested operation
enum OpName {
    /// Elements in either set
    Union,
    /// Elements in both sets
    Intersection,
    /// Elements in the first set but not the second
    Difference,
    /// Elements in exactly one set
    SymmetricDifference,
    /// Union, intersection and difference
    All,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy, ValueEnum)]
/// Name of the requested report
enum FormatName {
    /// Plain text
    Text,
    /// One CSV row per set
    Csv,
    /// A web page
    Html,
    /// Jaccard matrix and ranking
    Comparative,
    /// All four
    All,
}

#[allow(clippy::pedantic)]
#[cfg(test)]
mod test {
    use super::*;

    fn args(line: &[&str]) -> Args {
        from_cli(CliArgs::try_parse_from(line).unwrap())
    }

    #[test]
    fn defaults() {
        let parsed = args(&["setkeeper", "list"]);
        assert_eq!(parsed.dir, PathBuf::from("conjuntos_salvos"));
        assert_eq!(parsed.history, PathBuf::from("historico_operacoes.txt"));
        assert_eq!(parsed.out, PathBuf::from("."));
        assert_eq!(parsed.color, ColorChoice::Auto);
        assert_eq!(parsed.command, Command::List);
    }

    #[test]
    fn global_options_after_the_subcommand() {
        let parsed = args(&["setkeeper", "history", "--dir", "d", "--color", "never"]);
        assert_eq!(parsed.dir, PathBuf::from("d"));
        assert_eq!(parsed.color, ColorChoice::Never);
    }

    #[test]
    fn combine_operands() {
        let parsed = args(&["setkeeper", "combine", "--kind", "integer", "all", "A=1 2 3", "B=3 4"]);
        let Command::Combine { kind, op, left, right } = parsed.command else { panic!() };
        assert_eq!(kind, SetKind::Integer);
        assert_eq!(op, None);
        assert_eq!(left, NamedText { name: "A".into(), elements: "1 2 3".into() });
        assert_eq!(right.name, "B");
    }

    #[test]
    fn operands_need_a_name() {
        assert!(CliArgs::try_parse_from(["setkeeper", "combine", "union", "=1", "B=2"]).is_err());
        assert!(CliArgs::try_parse_from(["setkeeper", "combine", "union", "1 2", "B=2"]).is_err());
    }

    #[test]
    fn save_defaults_the_name_to_the_file() {
        let parsed = args(&["setkeeper", "save", "letters", "b", "a", "a", "c"]);
        assert_eq!(
            parsed.command,
            Command::Save {
                file: "letters".into(),
                name: "letters".into(),
                kind: SetKind::Token,
                elements: "b a a c".into()
            }
        );
    }

    #[test]
    fn negative_numbers_are_elements() {
        let parsed = args(&["setkeeper", "parse", "--kind", "integer", "-3", "5"]);
        assert_eq!(parsed.command, Command::Parse { kind: SetKind::Integer, text: "-3 5".into() });

        let parsed = args(&["setkeeper", "save", "temps", "--kind", "decimal", "-0.5", "2.25"]);
        let Command::Save { elements, .. } = parsed.command else { panic!() };
        assert_eq!(elements, "-0.5 2.25");

        let parsed = args(&["setkeeper", "classify", "-1", "x"]);
        assert_eq!(parsed.command, Command::Classify { text: "-1 x".into() });
    }

    #[test]
    fn report_all_formats() {
        let parsed = args(&["setkeeper", "report", "--format", "all", "--saved"]);
        let Command::Report { formats, saved, sets, .. } = parsed.command else { panic!() };
        assert_eq!(formats.len(), 4);
        assert!(saved);
        assert!(sets.is_empty());
    }

    #[test]
    fn shell_starts_with_examples() {
        assert_eq!(args(&["setkeeper", "shell"]).command, Command::Shell { examples: true });
        assert_eq!(args(&["setkeeper", "shell", "--empty"]).command, Command::Shell { examples: false });
    }
}
