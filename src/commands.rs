//! Runs one parsed command line. Everything except `shell` prints its result
//! and returns.
use anyhow::{bail, Result};
use chrono::Local;
use std::io::Write;

use crate::algebra::SetOp;
use crate::archive::{Archive, Record};
use crate::args::{Args, Command, NamedText};
use crate::console::Terminal;
use crate::render;
use crate::report::Analysis;
use crate::session::Session;
use crate::store::Store;
use crate::styles::{as_error, as_item, as_title};
use crate::survey::{Survey, LITERAL_LIMIT};
use crate::typed::{self, SetKind, TypedSet};

fn typed_operand(operand: &NamedText, kind: SetKind) -> (String, TypedSet) {
    (operand.name.clone(), typed::parse(&operand.elements, kind).set)
}

/// Runs `args`, printing to `out`. The interactive shell talks to the
/// terminal instead.
pub fn execute(args: Args, out: &mut dyn Write) -> Result<()> {
    let Args { dir, history, out: out_dir, color, command } = args;
    let archive = || Archive::open(&dir, &history);
    match command {
        Command::Shell { examples } => {
            let store = if examples { Store::with_examples() } else { Store::new() };
            let mut session = Session::new(store, archive()?, out_dir);
            session.run(&mut Terminal::new(color))?;
        }
        Command::Parse { kind, text } => {
            let parsed = typed::parse(&text, kind);
            writeln!(out, "{}", parsed.set)?;
            writeln!(out, "{} element(s), {}", parsed.set.len(), kind.label())?;
            if !parsed.rejected.is_empty() {
                writeln!(out, "{} {}", as_error("rejected:"), parsed.rejected.join(" "))?;
            }
        }
        Command::Classify { text } => {
            let classified = typed::classify(&text);
            writeln!(
                out,
                "integers: {} (sum {})",
                TypedSet::Integer(classified.integers.clone()),
                classified.integer_sum()
            )?;
            writeln!(
                out,
                "decimals: {} (sum {})",
                TypedSet::Decimal(classified.decimals.clone()),
                classified.decimal_sum()
            )?;
            writeln!(out, "words: {}", TypedSet::Token(classified.tokens))?;
        }
        Command::Combine { kind, op, left, right } => {
            let mut store = Store::new();
            for operand in [&left, &right] {
                let (name, set) = typed_operand(operand, kind);
                store.create(&name, set, |_| true)?;
            }
            let results = match op {
                Some(op) => vec![(op, store.combine(&left.name, op, &right.name)?)],
                None => {
                    let ops = [SetOp::Union, SetOp::Intersection, SetOp::Difference];
                    ops.into_iter().zip(store.combine_all(&left.name, &right.name)?).collect()
                }
            };
            for (op, result) in results {
                writeln!(out, "{} {} {} = {result}", left.name, op.symbol(), right.name)?;
            }
        }
        Command::Save { file, name, kind, elements } => {
            let record = Record { name, kind, elements };
            let path = archive()?.save(&file, &record, Local::now())?;
            writeln!(out, "saved {} to {}", record.name, path.display())?;
        }
        Command::Load { file } => {
            let loaded = archive()?.load(&file)?;
            writeln!(
                out,
                "{} ({}) = {}",
                loaded.record.name,
                loaded.record.kind.label(),
                loaded.parsed.set
            )?;
            if !loaded.parsed.rejected.is_empty() {
                writeln!(out, "{} {}", as_error("ignored:"), loaded.parsed.rejected.join(" "))?;
            }
        }
        Command::List => {
            let archive = archive()?;
            for entry in archive.list()? {
                write!(out, "{}  {} bytes", as_item(&entry.file_name), entry.size)?;
                if let (Some(name), Some(kind)) = (&entry.name, &entry.kind) {
                    write!(out, "  {name} ({kind})")?;
                }
                writeln!(out)?;
            }
        }
        Command::Delete { file, confirmed } => {
            if archive()?.delete(&file, confirmed)? {
                writeln!(out, "deleted {file}")?;
            } else {
                writeln!(out, "{file} not deleted; pass --yes to confirm")?;
            }
        }
        Command::Import { source, name } => {
            let imported = archive()?.import(&source, &name, Local::now())?;
            writeln!(
                out,
                "imported {} word(s) from {} into {}",
                imported.set.len(),
                source.display(),
                imported.path.display()
            )?;
        }
        Command::Backup => {
            let path = archive()?.backup(&out_dir, Local::now())?;
            writeln!(out, "backup written to {}", path.display())?;
        }
        Command::History => {
            for line in archive()?.history()? {
                writeln!(out, "{line}")?;
            }
        }
        Command::Report { formats, kind, sets, saved } => {
            let mut named: Vec<(String, TypedSet)> =
                sets.iter().map(|operand| typed_operand(operand, kind)).collect();
            if saved {
                let archive = archive()?;
                for file in archive.files()? {
                    let loaded = archive.load(&file)?;
                    named.push((loaded.record.name, loaded.parsed.set));
                }
            }
            if named.is_empty() {
                bail!("No sets to report on: give some as NAME=ELEMENTS or use --saved");
            }
            let analysis =
                Analysis::compute(named.iter().map(|(name, set)| (name.as_str(), set)), Local::now());
            for format in formats {
                let path = render::write_report(&analysis, format, &out_dir)?;
                writeln!(out, "{} {}", as_title("report:"), path.display())?;
            }
        }
        Command::Clubs { population } => {
            let survey = Survey::clubs(population);
            let n = survey.counts()?;
            writeln!(out, "Colina: {}  Silvestre: {}  Campestre: {}", n.a, n.b, n.c)?;
            writeln!(
                out,
                "Colina and Silvestre: {}  Colina and Campestre: {}  Silvestre and Campestre: {}",
                n.ab, n.ac, n.bc
            )?;
            writeln!(out, "All three: {}", n.abc)?;
            writeln!(out, "At least one club: {}", survey.attending_any()?)?;
            writeln!(out, "No club: {}", survey.attending_none()?)?;
            match survey.verify()? {
                Some(check) => {
                    let verdict = if check.holds() { "agrees" } else { "DISAGREES" };
                    writeln!(out, "Counted from concrete sets: {} ({verdict})", check.lhs)?;
                }
                None => writeln!(out, "Too many people to count one by one (limit {LITERAL_LIMIT})")?,
            }
        }
    }
    out.flush()?;
    Ok(())
}

#[allow(clippy::pedantic)]
#[cfg(test)]
mod test {
    use super::*;
    use crate::render::ReportFormat;
    use assert_fs::{prelude::*, TempDir};
    use std::path::PathBuf;

    fn run_in(temp: &TempDir, command: Command) -> String {
        let args = Args {
            dir: temp.child("sets").path().to_path_buf(),
            history: temp.child("history.txt").path().to_path_buf(),
            out: temp.path().to_path_buf(),
            color: crate::styles::ColorChoice::Never,
            command,
        };
        let mut out = Vec::new();
        execute(args, &mut out).unwrap();
        anstream::adapter::strip_str(&String::from_utf8(out).unwrap()).to_string()
    }

    fn named(name: &str, elements: &str) -> NamedText {
        NamedText { name: name.into(), elements: elements.into() }
    }

    #[test]
    fn combine_prints_every_result() {
        let temp = TempDir::new().unwrap();
        let shown = run_in(
            &temp,
            Command::Combine {
                kind: SetKind::Integer,
                op: None,
                left: named("A", "1 2 3 4 5"),
                right: named("B", "4 5 6 7 8"),
            },
        );
        assert_eq!(
            shown,
            "A U B = {1, 2, 3, 4, 5, 6, 7, 8}\nA INT B = {4, 5}\nA - B = {1, 2, 3}\n"
        );
    }

    #[test]
    fn save_load_and_delete() {
        let temp = TempDir::new().unwrap();
        let save = Command::Save {
            file: "letters".into(),
            name: "Letters".into(),
            kind: SetKind::Token,
            elements: "b a a c".into(),
        };
        assert!(run_in(&temp, save).starts_with("saved Letters to "));
        let shown = run_in(&temp, Command::Load { file: "letters".into() });
        assert_eq!(shown, "Letters (Words/Text) = {a, b, c}\n");

        let refused = run_in(&temp, Command::Delete { file: "letters".into(), confirmed: false });
        assert!(refused.contains("not deleted"));
        temp.child("sets/letters.conjunto").assert(predicates::path::exists());
        run_in(&temp, Command::Delete { file: "letters".into(), confirmed: true });
        temp.child("sets/letters.conjunto").assert(predicates::path::missing());

        let history = run_in(&temp, Command::History);
        assert_eq!(history.lines().count(), 3);
    }

    #[test]
    fn report_from_saved_sets() {
        let temp = TempDir::new().unwrap();
        temp.child("sets/a.conjunto").write_str("NOME=A\nTIPO=1\nELEMENTOS=1 2 3\n").unwrap();
        let shown = run_in(
            &temp,
            Command::Report {
                formats: vec![ReportFormat::Csv],
                kind: SetKind::Integer,
                sets: vec![named("B", "3 4")],
                saved: true,
            },
        );
        let path = PathBuf::from(shown.trim().strip_prefix("report: ").unwrap());
        let csv = std::fs::read_to_string(path).unwrap();
        assert_eq!(csv.lines().nth(1), Some("\"B\",\"3; 4\",2,\"3\",\"4\""));
        assert_eq!(csv.lines().nth(2), Some("\"A\",\"1; 2; 3\",3,\"1\",\"3\""));
    }

    #[test]
    fn classify_and_parse() {
        let temp = TempDir::new().unwrap();
        let shown = run_in(&temp, Command::Classify { text: "1 2 3 4 5 3.14 2.71 abc".into() });
        assert!(shown.contains("integers: {1, 2, 3, 4, 5} (sum 15)"));
        assert!(shown.contains("decimals: {2.71, 3.14}"));
        assert!(shown.contains("words: {abc}"));

        let parsed = run_in(&temp, Command::Parse { kind: SetKind::Integer, text: "3 x 1 3".into() });
        assert_eq!(parsed, "{1, 3}\n2 element(s), Integers\nrejected: x\n");
    }
}
