//! The interactive shell: a numbered menu over the store, the archive and
//! the reports. `Session` holds everything one run of the shell needs.
use anyhow::{anyhow, bail, Context, Result};
use chrono::Local;
use std::path::{Path, PathBuf};

use crate::algebra::{self, SetOp, POWER_SET_LIMIT};
use crate::archive::{Archive, Record};
use crate::console::Console;
use crate::layout;
use crate::render::{self, ReportFormat};
use crate::report::{self, Analysis};
use crate::store::{Creation, HistoryKind, Store, TIMESTAMP};
use crate::styles::{app_name, as_item, as_title};
use crate::survey::{Survey, LITERAL_LIMIT};
use crate::typed::{self, SetKind, TypedSet};

/// Power sets with more elements than this are counted rather than listed
const POWER_SET_SHOWN: usize = 4;

const MENU: [(&str, &str); 16] = [
    ("1", "Create a set"),
    ("2", "List the sets"),
    ("3", "Remove a set"),
    ("4", "Combine two sets (union, intersection, difference)"),
    ("5", "Compare two sets (relation, identities, similarity, power set)"),
    ("6", "Check inclusion-exclusion on three sets"),
    ("7", "Classify text into integers, decimals and words"),
    ("8", "Save a set to disk"),
    ("9", "Load a saved set"),
    ("10", "List saved sets"),
    ("11", "Delete a saved set"),
    ("12", "Import words from a text file"),
    ("13", "Back up every saved set and the history"),
    ("14", "Show the history"),
    ("15", "Write a report on all sets"),
    ("16", "Solve the three clubs problem"),
];

fn entry(key: &str, caption: &str) -> String {
    format!("{}  {caption}", as_item(&format!("{key:>4}")))
}

/// Menu numbers start at 1; anything that isn't a valid index maps past the end
fn index_of(number: i64) -> usize {
    number.checked_sub(1).and_then(|n| usize::try_from(n).ok()).unwrap_or(usize::MAX)
}

/// One run of the shell
pub struct Session {
    store: Store,
    archive: Archive,
    out_dir: PathBuf,
}

impl Session {
    /// A session over `store` that saves sets through `archive` and writes
    /// reports and backups into `out_dir`
    #[must_use]
    pub fn new(store: Store, archive: Archive, out_dir: impl Into<PathBuf>) -> Session {
        Session { store, archive, out_dir: out_dir.into() }
    }

    /// The sets of the session
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Where reports and backups go
    #[must_use]
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Shows the menu and runs the chosen operation until the user picks 0
    /// or input ends. A failed operation is reported and the menu comes back.
    pub fn run(&mut self, console: &mut dyn Console) -> Result<()> {
        let version = std::env!("CARGO_PKG_VERSION");
        console.say(&format!("{} {version}", app_name("setkeeper")))?;
        loop {
            console.say("")?;
            console.say(&as_title("MENU").to_string())?;
            for (key, caption) in MENU {
                console.say(&entry(key, caption))?;
            }
            console.say(&entry("0", "Quit"))?;
            let Some(choice) = console.read_validated_integer("Option: ")? else { break };
            let outcome = match choice {
                0 => break,
                1 => self.create(console),
                2 => self.list(console),
                3 => self.remove(console),
                4 => self.combine(console),
                5 => self.compare(console),
                6 => self.three_sets(console),
                7 => self.classify(console),
                8 => self.save(console),
                9 => self.load(console),
                10 => self.list_saved(console),
                11 => self.delete_saved(console),
                12 => self.import(console),
                13 => self.backup(console),
                14 => self.history(console),
                15 => self.report(console),
                16 => self.clubs(console),
                _ => console.warn("There is no such option."),
            };
            if let Err(e) = outcome {
                tracing::debug!(error = %e, "operation failed");
                console.warn(&format!("{e:#}"))?;
            }
        }
        console.say("Bye.")?;
        Ok(())
    }

    fn show_set(console: &mut dyn Console, name: &str, set: &TypedSet) -> Result<()> {
        let label = format!("{name} = ");
        for line in layout::labelled(&label, &set.canonical()) {
            console.say(&line)?;
        }
        Ok(())
    }

    /// Asks for text, or bails at end of input
    fn ask_text(console: &mut dyn Console, prompt: &str) -> Result<String> {
        match console.ask(prompt)? {
            Some(text) => Ok(text),
            None => bail!("input ended"),
        }
    }

    fn ask_number(console: &mut dyn Console, prompt: &str) -> Result<i64> {
        match console.read_validated_integer(prompt)? {
            Some(n) => Ok(n),
            None => bail!("input ended"),
        }
    }

    fn ask_kind(console: &mut dyn Console) -> Result<SetKind> {
        for kind in [SetKind::Integer, SetKind::Decimal, SetKind::Token] {
            console.say(&entry(&kind.code().to_string(), kind.label()))?;
        }
        let code = Self::ask_number(console, "Type: ")?;
        match u8::try_from(code).ok().and_then(SetKind::from_code) {
            Some(kind) => Ok(kind),
            None => bail!("{code} is not a set type"),
        }
    }

    /// Lists the sets by number and returns the index of the chosen one
    fn choose_index(&self, console: &mut dyn Console, prompt: &str) -> Result<usize> {
        if self.store.is_empty() {
            bail!("There are no sets yet.");
        }
        for (i, (name, set)) in self.store.list().enumerate() {
            console.say(&entry(&(i + 1).to_string(), &format!("{name} {set}")))?;
        }
        let number = Self::ask_number(console, prompt)?;
        let index = index_of(number);
        self.store.by_index(index).map_err(|e| anyhow!("There is no set number {number} ({e})."))?;
        Ok(index)
    }

    fn choose_set(&self, console: &mut dyn Console, prompt: &str) -> Result<String> {
        let index = self.choose_index(console, prompt)?;
        let (name, _) = self.store.by_index(index)?;
        Ok(name.to_owned())
    }

    fn create(&mut self, console: &mut dyn Console) -> Result<()> {
        let name = Self::ask_text(console, "Name: ")?;
        let kind = Self::ask_kind(console)?;
        let raw = Self::ask_text(console, "Elements (separated by spaces): ")?;
        let parsed = typed::parse(&raw, kind);
        if !parsed.rejected.is_empty() {
            console.warn(&format!(
                "Ignored {} token(s) that aren't {}: {}",
                parsed.rejected.len(),
                kind.label().to_lowercase(),
                parsed.rejected.join(" ")
            ))?;
        }
        let set = parsed.set;
        let shown = set.clone();
        let creation = self.store.create_from(&name, set, raw, |name| {
            console.confirm(&format!("A set named {name} exists. Replace it?")).unwrap_or(false)
        })?;
        match creation {
            Creation::Created | Creation::Replaced => Self::show_set(console, name.trim(), &shown),
            Creation::Cancelled => console.say("Kept the existing set."),
        }
    }

    fn list(&mut self, console: &mut dyn Console) -> Result<()> {
        if self.store.is_empty() {
            return console.say("There are no sets yet.");
        }
        console.say(&as_title("SETS").to_string())?;
        for (i, (name, set)) in self.store.list().enumerate() {
            let label = format!("{:>3}. {name} ({}, {} elements) = ", i + 1, set.kind().label(), set.len());
            for line in layout::labelled(&label, &set.canonical()) {
                console.say(&line)?;
            }
        }
        Ok(())
    }

    fn remove(&mut self, console: &mut dyn Console) -> Result<()> {
        let index = self.choose_index(console, "Set to remove: ")?;
        let removed = self.store.remove(index)?;
        console.say(&format!("Removed {removed}."))
    }

    fn combine(&mut self, console: &mut dyn Console) -> Result<()> {
        let left = self.choose_set(console, "First set: ")?;
        let right = self.choose_set(console, "Second set: ")?;
        let ops = [SetOp::Union, SetOp::Intersection, SetOp::Difference, SetOp::SymmetricDifference];
        for (i, op) in ops.iter().enumerate() {
            console.say(&entry(&(i + 1).to_string(), &format!("{left} {} {right}", op.symbol())))?;
        }
        console.say(&entry("5", "union, intersection and difference"))?;
        let choice = Self::ask_number(console, "Operation: ")?;
        let results: Vec<(SetOp, TypedSet)> = match choice {
            1..=4 => {
                let op = ops[usize::try_from(choice - 1)?];
                vec![(op, self.store.combine(&left, op, &right)?)]
            }
            5 => {
                let [union, intersection, difference] = self.store.combine_all(&left, &right)?;
                vec![
                    (SetOp::Union, union),
                    (SetOp::Intersection, intersection),
                    (SetOp::Difference, difference),
                ]
            }
            _ => bail!("{choice} is not an operation"),
        };
        for (op, result) in results {
            Self::show_set(console, &format!("{left} {} {right}", op.symbol()), &result)?;
            console.say(&format!("  {} element(s)", result.len()))?;
        }
        Ok(())
    }

    fn compare(&mut self, console: &mut dyn Console) -> Result<()> {
        let left = self.choose_set(console, "First set: ")?;
        let right = self.choose_set(console, "Second set: ")?;
        let (a, b) = (self.store.get(&left)?, self.store.get(&right)?);
        let (ta, tb) = (a.to_tokens(), b.to_tokens());
        let mut lines = vec![
            format!("Relation of {left} to {right}: {}", a.relation(b).label()),
            format!("{left} ⊆ {right}: {}", a.is_subset(b)),
            format!("{left} ⊂ {right}: {}", algebra::is_proper_subset(&ta, &tb)),
            format!("Disjoint: {}", algebra::is_disjoint(&ta, &tb)),
            format!("Equal: {}", algebra::is_equal(&ta, &tb)),
        ];
        let identity = algebra::two_set_identity(&ta, &tb);
        lines.push(format!(
            "|{left} U {right}| = {}, |{left}| + |{right}| - |{left} INT {right}| = {} ({})",
            identity.lhs,
            identity.rhs,
            if identity.holds() { "holds" } else { "FAILS" }
        ));
        let jaccard = report::jaccard(a, b);
        lines.push(format!(
            "Jaccard: {jaccard:.3} ({})  Dice: {:.3}",
            report::Similarity::of(jaccard).label(),
            report::dice(a, b)
        ));

        // Complements are taken inside the union of every set in the session
        let universe = self
            .store
            .list()
            .fold(std::collections::BTreeSet::new(), |all, (_, set)| algebra::union(&all, &set.to_tokens()));
        let laws = algebra::de_morgan(&ta, &tb, &universe);
        lines.push(format!(
            "De Morgan: (A U B)' = A' INT B' {}, (A INT B)' = A' U B' {}",
            laws.complement_of_union, laws.complement_of_intersection
        ));

        match a.power_set() {
            Some(subsets) if a.len() <= POWER_SET_SHOWN => {
                lines.push(format!("Power set of {left} ({} subsets):", subsets.len()));
                lines.extend(subsets.iter().map(|s| format!("  {s}")));
            }
            Some(subsets) => lines.push(format!("Power set of {left}: {} subsets", subsets.len())),
            None => lines.push(format!(
                "Power set of {left}: 2^{} subsets, too many to build (limit {POWER_SET_LIMIT} elements)",
                a.len()
            )),
        }
        for line in lines {
            console.say(&line)?;
        }
        Ok(())
    }

    fn three_sets(&mut self, console: &mut dyn Console) -> Result<()> {
        let names = [
            self.choose_set(console, "Set A: ")?,
            self.choose_set(console, "Set B: ")?,
            self.choose_set(console, "Set C: ")?,
        ];
        let mut sets = Vec::new();
        for name in &names {
            sets.push(self.store.get(name)?.to_tokens());
        }
        let counts = algebra::Overlaps::of(&sets[0], &sets[1], &sets[2]);
        console.say(&format!(
            "|A| = {}, |B| = {}, |C| = {}, |A∩B| = {}, |A∩C| = {}, |B∩C| = {}, |A∩B∩C| = {}",
            counts.a, counts.b, counts.c, counts.ab, counts.ac, counts.bc, counts.abc
        ))?;
        let check = algebra::three_set_identity(&sets[0], &sets[1], &sets[2]);
        console.say(&format!(
            "|A ∪ B ∪ C| counted: {}, by inclusion-exclusion: {} ({})",
            check.lhs,
            check.rhs,
            if check.holds() { "holds" } else { "FAILS" }
        ))
    }

    fn classify(&mut self, console: &mut dyn Console) -> Result<()> {
        let raw = Self::ask_text(console, "Text: ")?;
        let classified = typed::classify(&raw);
        let integers = TypedSet::Integer(classified.integers.clone());
        let decimals = TypedSet::Decimal(classified.decimals.clone());
        let words = TypedSet::Token(classified.tokens.clone());
        Self::show_set(console, "Integers", &integers)?;
        Self::show_set(console, "Decimals", &decimals)?;
        Self::show_set(console, "Words", &words)?;
        console.say(&format!(
            "Sum of the integers: {}  Sum of the decimals: {}",
            classified.integer_sum(),
            classified.decimal_sum()
        ))
    }

    fn save(&mut self, console: &mut dyn Console) -> Result<()> {
        let name = self.choose_set(console, "Set to save: ")?;
        let file = Self::ask_text(console, &format!("File name [{name}]: "))?;
        let file = if file.trim().is_empty() { name.clone() } else { file };
        let set = self.store.get(&name)?;
        let record = Record { name: name.clone(), kind: set.kind(), elements: self.store.raw(&name)?.to_owned() };
        let path = self.archive.save(&file, &record, Local::now())?;
        self.store.note(HistoryKind::Saved, format!("{name} in {}", path.display()));
        console.say(&format!("Saved {name} to {}", path.display()))
    }

    fn choose_file(&self, console: &mut dyn Console, prompt: &str) -> Result<String> {
        let files = self.archive.files()?;
        if files.is_empty() {
            bail!("There are no saved sets in {}.", self.archive.dir().display());
        }
        for (i, file) in files.iter().enumerate() {
            console.say(&entry(&(i + 1).to_string(), file))?;
        }
        let number = Self::ask_number(console, prompt)?;
        self.archive
            .file_at(index_of(number))
            .map_err(|e| anyhow!("There is no saved set number {number} ({e})."))
    }

    fn load(&mut self, console: &mut dyn Console) -> Result<()> {
        let file = self.choose_file(console, "File to load: ")?;
        let loaded = self.archive.read(&file)?;
        if !loaded.parsed.rejected.is_empty() {
            console.warn(&format!("Ignored malformed elements: {}", loaded.parsed.rejected.join(" ")))?;
        }
        let name = loaded.record.name.clone();
        let set = loaded.parsed.set.clone();
        let creation = self.store.create_from(&name, set, loaded.record.elements.clone(), |name| {
            console.confirm(&format!("A set named {name} exists. Replace it?")).unwrap_or(false)
        })?;
        if creation == Creation::Cancelled {
            return console.say("Kept the existing set.");
        }
        self.archive.log_loaded(&loaded);
        self.store.note(HistoryKind::Loaded, format!("{name} from {}", loaded.file_name));
        Self::show_set(console, &name, &loaded.parsed.set)
    }

    fn list_saved(&mut self, console: &mut dyn Console) -> Result<()> {
        let listing = self.archive.list()?;
        if listing.is_empty() {
            return console.say(&format!("There are no saved sets in {}.", self.archive.dir().display()));
        }
        console.say(&as_title("SAVED SETS").to_string())?;
        for entry in listing {
            let modified = entry
                .modified
                .map_or_else(|| "unknown".to_owned(), |at| at.format(TIMESTAMP).to_string());
            console.say(&format!(
                "{}  {} bytes, modified {modified}",
                as_item(&entry.file_name),
                entry.size
            ))?;
            if let (Some(name), Some(kind)) = (&entry.name, &entry.kind) {
                console.say(&format!("      {name} ({kind})"))?;
            }
        }
        Ok(())
    }

    fn delete_saved(&mut self, console: &mut dyn Console) -> Result<()> {
        let file = self.choose_file(console, "File to delete: ")?;
        let confirmed = console.confirm(&format!("Delete {file}? This can't be undone."))?;
        if self.archive.delete(&file, confirmed)? {
            self.store.note(HistoryKind::Deleted, file.clone());
            console.say(&format!("Deleted {file}."))
        } else {
            console.say("Nothing deleted.")
        }
    }

    fn import(&mut self, console: &mut dyn Console) -> Result<()> {
        let source = Self::ask_text(console, "Text file to import: ")?;
        let name = Self::ask_text(console, "Name for the set: ")?;
        let imported = self.archive.import(Path::new(source.trim()), &name, Local::now())?;
        console.say(&format!(
            "Saved {} distinct word(s) to {}",
            imported.set.len(),
            imported.path.display()
        ))?;
        let shown = imported.set.clone();
        let creation = self.store.create(&name, imported.set, |name| {
            console.confirm(&format!("A set named {name} exists. Replace it?")).unwrap_or(false)
        })?;
        if creation != Creation::Cancelled {
            self.store.note(HistoryKind::Imported, format!("{} from {}", name.trim(), source.trim()));
            Self::show_set(console, name.trim(), &shown)?;
        }
        Ok(())
    }

    fn backup(&mut self, console: &mut dyn Console) -> Result<()> {
        let path = self.archive.backup(&self.out_dir, Local::now())?;
        console.say(&format!("Backup written to {}", path.display()))
    }

    fn history(&mut self, console: &mut dyn Console) -> Result<()> {
        console.say(&as_title("THIS SESSION").to_string())?;
        for entry in self.store.history() {
            console.say(&entry.to_string())?;
        }
        console.say(&as_title("HISTORY FILE").to_string())?;
        let saved = self.archive.history()?;
        if saved.is_empty() {
            console.say("(empty)")?;
        }
        for line in saved {
            console.say(&line)?;
        }
        Ok(())
    }

    fn report(&mut self, console: &mut dyn Console) -> Result<()> {
        if self.store.is_empty() {
            bail!("There are no sets to report on.");
        }
        let formats = [ReportFormat::Text, ReportFormat::Csv, ReportFormat::Html, ReportFormat::Comparative];
        let captions = ["plain text", "CSV", "HTML", "comparative matrix"];
        for (i, caption) in captions.iter().enumerate() {
            console.say(&entry(&(i + 1).to_string(), caption))?;
        }
        console.say(&entry("5", "all of them"))?;
        let choice = Self::ask_number(console, "Format: ")?;
        let chosen: Vec<ReportFormat> = match choice {
            1..=4 => vec![formats[usize::try_from(choice - 1)?]],
            5 => formats.to_vec(),
            _ => bail!("{choice} is not a report format"),
        };
        let analysis = Analysis::compute(self.store.list(), Local::now());
        for format in chosen {
            let path = render::write_report(&analysis, format, &self.out_dir)?;
            console.say(&format!("Report written to {}", path.display()))?;
        }
        Ok(())
    }

    fn clubs(&mut self, console: &mut dyn Console) -> Result<()> {
        let population = Self::ask_number(console, "Population: ")?;
        let survey = Survey::clubs(u64::try_from(population).context("The population can't be negative")?);
        let n = survey.counts()?;
        console.say(&format!(
            "Colina {}, Silvestre {}, Campestre {}; Colina and Silvestre {}, Colina and Campestre {}, Silvestre and Campestre {}; all three {}",
            n.a, n.b, n.c, n.ab, n.ac, n.bc, n.abc
        ))?;
        console.say(&format!("At least one club: {}", survey.attending_any()?))?;
        console.say(&format!("No club: {}", survey.attending_none()?))?;
        match survey.verify()? {
            Some(check) => console.say(&format!(
                "Counted from concrete sets of people: {} ({})",
                check.lhs,
                if check.holds() { "agrees" } else { "DISAGREES" }
            )),
            None => console.say(&format!("Too many people to count one by one (limit {LITERAL_LIMIT}).")),
        }
    }
}
