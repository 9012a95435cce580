//! Durable sets. Each set lives in its own `*.conjunto` file inside one
//! directory, and every durable operation is appended to a plain text history
//! file next to it.
//!
//! A set file looks like this:
//!
//! ```text
//! # Set file written by setkeeper
//! # Date: 2024-05-01 10:00:00
//! # Nome: Letters
//! # Tipo: Words/Text
//!
//! NOME=Letters
//! TIPO=3
//! ELEMENTOS=b a a c
//! ```
//!
//! Lines starting with `#` are skipped on read, except that `list` shows the
//! `# Nome:` and `# Tipo:` headers. The three keys may come in any order and
//! unknown lines are ignored. `ELEMENTOS` holds the raw tokens exactly as they
//! were supplied; they are typed again on every load.
use bstr::ByteSlice;
use chrono::{DateTime, Local};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::store::{HistoryEntry, HistoryKind, TIMESTAMP};
use crate::typed::{self, ParsedSet, SetKind, TypedSet};

/// Extension of set files
pub const EXTENSION: &str = "conjunto";
/// Where set files go unless told otherwise
pub const DEFAULT_DIR: &str = "conjuntos_salvos";
/// The history file, unless told otherwise
pub const DEFAULT_HISTORY: &str = "historico_operacoes.txt";

const NAME_KEY: &str = "NOME";
const KIND_KEY: &str = "TIPO";
const ELEMENTS_KEY: &str = "ELEMENTOS";
const NAME_HEADER: &str = "# Nome: ";
const KIND_HEADER: &str = "# Tipo: ";

/// Errors from reading and writing set files
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// The file has no `TIPO=` line
    #[error("{file} has no TIPO= line, so its elements can't be typed")]
    MissingKind {
        /// File name
        file: String,
    },
    /// The `TIPO=` value isn't 1, 2 or 3
    #[error("{file} has type code '{code}', expected 1, 2 or 3")]
    InvalidKind {
        /// File name
        file: String,
        /// The value found
        code: String,
    },
    /// Empty names, path separators and the like
    #[error("'{0}' can't be used as a file name")]
    InvalidFileName(String),
    /// No such set file
    #[error("there is no saved set file {0}")]
    NotFound(String),
    /// A list selection outside `0..len`
    #[error("invalid index {index}: there are {len} saved sets")]
    IndexOutOfRange {
        /// The index asked for
        index: usize,
        /// How many files there are
        len: usize,
    },
    /// Anything the file system refused
    #[error("{action} {}", .path.display())]
    Io {
        /// What was being done, e.g. "can't read"
        action: &'static str,
        /// The file or directory involved
        path: PathBuf,
        /// The underlying error
        #[source]
        source: io::Error,
    },
}

fn io_error<'a>(action: &'static str, path: &'a Path) -> impl FnOnce(io::Error) -> ArchiveError + 'a {
    move |source| ArchiveError::Io { action, path: path.to_path_buf(), source }
}

/// The contents of one set file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// The set's name, from `NOME=`
    pub name: String,
    /// The kind its elements are parsed as, from `TIPO=`
    pub kind: SetKind,
    /// The raw element text, from `ELEMENTOS=`
    pub elements: String,
}

impl Record {
    /// A record for a set already in memory
    #[must_use]
    pub fn of(name: &str, set: &TypedSet) -> Record {
        Record { name: name.to_owned(), kind: set.kind(), elements: set.space_joined() }
    }

    /// The full text of the file, headers included
    #[must_use]
    pub fn to_file_text(&self, now: DateTime<Local>) -> String {
        format!(
            "# Set file written by setkeeper\n\
             # Date: {}\n\
             {NAME_HEADER}{}\n\
             {KIND_HEADER}{}\n\
             \n\
             {NAME_KEY}={}\n\
             {KIND_KEY}={}\n\
             {ELEMENTS_KEY}={}\n",
            now.format(TIMESTAMP),
            self.name,
            self.kind.label(),
            self.name,
            self.kind.code(),
            self.elements,
        )
    }

    /// Reads the text of the file `file`. A missing `NOME=` falls back to the
    /// file stem and a missing `ELEMENTOS=` to the empty set, but a missing or
    /// unknown `TIPO=` is an error.
    pub fn parse(text: &str, file: &str) -> Result<Record, ArchiveError> {
        let mut name = None;
        let mut code = None;
        let mut elements = String::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else { continue };
            match key.trim() {
                NAME_KEY => name = Some(value.trim().to_owned()),
                KIND_KEY => code = Some(value.trim().to_owned()),
                ELEMENTS_KEY => value.clone_into(&mut elements),
                other => tracing::debug!(file, key = other, "ignoring unknown key"),
            }
        }
        let code = code.ok_or_else(|| ArchiveError::MissingKind { file: file.to_owned() })?;
        let kind = code
            .parse()
            .ok()
            .and_then(SetKind::from_code)
            .ok_or_else(|| ArchiveError::InvalidKind { file: file.to_owned(), code: code.clone() })?;
        let name = match name {
            Some(name) if !name.is_empty() => name,
            _ => stem_of(file).to_owned(),
        };
        Ok(Record { name, kind, elements })
    }

    /// Types the raw elements
    #[must_use]
    pub fn typed(&self) -> ParsedSet {
        typed::parse(&self.elements, self.kind)
    }
}

fn stem_of(file: &str) -> &str {
    file.strip_suffix(EXTENSION).and_then(|s| s.strip_suffix('.')).unwrap_or(file)
}

/// Checks that `name` names a file inside the set directory and returns the
/// file name, with the extension added if it wasn't there already.
pub fn file_name_of(name: &str) -> Result<String, ArchiveError> {
    let stem = stem_of(name.trim());
    let unusable = stem.is_empty()
        || stem == "."
        || stem == ".."
        || stem.contains(&['/', '\\'][..])
        || stem.chars().any(char::is_control);
    if unusable {
        return Err(ArchiveError::InvalidFileName(name.to_owned()));
    }
    Ok(format!("{stem}.{EXTENSION}"))
}

/// Decode UTF-16 to UTF-8 if we see a UTF-16 Byte Order Mark at the beginning of `candidate`.
/// Otherwise return `candidate` unchanged
fn decode_if_utf16(candidate: Vec<u8>) -> Vec<u8> {
    if let Some((enc, bom_length)) = encoding_rs::Encoding::for_bom(&candidate) {
        if [encoding_rs::UTF_16LE, encoding_rs::UTF_16BE].contains(&enc) {
            let (translated, _had_malformed_sequences) =
                enc.decode_without_bom_handling(&candidate[bom_length..]);
            return translated.into_owned().into_bytes();
        }
    }
    return candidate;
}

/// Reads `path` as text: UTF-16 if it starts with a UTF-16 BOM, otherwise
/// UTF-8 with malformed sequences replaced.
fn read_text(path: &Path) -> Result<String, ArchiveError> {
    let bytes = fs::read(path).map_err(io_error("can't read", path))?;
    let bytes = decode_if_utf16(bytes);
    let text = bytes.to_str_lossy();
    Ok(text.strip_prefix('\u{feff}').unwrap_or(&*text).to_owned())
}

/// One line of the directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// File name, extension included
    pub file_name: String,
    /// Size in bytes
    pub size: u64,
    /// Last modification, if the platform knows it
    pub modified: Option<DateTime<Local>>,
    /// The `# Nome:` header
    pub name: Option<String>,
    /// The `# Tipo:` header
    pub kind: Option<String>,
}

/// A set read back from disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loaded {
    /// The file it came from
    pub file_name: String,
    /// What the file said
    pub record: Record,
    /// The typed elements, and any tokens that didn't fit the type
    pub parsed: ParsedSet,
}

/// The result of `Archive::import`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Imported {
    /// Where the imported set was saved
    pub path: PathBuf,
    /// The word set built from the source text
    pub set: TypedSet,
}

/// The set directory and the history file
#[derive(Debug, Clone)]
pub struct Archive {
    dir: PathBuf,
    history_path: PathBuf,
}

impl Archive {
    /// Uses `dir` for set files, creating it if needed, and `history_path`
    /// for the history log.
    pub fn open(dir: impl Into<PathBuf>, history_path: impl Into<PathBuf>) -> Result<Archive, ArchiveError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(io_error("can't create directory", &dir))?;
        Ok(Archive { dir, history_path: history_path.into() })
    }

    /// The set directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write_record(&self, file_name: &str, record: &Record, now: DateTime<Local>) -> Result<PathBuf, ArchiveError> {
        let path = self.dir.join(file_name_of(file_name)?);
        fs::write(&path, record.to_file_text(now)).map_err(io_error("can't write", &path))?;
        Ok(path)
    }

    /// Writes `record` to `<file_name>.conjunto`, replacing any file of that
    /// name, and logs SAVED.
    pub fn save(&self, file_name: &str, record: &Record, now: DateTime<Local>) -> Result<PathBuf, ArchiveError> {
        let path = self.write_record(file_name, record, now)?;
        tracing::info!(name = %record.name, path = %path.display(), "saved set");
        self.try_append_history(
            HistoryKind::Saved,
            format!("{} in {}", record.name, file_name_of(file_name)?),
        );
        Ok(path)
    }

    /// Names of the set files, sorted
    pub fn files(&self) -> Result<Vec<String>, ArchiveError> {
        let entries = fs::read_dir(&self.dir).map_err(io_error("can't list", &self.dir))?;
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(io_error("can't list", &self.dir))?;
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == EXTENSION) {
                files.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        files.sort();
        Ok(files)
    }

    /// The set files with their size, modification time and headers. A file
    /// whose headers can't be read is still listed.
    pub fn list(&self) -> Result<Vec<ArchiveEntry>, ArchiveError> {
        let mut listing = Vec::new();
        for file_name in self.files()? {
            let path = self.dir.join(&file_name);
            let metadata = fs::metadata(&path).map_err(io_error("can't inspect", &path))?;
            let mut entry = ArchiveEntry {
                size: metadata.len(),
                modified: metadata.modified().ok().map(DateTime::<Local>::from),
                name: None,
                kind: None,
                file_name,
            };
            match read_text(&path) {
                Ok(text) => {
                    for line in text.lines() {
                        if let Some(name) = line.strip_prefix(NAME_HEADER) {
                            entry.name = Some(name.trim().to_owned());
                        } else if let Some(kind) = line.strip_prefix(KIND_HEADER) {
                            entry.kind = Some(kind.trim().to_owned());
                        }
                    }
                }
                Err(e) => tracing::warn!(error = %e, "can't read headers"),
            }
            listing.push(entry);
        }
        Ok(listing)
    }

    /// The `index`th name of `files`
    pub fn file_at(&self, index: usize) -> Result<String, ArchiveError> {
        let mut files = self.files()?;
        let len = files.len();
        if index >= len {
            return Err(ArchiveError::IndexOutOfRange { index, len });
        }
        Ok(files.swap_remove(index))
    }

    fn existing(&self, file_name: &str) -> Result<(String, PathBuf), ArchiveError> {
        let file_name = file_name_of(file_name)?;
        let path = self.dir.join(&file_name);
        if !path.is_file() {
            return Err(ArchiveError::NotFound(file_name));
        }
        Ok((file_name, path))
    }

    /// Reads a set file back without logging anything
    pub fn read(&self, file_name: &str) -> Result<Loaded, ArchiveError> {
        let (file_name, path) = self.existing(file_name)?;
        let record = Record::parse(&read_text(&path)?, &file_name)?;
        let parsed = record.typed();
        Ok(Loaded { file_name, record, parsed })
    }

    /// Reads a set file back and logs LOADED
    pub fn load(&self, file_name: &str) -> Result<Loaded, ArchiveError> {
        let loaded = self.read(file_name)?;
        self.log_loaded(&loaded);
        Ok(loaded)
    }

    /// Logs LOADED for a set that was `read` and then accepted
    pub fn log_loaded(&self, loaded: &Loaded) {
        tracing::info!(name = %loaded.record.name, file = %loaded.file_name, "loaded set");
        self.try_append_history(
            HistoryKind::Loaded,
            format!("{} from {}", loaded.record.name, loaded.file_name),
        );
    }

    /// Deletes a set file, but only if `confirmed`. Returns whether the file
    /// was deleted.
    pub fn delete(&self, file_name: &str, confirmed: bool) -> Result<bool, ArchiveError> {
        let (file_name, path) = self.existing(file_name)?;
        if !confirmed {
            tracing::debug!(file = %file_name, "deletion not confirmed");
            return Ok(false);
        }
        fs::remove_file(&path).map_err(io_error("can't delete", &path))?;
        tracing::info!(file = %file_name, "deleted set file");
        self.try_append_history(HistoryKind::Deleted, file_name);
        Ok(true)
    }

    /// Reads free text from `source`, keeps every whitespace separated word
    /// (lowercased), and saves the result as a word set called `name`. The
    /// file name is `name` with runs of whitespace replaced by `_`.
    pub fn import(&self, source: &Path, name: &str, now: DateTime<Local>) -> Result<Imported, ArchiveError> {
        let name = name.trim();
        let text = read_text(source)?;
        let set = TypedSet::tokens(text.split_whitespace());
        let file_name = file_name_of(&name.split_whitespace().collect::<Vec<_>>().join("_"))?;
        let path = self.write_record(&file_name, &Record::of(name, &set), now)?;
        tracing::info!(name, source = %source.display(), words = set.len(), "imported text");
        self.try_append_history(
            HistoryKind::Imported,
            format!("{name} from {} ({} words)", source.display(), set.len()),
        );
        Ok(Imported { path, set })
    }

    /// Writes every set file and the history log into one
    /// `backup_<milliseconds>.txt` file in `out_dir`.
    pub fn backup(&self, out_dir: &Path, now: DateTime<Local>) -> Result<PathBuf, ArchiveError> {
        let mut text = format!(
            "# Full backup of {}\n# Date: {}\n\n=== SAVED SETS ===\n",
            self.dir.display(),
            now.format(TIMESTAMP)
        );
        for file_name in self.files()? {
            text.push_str(&format!("\n>>> FILE: {file_name}\n"));
            match read_text(&self.dir.join(&file_name)) {
                Ok(contents) => {
                    text.push_str(&contents);
                    if !contents.ends_with('\n') {
                        text.push('\n');
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "leaving file out of backup");
                    text.push_str(&format!("could not read {file_name}\n"));
                }
            }
        }
        text.push_str("\n=== OPERATION HISTORY ===\n");
        for line in self.history()? {
            text.push_str(&line);
            text.push('\n');
        }
        let path = out_dir.join(format!("backup_{}.txt", now.timestamp_millis()));
        fs::write(&path, text).map_err(io_error("can't write", &path))?;
        tracing::info!(path = %path.display(), "backup written");
        Ok(path)
    }

    /// The lines of the history file, oldest first. A missing file is an
    /// empty history.
    pub fn history(&self) -> Result<Vec<String>, ArchiveError> {
        if !self.history_path.exists() {
            return Ok(Vec::new());
        }
        let text = read_text(&self.history_path)?;
        Ok(text.lines().map(str::to_owned).collect())
    }

    /// Appends one line to the history file. Failure is logged and reported
    /// through the return value, never as an error.
    pub fn try_append_history(&self, kind: HistoryKind, description: impl Into<String>) -> bool {
        let entry = HistoryEntry::now(kind, description);
        let appended = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.history_path)
            .and_then(|mut file| writeln!(file, "{entry}"));
        match appended {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(path = %self.history_path.display(), error = %e, "can't append to history");
                false
            }
        }
    }
}

#[allow(clippy::pedantic)]
#[cfg(test)]
mod test {
    use super::*;
    use assert_fs::{prelude::*, TempDir};

    fn archive_in(temp: &TempDir) -> Archive {
        Archive::open(temp.child("sets").path(), temp.child("history.txt").path()).unwrap()
    }

    #[test]
    fn saved_words_load_back_deduplicated() {
        let temp = TempDir::new().unwrap();
        let archive = archive_in(&temp);
        let record = Record { name: "Letters".into(), kind: SetKind::Token, elements: "b a a c".into() };
        let path = archive.save("letters", &record, Local::now()).unwrap();
        assert!(path.ends_with("sets/letters.conjunto"));

        let loaded = archive.load("letters.conjunto").unwrap();
        assert_eq!(loaded.record, record);
        assert_eq!(loaded.parsed.set, TypedSet::tokens(["a", "b", "c"]));
        assert_eq!(loaded.parsed.set.len(), 3);

        let history = archive.history().unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].ends_with("SAVED: Letters in letters.conjunto"), "{}", history[0]);
        assert!(history[1].ends_with("LOADED: Letters from letters.conjunto"), "{}", history[1]);
    }

    #[test]
    fn numeric_sets_survive_a_round_trip() {
        let temp = TempDir::new().unwrap();
        let archive = archive_in(&temp);
        let now = Local::now();
        let samples = [
            ("Decimals", typed::parse("-0.5 3 1e-7 2.25 0.30000000000000004 -0", SetKind::Decimal).set),
            ("Integers", typed::parse("42 -7 0 9223372036854775807 -9223372036854775808", SetKind::Integer).set),
            ("Nothing", TypedSet::empty(SetKind::Integer)),
        ];
        for (name, set) in &samples {
            archive.save(name, &Record::of(name, set), now).unwrap();
            let loaded = archive.read(name).unwrap();
            assert_eq!(&loaded.parsed.set, set, "for {name}");
            assert!(loaded.parsed.rejected.is_empty(), "for {name}");
            assert_eq!(loaded.record.kind, set.kind());
        }
        assert_eq!(samples[0].1.len(), 6);
        assert!(archive.history().unwrap().iter().all(|line| line.contains("SAVED")));
    }

    #[test]
    fn keys_in_any_order_and_comments_ignored() {
        let text = "# comment\nELEMENTOS=3 1 x 2\nsomething else\n\nTIPO=1\nNOME=Numbers\n";
        let record = Record::parse(text, "numbers.conjunto").unwrap();
        assert_eq!(record.name, "Numbers");
        assert_eq!(record.kind, SetKind::Integer);
        let parsed = record.typed();
        assert_eq!(parsed.set.canonical(), "{1, 2, 3}");
        assert_eq!(parsed.rejected, vec!["x"]);
    }

    #[test]
    fn missing_name_and_elements_have_fallbacks() {
        let record = Record::parse("TIPO=2\n", "prices.conjunto").unwrap();
        assert_eq!(record.name, "prices");
        assert!(record.typed().set.is_empty());
    }

    #[test]
    fn missing_or_unknown_type_is_an_error() {
        let missing = Record::parse("NOME=A\nELEMENTOS=1 2\n", "a.conjunto");
        assert!(matches!(missing, Err(ArchiveError::MissingKind { .. })));
        let unknown = Record::parse("NOME=A\nTIPO=7\n", "a.conjunto");
        assert!(matches!(unknown, Err(ArchiveError::InvalidKind { code, .. }) if code == "7"));
    }

    #[test]
    fn file_names_stay_inside_the_directory() {
        assert_eq!(file_name_of("a b").unwrap(), "a b.conjunto");
        assert_eq!(file_name_of("a.conjunto").unwrap(), "a.conjunto");
        for bad in ["", "  ", "../x", "a/b", "a\\b", "..", ".conjunto"] {
            assert!(matches!(file_name_of(bad), Err(ArchiveError::InvalidFileName(_))), "{bad:?}");
        }
    }

    #[test]
    fn listing_is_sorted_and_shows_headers() {
        let temp = TempDir::new().unwrap();
        let archive = archive_in(&temp);
        let now = Local::now();
        archive.save("zeta", &Record::of("Z", &TypedSet::tokens(["z"])), now).unwrap();
        archive.save("alpha", &Record::of("A", &typed::parse("1 2", SetKind::Integer).set), now).unwrap();
        temp.child("sets/notes.txt").write_str("not a set").unwrap();

        assert_eq!(archive.files().unwrap(), vec!["alpha.conjunto", "zeta.conjunto"]);
        let listing = archive.list().unwrap();
        assert_eq!(listing[0].name.as_deref(), Some("A"));
        assert_eq!(listing[0].kind.as_deref(), Some("Integers"));
        assert_eq!(listing[1].kind.as_deref(), Some("Words/Text"));
        assert!(listing[0].size > 0);
        assert_eq!(archive.file_at(1).unwrap(), "zeta.conjunto");
        assert!(matches!(archive.file_at(2), Err(ArchiveError::IndexOutOfRange { index: 2, len: 2 })));
    }

    #[test]
    fn deleting_needs_confirmation() {
        let temp = TempDir::new().unwrap();
        let archive = archive_in(&temp);
        archive.save("a", &Record::of("A", &TypedSet::tokens(["x"])), Local::now()).unwrap();
        assert!(!archive.delete("a", false).unwrap());
        temp.child("sets/a.conjunto").assert(predicates::path::exists());
        assert!(archive.delete("a", true).unwrap());
        temp.child("sets/a.conjunto").assert(predicates::path::missing());
        assert!(matches!(archive.delete("a", true), Err(ArchiveError::NotFound(_))));
    }

    #[test]
    fn unreadable_sources_name_the_path() {
        let temp = TempDir::new().unwrap();
        let archive = archive_in(&temp);
        let source = temp.child("nowhere.txt");
        let error = archive.import(source.path(), "ghost", Local::now()).unwrap_err();
        assert!(matches!(&error, ArchiveError::Io { action: "can't read", path, .. } if path == source.path()));
        assert_eq!(error.to_string(), format!("can't read {}", source.path().display()));
        assert!(archive.history().unwrap().is_empty());
    }

    #[test]
    fn import_reads_utf16_and_saves_words() {
        let temp = TempDir::new().unwrap();
        let archive = archive_in(&temp);
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "Hello world\r\nhello  Rust".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        temp.child("source.txt").write_binary(&bytes).unwrap();

        let imported = archive.import(temp.child("source.txt").path(), "my  words", Local::now()).unwrap();
        assert_eq!(imported.set, TypedSet::tokens(["hello", "rust", "world"]));
        assert!(imported.path.ends_with("my_words.conjunto"));

        let loaded = archive.load("my_words").unwrap();
        assert_eq!(loaded.record.name, "my  words");
        assert_eq!(loaded.parsed.set, imported.set);
        assert!(archive.history().unwrap()[0].contains("IMPORTED: my  words"));
    }

    #[test]
    fn backup_collects_files_and_history() {
        let temp = TempDir::new().unwrap();
        let archive = archive_in(&temp);
        archive.save("a", &Record::of("A", &TypedSet::tokens(["apple"])), Local::now()).unwrap();
        let out = temp.child("out");
        out.create_dir_all().unwrap();

        let path = archive.backup(out.path(), Local::now()).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("backup_") && name.ends_with(".txt"), "{name}");
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains(">>> FILE: a.conjunto"));
        assert!(text.contains("ELEMENTOS=apple"));
        assert!(text.contains("SAVED: A in a.conjunto"));
    }

    #[test]
    fn history_failures_are_swallowed() {
        let temp = TempDir::new().unwrap();
        let archive = Archive::open(temp.child("sets").path(), temp.path()).unwrap();
        assert!(!archive.try_append_history(HistoryKind::System, "nowhere to go"));
        let saved = archive.save("a", &Record::of("A", &TypedSet::tokens(["x"])), Local::now());
        assert!(saved.is_ok());
    }
}
