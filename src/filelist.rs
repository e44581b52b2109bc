//! Filelists are the manifests training consumes: one row per clip in the form
//! `audio_path|transcript|speaker_id`. Raw corpora often come without the speaker column so the
//! loader can backfill a constant id, after which every `Filelist` is guaranteed to carry one.
use csv::{QuoteStyle, ReaderBuilder, StringRecord, WriterBuilder};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{self, prelude::*};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Integer speaker identifier as it appears in the last filelist column.
pub type SpeakerId = u32;

#[derive(Debug, Error)]
pub enum FilelistError {
    #[error("I/O error for {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("Unable to parse filelist: {0}")]
    Csv(#[from] csv::Error),
    #[error("Unable to write filelist: {0}")]
    Write(#[from] io::Error),
    #[error("Line {line}: expected {expected} fields, found {found}")]
    ColumnCount {
        line: u64,
        expected: &'static str,
        found: usize,
    },
    #[error("Line {line}: invalid speaker id '{value}'")]
    InvalidSpeakerId { line: u64, value: String },
    #[error("Row {row}: {field} contains a delimiter or line break")]
    UnwritableField { row: usize, field: &'static str },
    #[error("{0} has no file name")]
    NoFileName(PathBuf),
    #[error("{first} and {second} would both be written to {output}")]
    DuplicateOutput {
        first: PathBuf,
        second: PathBuf,
        output: PathBuf,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Record {
    pub audio_path: String,
    pub transcript: String,
    pub speaker_id: SpeakerId,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Filelist {
    pub records: Vec<Record>,
}

/// A row before a speaker id has been guaranteed for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub audio_path: String,
    pub transcript: String,
    pub speaker_id: Option<String>,
}

/// Gives every row a speaker id. Rows without the column, or whose column isn't an integer, are
/// assigned `speaker_key`; rows which already have a valid id keep it.
pub fn add_speaker_id(rows: Vec<RawRecord>, speaker_key: SpeakerId) -> Filelist {
    let records = rows
        .into_iter()
        .map(|row| {
            let speaker_id = row
                .speaker_id
                .as_deref()
                .and_then(|x| x.trim().parse().ok())
                .unwrap_or(speaker_key);
            Record {
                audio_path: row.audio_path,
                transcript: row.transcript,
                speaker_id,
            }
        })
        .collect();
    Filelist { records }
}

fn reader_builder() -> ReaderBuilder {
    let mut builder = ReaderBuilder::new();
    builder
        .has_headers(false)
        .delimiter(b'|')
        // Transcripts contain unbalanced quotes far too often to trust quoting
        .quoting(false)
        .flexible(true);
    builder
}

fn line_of(record: &StringRecord) -> u64 {
    record.position().map(|x| x.line()).unwrap_or_default()
}

/// Reads the raw two or three column rows, without interpreting the speaker column.
pub fn read_raw_rows(reader: impl Read) -> Result<Vec<RawRecord>, FilelistError> {
    let mut rdr = reader_builder().from_reader(reader);
    let mut rows = vec![];
    for result in rdr.records() {
        let record = result?;
        let row = match record.len() {
            2 | 3 => RawRecord {
                audio_path: record[0].to_string(),
                transcript: record[1].to_string(),
                speaker_id: record.get(2).map(|x| x.to_string()),
            },
            found => {
                return Err(FilelistError::ColumnCount {
                    line: line_of(&record),
                    expected: "2 or 3",
                    found,
                })
            }
        };
        rows.push(row);
    }
    Ok(rows)
}

fn open_file(path: &Path) -> Result<io::BufReader<File>, FilelistError> {
    let file = File::open(path).map_err(|source| FilelistError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(io::BufReader::new(file))
}

impl Filelist {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Opens a filelist which must already have a speaker id on every row.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FilelistError> {
        let path = path.as_ref();
        debug!("Loading filelist {}", path.display());
        Self::from_reader(open_file(path)?)
    }

    /// Opens a filelist where the speaker column may be missing, filling it in with `speaker_key`.
    pub fn open_with_default_speaker(
        path: impl AsRef<Path>,
        speaker_key: SpeakerId,
    ) -> Result<Self, FilelistError> {
        let path = path.as_ref();
        debug!("Loading raw filelist {}", path.display());
        Self::from_reader_with_default_speaker(open_file(path)?, speaker_key)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, FilelistError> {
        let mut rdr = reader_builder().from_reader(reader);
        let mut records = vec![];
        for result in rdr.records() {
            let record = result?;
            if record.len() != 3 {
                return Err(FilelistError::ColumnCount {
                    line: line_of(&record),
                    expected: "3",
                    found: record.len(),
                });
            }
            let speaker_id = record[2]
                .trim()
                .parse()
                .map_err(|_| FilelistError::InvalidSpeakerId {
                    line: line_of(&record),
                    value: record[2].to_string(),
                })?;
            records.push(Record {
                audio_path: record[0].to_string(),
                transcript: record[1].to_string(),
                speaker_id,
            });
        }
        Ok(Self { records })
    }

    pub fn from_reader_with_default_speaker(
        reader: impl Read,
        speaker_key: SpeakerId,
    ) -> Result<Self, FilelistError> {
        let rows = read_raw_rows(reader)?;
        Ok(add_speaker_id(rows, speaker_key))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), FilelistError> {
        let path = path.as_ref();
        let mut buffer = vec![];
        self.write(&mut buffer)?;
        fs::write(path, buffer).map_err(|source| FilelistError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Writes the filelist in the same pipe delimited form it's read in. Fields are written without
    /// quoting so any containing `|` or a line break are rejected before anything is written.
    pub fn write(&self, writer: impl Write) -> Result<(), FilelistError> {
        for (i, record) in self.records.iter().enumerate() {
            let fields = [
                ("audio path", &record.audio_path),
                ("transcript", &record.transcript),
            ];
            for (field, value) in fields {
                if value.contains(&['|', '\r', '\n'][..]) {
                    return Err(FilelistError::UnwritableField { row: i + 1, field });
                }
            }
        }
        let mut wtr = WriterBuilder::new()
            .has_headers(false)
            .delimiter(b'|')
            .quote_style(QuoteStyle::Never)
            .from_writer(writer);
        for record in &self.records {
            wtr.write_record([
                record.audio_path.as_str(),
                record.transcript.as_str(),
                record.speaker_id.to_string().as_str(),
            ])?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Distinct speaker ids in ascending order
    pub fn speaker_ids(&self) -> BTreeSet<SpeakerId> {
        self.records.iter().map(|x| x.speaker_id).collect()
    }

    /// Copy of the filelist with speaker ids rewritten via `remap`. Ids not in the map are kept.
    pub fn remap_speakers(&self, remap: &BTreeMap<SpeakerId, SpeakerId>) -> Self {
        let records = self
            .records
            .iter()
            .map(|record| Record {
                speaker_id: remap
                    .get(&record.speaker_id)
                    .copied()
                    .unwrap_or(record.speaker_id),
                ..record.clone()
            })
            .collect();
        Self { records }
    }
}

/// Where each input filelist ends up in `out_dir`, keeping its file name. Inputs from different
/// directories that share a name would overwrite each other so that's an error.
pub fn output_paths(
    inputs: &[impl AsRef<Path>],
    out_dir: impl AsRef<Path>,
) -> Result<Vec<PathBuf>, FilelistError> {
    let out_dir = out_dir.as_ref();
    let mut claimed: BTreeMap<PathBuf, &Path> = BTreeMap::new();
    let mut outputs = Vec::with_capacity(inputs.len());
    for input in inputs {
        let input = input.as_ref();
        let name = input
            .file_name()
            .ok_or_else(|| FilelistError::NoFileName(input.to_path_buf()))?;
        let output = out_dir.join(name);
        if let Some(first) = claimed.insert(output.clone(), input) {
            return Err(FilelistError::DuplicateOutput {
                first: first.to_path_buf(),
                second: input.to_path_buf(),
                output,
            });
        }
        outputs.push(output);
    }
    Ok(outputs)
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}

/// Saves every filelist to its path. Everything is serialised in memory first, then written next
/// to the destination and only renamed into place once all of the writes succeeded.
pub fn save_all(filelists: &[Filelist], paths: &[PathBuf]) -> Result<(), FilelistError> {
    assert_eq!(filelists.len(), paths.len(), "One path per filelist");
    let mut rendered = Vec::with_capacity(filelists.len());
    for filelist in filelists {
        let mut buffer = vec![];
        filelist.write(&mut buffer)?;
        rendered.push(buffer);
    }

    let staged = paths.iter().map(|x| staging_path(x)).collect::<Vec<_>>();
    let result = staged
        .iter()
        .zip(&rendered)
        .try_for_each(|(path, contents)| {
            fs::write(path, contents).map_err(|source| FilelistError::Io {
                path: path.clone(),
                source,
            })
        })
        .and_then(|_| {
            staged.iter().zip(paths).try_for_each(|(from, to)| {
                fs::rename(from, to).map_err(|source| FilelistError::Io {
                    path: to.clone(),
                    source,
                })
            })
        });
    if result.is_err() {
        for path in &staged {
            let _ = fs::remove_file(path);
        }
    }
    result
}

impl<'a> IntoIterator for &'a Filelist {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
