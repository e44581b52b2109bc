use crate::filelist::{Filelist, Record, SpeakerId};
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub struct Entry {
    pub id: String,
    pub text: String,
    /// LJSpeech ships a third column with numbers and abbreviations expanded
    pub normalised_text: Option<String>,
}

pub struct Dataset {
    pub root: PathBuf,
    pub entries: Vec<Entry>,
}

impl Dataset {
    /// Loads `metadata.csv` from the root of an LJSpeech download
    pub fn load(root: impl AsRef<Path>) -> anyhow::Result<Self> {
        let root = root.as_ref();
        let f = File::open(root.join("metadata.csv"))?;
        let mut dataset = Self::from_reader(io::BufReader::new(f))?;
        dataset.root = root.to_path_buf();
        Ok(dataset)
    }

    fn from_reader(reader: impl Read) -> anyhow::Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .delimiter(b'|')
            .quoting(false) // LJ004-0076 and others don't close quotes on first channel transcript...
            .flexible(true)
            .from_reader(reader);

        let mut entries = vec![];

        for result in rdr.records() {
            let record = result?;
            match (record.get(0), record.get(1)) {
                (Some(id), Some(text)) if record.len() <= 3 => {
                    entries.push(Entry {
                        id: id.to_string(),
                        text: text.to_string(),
                        normalised_text: record.get(2).map(|x| x.to_string()),
                    });
                }
                _ => error!("Incomplete record: {:?}", record),
            }
        }
        Ok(Self {
            root: PathBuf::new(),
            entries,
        })
    }

    /// Validates there's nothing wrong with the dataset. Will log any errors it finds and return
    /// false
    pub fn validate(&self) -> bool {
        info!("Validating dataset");
        let mut ids = HashSet::new();
        let mut success = true;
        for entry in &self.entries {
            if entry.text.trim().is_empty() {
                error!("Transcript for {} is empty", entry.id);
                success = false;
            }
            if matches!(&entry.normalised_text, Some(s) if s.trim().is_empty()) {
                error!(
                    "{} transcript '{}' has an empty normalised form",
                    entry.id, entry.text
                );
                success = false;
            }
            if ids.contains(entry.id.as_str()) {
                error!("Duplicate ID: {}", entry.id);
                success = false;
            }
            ids.insert(entry.id.as_str());
        }
        info!("Validation complete");
        success
    }

    /// Every clip becomes `<root>/wavs/<id>.wav` spoken by `speaker_id`, the raw transcript is kept.
    pub fn into_filelist(self, speaker_id: SpeakerId) -> Filelist {
        let wavs = self.root.join("wavs");
        let records = self
            .entries
            .into_iter()
            .map(|entry| Record {
                audio_path: wavs
                    .join(format!("{}.wav", entry.id))
                    .to_string_lossy()
                    .into_owned(),
                transcript: entry.text,
                speaker_id,
            })
            .collect();
        Filelist::new(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const METADATA: &str = "LJ001-0001|Printing, in the only sense|Printing, in the only sense\n\
                            LJ004-0076|\"The prisoners were|\"The prisoners were\n\
                            LJ001-0002|in being comparatively modern.\n";

    #[test]
    fn load_metadata() {
        let dataset = Dataset::from_reader(io::Cursor::new(METADATA)).unwrap();

        assert_eq!(dataset.entries.len(), 3);
        assert_eq!(dataset.entries[1].text, "\"The prisoners were");
        assert!(dataset.entries[2].normalised_text.is_none());
        assert!(dataset.validate());
    }

    #[test]
    fn validation_failures() {
        let text = "LJ001-0001|Printing\nLJ001-0001|Duplicate\nLJ001-0003|  \n";
        let dataset = Dataset::from_reader(io::Cursor::new(text)).unwrap();
        assert!(!dataset.validate());
    }

    #[test]
    fn filelist_paths() {
        let mut dataset = Dataset::from_reader(io::Cursor::new(METADATA)).unwrap();
        dataset.root = PathBuf::from("/data/LJSpeech-1.1");

        let filelist = dataset.into_filelist(4);

        assert_eq!(filelist.len(), 3);
        assert_eq!(
            filelist.records[0].audio_path,
            Path::new("/data/LJSpeech-1.1/wavs/LJ001-0001.wav").to_string_lossy()
        );
        assert_eq!(filelist.records[0].transcript, "Printing, in the only sense");
        assert!(filelist.iter().all(|x| x.speaker_id == 4));
    }
}
