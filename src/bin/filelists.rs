use anyhow::Context;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use tracing::{error, info};
use xd_dataprep::training::{libritts, lj_speech, uberduck, vctk};
use xd_dataprep::*;

#[derive(Parser, Debug)]
pub struct Args {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge the speaker ids of several filelists into one numbering
    Reconcile {
        /// Filelists to reconcile, in processing order
        #[clap(required = true)]
        filelists: Vec<PathBuf>,
        /// Index of the filelist whose speaker ids are kept as they are
        #[clap(long, short, default_value_t = 0)]
        reference: usize,
        /// Directory the reconciled filelists are written to, using their original file names
        #[clap(long, short)]
        out_dir: PathBuf,
    },
    /// Generate a filelist from an LJSpeech download
    Ljspeech {
        root: PathBuf,
        #[clap(long, default_value_t = 0)]
        speaker: SpeakerId,
        #[clap(long, short)]
        out: PathBuf,
    },
    /// Generate a filelist from VCTK, numbering speakers from `--first-speaker`
    Vctk {
        root: PathBuf,
        #[clap(long, default_value_t = 0)]
        first_speaker: SpeakerId,
        #[clap(long, short)]
        out: PathBuf,
    },
    /// Point a Mellotron LibriTTS filelist at a local copy of LibriTTS
    Libritts {
        /// Local LibriTTS directory
        root: PathBuf,
        /// Mellotron filelist
        filelist: PathBuf,
        #[clap(long, short)]
        out: PathBuf,
    },
    /// Generate a filelist from a folder containing an `all.txt`
    Uberduck {
        root: PathBuf,
        #[clap(long, default_value_t = 0)]
        speaker: SpeakerId,
        #[clap(long, short)]
        out: PathBuf,
    },
}

fn reconcile(filelists: Vec<PathBuf>, reference: usize, out_dir: PathBuf) -> anyhow::Result<()> {
    let loaded = filelists
        .iter()
        .map(|path| {
            Filelist::open(path).with_context(|| format!("Failed to load {}", path.display()))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let reconciliation = reconcile_speaker_ids(&loaded, reference)?;
    info!(
        "{} speakers across {} filelists",
        reconciliation.reserved.len(),
        filelists.len()
    );

    let outputs = filelist::output_paths(filelists.as_slice(), &out_dir)?;
    for (path, remap) in filelists.iter().zip(&reconciliation.remaps) {
        for (old, new) in remap {
            info!("{}: speaker {} -> {}", path.display(), old, new);
        }
    }

    fs::create_dir_all(&out_dir)?;
    filelist::save_all(&reconciliation.filelists, &outputs)?;
    for (written, out) in reconciliation.filelists.iter().zip(&outputs) {
        info!("Wrote {} rows to {}", written.len(), out.display());
    }
    Ok(())
}

fn save(filelist: Filelist, out: PathBuf) -> anyhow::Result<()> {
    filelist.save(&out)?;
    info!(
        "Wrote {} rows for {} speakers to {}",
        filelist.len(),
        filelist.speaker_ids().len(),
        out.display()
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    xd_dataprep::setup_logging();
    let args = Args::parse();

    match args.command {
        Command::Reconcile {
            filelists,
            reference,
            out_dir,
        } => reconcile(filelists, reference, out_dir),
        Command::Ljspeech { root, speaker, out } => {
            let dataset = lj_speech::Dataset::load(&root)?;
            if !dataset.validate() {
                error!("LJSpeech metadata has errors, see above");
            }
            save(dataset.into_filelist(speaker), out)
        }
        Command::Vctk {
            root,
            first_speaker,
            out,
        } => save(vctk::Dataset::load(&root)?.into_filelist(first_speaker), out),
        Command::Libritts {
            root,
            filelist,
            out,
        } => save(libritts::load_mellotron(&root, &filelist)?, out),
        Command::Uberduck { root, speaker, out } => save(uberduck::load(&root, speaker)?, out),
    }
}
