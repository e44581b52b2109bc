use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use xd_dataprep::training::*;
use xd_dataprep::Filelist;

#[derive(Parser, Debug)]
pub struct Args {
    /// Filelist to analyse
    input: PathBuf,
    /// Where to save the JSON report
    #[clap(short, long, default_value = "analysis.json")]
    output: PathBuf,
    /// Speaker id for rows which don't have one
    #[clap(long, default_value_t = 0)]
    default_speaker: u32,
}

fn main() -> anyhow::Result<()> {
    xd_dataprep::setup_logging();
    let args = Args::parse();

    let filelist = Filelist::open_with_default_speaker(&args.input, args.default_speaker)?;

    let mut analytics = AnalyticsGenerator::new();
    analytics.push_filelist(&filelist);
    let report = analytics.generate_report();

    info!("Number of clips: {}", report.clips);
    info!("Number of speakers: {}", report.speakers);
    info!("Number of distinct words: {}", report.word_frequencies.len());
    if let Some(characters) = &report.transcript_characters {
        info!(
            "Transcript length (characters) median: {} max: {}",
            characters.p50, characters.max
        );
    }

    let report = serde_json::to_string_pretty(&report)?;
    std::fs::write(&args.output, report)?;
    info!("Report written to {}", args.output.display());

    Ok(())
}
