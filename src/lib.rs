use std::env;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::{Layer, Registry};

pub mod dsp;
pub mod filelist;
pub mod speakers;
pub mod training;

pub use filelist::{Filelist, FilelistError, Record, SpeakerId};
pub use speakers::{reconcile_speaker_ids, ReconcileError, Reconciliation};

pub fn setup_logging() {
    let filter = match env::var("RUST_LOG") {
        Ok(_) => EnvFilter::from_env("RUST_LOG"),
        _ => EnvFilter::new("xd_dataprep=info,filelists=info,dataset_stats=info"),
    };

    let fmt = tracing_subscriber::fmt::Layer::default();

    let subscriber = filter.and_then(fmt).with_subscriber(Registry::default());

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Logging already initialised: {}", e);
    }
}
