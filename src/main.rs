use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::thread;

use color_eyre::eyre::{WrapErr, eyre};
use crl_revocation::{
    config::Config,
    pki::{CertificateEntry, RevocationChecker, RevocationStatus},
    telemetry,
};

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();
    telemetry::init_tracing();

    let paths: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();
    if paths.is_empty() {
        return Err(eyre!("usage: crl-check <certificate file>..."));
    }

    // Load configuration
    let config = Config::load()?;
    tracing::debug!("Loaded configuration: {:?}", config);

    let checker = RevocationChecker::from_config(&config.revocation)
        .wrap_err("Failed to create revocation checker")?;

    let certificates = paths
        .iter()
        .map(|path| {
            let bytes = std::fs::read(path)
                .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
            CertificateEntry::from_bytes(bytes)
                .wrap_err_with(|| format!("Failed to decode {}", path.display()))
        })
        .collect::<color_eyre::Result<Vec<_>>>()?;

    // Independent certificates are checked in parallel on a bounded number
    // of workers; the cache is shared
    let parallelism = thread::available_parallelism().map_or(4, NonZeroUsize::get);
    let chunk_size = worker_chunk_size(certificates.len(), parallelism);
    let checker = &checker;
    let statuses: Vec<RevocationStatus> = thread::scope(|s| {
        let handles: Vec<_> = certificates
            .chunks(chunk_size)
            .map(|chunk| {
                s.spawn(move || {
                    chunk
                        .iter()
                        .map(|cert| checker.revocation_status(cert))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().map_err(|_| eyre!("revocation check panicked")))
            .collect::<color_eyre::Result<Vec<_>>>()
    })?
    .into_iter()
    .flatten()
    .collect();

    for (path, status) in paths.iter().zip(&statuses) {
        let verdict = if status.is_revoked() {
            "revoked"
        } else {
            "not revoked"
        };
        println!("{}: {}", path.display(), verdict);
    }

    Ok(())
}

/// Certificates per worker so that at most `parallelism` threads are spawned.
fn worker_chunk_size(total: usize, parallelism: usize) -> usize {
    total.div_ceil(parallelism.max(1)).max(1)
}
