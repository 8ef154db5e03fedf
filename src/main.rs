use anyhow::{Context, Result};
use clap::Parser;
use fencepost::discovery::{self, DiscoveryConfig};
use fencepost::extract::{extract_issue, IssueExtraction};
use fencepost::noise::{NoiseConfig, NoiseStripper};
use fencepost::output::{ManifestRow, MonthDoc, OutputWriter, RunStats, VolumeDoc, VolumeFlag};
use fencepost::segment::Segmenter;
use fencepost::toc::{IssueSpec, TocManifest};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "fencepost")]
#[command(about = "TOC-driven article extractor for OCR'd serial publication issues")]
#[command(version)]
struct Args {
    /// Root directory holding per-issue text files
    root_dir: PathBuf,

    /// TOC manifest path (JSON)
    #[arg(long)]
    toc: PathBuf,

    /// Output directory for extracted entries
    #[arg(long, default_value = "processed")]
    out: PathBuf,

    /// Noise pattern config (TOML); defaults to the built-in set
    #[arg(long)]
    noise: Option<PathBuf>,

    /// Process only this volume label (e.g. Vol30)
    #[arg(long)]
    volume: Option<String>,

    /// Report what would be extracted without writing files
    #[arg(long)]
    dry_run: bool,

    /// Abort on first error
    #[arg(long)]
    fail_fast: bool,

    /// Suppress console progress bars
    #[arg(long)]
    no_progress: bool,

    /// Stats output file path
    #[arg(long, default_value = "run_stats.json")]
    stats_out: PathBuf,
}

struct ProcessedIssue {
    spec_index: usize,
    rows: Vec<ManifestRow>,
    extraction: IssueExtraction,
}

#[tokio::main]
async fn main() -> Result<()> {
    // WHY: structured JSON logging enables observability and debugging in production
    tracing_subscriber::fmt()
        .with_target(false)
        .json()
        .init();

    let args = Args::parse();

    info!("Starting fencepost");
    info!(?args, "Parsed CLI arguments");

    // WHY: validate root directory exists early to fail fast with clear error
    if !args.root_dir.exists() {
        anyhow::bail!("Root directory does not exist: {}", args.root_dir.display());
    }
    if !args.root_dir.is_dir() {
        anyhow::bail!("Root path is not a directory: {}", args.root_dir.display());
    }

    let mut manifest = TocManifest::load(&args.toc).await?;
    if let Some(volume) = &args.volume {
        manifest.retain_volume(volume);
        info!("Volume filter {}: {} issues retained", volume, manifest.issues.len());
    }
    if manifest.issues.is_empty() {
        anyhow::bail!("No issues to process");
    }

    // Pattern compilation happens here, before any issue is touched; a bad
    // configuration halts the whole run
    let noise_config = match &args.noise {
        Some(path) => NoiseConfig::load(path).await?,
        None => NoiseConfig::default_set(),
    };
    let stripper = Arc::new(NoiseStripper::compile(&noise_config)?);
    let segmenter = Arc::new(Segmenter::with_defaults()?);

    let discovery_config = DiscoveryConfig {
        fail_fast: args.fail_fast,
    };
    let issue_files =
        discovery::resolve_issue_files(&args.root_dir, &manifest, discovery_config).await?;
    let missing = issue_files.iter().filter(|f| f.path.is_none()).count();

    let manifest = Arc::new(manifest);
    let writer = Arc::new(OutputWriter::new(&args.out, args.dry_run));

    let to_process: Vec<_> = issue_files
        .into_iter()
        .filter_map(|f| f.path.map(|path| (f.spec_index, path)))
        .collect();

    let progress = if args.no_progress || args.dry_run {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(to_process.len() as u64)
    };
    progress.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}").expect("valid template"),
    );

    // WHY: issues share no mutable state, so they process concurrently;
    // everything order-sensitive happens after the join below
    let mut tasks = stream::iter(to_process)
        .map(|(spec_index, path)| {
            let manifest = Arc::clone(&manifest);
            let stripper = Arc::clone(&stripper);
            let segmenter = Arc::clone(&segmenter);
            let writer = Arc::clone(&writer);
            async move {
                let spec = &manifest.issues[spec_index];
                let result =
                    process_issue(spec_index, spec, &path, &stripper, &segmenter, &writer).await;
                (spec_index, result)
            }
        })
        .buffer_unordered(num_cpus::get());

    let mut processed: Vec<ProcessedIssue> = Vec::new();
    let mut failed = missing;
    while let Some((spec_index, result)) = tasks.next().await {
        progress.inc(1);
        match result {
            Ok(issue) => processed.push(issue),
            Err(e) => {
                if args.fail_fast {
                    progress.finish_and_clear();
                    return Err(e);
                }
                warn!(
                    issue = %manifest.issues[spec_index].label(),
                    "Issue processing failed (continuing): {e:#}"
                );
                failed += 1;
            }
        }
    }
    drop(tasks);
    progress.finish_and_clear();

    // Completion order is nondeterministic; manifest order restores it
    processed.sort_by_key(|issue| issue.spec_index);

    let mut run_stats = RunStats {
        issues_failed: failed,
        ..RunStats::default()
    };
    let mut all_rows: Vec<ManifestRow> = Vec::new();
    let mut volumes: Vec<(VolumeDoc, Vec<VolumeFlag>)> = Vec::new();

    for issue in &processed {
        let spec = &manifest.issues[issue.spec_index];
        run_stats.record_issue(spec, &issue.extraction.stats);
        all_rows.extend(issue.rows.iter().cloned());

        let slot_index = match volumes
            .iter()
            .position(|(doc, _)| doc.volume == spec.volume)
        {
            Some(i) => i,
            None => {
                volumes.push((
                    VolumeDoc {
                        volume: spec.volume.clone(),
                        months: Vec::new(),
                    },
                    Vec::new(),
                ));
                volumes.len() - 1
            }
        };
        let slot = &mut volumes[slot_index];
        slot.0.months.push(MonthDoc {
            month: spec.month.clone(),
            year: spec.year,
            source_file: spec.source_file.clone(),
            entries: issue.extraction.entries.clone(),
            toc: issue.extraction.toc_text.clone(),
            ads: issue.extraction.ads_text.clone(),
            misc: issue.extraction.misc_text.clone(),
        });
        slot.1.extend(issue.extraction.flags.iter().map(|flag| VolumeFlag {
            month: spec.month.clone(),
            flag: flag.clone(),
        }));
    }

    if !args.dry_run {
        for (doc, flags) in &volumes {
            writer.write_volume_json(doc).await?;
            writer.write_flagged_json(&doc.volume, flags).await?;
        }
        writer.write_manifest_csv(&all_rows)?;
        writer.write_run_stats(&args.stats_out, &run_stats).await?;
    }

    println!(
        "fencepost v{} - extraction complete",
        env!("CARGO_PKG_VERSION")
    );
    println!("Issues processed: {}", run_stats.issues_processed);
    if failed > 0 {
        println!("Issues failed: {failed}");
    }
    println!("Entries matched: {}", run_stats.entries_matched);
    println!("Flagged for review: {}", run_stats.entries_flagged);
    println!("Overall coverage: {:.1}%", run_stats.coverage_pct);

    info!(
        issues = run_stats.issues_processed,
        failed,
        matched = run_stats.entries_matched,
        "Run complete"
    );
    Ok(())
}

async fn process_issue(
    spec_index: usize,
    spec: &IssueSpec,
    path: &Path,
    stripper: &NoiseStripper,
    segmenter: &Segmenter,
    writer: &OutputWriter,
) -> Result<ProcessedIssue> {
    info!(issue = %spec.label(), path = %path.display(), "Processing issue");
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read issue text: {}", path.display()))?;

    let extraction = extract_issue(&spec.entries, &text, stripper, segmenter)?;

    for record in &extraction.entries {
        if record.index.is_none() {
            warn!(
                issue = %spec.label(),
                title = %record.title,
                "No match for title in body text"
            );
        }
    }

    let rows = writer.write_issue(spec, &extraction).await?;
    Ok(ProcessedIssue {
        spec_index,
        rows,
        extraction,
    })
}
