//! Shared input handling for the estimation commands: discover files,
//! decode them in batches, run one estimator call per batch and stream the
//! resulting records to the output.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, ValueEnum};
use i2v_core::{
    load_estimator, BoxedExtractor, Config, EstimateRecord, EstimateResult, Estimator,
    FileDiscovery, ImageDecoder, OutputFormat as CoreOutputFormat, OutputWriter,
};
use ndarray::ArrayD;
use serde::Serialize;

/// Output format for records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// A single JSON array
    Json,
    /// One JSON object per line
    Jsonl,
}

impl From<OutputFormat> for CoreOutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => CoreOutputFormat::Json,
            OutputFormat::Jsonl => CoreOutputFormat::JsonLines,
        }
    }
}

/// Arguments shared by every estimation command.
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Image file or directory to process
    #[arg(required = true)]
    pub input: PathBuf,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format (defaults to `output.format`)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Images per extractor call (defaults to `processing.batch_size`)
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Inference backend (defaults to `model.backend`)
    #[arg(long)]
    pub backend: Option<String>,
}

/// Run `estimate` over every image found at `args.input`.
///
/// A file that fails to decode is skipped. A batch whose estimation fails is
/// reported and skipped; remaining batches still run.
pub fn run<T, F>(args: &InputArgs, config: &Config, estimate: F) -> anyhow::Result<()>
where
    T: Serialize,
    F: Fn(&Estimator<BoxedExtractor>, &[ArrayD<f32>]) -> EstimateResult<Vec<T>>,
{
    let files = FileDiscovery::new(config.processing.clone()).discover(&args.input);
    if files.is_empty() {
        tracing::warn!("No supported image files found at {:?}", args.input);
        return Ok(());
    }
    tracing::info!("Found {} image(s) to process", files.len());

    let mut config = config.clone();
    if let Some(backend) = &args.backend {
        config.model.backend = backend.clone();
    }
    let estimator = load_estimator(&config)?;

    let format = match args.format {
        Some(format) => format.into(),
        None => CoreOutputFormat::parse(&config.output.format).unwrap_or(CoreOutputFormat::Json),
    };
    let batch_size = args
        .batch_size
        .unwrap_or(config.processing.batch_size)
        .max(1);
    let mut writer = OutputWriter::new(
        open_output(args.output.as_deref())?,
        format,
        config.output.pretty,
    );

    let decoder = ImageDecoder::new();
    let mut succeeded = 0usize;
    let mut failed = 0usize;
    let start_time = Instant::now();

    for chunk in files.chunks(batch_size) {
        let mut sources = Vec::with_capacity(chunk.len());
        let mut pixels = Vec::with_capacity(chunk.len());
        for file in chunk {
            match decoder.decode(&file.path) {
                Ok(decoded) => {
                    sources.push((decoded.path, decoded.content_hash));
                    pixels.push(decoded.pixels);
                }
                Err(e) => {
                    failed += 1;
                    tracing::error!("Failed: {:?} - {}", file.path, e);
                }
            }
        }
        if pixels.is_empty() {
            continue;
        }

        let batch_len = sources.len();
        match estimate(&estimator, &pixels) {
            Ok(results) => match pair_results(sources, results) {
                Some(records) => {
                    for record in records {
                        writer.write(&record)?;
                        succeeded += 1;
                    }
                }
                None => {
                    failed += batch_len;
                    tracing::error!(
                        "Batch of {} image(s) returned a different number of results",
                        batch_len
                    );
                }
            },
            Err(e) => {
                failed += batch_len;
                tracing::error!("Batch of {} image(s) failed: {}", batch_len, e);
            }
        }
    }

    writer.finish()?;
    tracing::info!(
        "Processed {} image(s), {} failed in {:.1}s",
        succeeded,
        failed,
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}

/// Attach each result to its source file. `None` when the counts differ.
fn pair_results<T>(
    sources: Vec<(PathBuf, String)>,
    results: Vec<T>,
) -> Option<Vec<EstimateRecord<T>>> {
    if sources.len() != results.len() {
        return None;
    }
    Some(
        sources
            .into_iter()
            .zip(results)
            .map(|((file_path, content_hash), result)| EstimateRecord {
                file_path,
                content_hash,
                result,
            })
            .collect(),
    )
}

fn open_output(path: Option<&Path>) -> io::Result<Box<dyn Write>> {
    match path {
        Some(path) => Ok(Box::new(BufWriter::new(File::create(path)?))),
        None => Ok(Box::new(io::stdout().lock())),
    }
}
