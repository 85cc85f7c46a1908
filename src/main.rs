use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vocab_nexus::{AlignmentConfig, AlignmentOrchestrator, Ingestor, InputFormat, ResultSink};

#[derive(Clone, Copy, ValueEnum)]
enum CandidateFormat {
    Csv,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum SinkFormat {
    Json,
    Csv,
}

#[derive(Parser)]
#[command(name = "vocab-nexus")]
#[command(about = "Decide equivalences between classes and properties of scored vocabularies")]
struct Args {
    /// Scored candidate pairs (CSV with header, or a JSON array)
    #[arg(short, long)]
    candidates: PathBuf,

    /// Candidate file format (default: from the file extension)
    #[arg(long, value_enum)]
    format: Option<CandidateFormat>,

    /// JSON configuration file (default: built-in values + NEXUS_* env vars)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output file for accepted equivalences (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format for accepted equivalences
    #[arg(long, value_enum, default_value = "json")]
    sink: SinkFormat,

    /// Override the slack tolerance
    #[arg(long)]
    slack: Option<f64>,

    /// Decide scopes on parallel worker tasks
    #[arg(long)]
    parallel: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AlignmentConfig::load(path)?.with_env_overrides()?,
        None => AlignmentConfig::from_env()?,
    };
    if let Some(slack) = args.slack {
        config.slack = slack;
    }
    config.parallel |= args.parallel;
    config.validate()?;

    info!("vocab-nexus starting (slack {}, parallel {})", config.slack, config.parallel);

    let format = args.format.map(|f| match f {
        CandidateFormat::Csv => InputFormat::Csv,
        CandidateFormat::Json => InputFormat::Json,
    });
    let ingest = Ingestor::new(&config).read_path(&args.candidates, format)?;

    let orchestrator = AlignmentOrchestrator::new(&config);
    let report = orchestrator.run(ingest.candidates, config.parallel).await?;
    info!("{}", report);

    let sink = ResultSink::new(&config);
    let mut writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    };
    match args.sink {
        SinkFormat::Json => sink.write_json(&report, &mut writer)?,
        SinkFormat::Csv => sink.write_csv(&report, &mut writer)?,
    }
    writer.flush()?;

    if let Some(path) = &args.output {
        info!(
            "Wrote {} equivalences to {} ({} input rows rejected)",
            report.accepted.len(),
            path.display(),
            ingest.rejected.len()
        );
    }

    Ok(())
}
