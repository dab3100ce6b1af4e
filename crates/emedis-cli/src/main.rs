//! eMedis command-line front end.
//! Extracts findings, scores cases and manages the reference store.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use emedis_core::{
    Analyzer, CaseInput, Database, EngineConfig, KnowledgeBase, LabResult, MatcherKind,
    ReferenceSource, ReferenceTables, Sex,
};

#[derive(Parser, Debug)]
#[command(name = "emedis", about = "Clinical finding extraction and differential scoring", version)]
struct Cli {
    /// TOML config file (defaults to $EMEDIS_CONFIG, then ./emedis.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the canonical findings found in a text
    Extract {
        #[arg(long)]
        text: String,
        #[arg(long)]
        matcher: Option<MatcherKind>,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Rank a differential for one case
    Analyze {
        /// Free-text symptoms and findings
        #[arg(long)]
        findings: String,
        /// Chief complaint; recorded in the report, not scanned for findings
        #[arg(long, default_value = "")]
        complaint: String,
        /// Age in years (0-120)
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=120))]
        age: Option<u8>,
        #[arg(long, default_value = "other")]
        sex: Sex,
        /// Lab result as NAME=VALUE[:UNIT[:FLAG]]; repeatable
        #[arg(long = "lab", value_name = "SPEC", value_parser = parse_lab)]
        labs: Vec<LabResult>,
        #[arg(long)]
        top_k: Option<usize>,
        #[arg(long)]
        matcher: Option<MatcherKind>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Load the CSV tables and write them to a SQLite reference store
    Import {
        #[arg(long, value_name = "DIR")]
        data_dir: PathBuf,
        #[arg(long, value_name = "FILE")]
        db: PathBuf,
    },
    /// Show table sizes, defects and fingerprint of the reference data
    Inspect {
        /// List every defect
        #[arg(long)]
        defects: bool,
        #[command(flatten)]
        source: SourceArgs,
    },
}

/// Overrides for where the reference tables come from.
#[derive(Args, Debug, Default)]
struct SourceArgs {
    /// Directory holding the CSV tables
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,
    /// SQLite reference store
    #[arg(long, value_name = "FILE", conflicts_with = "data_dir")]
    db: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
    Csv,
}

fn parse_lab(spec: &str) -> Result<LabResult, String> {
    LabResult::parse_spec(spec)
        .ok_or_else(|| format!("expected NAME=VALUE[:UNIT[:FLAG]], got '{}'", spec))
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_path(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => EngineConfig::load().context("Failed to load configuration"),
    }
}

fn apply_source(config: &mut EngineConfig, source: SourceArgs) {
    if let Some(dir) = source.data_dir {
        config.data_dir = dir;
        config.database = None;
    }
    if let Some(db) = source.db {
        config.database = Some(db);
    }
}

fn open_knowledge_base(config: &EngineConfig) -> Result<KnowledgeBase> {
    let source = ReferenceSource::from_config(config);
    let tables = source
        .load()
        .with_context(|| format!("Cannot load reference data from {:?}", source))?;
    Ok(KnowledgeBase::new(tables))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("emedis=info,emedis_core=info,warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Extract {
            text,
            matcher,
            source,
        } => {
            apply_source(&mut config, source);
            if let Some(matcher) = matcher {
                config.matcher = matcher;
            }
            let kb = open_knowledge_base(&config)?;
            let extraction = Analyzer::with_config(&kb, &config).extract(&text);
            for finding in extraction.findings.iter() {
                println!("{}", finding);
            }
        }
        Command::Analyze {
            findings,
            complaint,
            age,
            sex,
            labs,
            top_k,
            matcher,
            format,
            source,
        } => {
            apply_source(&mut config, source);
            if let Some(top_k) = top_k {
                config.top_k = top_k;
            }
            if let Some(matcher) = matcher {
                config.matcher = matcher;
            }
            config.validate()?;

            let kb = open_knowledge_base(&config)?;
            let case = CaseInput {
                age,
                sex,
                chief_complaint: complaint,
                findings_text: findings,
                labs,
            };
            let report = Analyzer::with_config(&kb, &config).analyze(&case);

            match format {
                OutputFormat::Text => print!("{}", report.to_text()),
                OutputFormat::Json => println!("{}", report.to_json()?),
                OutputFormat::Csv => match report.differential() {
                    Some(differential) => print!("{}", differential.to_csv()),
                    None => print!("{}", emedis_core::Differential::default().to_csv()),
                },
            }
        }
        Command::Import { data_dir, db } => {
            let tables = ReferenceTables::load(&data_dir, &config.tables)
                .with_context(|| format!("Cannot load CSV tables from {}", data_dir.display()))?;
            let stats = KnowledgeBase::new(tables.clone()).stats();

            let mut database = Database::open(&db)
                .with_context(|| format!("Cannot open reference store {}", db.display()))?;
            let fingerprint = database.replace_reference_tables(&tables)?;

            info!(db = %db.display(), fingerprint = %fingerprint, "Import complete");
            println!(
                "Imported {} dictionary, {} evidence, {} test and {} citation rows into {}",
                stats.dictionary_rows,
                stats.evidence_rows,
                stats.test_rows,
                stats.citation_rows,
                db.display()
            );
            if stats.defects > 0 {
                println!("{} malformed rows kept (run `emedis inspect --defects`)", stats.defects);
            }
            println!("Fingerprint: {}", fingerprint);
        }
        Command::Inspect { defects, source } => {
            apply_source(&mut config, source);
            let kb = open_knowledge_base(&config)?;
            let stats = kb.stats();

            println!("Finding dictionary: {} rows", stats.dictionary_rows);
            println!(
                "Disease evidence:   {} rows, {} diseases",
                stats.evidence_rows, stats.diseases
            );
            println!("Test suggestions:   {} rows", stats.test_rows);
            println!("Citations:          {} rows", stats.citation_rows);
            println!("Defects:            {}", stats.defects);
            println!("Fingerprint:        {}", stats.fingerprint);
            println!("Loaded at:          {}", stats.loaded_at);

            if defects {
                for defect in kb.defects() {
                    println!("  - {}", defect);
                }
            }
        }
    }

    Ok(())
}
