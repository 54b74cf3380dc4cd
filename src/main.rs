use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use binvar::{
    load_reference, write_fasta, AlleleSelection, Container, ContainerReader,
    ContainerWriterBuilder, Discipline, Restorer, VcfReader, LINE_WIDTH,
};

#[derive(Parser)]
#[command(name = "binvar")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Pack a reference genome and its variant calls into one binary container",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a FASTA reference and a VCF into a container
    Encode(EncodeArgs),
    /// Restore the edited sequence from a container as FASTA
    Decode(DecodeArgs),
    /// Print a summary of a container
    Inspect(InspectArgs),
}

/// Wire discipline for indel records
#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
enum CliDiscipline {
    /// 2-byte lengths, payload sized to the insertion
    Compact,
    /// 1-byte lengths, 16-byte insertion payloads
    Fixed,
}
impl From<CliDiscipline> for Discipline {
    fn from(value: CliDiscipline) -> Self {
        match value {
            CliDiscipline::Compact => Discipline::Compact,
            CliDiscipline::Fixed => Discipline::Fixed,
        }
    }
}

/// Which alternate alleles of a site to encode
#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
enum CliAlleles {
    /// Alleles named by the sample genotype
    Called,
    /// Every alternate allele
    All,
}
impl From<CliAlleles> for AlleleSelection {
    fn from(value: CliAlleles) -> Self {
        match value {
            CliAlleles::Called => AlleleSelection::Called,
            CliAlleles::All => AlleleSelection::All,
        }
    }
}

#[derive(Parser)]
struct EncodeArgs {
    /// Reference FASTA (first record is used; may be compressed)
    #[arg(short, long, value_name = "FILE", required = true)]
    reference: PathBuf,

    /// Variant calls in VCF (may be compressed)
    #[arg(short, long, value_name = "FILE", required = true)]
    variants: PathBuf,

    /// Output container
    #[arg(short, long, value_name = "FILE", required = true)]
    output: PathBuf,

    #[arg(short, long, value_enum, default_value = "compact")]
    discipline: CliDiscipline,

    #[arg(short, long, value_enum, default_value = "called")]
    alleles: CliAlleles,

    /// Omit the container header
    #[arg(long)]
    headless: bool,
}

/// Arguments locating the blocks of a container without a header
#[derive(Parser)]
struct LayoutArgs {
    /// Reference length of a headless container
    #[arg(short = 'L', long, value_name = "LEN")]
    reference_length: Option<usize>,

    /// Discipline of a headless container
    #[arg(short, long, value_enum, default_value = "compact")]
    discipline: CliDiscipline,
}
impl LayoutArgs {
    fn open(&self, input: &Path) -> Result<Container> {
        let container = match self.reference_length {
            Some(len) => {
                ContainerReader::from_path_headless(input, len, self.discipline.into())?.decode()?
            }
            None => ContainerReader::from_path(input)?.decode()?,
        };
        Ok(container)
    }
}

#[derive(Parser)]
struct DecodeArgs {
    /// Input container
    #[arg(short, long, value_name = "FILE", required = true)]
    input: PathBuf,

    /// Output FASTA
    #[arg(short, long, value_name = "FILE", required = true)]
    output: PathBuf,

    /// Record name of the restored sequence
    #[arg(short, long, default_value = "restored")]
    name: String,

    /// Symbols per FASTA line (0 = single line)
    #[arg(short, long, default_value_t = LINE_WIDTH)]
    width: usize,

    /// Check SNP reference symbols against the sequence
    #[arg(long)]
    verify: bool,

    #[command(flatten)]
    layout: LayoutArgs,
}

#[derive(Parser)]
struct InspectArgs {
    /// Input container
    #[arg(short, long, value_name = "FILE", required = true)]
    input: PathBuf,

    /// Number of records to list
    #[arg(short = 'n', long, default_value = "10")]
    head: usize,

    #[command(flatten)]
    layout: LayoutArgs,
}

fn encode(args: &EncodeArgs) -> Result<()> {
    let reference = load_reference(&args.reference)?;
    info!(
        "Loaded reference {} ({} symbols)",
        reference.name,
        reference.sequence.len()
    );

    let handle = File::create(&args.output).map(BufWriter::new)?;
    let mut writer = ContainerWriterBuilder::default()
        .discipline(args.discipline.into())
        .alleles(args.alleles.into())
        .headless(args.headless)
        .build(handle);
    writer.set_reference(&reference.sequence)?;

    let mut reader = VcfReader::from_path(&args.variants)?;
    while let Some(row) = reader.next_variant()? {
        writer.push_source(&row);
    }
    if reader.skipped() > 0 {
        warn!("Skipped {} malformed variant rows", reader.skipped());
    }

    let stats = writer.stats().clone();
    writer.finish()?;
    for (reason, count) in &stats.skipped {
        info!("Skipped {} alleles: {}", count, reason.describe());
    }
    if stats.truncated_insertions > 0 {
        warn!(
            "Truncated {} insertions to their maximum length",
            stats.truncated_insertions
        );
    }
    if args.headless {
        info!(
            "Headless container: decode with --reference-length {} --discipline {}",
            reference.sequence.len(),
            format!("{:?}", args.discipline).to_lowercase()
        );
    }
    Ok(())
}

fn decode(args: &DecodeArgs) -> Result<()> {
    let container = args.layout.open(&args.input)?;
    let restorer = Restorer::new().verify_reference(args.verify);
    let (sequence, report) = container.restore(&restorer);
    info!(
        "Applied {} records ({} skipped, {} clamped)",
        report.applied, report.skipped, report.clamped
    );
    if report.ref_mismatches > 0 {
        warn!("{} SNPs disagree with the reference", report.ref_mismatches);
    }

    let mut handle = File::create(&args.output).map(BufWriter::new)?;
    write_fasta(&mut handle, &args.name, &sequence, args.width)?;
    handle.flush()?;
    Ok(())
}

fn inspect(args: &InspectArgs) -> Result<()> {
    let container = args.layout.open(&args.input)?;
    let mut out = std::io::stdout().lock();
    writeln!(out, "{}", container.summary())?;
    for (variant, metadata) in container.entries().take(args.head) {
        let metadata = metadata.copied().unwrap_or_default();
        writeln!(
            out,
            "{:?}\t{}\taf={:.3}\tdp={}\tgt={:?}",
            variant.kind(),
            variant.pos(),
            metadata.frequency(),
            metadata.depth,
            metadata.genotype
        )?;
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Encode(args) => encode(&args)?,
        Commands::Decode(args) => decode(&args)?,
        Commands::Inspect(args) => inspect(&args)?,
    }

    Ok(())
}
