use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use fatcarve::{
    carve_all, resolve_geometry, scan_for_images, CarvedFile, DiskReader, OwnershipMap,
    RecoveryConfig, RecoveryStats, SectorReader,
};

const DEFAULT_PREFIX: &str = "./carved_";
const MISSING_SIGNATURE_GRACE: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "fatcarve")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Recovers JPEG images from FAT media by contiguous sector carving")]
#[command(after_help = "\
The following environment variables help with a corrupt boot sector:
  FAT_NO_SIG=1               ignore a missing FAT signature
  FAT_SECTOR_SIZE=512        sector size to use when the boot sector's is invalid
  FAT_SECTORS_TOTAL=2000000  force the total number of sectors
  FAT_TYPE=32                fat type to assume when detection fails")]
struct Cli {
    /// Block device or disk image to scan
    device: PathBuf,

    /// Output path prefix for carved files
    #[arg(default_value = DEFAULT_PREFIX)]
    prefix: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = RecoveryConfig::from_env();

    run_recovery(&cli.device, &cli.prefix, &config)
}

fn run_recovery(device: &Path, prefix: &str, config: &RecoveryConfig) -> Result<()> {
    let mut reader =
        DiskReader::open(device).context(format!("Failed to open device: {:?}", device))?;

    let geometry = resolve_geometry(&mut reader, config)
        .context("Failed to resolve device geometry; make sure you specify the entire device")?;

    eprintln!("{}", geometry.summary());

    if !geometry.signature_valid {
        eprintln!(
            "{}",
            style(format!(
                "Waiting {}s for your review -- press CTRL-C to abort.",
                MISSING_SIGNATURE_GRACE.as_secs()
            ))
            .yellow()
        );
        thread::sleep(MISSING_SIGNATURE_GRACE);
    }

    let mut sectors = SectorReader::new(reader, geometry.sector_size);

    eprintln!("searching {:?} ...", device);

    let pb = ProgressBar::new(geometry.sectors_total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40.cyan/blue}] {pos}/{len} sectors {msg}")?
            .progress_chars("=>-"),
    );

    let scan_cb = |sector: u64, found: usize| {
        pb.set_position(sector);
        pb.set_message(format!("{} candidates", found));
    };

    let images = scan_for_images(&mut sectors, &geometry, Some(&scan_cb))?;

    pb.finish_with_message(format!(
        "{} candidates found",
        style(images.len()).green().bold()
    ));

    if images.is_empty() {
        eprintln!("\n[!] {}", style("No embedded images found.").yellow());
        return Ok(());
    }

    let stats = RecoveryStats::from_detected(&images);
    eprintln!();
    eprintln!("JPEG (plain): {}", stats.jpeg);
    eprintln!("JFIF:         {}", stats.jfif);
    eprintln!("Exif:         {}", stats.exif);
    eprintln!();

    let ownership = OwnershipMap::build(geometry.sectors_total, &images);

    eprintln!("writing to {}* ...", prefix);

    let carve_cb = |file: &CarvedFile, current: usize, total: usize| {
        eprintln!(
            "{} written. ({})",
            file.path.display(),
            format_size(file.bytes, BINARY)
        );
        eprintln!(" {}% done", current * 100 / total);
    };

    let carved = carve_all(&mut sectors, &ownership, &images, prefix, Some(&carve_cb))?;

    eprintln!();
    eprintln!(
        "{} {} images written.",
        style("Recovery complete!").green().bold(),
        carved.len()
    );

    Ok(())
}
