use std::fmt;
use tracing::debug;

use crate::error::Result;
use crate::geometry::DeviceGeometry;
use crate::io::SectorReader;

pub const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];

/// Sector cadence of the progress callback during the scan pass.
pub const PROGRESS_SECTOR_INTERVAL: u64 = 16;

/// Coarse subtype read from the marker bytes after SOI. Purely a
/// diagnostic annotation; it never gates detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Jfif,
    Exif,
}

impl ImageKind {
    fn classify(sector: &[u8]) -> Self {
        // an APP0/APP1 marker right after SOI carries an ASCII tag at bytes 6..=9
        if sector.len() >= 10 && sector[2] == 0xFF && (sector[3] & 0xFE) == 0xE0 {
            match &sector[6..10] {
                b"JFIF" => ImageKind::Jfif,
                b"Exif" => ImageKind::Exif,
                _ => ImageKind::Jpeg,
            }
        } else {
            ImageKind::Jpeg
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageKind::Jpeg => write!(f, "jpeg"),
            ImageKind::Jfif => write!(f, "JFIF"),
            ImageKind::Exif => write!(f, "Exif"),
        }
    }
}

/// One detected image. `id` equals its position in the scan output,
/// ascending by start sector since the scan is strictly sequential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectedImage {
    pub id: u32,
    pub kind: ImageKind,
    pub start_sector: u64,
}

/// Walks every sector after the boot sector looking for an embedded SOI
/// marker at the sector start. Detection only happens on sector
/// boundaries: the whole tool rests on the contiguous-layout assumption,
/// so a byte-granularity search would buy nothing.
///
/// The progress callback receives (current sector, candidates so far)
/// every `PROGRESS_SECTOR_INTERVAL` sectors.
pub fn scan_for_images(
    reader: &mut SectorReader,
    geometry: &DeviceGeometry,
    progress: Option<&dyn Fn(u64, usize)>,
) -> Result<Vec<DetectedImage>> {
    let mut images: Vec<DetectedImage> = Vec::new();
    let mut buf = vec![0u8; reader.sector_size() as usize];

    // sector 0 is the boot sector
    for sector in 1..geometry.sectors_total {
        reader.read_sector(sector, &mut buf)?;

        if buf[..2] == JPEG_SOI {
            let kind = ImageKind::classify(&buf);
            debug!(
                "ffd8 {} at 0x{:x} sector {}",
                kind,
                sector * u64::from(reader.sector_size()),
                sector
            );
            images.push(DetectedImage {
                id: images.len() as u32,
                kind,
                start_sector: sector,
            });
        }

        if sector % PROGRESS_SECTOR_INTERVAL == 0 {
            if let Some(cb) = progress {
                cb(sector, images.len());
            }
        }
    }

    if let Some(cb) = progress {
        cb(geometry.sectors_total.saturating_sub(1), images.len());
    }

    Ok(images)
}
