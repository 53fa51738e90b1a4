use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::io::SectorReader;
use crate::scan::{DetectedImage, ImageKind};

/// Per-sector owner table. Only the start sector of each image is
/// assigned; interior sectors stay unowned. Start sectors are unique and
/// ordered, so the first sector a forward scan finds with a different id
/// is necessarily the next image's start. Interior marking would add
/// nothing.
pub struct OwnershipMap {
    owners: Vec<Option<u32>>,
}

impl OwnershipMap {
    pub fn build(sectors_total: u64, images: &[DetectedImage]) -> Self {
        let mut owners = vec![None; sectors_total as usize];
        for image in images {
            owners[image.start_sector as usize] = Some(image.id);
        }
        Self { owners }
    }

    #[inline]
    pub fn owner(&self, sector: u64) -> Option<u32> {
        self.owners.get(sector as usize).copied().flatten()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    pub fn owned_count(&self) -> usize {
        self.owners.iter().filter(|o| o.is_some()).count()
    }
}

/// Record of one written output file.
#[derive(Debug, Clone)]
pub struct CarvedFile {
    pub path: PathBuf,
    pub sectors: u64,
    pub bytes: u64,
}

pub fn output_filename(prefix: &str, id: u32) -> String {
    format!("{}{:04}.jpg", prefix, id)
}

/// Writes one image: every sector from its start until a sector owned by
/// a different image (or the device end) is reached. The last image runs
/// all the way out; trailing garbage is accepted and end markers are not
/// consulted.
pub fn carve_image(
    reader: &mut SectorReader,
    ownership: &OwnershipMap,
    image: &DetectedImage,
    prefix: &str,
) -> Result<CarvedFile> {
    let path = PathBuf::from(output_filename(prefix, image.id));
    let mut out = File::create(&path)?;

    let sector_size = reader.sector_size() as usize;
    let mut buf = vec![0u8; sector_size];

    let sectors_total = ownership.len() as u64;
    let mut sector = image.start_sector;
    let mut written = 0u64;

    while sector < sectors_total {
        match ownership.owner(sector) {
            Some(id) if id != image.id => break,
            _ => {}
        }
        reader.read_sector(sector, &mut buf)?;
        out.write_all(&buf)?;
        sector += 1;
        written += 1;
    }

    out.sync_all()?;

    Ok(CarvedFile {
        path,
        sectors: written,
        bytes: written * sector_size as u64,
    })
}

/// Carves every detected image in ascending id order. Any write failure
/// propagates immediately: no partial-output recovery, no skipping to
/// the next image.
pub fn carve_all(
    reader: &mut SectorReader,
    ownership: &OwnershipMap,
    images: &[DetectedImage],
    prefix: &str,
    progress: Option<&dyn Fn(&CarvedFile, usize, usize)>,
) -> Result<Vec<CarvedFile>> {
    if let Some(parent) = Path::new(prefix).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut carved = Vec::with_capacity(images.len());

    for (i, image) in images.iter().enumerate() {
        let file = carve_image(reader, ownership, image, prefix)?;
        if let Some(cb) = progress {
            cb(&file, i + 1, images.len());
        }
        carved.push(file);
    }

    Ok(carved)
}

#[derive(Debug, Default)]
pub struct RecoveryStats {
    pub jpeg: usize,
    pub jfif: usize,
    pub exif: usize,
}

impl RecoveryStats {
    pub fn from_detected(images: &[DetectedImage]) -> Self {
        let mut stats = Self::default();

        for image in images {
            match image.kind {
                ImageKind::Jpeg => stats.jpeg += 1,
                ImageKind::Jfif => stats.jfif += 1,
                ImageKind::Exif => stats.exif += 1,
            }
        }
        stats
    }

    pub fn total(&self) -> usize {
        self.jpeg + self.jfif + self.exif
    }
}
