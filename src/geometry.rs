use byteorder::{LittleEndian, ReadBytesExt};
use std::fmt;
use std::io::Cursor;
use tracing::warn;

use crate::config::RecoveryConfig;
use crate::error::{RecoveryError, Result};
use crate::io::DiskReader;

/// The boot sector is always read with a provisional 512-byte size; the
/// real sector size is one of its fields.
pub const BOOT_SECTOR_SIZE: usize = 512;

pub const SUPPORTED_SECTOR_SIZES: [u32; 4] = [512, 1024, 2048, 4096];

const DEFAULT_SECTOR_SIZE: u32 = 512;
const DEFAULT_FAT_TYPE: FatType = FatType::Fat16;

// a 16-bit sectors_total of 0xffff is as untrustworthy as zero
const SECTORS_TOTAL_SENTINEL: u64 = 0xFFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatType {
    Fat12,
    Fat16,
    Fat32,
}

impl FatType {
    pub fn from_str_value(value: &str) -> Option<Self> {
        match value.trim() {
            "12" => Some(FatType::Fat12),
            "16" => Some(FatType::Fat16),
            "32" => Some(FatType::Fat32),
            _ => None,
        }
    }

    pub fn bits(&self) -> u8 {
        match self {
            FatType::Fat12 => 12,
            FatType::Fat16 => 16,
            FatType::Fat32 => 32,
        }
    }
}

impl fmt::Display for FatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fat{}", self.bits())
    }
}

/// Geometry recovered from the boot sector, possibly via fallbacks.
///
/// `sector_size` and `sectors_total` are always established before any
/// scanning begins; the string fields and `serial_number` are
/// diagnostics only.
#[derive(Debug, Clone)]
pub struct DeviceGeometry {
    pub sector_size: u32,
    pub sectors_total: u64,
    pub cluster_size: u8,
    pub fat_type: FatType,
    pub oem_name: String,
    pub volume_label: String,
    pub fs_type: String,
    pub serial_number: u32,
    pub signature_valid: bool,
}

impl DeviceGeometry {
    pub fn summary(&self) -> String {
        let mut out = format!(
            "{}: sector_size={}, sectors_total={}, sectors_per_cluster={}, oem_name='{}'",
            self.fat_type, self.sector_size, self.sectors_total, self.cluster_size, self.oem_name
        );
        if self.fat_type != FatType::Fat12 {
            out.push_str(&format!(
                "\nvolume_label='{}', fs_type='{}', serial_num=0x{:08x}",
                self.volume_label, self.fs_type, self.serial_number
            ));
        }
        out
    }
}

// Non-printable bytes become '#'; the field keeps its fixed length.
fn sanitize_ascii(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| if (0x20..0x80).contains(&b) { b as char } else { '#' })
        .collect()
}

/// Parses the boot sector into a `DeviceGeometry`, applying the layered
/// fallbacks for missing or implausible fields. Only I/O failures are
/// errors; every bad field has a recovery path.
pub fn resolve_geometry(reader: &mut DiskReader, config: &RecoveryConfig) -> Result<DeviceGeometry> {
    let mut boot = [0u8; BOOT_SECTOR_SIZE];
    reader.read_exact_at(0, &mut boot)?;

    let signature_valid = boot[510] == 0x55 && boot[511] == 0xAA;
    if !signature_valid {
        if !config.ignore_missing_signature {
            return Err(RecoveryError::MissingBootSignature);
        }
        warn!("FAT boot signature 55aa not found, continuing at your own risk");
    }

    let mut cursor = Cursor::new(&boot[..]);

    // bytes per sector at offset 11
    cursor.set_position(11);
    let raw_sector_size = u32::from(cursor.read_u16::<LittleEndian>()?);

    // sectors per cluster at offset 13
    let cluster_size = boot[13];

    // 16-bit total sector count at offset 19
    cursor.set_position(19);
    let mut sectors_total = u64::from(cursor.read_u16::<LittleEndian>()?);

    // OEM name at offsets 3..=10
    let oem_name = sanitize_ascii(&boot[3..=10]);

    let sector_size = if SUPPORTED_SECTOR_SIZES.contains(&raw_sector_size) {
        raw_sector_size
    } else {
        // the fallback must satisfy the same invariant as the field it replaces
        let fallback = config
            .fallback_sector_size
            .filter(|s| SUPPORTED_SECTOR_SIZES.contains(s))
            .unwrap_or(DEFAULT_SECTOR_SIZE);
        warn!(
            "invalid sector size {} in boot sector, using {} (override with FAT_SECTOR_SIZE)",
            raw_sector_size, fallback
        );
        fallback
    };

    // byte 38 marks a FAT12/16 extended boot record, byte 66 a FAT32 one
    let fat_type = if boot[38] == 0x29 || boot[38] == 0x28 {
        FatType::Fat16
    } else if boot[66] == 0x29 {
        FatType::Fat32
    } else {
        let fallback = config.fallback_fat_type.unwrap_or(DEFAULT_FAT_TYPE);
        warn!(
            "no extended boot record marker, assuming {} (override with FAT_TYPE)",
            fallback
        );
        fallback
    };

    // extended formats keep a 32-bit count at offset 32 when the 16-bit
    // field is zero
    if sectors_total == 0 && fat_type != FatType::Fat12 {
        cursor.set_position(32);
        sectors_total = u64::from(cursor.read_u32::<LittleEndian>()?);
    }

    let (serial_number, volume_label, fs_type) = match fat_type {
        FatType::Fat16 => {
            cursor.set_position(39);
            let serial = cursor.read_u32::<LittleEndian>()?;
            (
                serial,
                sanitize_ascii(&boot[43..=53]),
                sanitize_ascii(&boot[54..=61]),
            )
        }
        FatType::Fat32 => {
            cursor.set_position(67);
            let serial = cursor.read_u32::<LittleEndian>()?;
            (
                serial,
                sanitize_ascii(&boot[71..=81]),
                sanitize_ascii(&boot[82..=89]),
            )
        }
        FatType::Fat12 => (0, String::new(), String::new()),
    };

    if sectors_total == 0 || sectors_total == SECTORS_TOTAL_SENTINEL {
        let derived = reader.size() / u64::from(sector_size);
        warn!(
            "sectors_total={} appears invalid, derived {} from the device size \
             (override with FAT_SECTORS_TOTAL)",
            sectors_total, derived
        );
        sectors_total = derived;
    }

    if let Some(forced) = config.sectors_total_override {
        sectors_total = forced;
    }

    Ok(DeviceGeometry {
        sector_size,
        sectors_total,
        cluster_size,
        fat_type,
        oem_name,
        volume_label,
        fs_type,
        serial_number,
        signature_valid,
    })
}
