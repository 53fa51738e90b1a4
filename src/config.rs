use std::env;
use std::str::FromStr;

use crate::geometry::FatType;

/// Overrides for corrupt or implausible boot sectors.
///
/// Each variable is consulted exactly once, in `from_env()`; the
/// resolver never re-reads the environment.
#[derive(Debug, Clone, Default)]
pub struct RecoveryConfig {
    /// FAT_NO_SIG: continue without the 55aa boot signature.
    pub ignore_missing_signature: bool,
    /// FAT_SECTOR_SIZE: sector size to use when the boot sector's is invalid.
    pub fallback_sector_size: Option<u32>,
    /// FAT_SECTORS_TOTAL: forced total sector count.
    pub sectors_total_override: Option<u64>,
    /// FAT_TYPE: fat type to assume when neither marker byte matches.
    pub fallback_fat_type: Option<FatType>,
}

impl RecoveryConfig {
    pub fn from_env() -> Self {
        Self {
            ignore_missing_signature: env::var_os("FAT_NO_SIG").is_some(),
            fallback_sector_size: parse_var("FAT_SECTOR_SIZE"),
            sectors_total_override: parse_var("FAT_SECTORS_TOTAL"),
            fallback_fat_type: env::var("FAT_TYPE")
                .ok()
                .and_then(|v| FatType::from_str_value(&v)),
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
