use fatcarve::{
    carve_all, carve_image, DetectedImage, DiskReader, ImageKind, OwnershipMap, SectorReader,
};
use std::fs;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

const SECTOR_SIZE: u32 = 512;

fn image(id: u32, start_sector: u64) -> DetectedImage {
    DetectedImage {
        id,
        kind: ImageKind::Jpeg,
        start_sector,
    }
}

// Each sector filled with its own index, so byte identity pins down
// exactly which sectors were copied.
fn patterned_device(sectors: usize) -> (NamedTempFile, Vec<u8>) {
    let mut data = vec![0u8; sectors * SECTOR_SIZE as usize];
    for (i, chunk) in data.chunks_mut(SECTOR_SIZE as usize).enumerate() {
        chunk.fill(i as u8);
    }

    let mut temp = NamedTempFile::new().unwrap();
    temp.write_all(&data).unwrap();
    temp.flush().unwrap();
    (temp, data)
}

fn sector_reader(temp: &NamedTempFile) -> SectorReader {
    SectorReader::new(DiskReader::open(temp.path()).unwrap(), SECTOR_SIZE)
}

#[test]
fn test_ownership_marks_only_start_sectors() {
    let images = [image(0, 10), image(1, 50)];
    let map = OwnershipMap::build(100, &images);

    assert_eq!(map.len(), 100);
    assert_eq!(map.owned_count(), 2);
    assert_eq!(map.owner(10), Some(0));
    assert_eq!(map.owner(50), Some(1));
    assert_eq!(map.owner(0), None);
    assert_eq!(map.owner(11), None);
    assert_eq!(map.owner(49), None);
    assert_eq!(map.owner(99), None);
}

#[test]
fn test_ownership_empty_image_list() {
    let map = OwnershipMap::build(64, &[]);
    assert_eq!(map.owned_count(), 0);
    assert!((0..64).all(|s| map.owner(s).is_none()));
}

#[test]
fn test_carve_stops_at_next_image_start() {
    let (temp, data) = patterned_device(100);
    let images = [image(0, 10), image(1, 50)];
    let map = OwnershipMap::build(100, &images);
    let dir = TempDir::new().unwrap();
    let prefix = format!("{}/img_", dir.path().display());

    let mut reader = sector_reader(&temp);
    let carved = carve_image(&mut reader, &map, &images[0], &prefix).unwrap();

    assert_eq!(carved.sectors, 40);
    assert_eq!(carved.bytes, 40 * 512);

    let written = fs::read(&carved.path).unwrap();
    assert_eq!(written, &data[10 * 512..50 * 512]);
}

#[test]
fn test_last_image_extends_to_device_end() {
    let (temp, data) = patterned_device(100);
    let images = [image(0, 10), image(1, 50)];
    let map = OwnershipMap::build(100, &images);
    let dir = TempDir::new().unwrap();
    let prefix = format!("{}/img_", dir.path().display());

    let mut reader = sector_reader(&temp);
    let carved = carve_image(&mut reader, &map, &images[1], &prefix).unwrap();

    assert_eq!(carved.sectors, 50);
    let written = fs::read(&carved.path).unwrap();
    assert_eq!(written, &data[50 * 512..100 * 512]);
}

#[test]
fn test_single_image_spans_rest_of_device() {
    let (temp, data) = patterned_device(16);
    let images = [image(0, 1)];
    let map = OwnershipMap::build(16, &images);
    let dir = TempDir::new().unwrap();
    let prefix = format!("{}/img_", dir.path().display());

    let mut reader = sector_reader(&temp);
    let carved = carve_image(&mut reader, &map, &images[0], &prefix).unwrap();

    assert_eq!(carved.sectors, 15);
    assert_eq!(fs::read(&carved.path).unwrap(), &data[512..]);
}

#[test]
fn test_carve_all_names_files_by_sequence() {
    let (temp, _) = patterned_device(64);
    let images = [image(0, 2), image(1, 5), image(2, 9)];
    let map = OwnershipMap::build(64, &images);
    let dir = TempDir::new().unwrap();
    let prefix = format!("{}/carved_", dir.path().display());

    let mut reader = sector_reader(&temp);
    let carved = carve_all(&mut reader, &map, &images, &prefix, None).unwrap();

    assert_eq!(carved.len(), 3);
    assert!(carved[0].path.ends_with("carved_0000.jpg"));
    assert!(carved[1].path.ends_with("carved_0001.jpg"));
    assert!(carved[2].path.ends_with("carved_0002.jpg"));
    assert!(carved.iter().all(|f| f.path.exists()));
}

#[test]
fn test_carve_all_reports_progress() {
    let (temp, _) = patterned_device(32);
    let images = [image(0, 2), image(1, 5)];
    let map = OwnershipMap::build(32, &images);
    let dir = TempDir::new().unwrap();
    let prefix = format!("{}/carved_", dir.path().display());

    let seen = std::cell::RefCell::new(Vec::new());
    let cb = |file: &fatcarve::CarvedFile, current: usize, total: usize| {
        seen.borrow_mut().push((file.sectors, current, total));
    };

    let mut reader = sector_reader(&temp);
    carve_all(&mut reader, &map, &images, &prefix, Some(&cb)).unwrap();

    let seen = seen.into_inner();
    assert_eq!(seen, vec![(3, 1, 2), (27, 2, 2)]);
}

#[test]
fn test_adjacent_images_yield_one_sector_each() {
    let (temp, data) = patterned_device(8);
    let images = [image(0, 3), image(1, 4), image(2, 5)];
    let map = OwnershipMap::build(8, &images);
    let dir = TempDir::new().unwrap();
    let prefix = format!("{}/img_", dir.path().display());

    let mut reader = sector_reader(&temp);
    let carved = carve_all(&mut reader, &map, &images, &prefix, None).unwrap();

    assert_eq!(carved[0].sectors, 1);
    assert_eq!(carved[1].sectors, 1);
    assert_eq!(carved[2].sectors, 3);
    assert_eq!(fs::read(&carved[0].path).unwrap(), &data[3 * 512..4 * 512]);
}
