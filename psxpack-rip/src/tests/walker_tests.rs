use super::*;
use psxpack_core::dir_record::flags as rec_flags;
use psxpack_core::sector::{encode_mode2, strip_form2_edc};
use psxpack_core::volume::ROOT_DIR_SECTOR;
use psxpack_core::xa::{submode, SubHeader, XaEntry};
use psxpack_core::M2RAW_SECTOR_SIZE;
use std::io::Write as _;

// -- Test helpers: a tiny synthetic disc --
//
// Layout: 16 blank system sectors, blanks up to the PVD at 19, EVD,
// four path-table sectors, the root directory at 25, a Form 1 file at
// 26, a two-sector zero-EDC XA stream at 27, and a type-2 postgap
// marker as the final sector. A CDDA entry points out at sector 500.

const FORM1_EXTENT: u32 = 26;
const FORM2_EXTENT: u32 = 27;
const CDDA_EXTENT: u32 = 500;
const TOTAL_SECTORS: u32 = 30;

fn form1_payload() -> [u8; 2048] {
    let mut payload = [0u8; 2048];
    for (i, byte) in payload.iter_mut().enumerate() {
        *byte = (i * 11 % 256) as u8;
    }
    payload
}

fn record(name: &str, extent: u32, size: u32, rec_flags: u8, time: [u8; 7], xa: XaEntry) -> Vec<u8> {
    let rec = DirRecord {
        extent,
        size,
        time,
        flags: rec_flags,
        name: name.as_bytes().to_vec(),
        xa: Some(xa),
    };
    let mut buf = vec![0u8; rec.encoded_size()];
    rec.encode(&mut buf);
    buf
}

fn root_extent_block() -> [u8; BLOCK_SIZE] {
    let mut block = [0u8; BLOCK_SIZE];
    let mut pos = 0;
    let dir_time = [97, 1, 1, 0, 0, 0, 0];

    let mut put = |bytes: Vec<u8>, pos: &mut usize| {
        block[*pos..*pos + bytes.len()].copy_from_slice(&bytes);
        *pos += bytes.len();
    };

    put(
        record("\0", ROOT_DIR_SECTOR, 2048, rec_flags::DIRECTORY, dir_time, XaEntry::new(0, 0, 0x8D55, 0)),
        &mut pos,
    );
    put(
        record("\x01", ROOT_DIR_SECTOR, 2048, rec_flags::DIRECTORY, dir_time, XaEntry::new(0, 0, 0x8D55, 0)),
        &mut pos,
    );
    // A Y2K-damaged recording time: year byte 0.
    put(
        record("DATA.TXT;1", FORM1_EXTENT, 100, 0, [0, 3, 5, 12, 0, 0, 0], XaEntry::new(1117, 20, 0x0D55, 0)),
        &mut pos,
    );
    put(
        record("MOVIE.STR;1", FORM2_EXTENT, 4096, 0, dir_time, XaEntry::new(0, 0, 0x1555, 1)),
        &mut pos,
    );
    put(
        record("TUNE.DA;1", CDDA_EXTENT, 23520, 0, dir_time, XaEntry::new(0, 0, 0x4D55, 0)),
        &mut pos,
    );
    block
}

fn write_synthetic_disc(dir: &std::path::Path) -> std::path::PathBuf {
    let desc = psxpack_core::volume::VolumeDescriptor {
        system_id: "PLAYSTATION".to_string(),
        volume_id: "SYNTH".to_string(),
        publisher_id: "TEST".to_string(),
        creation_date: psxpack_core::dates::LongDate::parse("1997-01-01 00:00:00.00 0").unwrap(),
        volume_space_size: TOTAL_SECTORS + 150,
        path_table_size: 10,
        ..Default::default()
    };
    let root_record = DirRecord {
        extent: ROOT_DIR_SECTOR,
        size: 2048,
        time: [97, 1, 1, 0, 0, 0, 0],
        flags: rec_flags::DIRECTORY,
        name: vec![0x00],
        xa: None,
    };

    let path = dir.join("synth.bin");
    let mut file = std::fs::File::create(&path).unwrap();
    let mut raw = [0u8; RAW_SECTOR_SIZE];

    for _ in 0..19 {
        file.write_all(&[0u8; RAW_SECTOR_SIZE]).unwrap();
    }
    encode_mode2(
        &mut raw,
        &desc.encode_pvd(&root_record),
        19,
        SubHeader::data(submode::DATA | submode::EOR),
    );
    file.write_all(&raw).unwrap();
    encode_mode2(
        &mut raw,
        &psxpack_core::volume::encode_evd(),
        20,
        SubHeader::data(submode::DATA | submode::EOF | submode::EOR),
    );
    file.write_all(&raw).unwrap();

    let mut tables = psxpack_core::path_table::PathTables::new();
    tables.add(&[0x00], ROOT_DIR_SECTOR, 1).unwrap();
    for lsn in 21..25 {
        let table = if lsn < 23 { tables.l_table() } else { tables.m_table() };
        encode_mode2(
            &mut raw,
            table,
            lsn,
            SubHeader::data(submode::DATA | submode::EOF | submode::EOR),
        );
        file.write_all(&raw).unwrap();
    }

    encode_mode2(
        &mut raw,
        &root_extent_block(),
        25,
        SubHeader::data(submode::DATA | submode::EOF | submode::EOR),
    );
    file.write_all(&raw).unwrap();

    // The Form 1 file body.
    encode_mode2(
        &mut raw,
        &form1_payload(),
        FORM1_EXTENT,
        SubHeader::data(submode::DATA | submode::EOF | submode::EOR),
    );
    file.write_all(&raw).unwrap();

    // Two Form 2 sectors with stripped EDC.
    for i in 0..2u8 {
        let payload = [0x60 + i; 2324];
        let sub = SubHeader {
            file_number: 1,
            channel: 0,
            submode: submode::FORM2 | submode::AUDIO | submode::REAL_TIME,
            coding_info: 0x7F,
        };
        encode_mode2(&mut raw, &payload, FORM2_EXTENT + i as u32, sub);
        strip_form2_edc(&mut raw);
        file.write_all(&raw).unwrap();
    }

    // Final sector: a type-2 postgap marker.
    encode_mode2(&mut raw, &[], TOTAL_SECTORS - 1, SubHeader::data(submode::FORM2));
    strip_form2_edc(&mut raw);
    file.write_all(&raw).unwrap();

    path
}

#[test]
fn rips_the_synthetic_disc() {
    let dir = tempfile::tempdir().unwrap();
    let bin = write_synthetic_disc(dir.path());
    let mut image = DiscImage::open(&bin).unwrap();

    let base = dir.path().join("OUT");
    let summary = rip_image(&mut image, &base, &RipOptions::default()).unwrap();
    assert_eq!(summary.volume_id, "SYNTH");
    assert_eq!(summary.files, 3);
    assert_eq!(summary.directories, 1);

    // System area: 16 raw sectors, all blank here.
    let sys = fs::read(base.with_extension("sys")).unwrap();
    assert_eq!(sys.len(), 16 * RAW_SECTOR_SIZE);
    assert!(sys.iter().all(|&b| b == 0));

    // Form 1 extraction truncates to the recorded size.
    let data = fs::read(base.join("DATA.TXT")).unwrap();
    assert_eq!(data, form1_payload()[..100]);

    // Form 2 extraction keeps whole 2336-byte sectors.
    let movie = fs::read(base.join("MOVIE.STR")).unwrap();
    assert_eq!(movie.len(), 2 * M2RAW_SECTOR_SIZE);
    assert_eq!(movie[2], submode::FORM2 | submode::AUDIO | submode::REAL_TIME);
    assert_eq!(movie[8], 0x60);
    assert_eq!(&movie[M2RAW_SECTOR_SIZE - 4..M2RAW_SECTOR_SIZE], &[0, 0, 0, 0]);

    // CDDA placeholders are not extracted.
    assert!(!base.join("TUNE.DA").exists());
}

#[test]
fn catalog_reflects_the_synthetic_disc() {
    let dir = tempfile::tempdir().unwrap();
    let bin = write_synthetic_disc(dir.path());
    let mut image = DiscImage::open(&bin).unwrap();

    let base = dir.path().join("OUT");
    rip_image(&mut image, &base, &RipOptions::default()).unwrap();

    let text = fs::read_to_string(base.with_extension("cat")).unwrap();
    assert!(text.contains("volume_id [SYNTH]"));
    assert!(text.contains("creation_date 1997-01-01 00:00:00.00 0"));
    assert!(text.contains("track1_sector_count 30"));
    assert!(text.contains("track1_postgap_type 2"));
    assert!(text.contains("strict_rebuild 0"));

    // The Y2K-damaged file date is coerced to 2000 and flagged.
    assert!(text.contains("file DATA.TXT GID1117 UID20 ATR3413 DATE20000305120000"));
    assert!(text.contains("Y2KBUG1"));
    // The zero-EDC probe tripped on the XA stream.
    assert!(text.contains("xafile MOVIE.STR"));
    assert!(text.contains("ZEROEDC1"));
    // CDDA entries always record their LSN.
    assert!(text.contains("cddafile TUNE.DA @500"));

    // The emitted catalog parses straight back.
    let catalog = psxpack_catalog::parser::parse_catalog(&text, &base).unwrap();
    let root = catalog.tree.node(catalog.root);
    assert_eq!(root.children.len(), 3);
    assert_eq!(root.dir().attr_self, 0x8D55);
    let cdda = catalog
        .tree
        .node(*root.children.iter().last().unwrap());
    assert_eq!(cdda.requested_start_sector, CDDA_EXTENT);
    assert_eq!(cdda.file().node_size, 23520);
}

#[test]
fn fix_mode_drops_the_y2k_flag() {
    let dir = tempfile::tempdir().unwrap();
    let bin = write_synthetic_disc(dir.path());
    let mut image = DiscImage::open(&bin).unwrap();

    let base = dir.path().join("OUT");
    let options = RipOptions {
        fix_dates: true,
        ..RipOptions::default()
    };
    rip_image(&mut image, &base, &options).unwrap();

    let text = fs::read_to_string(base.with_extension("cat")).unwrap();
    assert!(text.contains("DATE20000305120000"));
    assert!(!text.contains("Y2KBUG1"));
}

#[test]
fn lbn_table_lists_every_entry() {
    let dir = tempfile::tempdir().unwrap();
    let bin = write_synthetic_disc(dir.path());
    let mut image = DiscImage::open(&bin).unwrap();

    let mut out = Vec::new();
    crate::lbn_table::print_lbn_table(&mut out, &mut image).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines[0], "     LBN   NumSec     Size T Path");
    assert_eq!(lines[1], "00000019 00000001 00000800 d ");
    assert_eq!(lines[2], "0000001a 00000001 00000064 f DATA.TXT");
    // XA stream: size projected to whole 2336-byte sectors.
    assert_eq!(lines[3], "0000001b 00000002 00001240 x MOVIE.STR");
    assert_eq!(lines[4], "000001f4 0000000c 00005be0 a TUNE.DA");
}
