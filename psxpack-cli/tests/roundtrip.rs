//! End-to-end scenarios: building images from catalogs, ripping them
//! back, and rebuilding byte-identical discs.

use std::fs;
use std::path::{Path, PathBuf};

use psxpack_build::build_image;
use psxpack_catalog::parser::parse_catalog;
use psxpack_core::volume::VolumeDescriptor;
use psxpack_core::{BLOCK_SIZE, RAW_SECTOR_SIZE};
use psxpack_image::{wav, DiscImage};
use psxpack_rip::{rip_image, RipOptions};

// -- Helpers --

fn sector(bin: &[u8], lsn: u32) -> &[u8] {
    let start = lsn as usize * RAW_SECTOR_SIZE;
    &bin[start..start + RAW_SECTOR_SIZE]
}

fn payload(bin: &[u8], lsn: u32) -> &[u8] {
    &sector(bin, lsn)[24..24 + BLOCK_SIZE]
}

fn build_from_catalog(dir: &Path, name: &str, catalog_text: &str, cue: bool) -> PathBuf {
    let fs_base = dir.join(name);
    fs::create_dir_all(&fs_base).unwrap();
    let mut catalog = parse_catalog(catalog_text, &fs_base).unwrap();
    let bin_path = dir.join(format!("{}.bin", name));
    build_image(&mut catalog, &fs_base, &bin_path, cue).unwrap();
    bin_path
}

fn volume_header(creation: &str) -> String {
    format!(
        r#"volume {{
  system_id [PLAYSTATION]
  volume_id [ROUNDTRIP]
  volume_set_id []
  publisher_id [TEST]
  preparer_id []
  application_id [PLAYSTATION]
  copyright_file_id []
  abstract_file_id []
  bibliographic_file_id []
  creation_date {creation}
  modification_date 0000-00-00 00:00:00.00 0
  expiration_date 0000-00-00 00:00:00.00 0
  effective_date 0000-00-00 00:00:00.00 0
"#
    )
}

// -- Scenario A: empty volume --

#[test]
fn empty_volume_layout() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = format!(
        "{}  track1_sector_count 0\n  track1_postgap_type 1\n  audio_sectors 0\n  strict_rebuild 0\n}}\n\ndir ATRS36181 ATRP36181 DATES19970101000000 DATEP19970101000000 {{\n}}\n",
        volume_header("1997-01-01 00:00:00.00 0")
    );
    let bin_path = build_from_catalog(dir.path(), "EMPTY", &catalog, false);
    let bin = fs::read(&bin_path).unwrap();

    // 25 fixed sectors + 1 root directory sector + 150 postgap.
    assert_eq!(bin.len(), 176 * RAW_SECTOR_SIZE);

    let (desc, root) = VolumeDescriptor::parse_pvd(payload(&bin, 19)).unwrap();
    assert_eq!(desc.volume_space_size, 176);
    assert_eq!(desc.volume_id, "ROUNDTRIP");
    assert_eq!(desc.path_table_size, 10);
    assert_eq!(root.extent, 25);
    assert_eq!(root.size, 2048);

    // Path table: one record (NUL name, extent 25, parent 1), L then M.
    assert_eq!(&payload(&bin, 21)[..10], &[1, 0, 25, 0, 0, 0, 1, 0, 0, 0]);
    assert_eq!(&payload(&bin, 23)[..10], &[1, 0, 0, 0, 0, 25, 0, 1, 0, 0]);

    // Root extent carries "." and ".." records.
    let root_extent = payload(&bin, 25);
    assert_eq!(root_extent[0], 48);
    assert_eq!(root_extent[33], 0x00);
    assert_eq!(root_extent[48 + 33], 0x01);

    // Postgap type 1: fully blank sector bodies.
    for lsn in 26..176 {
        assert!(sector(&bin, lsn)[16..].iter().all(|&b| b == 0));
    }
}

// -- Scenario B: single Form 1 file with an LSN collision --

#[test]
fn single_file_collides_and_moves_to_26() {
    let dir = tempfile::tempdir().unwrap();
    let fs_base = dir.path().join("DISC");
    fs::create_dir_all(&fs_base).unwrap();
    let content: Vec<u8> = (0..2000u32).map(|i| (i % 251) as u8).collect();
    fs::write(fs_base.join("FOO"), &content).unwrap();

    let catalog = format!(
        "{}  track1_sector_count 0\n  track1_postgap_type 1\n  audio_sectors 0\n  strict_rebuild 1\n}}\n\ndir @25 ATRS36181 ATRP36181 DATES19970101000000 DATEP19970101000000 {{\n  file FOO @25 GID0 UID0 ATR3413 DATE19970101000000 TIMEZONE0 SIZE2000 HIDDEN0 Y2KBUG0\n}}\n",
        volume_header("1997-01-01 00:00:00.00 0")
    );
    let mut catalog = parse_catalog(&catalog, &fs_base).unwrap();
    let bin_path = dir.path().join("DISC.bin");
    build_image(&mut catalog, &fs_base, &bin_path, false).unwrap();
    let bin = fs::read(&bin_path).unwrap();

    // The file wanted sector 25 but the root directory sits there; it is
    // pushed to 26 and its payload is the file followed by zero fill.
    let data = payload(&bin, 26);
    assert_eq!(&data[..2000], &content[..]);
    assert!(data[2000..].iter().all(|&b| b == 0));

    // The directory record for FOO;1 points at 26 with size 2000.
    let root_extent = payload(&bin, 25);
    let rec_start = 96; // after "." and ".."
    let rec = &root_extent[rec_start..];
    assert_eq!(
        u32::from_le_bytes(rec[2..6].try_into().unwrap()),
        26,
        "extent"
    );
    assert_eq!(
        u32::from_le_bytes(rec[10..14].try_into().unwrap()),
        2000,
        "size"
    );
    // Identifier "FOO;1" and XA attribute word 0x0D55.
    assert_eq!(&rec[33..38], b"FOO;1");
    let rec_len = rec[0] as usize;
    assert_eq!(&rec[rec_len - 8..rec_len - 6], b"XA");
    assert_eq!(&rec[rec_len - 10..rec_len - 8], &[0x0D, 0x55]);
}

// -- Scenario C: Form 2 XA file with stripped EDC --

#[test]
fn xa_file_sectors_have_zeroed_edc() {
    let dir = tempfile::tempdir().unwrap();
    let fs_base = dir.path().join("DISC");
    fs::create_dir_all(&fs_base).unwrap();

    // Three 2336-byte chunks, each with an XA audio subheader up front.
    let mut content = Vec::new();
    for i in 0..3u8 {
        let mut chunk = vec![0u8; 2336];
        chunk[0] = 1; // file number
        chunk[1] = 0; // channel
        chunk[2] = 0x20 | 0x04 | 0x40; // Form2 | Audio | RealTime
        chunk[3] = 0x7F;
        let subheader = chunk[..4].to_vec();
        chunk[4..8].copy_from_slice(&subheader);
        chunk[8..].fill(0x30 + i);
        content.extend_from_slice(&chunk);
    }
    fs::write(fs_base.join("VIDEO.STR"), &content).unwrap();

    let catalog = format!(
        "{}  track1_sector_count 0\n  track1_postgap_type 1\n  audio_sectors 0\n  strict_rebuild 0\n}}\n\ndir @25 ATRS36181 ATRP36181 DATES19970101000000 DATEP19970101000000 {{\n  xafile VIDEO.STR @30 GID0 UID0 ATR5461 DATE19970101000000 TIMEZONE0 SIZE6144 HIDDEN0 Y2KBUG0 ZEROEDC1\n}}\n",
        volume_header("1997-01-01 00:00:00.00 0")
    );
    let mut catalog = parse_catalog(&catalog, &fs_base).unwrap();
    let bin_path = dir.path().join("DISC.bin");
    build_image(&mut catalog, &fs_base, &bin_path, false).unwrap();
    let bin = fs::read(&bin_path).unwrap();

    for lsn in 30..33 {
        let raw = sector(&bin, lsn);
        assert_eq!(raw[18] & 0x20, 0x20);
        assert_eq!(&raw[24..28], &[0x30 + (lsn - 30) as u8; 4][..]);
        // ZEROEDC: the trailing EDC bytes are forced to zero.
        assert_eq!(&raw[2348..], &[0, 0, 0, 0]);
    }

    // Sectors 26..29 are empty Form 2 gap fill.
    for lsn in 26..30 {
        let raw = sector(&bin, lsn);
        assert_eq!(raw[18], 0x20);
        assert!(raw[24..2348].iter().all(|&b| b == 0));
    }
}

// -- Scenario D: CDDA extent rebasing --

#[test]
fn cdda_entry_shifts_with_the_track_offset() {
    let dir = tempfile::tempdir().unwrap();
    let fs_base = dir.path().join("DISC");
    fs::create_dir_all(&fs_base).unwrap();

    // Rebuilt data track: 25 + 1 = 26 sectors + 150 postgap = 176.
    // Original length claimed 160, so the offset is 176 - 160 = 16.
    let catalog = format!(
        "{}  track1_sector_count 160\n  track1_postgap_type 1\n  audio_sectors 0\n  strict_rebuild 0\n}}\n\ndir @25 ATRS36181 ATRP36181 DATES19970101000000 DATEP19970101000000 {{\n  cddafile AUDIO.DA @200 GID0 UID0 ATR19797 DATE19970101000000 TIMEZONE0 SIZE23520 HIDDEN0 Y2KBUG0\n}}\n",
        volume_header("1997-01-01 00:00:00.00 0")
    );
    let mut catalog = parse_catalog(&catalog, &fs_base).unwrap();
    let bin_path = dir.path().join("DISC.bin");
    build_image(&mut catalog, &fs_base, &bin_path, false).unwrap();
    let bin = fs::read(&bin_path).unwrap();

    let root_extent = payload(&bin, 25);
    let rec = &root_extent[96..];
    assert_eq!(&rec[33..43], b"AUDIO.DA;1");
    assert_eq!(u32::from_le_bytes(rec[2..6].try_into().unwrap()), 200 + 16);
    assert_eq!(u32::from_le_bytes(rec[10..14].try_into().unwrap()), 23520);
}

// -- Scenario E: Y2K volume date preservation --

#[test]
fn zero_year_volume_date_is_preserved() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = format!(
        "{}  track1_sector_count 0\n  track1_postgap_type 1\n  audio_sectors 0\n  strict_rebuild 0\n}}\n\ndir ATRS36181 ATRP36181 DATES20000101000000 DATEP20000101000000 Y2KBUG11 {{\n}}\n",
        volume_header("0000-10-25 14:30:00.00 0")
    );
    let bin_path = build_from_catalog(dir.path(), "Y2K", &catalog, false);
    let bin = fs::read(&bin_path).unwrap();

    let pvd = payload(&bin, 19);
    // Creation date bytes stay "0000...".
    assert_eq!(&pvd[813..817], b"0000");
    assert_eq!(&pvd[817..821], b"1025");
    // The embedded root record's year byte carries the 0 - 100 anomaly.
    assert_eq!(pvd[156 + 18], 0x9C);

    // The root "." record reproduces the flagged year-2000 anomaly:
    // tm_year 100 minus 100 is zero.
    let root_extent = payload(&bin, 25);
    assert_eq!(root_extent[18], 0);
}

// -- Round-trip law 1: data-only build -> rip -> build is byte-identical --

#[test]
fn data_only_round_trip_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let fs_base = dir.path().join("GAME");
    fs::create_dir_all(fs_base.join("SUB")).unwrap();

    let exe: Vec<u8> = (0..5000u32).map(|i| (i * 7 % 256) as u8).collect();
    fs::write(fs_base.join("SLUS_012.34"), &exe).unwrap();
    let inner: Vec<u8> = (0..100u32).map(|i| (i * 13 % 256) as u8).collect();
    fs::write(fs_base.join("SUB").join("INNER.TXT"), &inner).unwrap();

    // One file carries the Y2K mastering anomaly.
    let catalog = format!(
        "{}  track1_sector_count 0\n  track1_postgap_type 2\n  audio_sectors 0\n  strict_rebuild 0\n}}\n\n\
dir @25 GID0 UID0 ATRS36181 ATRP36181 DATES19970601093000 DATEP19970601093000 TIMEZONES36 TIMEZONEP36 HIDDEN0 Y2KBUG0 {{\n\
  file SLUS_012.34 @26 GID1117 UID20 ATR3413 DATE20000101120000 TIMEZONE0 SIZE5000 HIDDEN0 Y2KBUG1\n\
  dir SUB @29 GID0 UID0 ATRS36181 ATRP36181 DATES19970601093000 DATEP19970601093000 TIMEZONES36 TIMEZONEP36 HIDDEN0 Y2KBUG0 {{\n\
    file INNER.TXT @30 GID0 UID0 ATR3413 DATE19970601093000 TIMEZONE36 SIZE100 HIDDEN1 Y2KBUG0\n\
  }}\n\
}}\n",
        volume_header("1997-06-01 09:30:00.00 36")
    );
    let mut catalog = parse_catalog(&catalog, &fs_base).unwrap();
    let bin1_path = dir.path().join("GAME.bin");
    build_image(&mut catalog, &fs_base, &bin1_path, false).unwrap();

    // Rip the built image with strict LSN preservation.
    let rip_dir = dir.path().join("ripped");
    fs::create_dir_all(&rip_dir).unwrap();
    let rip_base = rip_dir.join("GAME");
    let mut image = DiscImage::open(&bin1_path).unwrap();
    let options = RipOptions {
        fix_dates: false,
        write_lbns: true,
        strict: true,
    };
    rip_image(&mut image, &rip_base, &options).unwrap();

    // The extracted files match the originals.
    assert_eq!(fs::read(rip_base.join("SLUS_012.34")).unwrap(), exe);
    assert_eq!(fs::read(rip_base.join("SUB").join("INNER.TXT")).unwrap(), inner);

    // Rebuild from the ripped catalog and compare byte-for-byte.
    let cat2 = fs::read_to_string(rip_base.with_extension("cat")).unwrap();
    let mut catalog2 = parse_catalog(&cat2, &rip_base).unwrap();
    assert!(catalog2.strict_rebuild);
    let bin2_path = dir.path().join("GAME2.bin");
    build_image(&mut catalog2, &rip_base, &bin2_path, false).unwrap();

    let bin1 = fs::read(&bin1_path).unwrap();
    let bin2 = fs::read(&bin2_path).unwrap();
    assert_eq!(bin1.len(), bin2.len());
    for lsn in 0..(bin1.len() / RAW_SECTOR_SIZE) as u32 {
        assert_eq!(
            sector(&bin1, lsn),
            sector(&bin2, lsn),
            "sector {} differs",
            lsn
        );
    }
}

// -- Round-trip law 4 + mixed mode: audio tracks and CDDA pointers --

#[test]
fn mixed_mode_round_trip_with_audio() {
    let dir = tempfile::tempdir().unwrap();
    let fs_base = dir.path().join("MIX");
    let extra = fs_base.join("_PSXRIP");
    fs::create_dir_all(&extra).unwrap();

    let data: Vec<u8> = (0..4096u32).map(|i| (i * 31 % 256) as u8).collect();
    fs::write(fs_base.join("DATA.BIN"), &data).unwrap();

    // Audio: a silent 150-sector pregap and 10 patterned sectors.
    write_wav(&extra.join("Pregap_02.wav"), &vec![0u8; 150 * RAW_SECTOR_SIZE]);
    let audio: Vec<u8> = (0..10 * RAW_SECTOR_SIZE as u32)
        .map(|i| (i * 3 % 256) as u8)
        .collect();
    write_wav(&extra.join("Track_02.wav"), &audio);

    // Layout: root @25 (1 sector), DATA.BIN @26..27, data end 28, track 1
    // is 178 sectors with its postgap; track 2 pregap at 178, audio at 328.
    let track_listing = psxpack_catalog::model::encode_track_listing(&[
        psxpack_catalog::TrackEntry {
            number: 1,
            mode: "MODE2/2352".to_string(),
            start_lsn: 0,
            pregap: 0,
            data_lsn: 0,
            end_lsn: 178,
            total_sectors: 178,
        },
        psxpack_catalog::TrackEntry {
            number: 2,
            mode: "AUDIO".to_string(),
            start_lsn: 178,
            pregap: 150,
            data_lsn: 328,
            end_lsn: 338,
            total_sectors: 160,
        },
    ]);

    let catalog = format!(
        "{}  track_listing [{}]\n  track1_sector_count 178\n  track1_postgap_type 1\n  audio_sectors 160\n  strict_rebuild 1\n}}\n\n\
dir @25 GID0 UID0 ATRS36181 ATRP36181 DATES19970101000000 DATEP19970101000000 TIMEZONES0 TIMEZONEP0 HIDDEN0 Y2KBUG0 {{\n\
  file DATA.BIN @26 GID0 UID0 ATR3413 DATE19970101000000 TIMEZONE0 SIZE4096 HIDDEN0 Y2KBUG0\n\
  cddafile AUDIO.DA @328 GID0 UID0 ATR19797 DATE19970101000000 TIMEZONE0 SIZE23520 HIDDEN0 Y2KBUG0\n\
}}\n",
        volume_header("1997-01-01 00:00:00.00 0"),
        track_listing
    );
    let mut catalog = parse_catalog(&catalog, &fs_base).unwrap();
    let bin1_path = dir.path().join("MIX.bin");
    build_image(&mut catalog, &fs_base, &bin1_path, true).unwrap();

    let bin1 = fs::read(&bin1_path).unwrap();
    assert_eq!(bin1.len(), 338 * RAW_SECTOR_SIZE);

    // Rebuilt length equals the original claim, so the CDDA entry keeps
    // its LSN and the audio starts right after the postgap.
    let rec = &payload(&bin1, 25)[96..];
    assert_eq!(&rec[33..43], b"AUDIO.DA;1");
    assert_eq!(u32::from_le_bytes(rec[2..6].try_into().unwrap()), 328);
    assert_eq!(&sector(&bin1, 328)[..8], &audio[..8]);

    // Rip the cue and rebuild; everything must match byte-for-byte.
    let cue1_path = bin1_path.with_extension("cue");
    let cue1 = fs::read_to_string(&cue1_path).unwrap();
    assert!(cue1.contains("TRACK 02 AUDIO"));
    assert!(cue1.contains("INDEX 00 00:02:28"));
    assert!(cue1.contains("INDEX 01 00:04:28"));

    let rip_dir = dir.path().join("ripped");
    fs::create_dir_all(&rip_dir).unwrap();
    let rip_base = rip_dir.join("MIX");
    let mut image = DiscImage::open(&cue1_path).unwrap();
    let options = RipOptions {
        fix_dates: false,
        write_lbns: true,
        strict: true,
    };
    rip_image(&mut image, &rip_base, &options).unwrap();

    // The audio round-tripped into the extras directory.
    let ripped_track = fs::read(rip_base.join("_PSXRIP").join("Track_02.wav")).unwrap();
    assert_eq!(&ripped_track[wav::WAV_HEADER_SIZE..], &audio[..]);

    let cat2 = fs::read_to_string(rip_base.with_extension("cat")).unwrap();
    let mut catalog2 = parse_catalog(&cat2, &rip_base).unwrap();
    assert_eq!(catalog2.track1_sector_count, 178);
    assert_eq!(catalog2.audio_sectors, 160);

    let bin2_path = dir.path().join("MIX2.bin");
    build_image(&mut catalog2, &rip_base, &bin2_path, true).unwrap();

    let bin2 = fs::read(&bin2_path).unwrap();
    assert_eq!(bin1.len(), bin2.len());
    for lsn in 0..(bin1.len() / RAW_SECTOR_SIZE) as u32 {
        assert_eq!(
            sector(&bin1, lsn),
            sector(&bin2, lsn),
            "sector {} differs",
            lsn
        );
    }

    // The regenerated cue matches, too.
    let cue2 = fs::read_to_string(bin2_path.with_extension("cue")).unwrap();
    assert_eq!(
        cue1.replace("MIX.bin", "X.bin"),
        cue2.replace("MIX2.bin", "X.bin")
    );
}

fn write_wav(path: &Path, data: &[u8]) {
    let mut bytes = wav::wav_header(data.len() as u32).to_vec();
    bytes.extend_from_slice(data);
    fs::write(path, bytes).unwrap();
}
