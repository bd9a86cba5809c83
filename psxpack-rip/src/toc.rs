//! Track layout analysis and postgap classification.

use std::sync::LazyLock;

use psxpack_catalog::TrackEntry;
use psxpack_image::{DiscImage, TrackMode};
use psxpack_core::RAW_SECTOR_SIZE;
use regex::Regex;

use crate::error::RipError;

/// Everything the catalog needs to know about the track layout.
#[derive(Debug)]
pub struct TocAnalysis {
    pub tracks: Vec<TrackEntry>,
    /// Length of the data track in sectors, postgap included.
    pub track1_sector_count: u32,
    /// Sum of all audio-track sectors (pregaps included).
    pub audio_sectors: u32,
    /// Postgap flavor 1..=3, or 0 when the last sector matched nothing.
    pub postgap_type: u8,
    /// The raw last data-track sector, kept when classification failed.
    pub last_sector: Option<Box<[u8; RAW_SECTOR_SIZE]>>,
}

// The three known postgap flavors, matched against the uppercase hex dump
// of the final data-track sector.
static POSTGAP_EMPTY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("^00FFFFFFFFFFFFFFFFFFFF00.{8}0000000000000000(00)*$").unwrap()
});
static POSTGAP_MODE2: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("^00FFFFFFFFFFFFFFFFFFFF00.{8}0000200000002000(00)*$").unwrap()
});
static POSTGAP_MODE2_EDC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("^00FFFFFFFFFFFFFFFFFFFF00.{8}0000200000002000(00)*([0-9A-F]){8}$").unwrap()
});

/// Analyze the TOC of an opened image.
pub fn analyze_toc(image: &mut DiscImage) -> Result<TocAnalysis, RipError> {
    let tracks = image.tracks().to_vec();
    let first = tracks
        .first()
        .ok_or_else(|| RipError::wrong_disc("Input image contains no tracks"))?;
    if first.mode != TrackMode::Mode2Raw {
        return Err(RipError::wrong_disc(format!(
            "First track ({}) is not a data track",
            first.number
        )));
    }
    if first.total_sectors() == 0 {
        return Err(RipError::wrong_disc("Input image is not a CD-ROM data disc"));
    }

    let entries: Vec<TrackEntry> = tracks
        .iter()
        .map(|t| TrackEntry {
            number: t.number,
            mode: t.mode.name().to_string(),
            start_lsn: t.start_lsn,
            pregap: t.pregap,
            data_lsn: t.data_lsn,
            end_lsn: t.end_lsn,
            total_sectors: t.total_sectors(),
        })
        .collect();

    let audio_sectors = tracks
        .iter()
        .filter(|t| t.mode == TrackMode::Audio)
        .map(|t| t.total_sectors())
        .sum();

    let track1_sector_count = first.end_lsn - first.start_lsn;
    log::info!("Track 1 sector count: {}", track1_sector_count);

    let (postgap_type, last_sector) = classify_postgap(image, first.end_lsn - 1)?;
    log::info!("Track 1 postgap type: {}", postgap_type);
    log::info!("Audio sectors: {}", audio_sectors);

    Ok(TocAnalysis {
        tracks: entries,
        track1_sector_count,
        audio_sectors,
        postgap_type,
        last_sector,
    })
}

/// Classify the final data-track sector against the known postgap
/// flavors. An unmatched sector comes back as type 0 together with its
/// raw bytes so the builder can replay it.
pub fn classify_postgap(
    image: &mut DiscImage,
    lsn: u32,
) -> Result<(u8, Option<Box<[u8; RAW_SECTOR_SIZE]>>), RipError> {
    let mut raw = [0u8; RAW_SECTOR_SIZE];
    image.read_raw(lsn, &mut raw)?;
    let hex = to_hex_upper(&raw);

    // An all-zero tail matches both the type 2 and type 3 patterns;
    // testing type 2 first resolves it the way the flavors are defined.
    if POSTGAP_EMPTY.is_match(&hex) {
        Ok((1, None))
    } else if POSTGAP_MODE2.is_match(&hex) {
        Ok((2, None))
    } else if POSTGAP_MODE2_EDC.is_match(&hex) {
        Ok((3, None))
    } else {
        Ok((0, Some(Box::new(raw))))
    }
}

fn to_hex_upper(data: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(data.len() * 2);
    for &byte in data {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0F) as usize] as char);
    }
    out
}

#[cfg(test)]
#[path = "tests/toc_tests.rs"]
mod tests;
