//! Cue sheet parsing.
//!
//! Handles the subset PSX dumps use: `FILE ... BINARY` entries, `TRACK NN
//! MODE2/2352` and `TRACK NN AUDIO`, and `INDEX NN mm:ss:ff` lines. Index
//! times are relative to the start of the enclosing file.

use crate::error::ImageError;

/// Recording mode of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackMode {
    /// Raw 2352-byte Mode 2 data track.
    Mode2Raw,
    /// Red Book audio.
    Audio,
}

impl TrackMode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Mode2Raw => "MODE2/2352",
            Self::Audio => "AUDIO",
        }
    }

    fn parse(s: &str) -> Result<Self, ImageError> {
        match s {
            "MODE2/2352" => Ok(Self::Mode2Raw),
            "AUDIO" => Ok(Self::Audio),
            other => Err(ImageError::unsupported(format!(
                "Unsupported track mode '{}'",
                other
            ))),
        }
    }
}

/// One TRACK entry of a cue sheet.
#[derive(Debug, Clone)]
pub struct CueTrack {
    pub number: u8,
    pub mode: TrackMode,
    /// Index of the enclosing FILE entry.
    pub file_index: usize,
    /// `INDEX 00` time in sectors, relative to the file start.
    pub index0: Option<u32>,
    /// `INDEX 01` time in sectors, relative to the file start.
    pub index1: Option<u32>,
}

/// A parsed cue sheet: bin file names plus the track list.
#[derive(Debug, Clone)]
pub struct CueSheet {
    pub files: Vec<String>,
    pub tracks: Vec<CueTrack>,
}

/// Parse a cue sheet from its text content.
pub fn parse_cue(content: &str) -> Result<CueSheet, ImageError> {
    let mut files: Vec<String> = Vec::new();
    let mut tracks: Vec<CueTrack> = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("REM") {
            continue;
        }

        let upper = line.to_uppercase();
        if upper.starts_with("FILE ") {
            files.push(parse_file_line(line)?);
        } else if upper.starts_with("TRACK ") {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 3 {
                return Err(ImageError::cue_syntax(format!("Invalid TRACK line '{}'", line)));
            }
            let number: u8 = parts[1]
                .parse()
                .map_err(|_| ImageError::cue_syntax(format!("Invalid track number '{}'", parts[1])))?;
            if files.is_empty() {
                return Err(ImageError::cue_syntax("TRACK before any FILE entry"));
            }
            tracks.push(CueTrack {
                number,
                mode: TrackMode::parse(parts[2])?,
                file_index: files.len() - 1,
                index0: None,
                index1: None,
            });
        } else if upper.starts_with("INDEX ") {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 3 {
                return Err(ImageError::cue_syntax(format!("Invalid INDEX line '{}'", line)));
            }
            let track = tracks
                .last_mut()
                .ok_or_else(|| ImageError::cue_syntax("INDEX before any TRACK entry"))?;
            let sectors = parse_msf(parts[2])?;
            match parts[1] {
                "00" => track.index0 = Some(sectors),
                "01" => track.index1 = Some(sectors),
                _ => {} // higher indexes are irrelevant here
            }
        }
        // PREGAP/POSTGAP/FLAGS and friends are ignored
    }

    if tracks.is_empty() {
        return Err(ImageError::cue_syntax("Cue sheet contains no TRACK entries"));
    }

    Ok(CueSheet { files, tracks })
}

/// Parse `FILE "name.bin" BINARY` (quotes optional).
fn parse_file_line(line: &str) -> Result<String, ImageError> {
    let rest = line[5..].trim();
    let name = if let Some(after_quote) = rest.strip_prefix('"') {
        let end = after_quote
            .find('"')
            .ok_or_else(|| ImageError::cue_syntax("Unterminated quote in FILE line"))?;
        &after_quote[..end]
    } else {
        rest.split_whitespace()
            .next()
            .ok_or_else(|| ImageError::cue_syntax("Empty FILE line"))?
    };
    if name.is_empty() {
        return Err(ImageError::cue_syntax("Empty file name in FILE line"));
    }
    Ok(name.to_string())
}

/// Parse an `mm:ss:ff` index time into a sector count.
fn parse_msf(s: &str) -> Result<u32, ImageError> {
    let fields: Vec<&str> = s.split(':').collect();
    let [minutes, seconds, frames] = fields[..] else {
        return Err(ImageError::cue_syntax(format!("Invalid index time '{}'", s)));
    };
    let parse = |f: &str| -> Result<u32, ImageError> {
        f.parse()
            .map_err(|_| ImageError::cue_syntax(format!("Invalid index time '{}'", s)))
    };
    let (m, sec, f) = (parse(minutes)?, parse(seconds)?, parse(frames)?);
    if sec >= 60 || f >= 75 {
        return Err(ImageError::cue_syntax(format!("Invalid index time '{}'", s)));
    }
    Ok((m * 60 + sec) * 75 + f)
}
