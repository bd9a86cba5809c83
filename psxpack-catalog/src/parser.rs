//! Line-oriented parser for the catalog format.
//!
//! The grammar is simple enough that a hand-written tokenizer beats a pile
//! of regexes: every entry is a keyword, an optional name, a run of
//! `KEYvalue` attribute tokens, and braces for nesting.

use std::path::{Path, PathBuf};

use psxpack_core::dates::LongDate;
use psxpack_core::volume::EVD_SECTOR;
use psxpack_core::{chars, BLOCK_SIZE, M2RAW_SECTOR_SIZE, MAX_ISO_SECTORS};

use crate::error::CatalogError;
use crate::model::{decode_track_listing, Catalog, VolumeInfo};
use crate::tree::{DirMeta, FileForm, FileMeta, FsNode, FsTree, NodeId, NodeKind};

/// Parse a catalog file's content. `fs_base` is the directory holding the
/// extracted filesystem tree the entries refer to.
pub fn parse_catalog(content: &str, fs_base: &Path) -> Result<Catalog, CatalogError> {
    Parser::new(content).parse(fs_base)
}

struct Parser<'a> {
    lines: std::str::Lines<'a>,
}

/// Attribute tokens shared by file and directory entries.
#[derive(Debug, Default)]
struct EntryAttrs {
    lsn: u32,
    gid: Option<u16>,
    uid: Option<u16>,
    atr: u16,
    atr_self: u16,
    atr_parent: u16,
    date: String,
    date_self: String,
    date_parent: String,
    timezone: i8,
    timezone_self: i8,
    timezone_parent: i8,
    size: u32,
    hidden: bool,
    y2k_self: bool,
    y2k_parent: bool,
    zero_edc: bool,
}

impl<'a> Parser<'a> {
    fn new(content: &'a str) -> Self {
        Self {
            lines: content.lines(),
        }
    }

    /// Next non-empty line, trimmed. `None` at end of input.
    fn next_line(&mut self) -> Option<&'a str> {
        for line in self.lines.by_ref() {
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                return Some(trimmed);
            }
        }
        None
    }

    fn parse(mut self, fs_base: &Path) -> Result<Catalog, CatalogError> {
        let mut system_area_file = None;
        let mut volume = VolumeInfo::default();
        let mut default_uid = 0u16;
        let mut default_gid = 0u16;
        let mut track_listing = Vec::new();
        let mut track1_sector_count = 0u32;
        let mut track1_postgap_type = 0u8;
        let mut audio_sectors = 0u32;
        let mut strict_rebuild = false;
        let mut tree = FsTree::new();
        let mut root: Option<NodeId> = None;

        while let Some(line) = self.next_line() {
            if line == "system_area {" || line == "system_area{" {
                system_area_file = self.parse_system_area()?;
            } else if line == "volume {" || line == "volume{" {
                self.parse_volume(
                    &mut volume,
                    &mut default_uid,
                    &mut default_gid,
                    &mut track_listing,
                    &mut track1_sector_count,
                    &mut track1_postgap_type,
                    &mut audio_sectors,
                    &mut strict_rebuild,
                )?;
            } else if let Some(header) = line.strip_prefix("dir") {
                if root.is_some() {
                    return Err(CatalogError::syntax(
                        "more than one root directory section",
                    ));
                }
                let tokens = open_brace_tokens(header)?;
                if !tokens.is_empty() && !is_attribute_token(tokens[0]) {
                    return Err(CatalogError::syntax(
                        "root directory section must not have a name",
                    ));
                }
                let attrs = parse_entry_attrs(&tokens, "root directory")?;
                let id = self.parse_dir(
                    &mut tree,
                    String::new(),
                    fs_base.to_path_buf(),
                    None,
                    attrs,
                    (default_gid, default_uid),
                )?;
                root = Some(id);
            } else {
                return Err(CatalogError::syntax(format!("\"{}\" unrecognized", line)));
            }
        }

        let root = root.ok_or_else(|| {
            CatalogError::syntax("no root directory specified in catalog file")
        })?;
        tree.sort_children();

        Ok(Catalog {
            system_area_file,
            volume,
            default_uid,
            default_gid,
            track_listing,
            track1_sector_count,
            track1_postgap_type,
            audio_sectors,
            strict_rebuild,
            tree,
            root,
        })
    }

    fn parse_system_area(&mut self) -> Result<Option<PathBuf>, CatalogError> {
        let mut file = None;
        loop {
            let line = self.next_line().ok_or_else(|| {
                CatalogError::syntax("unterminated system_area section")
            })?;
            if line == "}" {
                return Ok(file);
            }
            if let Some(rest) = line.strip_prefix("file") {
                file = Some(PathBuf::from(unquote(rest.trim())?));
            } else {
                return Err(CatalogError::syntax(format!(
                    "\"{}\" unrecognized in system_area section",
                    line
                )));
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn parse_volume(
        &mut self,
        volume: &mut VolumeInfo,
        default_uid: &mut u16,
        default_gid: &mut u16,
        track_listing: &mut Vec<crate::model::TrackEntry>,
        track1_sector_count: &mut u32,
        track1_postgap_type: &mut u8,
        audio_sectors: &mut u32,
        strict_rebuild: &mut bool,
    ) -> Result<(), CatalogError> {
        loop {
            let line = self
                .next_line()
                .ok_or_else(|| CatalogError::syntax("unterminated volume section"))?;
            if line == "}" {
                return Ok(());
            }

            let (key, rest) = match line.split_once(char::is_whitespace) {
                Some((key, rest)) => (key, rest.trim()),
                None => (line, ""),
            };

            match key {
                "system_id" => {
                    volume.system_id = bracketed(rest, key)?;
                    chars::check_astring(&volume.system_id, "system_id");
                }
                "volume_id" => {
                    volume.volume_id = bracketed(rest, key)?;
                    chars::check_dstring(&volume.volume_id, "volume_id");
                }
                "volume_set_id" => {
                    volume.volume_set_id = bracketed(rest, key)?;
                    chars::check_dstring(&volume.volume_set_id, "volume_set_id");
                }
                "publisher_id" => {
                    volume.publisher_id = bracketed(rest, key)?;
                    chars::check_astring(&volume.publisher_id, "publisher_id");
                }
                "preparer_id" => {
                    volume.preparer_id = bracketed(rest, key)?;
                    chars::check_astring(&volume.preparer_id, "preparer_id");
                }
                "application_id" => {
                    volume.application_id = bracketed(rest, key)?;
                    chars::check_astring(&volume.application_id, "application_id");
                }
                "copyright_file_id" => {
                    volume.copyright_file_id = bracketed(rest, key)?;
                    chars::check_dstring(&volume.copyright_file_id, "copyright_file_id");
                }
                "abstract_file_id" => {
                    volume.abstract_file_id = bracketed(rest, key)?;
                    chars::check_dstring(&volume.abstract_file_id, "abstract_file_id");
                }
                "bibliographic_file_id" => {
                    volume.bibliographic_file_id = bracketed(rest, key)?;
                    chars::check_dstring(&volume.bibliographic_file_id, "bibliographic_file_id");
                }
                "creation_date" => volume.creation_date = LongDate::parse(rest)?,
                "modification_date" => volume.modification_date = LongDate::parse(rest)?,
                "expiration_date" => volume.expiration_date = LongDate::parse(rest)?,
                "effective_date" => volume.effective_date = LongDate::parse(rest)?,
                "track_listing" => {
                    *track_listing = decode_track_listing(&bracketed(rest, key)?)?;
                }
                "track1_sector_count" => *track1_sector_count = check_int(rest, key)?,
                "track1_postgap_type" => {
                    let value = check_int(rest, key)?;
                    if value > 3 {
                        return Err(CatalogError::invalid_value(format!(
                            "'{}' is not a valid postgap type",
                            rest
                        )));
                    }
                    *track1_postgap_type = value as u8;
                }
                "audio_sectors" => *audio_sectors = check_int(rest, key)?,
                "default_uid" => *default_uid = check_int(rest, key)? as u16,
                "default_gid" => *default_gid = check_int(rest, key)? as u16,
                "strict_rebuild" => *strict_rebuild = check_bool(rest)?,
                _ => {
                    return Err(CatalogError::syntax(format!(
                        "\"{}\" unrecognized in volume section",
                        line
                    )));
                }
            }
        }
    }

    /// Parse the body of a directory section; the header line (and its
    /// attributes) were consumed by the caller.
    fn parse_dir(
        &mut self,
        tree: &mut FsTree,
        name: String,
        path: PathBuf,
        parent: Option<NodeId>,
        attrs: EntryAttrs,
        defaults: (u16, u16),
    ) -> Result<NodeId, CatalogError> {
        let (default_gid, default_uid) = defaults;
        let dir_name_for_errors = if name.is_empty() { "root".to_string() } else { name.clone() };

        let id = tree.insert(FsNode {
            name,
            path: path.clone(),
            parent,
            children: Vec::new(),
            sorted_children: Vec::new(),
            first_sector: 0,
            num_sectors: 0,
            requested_start_sector: attrs.lsn,
            kind: NodeKind::Directory(DirMeta {
                group_id: attrs.gid.unwrap_or(default_gid),
                user_id: attrs.uid.unwrap_or(default_uid),
                attr_self: attrs.atr_self,
                attr_parent: attrs.atr_parent,
                date_self: attrs.date_self,
                date_parent: attrs.date_parent,
                timezone_self: attrs.timezone_self,
                timezone_parent: attrs.timezone_parent,
                hidden: attrs.hidden,
                y2k_self: attrs.y2k_self,
                y2k_parent: attrs.y2k_parent,
                extent: Vec::new(),
                record_number: 0,
            }),
        });

        loop {
            let line = self.next_line().ok_or_else(|| {
                CatalogError::syntax(format!(
                    "unterminated directory section \"{}\"",
                    dir_name_for_errors
                ))
            })?;

            if line == "}" {
                return Ok(id);
            }

            if let Some(rest) = strip_keyword(line, "file") {
                self.add_file(tree, id, &path, rest, FileForm::Form1, (default_gid, default_uid))?;
            } else if let Some(rest) = strip_keyword(line, "xafile") {
                self.add_file(tree, id, &path, rest, FileForm::Form2, (default_gid, default_uid))?;
            } else if let Some(rest) = strip_keyword(line, "cddafile") {
                self.add_file(tree, id, &path, rest, FileForm::Cdda, (default_gid, default_uid))?;
            } else if let Some(rest) = strip_keyword(line, "dir") {
                let tokens = open_brace_tokens(rest)?;
                let (sub_name, tokens) = take_name(&tokens, "directory")?;
                chars::check_dstring(&sub_name, "directory name");
                let sub_attrs = parse_entry_attrs(tokens, &sub_name)?;
                self.parse_dir(
                    tree,
                    sub_name.clone(),
                    path.join(&sub_name),
                    Some(id),
                    sub_attrs,
                    defaults,
                )?;
            } else {
                return Err(CatalogError::syntax(format!(
                    "\"{}\" unrecognized in directory section",
                    line
                )));
            }
        }
    }

    fn add_file(
        &mut self,
        tree: &mut FsTree,
        dir: NodeId,
        dir_path: &Path,
        rest: &str,
        form: FileForm,
        defaults: (u16, u16),
    ) -> Result<(), CatalogError> {
        let (default_gid, default_uid) = defaults;
        let tokens: Vec<&str> = rest.split_whitespace().collect();
        let (file_name, tokens) = take_name(&tokens, "file")?;
        chars::check_file_name(&file_name, "file name")?;
        let attrs = parse_entry_attrs(tokens, &file_name)?;

        let host_path = dir_path.join(&file_name);
        let (size, num_sectors) = match form {
            FileForm::Cdda => (0, 0),
            _ => {
                let size = std::fs::metadata(&host_path)
                    .map_err(|source| CatalogError::HostFile {
                        path: host_path.clone(),
                        source,
                    })?
                    .len();
                let block = match form {
                    FileForm::Form2 => M2RAW_SECTOR_SIZE as u64,
                    _ => BLOCK_SIZE as u64,
                };
                let sectors = size.div_ceil(block) as u32;
                (size, sectors.max(1))
            }
        };

        tree.insert(FsNode {
            name: format!("{};1", file_name),
            path: host_path,
            parent: Some(dir),
            children: Vec::new(),
            sorted_children: Vec::new(),
            first_sector: 0,
            num_sectors,
            requested_start_sector: attrs.lsn,
            kind: NodeKind::File(FileMeta {
                form,
                group_id: attrs.gid.unwrap_or(default_gid),
                user_id: attrs.uid.unwrap_or(default_uid),
                attributes: attrs.atr,
                date: attrs.date,
                timezone: attrs.timezone,
                size,
                node_size: attrs.size,
                hidden: attrs.hidden,
                y2k_bug: attrs.y2k_self,
                zero_edc: attrs.zero_edc,
            }),
        });
        Ok(())
    }
}

// -- Token helpers --

/// Strip a leading keyword followed by whitespace.
fn strip_keyword<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(keyword)?;
    if rest.is_empty() {
        Some(rest)
    } else if rest.starts_with(char::is_whitespace) {
        Some(rest.trim_start())
    } else {
        None
    }
}

/// Split a dir header into tokens, requiring and dropping the trailing '{'.
fn open_brace_tokens(header: &str) -> Result<Vec<&str>, CatalogError> {
    let header = header.trim();
    let body = header
        .strip_suffix('{')
        .ok_or_else(|| CatalogError::syntax("directory section without opening brace"))?;
    Ok(body.split_whitespace().collect())
}

/// Pull the entry name off the front of a token list. The name is always
/// the first token, so identifiers that happen to start like an attribute
/// keyword (e.g. "SIZES.BIN") stay unambiguous.
fn take_name<'a>(
    tokens: &'a [&'a str],
    what: &str,
) -> Result<(String, &'a [&'a str]), CatalogError> {
    match tokens.first() {
        Some(&first) => Ok((first.to_string(), &tokens[1..])),
        None => Err(CatalogError::syntax(format!("missing {} name", what))),
    }
}

fn is_attribute_token(token: &str) -> bool {
    const KEYS: &[&str] = &[
        "@", "GID", "UID", "ATRS", "ATRP", "ATR", "DATES", "DATEP", "DATE", "TIMEZONES",
        "TIMEZONEP", "TIMEZONE", "SIZE", "HIDDEN", "Y2KBUG", "ZEROEDC",
    ];
    KEYS.iter().any(|k| token.starts_with(k))
}

/// Parse the `KEYvalue` attribute tokens of one entry. Longer keyword
/// prefixes are matched first (`ATRS` before `ATR`, `DATES` before `DATE`).
fn parse_entry_attrs(tokens: &[&str], item_name: &str) -> Result<EntryAttrs, CatalogError> {
    let mut attrs = EntryAttrs::default();
    for &token in tokens {
        if let Some(value) = token.strip_prefix('@') {
            attrs.lsn = check_lbn(value, item_name)?;
        } else if let Some(value) = token.strip_prefix("GID") {
            attrs.gid = Some(check_gua(value)?);
        } else if let Some(value) = token.strip_prefix("UID") {
            attrs.uid = Some(check_gua(value)?);
        } else if let Some(value) = token.strip_prefix("ATRS") {
            attrs.atr_self = check_gua(value)?;
        } else if let Some(value) = token.strip_prefix("ATRP") {
            attrs.atr_parent = check_gua(value)?;
        } else if let Some(value) = token.strip_prefix("ATR") {
            attrs.atr = check_gua(value)?;
        } else if let Some(value) = token.strip_prefix("DATES") {
            attrs.date_self = check_date(value)?;
        } else if let Some(value) = token.strip_prefix("DATEP") {
            attrs.date_parent = check_date(value)?;
        } else if let Some(value) = token.strip_prefix("DATE") {
            attrs.date = check_date(value)?;
        } else if let Some(value) = token.strip_prefix("TIMEZONES") {
            attrs.timezone_self = check_timezone(value)?;
        } else if let Some(value) = token.strip_prefix("TIMEZONEP") {
            attrs.timezone_parent = check_timezone(value)?;
        } else if let Some(value) = token.strip_prefix("TIMEZONE") {
            attrs.timezone = check_timezone(value)?;
        } else if let Some(value) = token.strip_prefix("SIZE") {
            attrs.size = check_size(value)?;
        } else if let Some(value) = token.strip_prefix("HIDDEN") {
            attrs.hidden = check_bool(value)?;
        } else if let Some(value) = token.strip_prefix("Y2KBUG") {
            let (self_bug, parent_bug) = check_y2k(value)?;
            attrs.y2k_self = self_bug;
            attrs.y2k_parent = parent_bug;
        } else if let Some(value) = token.strip_prefix("ZEROEDC") {
            attrs.zero_edc = check_bool(value)?;
        } else {
            return Err(CatalogError::syntax(format!(
                "unrecognized attribute \"{}\" on \"{}\"",
                token, item_name
            )));
        }
    }
    Ok(attrs)
}

// -- Value checkers --

fn unquote(s: &str) -> Result<String, CatalogError> {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .map(str::to_string)
        .ok_or_else(|| CatalogError::syntax(format!("expected quoted path, got \"{}\"", s)))
}

/// Extract a `[bracketed]` value; the brackets may enclose anything
/// including spaces and nothing at all.
fn bracketed(s: &str, key: &str) -> Result<String, CatalogError> {
    s.strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .map(str::to_string)
        .ok_or_else(|| {
            CatalogError::syntax(format!("expected [value] after {}, got \"{}\"", key, s))
        })
}

fn check_int(s: &str, key: &str) -> Result<u32, CatalogError> {
    s.parse()
        .map_err(|_| CatalogError::invalid_value(format!("'{}' is not a valid {} integer", s, key)))
}

fn check_gua(s: &str) -> Result<u16, CatalogError> {
    if s.is_empty() {
        return Ok(0);
    }
    s.parse()
        .map_err(|_| CatalogError::invalid_value(format!("Invalid GID/UID/ATR number '{}'", s)))
}

fn check_date(s: &str) -> Result<String, CatalogError> {
    if s.is_empty() {
        return Ok(String::new());
    }
    if s.len() != 14 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CatalogError::invalid_value(format!("Invalid date '{}'", s)));
    }
    Ok(s.to_string())
}

fn check_timezone(s: &str) -> Result<i8, CatalogError> {
    if s.is_empty() {
        return Ok(0);
    }
    s.parse()
        .map_err(|_| CatalogError::invalid_value(format!("Invalid timezone '{}'", s)))
}

fn check_size(s: &str) -> Result<u32, CatalogError> {
    if s.is_empty() {
        return Ok(0);
    }
    s.parse()
        .map_err(|_| CatalogError::invalid_value(format!("Invalid size '{}'", s)))
}

fn check_bool(s: &str) -> Result<bool, CatalogError> {
    match s {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(CatalogError::invalid_value(format!(
            "Invalid boolean value '{}'",
            s
        ))),
    }
}

fn check_y2k(s: &str) -> Result<(bool, bool), CatalogError> {
    match s {
        "0" => Ok((false, false)),
        "1" => Ok((true, false)),
        "10" => Ok((false, true)),
        "11" => Ok((true, true)),
        _ => Err(CatalogError::invalid_value(format!(
            "Invalid Y2KBUG value '{}'",
            s
        ))),
    }
}

fn check_lbn(s: &str, item_name: &str) -> Result<u32, CatalogError> {
    if s.is_empty() {
        return Ok(0);
    }
    let lbn: u32 = s.parse().map_err(|_| {
        CatalogError::invalid_value(format!(
            "Invalid start LBN '{}' specified for '{}'",
            s, item_name
        ))
    })?;
    if lbn <= EVD_SECTOR || lbn >= MAX_ISO_SECTORS {
        return Err(CatalogError::invalid_value(format!(
            "Start LBN '{}' of '{}' is outside the valid range {}..{}",
            s, item_name, EVD_SECTOR, MAX_ISO_SECTORS
        )));
    }
    Ok(lbn)
}

#[cfg(test)]
#[path = "tests/parser_tests.rs"]
mod tests;
