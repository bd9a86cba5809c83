//! ISO 9660 character classes and identifier checks.
//!
//! Illegal characters in volume identifiers are warnings (the byte is kept
//! verbatim, matching what mastered discs actually contain); illegal
//! characters in file names are fatal.

use crate::error::FormatError;

/// d-characters: the strict identifier set.
pub fn is_dchar(c: u8) -> bool {
    c.is_ascii_uppercase() || c.is_ascii_digit() || c == b'_'
}

/// a-characters: the wider descriptive-text set.
pub fn is_achar(c: u8) -> bool {
    is_dchar(c)
        || matches!(
            c,
            b' ' | b'!'
                | b'"'
                | b'%'
                | b'&'
                | b'\''
                | b'('
                | b')'
                | b'*'
                | b'+'
                | b','
                | b'-'
                | b'.'
                | b'/'
                | b':'
                | b';'
                | b'<'
                | b'='
                | b'>'
                | b'?'
        )
}

/// Warn on the first character outside the d-character set.
pub fn check_dstring(s: &str, what: &str) {
    if let Some(c) = s.bytes().find(|&c| !is_dchar(c)) {
        log::warn!(
            "Illegal character '{}' in {} \"{}\"",
            c as char,
            what,
            s
        );
    }
}

/// Warn on the first character outside the a-character set.
pub fn check_astring(s: &str, what: &str) {
    if let Some(c) = s.bytes().find(|&c| !is_achar(c)) {
        log::warn!(
            "Illegal character '{}' in {} \"{}\"",
            c as char,
            what,
            s
        );
    }
}

/// File names admit d-characters and '.' only; anything else is fatal.
pub fn check_file_name(s: &str, what: &'static str) -> Result<(), FormatError> {
    match s.bytes().find(|&c| !is_dchar(c) && c != b'.') {
        Some(c) => Err(FormatError::IllegalCharacter {
            ch: c as char,
            what,
            value: s.to_string(),
        }),
        None => Ok(()),
    }
}

/// Copy a string into a fixed-size field, space-padded.
pub fn copy_padded(dest: &mut [u8], s: &str) {
    dest.fill(b' ');
    let n = s.len().min(dest.len());
    dest[..n].copy_from_slice(&s.as_bytes()[..n]);
}

/// Read a space-padded fixed-size field back as a trimmed string.
pub fn read_padded(field: &[u8]) -> String {
    let s: String = field
        .iter()
        .map(|&b| if (0x20..0x7F).contains(&b) { b as char } else { ' ' })
        .collect();
    s.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dchar_class() {
        assert!(is_dchar(b'A'));
        assert!(is_dchar(b'0'));
        assert!(is_dchar(b'_'));
        assert!(!is_dchar(b'a'));
        assert!(!is_dchar(b' '));
        assert!(!is_dchar(b'.'));
    }

    #[test]
    fn achar_class() {
        assert!(is_achar(b' '));
        assert!(is_achar(b'.'));
        assert!(is_achar(b'?'));
        assert!(!is_achar(b'a'));
        assert!(!is_achar(b'['));
    }

    #[test]
    fn file_name_check() {
        assert!(check_file_name("SLUS_012.34", "file name").is_ok());
        assert!(check_file_name("FOO BAR", "file name").is_err());
        assert!(check_file_name("lower", "file name").is_err());
    }

    #[test]
    fn padded_round_trip() {
        let mut field = [0u8; 8];
        copy_padded(&mut field, "ABC");
        assert_eq!(&field, b"ABC     ");
        assert_eq!(read_padded(&field), "ABC");
    }
}
