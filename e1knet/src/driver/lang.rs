use uefi::CStr16;

use super::name_table::NameTable;

const ISO639_CODE_LEN: usize = 3;

/// Language code convention of a component name protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// ISO 639-2 three letter codes, concatenated, e.g. `"engfra"`.
    /// Used by the deprecated `EFI_COMPONENT_NAME_PROTOCOL`.
    Iso639,
    /// RFC 4646 tags separated by `;`, e.g. `"en-US;fr"`.
    Rfc4646,
}
impl Dialect {
    fn codes(self, list: &[u8]) -> impl Iterator<Item = &[u8]> {
        let (chunks, tags) = match self {
            Self::Iso639 => (Some(list.chunks_exact(ISO639_CODE_LEN)), None),
            Self::Rfc4646 => (None, Some(list.split(|&b| b == b';'))),
        };
        chunks
            .into_iter()
            .flatten()
            .chain(tags.into_iter().flatten())
            .filter(|code| !code.is_empty())
    }

    fn find<'a>(self, list: &'a [u8], code: &[u8]) -> Option<&'a [u8]> {
        self.codes(list).find(|c| c.eq_ignore_ascii_case(code))
    }

    /// Pick the entry of `supported` that serves `requested`.
    ///
    /// Returns the matching code as spelled in `supported`.
    pub fn best_language<'a>(self, supported: &'a [u8], requested: &[u8]) -> Option<&'a [u8]> {
        match self {
            Self::Iso639 => self.find(supported, requested.get(..ISO639_CODE_LEN)?),
            Self::Rfc4646 => {
                let mut requested = requested;
                loop {
                    if let Some(code) = self.find(supported, requested) {
                        return Some(code);
                    }
                    // fall back to the less specific tag, "en-US" -> "en"
                    let idx = requested.iter().rposition(|&b| b == b'-')?;
                    requested = &requested[..idx];
                }
            }
        }
    }
}

/// Look up the name for `requested` in `table`.
///
/// `requested` must first be one of the `supported` languages of the calling
/// protocol, the table is then searched with the negotiated code.
pub fn resolve(
    requested: &[u8],
    supported: &[u8],
    table: NameTable,
    dialect: Dialect,
) -> Option<&'static CStr16> {
    let language = dialect.best_language(supported, requested)?;
    table
        .entries()
        .find(|entry| {
            dialect
                .best_language(entry.languages.as_bytes(), language)
                .is_some()
        })
        .map(|entry| entry.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::name_table::{NameEntry, NameKind};
    use uefi::cstr16;

    #[test]
    fn iso639_codes() {
        let codes: Vec<_> = Dialect::Iso639.codes(b"engfrazh").collect();
        assert_eq!(vec![b"eng".as_slice(), b"fra".as_slice()], codes);

        let codes: Vec<_> = Dialect::Iso639.codes(b"eng;en").collect();
        assert_eq!(vec![b"eng".as_slice(), b";en".as_slice()], codes);
    }

    #[test]
    fn rfc4646_codes() {
        let codes: Vec<_> = Dialect::Rfc4646.codes(b"en-US;;fr;").collect();
        assert_eq!(vec![b"en-US".as_slice(), b"fr".as_slice()], codes);
    }

    #[test]
    fn iso639_best_language() {
        let d = Dialect::Iso639;
        assert_eq!(Some(b"eng".as_slice()), d.best_language(b"eng", b"eng"));
        assert_eq!(Some(b"eng".as_slice()), d.best_language(b"eng", b"ENG"));
        assert_eq!(Some(b"fra".as_slice()), d.best_language(b"engfra", b"fra"));
        // only the first three characters count
        assert_eq!(Some(b"eng".as_slice()), d.best_language(b"eng", b"english"));
        assert_eq!(None, d.best_language(b"eng", b"en"));
        assert_eq!(None, d.best_language(b"eng", b""));
        assert_eq!(None, d.best_language(b"eng", b"fra"));
    }

    #[test]
    fn rfc4646_best_language() {
        let d = Dialect::Rfc4646;
        assert_eq!(Some(b"en".as_slice()), d.best_language(b"en", b"en"));
        assert_eq!(Some(b"en".as_slice()), d.best_language(b"en", b"EN"));
        assert_eq!(Some(b"en-us".as_slice()), d.best_language(b"en-us;en", b"en-US"));
        assert_eq!(Some(b"en".as_slice()), d.best_language(b"en", b"en-US"));
        assert_eq!(Some(b"en".as_slice()), d.best_language(b"fr;en", b"en-Latn-US"));
        assert_eq!(None, d.best_language(b"en", b"eng"));
        assert_eq!(None, d.best_language(b"en-US", b"en"));
        assert_eq!(None, d.best_language(b"en", b"fr-CA"));
        assert_eq!(None, d.best_language(b"en", b""));
    }

    #[test]
    fn resolve_both_dialects() {
        let table = NameKind::Driver.table();
        let expected = cstr16!("E1000 network interface card Driver");

        let name = resolve(b"eng", b"eng", table, Dialect::Iso639);
        assert_eq!(Some(expected.to_string()), name.map(|n| n.to_string()));

        let name = resolve(b"en", b"en", table, Dialect::Rfc4646);
        assert_eq!(Some(expected.to_string()), name.map(|n| n.to_string()));

        let upper = resolve(b"EN", b"en", table, Dialect::Rfc4646);
        assert_eq!(name.map(|n| n.to_string()), upper.map(|n| n.to_string()));
    }

    #[test]
    fn resolve_is_idempotent() {
        for kind in [NameKind::Driver, NameKind::Controller] {
            let first = resolve(b"eng", b"eng", kind.table(), Dialect::Iso639).unwrap();
            for _ in 0..3 {
                let again = resolve(b"eng", b"eng", kind.table(), Dialect::Iso639).unwrap();
                assert_eq!(first.to_string(), again.to_string());
            }
        }
    }

    #[test]
    fn resolve_unsupported() {
        let table = NameKind::Controller.table();
        assert!(resolve(b"fra", b"eng", table, Dialect::Iso639).is_none());
        assert!(resolve(b"en", b"eng", table, Dialect::Iso639).is_none());
        assert!(resolve(b"eng", b"en", table, Dialect::Rfc4646).is_none());
        assert!(resolve(b"de-DE", b"en", table, Dialect::Rfc4646).is_none());
    }

    #[test]
    fn resolve_supported_but_missing_from_table() {
        static ENTRIES: [NameEntry; 1] = [NameEntry {
            languages: "eng;en",
            name: cstr16!("english only"),
        }];
        let table = NameTable::new(&ENTRIES);
        assert!(resolve(b"fra", b"engfra", table, Dialect::Iso639).is_none());
        assert!(resolve(b"fr", b"en;fr", table, Dialect::Rfc4646).is_none());
    }

    #[test]
    fn resolve_stops_at_end_entry() {
        static ENTRIES: [NameEntry; 2] = [
            NameEntry::END,
            NameEntry {
                languages: "eng;en",
                name: cstr16!("unreachable"),
            },
        ];
        let table = NameTable::new(&ENTRIES);
        assert!(resolve(b"eng", b"eng", table, Dialect::Iso639).is_none());
        assert!(resolve(b"en", b"en", table, Dialect::Rfc4646).is_none());
    }

    #[test]
    fn resolve_first_match_wins() {
        static ENTRIES: [NameEntry; 2] = [
            NameEntry {
                languages: "fra;fr",
                name: cstr16!("Pilote"),
            },
            NameEntry {
                languages: "eng;en;fr",
                name: cstr16!("Driver"),
            },
        ];
        let table = NameTable::new(&ENTRIES);
        let name = resolve(b"fr", b"en;fr", table, Dialect::Rfc4646).unwrap();
        assert_eq!("Pilote", name.to_string());
        let name = resolve(b"en", b"en;fr", table, Dialect::Rfc4646).unwrap();
        assert_eq!("Driver", name.to_string());
    }
}
