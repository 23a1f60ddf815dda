use uefi::{cstr16, CStr16};

/// A display name and the language codes it is offered in.
///
/// `languages` may mix both tag conventions, e.g. `"eng;en"` reads as the
/// ISO 639-2 chunk `eng` and as the RFC 4646 tag `en`.
#[derive(Debug, Clone, Copy)]
pub struct NameEntry {
    pub languages: &'static str,
    pub name: &'static CStr16,
}
impl NameEntry {
    /// Terminates a table, nothing after it is looked at.
    pub const END: Self = Self {
        languages: "",
        name: unsafe { CStr16::from_u16_with_nul_unchecked(&[0]) },
    };

    #[inline]
    pub fn is_end(&self) -> bool {
        self.languages.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NameTable(&'static [NameEntry]);
impl NameTable {
    pub const fn new(entries: &'static [NameEntry]) -> Self {
        Self(entries)
    }

    pub fn entries(&self) -> impl Iterator<Item = &'static NameEntry> {
        self.0.iter().take_while(|e| !e.is_end())
    }
}

static DRIVER_NAMES: [NameEntry; 1] = [NameEntry {
    languages: "eng;en",
    name: cstr16!("E1000 network interface card Driver"),
}];

// parent (bus) and child controllers share this name
static CONTROLLER_NAMES: [NameEntry; 1] = [NameEntry {
    languages: "eng;en",
    name: cstr16!("E1000 network interface card Driver"),
}];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Driver,
    Controller,
}
impl NameKind {
    pub fn table(self) -> NameTable {
        match self {
            Self::Driver => NameTable::new(&DRIVER_NAMES),
            Self::Controller => NameTable::new(&CONTROLLER_NAMES),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_populated() {
        for kind in [NameKind::Driver, NameKind::Controller] {
            let table = kind.table();
            assert_eq!(1, table.entries().count());
            for entry in table.entries() {
                assert!(!entry.languages.is_empty());
                assert!(!entry.name.to_u16_slice().is_empty());
            }
        }
    }

    #[test]
    fn driver_and_controller_share_name() {
        let driver = NameKind::Driver.table().entries().next().unwrap().name;
        let controller = NameKind::Controller.table().entries().next().unwrap().name;
        assert_eq!("E1000 network interface card Driver", driver.to_string());
        assert_eq!(driver.to_string(), controller.to_string());
    }

    #[test]
    fn end_entry_stops_iteration() {
        static ENTRIES: [NameEntry; 3] = [
            NameEntry {
                languages: "eng;en",
                name: cstr16!("first"),
            },
            NameEntry::END,
            NameEntry {
                languages: "fra;fr",
                name: cstr16!("hidden"),
            },
        ];
        let table = NameTable::new(&ENTRIES);
        let names: Vec<_> = table.entries().map(|e| e.name.to_string()).collect();
        assert_eq!(vec!["first".to_string()], names);
    }
}
