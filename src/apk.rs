use std::{
    fs::File,
    io::{BufReader, Read, Seek},
    path::Path,
};

use log::{info, warn};
use serde::Serialize;
use zip::ZipArchive;

use crate::{errors::QueryError, manifest, manifest::Manifest};

const DEX_MAGICS: [&[u8; 8]; 5] = [
    b"\x64\x65\x78\x0A\x30\x33\x39\x00",
    b"\x64\x65\x78\x0A\x30\x33\x38\x00",
    b"\x64\x65\x78\x0A\x30\x33\x37\x00",
    b"\x64\x65\x78\x0A\x30\x33\x36\x00",
    b"\x64\x65\x78\x0A\x30\x33\x35\x00",
];

const MANIFEST_NAME: &str = "AndroidManifest.xml";

/// Raw bytes of one `classes*.dex` archive member.
#[derive(Debug, Clone)]
pub struct DexEntry {
    pub name: String,
    pub data: Vec<u8>,
}

/// The parts of an APK the queries look at.
#[derive(Debug, Serialize)]
pub struct Apk {
    pub path: String,
    pub manifest: Option<Manifest>,
    #[serde(skip)]
    pub dex_entries: Vec<DexEntry>,
}

impl Apk {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, QueryError> {
        let path = path.as_ref();
        let label = path.display().to_string();
        let file = File::open(path).map_err(|source| QueryError::Io {
            path: label.clone(),
            source,
        })?;
        Self::from_reader(label, BufReader::new(file))
    }

    pub fn from_reader<R: Read + Seek>(
        path: impl Into<String>,
        reader: R,
    ) -> Result<Self, QueryError> {
        let path = path.into();
        let mut zip_archive = ZipArchive::new(reader)?;
        let mut dex_entries = Vec::new();
        let mut manifest = None;
        for i in 0..zip_archive.len() {
            let mut file = match zip_archive.by_index(i) {
                Ok(file) => file,
                Err(e) => {
                    warn!("Error reading file at index {i}: {e}");
                    continue;
                }
            };
            let name = file.name().to_string();
            let is_dex = is_dex_name(&name);
            if !is_dex && name != MANIFEST_NAME {
                continue;
            }

            let mut buf = Vec::new();
            if let Err(e) = file.read_to_end(&mut buf) {
                warn!("Error reading {name}: {e}");
                continue;
            }

            if !is_dex {
                manifest = manifest::parse(&buf).unwrap_or_else(|e| {
                    warn!("Failed to parse {MANIFEST_NAME}: {e}");
                    None
                });
            } else if has_dex_magic(&buf) {
                info!("Extracted {name} ({} bytes)", buf.len());
                dex_entries.push(DexEntry { name, data: buf });
            } else {
                warn!("{name} has no DEX magic, skipping");
            }
        }

        if dex_entries.is_empty() {
            return Err(QueryError::NoDexFiles(path));
        }
        dex_entries.sort_by(|a, b| {
            (multidex_index(&a.name), &a.name).cmp(&(multidex_index(&b.name), &b.name))
        });
        Ok(Self {
            path,
            manifest,
            dex_entries,
        })
    }

    pub fn package(&self) -> Option<&str> {
        self.manifest.as_ref()?.package.as_deref()
    }
}

fn is_dex_name(name: &str) -> bool {
    name.starts_with("classes") && name.ends_with(".dex") && !name.contains('/')
}

fn has_dex_magic(buf: &[u8]) -> bool {
    buf.get(..8)
        .is_some_and(|head| DEX_MAGICS.iter().any(|magic| magic[..] == *head))
}

/// `classes.dex` is 1, `classesN.dex` is N, anything else sorts last.
fn multidex_index(name: &str) -> u32 {
    let middle = &name["classes".len()..name.len() - ".dex".len()];
    if middle.is_empty() {
        1
    } else {
        middle.parse().unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};

    use pretty_assertions::assert_eq;
    use zip::{write::SimpleFileOptions, ZipWriter};

    use super::{has_dex_magic, multidex_index, Apk};
    use crate::errors::QueryError;

    const DEX_HEADER: &[u8] = b"dex\n035\0rest-of-header";

    fn build_zip(entries: &[(&str, &[u8])]) -> Cursor<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap()
    }

    #[test]
    fn test_multidex_order_and_filtering() {
        let zip = build_zip(&[
            ("classes2.dex", DEX_HEADER),
            ("resources.arsc", b"arsc".as_slice()),
            ("classes10.dex", DEX_HEADER),
            ("assets/classes3.dex", DEX_HEADER),
            ("classes.dex", DEX_HEADER),
            ("classes4.dex", b"PK not a dex".as_slice()),
        ]);
        let apk = Apk::from_reader("test.apk", zip).unwrap();
        let names: Vec<_> = apk.dex_entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["classes.dex", "classes2.dex", "classes10.dex"]);
        assert_eq!(apk.dex_entries[0].data, DEX_HEADER);
        assert!(apk.manifest.is_none());
        assert_eq!(apk.package(), None);
    }

    #[test]
    fn test_no_dex_files() {
        let zip = build_zip(&[("res/raw/channel.mf", b"google_play".as_slice())]);
        let err = Apk::from_reader("empty.apk", zip).unwrap_err();
        assert!(matches!(err, QueryError::NoDexFiles(path) if path == "empty.apk"));
    }

    #[test]
    fn test_not_a_zip() {
        let err = Apk::from_reader("bad.apk", Cursor::new(b"not a zip".to_vec())).unwrap_err();
        assert!(matches!(err, QueryError::ZipError(_)));
    }

    #[test]
    fn test_open_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.apk");
        std::fs::write(&path, build_zip(&[("classes.dex", DEX_HEADER)]).into_inner()).unwrap();
        let apk = Apk::open(&path).unwrap();
        assert_eq!(apk.dex_entries.len(), 1);
        assert_eq!(apk.path, path.display().to_string());
    }

    #[test]
    fn test_open_missing_file() {
        let err = Apk::open("/nonexistent/app.apk").unwrap_err();
        assert!(matches!(err, QueryError::Io { .. }));
    }

    #[test]
    fn test_magic() {
        assert!(has_dex_magic(b"dex\n039\0"));
        assert!(has_dex_magic(DEX_HEADER));
        assert!(!has_dex_magic(b"dex\n034\0"));
        assert!(!has_dex_magic(b"dex"));
    }

    #[test]
    fn test_multidex_index() {
        assert_eq!(multidex_index("classes.dex"), 1);
        assert_eq!(multidex_index("classes2.dex"), 2);
        assert_eq!(multidex_index("classes12.dex"), 12);
        assert_eq!(multidex_index("classes-x.dex"), u32::MAX);
    }
}
