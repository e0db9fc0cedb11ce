use std::collections::{BTreeMap, HashMap};

use lazy_static::lazy_static;
use log::{info, warn};
use regex::Regex;
use serde::Serialize;

use crate::{
    apk::DexEntry,
    dex::{descriptor_to_dotted, walk_method, DexFile, Reference},
};

pub const DEFAULT_NEEDLE: &str = "channel.mf";

lazy_static! {
    /// Call targets that open a file, stream or asset by name.
    static ref READ_APIS: Regex = Regex::new(
        r"^(?:Ljava/io/(?:FileInputStream|File);-><init>|Landroid/content/res/AssetManager;->open|L[^;]+;->(?:getResourceAsStream|openFileInput|load))\("
    )
    .unwrap();
}

pub fn is_read_api(signature: &str) -> bool {
    READ_APIS.is_match(signature)
}

/// A method that loads the needle string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelHit {
    /// `com.example.Config`
    pub class_name: String,
    pub method_name: String,
    /// File-reading calls made by the same method
    pub read_calls: Vec<String>,
    pub dex_name: String,
}

#[derive(Debug, Serialize)]
pub struct DexChannelScan {
    pub dex_name: String,
    /// Distinct pool strings containing the needle that some method loads
    pub needle_strings: usize,
    pub hits: Vec<ChannelHit>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChannelMethod {
    pub name: String,
    pub read_calls: Vec<String>,
}

pub fn find_in_dex<T: AsRef<[u8]>>(dex: &DexFile<T>, needle: &str) -> DexChannelScan {
    let mut contains_needle: HashMap<u32, bool> = HashMap::new();
    let mut read_api: HashMap<u16, Option<String>> = HashMap::new();
    let mut hits = Vec::new();

    for class in dex.classes() {
        let class_name = descriptor_to_dotted(&class.jtype().to_string());
        for method in class.methods() {
            let Some(walked) = walk_method(&class, method) else {
                continue;
            };
            if let Some(e) = walked.error {
                warn!("{}: {e}", dex.name);
            }

            let mut loads_needle = false;
            let mut read_calls: Vec<String> = Vec::new();
            for reference in walked.references {
                match reference {
                    Reference::String(string_idx) => {
                        loads_needle |= *contains_needle.entry(string_idx).or_insert_with(|| {
                            dex.string(string_idx)
                                .map(|s| s.contains(needle))
                                .unwrap_or_else(|e| {
                                    warn!("{}: string@{string_idx}: {e}", dex.name);
                                    false
                                })
                        });
                    }
                    Reference::Method(method_idx) => {
                        let call = read_api.entry(method_idx).or_insert_with(|| {
                            dex.method_signature(method_idx)
                                .ok()
                                .map(|signature| signature.to_string())
                                .filter(|signature| is_read_api(signature))
                        });
                        if let Some(call) = call {
                            if !read_calls.contains(call) {
                                read_calls.push(call.clone());
                            }
                        }
                    }
                }
            }

            if loads_needle {
                hits.push(ChannelHit {
                    class_name: class_name.clone(),
                    method_name: method.name().to_string(),
                    read_calls,
                    dex_name: dex.name.clone(),
                });
            }
        }
    }

    DexChannelScan {
        dex_name: dex.name.clone(),
        needle_strings: contains_needle.values().filter(|&&found| found).count(),
        hits,
    }
}

/// Scans the entries one after the other. A DEX that fails to load is
/// logged and left out.
pub fn find_channel_reads(entries: &[DexEntry], needle: &str) -> Vec<DexChannelScan> {
    let mut scans = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        info!("Analyzing DEX file #{} ({})", i + 1, entry.name);
        let dex = match DexFile::load(&entry.name, &entry.data[..]) {
            Ok(dex) => dex,
            Err(e) => {
                warn!("Error processing {}: {e}", entry.name);
                continue;
            }
        };
        let scan = find_in_dex(&dex, needle);
        if scan.needle_strings == 0 {
            info!("No reference to {needle:?} in {}", entry.name);
        } else {
            info!(
                "Found {} string(s) containing {needle:?} in {}",
                scan.needle_strings, entry.name
            );
        }
        scans.push(scan);
    }
    scans
}

/// Groups hits by class; a method name appears once per class with the
/// union of its overloads' read calls.
pub fn group_by_class<'a>(
    hits: impl IntoIterator<Item = &'a ChannelHit>,
) -> BTreeMap<String, Vec<ChannelMethod>> {
    let mut classes: BTreeMap<String, Vec<ChannelMethod>> = BTreeMap::new();
    for hit in hits {
        let methods = classes.entry(hit.class_name.clone()).or_default();
        let method = match methods.iter().position(|m| m.name == hit.method_name) {
            Some(i) => &mut methods[i],
            None => {
                methods.push(ChannelMethod {
                    name: hit.method_name.clone(),
                    read_calls: Vec::new(),
                });
                let last = methods.len() - 1;
                &mut methods[last]
            }
        };
        for call in &hit.read_calls {
            if !method.read_calls.contains(call) {
                method.read_calls.push(call.clone());
            }
        }
    }
    classes
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{
        find_channel_reads, find_in_dex, group_by_class, is_read_api, ChannelHit, ChannelMethod,
        DEFAULT_NEEDLE,
    };
    use crate::{apk::DexEntry, dex::fixture};

    fn hit(class_name: &str, method_name: &str, read_calls: &[&str]) -> ChannelHit {
        ChannelHit {
            class_name: class_name.into(),
            method_name: method_name.into(),
            read_calls: read_calls.iter().map(|s| s.to_string()).collect(),
            dex_name: "classes.dex".into(),
        }
    }

    #[test]
    fn test_find_in_dex() {
        let scan = find_in_dex(&fixture(), DEFAULT_NEEDLE);
        assert_eq!(scan.dex_name, "classes.dex");
        // "unused channel.mf" sits in the pool but no method loads it
        assert_eq!(scan.needle_strings, 2);
        assert_eq!(
            scan.hits,
            vec![
                hit("com.example.ChannelReader", "warn", &[]),
                hit(
                    "com.example.ChannelReader",
                    "read",
                    &["Ljava/io/File;-><init>(Ljava/lang/String;)V"]
                ),
            ]
        );
    }

    #[test]
    fn test_needle_not_loaded() {
        let scan = find_in_dex(&fixture(), "unused channel.mf");
        assert_eq!(scan.needle_strings, 0);
        assert!(scan.hits.is_empty());

        let scan = find_in_dex(&fixture(), "META-INF/");
        assert_eq!(scan.needle_strings, 1);
        assert_eq!(scan.hits.len(), 1);
        assert_eq!(scan.hits[0].method_name, "read");
    }

    #[test]
    fn test_find_channel_reads() {
        let data = std::fs::read("tests/dex/queries.dex").unwrap();
        let entries = [
            DexEntry {
                name: "classes.dex".into(),
                data: data.clone(),
            },
            DexEntry {
                name: "classes2.dex".into(),
                data,
            },
        ];
        let scans = find_channel_reads(&entries, DEFAULT_NEEDLE);
        let dex_names: Vec<_> = scans.iter().map(|scan| scan.dex_name.as_str()).collect();
        assert_eq!(dex_names, vec!["classes.dex", "classes2.dex"]);
        let grouped = group_by_class(scans.iter().flat_map(|scan| &scan.hits));
        assert_eq!(grouped.keys().collect::<Vec<_>>(), vec!["com.example.ChannelReader"]);
        assert_eq!(
            grouped["com.example.ChannelReader"],
            vec![
                ChannelMethod {
                    name: "warn".into(),
                    read_calls: vec![],
                },
                ChannelMethod {
                    name: "read".into(),
                    read_calls: vec!["Ljava/io/File;-><init>(Ljava/lang/String;)V".into()],
                },
            ]
        );
    }

    #[test]
    fn test_read_apis() {
        for signature in [
            "Ljava/io/FileInputStream;-><init>(Ljava/lang/String;)V",
            "Ljava/io/File;-><init>(Ljava/lang/String;)V",
            "Ljava/lang/Class;->getResourceAsStream(Ljava/lang/String;)Ljava/io/InputStream;",
            "Landroid/content/res/AssetManager;->open(Ljava/lang/String;)Ljava/io/InputStream;",
            "Landroid/content/Context;->openFileInput(Ljava/lang/String;)Ljava/io/FileInputStream;",
            "Ljava/util/Properties;->load(Ljava/io/InputStream;)V",
        ] {
            assert!(is_read_api(signature), "{signature}");
        }
    }

    #[test]
    fn test_other_calls() {
        for signature in [
            "Ljava/lang/String;->equals(Ljava/lang/Object;)Z",
            "Ljava/io/FileOutputStream;-><init>(Ljava/lang/String;)V",
            "Ljava/io/File;->exists()Z",
            "Lcom/example/Loader;->loadAll()V",
            "Landroid/content/res/AssetManager;->openFd(Ljava/lang/String;)Landroid/content/res/AssetFileDescriptor;",
        ] {
            assert!(!is_read_api(signature), "{signature}");
        }
    }

    #[test]
    fn test_group_by_class() {
        let hits = [
            hit("com.b.Channel", "read", &["Ljava/io/File;-><init>(Ljava/lang/String;)V"]),
            hit("com.a.Config", "<clinit>", &[]),
            hit(
                "com.b.Channel",
                "read",
                &[
                    "Ljava/io/File;-><init>(Ljava/lang/String;)V",
                    "Ljava/util/Properties;->load(Ljava/io/InputStream;)V",
                ],
            ),
            hit("com.b.Channel", "get", &[]),
        ];
        let grouped = group_by_class(&hits);
        assert_eq!(grouped.keys().collect::<Vec<_>>(), vec!["com.a.Config", "com.b.Channel"]);
        assert_eq!(
            grouped["com.b.Channel"],
            vec![
                ChannelMethod {
                    name: "read".into(),
                    read_calls: vec![
                        "Ljava/io/File;-><init>(Ljava/lang/String;)V".into(),
                        "Ljava/util/Properties;->load(Ljava/io/InputStream;)V".into(),
                    ],
                },
                ChannelMethod {
                    name: "get".into(),
                    read_calls: vec![],
                },
            ]
        );
        assert_eq!(grouped["com.a.Config"].len(), 1);
    }
}
