use std::collections::BTreeSet;

use axmldecoder::{Node, ParseError, XmlDocument};
use log::warn;
use serde::Serialize;

/// The parts of `AndroidManifest.xml` shown in report headers.
#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct Manifest {
    pub package: Option<String>,
    pub version_name: Option<String>,
    pub permissions: BTreeSet<String>,
}

pub fn parse(buf: &[u8]) -> Result<Option<Manifest>, ParseError> {
    let XmlDocument { root } = axmldecoder::parse(buf)?;
    match root {
        Some(Node::Element(root)) => {
            let mut manifest = Manifest {
                package: root.attributes.get("package").map(|s| s.to_string()),
                version_name: root
                    .attributes
                    .get("android:versionName")
                    .map(|s| s.to_string()),
                ..Default::default()
            };
            for node in root.children {
                if let Node::Element(mut element) = node {
                    if element.get_tag() == "uses-permission" {
                        if let Some(name) = element.attributes.remove("android:name") {
                            manifest.permissions.insert(name);
                        }
                    }
                }
            }
            Ok(Some(manifest))
        }
        Some(other) => {
            warn!("Unexpected root node: {other:?}");
            Ok(None)
        }
        None => Ok(None),
    }
}
