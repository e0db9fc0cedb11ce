use std::collections::HashMap;

use log::warn;
use serde::Serialize;

use crate::{
    apk::DexEntry,
    dex::{defined_signature, walk_method, DexFile, Reference},
    errors::QueryError,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallerMatch {
    /// Calling class, `Lcom/example/Main;`
    pub class_name: String,
    pub caller_method: String,
    /// Full signature of the caller
    pub caller: String,
    /// First matching call site's target
    pub callee: String,
    pub dex_name: String,
}

/// Methods in `dex` that invoke any method named `target`. Each caller is
/// reported once, for its first matching call.
pub fn find_callers<T: AsRef<[u8]>>(
    dex: &DexFile<T>,
    target: &str,
    emit: &mut dyn FnMut(CallerMatch),
) {
    let mut is_target: HashMap<u16, bool> = HashMap::new();
    for class in dex.classes() {
        for method in class.methods() {
            let Some(walked) = walk_method(&class, method) else {
                continue;
            };
            if let Some(e) = walked.error {
                warn!("{}: {e}", dex.name);
            }
            let callee = walked.references.into_iter().find_map(|reference| {
                let Reference::Method(method_idx) = reference else {
                    return None;
                };
                let matched = *is_target.entry(method_idx).or_insert_with(|| {
                    dex.method_name(method_idx)
                        .map(|name| name == target)
                        .unwrap_or_else(|e| {
                            warn!("{}: method@{method_idx}: {e}", dex.name);
                            false
                        })
                });
                matched.then_some(method_idx)
            });
            let Some(callee_idx) = callee else {
                continue;
            };
            let callee = match dex.method_signature(callee_idx) {
                Ok(signature) => signature.to_string(),
                Err(_) => target.to_string(),
            };
            emit(CallerMatch {
                class_name: class.jtype().to_string(),
                caller_method: method.name().to_string(),
                caller: defined_signature(&class, method).to_string(),
                callee,
                dex_name: dex.name.clone(),
            });
        }
    }
}

/// Sequential scan of every DEX entry; a DEX that fails to load is logged
/// and skipped.
pub fn find_callers_in(entries: &[DexEntry], target: &str) -> Vec<CallerMatch> {
    let mut callers = Vec::new();
    for entry in entries {
        let result = scan_entry(entry, target, &mut |caller: CallerMatch| {
            callers.push(caller)
        });
        if let Err(e) = result {
            warn!("Error processing {}: {e}", entry.name);
        }
    }
    callers
}

fn scan_entry(
    entry: &DexEntry,
    target: &str,
    emit: &mut dyn FnMut(CallerMatch),
) -> Result<(), QueryError> {
    let dex = DexFile::load(&entry.name, &entry.data[..])?;
    find_callers(&dex, target, emit);
    Ok(())
}
