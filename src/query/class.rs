use serde::Serialize;

use crate::{
    apk::DexEntry,
    dex::{descriptor_to_dotted, DexFile},
    errors::QueryError,
    flags::access_flags_to_string,
    pattern::ClassPattern,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassMatch {
    /// `Lcom/example/Class;`
    pub raw_name: String,
    /// `com.example.Class`
    pub dot_name: String,
    pub dex_name: String,
    pub access_flags: u32,
    pub method_count: usize,
    pub field_count: usize,
}

impl ClassMatch {
    pub fn access(&self) -> String {
        access_flags_to_string(self.access_flags)
    }
}

pub fn find_classes<T: AsRef<[u8]>>(
    dex: &DexFile<T>,
    pattern: &ClassPattern,
    emit: &mut dyn FnMut(ClassMatch),
) {
    for class in dex.classes() {
        let raw_name = class.jtype().to_string();
        let dot_name = descriptor_to_dotted(&raw_name);
        if !pattern.matches(&raw_name, &dot_name) {
            continue;
        }
        emit(ClassMatch {
            access_flags: class.access_flags().bits() as u32,
            method_count: class.methods().count(),
            field_count: class.fields().count(),
            dex_name: dex.name.clone(),
            raw_name,
            dot_name,
        });
    }
}

/// Pool worker for `find_class`.
pub fn scan_entry(
    entry: &DexEntry,
    pattern: &ClassPattern,
    emit: &mut dyn FnMut(ClassMatch),
) -> Result<(), QueryError> {
    let dex = DexFile::load(&entry.name, &entry.data[..])?;
    find_classes(&dex, pattern, emit);
    Ok(())
}
