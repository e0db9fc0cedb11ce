use serde::Serialize;

use crate::{
    apk::DexEntry,
    dex::{defined_signature, DexFile, MethodSignature},
    errors::QueryError,
    flags::access_flags_to_string,
};

pub const SSL_ERROR_HANDLER: &str = "onReceivedSslError";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodMatch {
    /// Defining class, `Lcom/example/Client;`
    pub class_name: String,
    pub signature: MethodSignature,
    pub access_flags: u32,
    pub has_code: bool,
    pub dex_name: String,
}

impl MethodMatch {
    pub fn access(&self) -> String {
        access_flags_to_string(self.access_flags)
    }
}

/// Methods defined in `dex` whose name is exactly `name`.
pub fn find_methods_named<T: AsRef<[u8]>>(
    dex: &DexFile<T>,
    name: &str,
    emit: &mut dyn FnMut(MethodMatch),
) {
    for class in dex.classes() {
        for method in class.methods() {
            if method.name().to_string() != name {
                continue;
            }
            emit(MethodMatch {
                class_name: class.jtype().to_string(),
                signature: defined_signature(&class, method),
                access_flags: method.access_flags().bits() as u32,
                has_code: method.code().is_some(),
                dex_name: dex.name.clone(),
            });
        }
    }
}

/// Pool worker for `find_method`.
pub fn scan_entry(
    entry: &DexEntry,
    name: &str,
    emit: &mut dyn FnMut(MethodMatch),
) -> Result<(), QueryError> {
    let dex = DexFile::load(&entry.name, &entry.data[..])?;
    find_methods_named(&dex, name, emit);
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{find_methods_named, scan_entry, MethodMatch, SSL_ERROR_HANDLER};
    use crate::{apk::DexEntry, dex::fixture};

    fn named(name: &str) -> Vec<MethodMatch> {
        let mut found = Vec::new();
        find_methods_named(&fixture(), name, &mut |method: MethodMatch| found.push(method));
        found
    }

    #[test]
    fn test_ssl_error_handlers() {
        let found = named(SSL_ERROR_HANDLER);
        let rendered: Vec<_> = found
            .iter()
            .map(|m| (m.signature.to_string(), m.access(), m.has_code))
            .collect();
        assert_eq!(
            rendered,
            vec![
                (
                    "Lcom/example/SslCallback;->onReceivedSslError(Landroid/webkit/WebView;Landroid/webkit/SslErrorHandler;Landroid/net/http/SslError;)V".to_string(),
                    "public abstract".to_string(),
                    false
                ),
                (
                    "Lcom/example/TrustAllClient;->onReceivedSslError(Landroid/webkit/WebView;Landroid/webkit/SslErrorHandler;Landroid/net/http/SslError;)V".to_string(),
                    "public".to_string(),
                    true
                ),
            ]
        );
        assert_eq!(found[1].class_name, "Lcom/example/TrustAllClient;");
        assert_eq!(found[1].dex_name, "classes.dex");
    }

    #[test]
    fn test_exact_name_only() {
        assert!(named("onReceived").is_empty());
        assert!(named("onreceivedsslerror").is_empty());
        // a name that is only called, never defined
        assert!(named("proceed").is_empty());
        let found = named("run");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].access(), "public static");
        assert_eq!(found[0].signature.params, vec!["Lcom/example/Uploader;"]);
    }

    #[test]
    fn test_scan_entry() {
        let entry = DexEntry {
            name: "classes2.dex".into(),
            data: std::fs::read("tests/dex/queries.dex").unwrap(),
        };
        let mut found = Vec::new();
        scan_entry(&entry, "sendPing", &mut |method: MethodMatch| found.push(method)).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].dex_name, "classes2.dex");
        assert!(found[0].signature.params.is_empty());
    }
}
