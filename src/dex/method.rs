use std::fmt;

use dex::{jtype::Type, string::DexString};
use serde::Serialize;

/// Fully resolved `method_ids` entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MethodSignature {
    pub class_type: String,
    pub name: String,
    pub params: Vec<String>,
    pub return_type: String,
}

impl MethodSignature {
    pub fn new(
        class_type: &Type,
        name: &DexString,
        params: Option<&[Type]>,
        return_type: &Type,
    ) -> Self {
        Self {
            class_type: class_type.to_string(),
            name: name.to_string(),
            params: params
                .map(|params| params.iter().map(|t| t.to_string()).collect())
                .unwrap_or_default(),
            return_type: return_type.to_string(),
        }
    }
}

/// Smali reference form, `Lpkg/Cls;->name(Lparam;I)V`.
impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}->{}({}){}",
            self.class_type,
            self.name,
            self.params.concat(),
            self.return_type
        )
    }
}

/// `Lcom/example/Class;` -> `com.example.Class`. Array and primitive
/// descriptors come back unchanged.
pub fn descriptor_to_dotted(descriptor: &str) -> String {
    match descriptor
        .strip_prefix('L')
        .and_then(|s| s.strip_suffix(';'))
    {
        Some(inner) => inner.replace('/', "."),
        None => descriptor.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{descriptor_to_dotted, MethodSignature};

    #[test]
    fn test_descriptor_to_dotted() {
        assert_eq!(descriptor_to_dotted("Lcom/example/Main;"), "com.example.Main");
        assert_eq!(
            descriptor_to_dotted("Lcom/example/Main$Inner;"),
            "com.example.Main$Inner"
        );
        assert_eq!(descriptor_to_dotted("LTestBasic;"), "TestBasic");
        assert_eq!(descriptor_to_dotted("[Ljava/lang/String;"), "[Ljava/lang/String;");
        assert_eq!(descriptor_to_dotted("I"), "I");
    }

    #[test]
    fn test_signature_display() {
        let signature = MethodSignature {
            class_type: "Lcom/example/Client;".into(),
            name: "onReceivedSslError".into(),
            params: vec![
                "Landroid/webkit/WebView;".into(),
                "Landroid/webkit/SslErrorHandler;".into(),
                "Landroid/net/http/SslError;".into(),
            ],
            return_type: "V".into(),
        };
        assert_eq!(
            signature.to_string(),
            "Lcom/example/Client;->onReceivedSslError(Landroid/webkit/WebView;\
             Landroid/webkit/SslErrorHandler;Landroid/net/http/SslError;)V"
        );
    }

    #[test]
    fn test_signature_without_params() {
        let signature = MethodSignature {
            class_type: "LTestBasic;".into(),
            name: "<init>".into(),
            params: vec![],
            return_type: "V".into(),
        };
        assert_eq!(signature.to_string(), "LTestBasic;-><init>()V");
    }
}
