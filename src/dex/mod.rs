mod errors;
mod instruction;
mod method;
mod opcode;

pub use self::{
    errors::{InstructionError, MethodError},
    instruction::{Instruction, Instructions, Reference},
    method::{descriptor_to_dotted, MethodSignature},
    opcode::Opcode,
};

use dex::{class::Class, method::Method, Dex, DexReader};
use log::{debug, warn};

/// One loaded `classes*.dex`, tagged with its archive name. The bytes are
/// either owned or borrowed from the archive entry.
pub struct DexFile<T = Vec<u8>> {
    pub name: String,
    inner: Dex<T>,
}

impl<T: AsRef<[u8]>> DexFile<T> {
    pub fn load(name: impl Into<String>, buf: T) -> Result<Self, dex::Error> {
        let name = name.into();
        let inner = DexReader::from_vec(buf)?;
        debug!("Loaded {name}");
        Ok(Self { name, inner })
    }

    /// Class definitions; a class that fails to load is logged and skipped.
    pub fn classes(&self) -> impl Iterator<Item = Class> + '_ {
        self.inner
            .classes()
            .filter_map(move |result_class| match result_class {
                Ok(class) => Some(class),
                Err(e) => {
                    warn!("{}: skipping class: {e}", self.name);
                    None
                }
            })
    }

    pub fn string(&self, string_idx: u32) -> Result<String, dex::Error> {
        Ok(self.inner.get_string(string_idx)?.to_string())
    }

    pub fn method_name(&self, method_idx: u16) -> Result<String, dex::Error> {
        let method_item = self.inner.get_method_item(method_idx as u64)?;
        Ok(self
            .inner
            .get_string(method_item.name_idx() as u32)?
            .to_string())
    }

    pub fn method_signature(&self, method_idx: u16) -> Result<MethodSignature, dex::Error> {
        let method_item = self.inner.get_method_item(method_idx as u64)?;
        let class_type = self.inner.get_type(method_item.class_idx() as u32)?;
        let name = self.inner.get_string(method_item.name_idx() as u32)?;
        let proto = self.inner.get_proto_item(method_item.proto_idx() as u64)?;
        let return_type = self.inner.get_type(proto.return_type())?;
        let params = if proto.params_off() == 0 {
            Vec::new()
        } else {
            self.inner.get_interfaces(proto.params_off())?
        };
        Ok(MethodSignature::new(
            &class_type,
            &name,
            Some(params.as_slice()),
            &return_type,
        ))
    }
}

/// Constant-pool references of one method body, in code order. When the
/// walk hits a malformed instruction, the references before it are kept and
/// the error is returned alongside them.
#[derive(Debug, Default)]
pub struct WalkedMethod {
    pub references: Vec<Reference>,
    pub error: Option<MethodError>,
}

/// `None` for methods without code (abstract, native).
pub fn walk_method(class: &Class, method: &Method) -> Option<WalkedMethod> {
    let code = method.code()?;
    let insns: &[u16] = code.insns();
    let mut walked = WalkedMethod::default();
    for reference in Instructions::new(insns).references() {
        match reference {
            Ok(reference) => walked.references.push(reference),
            Err(source) => {
                walked.error = Some(MethodError {
                    class_name: class.jtype().to_string(),
                    method_name: method.name().to_string(),
                    source,
                });
            }
        }
    }
    Some(walked)
}

/// Signature of a method defined in `class`.
pub fn defined_signature(class: &Class, method: &Method) -> MethodSignature {
    MethodSignature::new(
        class.jtype(),
        method.name(),
        method.params().map(|params| &params[..]),
        method.return_type(),
    )
}

#[cfg(test)]
pub(crate) fn fixture() -> DexFile {
    let buf = std::fs::read("tests/dex/queries.dex").unwrap();
    DexFile::load("classes.dex", buf).unwrap()
}
