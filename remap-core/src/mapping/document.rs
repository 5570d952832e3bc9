use serde::{Deserialize, Serialize};

/// Parsed form of one mapping file. Namespace-agnostic until a
/// [`crate::MappingTable`] is built from it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MappingDocument {
    /// Ordered, unique namespace names; position is the key used everywhere else.
    pub namespaces: Vec<String>,
    pub classes: Vec<ClassEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClassEntry {
    /// One name per namespace; `""` means unmapped in that namespace.
    pub names: Vec<String>,
    pub fields: Vec<FieldEntry>,
    pub methods: Vec<MethodEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldEntry {
    /// Type descriptor where the format carries one (tiny: always, legacy: the
    /// declared field type).
    pub descriptor: Option<String>,
    pub names: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MethodEntry {
    /// Mandatory: overloads share a name and differ only by descriptor.
    pub descriptor: String,
    pub names: Vec<String>,
}

impl MappingDocument {
    pub fn namespace_index(&self, namespace: &str) -> Option<usize> {
        self.namespaces.iter().position(|n| n == namespace)
    }

    pub fn field_count(&self) -> usize {
        self.classes.iter().map(|c| c.fields.len()).sum()
    }

    pub fn method_count(&self) -> usize {
        self.classes.iter().map(|c| c.methods.len()).sum()
    }
}

impl ClassEntry {
    pub fn new(names: Vec<String>) -> Self {
        Self {
            names,
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn name(&self, ns: usize) -> &str {
        &self.names[ns]
    }
}

/// Pad a name row out to the namespace count; missing trailing columns mean
/// "unmapped", not malformed.
pub fn pad_names(mut names: Vec<String>, namespace_count: usize) -> Vec<String> {
    while names.len() < namespace_count {
        names.push(String::new());
    }
    names
}
