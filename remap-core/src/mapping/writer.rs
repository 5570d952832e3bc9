use std::fmt::Write as _;

use crate::mapping::document::MappingDocument;

/// Serialize a document as Tiny v2 text. Output order is document order, so
/// serialization is deterministic for a given document.
pub fn write_tiny(doc: &MappingDocument) -> String {
    let mut out = String::new();
    let _ = write!(out, "tiny\t2\t0");
    for ns in &doc.namespaces {
        let _ = write!(out, "\t{ns}");
    }
    out.push('\n');

    for class in &doc.classes {
        out.push('c');
        for name in &class.names {
            let _ = write!(out, "\t{name}");
        }
        out.push('\n');
        for field in &class.fields {
            let _ = write!(out, "\tf\t{}", field.descriptor.as_deref().unwrap_or(""));
            for name in &field.names {
                let _ = write!(out, "\t{name}");
            }
            out.push('\n');
        }
        for method in &class.methods {
            let _ = write!(out, "\tm\t{}", method.descriptor);
            for name in &method.names {
                let _ = write!(out, "\t{name}");
            }
            out.push('\n');
        }
    }
    out
}
