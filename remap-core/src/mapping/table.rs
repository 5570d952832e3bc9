use std::collections::HashMap;

use crate::error::{RemapError, Result};
use crate::mapping::document::MappingDocument;

/// Directional rename table for one (from, to) namespace pair.
///
/// Built in a single pass over the document; the document is never mutated,
/// so any number of directional tables can share one parse. Lookup miss is a
/// plain `None`, not an error.
#[derive(Clone, Debug, Default)]
pub struct MappingTable {
    from: String,
    to: String,
    classes: HashMap<String, String>,
    /// `owner.field` -> `translatedOwner.translatedField`
    fields: HashMap<String, String>,
    /// `owner.method<descriptor>` -> `translatedOwner.translatedMethod`;
    /// the source-side descriptor disambiguates overloads, the target name is
    /// left unqualified since call sites resolve overloads themselves.
    methods: HashMap<String, String>,
}

impl MappingTable {
    pub fn build(doc: &MappingDocument, from: &str, to: &str) -> Result<Self> {
        let from_idx = doc
            .namespace_index(from)
            .ok_or_else(|| RemapError::NamespaceNotFound {
                namespace: from.to_string(),
            })?;
        let to_idx = doc
            .namespace_index(to)
            .ok_or_else(|| RemapError::NamespaceNotFound {
                namespace: to.to_string(),
            })?;

        let mut table = MappingTable {
            from: from.to_string(),
            to: to.to_string(),
            ..Default::default()
        };

        for class in &doc.classes {
            let owner = class.name(from_idx);
            if owner.is_empty() {
                continue;
            }
            let owner_to = translated(owner, class.name(to_idx));
            table
                .classes
                .insert(owner.to_string(), owner_to.to_string());

            for field in &class.fields {
                let name = &field.names[from_idx];
                if name.is_empty() {
                    continue;
                }
                let name_to = translated(name, &field.names[to_idx]);
                table
                    .fields
                    .insert(format!("{owner}.{name}"), format!("{owner_to}.{name_to}"));
            }
            for method in &class.methods {
                let name = &method.names[from_idx];
                if name.is_empty() {
                    continue;
                }
                let name_to = translated(name, &method.names[to_idx]);
                table.methods.insert(
                    format!("{owner}.{name}{}", method.descriptor),
                    format!("{owner_to}.{name_to}"),
                );
            }
        }
        Ok(table)
    }

    pub fn from_namespace(&self) -> &str {
        &self.from
    }

    pub fn to_namespace(&self) -> &str {
        &self.to
    }

    pub fn class(&self, name: &str) -> Option<&str> {
        self.classes.get(name).map(String::as_str)
    }

    pub fn field(&self, owner: &str, name: &str) -> Option<&str> {
        self.fields
            .get(&format!("{owner}.{name}"))
            .map(String::as_str)
    }

    pub fn method(&self, owner: &str, name: &str, descriptor: &str) -> Option<&str> {
        self.methods
            .get(&format!("{owner}.{name}{descriptor}"))
            .map(String::as_str)
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }
}

/// An empty target-side slot means "unmapped there"; fall back to the source
/// name rather than dropping the entry.
fn translated<'a>(from_name: &'a str, to_name: &'a str) -> &'a str {
    if to_name.is_empty() { from_name } else { to_name }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::tiny;

    const SAMPLE: &str = "\
tiny\t2\t0\tofficial\tintermediary
c\ta\tnet/minecraft/Entity
\tf\tI\tb\tid
\tm\t(DDD)V\tc\tsetPos
\tm\t(I)V\tc\tsetId
c\tq\t
";

    fn doc() -> crate::MappingDocument {
        tiny::parse(SAMPLE).expect("parse")
    }

    #[test]
    fn translates_classes_fields_methods() {
        let table = MappingTable::build(&doc(), "official", "intermediary").expect("build");
        assert_eq!(table.class("a"), Some("net/minecraft/Entity"));
        assert_eq!(table.field("a", "b"), Some("net/minecraft/Entity.id"));
        assert_eq!(
            table.method("a", "c", "(DDD)V"),
            Some("net/minecraft/Entity.setPos")
        );
    }

    #[test]
    fn lookup_miss_is_none() {
        let table = MappingTable::build(&doc(), "official", "intermediary").expect("build");
        assert_eq!(table.class("b"), None);
        assert_eq!(table.field("a", "nope"), None);
    }

    #[test]
    fn overloads_translate_independently() {
        let table = MappingTable::build(&doc(), "official", "intermediary").expect("build");
        assert_eq!(
            table.method("a", "c", "(DDD)V"),
            Some("net/minecraft/Entity.setPos")
        );
        assert_eq!(
            table.method("a", "c", "(I)V"),
            Some("net/minecraft/Entity.setId")
        );
        assert_eq!(table.method("a", "c", "()V"), None);
    }

    #[test]
    fn round_trips_between_directional_tables() {
        let doc = doc();
        let fwd = MappingTable::build(&doc, "official", "intermediary").expect("fwd");
        let back = MappingTable::build(&doc, "intermediary", "official").expect("back");
        let there = fwd.class("a").expect("mapped");
        assert_eq!(back.class(there), Some("a"));
    }

    #[test]
    fn missing_namespace_is_reported_by_name() {
        let err = MappingTable::build(&doc(), "official", "named").unwrap_err();
        match err {
            RemapError::NamespaceNotFound { namespace } => assert_eq!(namespace, "named"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_target_slot_falls_back_to_source_name() {
        let table = MappingTable::build(&doc(), "official", "intermediary").expect("build");
        assert_eq!(table.class("q"), Some("q"));
    }
}
