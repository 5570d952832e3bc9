use std::collections::HashMap;

use crate::error::{RemapError, Result};
use crate::mapping::document::{ClassEntry, FieldEntry, MappingDocument, MethodEntry};

/// Merge an `official -> intermediary` document with a ProGuard document
/// parsed as (`named` -> `official`) into an `intermediary -> named` output
/// suitable for remapping toward human-readable names.
///
/// Members are matched by `owner;name;descriptor` with a descriptor-less
/// fallback key; symbols with no named mapping fall back to their
/// intermediary name. Output descriptors are rewritten to intermediary class
/// names since that is the output's source namespace.
pub fn merge(tiny: &MappingDocument, proguard: &MappingDocument) -> Result<MappingDocument> {
    let official = namespace_index(tiny, "official")?;
    let inter = namespace_index(tiny, "intermediary")?;
    let pg_named = namespace_index(proguard, "named")?;
    let pg_official = namespace_index(proguard, "official")?;

    let lookup = NamedLookup::build(proguard, pg_named, pg_official);

    // obfuscated -> intermediary class names, for descriptor rewriting
    let mut obf_to_inter: HashMap<String, String> = HashMap::new();
    for class in &tiny.classes {
        let obf = class.name(official);
        let in_name = class.name(inter);
        if !obf.is_empty() && !in_name.is_empty() {
            obf_to_inter.insert(obf.to_string(), in_name.to_string());
        }
    }

    let mut out = MappingDocument {
        namespaces: vec!["intermediary".to_string(), "named".to_string()],
        classes: Vec::new(),
    };

    for class in &tiny.classes {
        let obf = class.name(official);
        let inter_name = class.name(inter);
        if inter_name.is_empty() {
            continue;
        }
        let named = lookup
            .classes
            .get(obf)
            .cloned()
            .unwrap_or_else(|| inter_name.to_string());

        let mut entry = ClassEntry::new(vec![inter_name.to_string(), named]);

        for field in &class.fields {
            let inter_field = &field.names[inter];
            if inter_field.is_empty() {
                continue;
            }
            let desc = field.descriptor.as_deref().unwrap_or("");
            let named_field = lookup
                .member(&lookup.fields, obf, &field.names[official], desc)
                .unwrap_or(inter_field)
                .to_string();
            entry.fields.push(FieldEntry {
                descriptor: Some(remap_descriptor(desc, &obf_to_inter)),
                names: vec![inter_field.to_string(), named_field],
            });
        }

        for method in &class.methods {
            let inter_method = &method.names[inter];
            if inter_method.is_empty() {
                continue;
            }
            let named_method = lookup
                .member(
                    &lookup.methods,
                    obf,
                    &method.names[official],
                    &method.descriptor,
                )
                .unwrap_or(inter_method)
                .to_string();
            entry.methods.push(MethodEntry {
                descriptor: remap_descriptor(&method.descriptor, &obf_to_inter),
                names: vec![inter_method.to_string(), named_method],
            });
        }

        out.classes.push(entry);
    }

    tracing::debug!(
        classes = out.classes.len(),
        fields = out.field_count(),
        methods = out.method_count(),
        "merged mapping documents"
    );
    Ok(out)
}

fn namespace_index(doc: &MappingDocument, namespace: &str) -> Result<usize> {
    doc.namespace_index(namespace)
        .ok_or_else(|| RemapError::NamespaceNotFound {
            namespace: namespace.to_string(),
        })
}

/// Lookup maps from the ProGuard side: obfuscated symbol -> named symbol.
struct NamedLookup {
    classes: HashMap<String, String>,
    fields: HashMap<String, String>,
    methods: HashMap<String, String>,
}

impl NamedLookup {
    fn build(proguard: &MappingDocument, named: usize, official: usize) -> Self {
        let mut classes = HashMap::new();
        let mut named_to_obf = HashMap::new();
        for class in &proguard.classes {
            let n = class.name(named);
            let o = class.name(official);
            if !n.is_empty() && !o.is_empty() {
                classes.insert(o.to_string(), n.to_string());
                named_to_obf.insert(n.to_string(), o.to_string());
            }
        }

        let mut fields = HashMap::new();
        let mut methods = HashMap::new();
        for class in &proguard.classes {
            let obf_class = class.name(official);
            if obf_class.is_empty() {
                continue;
            }
            for field in &class.fields {
                let n = &field.names[named];
                let o = &field.names[official];
                if n.is_empty() || o.is_empty() {
                    continue;
                }
                // ProGuard descriptors use named classes; rekey to obfuscated
                let desc = remap_descriptor(field.descriptor.as_deref().unwrap_or(""), &named_to_obf);
                fields.insert(format!("{obf_class};{o};{desc}"), n.clone());
                fields.insert(format!("{obf_class};{o}"), n.clone());
            }
            for method in &class.methods {
                let n = &method.names[named];
                let o = &method.names[official];
                if n.is_empty() || o.is_empty() {
                    continue;
                }
                let desc = remap_descriptor(&method.descriptor, &named_to_obf);
                methods.insert(format!("{obf_class};{o};{desc}"), n.clone());
                methods.insert(format!("{obf_class};{o}"), n.clone());
            }
        }

        Self {
            classes,
            fields,
            methods,
        }
    }

    fn member<'a>(
        &self,
        map: &'a HashMap<String, String>,
        owner: &str,
        name: &str,
        desc: &str,
    ) -> Option<&'a str> {
        if owner.is_empty() || name.is_empty() {
            return None;
        }
        map.get(&format!("{owner};{name};{desc}"))
            .or_else(|| map.get(&format!("{owner};{name}")))
            .map(String::as_str)
    }
}

/// Rewrite the `L<class>;` references in a JVM descriptor through the given
/// class map, keeping unmapped classes (e.g. `java/lang/*`) as-is.
pub fn remap_descriptor(desc: &str, classes: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(desc.len());
    let mut rest = desc;
    while let Some(start) = rest.find('L') {
        let Some(end) = rest[start..].find(';').map(|e| start + e) else {
            break;
        };
        out.push_str(&rest[..=start]);
        let class = &rest[start + 1..end];
        out.push_str(classes.get(class).map(String::as_str).unwrap_or(class));
        out.push(';');
        rest = &rest[end + 1..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{proguard, tiny};

    const TINY: &str = "\
tiny\t2\t0\tofficial\tintermediary
c\ta\tnet/minecraft/class_1297
\tf\tI\tb\tfield_1
\tm\t(Lc;)V\td\tmethod_1
\tm\t(I)V\td\tmethod_2
c\tc\tnet/minecraft/class_243
c\tz\tnet/minecraft/class_999
";

    const PROGUARD: &str = "\
net.minecraft.world.entity.Entity -> a:
    int id -> b
    void setPos(net.minecraft.world.phys.Vec3) -> d
    void setId(int) -> d
net.minecraft.world.phys.Vec3 -> c:
";

    fn merged() -> MappingDocument {
        let tiny_doc = tiny::parse(TINY).expect("tiny");
        let pg_doc = proguard::parse(PROGUARD, "named", "official").expect("proguard");
        merge(&tiny_doc, &pg_doc).expect("merge")
    }

    #[test]
    fn output_is_intermediary_to_named() {
        let doc = merged();
        assert_eq!(doc.namespaces, ["intermediary", "named"]);
        assert_eq!(doc.classes[0].names[0], "net/minecraft/class_1297");
        assert_eq!(
            doc.classes[0].names[1],
            "net/minecraft/world/entity/Entity"
        );
    }

    #[test]
    fn overloads_resolve_through_remapped_descriptors() {
        let doc = merged();
        let methods = &doc.classes[0].methods;
        assert_eq!(methods[0].names, ["method_1", "setPos"]);
        assert_eq!(methods[1].names, ["method_2", "setId"]);
    }

    #[test]
    fn output_descriptors_use_intermediary_classes() {
        let doc = merged();
        assert_eq!(
            doc.classes[0].methods[0].descriptor,
            "(Lnet/minecraft/class_243;)V"
        );
    }

    #[test]
    fn unmapped_symbols_fall_back_to_intermediary() {
        let doc = merged();
        let orphan = &doc.classes[2];
        assert_eq!(orphan.names, ["net/minecraft/class_999", "net/minecraft/class_999"]);
    }

    #[test]
    fn fields_match_with_descriptor_fallback() {
        let doc = merged();
        assert_eq!(doc.classes[0].fields[0].names, ["field_1", "id"]);
    }

    #[test]
    fn missing_intermediary_column_is_reported() {
        let tiny_doc = tiny::parse("tiny\t2\t0\tofficial\tnamed\nc\ta\tb\n").expect("tiny");
        let pg_doc = proguard::parse(PROGUARD, "named", "official").expect("proguard");
        let err = merge(&tiny_doc, &pg_doc).unwrap_err();
        assert!(matches!(err, RemapError::NamespaceNotFound { namespace } if namespace == "intermediary"));
    }

    #[test]
    fn remap_descriptor_keeps_unmapped_and_arrays() {
        let mut map = HashMap::new();
        map.insert("a".to_string(), "X".to_string());
        assert_eq!(remap_descriptor("([La;Ljava/lang/String;)V", &map), "([LX;Ljava/lang/String;)V");
        assert_eq!(remap_descriptor("(I)J", &map), "(I)J");
    }
}
