use crate::error::{RemapError, Result};
use crate::mapping::document::{ClassEntry, FieldEntry, MappingDocument, MethodEntry, pad_names};

/// Parse a Tiny v2 mapping file.
///
/// Single forward pass. Blank lines and `#` comments are skipped everywhere.
/// Parameter/local sub-records (indent >= 2) carry nothing the rename table
/// needs and are skipped; unknown class-level tags (comments) likewise.
/// Trailing missing name columns pad to `""`.
pub fn parse(content: &str) -> Result<MappingDocument> {
    let mut lines = content
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l))
        .filter(|(_, l)| {
            let t = l.trim();
            !t.is_empty() && !t.starts_with('#')
        });

    let (line_no, header) = lines
        .next()
        .ok_or_else(|| RemapError::format(0, "empty mapping file"))?;
    let namespaces = parse_header(line_no, header)?;

    let mut classes: Vec<ClassEntry> = Vec::new();
    let mut current: Option<ClassEntry> = None;

    for (line_no, line) in lines {
        let indent = line.chars().take_while(|&c| c == '\t').count();
        let fields: Vec<&str> = line.split('\t').collect();

        match indent {
            0 => {
                if fields[0] != "c" {
                    return Err(RemapError::format(
                        line_no,
                        format!("unexpected top-level tag `{}`", fields[0]),
                    ));
                }
                let names = row_names(line_no, &fields[1..], namespaces.len())?;
                if let Some(done) = current.replace(ClassEntry::new(names)) {
                    classes.push(done);
                }
            }
            1 => {
                let owner = match current.as_mut() {
                    Some(c) => c,
                    None => {
                        return Err(RemapError::format(line_no, "member line with no open class"));
                    }
                };
                match fields[1] {
                    "f" | "m" => {
                        if fields.len() < 3 || fields[2].is_empty() {
                            return Err(RemapError::format(
                                line_no,
                                "member line missing descriptor",
                            ));
                        }
                        let descriptor = fields[2].to_string();
                        let names = row_names(line_no, &fields[3..], namespaces.len())?;
                        if fields[1] == "f" {
                            owner.fields.push(FieldEntry {
                                descriptor: Some(descriptor),
                                names,
                            });
                        } else {
                            owner.methods.push(MethodEntry { descriptor, names });
                        }
                    }
                    // comments and other class-level records: not needed for renaming
                    _ => {}
                }
            }
            // parameter/local-variable sub-records: opaque here
            _ => {}
        }
    }
    if let Some(done) = current {
        classes.push(done);
    }

    Ok(MappingDocument {
        namespaces,
        classes,
    })
}

fn parse_header(line_no: usize, header: &str) -> Result<Vec<String>> {
    let fields: Vec<&str> = header.split('\t').collect();
    if fields[0] != "tiny" {
        return Err(RemapError::format(
            line_no,
            format!("expected `tiny` header, got `{}`", fields[0]),
        ));
    }
    if fields.len() < 3 {
        return Err(RemapError::format(line_no, "header missing version fields"));
    }
    for v in &fields[1..3] {
        if v.parse::<u32>().is_err() {
            return Err(RemapError::format(
                line_no,
                format!("bad format version `{v}`"),
            ));
        }
    }
    let namespaces: Vec<String> = fields[3..].iter().map(|s| s.to_string()).collect();
    if namespaces.len() < 2 {
        return Err(RemapError::format(
            line_no,
            "header declares fewer than two namespaces",
        ));
    }
    for (i, ns) in namespaces.iter().enumerate() {
        if namespaces[..i].contains(ns) {
            return Err(RemapError::format(
                line_no,
                format!("duplicate namespace `{ns}`"),
            ));
        }
    }
    Ok(namespaces)
}

fn row_names(line_no: usize, cols: &[&str], namespace_count: usize) -> Result<Vec<String>> {
    if cols.len() > namespace_count {
        return Err(RemapError::format(
            line_no,
            format!(
                "row has {} name columns for {} namespaces",
                cols.len(),
                namespace_count
            ),
        ));
    }
    Ok(pad_names(
        cols.iter().map(|s| s.to_string()).collect(),
        namespace_count,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
tiny\t2\t0\tofficial\tintermediary\tnamed
# header comment

c\ta\tnet/minecraft/class_1297\tnet/minecraft/world/entity/Entity
\tf\tI\tb\tfield_5974\tid
\tm\t(DDD)V\tc\tmethod_5814\tsetPos
\t\tp\t1\t\t\tx
\tm\t(I)V\tc\tmethod_9999\tsetId
c\tq\tnet/minecraft/class_2338
\tc\tclass-level comment, skipped
";

    #[test]
    fn parses_minimal_two_namespace_file() {
        let doc = parse("tiny\t2\t0\tofficial\tintermediary\nc\ta\tnet/minecraft/Entity\n")
            .expect("parse");
        assert_eq!(doc.namespaces, ["official", "intermediary"]);
        assert_eq!(doc.classes.len(), 1);
        assert_eq!(doc.classes[0].names, ["a", "net/minecraft/Entity"]);
    }

    #[test]
    fn class_count_and_name_widths_match_input() {
        let doc = parse(SAMPLE).expect("parse");
        assert_eq!(doc.classes.len(), 2);
        for class in &doc.classes {
            assert_eq!(class.names.len(), doc.namespaces.len());
            for f in &class.fields {
                assert_eq!(f.names.len(), doc.namespaces.len());
            }
            for m in &class.methods {
                assert_eq!(m.names.len(), doc.namespaces.len());
            }
        }
    }

    #[test]
    fn members_keep_document_order_and_descriptors() {
        let doc = parse(SAMPLE).expect("parse");
        let entity = &doc.classes[0];
        assert_eq!(entity.fields.len(), 1);
        assert_eq!(entity.fields[0].descriptor.as_deref(), Some("I"));
        assert_eq!(entity.methods.len(), 2);
        assert_eq!(entity.methods[0].descriptor, "(DDD)V");
        assert_eq!(entity.methods[1].names[2], "setId");
    }

    #[test]
    fn trailing_columns_zero_pad() {
        let doc = parse(SAMPLE).expect("parse");
        let block = &doc.classes[1];
        assert_eq!(block.names, ["q", "net/minecraft/class_2338", ""]);
    }

    #[test]
    fn sub_records_and_comments_are_skipped() {
        let doc = parse(SAMPLE).expect("parse");
        // parameter record under setPos produced no member
        assert_eq!(doc.classes[0].methods.len(), 2);
        assert!(doc.classes[1].fields.is_empty());
    }

    #[test]
    fn rejects_wrong_header_tag() {
        let err = parse("tinyv2\t2\t0\ta\tb\n").unwrap_err();
        assert!(matches!(err, RemapError::Format { line: 1, .. }));
    }

    #[test]
    fn rejects_non_numeric_version() {
        assert!(parse("tiny\t2\tx\ta\tb\n").is_err());
    }

    #[test]
    fn rejects_single_namespace() {
        assert!(parse("tiny\t2\t0\tonly\n").is_err());
    }

    #[test]
    fn rejects_member_before_class() {
        let err = parse("tiny\t2\t0\ta\tb\n\tf\tI\tx\ty\n").unwrap_err();
        assert!(matches!(err, RemapError::Format { line: 2, .. }));
    }

    #[test]
    fn rejects_member_without_descriptor() {
        assert!(parse("tiny\t2\t0\ta\tb\nc\tx\ty\n\tm\n").is_err());
    }

    #[test]
    fn rejects_row_wider_than_namespace_table() {
        assert!(parse("tiny\t2\t0\ta\tb\nc\tx\ty\tz\n").is_err());
    }
}
