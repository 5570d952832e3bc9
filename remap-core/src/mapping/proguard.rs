use crate::error::{RemapError, Result};
use crate::mapping::document::{ClassEntry, FieldEntry, MappingDocument, MethodEntry};

/// Parse a legacy ProGuard-style rename table into a two-namespace document.
///
/// The caller names the two namespaces (left column, right column) since the
/// format carries no namespace header. Class-internal dots normalize to the
/// slash-qualified form used everywhere else. Method signatures are converted
/// to JVM descriptors so overloads key the same way tiny documents do.
pub fn parse(content: &str, left_ns: &str, right_ns: &str) -> Result<MappingDocument> {
    let namespaces = vec![left_ns.to_string(), right_ns.to_string()];
    let mut classes: Vec<ClassEntry> = Vec::new();
    let mut current: Option<ClassEntry> = None;

    for (line_no, raw) in content.lines().enumerate().map(|(i, l)| (i + 1, l)) {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let indented = raw.starts_with(' ') || raw.starts_with('\t');

        if indented {
            let owner = match current.as_mut() {
                Some(c) => c,
                None => {
                    return Err(RemapError::format(line_no, "member line with no open class"));
                }
            };
            parse_member(line_no, trimmed, owner)?;
        } else {
            let (left, right) = split_arrow(line_no, trimmed)?;
            let right = right.strip_suffix(':').ok_or_else(|| {
                RemapError::format(line_no, "class header missing trailing `:`")
            })?;
            if left.contains(' ') || right.contains(' ') {
                return Err(RemapError::format(
                    line_no,
                    "class header does not match grammar",
                ));
            }
            if let Some(done) = current.replace(ClassEntry::new(vec![
                normalize_class(left),
                normalize_class(right),
            ])) {
                classes.push(done);
            }
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

fn parse_member(line_no: usize, line: &str, owner: &mut ClassEntry) -> Result<()> {
    let (left, renamed) = split_arrow(line_no, line)?;
    // methods carry an optional `<from>:<to>:` source-line prefix
    let left = strip_line_range(left);
    let (ty, name_and_params) = left
        .split_once(' ')
        .ok_or_else(|| RemapError::format(line_no, "member line missing type token"))?;
    if name_and_params.contains(' ') || renamed.contains(' ') {
        return Err(RemapError::format(line_no, "member line does not match grammar"));
    }

    match name_and_params.split_once('(') {
        Some((name, rest)) => {
            let params = rest
                .strip_suffix(')')
                .ok_or_else(|| RemapError::format(line_no, "unterminated parameter list"))?;
            let descriptor = method_descriptor(line_no, ty, params)?;
            owner.methods.push(MethodEntry {
                descriptor,
                names: vec![name.to_string(), renamed.to_string()],
            });
        }
        None => {
            owner.fields.push(FieldEntry {
                descriptor: Some(type_descriptor(line_no, ty)?),
                names: vec![name_and_params.to_string(), renamed.to_string()],
            });
        }
    }
    Ok(())
}

/// Split on the single ` -> ` separator; anything else is a hard parse error
/// rather than a guessed split point.
fn split_arrow(line_no: usize, line: &str) -> Result<(&str, &str)> {
    let mut parts = line.split(" -> ");
    match (parts.next(), parts.next(), parts.next()) {
        (Some(l), Some(r), None) if !l.is_empty() && !r.is_empty() => Ok((l, r)),
        _ => Err(RemapError::format(
            line_no,
            "expected exactly one ` -> ` separator",
        )),
    }
}

fn strip_line_range(s: &str) -> &str {
    let mut parts = s.splitn(3, ':');
    if let (Some(a), Some(b), Some(rest)) = (parts.next(), parts.next(), parts.next()) {
        if a.parse::<u32>().is_ok() && b.parse::<u32>().is_ok() {
            return rest;
        }
    }
    s
}

fn normalize_class(name: &str) -> String {
    name.replace('.', "/")
}

fn method_descriptor(line_no: usize, return_type: &str, params: &str) -> Result<String> {
    let mut out = String::from("(");
    if !params.is_empty() {
        for p in params.split(',') {
            out.push_str(&type_descriptor(line_no, p)?);
        }
    }
    out.push(')');
    out.push_str(&type_descriptor(line_no, return_type)?);
    Ok(out)
}

/// Java source type name to JVM descriptor, e.g. `double[]` -> `[D`,
/// `net.minecraft.Entity` -> `Lnet/minecraft/Entity;`.
fn type_descriptor(line_no: usize, ty: &str) -> Result<String> {
    let mut dims = 0;
    let mut base = ty;
    while let Some(stripped) = base.strip_suffix("[]") {
        base = stripped;
        dims += 1;
    }
    if base.is_empty() {
        return Err(RemapError::format(line_no, format!("bad type `{ty}`")));
    }
    let elem = match base {
        "void" => "V".to_string(),
        "boolean" => "Z".to_string(),
        "byte" => "B".to_string(),
        "char" => "C".to_string(),
        "short" => "S".to_string(),
        "int" => "I".to_string(),
        "long" => "J".to_string(),
        "float" => "F".to_string(),
        "double" => "D".to_string(),
        _ => format!("L{};", normalize_class(base)),
    };
    Ok(format!("{}{}", "[".repeat(dims), elem))
}
