//! Xcode-style serializer: objects grouped into `isa` sections, `PBXBuildFile`
//! and `PBXFileReference` entries on a single line, reference comments after
//! every object id.

use std::{
    borrow::Cow,
    collections::{BTreeMap, HashMap},
};

use super::{BUILD_FILE_ISA, Dict, FILE_REFERENCE_ISA, Format, PROJECT_ISA, Value, field, unquote};

const HEADER: &str = "// !$*UTF8*$!";

pub(super) fn render(format: &Format) -> String {
    let comments = comment_index(format);
    let mut out = String::new();
    out.push_str(HEADER);
    out.push_str("\n{\n");
    for (key, value) in &format.root {
        match (key.as_str(), value) {
            ("objects", Value::Dict(objects)) => write_objects(&mut out, objects, &comments),
            _ => write_entry(&mut out, key, value, 1, &comments),
        }
    }
    out.push_str("}\n");
    out
}

fn write_objects(out: &mut String, objects: &Dict, comments: &HashMap<String, String>) {
    let mut sections: BTreeMap<&str, Vec<(&String, &Value)>> = BTreeMap::new();
    for (key, value) in objects {
        let isa = value
            .as_dict()
            .and_then(|o| o.get("isa"))
            .and_then(Value::as_str)
            .unwrap_or("Unknown");
        sections.entry(isa).or_default().push((key, value));
    }

    out.push_str("\tobjects = {\n");
    for (isa, mut entries) in sections {
        entries.sort_by(|a, b| a.0.cmp(b.0));
        let inline = isa == BUILD_FILE_ISA || isa == FILE_REFERENCE_ISA;
        out.push_str(&format!("\n/* Begin {isa} section */\n"));
        for (key, value) in entries {
            indent(out, 2);
            write_string(out, key, comments);
            out.push_str(" = ");
            write_value(out, value, 2, inline, "", comments);
            out.push_str(";\n");
        }
        out.push_str(&format!("/* End {isa} section */\n"));
    }
    out.push_str("\t};\n");
}

fn write_entry(
    out: &mut String,
    key: &str,
    value: &Value,
    depth: usize,
    comments: &HashMap<String, String>,
) {
    indent(out, depth);
    out.push_str(&quote(key));
    out.push_str(" = ");
    write_value(out, value, depth, false, key, comments);
    out.push_str(";\n");
}

fn write_value(
    out: &mut String,
    value: &Value,
    depth: usize,
    inline: bool,
    key: &str,
    comments: &HashMap<String, String>,
) {
    match value {
        // remote ids point into other projects and never carry a comment
        Value::String(s) if key == "remoteGlobalIDString" => out.push_str(&quote(s)),
        Value::String(s) => write_string(out, s, comments),
        Value::Array(items) if inline => {
            out.push('(');
            for item in items {
                write_value(out, item, depth, true, key, comments);
                out.push_str(", ");
            }
            out.push(')');
        }
        Value::Array(items) => {
            out.push_str("(\n");
            for item in items {
                indent(out, depth + 1);
                write_value(out, item, depth + 1, false, key, comments);
                out.push_str(",\n");
            }
            indent(out, depth);
            out.push(')');
        }
        Value::Dict(dict) if inline => {
            out.push('{');
            for (k, v) in dict {
                out.push_str(&quote(k));
                out.push_str(" = ");
                write_value(out, v, depth, true, k, comments);
                out.push_str("; ");
            }
            out.push('}');
        }
        Value::Dict(dict) => {
            out.push_str("{\n");
            for (k, v) in dict {
                write_entry(out, k, v, depth + 1, comments);
            }
            indent(out, depth);
            out.push('}');
        }
    }
}

fn write_string(out: &mut String, s: &str, comments: &HashMap<String, String>) {
    out.push_str(&quote(s));
    if let Some(comment) = comments.get(s) {
        out.push_str(" /* ");
        out.push_str(comment);
        out.push_str(" */");
    }
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push('\t');
    }
}

fn quote(s: &str) -> Cow<'_, str> {
    let bare = !s.is_empty()
        && s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'$' | b'/' | b':' | b'.'))
        && !s.contains("//")
        && !s.contains("/*");
    if bare {
        return Cow::Borrowed(s);
    }
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('"');
    for c in s.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            '\r' => quoted.push_str("\\r"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    Cow::Owned(quoted)
}

/// Comments for every object id: those read from the file win, the rest are
/// derived the way Xcode names them.
fn comment_index(format: &Format) -> HashMap<String, String> {
    let mut index = HashMap::new();
    let Ok(objects) = format.objects() else {
        return format.comments.clone();
    };

    let named = |object: &Dict| field(object, "name").or_else(|| field(object, "path"));
    let set = |index: &mut HashMap<String, String>, key: &str, comment: String| {
        let comment = format.comments.get(key).cloned().unwrap_or(comment);
        index.insert(key.to_string(), comment);
    };

    let dicts = || {
        objects
            .iter()
            .filter_map(|(key, value)| Some((key.as_str(), value.as_dict()?)))
    };

    for (key, object) in dicts() {
        let isa = field(object, "isa").unwrap_or_default();
        let comment = if isa == PROJECT_ISA {
            Some("Project object".to_string())
        } else if isa.ends_with("BuildPhase") {
            Some(named(object).unwrap_or_else(|| default_phase_name(&isa)))
        } else if isa == BUILD_FILE_ISA || isa == "XCConfigurationList" {
            None
        } else {
            named(object)
        };
        if let Some(comment) = comment {
            set(&mut index, key, comment);
        }
    }

    let mut phase_of = HashMap::new();
    for (key, object) in dicts() {
        let Some(files) = object.get("files").and_then(Value::as_array) else {
            continue;
        };
        if let Some(phase) = index.get(key) {
            for file in files.iter().filter_map(Value::as_str) {
                phase_of.insert(unquote(file), phase.clone());
            }
        }
    }

    for (key, object) in dicts() {
        if field(object, "isa").as_deref() == Some(BUILD_FILE_ISA) {
            let file = field(object, "fileRef")
                .or_else(|| field(object, "productRef"))
                .and_then(|file| index.get(&file).cloned())
                .unwrap_or_else(|| "(null)".to_string());
            let comment = match phase_of.get(key) {
                Some(phase) => format!("{file} in {phase}"),
                None => file,
            };
            set(&mut index, key, comment);
        }
        if let Some(list) = field(object, "buildConfigurationList") {
            let isa = field(object, "isa").unwrap_or_default();
            let comment = match named(object) {
                Some(name) => format!("Build configuration list for {isa} \"{name}\""),
                None => format!("Build configuration list for {isa}"),
            };
            set(&mut index, &list, comment);
        }
    }

    for (key, comment) in &format.comments {
        index.entry(key.clone()).or_insert_with(|| comment.clone());
    }
    index
}

fn default_phase_name(isa: &str) -> String {
    match isa {
        "PBXSourcesBuildPhase" => "Sources",
        "PBXFrameworksBuildPhase" => "Frameworks",
        "PBXResourcesBuildPhase" => "Resources",
        "PBXHeadersBuildPhase" => "Headers",
        "PBXCopyFilesBuildPhase" => "CopyFiles",
        "PBXShellScriptBuildPhase" => "ShellScript",
        _ => "Build Phase",
    }
    .to_string()
}
