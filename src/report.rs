// src/report.rs

//! Output documents
//!
//! Renders the composition result to disk: one XML `.group` document per
//! solved group, a `summary.yml` of every group's flat package set, and an
//! `unsorted.yml` review document for the leftover packages. Generated
//! documents can be diffed against reference copies kept under
//! `reference/` in the input directory.

use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::Path;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesText, Event};
use tracing::{debug, error, info};

use crate::compose::{Composer, Diagnostic, UNSORTED_GROUP};
use crate::config::COMMON;
use crate::error::{Error, Result};
use crate::group::Group;
use crate::support::SupportStatus;

/// Render one group to its XML document: one `<group>` element per
/// non-empty architecture bucket, the common bucket first.
pub fn render_group(
    group: &Group,
    architectures: &[String],
    support: &SupportStatus,
    ignore_broken: bool,
) -> Result<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(|e| Error::Report(e.to_string()))?;

    let mut comment = Some(group.comment.as_str());
    for key in std::iter::once(COMMON).chain(architectures.iter().map(String::as_str)) {
        let packages = group.solved_packages.get(key);
        let missing = if key == COMMON {
            Some(&group.not_found)
        } else {
            None
        };
        let unresolvable = group.unresolvable.get(key);

        let empty = packages.is_none_or(BTreeMap::is_empty)
            && missing.is_none_or(BTreeMap::is_empty)
            && unresolvable.is_none_or(BTreeMap::is_empty);
        if empty {
            continue;
        }

        render_bucket(
            &mut writer,
            group,
            key,
            comment.take(),
            support,
            ignore_broken,
        )?;
    }

    let bytes = writer.into_inner().into_inner();
    let mut text =
        String::from_utf8(bytes).map_err(|e| Error::Report(e.to_string()))?;
    text.push('\n');
    Ok(text)
}

fn render_bucket(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    group: &Group,
    key: &str,
    comment: Option<&str>,
    support: &SupportStatus,
    ignore_broken: bool,
) -> Result<()> {
    let report = |e: quick_xml::Error| Error::Report(e.to_string());

    let doc_name = if key == COMMON {
        group.name.clone()
    } else {
        format!("{}.{}", group.name, key)
    };
    writer
        .create_element("group")
        .with_attribute(("name", doc_name.as_str()))
        .write_inner_content(|writer| {
            if let Some(comment) = comment {
                writer.write_event(Event::Comment(BytesText::new(comment)))?;
            }
            if key != COMMON {
                writer
                    .create_element("conditional")
                    .with_attribute(("name", format!("only_{key}").as_str()))
                    .write_empty()?;
            }
            writer
                .create_element("packagelist")
                .with_attribute(("relationship", "recommends"))
                .write_inner_content(|writer| {
                    write_packages(writer, group, key, support, ignore_broken)
                })?;
            Ok(())
        })
        .map_err(report)?;
    Ok(())
}

fn write_packages<W: std::io::Write>(
    writer: &mut Writer<W>,
    group: &Group,
    key: &str,
    support: &SupportStatus,
    ignore_broken: bool,
) -> std::result::Result<(), quick_xml::Error> {
    let empty_packages = BTreeMap::new();
    let packages = group.solved_packages.get(key).unwrap_or(&empty_packages);
    let empty_unresolvable = BTreeMap::new();
    let unresolvable = group.unresolvable.get(key).unwrap_or(&empty_unresolvable);

    // every name of the bucket in one sorted pass: resolved packages,
    // names missing from the universe (common bucket only), and
    // unsatisfiable requests
    let mut names: Vec<&String> = packages.keys().collect();
    if key == COMMON {
        names.extend(group.not_found.keys());
    }
    names.extend(unresolvable.keys());
    names.sort_unstable();
    names.dedup();

    for name in names {
        if group.silent.contains(name) {
            continue;
        }
        if let Some(archs) = group.not_found.get(name).filter(|_| key == COMMON) {
            let archs: Vec<&str> = archs.iter().map(String::as_str).collect();
            let msg = format!(" {} not found on {} ", name, archs.join(","));
            if ignore_broken {
                writer.write_event(Event::Comment(BytesText::new(&msg)))?;
                continue;
            }
            error!("{}:{}", group.name, msg.trim());
            writer
                .create_element("package")
                .with_attribute(("name", format!("{name}-does-not-exist").as_str()))
                .write_empty()?;
            continue;
        }
        if let Some(explanation) = unresolvable.get(name) {
            let msg = format!(" {name} uninstallable: {explanation} ");
            if ignore_broken {
                writer.write_event(Event::Comment(BytesText::new(&msg)))?;
                continue;
            }
            error!("{}:{}", group.name, msg.trim());
            writer
                .create_element("package")
                .with_attribute(("name", format!("{name}-uninstallable").as_str()))
                .write_empty()?;
            continue;
        }

        let status = support
            .status(name)
            .or(group.default_support_status.as_deref());
        let mut element = writer
            .create_element("package")
            .with_attribute(("name", name.as_str()));
        if let Some(status) = status {
            element = element.with_attribute(("supportstatus", status));
        }
        element.write_empty()?;

        if let Some(reason) = packages.get(name).filter(|r| !r.is_empty()) {
            writer.write_event(Event::Comment(BytesText::new(&format!(
                " reason: {reason} "
            ))))?;
        }
    }
    Ok(())
}

/// Write one `.group` document per solved group and return the flat
/// per-group summary.
pub fn write_all_groups(
    composer: &Composer<'_>,
    output_dir: &Path,
) -> Result<BTreeMap<String, Vec<String>>> {
    let mut summary = BTreeMap::new();
    for group in composer.groups().filter(|g| g.solved) {
        if group.name == UNSORTED_GROUP {
            continue;
        }
        summary.insert(
            group.name.clone(),
            group.summary().into_iter().collect::<Vec<_>>(),
        );
        let document = render_group(
            group,
            &composer.config.architectures,
            &composer.support,
            composer.config.ignore_broken,
        )?;
        let path = output_dir.join(format!("{}.group", group.name));
        debug!("writing {}", path.display());
        std::fs::write(path, document)?;
    }
    info!("wrote {} group documents", summary.len());
    Ok(summary)
}

/// Write skeleton `.group` documents for groups that do not have one yet.
/// Existing documents are never touched.
pub fn write_group_stubs(composer: &Composer<'_>, output_dir: &Path) -> Result<usize> {
    let mut written = 0;
    for group in composer.groups() {
        if group.name == UNSORTED_GROUP {
            continue;
        }
        let path = output_dir.join(format!("{}.group", group.name));
        if path.exists() {
            continue;
        }
        let stub = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <group name=\"{}\">\n  \
               <packagelist relationship=\"recommends\"/>\n\
             </group>\n",
            group.name
        );
        debug!("writing stub {}", path.display());
        std::fs::write(path, stub)?;
        written += 1;
    }
    Ok(written)
}

/// The leftover review document: one entry per unclaimed package, with the
/// architecture subset and a relation hint where one exists.
pub fn render_unsorted(composer: &Composer<'_>) -> String {
    let all = composer.config.architectures.len();
    let mut text = String::from("unsorted:\n");
    for (name, entry) in &composer.unsorted().packages {
        text.push_str("  - ");
        text.push_str(name);
        if entry.architectures.len() != all {
            let archs: Vec<&str> = entry.architectures.iter().map(String::as_str).collect();
            text.push_str(": [");
            text.push_str(&archs.join(","));
            text.push(']');
            if let Some(reason) = &entry.reason {
                text.push_str(" # ");
                text.push_str(reason);
            }
        }
        text.push('\n');
    }
    text
}

pub fn write_unsorted(composer: &Composer<'_>, output_dir: &Path) -> Result<()> {
    let path = output_dir.join("unsorted.yml");
    debug!("writing {}", path.display());
    std::fs::write(path, render_unsorted(composer))?;
    Ok(())
}

pub fn write_summary(
    summary: &BTreeMap<String, Vec<String>>,
    output_dir: &Path,
) -> Result<()> {
    let path = output_dir.join("summary.yml");
    debug!("writing {}", path.display());
    std::fs::write(path, serde_yaml::to_string(summary)?)?;
    Ok(())
}

/// Diff `generated` against `reference/<file_name>` under `input_dir`.
/// A missing reference copy is not a finding.
pub fn check_reference(
    input_dir: &Path,
    file_name: &str,
    generated: &str,
) -> Result<Option<Diagnostic>> {
    let path = input_dir.join("reference").join(file_name);
    if !path.is_file() {
        return Ok(None);
    }
    let reference = std::fs::read_to_string(&path)?;
    if reference == generated {
        return Ok(None);
    }
    let patch = diffy::create_patch(&reference, generated);
    Ok(Some(Diagnostic::ReferenceMismatch {
        document: file_name.to_string(),
        diff: patch.to_string(),
    }))
}
