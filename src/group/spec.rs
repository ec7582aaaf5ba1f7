// src/group/spec.rs

//! Declarative group specification format
//!
//! A group file maps group names to package entry lists. An entry is either
//! a bare package name (every architecture) or a mapping from the name to a
//! modifier list; modifiers are architecture names, `locked`, `silent`,
//! `recommended` and `suggested` (`suggested` implies `recommended`).
//! Two keys are special: `OUTPUT` holds the ordered composition plan and
//! `UNWANTED` a globally excluded name set.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use serde_yaml::Value;

use crate::compose::plan::{ModuleSettings, OutputPlan, PlanEntry};
use crate::error::{Error, Result};

pub const OUTPUT_KEY: &str = "OUTPUT";
pub const UNWANTED_KEY: &str = "UNWANTED";

/// One wish-list entry as written in the group file: either a bare name or
/// a one-key `{name: [modifier, ...]}` mapping.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PackageEntry {
    Plain(String),
    Modified(BTreeMap<String, Vec<String>>),
}

/// A group definition as parsed from one file.
#[derive(Debug, Clone)]
pub struct GroupDef {
    pub name: String,
    /// Package-less groups are a rare but legal exception.
    pub packages: Vec<PackageEntry>,
}

/// Everything one group file contributes.
#[derive(Debug, Default)]
pub struct GroupFile {
    pub groups: Vec<GroupDef>,
    pub output: Option<OutputPlan>,
    pub unwanted: BTreeSet<String>,
}

impl GroupFile {
    /// Parse one YAML group file.
    pub fn parse(text: &str) -> Result<Self> {
        let document: serde_yaml::Mapping = serde_yaml::from_str(text)?;
        let mut file = GroupFile::default();

        for (key, value) in document {
            let Value::String(name) = key else {
                return Err(Error::Config("group names must be strings".into()));
            };
            match name.as_str() {
                OUTPUT_KEY => {
                    file.output = Some(parse_output(value)?);
                }
                UNWANTED_KEY => {
                    let names: Vec<String> = serde_yaml::from_value(value)?;
                    file.unwanted.extend(names);
                }
                _ => {
                    let packages: Option<Vec<PackageEntry>> = serde_yaml::from_value(value)?;
                    file.groups.push(GroupDef {
                        name,
                        packages: packages.unwrap_or_default(),
                    });
                }
            }
        }
        Ok(file)
    }
}

fn parse_output(value: Value) -> Result<OutputPlan> {
    // each plan entry is a one-key mapping; settings may be null (e.g. unsorted)
    type RawEntry = std::collections::BTreeMap<String, Option<ModuleSettings>>;
    let raw: Vec<RawEntry> = serde_yaml::from_value(value)?;

    let mut entries = Vec::new();
    for mapping in raw {
        for (name, settings) in mapping {
            entries.push(PlanEntry {
                name,
                settings: settings.unwrap_or_default(),
            });
        }
    }
    Ok(OutputPlan { entries })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
minimal:
  - bash
  - kernel-default:
      - locked
  - grub2:
      - x86_64
desktop:
  - plasma:
      - recommended
empty-group: null
OUTPUT:
  - minimal:
      require_all: true
      default-support: l3
  - desktop:
      includes: [minimal]
      excludes: []
      recommends: true
      conflicts: [legacy]
  - unsorted:
UNWANTED:
  - flash-player
"#;

    #[test]
    fn parses_groups_plan_and_unwanted() {
        let file = GroupFile::parse(SAMPLE).unwrap();
        assert_eq!(file.groups.len(), 3);
        let minimal = &file.groups[0];
        assert_eq!(minimal.name, "minimal");
        assert_eq!(minimal.packages.len(), 3);
        assert!(matches!(&minimal.packages[0], PackageEntry::Plain(n) if n == "bash"));

        let plan = file.output.unwrap();
        assert_eq!(plan.entries.len(), 3);
        assert_eq!(plan.entries[0].name, "minimal");
        assert!(plan.entries[0].settings.require_all);
        assert_eq!(plan.entries[0].settings.default_support.as_deref(), Some("l3"));
        assert_eq!(plan.entries[1].settings.includes, ["minimal"]);
        assert_eq!(plan.entries[1].settings.recommends, Some(true));
        assert_eq!(plan.entries[2].name, "unsorted");

        assert!(file.unwanted.contains("flash-player"));
    }

    #[test]
    fn package_less_group_is_legal() {
        let file = GroupFile::parse(SAMPLE).unwrap();
        let empty = file.groups.iter().find(|g| g.name == "empty-group").unwrap();
        assert!(empty.packages.is_empty());
    }
}
