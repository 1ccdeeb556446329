//! Support for Xcode project manifests (`project.pbxproj`).
//!
//! The manifest is an old-style (OpenStep) property list. It is parsed into a
//! generic [`Value`] tree that keeps key order and the `/* ... */` reference
//! comments, so writing it back only changes what was actually added.
//!
//! On top of the tree, [`Format`] offers the few object-graph operations
//! needed to register localized resources: locating or creating a
//! `PBXVariantGroup`, adding `PBXFileReference`s to it and listing
//! `knownRegions`.

mod lexer;
mod writer;

use std::{
    collections::HashMap,
    io::{BufRead, Read, Write},
};

use indexmap::IndexMap;
use tracing::warn;
use uuid::Uuid;

use crate::{error::Error, traits::Parser};

pub type Dict = IndexMap<String, Value>;

/// A property-list value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    String(String),
    Array(Vec<Value>),
    Dict(Dict),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Value::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    pub fn as_dict_mut(&mut self) -> Option<&mut Dict> {
        match self {
            Value::Dict(dict) => Some(dict),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

/// Drops quoting characters, the way references are compared.
pub fn unquote(s: &str) -> String {
    s.replace(['"', '\''], "")
}

/// Reads a string field of an object, unquoted.
fn field(object: &Dict, name: &str) -> Option<String> {
    object.get(name).and_then(Value::as_str).map(unquote)
}

pub const VARIANT_GROUP_ISA: &str = "PBXVariantGroup";
pub const FILE_REFERENCE_ISA: &str = "PBXFileReference";
pub const BUILD_FILE_ISA: &str = "PBXBuildFile";
pub const GROUP_ISA: &str = "PBXGroup";
pub const PROJECT_ISA: &str = "PBXProject";
pub const RESOURCES_PHASE_ISA: &str = "PBXResourcesBuildPhase";

const STRINGS_FILE_TYPE: &str = "text.plist.strings";
const GROUP_SOURCE_TREE: &str = "<group>";

/// A parsed project manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Format {
    pub root: Dict,
    /// Reference comments read from the file, keyed by object id.
    pub comments: HashMap<String, String>,
}

impl Parser for Format {
    fn from_reader<R: BufRead>(mut reader: R) -> Result<Self, Error> {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        <Self as Parser>::from_str(&content)
    }

    fn from_str(s: &str) -> Result<Self, Error> {
        let (root, comments) = lexer::parse(s)?;
        let format = Format { root, comments };
        format.objects()?;
        Ok(format)
    }

    fn to_writer<W: Write>(&self, mut writer: W) -> Result<(), Error> {
        let text = writer::render(self);
        writer.write_all(text.as_bytes())?;
        Ok(())
    }
}

impl Format {
    pub fn objects(&self) -> Result<&Dict, Error> {
        self.root
            .get("objects")
            .and_then(Value::as_dict)
            .ok_or_else(|| Error::manifest_parse("missing `objects` dictionary"))
    }

    fn objects_mut(&mut self) -> Result<&mut Dict, Error> {
        self.root
            .get_mut("objects")
            .and_then(Value::as_dict_mut)
            .ok_or_else(|| Error::manifest_parse("missing `objects` dictionary"))
    }

    pub fn object(&self, key: &str) -> Option<&Dict> {
        self.objects().ok()?.get(key).and_then(Value::as_dict)
    }

    fn object_mut(&mut self, key: &str) -> Option<&mut Dict> {
        self.objects_mut().ok()?.get_mut(key).and_then(Value::as_dict_mut)
    }

    /// All objects of the given `isa`, in file order.
    pub fn objects_of<'a>(&'a self, isa: &'a str) -> impl Iterator<Item = (&'a str, &'a Dict)> {
        self.objects()
            .into_iter()
            .flat_map(|objects| objects.iter())
            .filter_map(move |(key, value)| {
                let object = value.as_dict()?;
                (object.get("isa").and_then(Value::as_str) == Some(isa))
                    .then_some((key.as_str(), object))
            })
    }

    /// Key of the `PBXProject` object.
    pub fn root_object_key(&self) -> Option<String> {
        self.root.get("rootObject").and_then(Value::as_str).map(unquote)
    }

    pub fn find_variant_group(&self, name: &str) -> Option<String> {
        self.objects_of(VARIANT_GROUP_ISA)
            .find(|(_, group)| field(group, "name").as_deref() == Some(name))
            .map(|(key, _)| key.to_string())
    }

    /// Paths of every `PBXFileReference`, unquoted.
    pub fn file_reference_paths(&self) -> Vec<String> {
        self.objects_of(FILE_REFERENCE_ISA)
            .filter_map(|(_, file)| field(file, "path"))
            .collect()
    }

    /// A fresh 24-digit object id not used by any object.
    pub fn generate_id(&self) -> String {
        loop {
            let id = Uuid::new_v4().simple().to_string().to_uppercase()[..24].to_string();
            if self.object(&id).is_none() {
                return id;
            }
        }
    }

    /// Creates a `PBXVariantGroup` named `name`, adds it to the resources
    /// build phase and to the `Resources` group.
    ///
    /// Without a `Resources` group the variant group goes to the main group and
    /// carries `resources_path` (relative to the project folder) so that its
    /// `<locale>.lproj/...` children still resolve to the files on disk.
    pub fn add_localization_variant_group(
        &mut self,
        name: &str,
        resources_path: &str,
    ) -> Result<String, Error> {
        let parent = match self.resources_group() {
            Some(group) => Some((group, None)),
            None => self.main_group().map(|group| (group, Some(resources_path))),
        };

        let group_key = self.generate_id();
        let mut group = Dict::new();
        group.insert("isa".to_string(), VARIANT_GROUP_ISA.into());
        group.insert("children".to_string(), Value::Array(Vec::new()));
        group.insert("name".to_string(), name.into());
        if let Some((_, Some(path))) = &parent {
            group.insert("path".to_string(), (*path).into());
        }
        group.insert("sourceTree".to_string(), GROUP_SOURCE_TREE.into());
        self.objects_mut()?
            .insert(group_key.clone(), Value::Dict(group));

        let build_file_key = self.generate_id();
        let mut build_file = Dict::new();
        build_file.insert("isa".to_string(), BUILD_FILE_ISA.into());
        build_file.insert("fileRef".to_string(), group_key.as_str().into());
        self.objects_mut()?
            .insert(build_file_key.clone(), Value::Dict(build_file));

        match self.resources_build_phase() {
            Some(phase) => self.push_reference(&phase, "files", &build_file_key)?,
            None => warn!("No {RESOURCES_PHASE_ISA} found; {name} is not copied by any target"),
        }

        match parent {
            Some((parent, _)) => self.push_reference(&parent, "children", &group_key)?,
            None => warn!("No Resources or main group found; {name} is not shown in the navigator"),
        }

        Ok(group_key)
    }

    /// Adds a localized `.strings` file reference to an existing variant group.
    ///
    /// `path` is relative to the group, e.g. `fr.lproj/Localizable.strings`.
    pub fn add_variant_file_reference(&mut self, group_key: &str, path: &str) -> Result<String, Error> {
        if self.object(group_key).is_none() {
            return Err(Error::manifest_parse(format!("no object `{group_key}`")));
        }
        let name = path
            .split_once(".lproj/")
            .map(|(locale, _)| locale)
            .unwrap_or_else(|| path.rsplit('/').next().unwrap_or(path));

        let key = self.generate_id();
        let mut file = Dict::new();
        file.insert("isa".to_string(), FILE_REFERENCE_ISA.into());
        file.insert("lastKnownFileType".to_string(), STRINGS_FILE_TYPE.into());
        file.insert("name".to_string(), name.into());
        file.insert("path".to_string(), path.into());
        file.insert("sourceTree".to_string(), GROUP_SOURCE_TREE.into());
        self.objects_mut()?.insert(key.clone(), Value::Dict(file));

        self.push_reference(group_key, "children", &key)?;
        Ok(key)
    }

    /// Adds `region` to the project's `knownRegions`; returns whether it was new.
    pub fn add_known_region(&mut self, region: &str) -> Result<bool, Error> {
        let Some(project_key) = self.root_object_key() else {
            warn!("Project manifest has no rootObject; known regions left unchanged");
            return Ok(false);
        };
        let project = self
            .object_mut(&project_key)
            .ok_or_else(|| Error::manifest_parse(format!("rootObject `{project_key}` not found")))?;
        let regions = project
            .entry("knownRegions".to_string())
            .or_insert_with(|| Value::Array(Vec::new()))
            .as_array_mut()
            .ok_or_else(|| Error::manifest_parse("`knownRegions` is not an array"))?;
        if regions
            .iter()
            .filter_map(Value::as_str)
            .any(|known| unquote(known) == region)
        {
            return Ok(false);
        }
        regions.push(region.into());
        Ok(true)
    }

    fn main_group(&self) -> Option<String> {
        let project = self.object(&self.root_object_key()?)?;
        field(project, "mainGroup")
    }

    fn resources_group(&self) -> Option<String> {
        self.objects_of(GROUP_ISA)
            .find(|(_, group)| {
                field(group, "name").as_deref() == Some("Resources")
                    || field(group, "path").as_deref() == Some("Resources")
            })
            .map(|(key, _)| key.to_string())
    }

    /// The resources phase of the first target, else any resources phase.
    fn resources_build_phase(&self) -> Option<String> {
        let first_target_phase = self
            .root_object_key()
            .and_then(|key| self.object(&key))
            .and_then(|project| project.get("targets")?.as_array()?.first()?.as_str())
            .and_then(|target| self.object(&unquote(target)))
            .and_then(|target| {
                target
                    .get("buildPhases")?
                    .as_array()?
                    .iter()
                    .filter_map(Value::as_str)
                    .map(unquote)
                    .find(|phase| {
                        self.object(phase)
                            .and_then(|p| p.get("isa"))
                            .and_then(Value::as_str)
                            == Some(RESOURCES_PHASE_ISA)
                    })
            });
        first_target_phase.or_else(|| {
            self.objects_of(RESOURCES_PHASE_ISA)
                .next()
                .map(|(key, _)| key.to_string())
        })
    }

    fn push_reference(&mut self, owner: &str, list: &str, item: &str) -> Result<(), Error> {
        let object = self
            .object_mut(owner)
            .ok_or_else(|| Error::manifest_parse(format!("no object `{owner}`")))?;
        object
            .entry(list.to_string())
            .or_insert_with(|| Value::Array(Vec::new()))
            .as_array_mut()
            .ok_or_else(|| Error::manifest_parse(format!("`{list}` of `{owner}` is not an array")))?
            .push(item.into());
        Ok(())
    }
}
