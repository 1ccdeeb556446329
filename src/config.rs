//! Per-invocation configuration.
//!
//! Everything path-related is computed once from the project root and the
//! app manifest (`config.xml`), then passed explicitly to the mergers.

use std::path::{Path, PathBuf};

use quick_xml::{Reader, events::BytesStart, events::Event};

use crate::{error::Error, formats::strings::StringsEncoding};

/// Name of the custom preference holding the translation folder.
pub const TRANSLATION_PATH_PREFERENCE: &str = "TRANSLATION_PATH";
/// Translation folder used when neither the app nor the plugin declares one.
pub const DEFAULT_TRANSLATION_PATH: &str = "translations/app/";
/// Locale whose strings live in the unqualified `values` folder.
pub const DEFAULT_BASE_LOCALE: &str = "en";

const APP_MANIFEST: &str = "config.xml";
const ANDROID_RES_DIR: &str = "platforms/android/app/src/main/res";
const IOS_PLATFORM_DIR: &str = "platforms/ios";

/// A `<preference>` element from `config.xml` or `plugin.xml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preference {
    pub name: String,
    pub value: Option<String>,
    pub default: Option<String>,
}

/// The parts of a Cordova-style XML manifest this hook reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestXml {
    /// Text of the top-level `<name>` element.
    pub name: Option<String>,
    pub preferences: Vec<Preference>,
}

impl ManifestXml {
    pub fn parse(xml: &str) -> Result<Self, Error> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut manifest = ManifestXml::default();
        let mut depth = 0usize;
        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    depth += 1;
                    match e.local_name().as_ref() {
                        b"preference" => manifest.preferences.push(parse_preference(&e)?),
                        b"name" if depth == 2 && manifest.name.is_none() => {
                            let raw = reader.read_text(e.name())?;
                            depth -= 1;
                            let text = quick_xml::escape::unescape(&raw)
                                .map_err(|err| Error::XmlParse(err.into()))?;
                            manifest.name = Some(text.trim().to_string());
                        }
                        _ => {}
                    }
                }
                Event::Empty(e) if e.local_name().as_ref() == b"preference" => {
                    manifest.preferences.push(parse_preference(&e)?);
                }
                Event::End(_) => depth = depth.saturating_sub(1),
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(manifest)
    }

    /// Looks a preference up by name, ignoring ASCII case.
    pub fn preference(&self, name: &str) -> Option<&Preference> {
        self.preferences
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// The app-level translation path, if set to something other than blanks.
    pub fn translation_path(&self) -> Option<&str> {
        self.preference(TRANSLATION_PATH_PREFERENCE)
            .and_then(|p| p.value.as_deref())
            .filter(|v| !v.trim().is_empty())
    }

    /// The plugin-declared default translation path.
    pub fn default_translation_path(&self) -> Option<&str> {
        self.preference(TRANSLATION_PATH_PREFERENCE)
            .and_then(|p| p.default.as_deref())
            .filter(|v| !v.trim().is_empty())
    }
}

fn parse_preference(e: &BytesStart) -> Result<Preference, Error> {
    let mut preference = Preference {
        name: String::new(),
        value: None,
        default: None,
    };
    for attr in e.attributes().with_checks(false) {
        let attr = attr?;
        let value = attr.unescape_value()?.to_string();
        match attr.key.as_ref() {
            b"name" => preference.name = value,
            b"value" => preference.value = Some(value),
            b"default" => preference.default = Some(value),
            _ => {}
        }
    }
    Ok(preference)
}

/// Resolved iOS locations, derived from the app name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IosPaths {
    /// Folder holding the `<locale>.lproj` directories.
    pub resources_dir: PathBuf,
    /// `resources_dir` relative to the folder holding the `.xcodeproj`.
    pub resources_group_path: String,
    pub pbxproj_path: PathBuf,
}

/// Configuration for one hook invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookConfig {
    pub project_root: PathBuf,
    /// Folder prefix of the translation files, relative to the project root.
    pub translation_path: String,
    pub base_locale: String,
    /// App name from `config.xml`; required for iOS only.
    pub app_name: Option<String>,
    pub strings_encoding: StringsEncoding,
}

impl HookConfig {
    /// Creates a configuration with built-in defaults.
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        HookConfig {
            project_root: project_root.into(),
            translation_path: DEFAULT_TRANSLATION_PATH.to_string(),
            base_locale: DEFAULT_BASE_LOCALE.to_string(),
            app_name: None,
            strings_encoding: StringsEncoding::default(),
        }
    }

    /// Reads `config.xml` under `project_root` and resolves the translation
    /// path, falling back to `plugin_default` and then the built-in default.
    pub async fn load(
        project_root: impl Into<PathBuf>,
        plugin_default: Option<String>,
    ) -> Result<Self, Error> {
        let project_root = project_root.into();
        let manifest_path = project_root.join(APP_MANIFEST);
        let text = tokio::fs::read_to_string(&manifest_path)
            .await
            .map_err(|e| Error::io_at(&manifest_path, e))?;
        let manifest = ManifestXml::parse(&text).map_err(|e| {
            Error::config(format!("{}: {}", manifest_path.display(), e))
        })?;

        let translation_path = manifest
            .translation_path()
            .map(str::to_string)
            .or(plugin_default.filter(|p| !p.trim().is_empty()))
            .unwrap_or_else(|| DEFAULT_TRANSLATION_PATH.to_string());

        Ok(HookConfig::new(project_root)
            .with_translation_path(translation_path)
            .with_app_name(manifest.name.filter(|n| !n.is_empty())))
    }

    pub fn with_translation_path(mut self, translation_path: impl Into<String>) -> Self {
        self.translation_path = translation_path.into();
        self
    }

    pub fn with_base_locale(mut self, base_locale: impl Into<String>) -> Self {
        self.base_locale = base_locale.into();
        self
    }

    pub fn with_app_name(mut self, app_name: Option<String>) -> Self {
        self.app_name = app_name;
        self
    }

    pub fn with_strings_encoding(mut self, strings_encoding: StringsEncoding) -> Self {
        self.strings_encoding = strings_encoding;
        self
    }

    /// Root of the Android resource tree (`res/`).
    pub fn android_res_dir(&self) -> PathBuf {
        self.project_root.join(ANDROID_RES_DIR)
    }

    pub fn ios_paths(&self) -> Result<IosPaths, Error> {
        let name = self
            .app_name
            .as_deref()
            .ok_or_else(|| Error::config("config.xml does not declare an app <name>"))?;
        let platform_dir = self.project_root.join(IOS_PLATFORM_DIR);
        Ok(IosPaths {
            resources_dir: platform_dir.join(name).join("Resources"),
            resources_group_path: format!("{name}/Resources"),
            pbxproj_path: platform_dir
                .join(format!("{name}.xcodeproj"))
                .join("project.pbxproj"),
        })
    }
}

/// Reads the plugin-declared default translation path from a `plugin.xml`.
pub async fn read_plugin_default(plugin_xml: impl AsRef<Path>) -> Result<Option<String>, Error> {
    let path = plugin_xml.as_ref();
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::io_at(path, e))?;
    let manifest = ManifestXml::parse(&text)?;
    Ok(manifest.default_translation_path().map(str::to_string))
}
