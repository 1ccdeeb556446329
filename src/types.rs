//! Core types shared by the resolver and the platform mergers.
//!
//! A [`TranslationDocument`] is validated once when it is loaded; the mergers
//! only ever see the typed sections and never re-check presence.

use std::{
    fmt::{Display, Formatter},
    path::PathBuf,
    str::FromStr,
    sync::Arc,
};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use unic_langid::LanguageIdentifier;

use crate::error::Error;

/// Ordered key → text mapping, in the order the translation file declares it.
pub type Section = IndexMap<String, String>;

/// A build platform this hook knows how to produce resources for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Platform {
    Android,
    Ios,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Android, Platform::Ios];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Android => "android",
            Platform::Ios => "ios",
        }
    }
}

impl Display for Platform {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "android" => Ok(Platform::Android),
            "ios" => Ok(Platform::Ios),
            other => Err(Error::config(format!("unknown platform `{other}`"))),
        }
    }
}

/// A locale identifier as written by translators, e.g. `en` or `pt_BR`.
///
/// The raw spelling is kept (it names `.lproj` folders verbatim) but must be
/// a valid language identifier once `_` is read as a subtag separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Locale(String);

impl Locale {
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::discovery("empty locale identifier"));
        }
        LanguageIdentifier::from_str(&trimmed.replace('_', "-"))
            .map_err(|e| Error::discovery(format!("invalid locale `{trimmed}`: {e}")))?;
        Ok(Locale(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Subtags joined with `+`, as the `values-b+` resource qualifier expects.
    pub fn android_qualifier(&self) -> String {
        self.0.replace('_', "+")
    }
}

impl Display for Locale {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Locale {
    type Error = Error;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Locale::parse(&value)
    }
}

impl From<Locale> for String {
    fn from(value: Locale) -> Self {
        value.0
    }
}

/// Optional per-platform locale lists declared inside a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PlatformLocales {
    #[serde(default)]
    pub android: Option<Vec<Locale>>,
    #[serde(default)]
    pub ios: Option<Vec<Locale>>,
}

/// On-disk JSON shape of a translation file.
#[derive(Debug, Default, Deserialize)]
struct DocumentSchema {
    #[serde(default)]
    locale: Option<PlatformLocales>,
    #[serde(default)]
    config_android: Option<Section>,
    #[serde(default)]
    config_ios: Option<Section>,
    #[serde(default, rename = "appName")]
    app_name: Option<Section>,
    #[serde(default)]
    app: Option<Section>,
    #[serde(default)]
    app_android: Option<Section>,
    #[serde(default, rename = "appName_ios")]
    app_name_ios: Option<Section>,
    #[serde(default)]
    app_ios: Option<Section>,
}

/// The parsed contents of one translation JSON file. Immutable after load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationDocument {
    /// Locale derived from the file name, used when no explicit list exists.
    pub default_locale: Locale,
    pub locales: PlatformLocales,
    pub config_android: Section,
    pub config_ios: Section,
    /// Legacy generic label section, applied before `app`.
    pub app_name: Section,
    pub app: Section,
    pub app_android: Section,
    /// Legacy iOS label section, applied before `app_ios`.
    pub app_name_ios: Section,
    pub app_ios: Section,
}

impl TranslationDocument {
    /// Parses and validates a translation document.
    pub fn from_json(default_locale: Locale, bytes: &[u8]) -> Result<Self, Error> {
        let schema: DocumentSchema = serde_json::from_slice(bytes)?;
        Ok(TranslationDocument {
            default_locale,
            locales: schema.locale.unwrap_or_default(),
            config_android: schema.config_android.unwrap_or_default(),
            config_ios: schema.config_ios.unwrap_or_default(),
            app_name: schema.app_name.unwrap_or_default(),
            app: schema.app.unwrap_or_default(),
            app_android: schema.app_android.unwrap_or_default(),
            app_name_ios: schema.app_name_ios.unwrap_or_default(),
            app_ios: schema.app_ios.unwrap_or_default(),
        })
    }

    /// Output locales for `platform`: the declared list, else the default locale.
    pub fn locales_for(&self, platform: Platform) -> Vec<Locale> {
        let declared = match platform {
            Platform::Android => self.locales.android.as_ref(),
            Platform::Ios => self.locales.ios.as_ref(),
        };
        match declared {
            Some(list) => list.clone(),
            None => vec![self.default_locale.clone()],
        }
    }

    /// Merge source for `strings.xml`: android config, generic labels, android overrides.
    pub fn android_entries(&self) -> Section {
        merge_sections([
            &self.config_android,
            &self.app_name,
            &self.app,
            &self.app_android,
        ])
    }

    /// Source of `InfoPlist.strings`.
    pub fn info_plist_entries(&self) -> &Section {
        &self.config_ios
    }

    /// Source of `Localizable.strings`: generic labels, then iOS overrides.
    pub fn localizable_entries(&self) -> Section {
        merge_sections([
            &self.app_name,
            &self.app,
            &self.app_name_ios,
            &self.app_ios,
        ])
    }
}

/// Later sections override earlier ones; a key keeps the position of its first
/// occurrence.
fn merge_sections<'a>(sections: impl IntoIterator<Item = &'a Section>) -> Section {
    let mut merged = Section::new();
    for section in sections {
        for (key, value) in section {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// One (document, locale) pairing produced by the resolver.
#[derive(Debug, Clone)]
pub struct ResourceTarget {
    pub locale: Locale,
    pub document_path: PathBuf,
    pub document: Arc<TranslationDocument>,
}
