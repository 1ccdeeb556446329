//! Android Resource Merger.
//!
//! Every output locale owns one `res/values[-b+<qualifier>]/strings.xml`.
//! An existing file is loaded and merged into, so entries the translations do
//! not mention keep both their value and their position.

use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::{
    config::HookConfig,
    error::Error,
    formats::AndroidStringsFormat,
    resolver::{self, TranslationPattern},
    traits::Parser,
    types::{Locale, Platform, ResourceTarget, Section},
};

pub const STRINGS_FILE: &str = "strings.xml";

lazy_static! {
    static ref UNESCAPED_APOSTROPHE: Regex = Regex::new(r"(^|[^\\])'").unwrap();
}

/// Resource directory name for `locale`: `values` for the base locale,
/// otherwise `values-b+<qualifier>`.
pub fn values_dir_name(locale: &Locale, base_locale: &str) -> String {
    if locale.as_str() == base_locale {
        "values".to_string()
    } else {
        format!("values-b+{}", locale.android_qualifier())
    }
}

/// Full path of the `strings.xml` written for `locale`.
pub fn strings_path(res_dir: &Path, locale: &Locale, base_locale: &str) -> PathBuf {
    res_dir
        .join(values_dir_name(locale, base_locale))
        .join(STRINGS_FILE)
}

/// Rewrites a translation value for `strings.xml`: the `$@` placeholder
/// becomes `$s` and apostrophes get a backslash unless they already have one.
pub fn escape_value(value: &str) -> String {
    let value = value.replace("$@", "$s");
    // Two passes: adjacent apostrophes share the character between matches.
    let once = UNESCAPED_APOSTROPHE.replace_all(&value, r"$1\'");
    UNESCAPED_APOSTROPHE
        .replace_all(&once, r"$1\'")
        .into_owned()
}

/// Applies `entries` to `resource` in iteration order.
pub fn merge_entries(resource: &mut AndroidStringsFormat, entries: &Section) {
    for (name, value) in entries {
        resource.upsert(name, escape_value(value));
    }
}

/// Loads the existing file for `target` (if any), merges its document into it
/// and writes the result back.
pub async fn merge_and_write(config: &HookConfig, target: &ResourceTarget) -> Result<PathBuf, Error> {
    let path = strings_path(&config.android_res_dir(), &target.locale, &config.base_locale);

    let mut resource = match tokio::fs::read_to_string(&path).await {
        Ok(text) => {
            AndroidStringsFormat::from_str(&text).map_err(|e| Error::malformed(&path, e))?
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => AndroidStringsFormat::default(),
        Err(e) => return Err(Error::io_at(&path, e)),
    };

    let entries = target.document.android_entries();
    merge_entries(&mut resource, &entries);
    debug!(
        "Merged {} entries from {} into {}",
        entries.len(),
        target.document_path.display(),
        path.display()
    );

    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| Error::io_at(dir, e))?;
    }
    let bytes = resource.to_bytes()?;
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| Error::io_at(&path, e))?;
    info!("Saved: {}", path.display());
    Ok(path)
}

/// Runs the Android merger for every discovered target.
///
/// Locales are processed concurrently; documents sharing a locale are merged
/// one after the other in discovery order. Returns the written files, sorted.
pub async fn run(config: &HookConfig) -> Result<Vec<PathBuf>, Error> {
    let pattern = TranslationPattern::new(&config.project_root, &config.translation_path);
    let targets = resolver::discover(&pattern, Platform::Android).await?;

    let mut tasks = JoinSet::new();
    for (_, group) in resolver::group_by_locale(targets) {
        let config = config.clone();
        tasks.spawn(async move {
            let mut written = Vec::new();
            for target in &group {
                let path = merge_and_write(&config, target).await?;
                if !written.contains(&path) {
                    written.push(path);
                }
            }
            Ok::<_, Error>(written)
        });
    }

    let mut written = Vec::new();
    while let Some(result) = tasks.join_next().await {
        written.extend(result??);
    }
    written.sort();
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TranslationDocument;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use std::{fs, sync::Arc};
    use tempfile::TempDir;

    fn target(locale: &str, json: &str) -> ResourceTarget {
        let locale = Locale::parse(locale).unwrap();
        let document = TranslationDocument::from_json(locale.clone(), json.as_bytes()).unwrap();
        ResourceTarget {
            locale,
            document_path: PathBuf::from("translations/app/test.json"),
            document: Arc::new(document),
        }
    }

    #[test]
    fn test_values_dir_mapping() {
        let en = Locale::parse("en").unwrap();
        let pt_br = Locale::parse("pt_BR").unwrap();
        assert_eq!(values_dir_name(&en, "en"), "values");
        assert_eq!(values_dir_name(&pt_br, "en"), "values-b+pt+BR");
        assert_eq!(
            strings_path(Path::new("res"), &pt_br, "en"),
            Path::new("res/values-b+pt+BR/strings.xml")
        );
    }

    #[test]
    fn test_escape_value() {
        assert_eq!(escape_value("Hello $@"), "Hello $s");
        assert_eq!(escape_value("%1$@ and %2$@"), "%1$s and %2$s");
        assert_eq!(escape_value("it's"), r"it\'s");
        assert_eq!(escape_value(r"it\'s"), r"it\'s");
        assert_eq!(escape_value("''"), r"\'\'");
        assert_eq!(escape_value("'quoted'"), r"\'quoted\'");
    }

    #[test]
    fn test_merge_preserves_unrelated_entries() {
        let mut resource = AndroidStringsFormat::from_str(indoc! {r#"
            <resources>
                <string name="A">1</string>
                <string name="B">2</string>
            </resources>
        "#})
        .unwrap();
        let mut entries = Section::new();
        entries.insert("B".to_string(), "new".to_string());
        entries.insert("C".to_string(), "3".to_string());

        merge_entries(&mut resource, &entries);
        let names: Vec<(&str, &str)> = resource
            .strings
            .iter()
            .map(|s| (s.name.as_str(), s.value.as_str()))
            .collect();
        assert_eq!(names, vec![("A", "1"), ("B", "new"), ("C", "3")]);
    }

    #[tokio::test]
    async fn test_merge_and_write_creates_locale_dir() {
        let dir = TempDir::new().unwrap();
        let config = HookConfig::new(dir.path());
        let target = target("pt_BR", r#"{"app": {"hello": "Olá $@"}}"#);

        let path = merge_and_write(&config, &target).await.unwrap();
        assert!(path.ends_with("res/values-b+pt+BR/strings.xml"));
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains(r#"<string name="hello">Olá $s</string>"#), "{}", written);
    }

    #[tokio::test]
    async fn test_merge_and_write_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let config = HookConfig::new(dir.path());
        let target = target(
            "en",
            r#"{"config_android": {"app_name": "Hello"}, "app": {"greeting": "it's $@"}}"#,
        );

        let path = merge_and_write(&config, &target).await.unwrap();
        let first = fs::read(&path).unwrap();
        merge_and_write(&config, &target).await.unwrap();
        let second = fs::read(&path).unwrap();
        assert_eq!(String::from_utf8(first).unwrap(), String::from_utf8(second).unwrap());
        assert!(path.ends_with("res/values/strings.xml"));
    }

    #[tokio::test]
    async fn test_malformed_existing_resource() {
        let dir = TempDir::new().unwrap();
        let config = HookConfig::new(dir.path());
        let path = strings_path(&config.android_res_dir(), &Locale::parse("en").unwrap(), "en");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "<resources><string name=\"a\">").unwrap();

        let result = merge_and_write(&config, &target("en", r#"{"app": {"a": "A"}}"#)).await;
        assert!(matches!(result, Err(Error::MalformedResource { .. })));
    }

    #[tokio::test]
    async fn test_run_merges_every_locale() {
        let dir = TempDir::new().unwrap();
        let translations = dir.path().join("translations/app");
        fs::create_dir_all(&translations).unwrap();
        fs::write(
            translations.join("en.json"),
            r#"{"app": {"title": "Title"}, "app_android": {"title": "Android title"}}"#,
        )
        .unwrap();
        fs::write(
            translations.join("es.json"),
            r#"{"locale": {"android": ["es", "es_MX"]}, "app": {"title": "Título"}}"#,
        )
        .unwrap();

        let config = HookConfig::new(dir.path());
        let written = run(&config).await.unwrap();
        let res = config.android_res_dir();
        assert_eq!(
            written,
            vec![
                res.join("values/strings.xml"),
                res.join("values-b+es/strings.xml"),
                res.join("values-b+es+MX/strings.xml"),
            ]
        );
        let en = fs::read_to_string(res.join("values/strings.xml")).unwrap();
        assert!(en.contains(">Android title<"));
    }
}
