//! Translation Source Resolver.
//!
//! Finds the translation JSON files under the configured folder and expands
//! each into one [`ResourceTarget`] per output locale of a platform.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use indexmap::IndexMap;
use regex::Regex;
use tracing::debug;

use crate::{
    error::Error,
    types::{Locale, Platform, ResourceTarget, TranslationDocument},
};

/// The `<TRANSLATION_PATH>*.json` pattern, anchored at the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationPattern {
    root: PathBuf,
    prefix: String,
}

impl TranslationPattern {
    pub fn new(root: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        TranslationPattern {
            root: root.into(),
            prefix: prefix.into(),
        }
    }

    /// The glob handed to the filesystem walker.
    pub fn glob_pattern(&self) -> String {
        let prefix = self.prefix.replace('\\', "/");
        if Path::new(&prefix).is_absolute() {
            return format!("{prefix}*.json");
        }
        let root = glob::Pattern::escape(&self.root.to_string_lossy().replace('\\', "/"));
        let root = root.trim_end_matches('/');
        format!("{root}/{prefix}*.json")
    }

    /// Regex whose single capture group is the `*` of `*.json`.
    ///
    /// Wildcards inside the configured prefix become non-capturing segments.
    fn identifier_regex(&self) -> Result<Regex, Error> {
        let mut source = String::from("^");
        for c in self.prefix.replace('\\', "/").chars() {
            match c {
                '*' => source.push_str("[^/]*"),
                '?' => source.push_str("[^/]"),
                c => source.push_str(&regex::escape(&c.to_string())),
            }
        }
        source.push_str(r"(.*)\.json$");
        Regex::new(&source).map_err(|e| Error::discovery(format!("invalid translation path: {e}")))
    }

    /// Matching files and the identifier captured from each file name.
    pub fn matches(&self) -> Result<Vec<(String, PathBuf)>, Error> {
        let identifier = self.identifier_regex()?;
        let absolute = Path::new(&self.prefix.replace('\\', "/")).is_absolute();
        let pattern = self.glob_pattern();
        let paths = glob::glob(&pattern)
            .map_err(|e| Error::discovery(format!("invalid glob `{pattern}`: {e}")))?;

        let mut found = Vec::new();
        for entry in paths {
            let path = entry.map_err(|e| Error::discovery(e.to_string()))?;
            if !path.is_file() {
                continue;
            }
            // An absolute prefix is matched against the whole path.
            let candidate = if absolute {
                path.as_path()
            } else {
                path.strip_prefix(&self.root).unwrap_or(&path)
            };
            let candidate = candidate.to_string_lossy().replace('\\', "/");
            if let Some(captures) = identifier.captures(&candidate) {
                found.push((captures[1].to_string(), path));
            }
        }
        Ok(found)
    }
}

/// Loads one translation file, deriving its default locale from `identifier`.
pub async fn load_document(identifier: &str, path: &Path) -> Result<TranslationDocument, Error> {
    let default_locale = Locale::parse(identifier)
        .map_err(|e| Error::discovery(format!("{}: {}", path.display(), e)))?;
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| Error::io_at(path, e))?;
    TranslationDocument::from_json(default_locale, &bytes)
        .map_err(|e| Error::discovery(format!("{}: {}", path.display(), e)))
}

/// Resolves every (document, locale) pair for `platform`.
///
/// Zero matching files is not an error; an unreadable or invalid document is.
pub async fn discover(
    pattern: &TranslationPattern,
    platform: Platform,
) -> Result<Vec<ResourceTarget>, Error> {
    let mut targets = Vec::new();
    for (identifier, path) in pattern.matches()? {
        let document = Arc::new(load_document(&identifier, &path).await?);
        for locale in document.locales_for(platform) {
            targets.push(ResourceTarget {
                locale,
                document_path: path.clone(),
                document: Arc::clone(&document),
            });
        }
    }
    debug!(
        "Resolved {} {} target(s) from {}",
        targets.len(),
        platform,
        pattern.glob_pattern()
    );
    Ok(targets)
}

/// Groups targets by output locale, keeping discovery order within and across
/// groups. Targets of one group write the same files and must run in sequence.
pub fn group_by_locale(targets: Vec<ResourceTarget>) -> Vec<(Locale, Vec<ResourceTarget>)> {
    let mut groups: IndexMap<Locale, Vec<ResourceTarget>> = IndexMap::new();
    for target in targets {
        groups.entry(target.locale.clone()).or_default().push(target);
    }
    groups.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, relative: &str, content: &str) {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn locales(targets: &[ResourceTarget]) -> Vec<String> {
        targets.iter().map(|t| t.locale.to_string()).collect()
    }

    #[tokio::test]
    async fn test_no_matches_is_empty() {
        let dir = TempDir::new().unwrap();
        let pattern = TranslationPattern::new(dir.path(), "translations/app/");
        let targets = discover(&pattern, Platform::Android).await.unwrap();
        assert!(targets.is_empty());
    }

    #[tokio::test]
    async fn test_locale_from_file_name() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "translations/app/en.json", r#"{"app": {"a": "A"}}"#);
        write(dir.path(), "translations/app/pt_BR.json", r#"{"app": {"a": "A"}}"#);
        write(dir.path(), "translations/app/notes.txt", "ignored");

        let pattern = TranslationPattern::new(dir.path(), "translations/app/");
        let targets = discover(&pattern, Platform::Android).await.unwrap();
        assert_eq!(locales(&targets), vec!["en", "pt_BR"]);
        assert!(targets[1].document_path.ends_with("pt_BR.json"));
    }

    #[tokio::test]
    async fn test_declared_locales_per_platform() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "translations/app/es.json",
            r#"{"locale": {"android": ["es", "es_MX"]}, "app": {"a": "A"}}"#,
        );
        let pattern = TranslationPattern::new(dir.path(), "translations/app/");

        let android = discover(&pattern, Platform::Android).await.unwrap();
        assert_eq!(locales(&android), vec!["es", "es_MX"]);
        assert!(Arc::ptr_eq(&android[0].document, &android[1].document));

        let ios = discover(&pattern, Platform::Ios).await.unwrap();
        assert_eq!(locales(&ios), vec!["es"]);
    }

    #[tokio::test]
    async fn test_invalid_json_aborts_discovery() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "translations/app/en.json", r#"{"app": {"a": "A"}}"#);
        write(dir.path(), "translations/app/fr.json", "{ not json");
        let pattern = TranslationPattern::new(dir.path(), "translations/app/");
        let result = discover(&pattern, Platform::Ios).await;
        match result {
            Err(Error::Discovery(message)) => assert!(message.contains("fr.json")),
            other => panic!("expected discovery error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_wildcard_in_prefix() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "i18n/app/de.json", r#"{}"#);
        write(dir.path(), "i18n/web/it.json", r#"{}"#);
        let pattern = TranslationPattern::new(dir.path(), "i18n/*/");
        let mut found: Vec<_> = pattern
            .matches()
            .unwrap()
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        found.sort();
        assert_eq!(found, vec!["de", "it"]);
    }

    #[tokio::test]
    async fn test_absolute_prefix_under_root() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "i18n/en.json", r#"{"app": {"a": "A"}}"#);
        let prefix = format!("{}/i18n/", dir.path().to_string_lossy().replace('\\', "/"));
        let pattern = TranslationPattern::new(dir.path(), prefix);

        let targets = discover(&pattern, Platform::Android).await.unwrap();
        assert_eq!(locales(&targets), vec!["en"]);
        assert!(targets[0].document_path.ends_with("i18n/en.json"));
    }

    #[test]
    fn test_glob_pattern_escapes_root() {
        let pattern = TranslationPattern::new("/work/[beta]", "translations/app/");
        assert_eq!(
            pattern.glob_pattern(),
            "/work/[[]beta[]]/translations/app/*.json"
        );
    }

    #[tokio::test]
    async fn test_group_by_locale_keeps_discovery_order() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "translations/app/a.json", r#"{"locale": {"ios": ["fr", "en"]}}"#);
        write(dir.path(), "translations/app/b.json", r#"{"locale": {"ios": ["en"]}}"#);
        let pattern = TranslationPattern::new(dir.path(), "translations/app/");

        let groups = group_by_locale(discover(&pattern, Platform::Ios).await.unwrap());
        let summary: Vec<(String, usize)> = groups
            .iter()
            .map(|(locale, targets)| (locale.to_string(), targets.len()))
            .collect();
        assert_eq!(summary, vec![("fr".to_string(), 1), ("en".to_string(), 2)]);
        assert!(groups[1].1[1].document_path.ends_with("b.json"));
    }
}
