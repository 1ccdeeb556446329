//! iOS Resource Merger and Project Manifest Registrar.
//!
//! `.strings` tables are regenerated from scratch on every run (no merge with
//! what is on disk). Once every table of every locale is written, the produced
//! files are registered in the Xcode project as members of the
//! `Localizable.strings` and `InfoPlist.strings` variant groups.

use std::{
    borrow::Cow,
    collections::HashSet,
    fmt::{Display, Formatter},
    path::PathBuf,
};

use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::{
    config::{HookConfig, IosPaths},
    error::Error,
    formats::{PbxprojFormat, StringsFormat},
    resolver::{self, TranslationPattern},
    traits::Parser,
    types::{Locale, Platform, Section, TranslationDocument},
};

/// The two string tables produced per locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringTable {
    /// `InfoPlist.strings`, from `config_ios`.
    InfoPlist,
    /// `Localizable.strings`, from the app label sections.
    Localizable,
}

impl StringTable {
    pub fn file_name(&self) -> &'static str {
        match self {
            StringTable::InfoPlist => "InfoPlist.strings",
            StringTable::Localizable => "Localizable.strings",
        }
    }

    pub fn entries<'a>(&self, document: &'a TranslationDocument) -> Cow<'a, Section> {
        match self {
            StringTable::InfoPlist => Cow::Borrowed(document.info_plist_entries()),
            StringTable::Localizable => Cow::Owned(document.localizable_entries()),
        }
    }

    /// Path of the table relative to the resources folder, e.g.
    /// `fr.lproj/Localizable.strings`.
    pub fn relative_path(&self, locale: &Locale) -> String {
        format!("{}.lproj/{}", locale, self.file_name())
    }
}

impl Display for StringTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.file_name())
    }
}

/// What the iOS merger wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IosReport {
    /// Every `.strings` file written, in discovery order.
    pub tables: Vec<PathBuf>,
    /// Relative paths newly registered in the project manifest.
    pub registered: Vec<String>,
    /// The manifest path, when it was rewritten.
    pub manifest: Option<PathBuf>,
}

/// Writes one string table for `locale`. An empty section produces nothing.
///
/// Returns the table's path relative to the resources folder.
pub async fn render_and_write(
    config: &HookConfig,
    paths: &IosPaths,
    locale: &Locale,
    table: StringTable,
    document: &TranslationDocument,
) -> Result<Option<String>, Error> {
    let entries = table.entries(document);
    if entries.is_empty() {
        debug!("Skipping {} for {}: no entries", table, locale);
        return Ok(None);
    }

    let bytes = StringsFormat::from_section(&entries).encode(config.strings_encoding)?;
    let lproj = paths.resources_dir.join(format!("{locale}.lproj"));
    tokio::fs::create_dir_all(&lproj)
        .await
        .map_err(|e| Error::io_at(&lproj, e))?;
    let path = lproj.join(table.file_name());
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| Error::io_at(&path, e))?;
    info!("Saved: {}", path.display());
    Ok(Some(table.relative_path(locale)))
}

/// Registers `paths` as members of the variant group `group`, creating the
/// group on first use. Paths already referenced anywhere in the project are
/// skipped. Returns the newly registered paths.
///
/// `resources_path` locates the resources folder from the project folder; it
/// is only used when the project has no `Resources` group.
pub fn register_group(
    manifest: &mut PbxprojFormat,
    group: &str,
    resources_path: &str,
    paths: &[String],
) -> Result<Vec<String>, Error> {
    if paths.is_empty() {
        return Ok(Vec::new());
    }

    let group_key = match manifest.find_variant_group(group) {
        Some(key) => key,
        None => {
            debug!("Creating variant group {}", group);
            manifest.add_localization_variant_group(group, resources_path)?
        }
    };

    let mut known: HashSet<String> = manifest.file_reference_paths().into_iter().collect();
    let mut registered = Vec::new();
    for path in paths {
        if let Some((region, _)) = path.split_once(".lproj/") {
            manifest.add_known_region(region)?;
        }
        if !known.insert(path.clone()) {
            continue;
        }
        manifest.add_variant_file_reference(&group_key, path)?;
        registered.push(path.clone());
    }
    Ok(registered)
}

/// Reads the project manifest, registers the produced tables and writes it
/// back when anything changed.
async fn register_tables(
    paths: &IosPaths,
    produced: &[(StringTable, Vec<String>)],
) -> Result<(Vec<String>, bool), Error> {
    let manifest_path = &paths.pbxproj_path;
    let original = tokio::fs::read_to_string(manifest_path)
        .await
        .map_err(|e| Error::io_at(manifest_path, e))?;
    let mut manifest = PbxprojFormat::from_str(&original).map_err(|e| match e {
        Error::ManifestParse(message) => {
            Error::manifest_parse(format!("{}: {message}", manifest_path.display()))
        }
        other => other,
    })?;

    let mut registered = Vec::new();
    for (table, table_paths) in produced {
        registered.extend(register_group(
            &mut manifest,
            table.file_name(),
            &paths.resources_group_path,
            table_paths,
        )?);
    }

    let rendered = manifest.to_bytes()?;
    if rendered == original.as_bytes() {
        debug!("{} already up to date", manifest_path.display());
        return Ok((registered, false));
    }
    tokio::fs::write(manifest_path, rendered)
        .await
        .map_err(|e| Error::io_at(manifest_path, e))?;
    info!(
        "Saved: {} ({} new localization reference(s))",
        manifest_path.display(),
        registered.len()
    );
    Ok((registered, true))
}

/// Runs the iOS merger: renders every table of every target, then, after all
/// writes completed, registers them in the project manifest.
pub async fn run(config: &HookConfig) -> Result<IosReport, Error> {
    let paths = config.ios_paths()?;
    let pattern = TranslationPattern::new(&config.project_root, &config.translation_path);
    let targets = resolver::discover(&pattern, Platform::Ios).await?;

    // Dropping the set on an early error aborts the locales still in flight.
    let mut tasks = JoinSet::new();
    for (index, (locale, group)) in resolver::group_by_locale(targets).into_iter().enumerate() {
        let config = config.clone();
        let paths = paths.clone();
        tasks.spawn(async move {
            let mut info_plist = None;
            let mut localizable = None;
            for target in &group {
                let document = &target.document;
                let (info, local) = tokio::try_join!(
                    render_and_write(&config, &paths, &locale, StringTable::InfoPlist, document),
                    render_and_write(&config, &paths, &locale, StringTable::Localizable, document),
                )?;
                info_plist = info.or(info_plist);
                localizable = local.or(localizable);
            }
            Ok::<_, Error>((index, info_plist, localizable))
        });
    }

    // barrier: every table is on disk before the manifest is touched
    let mut finished = Vec::new();
    while let Some(result) = tasks.join_next().await {
        finished.push(result??);
    }
    finished.sort_by_key(|(index, _, _)| *index);

    let mut info_plist_paths = Vec::new();
    let mut localizable_paths = Vec::new();
    for (_, info, local) in finished {
        info_plist_paths.extend(info);
        localizable_paths.extend(local);
    }

    let mut report = IosReport {
        tables: localizable_paths
            .iter()
            .chain(&info_plist_paths)
            .map(|relative| paths.resources_dir.join(relative))
            .collect(),
        ..IosReport::default()
    };
    if report.tables.is_empty() {
        debug!("No iOS string tables produced; project manifest left untouched");
        return Ok(report);
    }

    // Localizable.strings is registered before InfoPlist.strings
    let produced = [
        (StringTable::Localizable, localizable_paths),
        (StringTable::InfoPlist, info_plist_paths),
    ];
    let (registered, rewritten) = register_tables(&paths, &produced).await?;
    report.registered = registered;
    report.manifest = rewritten.then(|| paths.pbxproj_path.clone());
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::pbxproj::tests::{SAMPLE, sample};
    use pretty_assertions::assert_eq;
    use std::{fs, path::Path};
    use tempfile::TempDir;

    const RESOURCES: &str = "Hello/Resources";

    fn document(json: &str) -> TranslationDocument {
        TranslationDocument::from_json(Locale::parse("en").unwrap(), json.as_bytes()).unwrap()
    }

    fn project(root: &Path) -> HookConfig {
        HookConfig::new(root).with_app_name(Some("Hello".to_string()))
    }

    #[tokio::test]
    async fn test_render_replaces_previous_table() {
        let dir = TempDir::new().unwrap();
        let config = project(dir.path());
        let paths = config.ios_paths().unwrap();
        let en = Locale::parse("en").unwrap();

        let stale = paths.resources_dir.join("en.lproj/Localizable.strings");
        fs::create_dir_all(stale.parent().unwrap()).unwrap();
        fs::write(&stale, "\"stale\" = \"old\";\n").unwrap();

        let doc = document(r#"{"app": {"title": "Say \"hi\""}}"#);
        let relative = render_and_write(&config, &paths, &en, StringTable::Localizable, &doc)
            .await
            .unwrap();
        assert_eq!(relative.as_deref(), Some("en.lproj/Localizable.strings"));
        assert_eq!(
            fs::read_to_string(&stale).unwrap(),
            "\"title\" = \"Say \\\"hi\\\"\";\n"
        );
    }

    #[tokio::test]
    async fn test_empty_section_is_skipped() {
        let dir = TempDir::new().unwrap();
        let config = project(dir.path());
        let paths = config.ios_paths().unwrap();
        let en = Locale::parse("en").unwrap();

        let doc = document(r#"{"config_ios": {}, "app": {"a": "A"}}"#);
        let relative = render_and_write(&config, &paths, &en, StringTable::InfoPlist, &doc)
            .await
            .unwrap();
        assert_eq!(relative, None);
        assert!(!paths.resources_dir.join("en.lproj/InfoPlist.strings").exists());
    }

    #[tokio::test]
    async fn test_utf16_tables() {
        let dir = TempDir::new().unwrap();
        let config = project(dir.path())
            .with_strings_encoding(crate::formats::StringsEncoding::Utf16);
        let paths = config.ios_paths().unwrap();
        let fr = Locale::parse("fr").unwrap();

        let doc = document(r#"{"config_ios": {"CFBundleDisplayName": "Bonjour"}}"#);
        render_and_write(&config, &paths, &fr, StringTable::InfoPlist, &doc)
            .await
            .unwrap();
        let bytes = fs::read(paths.resources_dir.join("fr.lproj/InfoPlist.strings")).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xFE]);
        let table = StringsFormat::from_bytes(&bytes).unwrap();
        assert_eq!(table.get("CFBundleDisplayName"), Some("Bonjour"));
    }

    #[test]
    fn test_register_group_is_idempotent() {
        let mut manifest = sample();
        let paths = vec!["fr.lproj/Localizable.strings".to_string()];

        let first = register_group(&mut manifest, "Localizable.strings", RESOURCES, &paths).unwrap();
        let second = register_group(&mut manifest, "Localizable.strings", RESOURCES, &paths).unwrap();
        assert_eq!(first, paths);
        assert!(second.is_empty());

        let count = manifest
            .file_reference_paths()
            .iter()
            .filter(|p| *p == "fr.lproj/Localizable.strings")
            .count();
        assert_eq!(count, 1);
        assert_eq!(
            manifest
                .objects_of(crate::formats::pbxproj::VARIANT_GROUP_ISA)
                .count(),
            1
        );
    }

    #[test]
    fn test_register_group_adds_known_region() {
        let mut manifest = sample();
        register_group(
            &mut manifest,
            "InfoPlist.strings",
            RESOURCES,
            &["pt_BR.lproj/InfoPlist.strings".to_string()],
        )
        .unwrap();
        let rendered = String::from_utf8(manifest.to_bytes().unwrap()).unwrap();
        assert!(rendered.contains("\t\t\t\tpt_BR,\n"), "{}", rendered);
    }

    #[test]
    fn test_register_nothing_leaves_manifest_alone() {
        let mut manifest = sample();
        assert!(register_group(&mut manifest, "Localizable.strings", RESOURCES, &[]).unwrap().is_empty());
        assert_eq!(String::from_utf8(manifest.to_bytes().unwrap()).unwrap(), SAMPLE);
    }

    #[tokio::test]
    async fn test_run_registers_after_writing() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let translations = root.join("translations/app");
        fs::create_dir_all(&translations).unwrap();
        fs::write(
            translations.join("en.json"),
            r#"{"config_ios": {"CFBundleDisplayName": "Hello"}, "app": {"title": "Title"}}"#,
        )
        .unwrap();
        fs::write(translations.join("de.json"), r#"{"app": {"title": "Titel"}}"#).unwrap();

        let config = project(root);
        let paths = config.ios_paths().unwrap();
        fs::create_dir_all(paths.pbxproj_path.parent().unwrap()).unwrap();
        fs::write(&paths.pbxproj_path, SAMPLE).unwrap();

        let report = run(&config).await.unwrap();
        assert_eq!(
            report.registered,
            vec![
                "de.lproj/Localizable.strings",
                "en.lproj/Localizable.strings",
                "en.lproj/InfoPlist.strings",
            ]
        );
        assert_eq!(report.tables.len(), 3);
        assert_eq!(report.manifest.as_ref(), Some(&paths.pbxproj_path));

        let again = run(&config).await.unwrap();
        assert!(again.registered.is_empty());
        assert_eq!(again.manifest, None);
    }

    #[tokio::test]
    async fn test_run_stops_on_write_failure() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let translations = root.join("translations/app");
        fs::create_dir_all(&translations).unwrap();
        fs::write(translations.join("en.json"), r#"{"app": {"title": "Title"}}"#).unwrap();
        fs::write(translations.join("de.json"), r#"{"app": {"title": "Titel"}}"#).unwrap();

        let config = project(root);
        let paths = config.ios_paths().unwrap();
        fs::create_dir_all(paths.pbxproj_path.parent().unwrap()).unwrap();
        fs::write(&paths.pbxproj_path, SAMPLE).unwrap();
        // a plain file where the locale folder should go
        fs::create_dir_all(&paths.resources_dir).unwrap();
        fs::write(paths.resources_dir.join("de.lproj"), "not a folder").unwrap();

        match run(&config).await {
            Err(Error::IoAt { path, .. }) => assert!(path.ends_with("de.lproj")),
            other => panic!("expected an I/O error, got {:?}", other),
        }
        assert_eq!(fs::read_to_string(&paths.pbxproj_path).unwrap(), SAMPLE);
    }

    #[tokio::test]
    async fn test_run_without_tables_skips_manifest() {
        let dir = TempDir::new().unwrap();
        let config = project(dir.path());
        // no translations and no project file: nothing to read, nothing to fail
        let report = run(&config).await.unwrap();
        assert_eq!(report, IosReport::default());
    }
}
