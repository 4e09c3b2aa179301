use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use crate::error::{Result, SpendError};
use crate::models::UNKNOWN_ALIAS;
use crate::settings::ImportProfile;

// ---------------------------------------------------------------------------
// Ordered alias -> keywords mapping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Categories(Vec<(String, Vec<String>)>);

impl Categories {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(a, k)| (a.as_str(), k.as_slice()))
    }

    /// Aliases used for matching, i.e. everything but `Unknown`.
    pub fn rules(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.iter().filter(|(alias, _)| *alias != UNKNOWN_ALIAS)
    }

    pub fn get(&self, alias: &str) -> Option<&[String]> {
        self.0
            .iter()
            .find(|(a, _)| a == alias)
            .map(|(_, k)| k.as_slice())
    }

    fn get_mut(&mut self, alias: &str) -> Option<&mut Vec<String>> {
        self.0.iter_mut().find(|(a, _)| a == alias).map(|(_, k)| k)
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.get(alias).is_some()
    }

    /// Insert or replace; a replaced alias keeps its position.
    pub fn insert(&mut self, alias: impl Into<String>, keywords: Vec<String>) {
        let alias = alias.into();
        match self.get_mut(&alias) {
            Some(existing) => *existing = keywords,
            None => self.0.push((alias, keywords)),
        }
    }

    pub fn remove(&mut self, alias: &str) -> Option<Vec<String>> {
        let idx = self.0.iter().position(|(a, _)| a == alias)?;
        Some(self.0.remove(idx).1)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn unknown_mut(&mut self) -> &mut Vec<String> {
        let idx = match self.0.iter().position(|(a, _)| a == UNKNOWN_ALIAS) {
            Some(idx) => idx,
            None => {
                self.0.push((UNKNOWN_ALIAS.to_string(), Vec::new()));
                self.0.len() - 1
            }
        };
        &mut self.0[idx].1
    }
}

impl<A: Into<String>, K: Into<String>> FromIterator<(A, Vec<K>)> for Categories {
    fn from_iter<I: IntoIterator<Item = (A, Vec<K>)>>(iter: I) -> Self {
        let mut categories = Categories::new();
        for (alias, keywords) in iter {
            categories.insert(alias, keywords.into_iter().map(Into::into).collect());
        }
        categories
    }
}

impl Serialize for Categories {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (alias, keywords) in &self.0 {
            map.serialize_entry(alias, keywords)?;
        }
        map.end()
    }
}

struct CategoriesVisitor;

impl<'de> Visitor<'de> for CategoriesVisitor {
    type Value = Categories;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an object mapping category aliases to keyword lists")
    }

    fn visit_map<M: MapAccess<'de>>(self, mut access: M) -> std::result::Result<Categories, M::Error> {
        let mut categories = Categories::new();
        while let Some((alias, keywords)) = access.next_entry::<String, Vec<String>>()? {
            categories.insert(alias, keywords);
        }
        Ok(categories)
    }
}

impl<'de> Deserialize<'de> for Categories {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(CategoriesVisitor)
    }
}

// ---------------------------------------------------------------------------
// File layout
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Definitions {
    #[serde(
        default,
        serialize_with = "profile_as_object",
        deserialize_with = "profile_from_object"
    )]
    pub settings: Option<ImportProfile>,
    #[serde(default)]
    pub categories: Categories,
}

fn profile_as_object<S: Serializer>(
    profile: &Option<ImportProfile>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match profile {
        Some(p) => p.serialize(serializer),
        None => serializer.serialize_map(Some(0))?.end(),
    }
}

fn profile_from_object<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<ImportProfile>, D::Error> {
    let raw = Option::<serde_json::Map<String, serde_json::Value>>::deserialize(deserializer)?;
    match raw {
        Some(map) if !map.is_empty() => serde_json::from_value(serde_json::Value::Object(map))
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// Edits
// ---------------------------------------------------------------------------

/// A change made to the category definitions from the front end.
#[derive(Debug, Clone, PartialEq)]
pub enum CategoryEdit {
    AddAlias { alias: String },
    RenameAlias { alias: String, new_name: String },
    DeleteAlias { alias: String },
    AddKeyword { alias: String, keyword: String },
    RenameKeyword { alias: String, keyword: String, new_keyword: String },
    DeleteKeyword { alias: String, keyword: String },
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// The definitions JSON file kept next to the imported exports: the import
/// profile under `settings`, and `categories` in the order the aliases were
/// created. The reserved `Unknown` alias lists descriptions no other alias
/// matched, waiting to be triaged.
#[derive(Debug, Clone)]
pub struct DefinitionsStore {
    path: PathBuf,
    data: Definitions,
}

impl DefinitionsStore {
    /// Load the definitions at `path`. A missing file yields an empty store.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = if path.is_file() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            debug!(path = %path.display(), "No category definitions yet, starting empty");
            Definitions::default()
        };
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn categories(&self) -> &Categories {
        &self.data.categories
    }

    pub fn save(&self) -> Result<()> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.data.serialize(&mut ser)?;
        buf.push(b'\n');
        std::fs::write(&self.path, buf)?;
        Ok(())
    }

    pub fn profile(&self) -> Option<&ImportProfile> {
        self.data.settings.as_ref()
    }

    /// Remember the import settings of a successful import and persist them.
    pub fn save_profile(&mut self, profile: ImportProfile) -> Result<()> {
        self.data.settings = Some(profile);
        self.save()
    }

    pub fn aliases(&self, include_unknown: bool, include_empty: bool) -> Vec<&str> {
        self.data
            .categories
            .iter()
            .filter(|(alias, keywords)| {
                (include_unknown || *alias != UNKNOWN_ALIAS) && (include_empty || !keywords.is_empty())
            })
            .map(|(alias, _)| alias)
            .collect()
    }

    /// Keywords for `alias`; an alias that does not exist has none.
    pub fn keywords(&self, alias: &str) -> &[String] {
        self.data.categories.get(alias).unwrap_or(&[])
    }

    pub fn unknown_entries(&self) -> &[String] {
        self.keywords(UNKNOWN_ALIAS)
    }

    /// Append newly unmatched descriptions to the Unknown list, skipping ones
    /// already present. Returns how many were added.
    pub fn merge_unknown<'a>(&mut self, descriptions: impl IntoIterator<Item = &'a str>) -> usize {
        let unknown = self.data.categories.unknown_mut();
        let mut added = 0;
        for desc in descriptions {
            let desc = desc.trim();
            if desc.is_empty() || unknown.iter().any(|u| u == desc) {
                continue;
            }
            unknown.push(desc.to_string());
            added += 1;
        }
        added
    }

    pub fn clear_unknown(&mut self) {
        self.data.categories.unknown_mut().clear();
    }

    /// Apply an edit in memory. The caller persists and reclassifies.
    pub fn apply(&mut self, edit: CategoryEdit) -> Result<()> {
        if let CategoryEdit::AddKeyword { alias, .. }
        | CategoryEdit::RenameKeyword { alias, .. }
        | CategoryEdit::DeleteKeyword { alias, .. } = &edit
        {
            if alias == UNKNOWN_ALIAS {
                return Err(SpendError::Other(format!(
                    "The {UNKNOWN_ALIAS} alias is reserved and cannot hold keywords"
                )));
            }
        }
        let categories = &mut self.data.categories;
        match edit {
            CategoryEdit::AddAlias { alias } => {
                let alias = non_blank(alias, "alias")?;
                if !categories.contains(&alias) {
                    categories.insert(alias, Vec::new());
                }
            }
            CategoryEdit::RenameAlias { alias, new_name } => {
                let new_name = non_blank(new_name, "alias")?;
                if alias == UNKNOWN_ALIAS || new_name == UNKNOWN_ALIAS {
                    return Err(SpendError::Other(format!(
                        "The {UNKNOWN_ALIAS} alias is reserved and cannot be renamed"
                    )));
                }
                if alias != new_name && categories.contains(&new_name) {
                    return Err(SpendError::Other(format!("Alias already exists: {new_name}")));
                }
                let entry = categories
                    .0
                    .iter_mut()
                    .find(|(a, _)| *a == alias)
                    .ok_or_else(|| SpendError::UnknownAlias(alias.clone()))?;
                entry.0 = new_name;
            }
            CategoryEdit::DeleteAlias { alias } => {
                categories
                    .remove(&alias)
                    .ok_or(SpendError::UnknownAlias(alias))?;
            }
            CategoryEdit::AddKeyword { alias, keyword } => {
                let keyword = non_blank(keyword, "keyword")?;
                let list = categories
                    .get_mut(&alias)
                    .ok_or(SpendError::UnknownAlias(alias))?;
                if !list.contains(&keyword) {
                    list.push(keyword);
                }
            }
            CategoryEdit::RenameKeyword {
                alias,
                keyword,
                new_keyword,
            } => {
                let new_keyword = non_blank(new_keyword, "keyword")?;
                let list = categories
                    .get_mut(&alias)
                    .ok_or(SpendError::UnknownAlias(alias))?;
                let idx = list
                    .iter()
                    .position(|k| *k == keyword)
                    .ok_or_else(|| SpendError::Other(format!("Unknown keyword: {keyword}")))?;
                if new_keyword != keyword && list.contains(&new_keyword) {
                    list.remove(idx);
                } else {
                    list[idx] = new_keyword;
                }
            }
            CategoryEdit::DeleteKeyword { alias, keyword } => {
                let list = categories
                    .get_mut(&alias)
                    .ok_or(SpendError::UnknownAlias(alias))?;
                let before = list.len();
                list.retain(|k| *k != keyword);
                if list.len() == before {
                    return Err(SpendError::Other(format!("Unknown keyword: {keyword}")));
                }
            }
        }
        Ok(())
    }
}

fn non_blank(value: String, what: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SpendError::Other(format!("The {what} must not be empty")));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{ColumnMapping, FileType};

    fn store_with(categories: Categories) -> (tempfile::TempDir, DefinitionsStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = DefinitionsStore {
            path: dir.path().join("category_definitions.json"),
            data: Definitions {
                settings: None,
                categories,
            },
        };
        (dir, store)
    }

    #[test]
    fn test_missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = DefinitionsStore::load(dir.path().join("category_definitions.json")).unwrap();
        assert!(store.categories().is_empty());
        assert!(store.profile().is_none());
        assert!(store.unknown_entries().is_empty());
    }

    #[test]
    fn test_missing_keys_are_filled_in() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("defs.json");
        std::fs::write(&path, "{}").unwrap();
        let store = DefinitionsStore::load(&path).unwrap();
        assert!(store.categories().is_empty());
        assert!(store.profile().is_none());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("defs.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(DefinitionsStore::load(&path), Err(SpendError::Json(_))));
    }

    #[test]
    fn test_category_order_survives_roundtrip() {
        let (_dir, mut store) = store_with(
            [
                ("Zoo", vec!["zebra"]),
                ("Apples", vec!["fruit", "market"]),
                ("Middle", vec![]),
            ]
            .into_iter()
            .collect(),
        );
        store
            .save_profile(ImportProfile {
                file_type: FileType::Csv,
                date_format: "%d-%m-%Y".into(),
                columns: ColumnMapping::default(),
                delimiter: Some(';'),
                has_header: None,
            })
            .unwrap();

        let loaded = DefinitionsStore::load(store.path()).unwrap();
        assert_eq!(loaded.aliases(true, true), vec!["Zoo", "Apples", "Middle"]);
        assert_eq!(loaded.keywords("Apples"), ["fruit", "market"]);
        assert_eq!(loaded.profile().unwrap().date_format, "%d-%m-%Y");
        assert_eq!(loaded.profile().unwrap().delimiter, Some(';'));
        assert_eq!(loaded.profile().unwrap().has_header, None);
    }

    #[test]
    fn test_saved_file_layout() {
        let (_dir, store) = store_with([("Housing", vec!["Rent"])].into_iter().collect());
        store.save().unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["settings"], serde_json::json!({}));
        assert_eq!(raw["categories"]["Housing"], serde_json::json!(["Rent"]));
    }

    #[test]
    fn test_aliases_filters() {
        let (_dir, mut store) = store_with(
            [("Food", vec!["cafe"]), ("Empty", vec![])].into_iter().collect(),
        );
        store.merge_unknown(["SUBWAY"]);
        assert_eq!(store.aliases(true, true), vec!["Food", "Empty", "Unknown"]);
        assert_eq!(store.aliases(false, true), vec!["Food", "Empty"]);
        assert_eq!(store.aliases(false, false), vec!["Food"]);
        assert!(store.keywords("Nope").is_empty());
    }

    #[test]
    fn test_merge_unknown_deduplicates() {
        let (_dir, mut store) = store_with(Categories::new());
        assert_eq!(store.merge_unknown(["SUBWAY", " SUBWAY ", "Barber", ""]), 2);
        assert_eq!(store.merge_unknown(["Barber", "Cafe"]), 1);
        assert_eq!(store.unknown_entries(), ["SUBWAY", "Barber", "Cafe"]);
        store.clear_unknown();
        assert!(store.unknown_entries().is_empty());
    }

    #[test]
    fn test_rename_alias_keeps_position() {
        let (_dir, mut store) = store_with(
            [("A", vec!["a"]), ("B", vec!["b"]), ("C", vec!["c"])]
                .into_iter()
                .collect(),
        );
        store
            .apply(CategoryEdit::RenameAlias {
                alias: "B".into(),
                new_name: "Bee".into(),
            })
            .unwrap();
        assert_eq!(store.aliases(true, true), vec!["A", "Bee", "C"]);
        assert_eq!(store.keywords("Bee"), ["b"]);
    }

    #[test]
    fn test_rename_alias_rejects_collision_and_unknown() {
        let (_dir, mut store) = store_with([("A", vec!["a"]), ("B", vec!["b"])].into_iter().collect());
        assert!(store
            .apply(CategoryEdit::RenameAlias {
                alias: "A".into(),
                new_name: "B".into()
            })
            .is_err());
        assert!(matches!(
            store.apply(CategoryEdit::RenameAlias {
                alias: "Missing".into(),
                new_name: "X".into()
            }),
            Err(SpendError::UnknownAlias(_))
        ));
        assert!(store
            .apply(CategoryEdit::RenameAlias {
                alias: "A".into(),
                new_name: UNKNOWN_ALIAS.into()
            })
            .is_err());
    }

    #[test]
    fn test_keyword_edits() {
        let (_dir, mut store) = store_with([("Food", vec!["cafe"])].into_iter().collect());
        store
            .apply(CategoryEdit::AddKeyword {
                alias: "Food".into(),
                keyword: "sushi".into(),
            })
            .unwrap();
        store
            .apply(CategoryEdit::RenameKeyword {
                alias: "Food".into(),
                keyword: "cafe".into(),
                new_keyword: "bistro".into(),
            })
            .unwrap();
        assert_eq!(store.keywords("Food"), ["bistro", "sushi"]);

        store
            .apply(CategoryEdit::DeleteKeyword {
                alias: "Food".into(),
                keyword: "bistro".into(),
            })
            .unwrap();
        assert_eq!(store.keywords("Food"), ["sushi"]);
        assert!(store
            .apply(CategoryEdit::DeleteKeyword {
                alias: "Food".into(),
                keyword: "bistro".into(),
            })
            .is_err());
    }

    #[test]
    fn test_keyword_edits_reject_unknown_alias() {
        let (_dir, mut store) = store_with(
            [("Food", vec!["cafe"]), (UNKNOWN_ALIAS, vec!["Barber"])]
                .into_iter()
                .collect(),
        );
        let edits = [
            CategoryEdit::AddKeyword {
                alias: UNKNOWN_ALIAS.into(),
                keyword: "gym".into(),
            },
            CategoryEdit::RenameKeyword {
                alias: UNKNOWN_ALIAS.into(),
                keyword: "Barber".into(),
                new_keyword: "Hair".into(),
            },
            CategoryEdit::DeleteKeyword {
                alias: UNKNOWN_ALIAS.into(),
                keyword: "Barber".into(),
            },
        ];
        for edit in edits {
            let err = store.apply(edit).unwrap_err();
            assert!(err.to_string().contains("reserved"));
        }
        assert_eq!(store.unknown_entries(), ["Barber"]);
    }

    #[test]
    fn test_partial_column_mapping_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("defs.json");
        std::fs::write(
            &path,
            r#"{"settings": {"date_format": "%d.%m.%Y", "columns": {"date": 2}}, "categories": {}}"#,
        )
        .unwrap();
        let store = DefinitionsStore::load(&path).unwrap();
        let profile = store.profile().unwrap();
        assert_eq!(profile.date_format, "%d.%m.%Y");
        assert_eq!(
            profile.columns,
            ColumnMapping {
                date: 2,
                ..ColumnMapping::default()
            }
        );
    }

    #[test]
    fn test_add_existing_alias_keeps_keywords() {
        let (_dir, mut store) = store_with([("Food", vec!["cafe"])].into_iter().collect());
        store
            .apply(CategoryEdit::AddAlias {
                alias: "Food".into(),
            })
            .unwrap();
        assert_eq!(store.keywords("Food"), ["cafe"]);
        assert!(store
            .apply(CategoryEdit::AddAlias { alias: "  ".into() })
            .is_err());
    }

    #[test]
    fn test_delete_alias() {
        let (_dir, mut store) = store_with([("Food", vec!["cafe"])].into_iter().collect());
        store
            .apply(CategoryEdit::DeleteAlias {
                alias: "Food".into(),
            })
            .unwrap();
        assert!(store.categories().is_empty());
        assert!(matches!(
            store.apply(CategoryEdit::DeleteAlias {
                alias: "Food".into()
            }),
            Err(SpendError::UnknownAlias(_))
        ));
    }
}
