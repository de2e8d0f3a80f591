use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::crawler::Query;
use crate::dedup::ResultSet;

/// Characters that cannot appear in a file name on common filesystems.
static UNSAFE_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[/\\:*?"<>|\x00-\x1F]"#).unwrap());

/// Persists one query's result set as a pretty-printed JSON array under
/// `data_dir`, named `"{city} {district} {category}.json"`.
pub fn write_result_set(data_dir: &Path, query: &Query, results: &ResultSet) -> Result<PathBuf> {
    fs::create_dir_all(data_dir)
        .with_context(|| format!("creating data dir {}", data_dir.display()))?;

    let label = query.label();
    let name = UNSAFE_FILENAME_CHARS.replace_all(&label, "_");
    let path = data_dir.join(format!("{}.json", name.trim()));

    let json = serde_json::to_string_pretty(results.records())?;
    fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{extract, RawItem};
    use serde_json::json;

    fn query(city: &str, district: &str, category: &str) -> Query {
        Query {
            city: city.to_string(),
            district: district.to_string(),
            category: category.to_string(),
        }
    }

    #[test]
    fn writes_records_as_json_array() {
        let dir = std::env::temp_dir().join("map-crawler-storage-test");
        let _ = fs::remove_dir_all(&dir);

        let item: RawItem =
            serde_json::from_value(json!({"type": "business", "title": "A", "address": "X"}))
                .unwrap();
        let mut results = ResultSet::default();
        results.insert(extract(&item).unwrap());

        let path = write_result_set(&dir, &query("Minsk", "Center", "coffee"), &results).unwrap();
        assert_eq!(path.file_name().unwrap(), "Minsk Center coffee.json");

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, json!([{"title": "A", "address": "X"}]));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn hostile_characters_are_sanitized_out_of_the_filename() {
        let dir = std::env::temp_dir().join("map-crawler-storage-sanitize-test");
        let _ = fs::remove_dir_all(&dir);

        let path = write_result_set(
            &dir,
            &query("Minsk", "a/b", "cafe: best?"),
            &ResultSet::default(),
        )
        .unwrap();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(!name.contains('/'));
        assert!(!name.contains(':'));
        assert!(!name.contains('?'));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn empty_result_set_still_produces_a_file() {
        let dir = std::env::temp_dir().join("map-crawler-storage-empty-test");
        let _ = fs::remove_dir_all(&dir);

        let path =
            write_result_set(&dir, &query("Minsk", "", "hotel"), &ResultSet::default()).unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, json!([]));

        let _ = fs::remove_dir_all(&dir);
    }
}
