//! Known course-review datasets and their cache settings
//!
//! Reference data changes rarely: professors are cached for 60 days, the
//! list of majors for a year, and term timetables for an hour. Bumping a
//! schema version here invalidates every entry written under the old tag.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::{CacheConfig, CacheError, ConfigError, LocalCache};

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

pub const PROFESSORS: &str = "professors";
pub const PROFESSORS_TTL: Duration = DAY.saturating_mul(60);
pub const PROFESSORS_VERSION: &str = "profV2";

pub const MAJORS: &str = "majors";
pub const MAJORS_TTL: Duration = DAY.saturating_mul(365);
pub const MAJORS_VERSION: &str = "majorsV1";

pub const TIMETABLE_TTL: Duration = Duration::from_secs(60 * 60);
pub const TIMETABLE_VERSION: &str = "gcsV1";

/// Academic terms with their own timetable namespace
pub const TERMS: [&str; 4] = ["winter", "spring", "summer", "fall"];

/// Number of whole days in `days`, for CLI overrides
pub fn days(days: u32) -> Duration {
    DAY * days
}

/// Namespace holding the timetable for `term`
pub fn timetable_namespace(term: &str) -> String {
    format!("timetable_{}", term)
}

pub fn professors() -> Result<CacheConfig, ConfigError> {
    CacheConfig::new(PROFESSORS, PROFESSORS_TTL, PROFESSORS_VERSION)
}

pub fn majors() -> Result<CacheConfig, ConfigError> {
    CacheConfig::new(MAJORS, MAJORS_TTL, MAJORS_VERSION)
}

pub fn timetable(term: &str) -> Result<CacheConfig, ConfigError> {
    CacheConfig::new(&timetable_namespace(term), TIMETABLE_TTL, TIMETABLE_VERSION)
}

/// Resolves a known namespace to its configuration
///
/// Returns `None` for namespaces this build does not know about.
pub fn preset(namespace: &str) -> Option<CacheConfig> {
    match namespace {
        PROFESSORS => professors().ok(),
        MAJORS => majors().ok(),
        _ => {
            let term = namespace.strip_prefix("timetable_")?;
            if TERMS.contains(&term) {
                timetable(term).ok()
            } else {
                None
            }
        }
    }
}

/// Every preset configuration, used by "clear everything"
pub fn all_presets() -> Vec<CacheConfig> {
    let mut presets: Vec<CacheConfig> = [professors(), majors()]
        .into_iter()
        .filter_map(Result::ok)
        .collect();
    presets.extend(TERMS.iter().filter_map(|term| timetable(term).ok()));
    presets
}

/// A professor record as cached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Professor {
    pub id: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
}

impl Professor {
    /// Derives a display name from a document id like "smith_j" when no name is set
    pub fn from_document(id: &str, name: Option<&str>) -> Self {
        let display_name = match name {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => id.replacen('_', " ", 1),
        };
        Self {
            id: id.to_string(),
            display_name,
        }
    }
}

/// Professors plus a case-insensitive name lookup
#[derive(Debug, Clone)]
pub struct ProfessorDirectory {
    pub professors: Vec<Professor>,
    by_name: HashMap<String, String>,
    pub from_cache: bool,
}

impl ProfessorDirectory {
    /// Loads the professor list through the cache and indexes it by name
    pub async fn load<E, F, Fut>(cache: &LocalCache, origin: F) -> Result<Self, CacheError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Professor>, E>>,
    {
        let config = professors()?;
        let cached = cache.get(&config, origin).await?;
        Ok(Self::new(cached.value, cached.from_cache))
    }

    pub fn new(professors: Vec<Professor>, from_cache: bool) -> Self {
        let by_name = professors
            .iter()
            .map(|p| (p.display_name.to_lowercase(), p.id.clone()))
            .collect();
        Self {
            professors,
            by_name,
            from_cache,
        }
    }

    /// Looks up a professor id by display name, ignoring case
    pub fn id_for(&self, display_name: &str) -> Option<&str> {
        self.by_name
            .get(&display_name.to_lowercase())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.professors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.professors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    #[test]
    fn test_professor_preset_matches_sixty_days() {
        let config = professors().unwrap();
        assert_eq!(config.ttl_millis(), 5_184_000_000);
        assert_eq!(config.schema_version(), "profV2");
    }

    #[test]
    fn test_majors_preset_is_one_year() {
        assert_eq!(majors().unwrap().ttl(), days(365));
    }

    #[test]
    fn test_preset_lookup() {
        assert_eq!(preset("professors"), professors().ok());
        assert_eq!(preset("timetable_winter"), timetable("winter").ok());
        assert!(preset("timetable_autumn").is_none());
        assert!(preset("unknown").is_none());
    }

    #[test]
    fn test_all_presets_covers_every_term() {
        let names: Vec<String> = all_presets()
            .iter()
            .map(|c| c.namespace().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "professors",
                "majors",
                "timetable_winter",
                "timetable_spring",
                "timetable_summer",
                "timetable_fall"
            ]
        );
    }

    #[test]
    fn test_professor_serializes_display_name_in_camel_case() {
        let json = serde_json::to_value(Professor::from_document("smith_j", Some("Jane Smith"))).unwrap();
        assert_eq!(json, serde_json::json!({ "id": "smith_j", "displayName": "Jane Smith" }));
    }

    #[test]
    fn test_professor_display_name_falls_back_to_id() {
        let professor = Professor::from_document("doe_john_a", None);
        assert_eq!(professor.display_name, "doe john_a");
    }

    #[test]
    fn test_directory_lookup_is_case_insensitive() {
        let directory = ProfessorDirectory::new(
            vec![Professor::from_document("smith_j", Some("Jane Smith"))],
            false,
        );
        assert_eq!(directory.id_for("JANE SMITH"), Some("smith_j"));
        assert_eq!(directory.id_for("John Smith"), None);
        assert_eq!(directory.len(), 1);
    }

    #[tokio::test]
    async fn test_directory_load_uses_cache_on_second_call() {
        let cache = LocalCache::with_clock(
            Arc::new(MemoryStore::new()),
            Arc::new(ManualClock::new(1_700_000_000_000)),
        );
        let origin = || async {
            Ok::<_, std::io::Error>(vec![Professor::from_document("smith_j", Some("Jane Smith"))])
        };

        let first = ProfessorDirectory::load(&cache, origin).await.unwrap();
        let second = ProfessorDirectory::load(&cache, origin).await.unwrap();

        assert!(!first.from_cache);
        assert!(second.from_cache);
        assert_eq!(second.id_for("jane smith"), Some("smith_j"));
    }
}
