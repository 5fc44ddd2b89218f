use serde::{Deserialize, Serialize};
use std::path::Path;

use super::ReportError;

const BUILTIN_CATALOG: &str = include_str!("tumor_info.yaml");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TumorInfo {
    pub key: String,
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub subtypes: Vec<String>,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub treatments: Vec<String>,
    #[serde(default)]
    pub prognosis: Option<String>,
    #[serde(default)]
    pub prevalence: Option<String>,
}

/// Static reference text keyed by class label. Loaded once at startup and
/// never mutated.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct TumorCatalog {
    entries: Vec<TumorInfo>,
}

impl TumorCatalog {
    pub fn builtin() -> Result<Self, ReportError> {
        Self::from_yaml(BUILTIN_CATALOG)
    }

    pub fn from_path(path: &Path) -> Result<Self, ReportError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ReportError> {
        let entries: Vec<TumorInfo> =
            serde_yaml::from_str(yaml).map_err(|e| ReportError::Catalog(e.to_string()))?;
        for (i, entry) in entries.iter().enumerate() {
            if entry.key.trim().is_empty() {
                return Err(ReportError::Catalog(format!("entry {i} has an empty key")));
            }
            if entries[..i]
                .iter()
                .any(|e| e.key.eq_ignore_ascii_case(&entry.key))
            {
                return Err(ReportError::Catalog(format!("duplicate key {}", entry.key)));
            }
        }
        Ok(Self { entries })
    }

    /// Case-insensitive lookup by label.
    pub fn get(&self, label: &str) -> Option<&TumorInfo> {
        let label = label.trim();
        self.entries
            .iter()
            .find(|entry| entry.key.eq_ignore_ascii_case(label))
    }

    pub fn iter(&self) -> impl Iterator<Item = &TumorInfo> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::TumorClass;

    #[test]
    fn test_builtin_covers_every_class() {
        let catalog = TumorCatalog::builtin().unwrap();
        for class in TumorClass::ALL {
            let info = catalog.get(class.as_ref()).unwrap();
            assert!(!info.summary.is_empty());
        }
        assert_eq!(catalog.len(), 4);
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let catalog = TumorCatalog::builtin().unwrap();
        assert_eq!(catalog.get("GLIOMA").unwrap().title, "Glioma Tumor");
        assert!(catalog.get("unknownclass").is_none());
    }

    #[test]
    fn test_reference_order_preserved() {
        let catalog = TumorCatalog::builtin().unwrap();
        let keys: Vec<&str> = catalog.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["meningioma", "glioma", "pituitary", "notumor"]);
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let yaml = "- key: glioma\n  title: A\n  summary: a\n- key: Glioma\n  title: B\n  summary: b\n";
        assert!(matches!(
            TumorCatalog::from_yaml(yaml),
            Err(ReportError::Catalog(_))
        ));
    }

    #[test]
    fn test_override_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("info.yaml");
        std::fs::write(&path, "- key: glioma\n  title: Custom\n  summary: Custom text\n").unwrap();
        let catalog = TumorCatalog::from_path(&path).unwrap();
        let info = catalog.get("glioma").unwrap();
        assert_eq!(info.title, "Custom");
        assert!(info.symptoms.is_empty());
        assert!(info.prognosis.is_none());
    }
}
