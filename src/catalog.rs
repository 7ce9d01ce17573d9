use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

// ── Data ───────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reciter {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub localized_name: Option<String>,
    #[serde(default)]
    pub image: String,
}

impl Reciter {
    /// Localized name when known, otherwise the display name.
    pub fn local_name(&self) -> &str {
        self.localized_name.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Surah {
    pub id: u32,
    pub name: String,
    pub localized_name: String,
    pub english_name: String,
    pub verse_count: u32,
}

/// One playable track: a reciter reading a surah.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recitation {
    pub id: String,
    pub reciter_id: String,
    pub surah_id: u32,
    pub audio_url: String,
    pub reciter: Reciter,
    pub surah: Surah,
}

impl Recitation {
    /// `"{reciter} - {surah}"`, used for share titles and download names.
    pub fn title(&self) -> String {
        format!("{} - {}", self.reciter.name, self.surah.name)
    }
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(rename = "recitation", default)]
    recitations: Vec<Recitation>,
}

/// Ordered, fixed list of recitations.
#[derive(Clone, Debug)]
pub struct Catalog {
    recitations: Vec<Recitation>,
}

impl Catalog {
    pub fn new(recitations: Vec<Recitation>) -> Result<Self, CatalogError> {
        if recitations.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut seen = HashSet::new();
        for r in &recitations {
            if !seen.insert(r.id.as_str()) {
                return Err(CatalogError::DuplicateId(r.id.clone()));
            }
            if r.reciter_id != r.reciter.id {
                return Err(CatalogError::Inconsistent {
                    id: r.id.clone(),
                    field: "reciter_id",
                });
            }
            if r.surah_id != r.surah.id {
                return Err(CatalogError::Inconsistent {
                    id: r.id.clone(),
                    field: "surah_id",
                });
            }
        }
        Ok(Self { recitations })
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: CatalogFile = toml::from_str(&content).map_err(|source| CatalogError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Self::new(file.recitations)
    }

    pub fn builtin() -> Self {
        let afasy = Reciter {
            id: "mishari-rashid".into(),
            name: "Mishari Rashid al-Afasy".into(),
            localized_name: Some("مشاري راشد العفاسي".into()),
            image: "https://i1.sndcdn.com/artworks-000133952182-92v3cl-t500x500.jpg".into(),
        };
        let basit = Reciter {
            id: "abdul-basit".into(),
            name: "Abdul Basit Abd us-Samad".into(),
            localized_name: Some("عبد الباسط عبد الصمد".into()),
            image: "https://i1.sndcdn.com/artworks-000078284092-02xnqp-t500x500.jpg".into(),
        };
        let fatiha = Surah {
            id: 1,
            name: "Al-Fatiha".into(),
            localized_name: "الفاتحة".into(),
            english_name: "The Opening".into(),
            verse_count: 7,
        };
        let baqarah = Surah {
            id: 2,
            name: "Al-Baqarah".into(),
            localized_name: "البقرة".into(),
            english_name: "The Cow".into(),
            verse_count: 286,
        };

        let entry = |id: &str, url: &str, reciter: &Reciter, surah: &Surah| Recitation {
            id: id.into(),
            reciter_id: reciter.id.clone(),
            surah_id: surah.id,
            audio_url: url.into(),
            reciter: reciter.clone(),
            surah: surah.clone(),
        };

        Self {
            recitations: vec![
                entry("1", "https://server8.mp3quran.net/afs/001.mp3", &afasy, &fatiha),
                entry("2", "https://server8.mp3quran.net/afs/002.mp3", &afasy, &baqarah),
                entry("3", "https://server7.mp3quran.net/basit/001.mp3", &basit, &fatiha),
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.recitations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recitations.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Recitation> {
        self.recitations.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Recitation> {
        self.recitations.iter()
    }

    /// Index of the recitation with `id` (linear scan).
    pub fn position(&self, id: &str) -> Option<usize> {
        self.recitations.iter().position(|r| r.id == id)
    }

    pub fn next_after(&self, index: usize) -> Option<usize> {
        let next = index + 1;
        (next < self.recitations.len()).then_some(next)
    }

    pub fn previous_before(&self, index: usize) -> Option<usize> {
        index.checked_sub(1)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    pub(crate) fn sample(n: usize) -> Catalog {
        let reciter = Reciter {
            id: "r".into(),
            name: "Reciter".into(),
            localized_name: None,
            image: String::new(),
        };
        let recitations = (0..n)
            .map(|i| Recitation {
                id: format!("t{}", i),
                reciter_id: "r".into(),
                surah_id: i as u32 + 1,
                audio_url: format!("https://example.org/{:03}.mp3", i + 1),
                reciter: reciter.clone(),
                surah: Surah {
                    id: i as u32 + 1,
                    name: format!("Surah {}", i + 1),
                    localized_name: String::new(),
                    english_name: String::new(),
                    verse_count: 7,
                },
            })
            .collect();
        Catalog::new(recitations).unwrap()
    }

    #[test]
    fn builtin_catalog_is_valid() {
        let c = Catalog::builtin();
        assert_eq!(c.len(), 3);
        assert!(Catalog::new(c.iter().cloned().collect()).is_ok());
        assert_eq!(c.get(2).unwrap().reciter.local_name(), "عبد الباسط عبد الصمد");
        assert_eq!(c.get(0).unwrap().title(), "Mishari Rashid al-Afasy - Al-Fatiha");
    }

    #[test]
    fn neighbours() {
        let c = sample(3);
        assert_eq!(c.position("t1"), Some(1));
        assert_eq!(c.position("nope"), None);
        assert_eq!(c.next_after(1), Some(2));
        assert_eq!(c.next_after(2), None);
        assert_eq!(c.previous_before(1), Some(0));
        assert_eq!(c.previous_before(0), None);
    }

    #[test]
    fn rejects_duplicates_and_mismatches() {
        let mut items: Vec<Recitation> = sample(2).iter().cloned().collect();
        items[1].id = "t0".into();
        assert!(matches!(Catalog::new(items), Err(CatalogError::DuplicateId(id)) if id == "t0"));

        let mut items: Vec<Recitation> = sample(2).iter().cloned().collect();
        items[0].surah_id = 99;
        assert!(matches!(
            Catalog::new(items),
            Err(CatalogError::Inconsistent { field: "surah_id", .. })
        ));

        assert!(matches!(Catalog::new(Vec::new()), Err(CatalogError::Empty)));
    }

    #[test]
    fn loads_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[[recitation]]
id = "husary-1"
reciter_id = "husary"
surah_id = 1
audio_url = "https://server13.mp3quran.net/husr/001.mp3"

[recitation.reciter]
id = "husary"
name = "Mahmoud Khalil Al-Husary"

[recitation.surah]
id = 1
name = "Al-Fatiha"
localized_name = "الفاتحة"
english_name = "The Opening"
verse_count = 7
"#
        )
        .unwrap();

        let c = Catalog::load(file.path()).unwrap();
        assert_eq!(c.len(), 1);
        let r = c.get(c.position("husary-1").unwrap()).unwrap();
        assert_eq!(r.reciter.local_name(), "Mahmoud Khalil Al-Husary");
        assert_eq!(r.surah.verse_count, 7);
    }

    #[test]
    fn empty_catalog_file_is_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(Catalog::load(file.path()), Err(CatalogError::Empty)));
    }
}
