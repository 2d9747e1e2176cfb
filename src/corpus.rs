//! Reference corpus types and the built-in card texts.
//!
//! Defines [`Orientation`] (the two reading directions), [`ReferenceEntry`]
//! (one indexed text), [`Query`] (what a caller asks about) and [`Reading`]
//! (what the service answers with).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Reading direction of a drawn card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Upright,
    Reversed,
}

impl Orientation {
    /// Wire and SQL representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upright => "upright",
            Self::Reversed => "reversed",
        }
    }

    /// Label used inside corpus texts and composed queries.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Upright => "正位",
            Self::Reversed => "逆位",
        }
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upright" => Ok(Self::Upright),
            "reversed" => Ok(Self::Reversed),
            _ => Err(format!(
                "unknown orientation: {s} (expected 'upright' or 'reversed')"
            )),
        }
    }
}

/// One text in the similarity index, tagged with the card it describes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub text: String,
    pub card: String,
    pub orientation: Orientation,
}

impl ReferenceEntry {
    pub fn new(card: &str, orientation: Orientation, text: &str) -> Self {
        Self {
            text: text.to_string(),
            card: card.to_string(),
            orientation,
        }
    }
}

/// A caller's draw: card name plus orientation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub card: String,
    pub orientation: Orientation,
}

impl Query {
    pub fn new(card: impl Into<String>, orientation: Orientation) -> Self {
        Self {
            card: card.into(),
            orientation,
        }
    }

    /// `"<card> <label>"`, the text that is embedded and shown to the model.
    pub fn question(&self) -> String {
        format!("{} {}", self.card, self.orientation.label())
    }
}

/// A generated reading. `card` and `orientation` echo the query unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub analysis: String,
    pub card: String,
    pub orientation: Orientation,
}

/// The hand-written corpus shipped with the service.
pub fn builtin() -> Vec<ReferenceEntry> {
    vec![
        ReferenceEntry::new(
            "愚者",
            Orientation::Upright,
            "愚者牌 正位:象徵新的開始、冒險和可能性。今日適合嘗試新事物,保持開放心態。工作上適合開始新專案。感情上單純的心能帶來美好相遇。建議:相信直覺,勇敢踏出第一步!",
        ),
        ReferenceEntry::new(
            "愚者",
            Orientation::Reversed,
            "愚者牌 逆位:代表魯莽和缺乏計劃。今日需要更謹慎評估風險。工作上避免倉促決定。感情上不要被表面吸引。建議:三思而後行,先做好規劃。",
        ),
        ReferenceEntry::new(
            "魔術師",
            Orientation::Upright,
            "魔術師牌 正位:代表創造力和資源運用。今日你擁有實現目標的一切工具。工作上展現專業能力會得到認可。感情上主動表達用行動證明。建議:善用才能,化想法為現實!",
        ),
        ReferenceEntry::new(
            "魔術師",
            Orientation::Reversed,
            "魔術師牌 逆位:可能代表技能被誤用或缺乏自信。今日需要重新審視能力和目標。工作上避免過度承諾。感情上不要用花言巧語掩飾真心。建議:誠實面對優缺點。",
        ),
    ]
}

/// Load a corpus from a JSON array of `{text, card, orientation}` objects.
pub fn load_from_file(path: impl AsRef<Path>) -> Result<Vec<ReferenceEntry>> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read corpus file {}", path.display()))?;
    let entries: Vec<ReferenceEntry> = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse corpus file {}", path.display()))?;
    validate(&entries)?;
    Ok(entries)
}

/// Reject empty corpora, blank texts or card names, and repeated draws.
/// Each (card, orientation) pair appears at most once.
pub fn validate(entries: &[ReferenceEntry]) -> Result<()> {
    anyhow::ensure!(!entries.is_empty(), "corpus is empty");
    let mut seen: HashSet<(&str, Orientation)> = HashSet::new();
    for (i, entry) in entries.iter().enumerate() {
        anyhow::ensure!(
            !entry.text.trim().is_empty(),
            "corpus entry {i} ({} {}) has empty text",
            entry.card,
            entry.orientation
        );
        anyhow::ensure!(
            !entry.card.trim().is_empty(),
            "corpus entry {i} has an empty card name"
        );
        anyhow::ensure!(
            seen.insert((entry.card.as_str(), entry.orientation)),
            "corpus entry {i} duplicates {} {}",
            entry.card,
            entry.orientation.label()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orientation_has_exactly_two_values() {
        assert_eq!("upright".parse::<Orientation>(), Ok(Orientation::Upright));
        assert_eq!("reversed".parse::<Orientation>(), Ok(Orientation::Reversed));
        assert!("sideways".parse::<Orientation>().is_err());
        assert!("Upright".parse::<Orientation>().is_err());
        assert!("".parse::<Orientation>().is_err());
        assert!("正位".parse::<Orientation>().is_err());
    }

    #[test]
    fn orientation_labels() {
        assert_eq!(Orientation::Upright.label(), "正位");
        assert_eq!(Orientation::Reversed.label(), "逆位");
    }

    #[test]
    fn orientation_json_is_lowercase() {
        let json = serde_json::to_string(&Orientation::Reversed).unwrap();
        assert_eq!(json, "\"reversed\"");
        assert!(serde_json::from_str::<Orientation>("\"downward\"").is_err());
    }

    #[test]
    fn question_joins_card_and_label() {
        let query = Query::new("愚者", Orientation::Upright);
        assert_eq!(query.question(), "愚者 正位");
        let query = Query::new("月亮", Orientation::Reversed);
        assert_eq!(query.question(), "月亮 逆位");
    }

    #[test]
    fn builtin_corpus_covers_both_orientations() {
        let corpus = builtin();
        assert_eq!(corpus.len(), 4);
        validate(&corpus).unwrap();
        for entry in &corpus {
            assert!(entry.text.starts_with(&format!("{}牌 {}", entry.card, entry.orientation.label())));
        }
    }

    #[test]
    fn load_corpus_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.json");
        std::fs::write(
            &path,
            r#"[{"text": "太陽牌 正位:光明。", "card": "太陽", "orientation": "upright"}]"#,
        )
        .unwrap();

        let entries = load_from_file(&path).unwrap();
        assert_eq!(entries, vec![ReferenceEntry::new("太陽", Orientation::Upright, "太陽牌 正位:光明。")]);
    }

    #[test]
    fn empty_or_blank_corpus_is_rejected() {
        assert!(validate(&[]).is_err());
        assert!(validate(&[ReferenceEntry::new("太陽", Orientation::Upright, "  ")]).is_err());
        assert!(validate(&[ReferenceEntry::new("", Orientation::Upright, "text")]).is_err());
    }

    #[test]
    fn repeated_draw_is_rejected() {
        let entries = [
            ReferenceEntry::new("愚者", Orientation::Upright, "a"),
            ReferenceEntry::new("愚者", Orientation::Reversed, "b"),
            ReferenceEntry::new("愚者", Orientation::Upright, "c"),
        ];
        let err = validate(&entries).unwrap_err();
        assert_eq!(err.to_string(), "corpus entry 2 duplicates 愚者 正位");
        validate(&entries[..2]).unwrap();
    }
}
