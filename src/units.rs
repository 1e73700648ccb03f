//! Static unit catalogs: branches and regional councils.
//!
//! Units are read-only reference data. Branches are keyed by a short
//! numeric string and carry their prefecture; regional councils are keyed
//! by a mnemonic. Nothing in the write path ever mutates these.

use serde::{Deserialize, Serialize};

use crate::fields::TargetType;

/// A geographic branch (numeric id, e.g. `"11"`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Branch {
    pub id: String,
    pub name: String,
    pub prefecture: String,
}

/// A regional council grouping several branches (mnemonic id, e.g.
/// `"kanto"`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegionalCouncil {
    pub id: String,
    pub name: String,
}

// Ordered by id.
const BRANCHES: &[(&str, &str, &str)] = &[
    ("01", "北海道", "北海道"),
    ("02", "青森", "青森県"),
    ("03", "岩手", "岩手県"),
    ("04", "宮城", "宮城県"),
    ("05", "秋田", "秋田県"),
    ("06", "山形", "山形県"),
    ("07", "福島", "福島県"),
    ("08", "茨城", "茨城県"),
    ("09", "栃木", "栃木県"),
    ("10", "群馬", "群馬県"),
    ("11", "埼玉", "埼玉県"),
    ("12", "千葉", "千葉県"),
    ("13", "東京", "東京都"),
    ("14", "神奈川", "神奈川県"),
    ("15", "新潟", "新潟県"),
    ("16", "富山", "富山県"),
    ("17", "石川", "石川県"),
    ("18", "福井", "福井県"),
    ("19", "山梨", "山梨県"),
    ("20", "長野", "長野県"),
    ("21", "岐阜", "岐阜県"),
    ("22", "静岡", "静岡県"),
    ("23", "愛知", "愛知県"),
    ("24", "三重", "三重県"),
    ("25", "滋賀", "滋賀県"),
    ("26", "京都", "京都府"),
    ("27", "大阪", "大阪府"),
    ("28", "兵庫", "兵庫県"),
    ("29", "奈良", "奈良県"),
    ("30", "和歌山", "和歌山県"),
    ("31", "鳥取", "鳥取県"),
    ("32", "島根", "島根県"),
    ("33", "岡山", "岡山県"),
    ("34", "広島", "広島県"),
    ("35", "山口", "山口県"),
    ("36", "徳島", "徳島県"),
    ("37", "香川", "香川県"),
    ("38", "愛媛", "愛媛県"),
    ("39", "高知", "高知県"),
    ("40", "福岡", "福岡県"),
    ("41", "佐賀", "佐賀県"),
    ("42", "長崎", "長崎県"),
    ("43", "熊本", "熊本県"),
    ("44", "大分", "大分県"),
    ("45", "宮崎", "宮崎県"),
    ("46", "鹿児島", "鹿児島県"),
    ("47", "沖縄", "沖縄県"),
    ("48", "旭川", "北海道"),
    ("49", "多摩", "東京都"),
    ("50", "豊橋", "愛知県"),
    ("51", "南大阪", "大阪府"),
    ("52", "北九州", "福岡県"),
    ("53", "幕張", "千葉県"),
    ("54", "所沢", "埼玉県"),
    ("55", "吉備", "岡山県"),
];

const REGIONAL_COUNCILS: &[(&str, &str)] = &[
    ("hokkaido", "北海道地協"),
    ("tohoku", "東北地協"),
    ("kanto", "関東地協"),
    ("hokuriku", "北陸地協"),
    ("tokai", "東海地協"),
    ("kinki", "近畿地協"),
    ("chugoku", "中国地協"),
    ("shikoku", "四国地協"),
    ("kyushu", "九州地協"),
];

/// All branches, sorted by id.
pub fn branches() -> Vec<Branch> {
    BRANCHES
        .iter()
        .map(|&(id, name, prefecture)| Branch {
            id: id.to_string(),
            name: name.to_string(),
            prefecture: prefecture.to_string(),
        })
        .collect()
}

/// All regional councils.
pub fn regional_councils() -> Vec<RegionalCouncil> {
    REGIONAL_COUNCILS
        .iter()
        .map(|&(id, name)| RegionalCouncil {
            id: id.to_string(),
            name: name.to_string(),
        })
        .collect()
}

/// True when `unit_id` names a unit of the given class.
pub fn unit_exists(target_type: TargetType, unit_id: &str) -> bool {
    match target_type {
        TargetType::Branch => BRANCHES.iter().any(|&(id, _, _)| id == unit_id),
        TargetType::RegionalCouncil => REGIONAL_COUNCILS.iter().any(|&(id, _)| id == unit_id),
    }
}

/// Display name for a unit id, if it exists.
pub fn unit_name(target_type: TargetType, unit_id: &str) -> Option<&'static str> {
    match target_type {
        TargetType::Branch => BRANCHES
            .iter()
            .find(|&&(id, _, _)| id == unit_id)
            .map(|&(_, name, _)| name),
        TargetType::RegionalCouncil => REGIONAL_COUNCILS
            .iter()
            .find(|&&(id, _)| id == unit_id)
            .map(|&(_, name)| name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogs_are_well_formed() {
        let branches = branches();
        assert_eq!(branches.len(), 55);
        let mut ids: Vec<&str> = BRANCHES.iter().map(|&(id, _, _)| id).collect();
        ids.dedup();
        assert_eq!(ids.len(), 55);
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(regional_councils().len(), 9);
    }

    #[test]
    fn test_unit_lookup_is_class_scoped() {
        assert!(unit_exists(TargetType::Branch, "11"));
        assert!(!unit_exists(TargetType::RegionalCouncil, "11"));
        assert!(unit_exists(TargetType::RegionalCouncil, "kanto"));
        assert_eq!(unit_name(TargetType::Branch, "13"), Some("東京"));
        assert_eq!(unit_name(TargetType::Branch, "99"), None);
    }
}
