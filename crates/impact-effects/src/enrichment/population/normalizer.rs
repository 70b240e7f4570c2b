use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::enrichment::geo::Coordinate;

/// Identity of a settlement within one query result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct PlaceKey {
    name: String,
    latitude_millis: i64,
    longitude_millis: i64,
}

impl PlaceKey {
    pub(crate) fn new(name: &str, coordinate: Coordinate) -> Self {
        Self {
            name: normalize_name(name),
            latitude_millis: round_millis(coordinate.latitude),
            longitude_millis: round_millis(coordinate.longitude),
        }
    }
}

fn round_millis(degrees: f64) -> i64 {
    (degrees * 1000.0).round() as i64
}

/// Case- and diacritic-insensitive form of a settlement name.
///
/// Letters are lowercased, decomposed (NFD) and stripped of combining marks, so
/// precomposed and decomposed spellings collapse to the same key.
pub(crate) fn normalize_name(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    let lowered = collapsed.to_lowercase();

    let mut folded = String::with_capacity(lowered.len());
    for c in lowered.nfd().filter(|c| !is_combining_mark(*c)) {
        match expand_ligature(c) {
            Some(replacement) => folded.push_str(replacement),
            None => folded.push(c),
        }
    }
    folded
}

/// Letters that carry no canonical decomposition.
fn expand_ligature(c: char) -> Option<&'static str> {
    let expanded = match c {
        'ß' => "ss",
        'æ' => "ae",
        'œ' => "oe",
        'ø' => "o",
        'đ' => "d",
        'ł' => "l",
        'ħ' => "h",
        'ı' => "i",
        'ŧ' => "t",
        _ => return None,
    };
    Some(expanded)
}
