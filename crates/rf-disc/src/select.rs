//! Deterministic main-title and track selection.
//!
//! The main feature is chosen by decoded size: the largest title wins, with
//! ties keeping the first title in catalog order. This is a heuristic proxy
//! for "the feature presentation is the largest stream" and is preserved
//! exactly rather than second-guessed.
//!
//! Audio tracks are scored against the user's ordered codec and track-name
//! preference lists; subtitle selection is a plain first-match per language.

use serde::Serialize;

use rf_core::config::Defaults;
use rf_core::Error;

use crate::catalog::{Title, TitleCatalog, Track};

/// Preference index for values absent from a preference list. Large enough
/// that any listed preference dominates.
const UNRANKED: u32 = 9999;

/// The outcome of selection: the main title plus chosen track numbers.
///
/// Derived, never persisted; recomputed per run.
#[derive(Debug, Clone, Serialize)]
pub struct Selection {
    pub title_id: u32,
    /// Output filename of the chosen title (catalog key).
    pub output_name: String,
    /// One entry per satisfied preferred language, in preference order.
    pub audio_tracks: Vec<u32>,
    pub subtitle_tracks: Vec<u32>,
}

/// Score a track against codec and name preference lists; lower is better.
///
/// `codec_index * 1000 + name_index`, each index being the position in the
/// user's ordered list or [`UNRANKED`] when absent. The multiplier
/// guarantees codec preference dominates name preference.
pub fn preference_score(
    codec: Option<&str>,
    name: Option<&str>,
    codec_prefs: &[String],
    name_prefs: &[String],
) -> u32 {
    let rank = |value: Option<&str>, prefs: &[String]| -> u32 {
        value
            .and_then(|v| prefs.iter().position(|p| p == v))
            .map(|i| i as u32)
            .unwrap_or(UNRANKED)
    };
    rank(codec, codec_prefs) * 1000 + rank(name, name_prefs)
}

fn best_audio_track<'a, I>(tracks: I, prefs: &Defaults) -> Option<&'a Track>
where
    I: IntoIterator<Item = &'a Track>,
{
    tracks.into_iter().min_by_key(|t| {
        preference_score(
            t.codec.as_deref(),
            t.name.as_deref(),
            &prefs.audio_codec,
            &prefs.audio_name,
        )
    })
}

fn language_matches(track: &Track, lang: &str) -> bool {
    track
        .language_id
        .as_deref()
        .is_some_and(|id| id.eq_ignore_ascii_case(lang))
}

/// Choose audio tracks for `title`: the best-scoring track per preferred
/// language, skipping languages with no match and never re-adding a
/// language already satisfied. When no preferred language matches any audio
/// track, fall back to the single best track of the whole list so at least
/// one audio track is always delivered.
fn select_audio(title: &Title, prefs: &Defaults) -> Vec<u32> {
    let mut chosen = Vec::new();
    let mut satisfied: Vec<String> = Vec::new();

    for lang in &prefs.audio_languages {
        if satisfied.iter().any(|s| s.eq_ignore_ascii_case(lang)) {
            continue;
        }
        let matching = title
            .audio_tracks
            .iter()
            .filter(|t| language_matches(t, lang));
        if let Some(best) = best_audio_track(matching, prefs) {
            chosen.push(best.number);
            satisfied.push(lang.clone());
        }
    }

    if chosen.is_empty() {
        if let Some(best) = best_audio_track(&title.audio_tracks, prefs) {
            tracing::debug!(
                "no audio track matches preferred languages; falling back to track {}",
                best.number
            );
            chosen.push(best.number);
        }
    }

    chosen
}

/// Choose subtitle tracks: the first track in catalog order per preferred
/// language. No scoring, no fallback; an unmatched language selects nothing.
fn select_subtitles(title: &Title, prefs: &Defaults) -> Vec<u32> {
    let mut chosen = Vec::new();
    for lang in &prefs.sub_languages {
        if let Some(track) = title
            .subtitle_tracks
            .iter()
            .find(|t| language_matches(t, lang))
        {
            if !chosen.contains(&track.number) {
                chosen.push(track.number);
            }
        }
    }
    chosen
}

/// Decode a size text (`"4.2 GB"`, `"800 MB"`) into megabytes.
///
/// Unrecognized units decode to 0 so the title never wins the size
/// comparison, mirroring the tolerance of the rest of the parser.
fn decode_size_mb(size_text: &str) -> f64 {
    let mut parts = size_text.split_whitespace();
    let number: f64 = match parts.next().and_then(|n| n.parse().ok()) {
        Some(n) => n,
        None => return 0.0,
    };
    match parts.next() {
        Some("GB") => number * 1000.0,
        Some("MB") => number,
        _ => 0.0,
    }
}

/// Pick the main title: largest decoded size, first-wins on ties.
fn main_title<'a>(catalog: &'a TitleCatalog) -> Option<&'a Title> {
    let mut best: Option<&Title> = None;
    let mut best_size = 0.0_f64;

    for title in catalog.iter() {
        let size = title.size_text.as_deref().map_or(0.0, decode_size_mb);
        if size > best_size {
            best = Some(title);
            best_size = size;
        }
    }

    best
}

/// Select the main feature and its audio/subtitle tracks.
///
/// Deterministic and side-effect-free.
///
/// # Errors
///
/// Returns [`rf_core::Error::Selection`] when the catalog is empty or no
/// title has a decodable size; a rip cannot proceed without a main title.
pub fn select(catalog: &TitleCatalog, prefs: &Defaults) -> rf_core::Result<Selection> {
    if catalog.is_empty() {
        return Err(Error::Selection("disc catalog contains no titles".into()));
    }

    let title = main_title(catalog).ok_or_else(|| {
        Error::Selection("no title reports a decodable size; cannot pick a main feature".into())
    })?;

    let subtitle_tracks = if prefs.include_subs {
        select_subtitles(title, prefs)
    } else {
        Vec::new()
    };

    Ok(Selection {
        title_id: title.id,
        output_name: title.output_name.clone(),
        audio_tracks: select_audio(title, prefs),
        subtitle_tracks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ScanResult;

    fn prefs() -> Defaults {
        Defaults::default()
    }

    fn catalog(text: &str) -> TitleCatalog {
        ScanResult::parse(text).catalog
    }

    const TWO_TITLES: &str = r#"
TINFO:0,10,0,"800 MB"
TINFO:0,27,0,"title_t00.mkv"
TINFO:1,10,0,"4.2 GB"
TINFO:1,27,0,"title_t01.mkv"
SINFO:1,1,1,0,"Audio"
SINFO:1,1,3,0,"eng"
SINFO:1,1,7,0,"DTS"
SINFO:1,2,1,0,"Audio"
SINFO:1,2,3,0,"eng"
SINFO:1,2,7,0,"DTS-HD MA"
SINFO:1,3,1,0,"Subtitles"
SINFO:1,3,3,0,"eng"
SINFO:1,4,1,0,"Subtitles"
SINFO:1,4,3,0,"eng"
"#;

    #[test]
    fn largest_size_wins() {
        let selection = select(&catalog(TWO_TITLES), &prefs()).unwrap();
        assert_eq!(selection.title_id, 1);
        assert_eq!(selection.output_name, "title_t01.mkv");
    }

    #[test]
    fn codec_preference_dominates() {
        // Both tracks are English; DTS-HD MA is ranked ahead of DTS.
        let selection = select(&catalog(TWO_TITLES), &prefs()).unwrap();
        assert_eq!(selection.audio_tracks, vec![2]);
    }

    #[test]
    fn first_subtitle_match_per_language() {
        let selection = select(&catalog(TWO_TITLES), &prefs()).unwrap();
        assert_eq!(selection.subtitle_tracks, vec![3]);
    }

    #[test]
    fn include_subs_false_selects_none() {
        let preferences = Defaults {
            include_subs: false,
            ..prefs()
        };
        let selection = select(&catalog(TWO_TITLES), &preferences).unwrap();
        assert!(selection.subtitle_tracks.is_empty());
    }

    #[test]
    fn language_match_is_case_insensitive() {
        let preferences = Defaults {
            audio_languages: vec!["ENG".to_string()],
            ..prefs()
        };
        let selection = select(&catalog(TWO_TITLES), &preferences).unwrap();
        assert_eq!(selection.audio_tracks, vec![2]);
    }

    #[test]
    fn unmatched_language_is_skipped_not_fatal() {
        let preferences = Defaults {
            audio_languages: vec!["jpn".to_string(), "eng".to_string()],
            ..prefs()
        };
        let selection = select(&catalog(TWO_TITLES), &preferences).unwrap();
        // jpn matched nothing; eng still satisfied.
        assert_eq!(selection.audio_tracks, vec![2]);
    }

    #[test]
    fn fallback_when_no_language_matches_at_all() {
        let text = r#"
TINFO:0,10,0,"4.0 GB"
TINFO:0,27,0,"t.mkv"
SINFO:0,1,1,0,"Audio"
SINFO:0,1,3,0,"fra"
SINFO:0,1,7,0,"DD"
SINFO:0,2,1,0,"Audio"
SINFO:0,2,3,0,"deu"
SINFO:0,2,7,0,"DTS-HD MA"
"#;
        let selection = select(&catalog(text), &prefs()).unwrap();
        // Neither track is English; the best-scoring track overall is taken.
        assert_eq!(selection.audio_tracks, vec![2]);
    }

    #[test]
    fn one_pick_per_language() {
        let preferences = Defaults {
            audio_languages: vec!["eng".to_string(), "eng".to_string()],
            ..prefs()
        };
        let selection = select(&catalog(TWO_TITLES), &preferences).unwrap();
        assert_eq!(selection.audio_tracks, vec![2]);
    }

    #[test]
    fn empty_catalog_is_selection_error() {
        let result = select(&TitleCatalog::default(), &prefs());
        assert!(matches!(result, Err(Error::Selection(_))));
    }

    #[test]
    fn unsized_titles_are_selection_error() {
        let text = "TINFO:0,27,0,\"t.mkv\"\n";
        let result = select(&catalog(text), &prefs());
        assert!(matches!(result, Err(Error::Selection(_))));
    }

    #[test]
    fn gb_normalizes_over_mb() {
        assert_eq!(decode_size_mb("4.2 GB"), 4200.0);
        assert_eq!(decode_size_mb("800 MB"), 800.0);
        assert_eq!(decode_size_mb("12 TB"), 0.0);
        assert_eq!(decode_size_mb("garbage"), 0.0);
    }

    #[test]
    fn score_ties_keep_first_track() {
        let score = preference_score(Some("FLAC"), None, &[], &[]);
        assert_eq!(score, UNRANKED * 1000 + UNRANKED);
    }
}
