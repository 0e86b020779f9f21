//! Title catalog folded from scan output.
//!
//! A scan (`makemkvcon -r info disc:N`) yields `TINFO` records describing
//! titles and `SINFO` records describing the elementary streams within them.
//! [`ScanResult::parse`] folds those into [`Title`] and [`Track`] values.
//! A title is only materialized if it carries an output-filename attribute
//! ending in `.mkv` -- that filename is the catalog key used to find the
//! produced file after a rip.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::protocol::{
    self, DiscInfoRecord, DriveRecord, MessageRecord, Record, StreamInfoRecord, TitleInfoRecord,
};

// TINFO attribute ids.
const TINFO_CHAPTER_COUNT: u32 = 8;
const TINFO_DURATION: u32 = 9;
const TINFO_SIZE: u32 = 10;
const TINFO_SOURCE_FILE_NAME: u32 = 16;
const TINFO_SEGMENT_COUNT: u32 = 25;
const TINFO_SEGMENT_MAP: u32 = 26;
const TINFO_OUTPUT_FILE_NAME: u32 = 27;

// SINFO attribute ids.
const SINFO_KIND: u32 = 1;
const SINFO_NAME: u32 = 2;
const SINFO_LANGUAGE_ID: u32 = 3;
const SINFO_LANGUAGE: u32 = 4;
const SINFO_CODEC_SHORT: u32 = 6;
const SINFO_CODEC: u32 = 7;
const SINFO_CHANNELS: u32 = 14;
const SINFO_SAMPLE_RATE: u32 = 17;
const SINFO_BITS_PER_SAMPLE: u32 = 18;

/// Kind of an elementary stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
    Subtitle,
}

impl TrackKind {
    /// Map the SINFO attribute-1 value; MakeMKV spells subtitles plural.
    fn from_protocol(value: &str) -> Option<Self> {
        match value {
            "Video" => Some(Self::Video),
            "Audio" => Some(Self::Audio),
            "Subtitles" => Some(Self::Subtitle),
            _ => None,
        }
    }
}

/// One elementary stream within a title, folded from `SINFO` records.
///
/// Attribute codes the scan never emitted leave the corresponding field
/// unset; that is expected, not an error.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Track {
    pub number: u32,
    pub kind: Option<TrackKind>,
    pub name: Option<String>,
    pub language_id: Option<String>,
    pub language: Option<String>,
    pub codec_short: Option<String>,
    pub codec: Option<String>,
    pub channels: Option<u32>,
    pub sample_rate: Option<u32>,
    pub bits_per_sample: Option<u32>,
}

impl Track {
    fn apply(&mut self, record: &StreamInfoRecord) {
        let value = record.value.as_str();
        match record.attr_id {
            SINFO_KIND => self.kind = TrackKind::from_protocol(value),
            SINFO_NAME => self.name = Some(value.to_string()),
            SINFO_LANGUAGE_ID => self.language_id = Some(value.to_string()),
            SINFO_LANGUAGE => self.language = Some(value.to_string()),
            SINFO_CODEC_SHORT => self.codec_short = Some(value.to_string()),
            SINFO_CODEC => self.codec = Some(value.to_string()),
            SINFO_CHANNELS => self.channels = value.parse().ok(),
            SINFO_SAMPLE_RATE => self.sample_rate = value.parse().ok(),
            SINFO_BITS_PER_SAMPLE => self.bits_per_sample = value.parse().ok(),
            _ => {}
        }
    }
}

/// One rippable title on the disc.
#[derive(Debug, Clone, Serialize)]
pub struct Title {
    pub id: u32,
    /// The file makemkvcon will produce for this title; also the catalog key.
    pub output_name: String,
    pub chapter_count: Option<u32>,
    pub duration: Option<String>,
    /// Size as reported by the tool, a number plus unit (e.g. `"24.1 GB"`).
    pub size_text: Option<String>,
    pub source_file_name: Option<String>,
    pub segment_count: Option<u32>,
    pub segment_map: Option<String>,
    pub video_tracks: Vec<Track>,
    pub audio_tracks: Vec<Track>,
    pub subtitle_tracks: Vec<Track>,
}

/// Mapping from output filename to [`Title`], in ascending title-id order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TitleCatalog {
    titles: Vec<Title>,
}

impl TitleCatalog {
    /// Insert a title under its output filename.
    ///
    /// The ripping tool assigns one output name per title; should two titles
    /// collide, the later one replaces the earlier in place (intentional
    /// last-write-wins, iteration order unaffected).
    fn insert(&mut self, title: Title) {
        match self
            .titles
            .iter_mut()
            .find(|t| t.output_name == title.output_name)
        {
            Some(existing) => *existing = title,
            None => self.titles.push(title),
        }
    }

    /// Look up a title by output filename.
    pub fn get(&self, output_name: &str) -> Option<&Title> {
        self.titles.iter().find(|t| t.output_name == output_name)
    }

    /// Titles in catalog order (ascending title id).
    pub fn iter(&self) -> impl Iterator<Item = &Title> {
        self.titles.iter()
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }
}

/// Everything extracted from one scan/info invocation.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub messages: Vec<MessageRecord>,
    pub drives: Vec<DriveRecord>,
    pub disc_info: Vec<DiscInfoRecord>,
    pub title_count: Option<u32>,
    pub catalog: TitleCatalog,
}

impl ScanResult {
    /// Parse the full captured text of one makemkvcon invocation.
    ///
    /// Deterministic and infallible: malformed lines are dropped, and the
    /// folding of stream attributes does not depend on the order in which
    /// attribute codes arrive within a title/track.
    pub fn parse(output: &str) -> Self {
        let mut result = ScanResult::default();
        let mut tinfo: BTreeMap<u32, Vec<TitleInfoRecord>> = BTreeMap::new();
        let mut tracks: BTreeMap<u32, BTreeMap<u32, Track>> = BTreeMap::new();
        let mut dropped = 0usize;

        for line in output.lines() {
            let Some(record) = protocol::parse_line(line) else {
                if !line.trim().is_empty() {
                    dropped += 1;
                }
                continue;
            };
            match record {
                Record::Message(msg) => result.messages.push(msg),
                Record::Drive(drv) => result.drives.push(drv),
                Record::DiscInfo(cinfo) => result.disc_info.push(cinfo),
                Record::TitleCount(count) => result.title_count = Some(count),
                Record::TitleInfo(rec) => tinfo.entry(rec.title_id).or_default().push(rec),
                Record::StreamInfo(rec) => {
                    tracks
                        .entry(rec.title_id)
                        .or_default()
                        .entry(rec.track_id)
                        .or_insert_with(|| Track {
                            number: rec.track_id,
                            ..Track::default()
                        })
                        .apply(&rec);
                }
            }
        }

        if dropped > 0 {
            tracing::debug!("dropped {dropped} unrecognized or malformed scan lines");
        }

        for (title_id, records) in tinfo {
            let Some(title) = build_title(title_id, &records, tracks.remove(&title_id)) else {
                tracing::debug!("title {title_id} has no output filename; excluded from catalog");
                continue;
            };
            result.catalog.insert(title);
        }

        result
    }
}

fn attr<'a>(records: &'a [TitleInfoRecord], attr_id: u32) -> Option<&'a str> {
    records
        .iter()
        .find(|r| r.attr_id == attr_id)
        .map(|r| r.value.as_str())
}

/// Materialize a title, or `None` when the `.mkv` output-name anchor is
/// missing (such a title cannot be addressed after the rip).
fn build_title(
    title_id: u32,
    records: &[TitleInfoRecord],
    tracks: Option<BTreeMap<u32, Track>>,
) -> Option<Title> {
    let output_name = records
        .iter()
        .find(|r| r.attr_id == TINFO_OUTPUT_FILE_NAME && r.value.ends_with(".mkv"))?
        .value
        .clone();

    let mut title = Title {
        id: title_id,
        output_name,
        chapter_count: attr(records, TINFO_CHAPTER_COUNT).and_then(|v| v.parse().ok()),
        duration: attr(records, TINFO_DURATION).map(str::to_string),
        size_text: attr(records, TINFO_SIZE).map(str::to_string),
        source_file_name: attr(records, TINFO_SOURCE_FILE_NAME).map(str::to_string),
        segment_count: attr(records, TINFO_SEGMENT_COUNT).and_then(|v| v.parse().ok()),
        segment_map: attr(records, TINFO_SEGMENT_MAP).map(str::to_string),
        video_tracks: Vec::new(),
        audio_tracks: Vec::new(),
        subtitle_tracks: Vec::new(),
    };

    for track in tracks.unwrap_or_default().into_values() {
        match track.kind {
            Some(TrackKind::Video) => title.video_tracks.push(track),
            Some(TrackKind::Audio) => title.audio_tracks.push(track),
            Some(TrackKind::Subtitle) => title.subtitle_tracks.push(track),
            // Tracks whose kind never arrived cannot be classified.
            None => {}
        }
    }

    Some(title)
}
