//! Typed records for the MakeMKV automation ("robot") protocol.
//!
//! Each output line is `TAG:field1,field2,...` where fields are
//! comma-separated and may be double-quoted (`""` escapes a literal quote;
//! commas inside quotes do not split). The protocol is undocumented and
//! varies between tool versions, so parsing is permissive: unknown tags are
//! skipped, short records default their trailing fields, and only records
//! whose leading numeric identifiers fail to parse are dropped.

/// A message line (`MSG:code,flags,count,message,format,param0,...`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    pub code: u32,
    pub flags: u32,
    pub param_count: u32,
    /// Raw message string suitable for output.
    pub text: String,
    /// Localized format string; unlike `code`, subject to change.
    pub format: String,
    pub params: Vec<String>,
}

/// A drive-scan line (`DRV:index,type,bus,flags,name,discType,discPath`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveRecord {
    pub index: u32,
    pub drive_type: u32,
    pub bus: u32,
    pub flags: u32,
    pub name: String,
    pub disc_type: String,
    pub disc_path: String,
}

/// A disc-attribute line (`CINFO:code,flags,value`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscInfoRecord {
    pub code: u32,
    pub flags: u32,
    pub value: String,
}

/// A title-attribute line (`TINFO:title,attr,code,value`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleInfoRecord {
    pub title_id: u32,
    pub attr_id: u32,
    pub code: u32,
    pub value: String,
}

/// A stream-attribute line (`SINFO:title,track,attr,flags,value`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfoRecord {
    pub title_id: u32,
    pub track_id: u32,
    pub attr_id: u32,
    pub flags: u32,
    pub value: String,
}

/// One parsed protocol line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Message(MessageRecord),
    Drive(DriveRecord),
    DiscInfo(DiscInfoRecord),
    TitleCount(u32),
    TitleInfo(TitleInfoRecord),
    StreamInfo(StreamInfoRecord),
}

/// Split a record body into fields.
///
/// Fields are comma-separated; a double-quoted field may contain commas, and
/// `""` inside quotes is an escaped literal quote. A trailing empty field is
/// not emitted.
pub fn parse_fields(body: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(c);
            }
        } else {
            match c {
                '"' => in_quotes = true,
                ',' => fields.push(std::mem::take(&mut current)),
                _ => current.push(c),
            }
        }
    }

    if !current.is_empty() {
        fields.push(current);
    }

    fields
}

/// Field accessor: missing trailing fields default to the empty string.
fn field<'a>(fields: &'a [String], idx: usize) -> &'a str {
    fields.get(idx).map(String::as_str).unwrap_or("")
}

/// Required numeric field; `None` drops the whole record.
fn num(fields: &[String], idx: usize) -> Option<u32> {
    field(fields, idx).trim().parse().ok()
}

/// Optional numeric field, defaulting to 0 when absent or malformed.
fn num_or_zero(fields: &[String], idx: usize) -> u32 {
    num(fields, idx).unwrap_or(0)
}

/// Parse one protocol line into a typed record.
///
/// Returns `None` for blank lines, lines without a tag separator, unknown
/// tags, and records whose leading identifiers do not parse; none of these
/// are fatal.
pub fn parse_line(line: &str) -> Option<Record> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let (tag, body) = line.split_once(':')?;
    let fields = parse_fields(body);

    let record = match tag {
        "MSG" => Record::Message(MessageRecord {
            code: num(&fields, 0)?,
            flags: num_or_zero(&fields, 1),
            param_count: num_or_zero(&fields, 2),
            text: field(&fields, 3).to_string(),
            format: field(&fields, 4).to_string(),
            params: fields.iter().skip(5).cloned().collect(),
        }),
        "DRV" => Record::Drive(DriveRecord {
            index: num(&fields, 0)?,
            drive_type: num_or_zero(&fields, 1),
            bus: num_or_zero(&fields, 2),
            flags: num_or_zero(&fields, 3),
            name: field(&fields, 4).to_string(),
            disc_type: field(&fields, 5).to_string(),
            disc_path: field(&fields, 6).to_string(),
        }),
        "CINFO" => Record::DiscInfo(DiscInfoRecord {
            code: num(&fields, 0)?,
            flags: num_or_zero(&fields, 1),
            value: field(&fields, 2).to_string(),
        }),
        "TCOUNT" => Record::TitleCount(num(&fields, 0)?),
        "TINFO" => Record::TitleInfo(TitleInfoRecord {
            title_id: num(&fields, 0)?,
            attr_id: num(&fields, 1)?,
            code: num_or_zero(&fields, 2),
            value: field(&fields, 3).to_string(),
        }),
        "SINFO" => Record::StreamInfo(StreamInfoRecord {
            title_id: num(&fields, 0)?,
            track_id: num(&fields, 1)?,
            attr_id: num(&fields, 2)?,
            flags: num_or_zero(&fields, 3),
            value: field(&fields, 4).to_string(),
        }),
        _ => {
            tracing::trace!("ignoring unrecognized record tag {tag:?}");
            return None;
        }
    };

    Some(record)
}
