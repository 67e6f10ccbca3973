//! Melody file model — JSON with comments, 1–4 hands of note events.

use serde::Deserialize;
use serde_json::Value as Json;

/// Default intensity for events that omit one.
pub const DEFAULT_INTENSITY: f64 = 0.8;

/// A single note event. Frequency 0 denotes a rest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteEvent {
    pub frequency: f64,
    /// Duration in beats, always > 0.
    pub duration: f64,
    /// Intensity in [0, 1].
    pub intensity: f64,
}

/// A parsed melody: typed tempo/meter plus all other metadata verbatim.
#[derive(Debug, Clone)]
pub struct Melody {
    pub name: String,
    pub title: Option<String>,
    pub tempo: Option<f64>,
    pub meter: Option<(u32, u32)>,
    pub hands: Vec<Vec<NoteEvent>>,
    /// Every top-level field except `hands`/`notes`, preserved as-is.
    pub metadata: serde_json::Map<String, Json>,
}

/// Melody parsing errors.
#[derive(Debug)]
pub enum MelodyError {
    Parse(String),
    /// The file parsed but contained no playable events.
    NoEvents,
}

impl std::fmt::Display for MelodyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MelodyError::Parse(e) => write!(f, "melody parse error: {e}"),
            MelodyError::NoEvents => write!(f, "melody contains no playable events"),
        }
    }
}

impl std::error::Error for MelodyError {}

/// Strip `//` line comments and `/* */` block comments, leaving string
/// literals untouched.
pub fn strip_comments(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    let mut chars = src.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' => match chars.peek() {
                Some('/') => {
                    for c in chars.by_ref() {
                        if c == '\n' {
                            out.push('\n');
                            break;
                        }
                    }
                }
                Some('*') => {
                    chars.next();
                    let mut prev = ' ';
                    for c in chars.by_ref() {
                        if prev == '*' && c == '/' {
                            break;
                        }
                        prev = c;
                    }
                }
                _ => out.push(c),
            },
            _ => out.push(c),
        }
    }
    out
}

/// The typed header fields; everything else stays in `metadata`.
#[derive(Debug, Default, Deserialize)]
struct Header {
    title: Option<String>,
    tempo: Option<f64>,
    time_signature: Option<String>,
}

fn as_f64(value: &Json) -> Option<f64> {
    match value {
        Json::Number(n) => n.as_f64(),
        Json::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_event(obj: &Json) -> Option<NoteEvent> {
    let frequency = as_f64(obj.get("frequency")?)?;
    let duration = obj
        .get("duration_beats")
        .or_else(|| obj.get("duration"))
        .and_then(as_f64)
        .unwrap_or(1.0);
    if duration <= 0.0 {
        return None;
    }
    let intensity = obj
        .get("intensity")
        .and_then(as_f64)
        .unwrap_or(DEFAULT_INTENSITY)
        .max(0.0);
    Some(NoteEvent {
        frequency,
        duration,
        intensity,
    })
}

impl Melody {
    /// Parse a melody from JSON-with-comments source. Events with a
    /// missing or unparseable frequency are skipped; hands that end up
    /// empty are dropped; a melody with no hands is an error.
    pub fn from_source(name: &str, src: &str) -> Result<Melody, MelodyError> {
        let stripped = strip_comments(src);
        let data: Json =
            serde_json::from_str(&stripped).map_err(|e| MelodyError::Parse(e.to_string()))?;
        let obj = data
            .as_object()
            .ok_or_else(|| MelodyError::Parse("top level must be an object".into()))?;

        let hands_raw: Vec<&Json> = match obj.get("hands") {
            Some(Json::Array(hands)) => hands.iter().collect(),
            // Legacy single-hand form.
            _ => match obj.get("notes") {
                Some(notes @ Json::Array(_)) => vec![notes],
                _ => Vec::new(),
            },
        };

        let mut hands = Vec::new();
        for hand in hands_raw {
            let Json::Array(events) = hand else { continue };
            let parsed: Vec<NoteEvent> = events.iter().filter_map(parse_event).collect();
            if !parsed.is_empty() {
                hands.push(parsed);
            }
        }
        if hands.is_empty() {
            return Err(MelodyError::NoEvents);
        }

        let header: Header = serde_json::from_value(data.clone()).unwrap_or_default();
        let meter = header.time_signature.as_deref().and_then(|s| {
            let (num, den) = s.split_once('/')?;
            Some((num.trim().parse().ok()?, den.trim().parse().ok()?))
        });

        let metadata = obj
            .iter()
            .filter(|(k, _)| k.as_str() != "hands" && k.as_str() != "notes")
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Ok(Melody {
            name: name.to_string(),
            title: header.title,
            tempo: header.tempo.filter(|t| *t > 0.0),
            meter,
            hands,
            metadata,
        })
    }
}
