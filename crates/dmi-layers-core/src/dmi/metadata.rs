//! Parsing and writing of the DMI description text.
//!
//! The description is a small line-oriented format:
//!
//! ```text
//! # BEGIN DMI
//! version = 4.0
//! 	width = 32
//! 	height = 32
//! state = "walk"
//! 	dirs = 4
//! 	frames = 2
//! 	delay = 1,1
//! # END DMI
//! ```
//!
//! Keys before the first `state` line describe the whole file. Every
//! `state` line opens a new state and the keys that follow belong to it.
//! Leading whitespace is not significant.

use std::fmt::Write as _;

use super::types::{DirectionDepth, DmiError, DmiFile, Hotspot, DEFAULT_VERSION};

const BEGIN_MARKER: &str = "# BEGIN DMI";
const END_MARKER: &str = "# END DMI";

/// Frame size assumed when the header omits `width` or `height`.
pub const DEFAULT_FRAME_SIZE: u32 = 32;

/// Parsed description of a whole file.
#[derive(Debug, Clone, PartialEq)]
pub struct Description {
    pub version: String,
    pub frame_width: u32,
    pub frame_height: u32,
    pub states: Vec<StateHeader>,
}

/// Parsed description of one state, without pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct StateHeader {
    pub name: String,
    pub dirs: DirectionDepth,
    pub frames: u32,
    pub delays: Vec<f32>,
    pub loop_count: u32,
    pub rewind: bool,
    pub movement: bool,
    pub hotspots: Vec<Hotspot>,
    pub extra: Vec<(String, String)>,
}

impl StateHeader {
    fn named(name: String) -> Self {
        Self {
            name,
            dirs: DirectionDepth::One,
            frames: 1,
            delays: Vec::new(),
            loop_count: 0,
            rewind: false,
            movement: false,
            hotspots: Vec::new(),
            extra: Vec::new(),
        }
    }
}

fn invalid(line: usize, reason: impl Into<String>) -> DmiError {
    DmiError::InvalidDescription {
        line,
        reason: reason.into(),
    }
}

fn parse_u32(line: usize, key: &str, value: &str) -> Result<u32, DmiError> {
    value
        .parse::<u32>()
        .map_err(|_| invalid(line, format!("{key} must be a non-negative integer, got '{value}'")))
}

fn parse_flag(line: usize, key: &str, value: &str) -> Result<bool, DmiError> {
    Ok(parse_u32(line, key, value)? != 0)
}

fn parse_delays(line: usize, value: &str) -> Result<Vec<f32>, DmiError> {
    value
        .split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<f32>()
                .map_err(|_| invalid(line, format!("invalid delay '{part}'")))
        })
        .collect()
}

fn parse_hotspot(line: usize, value: &str) -> Result<Hotspot, DmiError> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(invalid(line, format!("hotspot needs x,y,frame, got '{value}'")));
    }
    Ok(Hotspot {
        x: parse_u32(line, "hotspot x", parts[0])?,
        y: parse_u32(line, "hotspot y", parts[1])?,
        frame: parse_u32(line, "hotspot frame", parts[2])?,
    })
}

/// Parse a quoted state name, resolving `\"` and `\\` escapes.
fn parse_name(line: usize, value: &str) -> Result<String, DmiError> {
    let inner = value
        .strip_prefix('"')
        .ok_or_else(|| invalid(line, "state name must be quoted"))?;

    let mut name = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped) => name.push(escaped),
                None => return Err(invalid(line, "dangling escape in state name")),
            },
            '"' => return Ok(name),
            other => name.push(other),
        }
    }
    Err(invalid(line, "unterminated state name"))
}

fn quote_name(name: &str) -> String {
    let mut quoted = String::with_capacity(name.len() + 2);
    quoted.push('"');
    for c in name.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Parse DMI description text.
///
/// # Errors
///
/// Returns `DmiError::MissingDescription` if the `# BEGIN DMI` marker is
/// absent, and `DmiError::InvalidDescription` for malformed lines. Line
/// numbers in errors are 1-based.
pub fn parse_description(text: &str) -> Result<Description, DmiError> {
    if !text.lines().any(|line| line.trim() == BEGIN_MARKER) {
        return Err(DmiError::MissingDescription);
    }

    let mut description = Description {
        version: DEFAULT_VERSION.to_string(),
        frame_width: DEFAULT_FRAME_SIZE,
        frame_height: DEFAULT_FRAME_SIZE,
        states: Vec::new(),
    };

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim();
        if line.is_empty() || line == BEGIN_MARKER {
            continue;
        }
        if line == END_MARKER {
            break;
        }
        if line.starts_with('#') {
            continue;
        }

        let (key, value) = line
            .split_once('=')
            .map(|(k, v)| (k.trim(), v.trim()))
            .ok_or_else(|| invalid(line_no, format!("expected 'key = value', got '{line}'")))?;

        if key == "state" {
            let name = parse_name(line_no, value)?;
            description.states.push(StateHeader::named(name));
            continue;
        }

        match description.states.last_mut() {
            None => match key {
                "version" => description.version = value.to_string(),
                "width" => description.frame_width = parse_u32(line_no, key, value)?,
                "height" => description.frame_height = parse_u32(line_no, key, value)?,
                _ => log::debug!("Ignoring unknown DMI header key '{key}' at line {line_no}"),
            },
            Some(state) => match key {
                "dirs" => {
                    state.dirs = DirectionDepth::try_from(parse_u32(line_no, key, value)?)?
                }
                "frames" => {
                    let frames = parse_u32(line_no, key, value)?;
                    if frames == 0 {
                        return Err(invalid(line_no, "frames must be at least 1"));
                    }
                    state.frames = frames;
                }
                "delay" => state.delays = parse_delays(line_no, value)?,
                "loop" => state.loop_count = parse_u32(line_no, key, value)?,
                "rewind" => state.rewind = parse_flag(line_no, key, value)?,
                "movement" => state.movement = parse_flag(line_no, key, value)?,
                "hotspot" => state.hotspots.push(parse_hotspot(line_no, value)?),
                _ => state.extra.push((key.to_string(), value.to_string())),
            },
        }
    }

    if description.frame_width == 0 || description.frame_height == 0 {
        return Err(invalid(0, "frame width and height must be non-zero"));
    }

    Ok(description)
}

/// Render the description text for a container.
///
/// Optional keys are only written when they differ from their defaults.
pub fn write_description(dmi: &DmiFile) -> String {
    let mut text = String::new();
    // fmt::Write into a String cannot fail
    let _ = writeln!(text, "{BEGIN_MARKER}");
    let _ = writeln!(text, "version = {}", dmi.version);
    let _ = writeln!(text, "\twidth = {}", dmi.frame_width());
    let _ = writeln!(text, "\theight = {}", dmi.frame_height());

    for state in dmi.states() {
        let _ = writeln!(text, "state = {}", quote_name(&state.name));
        let _ = writeln!(text, "\tdirs = {}", state.dir_count());
        let _ = writeln!(text, "\tframes = {}", state.frames());
        if !state.delays.is_empty() {
            let delays: Vec<String> = state.delays.iter().map(f32::to_string).collect();
            let _ = writeln!(text, "\tdelay = {}", delays.join(","));
        }
        if state.loop_count != 0 {
            let _ = writeln!(text, "\tloop = {}", state.loop_count);
        }
        if state.rewind {
            let _ = writeln!(text, "\trewind = 1");
        }
        if state.movement {
            let _ = writeln!(text, "\tmovement = 1");
        }
        for hotspot in &state.hotspots {
            let _ = writeln!(text, "\thotspot = {},{},{}", hotspot.x, hotspot.y, hotspot.frame);
        }
        for (key, value) in &state.extra {
            let _ = writeln!(text, "\t{key} = {value}");
        }
    }

    let _ = writeln!(text, "{END_MARKER}");
    text
}
