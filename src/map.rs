//! Map file loading.
//!
//! Maps are whitespace-delimited directives, one per line:
//!
//! ```text
//! START x y              # race start position (px)
//! CAR w h scale dir      # car dimensions (px), sprite scale, heading (deg)
//! WP x y w h angle       # one checkpoint region (px, deg); order = route
//! ```
//!
//! Blank lines and `#` comments are skipped. A malformed line is an error
//! naming the offending line, never silently ignored.

use std::fmt;
use std::path::Path;
use std::str::SplitWhitespace;

#[derive(Debug)]
pub enum MapError {
    Io(std::io::Error),
    UnknownDirective {
        line: usize,
        directive: String,
    },
    Malformed {
        line: usize,
        directive: &'static str,
        reason: String,
    },
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapError::Io(err) => write!(f, "failed to read map file: {err}"),
            MapError::UnknownDirective { line, directive } => {
                write!(f, "line {line}: unknown directive `{directive}`")
            }
            MapError::Malformed {
                line,
                directive,
                reason,
            } => write!(f, "line {line}: malformed `{directive}` entry: {reason}"),
        }
    }
}

impl std::error::Error for MapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MapError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MapError {
    fn from(err: std::io::Error) -> Self {
        MapError::Io(err)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct StartPose {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Copy, Debug)]
pub struct CarDims {
    pub width: f32,
    pub height: f32,
    pub scale: f32,
    pub heading_deg: f32,
}

#[derive(Clone, Copy, Debug)]
pub struct WaypointSpec {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub angle_deg: f32,
}

#[derive(Clone, Debug, Default)]
pub struct MapData {
    pub start: StartPose,
    pub car: Option<CarDims>,
    pub waypoints: Vec<WaypointSpec>,
}

impl MapData {
    pub fn parse(text: &str) -> Result<MapData, MapError> {
        let mut map = MapData::default();

        for (idx, raw) in text.lines().enumerate() {
            let line = idx + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let mut tokens = trimmed.split_whitespace();
            let Some(directive) = tokens.next() else {
                continue;
            };

            match directive {
                "START" => {
                    let [x, y] = take_floats(&mut tokens, line, "START")?;
                    map.start = StartPose { x, y };
                }
                "CAR" => {
                    let [width, height, scale, heading_deg] =
                        take_floats(&mut tokens, line, "CAR")?;
                    map.car = Some(CarDims {
                        width,
                        height,
                        scale,
                        heading_deg,
                    });
                }
                "WP" => {
                    let [x, y, width, height, angle_deg] = take_floats(&mut tokens, line, "WP")?;
                    map.waypoints.push(WaypointSpec {
                        x,
                        y,
                        width,
                        height,
                        angle_deg,
                    });
                }
                other => {
                    return Err(MapError::UnknownDirective {
                        line,
                        directive: other.to_string(),
                    });
                }
            }
        }

        Ok(map)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<MapData, MapError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }
}

fn take_floats<const N: usize>(
    tokens: &mut SplitWhitespace<'_>,
    line: usize,
    directive: &'static str,
) -> Result<[f32; N], MapError> {
    let mut out = [0.0; N];
    for (i, slot) in out.iter_mut().enumerate() {
        let token = tokens.next().ok_or(MapError::Malformed {
            line,
            directive,
            reason: format!("expected {N} fields, got {i}"),
        })?;
        *slot = token.parse().map_err(|_| MapError::Malformed {
            line,
            directive,
            reason: format!("`{token}` is not a number"),
        })?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CIRCUIT: &str = "\
# three corners
START 90 100
CAR 50 100 1.0 -90

WP 100 100 40 40 0
WP 200 100 40 40 0
WP 200 200 40 40 90
";

    #[test]
    fn parses_start_car_and_waypoints() {
        let map = MapData::parse(CIRCUIT).unwrap();

        assert_eq!(map.start.x, 90.0);
        assert_eq!(map.start.y, 100.0);

        let car = map.car.unwrap();
        assert_eq!(car.width, 50.0);
        assert_eq!(car.heading_deg, -90.0);

        assert_eq!(map.waypoints.len(), 3);
        assert_eq!(map.waypoints[2].angle_deg, 90.0);
    }

    #[test]
    fn malformed_line_is_reported_with_its_number() {
        let err = MapData::parse("START 10 20\nWP 1 2 three 4 5\n").unwrap_err();
        match err {
            MapError::Malformed {
                line, directive, ..
            } => {
                assert_eq!(line, 2);
                assert_eq!(directive, "WP");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn short_line_is_malformed_not_ignored() {
        assert!(matches!(
            MapData::parse("WP 1 2\n"),
            Err(MapError::Malformed { line: 1, .. })
        ));
    }

    #[test]
    fn unknown_directive_is_an_error() {
        assert!(matches!(
            MapData::parse("WALL 0 0 10 10\n"),
            Err(MapError::UnknownDirective { line: 1, .. })
        ));
    }
}
