use std::io::BufRead;

use crossbeam_channel::Sender;

use roiwatch_core::control::control_surface::ControlEvent;
use roiwatch_core::shared::region::Region;

pub const HELP: &str = "Commands: roi X1,Y1,X2,Y2 | press X Y | drag X Y | release X Y | \
r (reset ROI) | f (fullscreen) | c (reset count) | q (quit)";

/// Parses `x1,y1,x2,y2` (commas or spaces) into a normalised region.
pub fn parse_region(s: &str) -> Result<Region, String> {
    let values = parse_ints(s)?;
    match values.as_slice() {
        [x1, y1, x2, y2] => Ok(Region::new(*x1, *y1, *x2, *y2)),
        _ => Err(format!("expected four coordinates x1,y1,x2,y2, got '{s}'")),
    }
}

fn parse_point(s: &str) -> Result<(i32, i32), String> {
    let values = parse_ints(s)?;
    match values.as_slice() {
        [x, y] => Ok((*x, *y)),
        _ => Err(format!("expected a point X Y, got '{s}'")),
    }
}

fn parse_ints(s: &str) -> Result<Vec<i32>, String> {
    s.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i32>()
                .map_err(|_| format!("'{part}' is not an integer coordinate"))
        })
        .collect()
}

/// One line of operator input. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<ControlEvent>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));

    let event = match word.to_ascii_lowercase().as_str() {
        "r" | "reset" => ControlEvent::ResetRequested,
        "f" | "fullscreen" => ControlEvent::FullscreenToggleRequested,
        "c" | "reset-count" => ControlEvent::ResetCountRequested,
        "q" | "quit" | "exit" | "esc" => ControlEvent::QuitRequested,
        "roi" => ControlEvent::RegionSet(parse_region(rest)?),
        "press" => {
            let (x, y) = parse_point(rest)?;
            ControlEvent::RegionDragStart { x, y }
        }
        "drag" => {
            let (x, y) = parse_point(rest)?;
            ControlEvent::RegionDragUpdate { x, y }
        }
        "release" => {
            let (x, y) = parse_point(rest)?;
            ControlEvent::RegionDragEnd { x, y }
        }
        other => return Err(format!("unknown command '{other}'. {HELP}")),
    };
    Ok(Some(event))
}

/// Why a command stream stopped being read.
#[derive(Debug, PartialEq, Eq)]
pub enum ReaderEnd {
    /// The input reached EOF or could no longer be read.
    Closed,
    /// The monitor dropped its receiver.
    Disconnected,
}

/// Forwards every parsed command from `input` to `events`. Bad lines are
/// logged and skipped.
pub fn forward_commands<R: BufRead>(input: R, events: &Sender<ControlEvent>) -> ReaderEnd {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::warn!("Command input failed: {e}");
                return ReaderEnd::Closed;
            }
        };
        match parse_command(&line) {
            Ok(Some(event)) => {
                if events.send(event).is_err() {
                    return ReaderEnd::Disconnected;
                }
            }
            Ok(None) => {}
            Err(e) => log::warn!("{e}"),
        }
    }
    ReaderEnd::Closed
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Cursor;

    #[rstest]
    #[case("r", ControlEvent::ResetRequested)]
    #[case("  F  ", ControlEvent::FullscreenToggleRequested)]
    #[case("reset-count", ControlEvent::ResetCountRequested)]
    #[case("q", ControlEvent::QuitRequested)]
    #[case("esc", ControlEvent::QuitRequested)]
    #[case("roi 300,280,100,120", ControlEvent::RegionSet(Region::new(100, 120, 300, 280)))]
    #[case("roi 1 2 3 4", ControlEvent::RegionSet(Region::new(1, 2, 3, 4)))]
    #[case("press 10 20", ControlEvent::RegionDragStart { x: 10, y: 20 })]
    #[case("drag 15,25", ControlEvent::RegionDragUpdate { x: 15, y: 25 })]
    #[case("release 30 40", ControlEvent::RegionDragEnd { x: 30, y: 40 })]
    fn test_parses_command(#[case] line: &str, #[case] expected: ControlEvent) {
        assert_eq!(parse_command(line), Ok(Some(expected)));
    }

    #[test]
    fn test_blank_line_is_ignored() {
        assert_eq!(parse_command("   "), Ok(None));
    }

    #[rstest]
    #[case("dance")]
    #[case("roi 1,2,3")]
    #[case("roi a,b,c,d")]
    #[case("press 10")]
    fn test_rejects_bad_input(#[case] line: &str) {
        assert!(parse_command(line).is_err());
    }

    #[test]
    fn test_parse_region_normalises() {
        assert_eq!(parse_region("50,60,10,20"), Ok(Region::new(10, 20, 50, 60)));
        assert!(parse_region("").is_err());
    }

    #[test]
    fn test_forward_commands_until_eof() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let input = Cursor::new("roi 1,2,3,4\nbogus\n\nq\n");

        assert_eq!(forward_commands(input, &tx), ReaderEnd::Closed);
        let received: Vec<ControlEvent> = rx.try_iter().collect();
        assert_eq!(
            received,
            vec![
                ControlEvent::RegionSet(Region::new(1, 2, 3, 4)),
                ControlEvent::QuitRequested,
            ]
        );
    }

    #[test]
    fn test_forward_commands_on_empty_input() {
        let (tx, rx) = crossbeam_channel::unbounded();
        assert_eq!(forward_commands(Cursor::new(""), &tx), ReaderEnd::Closed);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_forward_commands_stops_when_monitor_is_gone() {
        let (tx, rx) = crossbeam_channel::unbounded();
        drop(rx);
        let input = Cursor::new("r\nf\n");
        assert_eq!(forward_commands(input, &tx), ReaderEnd::Disconnected);
    }
}
