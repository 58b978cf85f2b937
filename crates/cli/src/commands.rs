use std::path::PathBuf;

/// One line typed at the interactive prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `None` asks for the key with hidden input.
    Key(Option<String>),
    Width(u32),
    Stroke(Vec<(f32, f32)>),
    Load(PathBuf),
    Show,
    Clear,
    Analyze(Option<PathBuf>),
    Story,
    Status,
    Help,
    Quit,
}

pub const HELP: &str = "\
Commands:
  key                   enter your API key (typing is hidden)
  key <api-key>         set the key inline (visible, for scripted input)
  width <1-30>          set the line width
  stroke x,y x,y ...    draw a free-hand line through the given points
  load <image>          paste an image file onto the canvas
  show                  preview the canvas
  clear                 wipe the canvas
  analyze [file.png]    analyze the canvas (or a PNG file) as the next drawing
  story                 generate the story once three drawings are analyzed
  status                show progress so far
  help                  show this list
  quit                  leave";

fn parse_point(token: &str) -> Result<(f32, f32), String> {
    let (x, y) = token
        .split_once(',')
        .ok_or_else(|| format!("expected x,y but got {token:?}"))?;
    let coord = |s: &str| {
        s.trim()
            .parse::<f32>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("bad coordinate {s:?} in {token:?}"))
    };
    Ok((coord(x)?, coord(y)?))
}

/// Parse one input line. Blank lines give `Ok(None)`.
pub fn parse(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    let Some((word, rest)) = line
        .split_once(char::is_whitespace)
        .map(|(w, r)| (w, r.trim()))
        .or((!line.is_empty()).then_some((line, "")))
    else {
        return Ok(None);
    };

    let command = match word.to_lowercase().as_str() {
        "key" => Command::Key((!rest.is_empty()).then(|| rest.to_string())),
        "width" => {
            let width = rest
                .parse()
                .map_err(|_| format!("usage: width <1-30>, got {rest:?}"))?;
            Command::Width(width)
        }
        "stroke" => {
            let points = rest
                .split_whitespace()
                .map(parse_point)
                .collect::<Result<Vec<_>, _>>()?;
            if points.is_empty() {
                return Err("usage: stroke x,y x,y ...".into());
            }
            Command::Stroke(points)
        }
        "load" if !rest.is_empty() => Command::Load(PathBuf::from(rest)),
        "load" => return Err("usage: load <image>".into()),
        "show" => Command::Show,
        "clear" => Command::Clear,
        "analyze" => Command::Analyze((!rest.is_empty()).then(|| PathBuf::from(rest))),
        "story" => Command::Story,
        "status" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("unknown command {other:?}, type help for a list")),
    };
    Ok(Some(command))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_are_ignored() {
        assert_eq!(parse(""), Ok(None));
        assert_eq!(parse("   \t"), Ok(None));
    }

    #[test]
    fn parses_simple_commands() {
        assert_eq!(parse("show"), Ok(Some(Command::Show)));
        assert_eq!(parse(" STORY "), Ok(Some(Command::Story)));
        assert_eq!(parse("exit"), Ok(Some(Command::Quit)));
        assert_eq!(parse("analyze"), Ok(Some(Command::Analyze(None))));
        assert_eq!(
            parse("analyze drawings/ball.png"),
            Ok(Some(Command::Analyze(Some(PathBuf::from("drawings/ball.png")))))
        );
    }

    #[test]
    fn key_keeps_whole_secret() {
        assert_eq!(parse("key  sk-abc123 "), Ok(Some(Command::Key(Some("sk-abc123".into())))));
    }

    #[test]
    fn bare_key_asks_for_hidden_entry() {
        assert_eq!(parse("key"), Ok(Some(Command::Key(None))));
        assert_eq!(parse("  KEY  "), Ok(Some(Command::Key(None))));
    }

    #[test]
    fn parses_width() {
        assert_eq!(parse("width 12"), Ok(Some(Command::Width(12))));
        assert!(parse("width thick").is_err());
        assert!(parse("width").is_err());
    }

    #[test]
    fn parses_stroke_points() {
        assert_eq!(
            parse("stroke 10,20 30.5,40 50, 60"),
            Err("bad coordinate \"\" in \"50,\"".into())
        );
        assert_eq!(
            parse("stroke 10,20 30.5,40"),
            Ok(Some(Command::Stroke(vec![(10.0, 20.0), (30.5, 40.0)])))
        );
        assert_eq!(parse("stroke 10"), Err("expected x,y but got \"10\"".into()));
        assert!(parse("stroke").is_err());
        assert!(parse("stroke 1,x").is_err());
        assert!(parse("stroke 1,NaN").is_err());
    }

    #[test]
    fn unknown_command_is_reported() {
        let err = parse("dance").unwrap_err();
        assert!(err.contains("dance"));
    }
}
