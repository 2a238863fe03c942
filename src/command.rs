//! Terminal input for the interactive panel.
//!
//! Each line maps to one or more [`UserEvent`]s, mirroring what a pointer and
//! keyboard would do on a graphical panel: `focus g`, `type g 30`, `blur g`,
//! or the shorthand `edit g 30` which does all three.

use crate::controller::UserEvent;
use crate::lock::Field;
use crate::status::{LampColor, OperatingMode};
use thiserror::Error;

pub const HELP: &str = "\
commands:
  focus|blur|press|key <g|y|r>   field interaction
  type <g|y|r> <text>            replace field text
  edit <g|y|r> <text>            focus, type, blur
  apply                          send green/yellow timing
  lamp <id>                      select a lamp
  color <R|Y|G|OFF>              set the selected lamp
  close                          close the lamp picker
  mode <auto|manual>             switch operating mode
  refresh | show | help | quit";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShellCommand {
    Events(Vec<UserEvent>),
    Show,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

fn field_arg(arg: Option<&str>, usage: &'static str) -> Result<Field, CommandError> {
    arg.and_then(Field::parse).ok_or(CommandError::Usage(usage))
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<ShellCommand>, CommandError> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let verb = verb.to_ascii_lowercase();
    let arg = words.next();
    let rest = words.collect::<Vec<_>>().join(" ");

    let events = match verb.as_str() {
        "focus" => vec![UserEvent::Focus(field_arg(arg, "focus <g|y|r>")?)],
        "blur" => vec![UserEvent::Blur(field_arg(arg, "blur <g|y|r>")?)],
        "press" => vec![UserEvent::PointerDown(field_arg(arg, "press <g|y|r>")?)],
        "key" => vec![UserEvent::KeyDown(field_arg(arg, "key <g|y|r>")?)],
        "type" => vec![UserEvent::Input(field_arg(arg, "type <g|y|r> <text>")?, rest)],
        "edit" => {
            let field = field_arg(arg, "edit <g|y|r> <text>")?;
            vec![
                UserEvent::Focus(field),
                UserEvent::Input(field, rest),
                UserEvent::Blur(field),
            ]
        }
        "apply" => vec![UserEvent::ApplyTiming],
        "lamp" => {
            let id = arg
                .and_then(|a| a.parse().ok())
                .ok_or(CommandError::Usage("lamp <id>"))?;
            vec![UserEvent::SelectLamp(id)]
        }
        "color" => {
            let color = match arg.map(|a| a.to_ascii_uppercase()).as_deref() {
                Some("R") | Some("RED") => LampColor::Red,
                Some("Y") | Some("YELLOW") => LampColor::Yellow,
                Some("G") | Some("GREEN") => LampColor::Green,
                Some("OFF") => LampColor::Off,
                _ => return Err(CommandError::Usage("color <R|Y|G|OFF>")),
            };
            vec![UserEvent::SetColor(color)]
        }
        "close" => vec![UserEvent::CloseOverlay],
        "mode" => {
            let mode = match arg.map(|a| a.to_ascii_lowercase()).as_deref() {
                Some("auto") => OperatingMode::Auto,
                Some("manual") => OperatingMode::Manual,
                _ => return Err(CommandError::Usage("mode <auto|manual>")),
            };
            vec![UserEvent::RequestMode(mode)]
        }
        "refresh" => vec![UserEvent::Refresh],
        "show" => return Ok(Some(ShellCommand::Show)),
        "help" | "?" => return Ok(Some(ShellCommand::Help)),
        "quit" | "exit" => return Ok(Some(ShellCommand::Quit)),
        _ => return Err(CommandError::Unknown(verb)),
    };
    Ok(Some(ShellCommand::Events(events)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(line: &str) -> Vec<UserEvent> {
        match parse_line(line) {
            Ok(Some(ShellCommand::Events(events))) => events,
            other => panic!("expected events for {:?}, got {:?}", line, other),
        }
    }

    #[test]
    fn test_blank_line() {
        assert_eq!(parse_line("   "), Ok(None));
    }

    #[test]
    fn test_field_interaction() {
        assert_eq!(events("focus g"), vec![UserEvent::Focus(Field::Green)]);
        assert_eq!(events("press red"), vec![UserEvent::PointerDown(Field::Red)]);
        assert_eq!(
            events("type y 4"),
            vec![UserEvent::Input(Field::Yellow, "4".into())]
        );
        assert_eq!(
            events("type y"),
            vec![UserEvent::Input(Field::Yellow, String::new())]
        );
    }

    #[test]
    fn test_edit_expands_to_focus_input_blur() {
        assert_eq!(
            events("edit r 45"),
            vec![
                UserEvent::Focus(Field::Red),
                UserEvent::Input(Field::Red, "45".into()),
                UserEvent::Blur(Field::Red),
            ]
        );
    }

    #[test]
    fn test_lamp_commands() {
        assert_eq!(events("lamp 3"), vec![UserEvent::SelectLamp(3)]);
        assert_eq!(events("COLOR g"), vec![UserEvent::SetColor(LampColor::Green)]);
        assert_eq!(events("color off"), vec![UserEvent::SetColor(LampColor::Off)]);
        assert_eq!(parse_line("color blue"), Err(CommandError::Usage("color <R|Y|G|OFF>")));
        assert_eq!(parse_line("lamp x"), Err(CommandError::Usage("lamp <id>")));
    }

    #[test]
    fn test_mode_and_misc() {
        assert_eq!(
            events("mode manual"),
            vec![UserEvent::RequestMode(OperatingMode::Manual)]
        );
        assert_eq!(parse_line("show"), Ok(Some(ShellCommand::Show)));
        assert_eq!(parse_line("exit"), Ok(Some(ShellCommand::Quit)));
        assert_eq!(
            parse_line("dance"),
            Err(CommandError::Unknown("dance".into()))
        );
        assert_eq!(parse_line("focus b"), Err(CommandError::Usage("focus <g|y|r>")));
    }
}
