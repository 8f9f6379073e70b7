use std::str::SplitWhitespace;

use super::Command;

pub const USAGE: &str = "\
lr, routes [file]       print the routing table
li, interfaces [file]   print the interfaces
stats                   print send statistics
h, help                 print this help
q, quit                 exit";

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Unknown command {0:?}, try help")]
    Unknown(String),
    #[error("Too many arguments for {0}, try help")]
    TooManyArguments(String),
}

pub fn parse_command(line: String) -> Result<Command, ParseError> {
    let mut tokens = line.split_whitespace();
    match tokens.next() {
        Some(cmd) => cmd_arg_handler(cmd, tokens),
        None => Ok(Command::None),
    }
}

fn cmd_arg_handler(cmd: &str, mut tokens: SplitWhitespace) -> Result<Command, ParseError> {
    let command = match cmd {
        "lr" | "routes" => Command::ListRoutes(tokens.next().map(str::to_string)),
        "li" | "interfaces" => Command::ListInterfaces(tokens.next().map(str::to_string)),
        "stats" => Command::Stats,
        "h" | "help" => Command::Help,
        "q" | "quit" => Command::Quit,
        _ => return Err(ParseError::Unknown(cmd.to_string())),
    };

    if tokens.next().is_some() {
        return Err(ParseError::TooManyArguments(cmd.to_string()));
    }
    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_list_commands() {
        assert_eq!(
            parse_command("lr".into()),
            Ok(Command::ListRoutes(None))
        );
        assert_eq!(
            parse_command("routes out.txt".into()),
            Ok(Command::ListRoutes(Some("out.txt".into())))
        );
        assert_eq!(
            parse_command("  li ".into()),
            Ok(Command::ListInterfaces(None))
        );
        assert_eq!(
            parse_command("interfaces ifs.txt".into()),
            Ok(Command::ListInterfaces(Some("ifs.txt".into())))
        );
    }

    #[test]
    fn parse_simple_commands() {
        assert_eq!(parse_command("stats".into()), Ok(Command::Stats));
        assert_eq!(parse_command("help".into()), Ok(Command::Help));
        assert_eq!(parse_command("q".into()), Ok(Command::Quit));
        assert_eq!(parse_command("quit".into()), Ok(Command::Quit));
        assert_eq!(parse_command("".into()), Ok(Command::None));
        assert_eq!(parse_command("   \t".into()), Ok(Command::None));
    }

    #[test]
    fn parse_errors() {
        assert_eq!(
            parse_command("send 2001:db8::1".into()),
            Err(ParseError::Unknown("send".into()))
        );
        assert_eq!(
            parse_command("lr a b".into()),
            Err(ParseError::TooManyArguments("lr".into()))
        );
        assert_eq!(
            parse_command("stats now".into()),
            Err(ParseError::TooManyArguments("stats".into()))
        );
    }
}
