use std::path::PathBuf;
use std::str::FromStr;

use ferroftp::Mode;

pub enum Command {
    Abort,
    Auth,
    Ciphers,
    Connect(String, bool),
    Cwd(String),
    Get(String, PathBuf),
    Help,
    List(Option<String>),
    Mdtm(String),
    Mkdir(String),
    Mode(Mode),
    Noop,
    Put(PathBuf, String),
    Pwd,
    Quit,
    Rename(String, String),
    Rm(String),
    Rmdir(String),
    Size(String),
}

impl Command {
    /// Name used when reporting errors
    pub fn name(&self) -> &'static str {
        match self {
            Self::Abort => "ABORT",
            Self::Auth => "AUTH",
            Self::Ciphers => "CIPHERS",
            Self::Connect(..) => "CONNECT",
            Self::Cwd(_) => "CWD",
            Self::Get(..) => "GET",
            Self::Help => "HELP",
            Self::List(_) => "LIST",
            Self::Mdtm(_) => "MDTM",
            Self::Mkdir(_) => "MKDIR",
            Self::Mode(_) => "MODE",
            Self::Noop => "NOOP",
            Self::Put(..) => "PUT",
            Self::Pwd => "PWD",
            Self::Quit => "QUIT",
            Self::Rename(..) => "RENAME",
            Self::Rm(_) => "RM",
            Self::Rmdir(_) => "RMDIR",
            Self::Size(_) => "SIZE",
        }
    }
}

impl FromStr for Command {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Split string by space
        let mut args = s.split_ascii_whitespace();
        // Match args
        match args.next() {
            Some(cmd) => match cmd.to_ascii_uppercase().as_str() {
                "ABORT" => Ok(Self::Abort),
                "AUTH" => Ok(Self::Auth),
                "CIPHERS" => Ok(Self::Ciphers),
                "CONNECT" => match args.next() {
                    Some(addr) => Ok(Self::Connect(addr.to_string(), false)),
                    None => Err("Missing `addr` field"),
                },
                "CONNECT+S" => match args.next() {
                    Some(addr) => Ok(Self::Connect(addr.to_string(), true)),
                    None => Err("Missing `addr` field"),
                },
                "CWD" => match args.next() {
                    Some(p) => Ok(Self::Cwd(p.to_string())),
                    None => Err("Missing `dir` field"),
                },
                "GET" => {
                    let file: String = match args.next() {
                        Some(f) => f.to_string(),
                        None => return Err("Missing `file` field"),
                    };
                    match args.next() {
                        Some(d) => Ok(Self::Get(file, PathBuf::from(d))),
                        None => Err("Missing `dest` field"),
                    }
                }
                "HELP" => Ok(Self::Help),
                "LIST" => Ok(Self::List(args.next().map(String::from))),
                "MDTM" => match args.next() {
                    Some(file) => Ok(Self::Mdtm(file.to_string())),
                    None => Err("Missing `file` field"),
                },
                "MKDIR" => match args.next() {
                    Some(dir) => Ok(Self::Mkdir(dir.to_string())),
                    None => Err("Missing `dir` field"),
                },
                "MODE" => match args.next().map(|m| m.to_ascii_uppercase()).as_deref() {
                    Some("ACTIVE") => Ok(Self::Mode(Mode::Active)),
                    Some("PASSIVE") => Ok(Self::Mode(Mode::Passive)),
                    Some(_) => Err("Invalid mode"),
                    None => Err("Missing `mode` field"),
                },
                "NOOP" => Ok(Self::Noop),
                "PUT" => {
                    let local: PathBuf = match args.next() {
                        Some(l) => PathBuf::from(l),
                        None => return Err("Missing `source` field"),
                    };
                    match args.next() {
                        Some(d) => Ok(Self::Put(local, d.to_string())),
                        None => Err("Missing `dest` field"),
                    }
                }
                "PWD" => Ok(Self::Pwd),
                "QUIT" => Ok(Self::Quit),
                "RENAME" => {
                    let src: String = match args.next() {
                        Some(s) => s.to_string(),
                        None => return Err("Missing `src` field"),
                    };
                    match args.next() {
                        Some(d) => Ok(Self::Rename(src, d.to_string())),
                        None => Err("Missing `dest` field"),
                    }
                }
                "RM" => match args.next() {
                    Some(file) => Ok(Self::Rm(file.to_string())),
                    None => Err("Missing `file` field"),
                },
                "RMDIR" => match args.next() {
                    Some(dir) => Ok(Self::Rmdir(dir.to_string())),
                    None => Err("Missing `dir` field"),
                },
                "SIZE" => match args.next() {
                    Some(file) => Ok(Self::Size(file.to_string())),
                    None => Err("Missing `file` field"),
                },
                _ => Err("Unknown command"),
            },
            None => Err("Unknown command"),
        }
    }
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn should_parse_commands() {
        assert!(matches!(
            Command::from_str("connect+s ftp.example.com:21"),
            Ok(Command::Connect(addr, true)) if addr == "ftp.example.com:21"
        ));
        assert!(matches!(
            Command::from_str("GET remote.bin /tmp/local.bin"),
            Ok(Command::Get(remote, local)) if remote == "remote.bin" && local == PathBuf::from("/tmp/local.bin")
        ));
        assert!(matches!(
            Command::from_str("mode active"),
            Ok(Command::Mode(Mode::Active))
        ));
        assert!(matches!(Command::from_str("LIST"), Ok(Command::List(None))));
        assert!(matches!(Command::from_str("abort"), Ok(Command::Abort)));
    }

    #[test]
    fn should_reject_bad_commands() {
        assert!(Command::from_str("").is_err());
        assert!(Command::from_str("FEAT").is_err());
        assert!(Command::from_str("PUT local.bin").is_err());
        assert!(Command::from_str("MODE default").is_err());
        assert!(Command::from_str("RENAME a").is_err());
    }
}
