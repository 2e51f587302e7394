/// One line typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login(String),
    Logout,
    Upload(String),
    Open(usize),
    Close,
    Help,
    Quit,
    Send(String),
    Invalid(&'static str),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Self::Send(line.to_string());
        };
        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        match name {
            "login" if arg.is_empty() => Self::Invalid("usage: /login <name>"),
            "login" => Self::Login(arg.to_string()),
            "logout" => Self::Logout,
            "upload" if arg.is_empty() => Self::Invalid("usage: /upload <path>"),
            "upload" => Self::Upload(arg.to_string()),
            "open" => match arg.parse() {
                Ok(index) => Self::Open(index),
                Err(_) => Self::Invalid("usage: /open <number>"),
            },
            "close" => Self::Close,
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            _ => Self::Invalid("unknown command, try /help"),
        }
    }
}

pub const HELP: &str = "\
/login <name>    join the chat
/logout          leave the chat
/upload <path>   share a file
/open <number>   preview a linked image or video
/close           close the preview
/quit            exit
anything else is sent as a message";
