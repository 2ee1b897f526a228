//! Operator command parsing (spec §4.6).

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Report,
    Update,
    Start(usize),
    Stop(usize),
    Remove(usize),
    Exit,
    /// Carries the original input so the caller can echo it back.
    Unknown(String),
}

pub fn parse(line: &str) -> Command {
    let mut parts = line.split_whitespace();
    let verb = match parts.next() {
        Some(verb) => verb,
        None => return Command::Unknown(String::new()),
    };

    let key = |rest: &mut std::str::SplitWhitespace| rest.next().and_then(|k| k.parse::<usize>().ok());

    match verb {
        "report" => Command::Report,
        "update" => Command::Update,
        "start" => key(&mut parts).map_or_else(|| Command::Unknown(line.to_string()), Command::Start),
        "stop" => key(&mut parts).map_or_else(|| Command::Unknown(line.to_string()), Command::Stop),
        "remove" | "delete" => key(&mut parts).map_or_else(|| Command::Unknown(line.to_string()), Command::Remove),
        "exit" | "quit" => Command::Exit,
        _ => Command::Unknown(line.to_string()),
    }
}
