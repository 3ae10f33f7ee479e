use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;

use getopts::{Matches, Options};

use prepa_calendar::{EventDraft, EventType, YearMonth};

pub enum Command {
    Show,
    Add(EventDraft),
    Export,
    Serve,
}

pub struct Args {
    pub command: Command,
    pub api_url: Option<String>,
    pub month: Option<YearMonth>,
    pub address: SocketAddr,
    pub output: Option<PathBuf>,
}

enum Parsed {
    Help,
    Args(Args),
}

fn opts() -> Options {
    let mut opts = Options::new();
    opts.optflag(
        "h",
        "help",
        concat!("Print the help output of ", env!("CARGO_PKG_NAME")),
    );
    opts.optopt(
        "u",
        "api-url",
        "Base URL of the events API [Default: $PREPA_API_URL or http://127.0.0.1:8080/api]",
        "URL",
    );
    opts.optopt(
        "m",
        "month",
        "Month to show or export [Default: current month]",
        "YYYY-MM",
    );
    opts.optopt(
        "d",
        "description",
        "Description of the event created by `add`",
        "TEXT",
    );
    opts.optopt(
        "a",
        "address",
        "Socket address `serve` listens on [Default: 127.0.0.1:8080]",
        "SOCKET_ADDRESS",
    );
    opts.optopt(
        "o",
        "output",
        "File `export` writes to [Default: stdout]",
        "PATH",
    );
    opts
}

fn usage(opts: &Options) -> String {
    let brief = format!(
        "Usage: {} [options] [show | add TITLE DATE TIME [DURATION] [TYPE] | export | serve]",
        env!("CARGO_PKG_NAME")
    );
    opts.usage(&brief)
}

/// Parses the command line, without the program name. Exits on `--help`
/// and on invalid input.
pub fn parse(args: Vec<String>) -> Args {
    let opts = opts();

    match try_parse(&opts, args) {
        Ok(Parsed::Args(args)) => args,
        Ok(Parsed::Help) => {
            println!("{}", usage(&opts));
            process::exit(0);
        }
        Err(err) => {
            eprintln!("{err}");
            eprintln!("{}", opts.short_usage(env!("CARGO_PKG_NAME")));
            process::exit(1);
        }
    }
}

fn try_parse(opts: &Options, args: Vec<String>) -> Result<Parsed, String> {
    let matches = opts.parse(args).map_err(|fail| fail.to_string())?;

    if matches.opt_present("help") {
        return Ok(Parsed::Help);
    }

    let month = matches
        .opt_str("month")
        .map(|raw| raw.parse::<YearMonth>())
        .transpose()?;

    let address = matches
        .opt_get_default("address", SocketAddr::from(([127, 0, 0, 1], 8080)))
        .map_err(|err| format!("Provided value for option 'address' is invalid: {err}"))?;

    let command = match matches.free.first().map(String::as_str) {
        None | Some("show") => Command::Show,
        Some("add") => Command::Add(parse_draft(&matches)?),
        Some("export") => Command::Export,
        Some("serve") => Command::Serve,
        Some(other) => return Err(format!("Unknown command `{other}`")),
    };

    Ok(Parsed::Args(Args {
        command,
        api_url: matches.opt_str("api-url"),
        month,
        address,
        output: matches.opt_str("output").map(PathBuf::from),
    }))
}

fn parse_draft(matches: &Matches) -> Result<EventDraft, String> {
    let [_, title, date, time, rest @ ..] = matches.free.as_slice() else {
        return Err("`add` expects TITLE DATE TIME [DURATION] [TYPE]".to_string());
    };

    let mut draft = EventDraft {
        title: title.clone(),
        description: matches.opt_str("description").unwrap_or_default(),
        date: date.clone(),
        time: time.clone(),
        ..EventDraft::default()
    };

    match rest {
        [] => {}
        [duration] => draft.duration_minutes = parse_duration(duration)?,
        [duration, kind] => {
            draft.duration_minutes = parse_duration(duration)?;
            draft.event_type = kind.parse::<EventType>()?;
        }
        _ => return Err("Too many arguments for `add`".to_string()),
    }

    Ok(draft)
}

fn parse_duration(raw: &str) -> Result<u32, String> {
    raw.parse::<u32>()
        .map_err(|err| format!("Provided duration `{raw}` is invalid: {err}"))
}
