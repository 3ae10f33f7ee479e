mod cli;

use std::{env, fs, net::SocketAddr, process, sync::Arc};

use log::{debug, error, info};

use prepa_calendar::{
    server, CalendarController, Config, EventStore, FetchOutcome, HttpEventStore,
    MemoryEventStore, SubmitOutcome, YearMonth,
};

use cli::{Args, Command};

const LOG_VAR: &str = "PREPA_LOG";

fn setup_logging() {
    if env::var(LOG_VAR).is_err() {
        env::set_var(LOG_VAR, "prepa_calendar=info");
    }

    pretty_env_logger::init_custom_env(LOG_VAR);
}

fn fail(message: impl std::fmt::Display) -> ! {
    error!("{message}");
    eprintln!("{message}");
    process::exit(1);
}

#[tokio::main]
async fn main() {
    let args = cli::parse(env::args().skip(1).collect());
    setup_logging();

    if let Command::Serve = args.command {
        return serve_local(args.address).await;
    }

    let mut config = Config::from_env().unwrap_or_else(|err| fail(err));
    if let Some(api_url) = &args.api_url {
        config.api_url = api_url.clone();
    }
    debug!("Using events API at {}", config.api_url);

    let store = HttpEventStore::new(&config).unwrap_or_else(|err| fail(err));
    run(args, &store).await;
}

async fn run(args: Args, store: &impl EventStore) {
    let mut controller = match args.month {
        Some(month) => CalendarController::new(month),
        None => CalendarController::for_today(),
    };

    match args.command {
        Command::Show => {
            load_month(&mut controller, store).await;
            print!("{}", controller.month_view());
        }

        Command::Add(draft) => {
            if let Ok(date) = chrono::NaiveDate::parse_from_str(draft.date.trim(), "%Y-%m-%d") {
                controller = CalendarController::new(YearMonth::containing(date));
            }

            controller.open_dialog();
            *controller.draft_mut() = draft;

            match controller.submit(store).await {
                SubmitOutcome::Created { event, .. } => {
                    info!("Created event {}", event.id);
                    println!("Created `{}` at {}", event.title, event.scheduled_at);
                    if let Some(banner) = controller.banner() {
                        eprintln!("{banner}");
                    }
                    print!("{}", controller.month_view());
                }
                SubmitOutcome::Invalid | SubmitOutcome::Rejected | SubmitOutcome::AlreadyPending => {
                    for (field, message) in controller.field_errors().iter() {
                        eprintln!("{field}: {message}");
                    }
                    if let Some(message) = controller.submit_error() {
                        eprintln!("{message}");
                    }
                    process::exit(1);
                }
            }
        }

        Command::Export => {
            load_month(&mut controller, store).await;
            let ics = controller.month_view().to_ics().to_string();

            match &args.output {
                Some(path) => {
                    if let Err(err) = fs::write(path, ics) {
                        fail(format!("Failed to write {}: {err}", path.display()));
                    }
                    info!("Wrote {} events to {}", controller.events().len(), path.display());
                }
                None => print!("{ics}"),
            }
        }

        Command::Serve => serve_local(args.address).await,
    }
}

async fn serve_local(address: SocketAddr) {
    if let Err(err) = server::serve(address, Arc::new(MemoryEventStore::new())).await {
        fail(format!("Events server failed: {err}"));
    }
}

async fn load_month(controller: &mut CalendarController, store: &impl EventStore) {
    if let FetchOutcome::Failed = controller.refresh(store).await {
        fail(controller.banner().unwrap_or("Failed to load events"));
    }
}
