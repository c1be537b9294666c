use crate::backend;
use crate::cli::WatchArgs;
use crate::exit_codes;
use crate::output;
use marker_stream::{LogEntry, MarkerConsole, StreamDescriptor};
use tokio::time::{interval, MissedTickBehavior};

pub async fn execute(args: WatchArgs) -> i32 {
    let config = match backend::resolve_config(&args.config) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    let setup = match backend::create_client(&args.config) {
        Ok(s) => s,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };
    let mut generator = setup.generator;

    let mut console = match MarkerConsole::new(setup.client, config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::INPUT_ERROR;
        }
    };
    console.set_event_callback(|event| {
        if let Ok(json) = serde_json::to_string(&event) {
            log::debug!("Console event: {}", json);
        }
    });

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    // Discovery blocks for up to the configured timeout
    let discovery = run_blocking(console, |c| c.refresh_streams().map(<[_]>::to_vec));
    let (returned, discovered) = tokio::select! {
        result = discovery => match result {
            Ok(pair) => pair,
            Err(msg) => {
                eprintln!("Error: {}", msg);
                return exit_codes::EXECUTION_ERROR;
            }
        },
        _ = &mut ctrl_c => {
            log::info!("Interrupted during discovery");
            return exit_codes::SUCCESS;
        }
    };
    console = returned;

    let streams = match discovered {
        Ok(streams) => streams,
        Err(e) => {
            eprintln!("Error: Discovery failed: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    };
    if streams.is_empty() {
        eprintln!("No streams found.");
        return exit_codes::NO_STREAMS;
    }

    let selected = match select_streams(&streams, &args.streams, args.all) {
        Ok(s) => s,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };
    for stream in &selected {
        console.connect(stream);
    }

    console.set_filter(args.content_filter.as_str(), args.stream_filter.as_str());
    console.set_auto_scroll(true);

    if !args.quiet {
        let names: Vec<&str> = selected.iter().map(|s| s.name.as_str()).collect();
        eprintln!("Watching {}...", names.join(", "));
    }

    let mut ticker = interval(console.config().tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_seq = 0u64;
    let mut ticks = 0u64;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Some(g) = generator.as_mut() {
                    g.emit();
                }

                // Metadata refreshes block for up to the liveness timeout
                let (returned, refresh) = match run_blocking(console, |c| {
                    c.tick();
                    c.take_refresh()
                })
                .await
                {
                    Ok(pair) => pair,
                    Err(msg) => {
                        eprintln!("Error: {}", msg);
                        return exit_codes::EXECUTION_ERROR;
                    }
                };
                console = returned;
                ticks += 1;

                if refresh.is_some() {
                    let fresh: Vec<&LogEntry> = console.filtered_since(last_seq).collect();
                    if let Some(last) = fresh.last() {
                        last_seq = last.seq;
                    }
                    if let Err(e) = print_entries(&fresh, args.json) {
                        eprintln!("Error: {}", e);
                        return exit_codes::EXECUTION_ERROR;
                    }
                }

                if args.ticks.is_some_and(|limit| ticks >= limit) {
                    break;
                }
            }
            _ = &mut ctrl_c => {
                log::info!("Interrupted, stopping");
                break;
            }
        }
    }

    if !args.quiet {
        let stats = console.stats();
        eprintln!(
            "{} ticks, {} markers received, {} discarded, {} stream faults",
            stats.ticks, stats.entries_emitted, stats.samples_discarded, stats.faults
        );
    }

    exit_codes::SUCCESS
}

/// Run a blocking console operation off the async runtime
///
/// The console moves into the blocking task and is handed back with the
/// operation's result.
async fn run_blocking<T, F>(console: MarkerConsole, op: F) -> Result<(MarkerConsole, T), String>
where
    F: FnOnce(&mut MarkerConsole) -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut console = console;
        let output = op(&mut console);
        (console, output)
    })
    .await
    .map_err(|e| format!("Task join error: {}", e))
}

fn select_streams(
    streams: &[StreamDescriptor],
    names: &[String],
    all: bool,
) -> Result<Vec<StreamDescriptor>, String> {
    if all || names.is_empty() {
        return Ok(streams.to_vec());
    }

    names
        .iter()
        .map(|name| {
            streams
                .iter()
                .find(|s| &s.name == name)
                .cloned()
                .ok_or_else(|| format!("Stream '{}' not found", name))
        })
        .collect()
}

fn print_entries(entries: &[&LogEntry], json: bool) -> Result<(), String> {
    if json {
        let lines = entries
            .iter()
            .map(|e| output::to_json(e, true))
            .collect::<Result<Vec<_>, _>>()?;
        output::write_lines(lines)
    } else {
        output::write_lines(entries.iter().map(|e| output::format_entry(e)))
    }
}
