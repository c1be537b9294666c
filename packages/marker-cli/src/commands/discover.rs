use crate::backend;
use crate::cli::DiscoverArgs;
use crate::exit_codes;
use crate::output;
use marker_stream::MarkerConsole;

pub fn execute(args: DiscoverArgs) -> i32 {
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

    let mut console = match MarkerConsole::new(setup.client, config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::INPUT_ERROR;
        }
    };

    let streams = match console.refresh_streams() {
        Ok(streams) => streams.to_vec(),
        Err(e) => {
            eprintln!("Error: Discovery failed: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    };

    let written = if args.json {
        output::to_json(&streams, false).and_then(|json| output::write_lines([json]))
    } else if streams.is_empty() {
        Ok(())
    } else {
        output::write_lines(streams.iter().map(output::format_stream))
    };

    if let Err(e) = written {
        eprintln!("Error: {}", e);
        return exit_codes::EXECUTION_ERROR;
    }

    if streams.is_empty() {
        eprintln!("No streams found.");
        return exit_codes::NO_STREAMS;
    }

    exit_codes::SUCCESS
}
