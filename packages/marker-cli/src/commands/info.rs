use crate::backend;
use crate::cli::InfoArgs;
use crate::exit_codes;
use crate::output;
use marker_stream::ConsoleConfig;
use serde::Serialize;

#[derive(Serialize)]
struct InfoOutput {
    cli_version: String,
    backends: Vec<&'static str>,
    config: ConsoleConfig,
    platform: String,
    arch: String,
}

pub fn execute(args: InfoArgs) -> i32 {
    let config = match backend::resolve_config(&args.config) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    let info = InfoOutput {
        cli_version: env!("CARGO_PKG_VERSION").to_string(),
        backends: backend::available_backends(),
        config,
        platform: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
    };

    if args.json {
        match output::to_json(&info, false).and_then(|json| output::write_lines([json])) {
            Ok(()) => {}
            Err(e) => {
                eprintln!("Error: {}", e);
                return exit_codes::EXECUTION_ERROR;
            }
        }
    } else {
        println!("markerlog CLI v{}", info.cli_version);
        println!("Platform: {} ({})", info.platform, info.arch);
        println!("Backends: {}", info.backends.join(", "));
        println!();
        println!("Log capacity:       {}", info.config.log_capacity);
        println!("Max batch per tick: {}", info.config.max_batch);
        println!("Inlet buffer:       {}", info.config.inlet_buffer_capacity);
        println!("Liveness timeout:   {}s", info.config.liveness_timeout_secs);
        println!("Discovery timeout:  {}s", info.config.discovery_timeout_secs);
        println!("Tick interval:      {}ms", info.config.tick_interval_ms);
    }

    exit_codes::SUCCESS
}
