use clap::Parser;
use fabula::prelude::*;
use std::fs;
use std::io::{self, Write};
use std::time::Instant;

/// A headless debugger for branching narrative dialogue flows
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the flow graphs JSON file (an array of flows)
    flow_path: Option<String>,
    /// Path to the variable sheets JSON file (an array of seeds)
    sheets_path: Option<String>,

    /// Id of the flow to start in; defaults to the first flow in the file
    #[arg(short = 'f', long)]
    start_flow: Option<String>,

    /// Node id to break on; may be given multiple times
    #[arg(short, long = "breakpoint")]
    breakpoints: Vec<String>,

    /// Step budget before the runaway guard pauses the session
    #[arg(long)]
    max_steps: Option<usize>,

    /// How many times the runaway guard may be waved through before the run
    /// ends at the limit
    #[arg(long, default_value_t = 0)]
    step_limit_continues: usize,

    /// Response id to choose at each dialogue, in order; once the list is
    /// used up, the first valid response wins
    #[arg(short, long = "choose")]
    choices: Vec<String>,

    /// Write the full session artifact to this path when the run ends
    #[arg(long)]
    dump_artifact: Option<String>,

    /// Run in interactive mode to be prompted at each dialogue
    #[arg(short = 'i', long, help = "Run in interactive 'human' mode")]
    human: bool,
}

fn main() {
    let cli = Cli::parse();

    if cli.human {
        run_interactive(cli);
    } else {
        run_non_interactive(cli);
    }
}

/// Runs the CLI in non-interactive mode, taking all arguments from the command line.
fn run_non_interactive(cli: Cli) {
    let flow_path = cli.flow_path.clone().unwrap_or_else(|| {
        exit_with_error("Flow graphs path is required in non-interactive mode.");
    });
    let sheets_path = cli.sheets_path.clone().unwrap_or_else(|| {
        exit_with_error("Variable sheets path is required in non-interactive mode.");
    });

    run_session(flow_path, sheets_path, cli);
}

/// Runs the CLI in an interactive, human-friendly mode with prompts.
fn run_interactive(mut cli: Cli) {
    println!("--- Fabula Interactive Mode ---");

    let flow_path = match cli.flow_path.take() {
        Some(path) => path,
        None => prompt_for_input("Enter flow graphs path", Some("data/flows.json")),
    };
    let sheets_path = match cli.sheets_path.take() {
        Some(path) => path,
        None => prompt_for_input("Enter variable sheets path", Some("data/sheets.json")),
    };

    run_session(flow_path, sheets_path, cli);
}

fn run_session(flow_path: String, sheets_path: String, cli: Cli) {
    let Cli {
        start_flow,
        breakpoints,
        max_steps,
        step_limit_continues,
        choices,
        dump_artifact,
        human,
        ..
    } = cli;
    let total_start = Instant::now();

    // --- 1. File Loading ---
    let load_start = Instant::now();
    let flows_json = fs::read_to_string(&flow_path).unwrap_or_else(|e| {
        exit_with_error(&format!("Failed to read flow file '{}': {}", &flow_path, e))
    });
    let sheets_json = fs::read_to_string(&sheets_path).unwrap_or_else(|e| {
        exit_with_error(&format!(
            "Failed to read sheets file '{}': {}",
            &sheets_path, e
        ))
    });
    let load_duration = load_start.elapsed();

    // --- 2. Parsing and Validation ---
    let parse_start = Instant::now();
    let graphs = flow_graphs_from_json(&flows_json)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse flow JSON: {}", e)));
    if graphs.is_empty() {
        exit_with_error("The flow file contains no flows.");
    }
    for graph in &graphs {
        validate_flow_graph(graph).unwrap_or_else(|e| {
            exit_with_error(&format!("Flow '{}' failed validation: {}", graph.id, e))
        });
    }
    let seeds = variable_seeds_from_json(&sheets_json)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse sheets JSON: {}", e)));
    let parse_duration = parse_start.elapsed();

    // --- 3. Session Setup ---
    let start_flow_id = start_flow.unwrap_or_else(|| graphs[0].id.clone());
    let flow_count = graphs.len();
    let store = MemoryFlowStore::from_graphs(graphs);
    let sheets = MemorySheetStore::from_seeds(seeds);

    let mut session = DebugSession::start(store, &sheets, &start_flow_id, None)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to start session: {}", e)));
    if let Some(max_steps) = max_steps {
        session = session.with_max_steps(max_steps);
    }
    if !breakpoints.is_empty() {
        session = session.with_breakpoints(breakpoints);
    }

    println!(
        "\nLoaded {} flow(s) and {} variable(s); starting in '{}'...",
        flow_count,
        session.state().variables.len(),
        start_flow_id
    );

    // --- 4. The Run Loop ---
    // Auto-play until the session finishes or pauses for good. Dialogue waits
    // are resolved from the scripted choice list, by prompt in human mode, or
    // by the first valid response.
    let run_start = Instant::now();
    let mut scripted_choices = choices.into_iter();
    let mut continues_left = step_limit_continues;
    loop {
        session
            .run_until_pause()
            .unwrap_or_else(|e| exit_with_error(&format!("Execution failed: {}", e)));
        match session.state().status {
            Status::Finished => break,
            Status::WaitingInput => {
                let response_id = match scripted_choices.next() {
                    Some(id) => id,
                    None if human => prompt_for_choice(&session.state().pending_choices),
                    None => first_valid_response(&session.state().pending_choices),
                };
                session.choose_response(&response_id).unwrap_or_else(|e| {
                    exit_with_error(&format!("Could not choose '{}': {}", response_id, e))
                });
            }
            Status::Paused => {
                if session.state().step_limit_reached && continues_left > 0 {
                    continues_left -= 1;
                    session.continue_past_limit().unwrap_or_else(|e| {
                        exit_with_error(&format!("Could not raise the step limit: {}", e))
                    });
                    continue;
                }
                // A breakpoint, a stall or the exhausted step limit: the
                // headless run ends at the first hard pause.
                break;
            }
            Status::Running => unreachable!("run_until_pause returned while still running"),
        }
    }
    let run_duration = run_start.elapsed();

    // --- 5. Results ---
    println!("\n--- Console ---");
    println!(
        "{}",
        TraceFormatter::format_console(&session.state().console)
    );
    println!("\n--- Execution Trace ---");
    println!(
        "{}",
        TraceFormatter::format_log(&session.state().execution_log)
    );

    // --- 6. Artifact Export ---
    if let Some(path) = dump_artifact {
        session.capture_artifact().save(&path).unwrap_or_else(|e| {
            exit_with_error(&format!("Failed to save session artifact: {}", e))
        });
        println!("\nSession artifact written to '{}'", path);
    }

    // --- 7. Summary ---
    let total_duration = total_start.elapsed();
    println!("\n--- Session Summary ---");
    println!("Final Status:     {}", session.state().status);
    println!("Steps Executed:   {}", session.state().step_count);
    println!("Console Entries:  {}", session.state().console.len());
    println!("Variable Writes:  {}", session.state().history.len());
    println!("Call Stack Depth: {}", session.state().call_stack.len());

    println!("\n--- Performance Summary ---");
    println!("File Loading: {:?}", load_duration);
    println!("Parsing:      {:?}", parse_duration);
    println!("Execution:    {:?}", run_duration);
    println!("---------------------------");
    println!("Total:        {:?}", total_duration);
    println!();

    #[cfg(feature = "debug-tools")]
    {
        println!("--- Full State Dump (debug-tools) ---");
        match serde_json::to_string_pretty(session.state()) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("State dump failed: {}", e),
        }
        println!();
    }
}

/// Headless choice policy: the first valid response wins.
fn first_valid_response(choices: &[PendingChoice]) -> String {
    choices
        .iter()
        .find(|choice| choice.valid)
        .map(|choice| choice.response_id.clone())
        .unwrap_or_else(|| exit_with_error("The dialogue is waiting but no response is valid."))
}

/// Lists the pending responses and loops until the user picks a valid one.
fn prompt_for_choice(choices: &[PendingChoice]) -> String {
    loop {
        println!("\nPlease choose a response:");
        for (index, choice) in choices.iter().enumerate() {
            let marker = if choice.valid { "" } else { " (unavailable)" };
            println!("  {}: {}{}", index + 1, choice.text, marker);
        }
        let input = prompt_for_input("Enter choice", Some("1"));

        match input.trim().parse::<usize>() {
            Ok(number) if number >= 1 && number <= choices.len() => {
                let choice = &choices[number - 1];
                if choice.valid {
                    break choice.response_id.clone();
                }
                println!("That response is not available right now.");
            }
            _ => println!(
                "Invalid choice. Please enter a number between 1 and {}.",
                choices.len()
            ),
        }
    }
}

/// A helper function to prompt the user and read a line of input.
fn prompt_for_input(prompt_text: &str, default: Option<&str>) -> String {
    let mut line = String::new();
    let default_prompt = default.map_or("".to_string(), |d| format!(" [default: {}]", d));

    print!("> {}{}: ", prompt_text, default_prompt);
    io::stdout().flush().unwrap();

    io::stdin()
        .read_line(&mut line)
        .expect("Failed to read line");
    let trimmed = line.trim().to_string();

    if trimmed.is_empty() {
        default.unwrap_or("").to_string()
    } else {
        trimmed
    }
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
