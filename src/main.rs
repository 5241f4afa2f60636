// Entry point and high-level CLI flow.
//
// - Option [1] loads the hospital directory CSV and prints load diagnostics.
// - Option [2] runs the five analyses, exports every table and previews them.
// - After generating reports, the user can go back to the menu or exit.
// `--batch` runs [1] then [2] once without prompting.
use clap::Parser;
use hospital_report::loader::{self, LoadOptions};
use hospital_report::output;
use hospital_report::reports::{self, ObjectiveConfig};
use hospital_report::util;
use hospital_report::RecordSet;
use once_cell::sync::Lazy;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "hospital_report")]
#[command(about = "Clean and summarise a hospital directory CSV", long_about = None)]
struct Cli {
    /// Hospital directory CSV to load
    #[arg(short, long, default_value = "hospital_directory.csv")]
    input: PathBuf,

    /// Directory for exported CSV and JSON reports
    #[arg(short, long, default_value = "reports")]
    out_dir: PathBuf,

    /// Rows kept in top-N rankings
    #[arg(long, default_value_t = 10)]
    top_n: usize,

    /// Histogram bins for the bed distribution
    #[arg(long, default_value_t = 30)]
    bins: usize,

    /// Rows shown per table in console previews
    #[arg(long, default_value_t = 5)]
    preview_rows: usize,

    /// Load and generate once, then exit
    #[arg(long)]
    batch: bool,
}

// Loaded once, reused for every report generation in the same run.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState { data: None }));

struct AppState {
    data: Option<RecordSet>,
}

/// `None` once stdin is closed.
fn read_choice() -> Option<String> {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match io::stdin().read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        print!("Back to Report Selection (Y/N): ");
        let _ = io::stdout().flush();
        let mut buf = String::new();
        if io::stdin().read_line(&mut buf).unwrap_or(0) == 0 {
            return false;
        }
        match buf.trim().to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Option [1]: load the CSV and keep it in `APP_STATE`.
fn handle_load(cli: &Cli) -> bool {
    match loader::load_csv(&cli.input, &LoadOptions::default()) {
        Ok((data, report)) => {
            println!(
                "Processing dataset... ({} rows loaded, {} columns)",
                util::format_int(report.loaded_rows),
                util::format_int(data.schema().len())
            );
            if report.parse_errors > 0 {
                println!(
                    "Note: {} rows skipped due to parse errors.",
                    util::format_int(report.parse_errors)
                );
            }
            println!("");
            APP_STATE
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .data = Some(data);
            true
        }
        Err(e) => {
            error!(path = %cli.input.display(), error = %e, "Failed to load file");
            eprintln!("Failed to load file: {}\n", e);
            false
        }
    }
}

/// Option [2]: run every analysis, export the tables and preview them.
fn handle_generate_reports(cli: &Cli) {
    let data = APP_STATE
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .data
        .clone();
    let Some(data) = data else {
        println!("Error: No data loaded. Please load the CSV file first (option 1).\n");
        return;
    };

    let config = ObjectiveConfig {
        top_n: cli.top_n,
        histogram_bins: cli.bins,
    };
    println!("Generating reports...\n");
    let generated = match reports::generate_all(&data, &config) {
        Ok(r) => r,
        Err(e) => {
            error!(error = %e, "Report generation failed");
            eprintln!("Report generation failed: {}\n", e);
            return;
        }
    };

    for (title, table) in generated.tables() {
        output::preview_table(title, table, cli.preview_rows);
    }

    match output::export_all(&cli.out_dir, &generated) {
        Ok(files) => {
            info!(files = files.len(), dir = %cli.out_dir.display(), "Exported reports");
            println!("(Full tables exported to {})\n", cli.out_dir.display());
        }
        Err(e) => eprintln!("Write error: {}", e),
    }

    let summary = &generated.dashboard.summary;
    println!("Summary Stats (summary.json):");
    println!(
        "{{\"total_hospitals\": {}, \"total_states\": {}, \"total_beds\": {}, \"mean_beds\": {}}}\n",
        util::format_int(summary.total_hospitals),
        util::format_int(summary.total_states),
        util::format_number(summary.total_beds, 0),
        util::format_number(summary.mean_beds, 2)
    );
}

fn init_logging() {
    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));
    tracing_subscriber::registry().with(stderr_layer).init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    if cli.batch {
        if handle_load(&cli) {
            handle_generate_reports(&cli);
        }
        return;
    }

    loop {
        println!("Hospital Directory Analysis:");
        println!("[1] Load the file");
        println!("[2] Generate Reports\n");
        let Some(choice) = read_choice() else {
            println!("Exiting the program.");
            break;
        };
        match choice.as_str() {
            "1" => {
                handle_load(&cli);
            }
            "2" => {
                println!("");
                handle_generate_reports(&cli);
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => {
                println!("Invalid choice. Please enter 1 or 2.\n");
            }
        }
    }
}
