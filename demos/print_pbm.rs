use dot_printer::{pbm, Error, JobEvent, MotionController, PlanConfig, PrintEngine, SimDrive};
use std::time::Duration;
use std::{env, fs};

fn print_usage() {
    println!("Usage: cargo run --example print_pbm [FILE]");
    println!();
    println!("Decodes a plain PBM (P1) file, prints it on the simulated drive");
    println!("and shows the resulting paper.");
    println!("FILE defaults to demos/assets/glyph.pbm.");
    println!();
    println!("Environment:");
    println!("  MAX_COLUMN       highest carriage column (default 31)");
    println!("  FEED_STEPS       feed steps per bitmap row (default 1)");
    println!("  STRIKE_DWELL_MS  head dwell per dot in milliseconds (default 0)");
    println!("  BIDIRECTIONAL    serpentine printing, true or false (default true)");
}

fn main() {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "[{}:{}] {} - {}",
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.level(),
                record.args()
            )
        })
        .init();

    let args: Vec<String> = env::args().collect();

    let file = if args.len() > 1 {
        let arg = &args[1];
        if arg == "--help" || arg == "-h" {
            print_usage();
            return;
        }
        arg.as_str()
    } else {
        "demos/assets/glyph.pbm"
    };

    let max_column: u32 = env_or("MAX_COLUMN", 31);
    let feed_steps: u32 = env_or("FEED_STEPS", 1);
    let dwell_ms: u64 = env_or("STRIKE_DWELL_MS", 0);
    let bidirectional = env::var("BIDIRECTIONAL")
        .map(|v| v != "false" && v != "0")
        .unwrap_or(true);

    let text = match fs::read_to_string(file) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("Failed to read {}: {}", file, err);
            return;
        }
    };

    let bitmap = match pbm::decode(&text) {
        Ok(bitmap) => bitmap,
        Err(err) => {
            eprintln!("Not a printable PBM: {}", err);
            return;
        }
    };
    println!(
        "Loaded {}: {}x{} dots, {} set",
        file,
        bitmap.width(),
        bitmap.height(),
        bitmap.dot_count()
    );

    let mut job = match PlanConfig::new()
        .bidirectional(bidirectional)
        .feed_per_row(feed_steps)
        .build(&bitmap)
    {
        Ok(job) => job,
        Err(err) => {
            eprintln!("Bad plan configuration: {}", err);
            return;
        }
    };
    println!(
        "Planned {} rows, {} strikes",
        job.total_rows(),
        job.strike_count()
    );

    let motion = MotionController::new(
        SimDrive::new(max_column, feed_steps),
        Duration::from_millis(dwell_ms),
    );
    let mut engine = PrintEngine::new(motion).with_observer(|event| {
        if let JobEvent::RowCompleted { row, total } = event {
            println!("  row {}/{} done", row + 1, total);
        }
    });

    match engine.start(&mut job) {
        Ok(()) => {
            println!("Job finished: {:?}", job.status());
            println!("{}", engine.motion().drive().render());
        }
        Err(Error::TooWide { width, printable }) => {
            eprintln!(
                "Picture is too wide: {} dots, but the carriage can only print {}.",
                width, printable
            );
            eprintln!("Resize the picture or raise MAX_COLUMN.");
        }
        Err(err) => eprintln!("Print failed: {}", err),
    }
}

fn env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    match env::var(key) {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            eprintln!("Invalid {} '{}'. Using {} as default.", key, value, default);
            default
        }),
        Err(_) => default,
    }
}
