use dot_printer::{Bitmap, MotionController, PlanConfig, PrintEngine, SimDrive};
use std::env;
use std::time::Duration;

#[derive(Debug, PartialEq)]
enum PatternOption {
    Checker,
    Diagonal,
    Frame,
}

impl PatternOption {
    fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "checker" | "checkerboard" => Some(Self::Checker),
            "diagonal" | "stripes" => Some(Self::Diagonal),
            "frame" | "border" => Some(Self::Frame),
            _ => None,
        }
    }

    fn all_options() -> Vec<&'static str> {
        vec!["checker", "diagonal", "frame"]
    }
}

fn print_usage() {
    println!("Usage: cargo run --example print_pattern [OPTION]");
    println!("Options:");
    println!("  checker    Checkerboard blocks");
    println!("  diagonal   Diagonal stripes");
    println!("  frame      Border frame with a cross");
    println!("\nIf no option is provided, 'checker' is used as default.");
    println!("\nEnvironment:");
    println!("  MAX_COLUMN  highest carriage column (default 31)");
    println!("  THRESHOLD   luma cutoff for a printed dot, 0-255 (default 128)");
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

    let option = if args.len() > 1 {
        let arg = &args[1];

        if arg == "--help" || arg == "-h" {
            print_usage();
            return;
        }

        match PatternOption::from_str(arg) {
            Some(opt) => opt,
            None => {
                eprintln!("Error: Unknown option '{}'", arg);
                eprintln!(
                    "Available options: {}",
                    PatternOption::all_options().join(", ")
                );
                print_usage();
                return;
            }
        }
    } else {
        PatternOption::Checker
    };

    println!("Running with option: {:?}", option);

    let max_column: u32 = env_or("MAX_COLUMN", 31);
    let threshold: u8 = env_or("THRESHOLD", 128);

    let width = max_column + 1;
    let height = 16;
    let pattern = create_test_pattern(&option, width, height);
    let bitmap = threshold_filter(&pattern, threshold);
    println!(
        "Pattern {}x{}, {} dots after thresholding at {}",
        width,
        height,
        bitmap.dot_count(),
        threshold
    );

    let mut job = PlanConfig::new().build(&bitmap).unwrap();
    let motion = MotionController::new(SimDrive::new(max_column, 1), Duration::from_millis(0));
    let mut engine = PrintEngine::new(motion);

    match engine.start(&mut job) {
        Ok(()) => {
            println!("Job finished: {:?}", job.status());
            println!("{}", engine.motion().drive().render());
        }
        Err(err) => eprintln!("Print failed: {}", err),
    }
}

fn create_test_pattern(option: &PatternOption, width: u32, height: u32) -> image::GrayImage {
    image::GrayImage::from_fn(width, height, |x, y| {
        let dark = match option {
            PatternOption::Checker => (x / 4 + y / 4) % 2 == 0,
            PatternOption::Diagonal => (x + y) % 8 < 3,
            PatternOption::Frame => {
                x == 0 || y == 0 || x == width - 1 || y == height - 1 || x == y || x + y == width - 1
            }
        };
        if dark {
            image::Luma([0u8])
        } else {
            image::Luma([255u8])
        }
    })
}

/// Luma below `cutoff` becomes a printed dot, everything else stays blank.
fn threshold_filter(gray: &image::GrayImage, cutoff: u8) -> Bitmap {
    let mut bits = Vec::with_capacity((gray.width() * gray.height()) as usize);
    for pixel in gray.pixels() {
        bits.push(pixel[0] < cutoff);
    }
    Bitmap::from_bits(gray.width(), gray.height(), bits).unwrap()
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
