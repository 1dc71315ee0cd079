use std::io::Write;
use std::time::Instant;

use clap::{App, AppSettings, Arg, ArgMatches};

use sg1::channel::{self, Direction};
use sg1::error::{Error, Result};
use sg1::{module, pipeline, utils};

fn build_app() -> App<'static> {
    let mut listing = String::from("Available modules:\n");
    for module in module::registry() {
        listing.push_str(&format!("  {:10} : {}\n", module.name(), module.description()));
    }
    listing.push_str("\nAvailable channels:\n");
    for channel in channel::registry() {
        listing.push_str(&format!("  {:10} : {}\n", channel.name(), channel.description()));
    }

    let app = App::new(sg1::APP_NAME)
        .version(sg1::APP_VERSION)
        .about("A data tunnel with transforms and covert carriers.")
        .setting(AppSettings::DeriveDisplayOrder)
        .after_help(&*Box::leak(listing.into_boxed_str()))
        .arg(
            Arg::new("in")
                .long("in")
                .takes_value(true)
                .default_value("console")
                .help("Read input data from this channel."),
        )
        .arg(
            Arg::new("out")
                .long("out")
                .takes_value(true)
                .default_value("console")
                .help("Write output data to this channel."),
        )
        .arg(
            Arg::new("modules")
                .long("modules")
                .takes_value(true)
                .default_value("raw")
                .help("Comma separated list of modules to apply, in order."),
        )
        .arg(
            Arg::new("buffer-size")
                .long("buffer-size")
                .takes_value(true)
                .default_value("512")
                .help("Buffer size to use while reading data from input and writing to output."),
        )
        .arg(
            Arg::new("delay")
                .long("delay")
                .takes_value(true)
                .default_value("0")
                .help("Delay in milliseconds to wait between one I/O loop and another, or 0 for no delay."),
        )
        .arg(Arg::new("debug").long("debug").help("Enable debug messages."));

    let app = channel::register_all(app);
    module::register_all(app)
}

fn parse_number<T: std::str::FromStr>(matches: &ArgMatches, name: &str) -> Result<T> {
    let value = matches.value_of(name).unwrap_or_default();
    value
        .parse()
        .map_err(|_| Error::Other(format!("invalid --{name} value '{value}'")))
}

async fn run(matches: &ArgMatches) -> Result<()> {
    let buffer_size: usize = parse_number(matches, "buffer-size")?;
    let delay: u64 = parse_number(matches, "delay")?;

    let mut input = channel::factory(
        matches.value_of("in").unwrap_or("console"),
        Direction::Input,
        matches,
    )?;
    let mut output = channel::factory(
        matches.value_of("out").unwrap_or("console"),
        Direction::Output,
        matches,
    )?;
    let mut modules = module::chain(matches.value_of("modules").unwrap_or("raw"), matches)?;

    let names: Vec<&str> = modules
        .iter()
        .map(|m| m.name())
        .filter(|name| *name != "raw")
        .collect();
    if names.is_empty() {
        log::info!("{} --> {}", input.name(), output.name());
    } else {
        log::info!("{} --> [{}] --> {}", input.name(), names.join(","), output.name());
    }

    input.start().await?;
    output.start().await?;

    let started = Instant::now();
    pipeline::run(&*input, &*output, &mut modules, buffer_size, delay).await?;
    let elapsed = started.elapsed();

    let read = input.stats().total_read;
    let wrote = output.stats().total_wrote;
    let es = elapsed.as_secs_f64();
    let bps = if es > 0.0 {
        read.min(wrote) as f64 / es
    } else {
        0.0
    };

    eprintln!();
    eprintln!("Total read    : {}", utils::format_bytes(read));
    eprintln!("Total written : {}", utils::format_bytes(wrote));
    eprintln!("Time elapsed  : {elapsed:.2?}");
    eprintln!("Speed         : {}", utils::format_speed(bps));
    eprintln!();

    Ok(())
}

#[tokio::main]
async fn main() {
    let matches = build_app().get_matches();

    let level = if matches.is_present("debug") {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} - {}",
                record.level(),
                chrono::Local::now().format("%H:%M:%S.%6f"),
                record.args()
            )
        })
        .filter(None, level)
        .init();

    eprintln!("{} v{}\n", sg1::APP_NAME, sg1::APP_VERSION);

    if let Err(e) = run(&matches).await {
        log::error!("{e}");
        eprintln!();
        std::process::exit(1);
    }
}
