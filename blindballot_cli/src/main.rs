#[macro_use]
extern crate log;

use clap::{App, AppSettings, Arg, SubCommand};
use log::LevelFilter;
use num_enum::TryFromPrimitive;
use std::convert::TryFrom;

mod command_authority;
mod command_credential;
mod command_e2e;
mod command_keygen;
mod config;

use command_authority::*;
use command_credential::*;
use command_e2e::*;
use command_keygen::*;
use config::Config;

#[derive(TryFromPrimitive, PartialEq, Copy, Clone, Debug)]
#[repr(u8)]
enum Verbosity {
    Warn = 0,
    Info = 1,
    Debug = 2,
}

impl From<Verbosity> for LevelFilter {
    fn from(verbosity: Verbosity) -> Self {
        match verbosity {
            Verbosity::Warn => LevelFilter::Warn,
            Verbosity::Info => LevelFilter::Info,
            Verbosity::Debug => LevelFilter::Debug,
        }
    }
}

fn main() {
    let public_arg = Arg::with_name("public")
        .long("public")
        .takes_value(true)
        .required(true)
        .help("Authority public key file in JSON or CBOR format");

    let secret_arg = Arg::with_name("secret")
        .long("secret")
        .takes_value(true)
        .help("Authority secret key file - defaults to BLINDBALLOT_AUTHORITY_SECRET or ./authority.json");

    let keysize_arg = Arg::with_name("keysize")
        .long("keysize")
        .takes_value(true)
        .help("RSA key size in bits - defaults to BLINDBALLOT_KEYSIZE or 2048");

    let matches = App::new("BlindBallot CLI")
        .version("1.0")
        .author("Patrick Hayes <patrick.d.hayes@gmail.com>")
        .about("Issues and checks anonymous voter credentials, and runs local elections")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("v")
                .short("v")
                .multiple(true)
                .help("Sets the level of verbosity"),
        )
        .subcommand(SubCommand::with_name("keygen").about("Generate a voter signing key"))
        .subcommand(
            SubCommand::with_name("authority")
                .about("Manage the election authority key")
                .setting(AppSettings::SubcommandRequiredElseHelp)
                .subcommand(
                    SubCommand::with_name("generate")
                        .about("Generate the authority key, write the secret and print the public key")
                        .arg(secret_arg.clone())
                        .arg(keysize_arg.clone()),
                ),
        )
        .subcommand(
            SubCommand::with_name("stamp")
                .about("Print the stamp of a voter address")
                .arg(public_arg.clone())
                .arg(
                    Arg::with_name("ADDRESS")
                        .index(1)
                        .required(true)
                        .help("Voter address, 0x-prefixed hex"),
                ),
        )
        .subcommand(
            SubCommand::with_name("blind")
                .about("Blind a stamp for the authority to sign")
                .arg(public_arg.clone())
                .arg(
                    Arg::with_name("STAMP")
                        .index(1)
                        .required(true)
                        .help("Stamp, 0x-prefixed hex"),
                ),
        )
        .subcommand(
            SubCommand::with_name("sign")
                .about("Sign a blinded stamp with the authority key")
                .arg(secret_arg.clone())
                .arg(
                    Arg::with_name("BLINDED")
                        .index(1)
                        .required(true)
                        .help("Blinded stamp, 0x-prefixed hex"),
                ),
        )
        .subcommand(
            SubCommand::with_name("unblind")
                .about("Unblind an authority signature into a credential signature")
                .arg(public_arg.clone())
                .arg(
                    Arg::with_name("BLINDED-SIGNATURE")
                        .index(1)
                        .required(true)
                        .help("Authority signature over the blinded stamp, 0x-prefixed hex"),
                )
                .arg(
                    Arg::with_name("FACTOR")
                        .index(2)
                        .required(true)
                        .help("Blinding factor printed by `blind`"),
                ),
        )
        .subcommand(
            SubCommand::with_name("verify")
                .about("Check a credential, exiting 0 if it verifies and 1 otherwise")
                .arg(public_arg)
                .arg(
                    Arg::with_name("STAMP")
                        .index(1)
                        .required(true)
                        .help("Stamp, 0x-prefixed hex"),
                )
                .arg(
                    Arg::with_name("SIGNATURE")
                        .index(2)
                        .required(true)
                        .help("Credential signature, 0x-prefixed hex"),
                ),
        )
        .subcommand(
            SubCommand::with_name("e2e")
                .about("Run a complete election through an in-process relay and print the tally")
                .arg(
                    Arg::with_name("voters")
                        .long("voters")
                        .takes_value(true)
                        .default_value("3")
                        .help("Number of voters"),
                )
                .arg(
                    Arg::with_name("candidates")
                        .long("candidates")
                        .takes_value(true)
                        .default_value("2")
                        .help("Number of candidates"),
                )
                .arg(keysize_arg),
        )
        .get_matches();

    let verbosity = Verbosity::try_from(matches.occurrences_of("v").min(2) as u8)
        .unwrap_or(Verbosity::Warn);
    init_logging(verbosity);

    let config = Config::from_env().unwrap_or_else(|e| {
        eprintln!("blindballot: {}", e);
        std::process::exit(1);
    });
    debug!("config: {:?}", config);

    // Subcommands
    match matches.subcommand() {
        ("keygen", Some(matches)) => command_keygen(matches),
        ("authority", Some(matches)) => command_authority(matches, &config),
        ("stamp", Some(matches)) => command_stamp(matches),
        ("blind", Some(matches)) => command_blind(matches),
        ("sign", Some(matches)) => command_sign(matches, &config),
        ("unblind", Some(matches)) => command_unblind(matches),
        ("verify", Some(matches)) => command_verify(matches),
        ("e2e", Some(matches)) => command_e2e(matches, &config),
        _ => unreachable!(),
    }
}

fn init_logging(verbosity: Verbosity) {
    use log4rs::append::console::{ConsoleAppender, Target};
    use log4rs::config::{Appender, Config as LogConfig, Root};
    use log4rs::encode::pattern::PatternEncoder;

    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("{l} {t} - {m}{n}")))
        .build();

    let log_config = LogConfig::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(verbosity.into()));

    let result = match log_config {
        Ok(log_config) => log4rs::init_config(log_config).map(|_| ()).map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };
    if let Err(e) = result {
        eprintln!("blindballot: unable to set up logging: {}", e);
    }
}

pub fn expand(input: &str) -> String {
    shellexpand::full(input)
        .unwrap_or_else(|e| {
            eprintln!("blindballot: unable to expand {}: {}", input, e);
            std::process::exit(1);
        })
        .into_owned()
}

/// Read a JSON or CBOR file, exiting on failure
pub fn load<T: serde::de::DeserializeOwned>(command: &str, filename: &str) -> T {
    use content_inspector::ContentType;

    let file_bytes = std::fs::read(filename).unwrap_or_else(|e| {
        eprintln!("blindballot {}: unable to read {}: {}", command, filename, e);
        std::process::exit(1);
    });

    let parsed = match content_inspector::inspect(&file_bytes) {
        ContentType::UTF_8 => serde_json::from_slice(&file_bytes).map_err(|e| e.to_string()),
        ContentType::BINARY => serde_cbor::from_slice(&file_bytes).map_err(|e| e.to_string()),
        _ => Err("invalid file format".to_string()),
    };
    parsed.unwrap_or_else(|e| {
        eprintln!("blindballot {}: unable to read {}: {}", command, filename, e);
        std::process::exit(1);
    })
}

/// Parse a hex command line argument into a big integer, exiting on failure
pub fn hex_arg(command: &str, matches: &clap::ArgMatches, name: &str) -> blindballot::BigUint {
    // Positional arguments are all required
    let value = matches.value_of(name).unwrap_or_default();
    blindballot::biguint_from_hex(value).unwrap_or_else(|e| {
        eprintln!("blindballot {}: invalid {} {}: {}", command, name, value, e);
        std::process::exit(1);
    })
}
