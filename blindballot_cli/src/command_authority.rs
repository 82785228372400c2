use crate::config::Config;
use blindballot::AuthorityKeyPair;
use std::fs::File;
use std::io::prelude::*;

pub fn command_authority(matches: &clap::ArgMatches, config: &Config) {
    // Subcommands
    if let Some(matches) = matches.subcommand_matches("generate") {
        command_authority_generate(matches, config);
        std::process::exit(0);
    }
}

pub fn command_authority_generate(matches: &clap::ArgMatches, config: &Config) {
    let secret_location = config.secret_path(matches);
    let keysize = config.keysize(matches).unwrap_or_else(|e| {
        eprintln!("blindballot authority generate: {}", e);
        std::process::exit(1);
    });

    if keysize < blindballot::DEFAULT_KEY_SIZE {
        warn!("using insecure keysize {} for the authority key", keysize);
    }

    let mut rng = rand::rngs::OsRng;
    let authority = AuthorityKeyPair::generate(&mut rng, keysize).unwrap_or_else(|e| {
        eprintln!("blindballot authority generate: {}", e);
        std::process::exit(1);
    });

    let mut file = File::create(&secret_location).unwrap_or_else(|e| {
        eprintln!(
            "blindballot authority generate: cannot create file {}: {}",
            &secret_location, e
        );
        std::process::exit(1);
    });

    let secret = serde_json::to_string_pretty(&authority).unwrap_or_else(|e| {
        eprintln!("blindballot authority generate: cannot encode secret: {}", e);
        std::process::exit(1);
    });
    file.write_all(secret.as_bytes()).unwrap_or_else(|e| {
        eprintln!(
            "blindballot authority generate: unable to write secret to {}: {}",
            &secret_location, e
        );
        std::process::exit(1);
    });
    info!("wrote authority secret key to {}", secret_location);

    let public = authority.public_key();
    info!("authority address {}", public.address());

    // Serialization of the public key cannot fail
    println!("{}", serde_json::to_string_pretty(&public).unwrap_or_default());
}
