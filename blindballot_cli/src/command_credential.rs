use super::{hex_arg, load};
use crate::config::Config;
use blindballot::*;
use std::str::FromStr;

fn public_key(command: &str, matches: &clap::ArgMatches) -> AuthorityPublicKey {
    // --public is required
    let filename = crate::expand(matches.value_of("public").unwrap_or_default());
    let public: AuthorityPublicKey = load(command, &filename);
    public.validate().unwrap_or_else(|e| {
        eprintln!("blindballot {}: {} is not a usable key: {}", command, filename, e);
        std::process::exit(1);
    });
    public
}

pub fn command_stamp(matches: &clap::ArgMatches) {
    let public = public_key("stamp", matches);

    let address = matches.value_of("ADDRESS").unwrap_or_default();
    let address = Address::from_str(address).unwrap_or_else(|e| {
        eprintln!("blindballot stamp: {}", e);
        std::process::exit(1);
    });

    let stamp = derive_stamp(&address, &public.modulus);
    println!("{}", biguint_to_hex(&stamp.0));
}

pub fn command_blind(matches: &clap::ArgMatches) {
    let public = public_key("blind", matches);
    let stamp = Stamp(hex_arg("blind", matches, "STAMP"));

    let mut rng = rand::rngs::OsRng;
    let (blinded, factor) = blind(&mut rng, &stamp, &public).unwrap_or_else(|e| {
        eprintln!("blindballot blind: {}", e);
        std::process::exit(1);
    });

    println!("blinded: {}", biguint_to_hex(&blinded.0));
    println!("factor: {}", biguint_to_hex(factor.value()));
}

pub fn command_sign(matches: &clap::ArgMatches, config: &Config) {
    let secret_location = config.secret_path(matches);
    let authority: AuthorityKeyPair = load("sign", &secret_location);
    let blinded = BlindedStamp(hex_arg("sign", matches, "BLINDED"));

    let signature = authority.sign_blinded_stamp(&blinded);
    println!("{}", biguint_to_hex(&signature.0));
}

pub fn command_unblind(matches: &clap::ArgMatches) {
    let public = public_key("unblind", matches);
    let blinded_signature = BlindedSignature(hex_arg("unblind", matches, "BLINDED-SIGNATURE"));
    let factor = BlindingFactor::new(hex_arg("unblind", matches, "FACTOR"), &public.modulus)
        .unwrap_or_else(|e| {
            eprintln!("blindballot unblind: {}", e);
            std::process::exit(1);
        });

    let signature = unblind(&blinded_signature, &factor, &public.modulus);
    println!("{}", biguint_to_hex(&signature));
}

pub fn command_verify(matches: &clap::ArgMatches) {
    let public = public_key("verify", matches);
    let credential = Credential {
        stamp: Stamp(hex_arg("verify", matches, "STAMP")),
        signature: hex_arg("verify", matches, "SIGNATURE"),
    };

    if public.verify_credential(&credential) {
        println!("valid");
        std::process::exit(0);
    } else {
        println!("invalid");
        std::process::exit(1);
    }
}
