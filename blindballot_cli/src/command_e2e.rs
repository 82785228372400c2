use crate::config::Config;
use blindballot::*;
use rand::Rng;

pub fn command_e2e(matches: &clap::ArgMatches, config: &Config) {
    let num_voters = count_arg(matches, "voters");
    let num_candidates = count_arg(matches, "candidates");
    let keysize = config.keysize(matches).unwrap_or_else(|e| {
        eprintln!("blindballot e2e: {}", e);
        std::process::exit(1);
    });
    if num_candidates == 0 {
        eprintln!("blindballot e2e: at least one candidate is required");
        std::process::exit(1);
    }

    match run_election(num_voters, num_candidates, keysize) {
        Ok(results) => {
            println!("> Election completed OK");
            println!("Tally:");
            for (candidate, votes) in results.totals.iter() {
                println!("  candidate {} got {} votes", candidate, votes);
            }
            println!("Total votes: {}", results.num_votes);
        }
        Err(e) => {
            eprintln!("blindballot e2e: {}", e);
            std::process::exit(1);
        }
    }
}

fn count_arg(matches: &clap::ArgMatches, name: &str) -> u64 {
    // Both have defaults
    let value = matches.value_of(name).unwrap_or_default();
    value.parse().unwrap_or_else(|e| {
        eprintln!("blindballot e2e: invalid --{} {}: {}", name, value, e);
        std::process::exit(1);
    })
}

fn run_election(num_voters: u64, num_candidates: u64, keysize: usize) -> Result<TallyResult, Error> {
    let mut rng = rand::rngs::OsRng;

    info!("generating {} bit authority key", keysize);
    let authority = AuthorityKeyPair::generate(&mut rng, keysize)?;
    let public = authority.public_key();

    let mut relay = LocalRelay::new(Address::from_hash(&[b"blindballot.e2e-relay"]));
    let mut ledger = AuthorityLedger::setup(relay.address(), public.clone())?;
    let authority_address = ledger.address()?;

    let mut sponsor = Sponsor::new(
        Address::from_hash(&[b"blindballot.e2e-sponsor"]),
        authority_address,
    );
    sponsor.deposit_to(num_voters as u128 * 2 + num_candidates as u128);

    let send_as_authority = |ledger: &mut AuthorityLedger,
                             relay: &mut LocalRelay,
                             call: Call|
     -> Result<Receipt, Error> {
        let nonce = relay.next_nonce(&authority_address);
        let mut op = RelayedOperation::new(authority_address, nonce, call)
            .sponsored_by(sponsor.address());
        sign_as_authority(&authority, &mut op)?;
        relay.handle(ledger, Some(&sponsor), op)
    };

    for i in 0..num_candidates {
        let info = format!("Candidate {}", i).into_bytes();
        send_as_authority(&mut ledger, &mut relay, Call::ListCandidate(NewCandidate { info }))?;
    }

    for _ in 0..num_voters {
        // Voter side: stamp and blind
        let (secret, voting_key) = generate_keypair_with(&mut rng);
        let address = voter_address(&voting_key);
        let request = CredentialRequest::new(&mut rng, &address, &public)?;

        // Authority side: sign without seeing the stamp
        let blinded_signature = authority.sign_blinded_stamp(&request.blinded);

        // Voter side: unblind
        let credential = request.finalize(&blinded_signature, &public)?;

        let receipt = send_as_authority(
            &mut ledger,
            &mut relay,
            Call::SubmitVotingKey(VotingKeySubmission {
                voting_key,
                credential,
            }),
        )?;
        let account = match receipt {
            Receipt::VoterRegistered { account, .. } => account,
            _ => return Err(Error::UnknownAccount(address)),
        };

        let candidate_id = rng.gen_range(0, num_candidates);
        let mut op = RelayedOperation::new(
            account,
            relay.next_nonce(&account),
            Call::SubmitVote(VoteSubmission { candidate_id }),
        )
        .sponsored_by(sponsor.address());
        sign_as_voter(&secret, &mut op);
        relay.handle(&mut ledger, Some(&sponsor), op)?;
    }

    ledger.results()
}
