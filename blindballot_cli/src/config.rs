use blindballot::DEFAULT_KEY_SIZE;

const SECRET_VAR: &str = "BLINDBALLOT_AUTHORITY_SECRET";
const KEYSIZE_VAR: &str = "BLINDBALLOT_KEYSIZE";

/// Settings taken from the environment, overridable per command by flags
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Where the authority secret key lives
    pub authority_secret: String,

    /// RSA modulus size for newly generated authority keys
    pub keysize: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            authority_secret: "./authority.json".to_string(),
            keysize: DEFAULT_KEY_SIZE,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut config = Config::default();

        if let Some(secret) = lookup(SECRET_VAR) {
            config.authority_secret = secret;
        }
        if let Some(keysize) = lookup(KEYSIZE_VAR) {
            config.keysize = keysize
                .parse()
                .map_err(|e| format!("invalid {} {:?}: {}", KEYSIZE_VAR, keysize, e))?;
        }

        Ok(config)
    }

    /// The secret key path, preferring the `--secret` flag
    pub fn secret_path(&self, matches: &clap::ArgMatches) -> String {
        crate::expand(matches.value_of("secret").unwrap_or(&self.authority_secret))
    }

    /// The key size, preferring the `--keysize` flag
    pub fn keysize(&self, matches: &clap::ArgMatches) -> Result<usize, String> {
        match matches.value_of("keysize") {
            Some(keysize) => keysize
                .parse()
                .map_err(|e| format!("invalid keysize {:?}: {}", keysize, e)),
            None => Ok(self.keysize),
        }
    }
}
