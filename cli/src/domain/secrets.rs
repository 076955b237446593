//! Per-run secret generation.
//!
//! Every value comes straight from the operating system CSPRNG. Nothing here
//! is derived from time, counters or the domain name.

use rand::Rng;
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;

/// Alphanumeric database password length (~238 bits).
pub const DB_PASSWORD_LEN: usize = 40;

/// Alphanumeric admin password length (~142 bits).
pub const ADMIN_PASSWORD_LEN: usize = 24;

/// Length of each `wp-config.php` key/salt.
pub const SALT_LEN: usize = 64;

/// `wp-config.php` secret slots. Each one gets its own random value.
pub const SALT_SLOTS: [&str; 8] = [
    "AUTH_KEY",
    "SECURE_AUTH_KEY",
    "LOGGED_IN_KEY",
    "NONCE_KEY",
    "AUTH_SALT",
    "SECURE_AUTH_SALT",
    "LOGGED_IN_SALT",
    "NONCE_SALT",
];

/// Salt alphabet: printable ASCII minus `'`, `\` and whitespace so values
/// survive a PHP single-quoted literal inside a quoted here-document.
const SALT_CHARSET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!#$%&()*+,-./:;<=>?@[]^_`{|}~";

/// A generated secret. `Debug` never shows the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Random alphanumeric password of `len` characters.
#[must_use]
pub fn generate_password(len: usize) -> Secret {
    Secret(
        OsRng
            .sample_iter(&Alphanumeric)
            .take(len)
            .map(char::from)
            .collect(),
    )
}

fn generate_salt() -> Secret {
    Secret(
        (0..SALT_LEN)
            .map(|_| char::from(SALT_CHARSET[OsRng.gen_range(0..SALT_CHARSET.len())]))
            .collect(),
    )
}

/// The eight independent `wp-config.php` keys and salts.
#[derive(Debug, Clone)]
pub struct SaltSet {
    values: Vec<Secret>,
}

impl SaltSet {
    #[must_use]
    pub fn generate() -> Self {
        Self {
            values: SALT_SLOTS.iter().map(|_| generate_salt()).collect(),
        }
    }

    /// `(slot, value)` pairs in `SALT_SLOTS` order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        SALT_SLOTS
            .iter()
            .copied()
            .zip(self.values.iter().map(Secret::expose))
    }
}
