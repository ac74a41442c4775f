use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};

/// Length of the password-reset token. 48 alphanumeric characters is well
/// past the 128-bit entropy floor.
const RESET_TOKEN_LEN: usize = 48;

/// 6-digit numeric email-verification code.
pub fn verification_code() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}

/// Opaque password-reset token drawn from the OS entropy source.
pub fn reset_token() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(RESET_TOKEN_LEN)
        .map(char::from)
        .collect()
}
