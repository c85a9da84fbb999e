use anyhow::{bail, Result};

use crate::config::generate_secret;

const SECRET_VARIABLE: &str = "CASHBOOK__AUTH__JWT_SECRET";
const MIN_LENGTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretFormat {
    Plain,
    Env,
    Export,
}

fn render(secret: &str, format: SecretFormat) -> String {
    match format {
        SecretFormat::Plain => secret.to_string(),
        SecretFormat::Env => format!("{}={}", SECRET_VARIABLE, secret),
        SecretFormat::Export => format!("export {}='{}'", SECRET_VARIABLE, secret),
    }
}

/// Prints a fresh signing secret to stdout.
pub fn generate_secret_key(length: usize, format: SecretFormat) -> Result<()> {
    if length < MIN_LENGTH {
        bail!("Secret length must be at least {} characters", MIN_LENGTH);
    }
    println!("{}", render(&generate_secret(length), format));
    Ok(())
}
