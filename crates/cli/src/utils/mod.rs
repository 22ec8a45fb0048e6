//! Helpers shared by the subcommands

use std::io::{self, BufRead, Write};

use anyhow::{Context, bail};
use k256::PublicKey;
use tapsign_signer::Pin;
use zeroize::Zeroizing;

/// Install the tracing subscriber
///
/// `RUST_LOG` takes precedence; otherwise `--verbose` selects `trace` and the
/// default is `info`.
pub(crate) fn setup_logging(verbose: bool) {
    let default = if verbose { "trace" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(true)
        .init();
}

/// Read the PIN from standard input
pub(crate) fn prompt_pin() -> anyhow::Result<Pin> {
    eprint!("PIN: ");
    io::stderr().flush()?;

    let mut line = Zeroizing::new(String::new());
    io::stdin().lock().read_line(&mut line)?;
    let pin = line.trim_end_matches(['\r', '\n']);
    if pin.is_empty() {
        bail!("No PIN entered");
    }
    Ok(Pin::from(pin))
}

/// Hold a secret command-line value in a buffer wiped on drop
pub(crate) fn parse_secret(value: &str) -> anyhow::Result<Zeroizing<String>> {
    if value.is_empty() {
        bail!("value must not be empty");
    }
    Ok(Zeroizing::new(value.to_owned()))
}

/// Parse a hex SEC1-encoded secp256k1 public key
pub(crate) fn parse_public_key(key: &str) -> anyhow::Result<PublicKey> {
    let bytes = hex::decode(key.trim_start_matches("0x")).context("Trusted key is not hex")?;
    PublicKey::from_sec1_bytes(&bytes).context("Trusted key is not a secp256k1 point")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_public_key() {
        let compressed = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";
        assert!(parse_public_key(compressed).is_ok());
        assert!(parse_public_key(&format!("0x{compressed}")).is_ok());
        assert!(parse_public_key("zz").is_err());
        assert!(parse_public_key("0200").is_err());
    }

    #[test]
    fn test_parse_secret() {
        let pin = parse_secret("1234").unwrap();
        assert_eq!(pin.as_str(), "1234");
        assert!(parse_secret("").is_err());
    }
}
