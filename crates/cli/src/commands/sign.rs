use std::time::Duration;

use anyhow::Context;
use clap::Args;
use colored::Colorize;
use tapsign_apdu_core::TransportConfig;
use tapsign_apdu_transport_pcsc::{ConnectStrategy, PcscConnector};
use tapsign_card::SessionConfig;
use tapsign_signer::{Pin, Signer, SignerConfig};
use tracing::info;
use zeroize::Zeroizing;

use crate::utils;

/// Arguments of `tapsign sign`
#[derive(Args, Debug)]
pub(crate) struct SignArgs {
    /// Message to sign
    #[arg(required = true)]
    message: String,

    /// Reader to use (first reader with a card if not given)
    #[arg(short, long)]
    reader: Option<String>,

    /// PIN code (prompted for if not given)
    #[arg(long, value_parser = utils::parse_secret)]
    pin: Option<Zeroizing<String>>,

    /// On-card key slot
    #[arg(long, default_value_t = 0)]
    key_index: u8,

    /// Seconds to wait for each card response
    #[arg(long, default_value_t = 120)]
    timeout_secs: u64,

    /// Accept only cards with this authentication key (hex SEC1 point, repeatable)
    #[arg(long = "trusted-key", value_name = "HEX")]
    trusted_keys: Vec<String>,

    /// Abort if the card cannot report its status
    #[arg(long)]
    require_status: bool,
}

impl SignArgs {
    fn signer_config(&self) -> anyhow::Result<SignerConfig> {
        let mut session = SessionConfig::default()
            .with_key_index(self.key_index)
            .with_require_status(self.require_status);
        for key in &self.trusted_keys {
            session = session.with_trusted_card_key(utils::parse_public_key(key)?);
        }

        let transport = TransportConfig::default()
            .with_response_timeout(Duration::from_secs(self.timeout_secs));

        Ok(SignerConfig::default()
            .with_transport(transport)
            .with_session(session))
    }

    fn strategy(&self) -> ConnectStrategy {
        match &self.reader {
            Some(name) => ConnectStrategy::Reader(name.clone()),
            None => ConnectStrategy::AnyCard,
        }
    }
}

/// Sign a message and print the artifact
pub(crate) fn sign_command(mut connector: PcscConnector, mut args: SignArgs) -> anyhow::Result<()> {
    let signer = Signer::new(args.signer_config()?);
    // The argument copy is wiped as soon as the PIN is built
    let pin = match args.pin.take() {
        Some(pin) => Pin::from(pin.as_str()),
        None => utils::prompt_pin().context("Failed to read PIN")?,
    };

    info!(message = %args.message, "Hold the card on the reader");
    match signer.sign(&mut connector, args.strategy(), &args.message, pin) {
        Ok(artifact) => {
            println!("{}", artifact);
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e.user_message());
            Err(e.into())
        }
    }
}
