use colored::Colorize;
use tapsign_apdu_transport_pcsc::PcscConnector;

/// List all available readers
pub(crate) fn list_command(connector: &PcscConnector) -> anyhow::Result<()> {
    let readers = connector.list_readers()?;

    if readers.is_empty() {
        println!("No readers found!");
        return Ok(());
    }

    println!("Available readers:");
    for (i, reader) in readers.iter().enumerate() {
        let status = if reader.has_card() {
            "card present".green()
        } else {
            "no card".dimmed()
        };
        println!("{}. {} ({})", i + 1, reader.name(), status);
        if let Some(atr) = reader.atr() {
            println!("   ATR: {}", hex::encode_upper(atr));
        }
    }

    Ok(())
}
