use crate::session::WalletSession;

pub const USAGE: &str = "send <asset_id> <amount> <address> | fee <asset_id> <amount> <address>";

fn parse_args<'a>(args: &[&'a str]) -> Result<(&'a str, &'a str, &'a str), String> {
    match args {
        [asset_id, amount, address] => {
            amount
                .parse::<f64>()
                .ok()
                .filter(|a| *a > 0.0)
                .ok_or_else(|| format!("Invalid amount '{}'", amount))?;
            Ok((*asset_id, *amount, *address))
        }
        _ => Err(format!("Usage: {}", USAGE)),
    }
}

pub async fn execute(session: &WalletSession, command: &str, args: &[&str]) -> Result<String, String> {
    let (asset_id, amount, address) = parse_args(args)?;

    if command == "fee" {
        let estimate = session
            .estimate_send_fee(asset_id, amount, address)
            .await
            .map_err(|e| e.to_string())?;
        let fee = |f: &Option<String>| f.clone().unwrap_or_else(|| "-".to_string());
        return Ok(format!(
            "Network fee  low: {}  medium: {}  high: {}",
            fee(&estimate.low.network_fee),
            fee(&estimate.medium.network_fee),
            fee(&estimate.high.network_fee)
        ));
    }

    let response = session
        .send_to_address(asset_id, amount, address)
        .await
        .map_err(|e| e.to_string())?;
    Ok(format!(
        "Created transaction {} ({})",
        response.id, response.status
    ))
}
