use crate::models::TransactionWrapper;
use crate::session::WalletSession;
use crate::utils::{format_millis, Table};

pub const USAGE: &str = "list | refresh | approve <tx_id> | deny <tx_id> | cancel <tx_id>";

/// Render the active device's transactions as a table
pub fn render_transactions(transactions: &[TransactionWrapper]) -> String {
    if transactions.is_empty() {
        return "No transactions".to_string();
    }

    let mut table = Table::new(&["ID", "Status", "Asset", "Amount", "Created"]);
    for wrapper in transactions {
        let tx = &wrapper.transaction;
        let status = if wrapper.just_approved {
            format!("{} *", tx.status)
        } else {
            tx.status.to_string()
        };
        table.add_row(vec![
            tx.id.clone(),
            status,
            tx.asset_id.clone().unwrap_or_else(|| "-".to_string()),
            tx.amount.clone().unwrap_or_else(|| "-".to_string()),
            format_millis(tx.created_at),
        ]);
    }
    table.render()
}

pub async fn execute(session: &WalletSession, command: &str, args: &[&str]) -> Result<String, String> {
    match command {
        "list" => Ok(render_transactions(&session.manager().get_transactions())),
        "refresh" => {
            let fetched = session
                .refresh_transactions()
                .await
                .map_err(|e| e.to_string())?;
            Ok(format!("Fetched {} transaction(s)", fetched))
        }
        "approve" | "deny" | "cancel" => {
            let tx_id = args
                .first()
                .ok_or_else(|| format!("Usage: {} <tx_id>", command))?;

            match command {
                "approve" => {
                    let outcome = session
                        .approve_transaction(tx_id)
                        .await
                        .map_err(|e| e.to_string())?;
                    Ok(format!(
                        "Transaction {} is {} ({} check(s))",
                        tx_id,
                        outcome.wrapper.status(),
                        outcome.attempts
                    ))
                }
                "deny" => {
                    let outcome = session
                        .deny_transaction(tx_id)
                        .await
                        .map_err(|e| e.to_string())?;
                    Ok(format!("Transaction {} is {}", tx_id, outcome.wrapper.status()))
                }
                _ => {
                    session
                        .cancel_transaction(tx_id)
                        .await
                        .map_err(|e| e.to_string())?;
                    Ok(format!("Cancel requested for {}", tx_id))
                }
            }
        }
        _ => Err(format!("Unknown transaction command. Use: {}", USAGE)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::wallet::TransactionStatus;
    use crate::testing::tx;

    #[test]
    fn test_render_marks_just_approved() {
        let mut approved = TransactionWrapper::new("d1", tx("a", TransactionStatus::Completed, 0));
        approved.just_approved = true;
        let pending = TransactionWrapper::new("d1", tx("b", TransactionStatus::PendingSignature, 0));

        let rendered = render_transactions(&[approved, pending]);
        assert!(rendered.contains("COMPLETED *"));
        assert!(rendered.contains("PENDING_SIGNATURE"));
        assert!(rendered.contains("1970-01-01 00:00:00"));
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render_transactions(&[]), "No transactions");
    }
}
