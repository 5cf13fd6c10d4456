use crate::{mail::sendmail::send_email, utils::currency::format_cents};

pub async fn send_order_confirmation_email(
    to_email: &str,
    order_reference: &str,
    amount_cents: i64,
) -> anyhow::Result<()> {
    let subject = "Your order payment was received";
    let template_path = "src/mail/templates/order-confirmation.html";
    let placeholders = vec![
        ("{{order_reference}}".to_string(), order_reference.to_string()),
        ("{{amount}}".to_string(), format_cents(amount_cents)),
    ];

    send_email(to_email, subject, template_path, &placeholders).await
}

pub async fn send_escrow_released_email(
    to_email: &str,
    order_reference: &str,
    net_amount_cents: i64,
) -> anyhow::Result<()> {
    let subject = "Funds released to your wallet";
    let template_path = "src/mail/templates/escrow-released.html";
    let placeholders = vec![
        ("{{order_reference}}".to_string(), order_reference.to_string()),
        ("{{net_amount}}".to_string(), format_cents(net_amount_cents)),
    ];

    send_email(to_email, subject, template_path, &placeholders).await
}

pub async fn send_withdrawal_completed_email(
    to_email: &str,
    reference: &str,
    net_amount_cents: i64,
) -> anyhow::Result<()> {
    let subject = "Your withdrawal has been paid out";
    let template_path = "src/mail/templates/withdrawal-completed.html";
    let placeholders = vec![
        ("{{reference}}".to_string(), reference.to_string()),
        ("{{net_amount}}".to_string(), format_cents(net_amount_cents)),
    ];

    send_email(to_email, subject, template_path, &placeholders).await
}
