//! Notificaciones por Telegram
//!
//! Los eventos de negocio generan mensajes HTML que se encolan en un
//! canal mpsc; un worker en background los envía al chat del admin vía
//! Bot API. Encolar nunca bloquea ni falla la request que lo origina.

use tokio::sync::mpsc;

use crate::config::environment::EnvironmentConfig;
use crate::models::car::Car;
use crate::models::payment::Payment;
use crate::models::rental::Rental;

const MAX_SEND_ATTEMPTS: u32 = 3;

/// Handle barato de clonar para encolar notificaciones
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<String>,
}

impl Notifier {
    /// Encolar un mensaje; si el worker murió solo se deja constancia en el log
    pub fn send(&self, text: String) {
        if self.tx.send(text).is_err() {
            log::warn!("⚠️ Worker de notificaciones caído, mensaje descartado");
        }
    }
}

/// Arrancar el worker de envío y devolver el handle para encolar
///
/// Sin credenciales de Telegram configuradas el worker consume la cola
/// y descarta los mensajes (útil en desarrollo y tests).
pub fn spawn_telegram_worker(config: &EnvironmentConfig) -> Notifier {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let credentials = config
        .telegram_bot_token
        .clone()
        .zip(config.telegram_admin_chat_id.clone());

    tokio::spawn(async move {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        while let Some(text) = rx.recv().await {
            match &credentials {
                Some((token, chat_id)) => {
                    send_with_retries(&client, token, chat_id, &text).await;
                }
                None => {
                    log::debug!("📭 Telegram no configurado, notificación descartada");
                }
            }
        }
    });

    Notifier { tx }
}

async fn send_with_retries(client: &reqwest::Client, token: &str, chat_id: &str, text: &str) {
    let url = format!("https://api.telegram.org/bot{}/sendMessage", token);

    for attempt in 1..=MAX_SEND_ATTEMPTS {
        let result = client
            .post(&url)
            .form(&[
                ("chat_id", chat_id),
                ("text", text),
                ("parse_mode", "HTML"),
            ])
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                log::info!("📨 Notificación enviada");
                return;
            }
            Ok(response) => {
                log::warn!(
                    "⚠️ Telegram respondió {} (intento {}/{})",
                    response.status(),
                    attempt,
                    MAX_SEND_ATTEMPTS
                );
            }
            Err(e) => {
                log::warn!(
                    "⚠️ Error enviando a Telegram (intento {}/{}): {}",
                    attempt,
                    MAX_SEND_ATTEMPTS,
                    e
                );
            }
        }

        if attempt < MAX_SEND_ATTEMPTS {
            tokio::time::sleep(std::time::Duration::from_secs(2 * attempt as u64)).await;
        }
    }

    log::error!("❌ Notificación descartada tras {} intentos", MAX_SEND_ATTEMPTS);
}

// Constructores de mensajes. HTML plano con el mismo formato que envía
// el bot: título en negrita y una línea por campo.

pub fn message_new_rental(rental: &Rental, car: &Car, user_email: &str) -> String {
    format!(
        "🚗 <b>New Rental Created</b>\n\
         User: {}\n\
         Car: {}\n\
         Period: {} → {}\n\
         Status: {}",
        user_email,
        car.display_name(),
        rental.start_date,
        rental.end_date,
        rental.status
    )
}

pub fn message_returned_rental(rental: &Rental, car: &Car, user_email: &str) -> String {
    let returned_at = rental
        .actual_return_date
        .map(|d| d.to_string())
        .unwrap_or_else(|| "-".to_string());

    format!(
        "✅ <b>Rental Returned</b>\n\
         User: {}\n\
         Car: {}\n\
         Returned at: {}\n\
         Status: {}",
        user_email,
        car.display_name(),
        returned_at,
        rental.status
    )
}

pub fn message_cancelled_rental(rental: &Rental, car: &Car, user_email: &str) -> String {
    format!(
        "❌ <b>Rental Cancelled</b>\n\
         User: {}\n\
         Car: {}\n\
         Period: {} → {}",
        user_email,
        car.display_name(),
        rental.start_date,
        rental.end_date
    )
}

pub fn message_overdue_rental(rental: &Rental, car: &Car, user_email: &str, days_late: i64) -> String {
    format!(
        "⏰ <b>Rental Overdue</b>\n\
         User: {}\n\
         Car: {}\n\
         End date: {}\n\
         Days late: {}",
        user_email,
        car.display_name(),
        rental.end_date,
        days_late
    )
}

pub fn message_successful_payment(payment: &Payment, car: &Car, user_email: &str) -> String {
    format!(
        "💰 <b>Payment Successful</b>\n\
         User: {}\n\
         Car: {}\n\
         Type: {}\n\
         Amount: ${}",
        user_email,
        car.display_name(),
        payment.payment_type,
        payment.money_to_pay
    )
}

pub fn message_expired_payment(payment: &Payment, car: &Car, user_email: &str) -> String {
    format!(
        "⚠️ <b>Payment Expired</b>\n\
         User: {}\n\
         Car: {}\n\
         Type: {}\n\
         Amount: ${}",
        user_email,
        car.display_name(),
        payment.payment_type,
        payment.money_to_pay
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    use crate::models::car::FuelType;
    use crate::models::payment::{PaymentStatus, PaymentType};
    use crate::models::rental::RentalStatus;

    fn car() -> Car {
        Car {
            id: Uuid::new_v4(),
            brand: "BMW".to_string(),
            model: "X5".to_string(),
            year: 2023,
            fuel_type: FuelType::Gas,
            daily_rate: "100.00".parse().unwrap(),
            inventory: 2,
            image_url: None,
            created_at: Utc::now(),
        }
    }

    fn rental() -> Rental {
        Rental {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            car_id: Uuid::new_v4(),
            start_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 6, 3).unwrap(),
            actual_return_date: None,
            status: RentalStatus::Booked,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_new_rental_message() {
        let message = message_new_rental(&rental(), &car(), "user@example.com");

        assert!(message.starts_with("🚗 <b>New Rental Created</b>"));
        assert!(message.contains("User: user@example.com"));
        assert!(message.contains("Car: BMW X5 (2023)"));
        assert!(message.contains("Period: 2025-06-01 → 2025-06-03"));
    }

    #[test]
    fn test_overdue_message_includes_days_late() {
        let message = message_overdue_rental(&rental(), &car(), "user@example.com", 2);

        assert!(message.starts_with("⏰ <b>Rental Overdue</b>"));
        assert!(message.contains("Days late: 2"));
    }

    #[test]
    fn test_payment_message_includes_type_and_amount() {
        let payment = Payment {
            id: Uuid::new_v4(),
            rental_id: Uuid::new_v4(),
            status: PaymentStatus::Paid,
            payment_type: PaymentType::OverdueFee,
            session_id: "cs_test_1".to_string(),
            session_url: "https://checkout.stripe.com/c/pay/cs_test_1".to_string(),
            money_to_pay: "150.00".parse().unwrap(),
            created_at: Utc::now(),
        };

        let message = message_successful_payment(&payment, &car(), "user@example.com");

        assert!(message.starts_with("💰 <b>Payment Successful</b>"));
        assert!(message.contains("Type: OVERDUE_FEE"));
        assert!(message.contains("Amount: $150.00"));
    }
}
