//! Cálculo de importes
//!
//! Todos los importes se calculan con `rust_decimal` y se cuantizan a dos
//! decimales con redondeo half-up (MidpointAwayFromZero). El multiplicador
//! de multa por retraso es 1.5 y la tasa de cancelación tardía es la mitad
//! del precio base.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::payment::PaymentType;
use crate::models::rental::Rental;
use crate::utils::errors::AppError;

/// Multiplicador aplicado a la tarifa diaria en la multa por retraso
pub fn fine_multiplier() -> Decimal {
    Decimal::new(15, 1)
}

/// Fracción del precio base cobrada como tasa de cancelación tardía
pub fn cancellation_fee_factor() -> Decimal {
    Decimal::new(5, 1)
}

/// Cuantizar a dos decimales, half-up
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Precio base: días facturables por tarifa diaria
pub fn base_price(daily_rate: Decimal, rental_days: i64) -> Decimal {
    round_money(Decimal::from(rental_days) * daily_rate)
}

/// Días de retraso de una devolución (recortado a cero)
pub fn days_late(rental: &Rental) -> i64 {
    match rental.actual_return_date {
        Some(returned) => (returned - rental.end_date).num_days().max(0),
        None => 0,
    }
}

/// Importe a cobrar según el tipo de pago
///
/// OVERDUE_FEE exige que la devolución ya esté registrada.
pub fn calculate_amount(
    payment_type: PaymentType,
    rental: &Rental,
    daily_rate: Decimal,
) -> Result<Decimal, AppError> {
    let base = base_price(daily_rate, rental.rental_days());

    match payment_type {
        PaymentType::Rental => Ok(base),
        PaymentType::CancellationFee => Ok(round_money(base * cancellation_fee_factor())),
        PaymentType::OverdueFee => {
            if rental.actual_return_date.is_none() {
                return Err(AppError::InvalidState(
                    "Cannot calculate overdue fee without actual return date".to_string(),
                ));
            }
            let late = Decimal::from(days_late(rental));
            Ok(round_money(late * daily_rate * fine_multiplier()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    use crate::models::rental::RentalStatus;

    fn rental(start: &str, end: &str, returned: Option<&str>) -> Rental {
        Rental {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            car_id: Uuid::new_v4(),
            start_date: start.parse::<NaiveDate>().unwrap(),
            end_date: end.parse::<NaiveDate>().unwrap(),
            actual_return_date: returned.map(|d| d.parse().unwrap()),
            status: RentalStatus::Booked,
            created_at: Utc::now(),
        }
    }

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_rental_amount_three_days() {
        // 1..=3 de junio son tres días facturables a $100
        let r = rental("2025-06-01", "2025-06-03", None);
        let amount = calculate_amount(PaymentType::Rental, &r, dec("100.00")).unwrap();
        assert_eq!(amount, dec("300.00"));
    }

    #[test]
    fn test_cancellation_fee_is_half_of_base() {
        let r = rental("2025-06-01", "2025-06-03", None);
        let amount = calculate_amount(PaymentType::CancellationFee, &r, dec("100.00")).unwrap();
        assert_eq!(amount, dec("150.00"));
    }

    #[test]
    fn test_overdue_fee_one_day_late() {
        let r = rental("2025-06-01", "2025-06-03", Some("2025-06-04"));
        let amount = calculate_amount(PaymentType::OverdueFee, &r, dec("100.00")).unwrap();
        assert_eq!(amount, dec("150.00"));
    }

    #[test]
    fn test_overdue_fee_early_return_is_zero() {
        let r = rental("2025-06-01", "2025-06-03", Some("2025-06-02"));
        let amount = calculate_amount(PaymentType::OverdueFee, &r, dec("100.00")).unwrap();
        assert_eq!(amount, Decimal::ZERO);
    }

    #[test]
    fn test_overdue_fee_requires_return_date() {
        let r = rental("2025-06-01", "2025-06-03", None);
        let result = calculate_amount(PaymentType::OverdueFee, &r, dec("100.00"));
        assert!(matches!(result, Err(AppError::InvalidState(_))));
    }

    #[test]
    fn test_rounding_is_half_up() {
        // 0.25 de tarifa un día: tasa de cancelación 0.125 -> 0.13
        let r = rental("2025-06-01", "2025-06-01", None);
        let amount = calculate_amount(PaymentType::CancellationFee, &r, dec("0.25")).unwrap();
        assert_eq!(amount, dec("0.13"));
    }
}
