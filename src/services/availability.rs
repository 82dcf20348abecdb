//! Cálculo de disponibilidad
//!
//! Un coche tiene `inventory` unidades físicas; las unidades libres para
//! un rango son inventario menos reservas BOOKED que lo solapan, nunca
//! por debajo de cero.

/// Unidades libres, recortadas a cero si hay sobre-reserva histórica
pub fn available_units(inventory: i64, overlapping_booked: i64) -> i64 {
    (inventory - overlapping_booked).max(0)
}

/// ¿Queda al menos una unidad libre para el rango?
pub fn has_availability(inventory: i64, overlapping_booked: i64) -> bool {
    available_units(inventory, overlapping_booked) > 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_units() {
        assert_eq!(available_units(3, 0), 3);
        assert_eq!(available_units(3, 2), 1);
        assert_eq!(available_units(3, 3), 0);
    }

    #[test]
    fn test_available_units_clamps_at_zero() {
        // Inventario reducido por debajo de las reservas existentes
        assert_eq!(available_units(1, 4), 0);
    }

    #[test]
    fn test_has_availability() {
        assert!(has_availability(2, 1));
        assert!(!has_availability(2, 2));
    }
}
