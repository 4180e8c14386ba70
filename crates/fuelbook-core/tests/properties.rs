use proptest::prelude::*;

use fuelbook_core::{
    calculate_volume, detect_discrepancy, CalibrationPoint, FuelProduct, TankConfig,
    TankDimensions, TankShape, MAX_DIP_CM,
};

fn hsd_tank() -> TankConfig {
    TankConfig::new(
        "HSD Tank 1",
        FuelProduct::Diesel,
        20_000.0,
        TankShape::HorizontalCylinder,
        TankDimensions::cylinder(2.0, 6.718),
    )
}

/// Ascending chart with non-decreasing volumes, ending below the 2 m dipstick.
fn chart_strategy() -> impl Strategy<Value = Vec<CalibrationPoint>> {
    prop::collection::vec((1u32..20, 0u32..600), 2..20).prop_map(|steps| {
        let mut dip = 0.0;
        let mut volume = 0.0;
        steps
            .into_iter()
            .map(|(dip_step, volume_step)| {
                dip += f64::from(dip_step) * 5.0;
                volume += f64::from(volume_step);
                CalibrationPoint::new(dip, volume)
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn formula_volume_is_monotonic_in_dip(a in 0.0f64..=MAX_DIP_CM, b in 0.0f64..=MAX_DIP_CM) {
        let tank = hsd_tank();
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let v_low = calculate_volume(&tank, low).unwrap().volume_liters;
        let v_high = calculate_volume(&tank, high).unwrap().volume_liters;
        prop_assert!(v_low <= v_high, "{low} -> {v_low}, {high} -> {v_high}");
    }

    #[test]
    fn volume_stays_within_capacity(dip in 0.0f64..=MAX_DIP_CM, capacity in 500.0f64..40_000.0) {
        let mut tank = hsd_tank();
        tank.capacity_liters = capacity;
        let result = calculate_volume(&tank, dip).unwrap();
        prop_assert!(result.volume_liters >= 0.0);
        prop_assert!(result.volume_liters <= capacity);
        prop_assert!(result.remaining_percentage <= 100);
    }

    #[test]
    fn percentage_matches_rounded_ratio(dip in 0.0f64..=MAX_DIP_CM) {
        let result = calculate_volume(&hsd_tank(), dip).unwrap();
        let expected = (result.volume_liters / result.capacity_liters * 100.0).round() as u8;
        prop_assert_eq!(result.remaining_percentage, expected);
    }

    #[test]
    fn chart_entries_are_returned_exactly(chart in chart_strategy(), pick in any::<prop::sample::Index>()) {
        let capacity = chart.last().map(|p| p.volume_liters).unwrap_or(0.0) + 1_000.0;
        let entry = *pick.get(&chart);
        let mut tank = hsd_tank().with_calibration_table(chart);
        tank.capacity_liters = capacity;

        let result = calculate_volume(&tank, entry.dip_mm / 10.0).unwrap();
        prop_assert_eq!(result.volume_liters, entry.volume_liters.round());
    }

    #[test]
    fn chart_interpolation_is_monotonic(chart in chart_strategy(), a in 0.0f64..=MAX_DIP_CM, b in 0.0f64..=MAX_DIP_CM) {
        let capacity = chart.last().map(|p| p.volume_liters).unwrap_or(0.0) + 1_000.0;
        let mut tank = hsd_tank().with_calibration_table(chart);
        tank.capacity_liters = capacity;

        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let v_low = calculate_volume(&tank, low).unwrap().volume_liters;
        let v_high = calculate_volume(&tank, high).unwrap().volume_liters;
        prop_assert!(v_low <= v_high);
    }

    #[test]
    fn matching_stock_is_never_a_discrepancy(stock in 0.0f64..40_000.0, capacity in 1.0f64..40_000.0) {
        prop_assert!(detect_discrepancy(stock, stock, capacity).unwrap().is_none());
    }

    #[test]
    fn detection_is_deterministic(
        expected in 0.0f64..40_000.0,
        actual in 0.0f64..40_000.0,
        capacity in 1.0f64..40_000.0,
    ) {
        let first = detect_discrepancy(expected, actual, capacity).unwrap();
        let second = detect_discrepancy(expected, actual, capacity).unwrap();
        prop_assert_eq!(&first, &second);

        if let Some(d) = first {
            prop_assert!((d.difference.abs()) > 5.0);
            prop_assert_eq!(d.difference, actual - expected);
        }
    }
}
