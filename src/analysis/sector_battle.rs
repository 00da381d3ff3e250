use std::collections::HashMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use super::minisectors::MiniSector;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorResult {
    pub lap_number: u32,
    pub minisector_index: u8,
    pub fastest_driver_id: String,
}

/// How the two drivers' mini-sectors are matched before comparing them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum SectorPairing {
    /// Zip both drivers' records by position in (lap, mini-sector) order,
    /// truncated to the shorter list. A gap in either list shifts every later
    /// pair, so records with different mini-sectors can end up compared.
    #[default]
    Positional,
    /// Compare only records that share lap and mini-sector.
    IndexJoin,
}

/// Pick the faster driver for each paired mini-sector.
///
/// Driver 1 wins only with a strictly higher average speed, ties go to
/// driver 2. Results carry driver 1's lap and mini-sector.
pub fn resolve_sector_battle(
    minisectors: &[MiniSector],
    driver1: &str,
    driver2: &str,
    pairing: SectorPairing,
) -> Vec<SectorResult> {
    let driver_records = |driver: &str| {
        minisectors
            .iter()
            .filter(|m| m.driver_id == driver)
            .sorted_by_key(|m| (m.lap_number, m.index))
            .collect_vec()
    };
    let d1 = driver_records(driver1);
    let d2 = driver_records(driver2);

    let pairs: Vec<(&MiniSector, &MiniSector)> = match pairing {
        SectorPairing::Positional => d1.into_iter().zip(d2).collect(),
        SectorPairing::IndexJoin => {
            let d2_by_sector: HashMap<(u32, u8), &MiniSector> = d2
                .into_iter()
                .map(|m| ((m.lap_number, m.index), m))
                .collect();
            d1.into_iter()
                .filter_map(|s1| {
                    d2_by_sector
                        .get(&(s1.lap_number, s1.index))
                        .map(|s2| (s1, *s2))
                })
                .collect()
        }
    };

    pairs
        .into_iter()
        .map(|(s1, s2)| SectorResult {
            lap_number: s1.lap_number,
            minisector_index: s1.index,
            fastest_driver_id: if s1.avg_speed > s2.avg_speed {
                driver1.to_string()
            } else {
                driver2.to_string()
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn minisector(driver: &str, lap_number: u32, index: u8, avg_speed: f64) -> MiniSector {
        MiniSector {
            index,
            lap_number,
            driver_id: driver.to_string(),
            avg_speed,
        }
    }

    #[test]
    fn test_faster_driver_wins_each_sector() {
        let minisectors = vec![
            minisector("VER", 1, 1, 210.),
            minisector("HAM", 1, 1, 200.),
            minisector("VER", 1, 2, 180.),
            minisector("HAM", 1, 2, 190.),
        ];
        let results =
            resolve_sector_battle(&minisectors, "VER", "HAM", SectorPairing::Positional);
        assert_eq!(
            results,
            vec![
                SectorResult {
                    lap_number: 1,
                    minisector_index: 1,
                    fastest_driver_id: "VER".to_string()
                },
                SectorResult {
                    lap_number: 1,
                    minisector_index: 2,
                    fastest_driver_id: "HAM".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_tie_goes_to_second_driver() {
        let minisectors = vec![minisector("VER", 4, 7, 250.), minisector("HAM", 4, 7, 250.)];
        for pairing in [SectorPairing::Positional, SectorPairing::IndexJoin] {
            let results = resolve_sector_battle(&minisectors, "VER", "HAM", pairing);
            assert_eq!(results.len(), 1);
            assert_eq!(results[0].fastest_driver_id, "HAM");
        }
        let swapped = resolve_sector_battle(&minisectors, "HAM", "VER", SectorPairing::Positional);
        assert_eq!(swapped[0].fastest_driver_id, "VER");
    }

    #[test]
    fn test_positional_pairing_misaligns_after_gap() {
        // VER has no record for sector 1, so its sector 2 is compared against HAM's sector 1
        let minisectors = vec![
            minisector("HAM", 1, 1, 100.),
            minisector("VER", 1, 2, 150.),
            minisector("HAM", 1, 2, 200.),
            minisector("VER", 1, 3, 150.),
            minisector("HAM", 1, 3, 120.),
        ];
        let positional =
            resolve_sector_battle(&minisectors, "VER", "HAM", SectorPairing::Positional);
        assert_eq!(
            positional
                .iter()
                .map(|r| (r.minisector_index, r.fastest_driver_id.as_str()))
                .collect_vec(),
            vec![(2, "VER"), (3, "HAM")]
        );

        let joined = resolve_sector_battle(&minisectors, "VER", "HAM", SectorPairing::IndexJoin);
        assert_eq!(
            joined
                .iter()
                .map(|r| (r.minisector_index, r.fastest_driver_id.as_str()))
                .collect_vec(),
            vec![(2, "HAM"), (3, "VER")]
        );
    }

    #[test]
    fn test_missing_driver_yields_no_results() {
        let minisectors = vec![minisector("VER", 1, 1, 210.)];
        assert!(
            resolve_sector_battle(&minisectors, "VER", "HAM", SectorPairing::Positional)
                .is_empty()
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_positional_output_is_truncated_to_shorter_driver(
            d1_sectors in prop::collection::btree_set(1u8..=25, 0..25),
            d2_sectors in prop::collection::btree_set(1u8..=25, 0..25),
            speed in 100.0f64..300.0,
        ) {
            let minisectors = d1_sectors
                .iter()
                .map(|i| minisector("VER", 10, *i, speed))
                .chain(d2_sectors.iter().map(|i| minisector("HAM", 10, *i, speed + 1.)))
                .collect_vec();
            let results = resolve_sector_battle(&minisectors, "VER", "HAM", SectorPairing::Positional);
            prop_assert_eq!(results.len(), d1_sectors.len().min(d2_sectors.len()));
            prop_assert!(results.iter().all(|r| r.fastest_driver_id == "HAM"));

            let joined = resolve_sector_battle(&minisectors, "VER", "HAM", SectorPairing::IndexJoin);
            prop_assert_eq!(joined.len(), d1_sectors.intersection(&d2_sectors).count());
        }
    }
}
