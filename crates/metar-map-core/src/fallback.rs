// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use crate::category::FlightCategory;
use crate::token::TokenArena;
use log::debug;
use serde::Serialize;

/// Maximum distance over which an airport may borrow a neighbor's category.
pub const FALLBACK_RADIUS_NM: f64 = 75.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum ResolutionSource {
    Live,
    /// Borrowed from the airport token at position `from`.
    Inherited { from: usize, distance_nm: f64 },
}

/// Category an airport token is displayed with for the current cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Resolution {
    pub category: FlightCategory,
    pub source: ResolutionSource,
}

impl Resolution {
    pub fn is_inherited(&self) -> bool {
        matches!(self.source, ResolutionSource::Inherited { .. })
    }
}

/// Computes the display category of every token, indexed by position.
///
/// Airports with live data keep it. An airport without live data but with a
/// known coordinate takes the category of the nearest other airport that has
/// live data and lies within `radius_nm`; on equal distances the earlier
/// position wins. Only live categories are donated, and nothing here is
/// written back to the arena.
pub fn resolve_effective(arena: &TokenArena, radius_nm: f64) -> Vec<Option<Resolution>> {
    arena
        .iter()
        .map(|token| {
            if !token.is_airport() {
                return None;
            }
            if let Some(category) = token.resolved_category {
                return Some(Resolution {
                    category,
                    source: ResolutionSource::Live,
                });
            }
            let here = token.coordinate?;

            let mut best: Option<(usize, f64, FlightCategory)> = None;
            for donor in arena.airports() {
                if donor.position == token.position {
                    continue;
                }
                let (Some(there), Some(category)) = (donor.coordinate, donor.resolved_category)
                else {
                    continue;
                };
                let distance = here.distance_nm(&there);
                if distance > radius_nm {
                    continue;
                }
                if best.map_or(true, |(_, d, _)| distance < d) {
                    best = Some((donor.position, distance, category));
                }
            }

            let (from, distance_nm, category) = best?;
            debug!(
                "Inherited category from neighbor — token={} from={} distance_nm={:.1} category={}",
                token.raw, from, distance_nm, category
            );
            Some(Resolution {
                category,
                source: ResolutionSource::Inherited { from, distance_nm },
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinate;
    use crate::token::classify;

    /// Degrees of latitude per nautical mile, close enough for test layouts.
    const DEG_PER_NM: f64 = 1.0 / 60.04;

    fn north_of_origin(nm: f64) -> Coordinate {
        Coordinate::new(nm * DEG_PER_NM, 0.0)
    }

    #[test]
    fn test_nearest_candidate_wins() {
        let mut arena = classify("AAAA,BBBB,CCCC");
        arena.set_coordinate("AAAA", north_of_origin(0.0));
        arena.set_coordinate("BBBB", north_of_origin(30.0));
        arena.set_coordinate("CCCC", north_of_origin(10.0));
        arena.set_category("BBBB", FlightCategory::Ifr);
        arena.set_category("CCCC", FlightCategory::Mvfr);

        let eff = resolve_effective(&arena, FALLBACK_RADIUS_NM);
        let a = eff[0].unwrap();
        assert_eq!(a.category, FlightCategory::Mvfr);
        match a.source {
            ResolutionSource::Inherited { from, distance_nm } => {
                assert_eq!(from, 2);
                assert!((distance_nm - 10.0).abs() < 0.1);
            }
            ResolutionSource::Live => panic!("expected inherited"),
        }
        assert_eq!(eff[1].unwrap().source, ResolutionSource::Live);
    }

    #[test]
    fn test_tie_keeps_earliest_position() {
        let mut arena = classify("AAAA,BBBB,CCCC");
        arena.set_coordinate("AAAA", Coordinate::new(0.0, 0.0));
        arena.set_coordinate("BBBB", Coordinate::new(0.5, 0.0));
        arena.set_coordinate("CCCC", Coordinate::new(-0.5, 0.0));
        arena.set_category("BBBB", FlightCategory::Lifr);
        arena.set_category("CCCC", FlightCategory::Vfr);

        let eff = resolve_effective(&arena, FALLBACK_RADIUS_NM);
        assert_eq!(eff[0].unwrap().category, FlightCategory::Lifr);
    }

    #[test]
    fn test_out_of_radius_candidates_are_ignored() {
        let mut arena = classify("AAAA,BBBB");
        arena.set_coordinate("AAAA", north_of_origin(0.0));
        arena.set_coordinate("BBBB", north_of_origin(76.0));
        arena.set_category("BBBB", FlightCategory::Vfr);

        let eff = resolve_effective(&arena, FALLBACK_RADIUS_NM);
        assert!(eff[0].is_none());
    }

    #[test]
    fn test_candidate_exactly_at_radius_is_used() {
        let here = north_of_origin(0.0);
        let there = north_of_origin(75.0);
        let mut arena = classify("AAAA,BBBB");
        arena.set_coordinate("AAAA", here);
        arena.set_coordinate("BBBB", there);
        arena.set_category("BBBB", FlightCategory::Mvfr);

        let radius = here.distance_nm(&there);
        let eff = resolve_effective(&arena, radius);
        assert_eq!(eff[0].unwrap().category, FlightCategory::Mvfr);
        assert!(resolve_effective(&arena, radius - 0.001)[0].is_none());
    }

    #[test]
    fn test_no_coordinate_no_fallback() {
        let mut arena = classify("AAAA,BBBB");
        arena.set_coordinate("BBBB", north_of_origin(1.0));
        arena.set_category("BBBB", FlightCategory::Vfr);
        assert!(resolve_effective(&arena, FALLBACK_RADIUS_NM)[0].is_none());
    }

    #[test]
    fn test_inherited_categories_do_not_chain() {
        // CCCC is within range of BBBB only; BBBB only inherits, so CCCC gets nothing.
        let mut arena = classify("AAAA,BBBB,CCCC");
        arena.set_coordinate("AAAA", north_of_origin(0.0));
        arena.set_coordinate("BBBB", north_of_origin(60.0));
        arena.set_coordinate("CCCC", north_of_origin(120.0));
        arena.set_category("AAAA", FlightCategory::Ifr);

        let eff = resolve_effective(&arena, FALLBACK_RADIUS_NM);
        assert_eq!(eff[1].unwrap().category, FlightCategory::Ifr);
        assert!(eff[2].is_none());
        assert!(arena.get(1).unwrap().resolved_category.is_none());
    }

    #[test]
    fn test_non_airports_have_no_resolution() {
        let arena = classify("SKIP,VFR,JUNK!");
        assert!(resolve_effective(&arena, FALLBACK_RADIUS_NM)
            .iter()
            .all(Option::is_none));
    }
}
