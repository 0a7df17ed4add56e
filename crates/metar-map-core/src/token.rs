// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use crate::category::FlightCategory;
use crate::geo::Coordinate;
use log::{debug, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Largest list the strip can display; entries past this are dropped.
pub const MAX_TOKENS: usize = 250;

const DELIMITERS: [char; 3] = [',', '\n', ';'];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    /// Exactly four ASCII alphanumerics, e.g. `KJFK` or `K1A5`.
    Airport(String),
    Skip,
    Legend(FlightCategory),
    /// Unrecognized text. Kept so later positions still line up with their LEDs.
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub position: usize,
    pub raw: String,
    pub kind: TokenKind,
    pub coordinate: Option<Coordinate>,
    pub resolved_category: Option<FlightCategory>,
}

impl Token {
    fn new(position: usize, raw: String) -> Self {
        let kind = classify_entry(&raw);
        Self {
            position,
            raw,
            kind,
            coordinate: None,
            resolved_category: None,
        }
    }

    pub fn identifier(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Airport(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_airport(&self) -> bool {
        matches!(self.kind, TokenKind::Airport(_))
    }
}

/// Ordered token records, one per LED. Rebuilt wholesale whenever the source
/// list changes; positions never move after classification.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TokenArena {
    tokens: Vec<Token>,
}

impl TokenArena {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Token> {
        self.tokens.get(position)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter()
    }

    pub fn airports(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter().filter(|t| t.is_airport())
    }

    pub fn airport_count(&self) -> usize {
        self.airports().count()
    }

    /// Identifiers of airport tokens matching `pred`, in position order.
    /// Repeated airports are listed once.
    pub fn airport_identifiers_where<P>(&self, pred: P) -> Vec<String>
    where
        P: Fn(&Token) -> bool,
    {
        let mut seen = std::collections::HashSet::new();
        self.airports()
            .filter(|t| pred(t))
            .filter_map(|t| t.identifier())
            .filter(|id| seen.insert(*id))
            .map(str::to_string)
            .collect()
    }

    pub fn clear_categories(&mut self) {
        for token in &mut self.tokens {
            token.resolved_category = None;
        }
    }

    /// Sets the coordinate on every airport token with this identifier.
    pub fn set_coordinate(&mut self, identifier: &str, coordinate: Coordinate) -> usize {
        self.update_airports(identifier, |t| t.coordinate = Some(coordinate))
    }

    /// Sets the live category on every airport token with this identifier.
    pub fn set_category(&mut self, identifier: &str, category: FlightCategory) -> usize {
        self.update_airports(identifier, |t| t.resolved_category = Some(category))
    }

    /// Copies cached coordinates onto tokens that do not have one yet.
    pub fn apply_coordinates(&mut self, cache: &HashMap<String, Coordinate>) -> usize {
        let mut applied = 0;
        for token in &mut self.tokens {
            if token.coordinate.is_some() {
                continue;
            }
            let cached = match &token.kind {
                TokenKind::Airport(id) => cache.get(id).copied(),
                _ => None,
            };
            if let Some(coordinate) = cached {
                token.coordinate = Some(coordinate);
                applied += 1;
            }
        }
        applied
    }

    fn update_airports<F>(&mut self, identifier: &str, mut apply: F) -> usize
    where
        F: FnMut(&mut Token),
    {
        let mut updated = 0;
        for token in &mut self.tokens {
            if token.identifier() == Some(identifier) {
                apply(token);
                updated += 1;
            }
        }
        updated
    }
}

/// Splits `source` on commas, newlines and semicolons and classifies each
/// non-empty entry. Never fails; malformed entries become `Invalid` tokens.
pub fn classify(source: &str) -> TokenArena {
    let mut tokens = Vec::new();
    let mut dropped = 0usize;

    for piece in source.split(&DELIMITERS[..]) {
        let entry = piece.trim();
        if entry.is_empty() {
            continue;
        }
        if tokens.len() == MAX_TOKENS {
            dropped += 1;
            continue;
        }
        tokens.push(Token::new(tokens.len(), entry.to_ascii_uppercase()));
    }

    if dropped > 0 {
        warn!(
            "Token list exceeds display capacity; extra entries ignored — max={} dropped={}",
            MAX_TOKENS, dropped
        );
    }

    let arena = TokenArena { tokens };
    debug!(
        "Classified token list — tokens={} airports={}",
        arena.len(),
        arena.airport_count()
    );
    arena
}

fn classify_entry(normalized: &str) -> TokenKind {
    if normalized == "SKIP" {
        return TokenKind::Skip;
    }
    if let Some(category) = FlightCategory::parse(normalized) {
        return TokenKind::Legend(category);
    }
    if is_airport_identifier(normalized) {
        return TokenKind::Airport(normalized.to_string());
    }
    TokenKind::Invalid
}

fn is_airport_identifier(text: &str) -> bool {
    static RE_IDENT: OnceLock<regex::Regex> = OnceLock::new();
    let re = RE_IDENT.get_or_init(|| regex::Regex::new(r"^[A-Z0-9]{4}$").unwrap());
    re.is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_mixed_list() {
        let arena = classify("KJFK,SKIP,VFR,KXYZ123");
        assert_eq!(arena.len(), 4);
        assert_eq!(arena.get(0).unwrap().kind, TokenKind::Airport("KJFK".into()));
        assert_eq!(arena.get(1).unwrap().kind, TokenKind::Skip);
        assert_eq!(
            arena.get(2).unwrap().kind,
            TokenKind::Legend(FlightCategory::Vfr)
        );
        assert_eq!(arena.get(3).unwrap().kind, TokenKind::Invalid);
        assert_eq!(arena.get(3).unwrap().raw, "KXYZ123");
    }

    #[test]
    fn test_classify_all_delimiters_and_case() {
        let arena = classify(" kbos ;\nk1a5\r\n mvfr,,skip;");
        let kinds: Vec<_> = arena.iter().map(|t| t.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Airport("KBOS".into()),
                TokenKind::Airport("K1A5".into()),
                TokenKind::Legend(FlightCategory::Mvfr),
                TokenKind::Skip,
            ]
        );
        for (i, token) in arena.iter().enumerate() {
            assert_eq!(token.position, i);
        }
    }

    #[test]
    fn test_non_alphanumeric_four_chars_is_invalid() {
        let arena = classify("KJ-K,ABC,K JFK");
        assert!(arena.iter().all(|t| t.kind == TokenKind::Invalid));
        assert_eq!(arena.get(2).unwrap().raw, "K JFK");
    }

    #[test]
    fn test_uppercasing_does_not_grow_entries() {
        // U+FB00 uppercases to "FF" under full Unicode rules.
        let arena = classify("k\u{FB00}k,kjfk");
        assert_eq!(arena.get(0).unwrap().kind, TokenKind::Invalid);
        assert_eq!(arena.get(0).unwrap().raw, "K\u{FB00}K");
        assert_eq!(arena.get(1).unwrap().kind, TokenKind::Airport("KJFK".into()));
    }

    #[test]
    fn test_classify_truncates_at_capacity() {
        let source = vec!["SKIP"; MAX_TOKENS + 17].join(",");
        let arena = classify(&source);
        assert_eq!(arena.len(), MAX_TOKENS);
        assert_eq!(arena.get(MAX_TOKENS - 1).unwrap().position, MAX_TOKENS - 1);
    }

    #[test]
    fn test_empty_source_yields_empty_arena() {
        assert!(classify("").is_empty());
        assert!(classify(" , ;\n\n").is_empty());
    }

    #[test]
    fn test_identifiers_are_deduplicated_in_order() {
        let arena = classify("KJFK,KLGA,KJFK,SKIP,KEWR");
        let ids = arena.airport_identifiers_where(|_| true);
        assert_eq!(ids, vec!["KJFK", "KLGA", "KEWR"]);
    }

    #[test]
    fn test_set_category_updates_every_duplicate() {
        let mut arena = classify("KJFK,VFR,KJFK");
        assert_eq!(arena.set_category("KJFK", FlightCategory::Ifr), 2);
        assert_eq!(arena.get(0).unwrap().resolved_category, Some(FlightCategory::Ifr));
        assert_eq!(arena.get(1).unwrap().resolved_category, None);
        assert_eq!(arena.get(2).unwrap().resolved_category, Some(FlightCategory::Ifr));

        arena.clear_categories();
        assert!(arena.iter().all(|t| t.resolved_category.is_none()));
    }

    #[test]
    fn test_apply_coordinates_from_cache() {
        let mut arena = classify("KJFK,KLGA,SKIP");
        let mut cache = HashMap::new();
        cache.insert("KLGA".to_string(), Coordinate::new(40.7769, -73.874));
        assert_eq!(arena.apply_coordinates(&cache), 1);
        assert!(arena.get(0).unwrap().coordinate.is_none());
        assert!(arena.get(1).unwrap().coordinate.is_some());
    }
}
