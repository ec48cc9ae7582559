//! WHERE clause construction from a filter set and one source's column names.
//!
//! Filter values only ever travel as bound parameters. The fragment text is
//! assembled from `?` placeholders and the `&'static str` column names of a
//! [`SourceFields`], so nothing a caller types can reach the SQL text.

use crate::query::dates::{Boundary, format_timestamp, normalize};
use crate::query::filter::FilterSet;
use crate::query::sources::SourceFields;

/// Conjunctive predicates plus their positional parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WhereClause {
    predicates: Vec<String>,
    params: Vec<String>,
}

impl WhereClause {
    /// Predicates joined with `AND`, without the `WHERE` keyword.
    #[must_use]
    pub fn fragment(&self) -> String {
        self.predicates.join(" AND ")
    }

    /// Ready-to-splice clause: `WHERE ...`, or empty when nothing applies.
    #[must_use]
    pub fn sql(&self) -> String {
        if self.predicates.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.fragment())
        }
    }

    /// Parameters in placeholder order.
    #[must_use]
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Take the parameters, in placeholder order.
    #[must_use]
    pub fn into_params(self) -> Vec<String> {
        self.params
    }

    /// True when no predicate applies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    fn push(&mut self, predicate: String, param: String) {
        self.predicates.push(predicate);
        self.params.push(param);
    }
}

/// Build the WHERE clause for one source table.
///
/// Emits, in order and only when the value is present: address substring,
/// timestamp lower bound, timestamp upper bound, detail substring. Dates that
/// fail to parse are dropped (see [`normalize`]).
#[must_use]
pub fn build(filter: &FilterSet, fields: &SourceFields) -> WhereClause {
    let mut clause = WhereClause::default();

    if let Some(address) = filter.address() {
        clause.push(format!("{} LIKE ?", fields.address), contains(address));
    }
    if let Some(start) = normalize(filter.date_start(), Boundary::Start) {
        clause.push(format!("{} >= ?", fields.timestamp), format_timestamp(&start));
    }
    if let Some(end) = normalize(filter.date_end(), Boundary::End) {
        clause.push(format!("{} <= ?", fields.timestamp), format_timestamp(&end));
    }
    if let Some(keyword) = filter.keyword() {
        clause.push(format!("{} LIKE ?", fields.detail), contains(keyword));
    }

    clause
}

fn contains(value: &str) -> String {
    format!("%{value}%")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::sources::SOURCE_TABLES;
    use proptest::prelude::*;

    const ERROR_FIELDS: SourceFields = SourceFields {
        address: "client_address",
        timestamp: "timestamp",
        detail: "message",
    };

    #[test]
    fn empty_filter_yields_empty_clause() {
        for spec in &SOURCE_TABLES {
            let clause = build(&FilterSet::default(), &spec.fields);
            assert!(clause.is_empty());
            assert_eq!(clause.fragment(), "");
            assert_eq!(clause.sql(), "");
            assert!(clause.params().is_empty());
        }
    }

    #[test]
    fn full_filter_emits_four_predicates_in_order() {
        let filter = FilterSet::builder()
            .service("Apache")
            .address("10.0.0.")
            .date_start("2024-01-01")
            .date_end("2024-01-31")
            .keyword("error")
            .build();
        let clause = build(&filter, &ERROR_FIELDS);
        assert_eq!(
            clause.sql(),
            "WHERE client_address LIKE ? AND timestamp >= ? AND timestamp <= ? AND message LIKE ?"
        );
        assert_eq!(
            clause.params(),
            [
                "%10.0.0.%",
                "2024-01-01 00:00:00",
                "2024-01-31 23:59:59",
                "%error%"
            ]
        );
    }

    #[test]
    fn single_predicate_has_no_dangling_and() {
        let filter = FilterSet::builder().keyword("STOR").build();
        let clause = build(&filter, &SOURCE_TABLES[2].fields);
        assert_eq!(clause.sql(), "WHERE details LIKE ?");
        assert_eq!(clause.params(), ["%STOR%"]);
    }

    #[test]
    fn malformed_date_drops_only_that_predicate() {
        let filter = FilterSet::builder()
            .date_start("01/01/2024")
            .date_end("2024-01-02T09:15")
            .build();
        let clause = build(&filter, &SOURCE_TABLES[0].fields);
        assert_eq!(clause.fragment(), "timestamp <= ?");
        assert_eq!(clause.params(), ["2024-01-02 09:15:59"]);
    }

    #[test]
    fn hostile_values_stay_in_params() {
        let filter = FilterSet::builder()
            .address("' OR 1=1 --")
            .keyword("x'); DROP TABLE access_log; --")
            .build();
        let clause = build(&filter, &SOURCE_TABLES[0].fields);
        assert_eq!(clause.fragment(), "address LIKE ? AND path LIKE ?");
        assert!(clause.params()[1].contains("DROP TABLE"));
    }

    proptest! {
        #[test]
        fn fragment_never_embeds_values(
            address in proptest::option::of("[a-zA-Z0-9.' %_-]{1,16}"),
            keyword in proptest::option::of("[a-zA-Z0-9.' %_-]{1,16}"),
            start in proptest::option::of("2024-0[1-9]-1[0-9]"),
            table in 0usize..3,
        ) {
            let mut builder = FilterSet::builder();
            if let Some(a) = &address { builder = builder.address(a); }
            if let Some(k) = &keyword { builder = builder.keyword(k); }
            if let Some(s) = &start { builder = builder.date_start(s); }
            let filter = builder.build();

            let clause = build(&filter, &SOURCE_TABLES[table].fields);
            let fragment = clause.fragment();

            prop_assert_eq!(fragment.matches('?').count(), clause.params().len());
            prop_assert!(!fragment.contains('\''));
            prop_assert!(!fragment.contains('%'));
            let stripped = fragment
                .replace("LIKE", "")
                .replace("AND", "")
                .replace(SOURCE_TABLES[table].fields.address, "")
                .replace(SOURCE_TABLES[table].fields.detail, "")
                .replace(SOURCE_TABLES[table].fields.timestamp, "");
            prop_assert!(stripped.chars().all(|c| matches!(c, ' ' | '?' | '>' | '<' | '=')));
        }
    }
}
