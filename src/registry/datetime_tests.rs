// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Tests for date operators and duration arithmetic

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::compile;
    use crate::core::{RemapperError, Result};
    use crate::evaluator::EvaluationContext;
    use chrono::{NaiveDate, TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::{Map, Value, json};

    fn remap(definition: Value, data: Value) -> Result<Value> {
        compile(&definition)?.evaluate(&data, &Map::new())
    }

    #[test]
    fn test_datetime_operators_registration() {
        let registry = OperatorRegistry::standard();
        for name in ["date.now", "date.add", "date.format", "date.parse"] {
            let definition = registry
                .get(name)
                .unwrap_or_else(|| panic!("operator '{name}' should be registered"));
            assert_eq!(definition.metadata.category, OperatorCategory::DateTime);
            assert!(!definition.metadata.description.is_empty());
        }
    }

    #[test]
    fn test_now_uses_pinned_clock() {
        let mapper = compile(&json!({"object.from": {"at": {"date.now": null}}})).unwrap();
        let data = json!(null);
        let vars = Map::new();
        let pinned = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        let mut ctx = EvaluationContext::new(&data, &vars).with_now(pinned);

        let result = mapper.evaluate_with(&data, &mut ctx).unwrap();
        assert_eq!(result, json!({"at": "2024-03-01T12:30:00.000Z"}));
    }

    #[rstest]
    #[case("P1D", DateDuration { days: 1, ..Default::default() })]
    #[case("P1Y2M3DT4H5M6S", DateDuration { years: 1, months: 2, days: 3, hours: 4, minutes: 5, seconds: 6, ..Default::default() })]
    #[case("P2W", DateDuration { weeks: 2, ..Default::default() })]
    #[case("PT90M", DateDuration { minutes: 90, ..Default::default() })]
    #[case("-P1M", DateDuration { months: -1, ..Default::default() })]
    fn test_parse_iso8601(#[case] input: &str, #[case] expected: DateDuration) {
        assert_eq!(DateDuration::parse_iso8601(input).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("1D")]
    #[case("P")]
    #[case("PT")]
    #[case("P1H")]
    #[case("PT1D")]
    #[case("P1")]
    #[case("P1.5D")]
    fn test_parse_iso8601_rejects(#[case] input: &str) {
        assert!(DateDuration::parse_iso8601(input).is_err(), "{input} should be rejected");
    }

    #[rstest]
    #[case(json!("P1M"), "2024-01-31", "2024-02-29")]
    #[case(json!("P1M"), "2023-01-31", "2023-02-28")]
    #[case(json!("P1Y"), "2024-02-29", "2025-02-28")]
    #[case(json!("-P1M"), "2024-03-31", "2024-02-29")]
    #[case(json!("P1M1D"), "2024-01-31", "2024-03-01")]
    #[case(json!({"days": 1}), "2024-02-28", "2024-02-29")]
    #[case(json!({"weeks": -1}), "2024-01-03", "2023-12-27")]
    fn test_add_to_dates(#[case] duration: Value, #[case] input: &str, #[case] expected: &str) {
        let result = remap(json!({"date.add": duration}), json!(input)).unwrap();
        assert_eq!(result, json!(expected));
    }

    #[rstest]
    #[case(json!("PT1H"), json!("2024-01-31"), "2024-01-31T01:00:00.000Z")]
    #[case(json!("PT36H"), json!("2024-02-28T12:00:00Z"), "2024-03-01T00:00:00.000Z")]
    #[case(json!("P1M"), json!("2024-01-31T10:00:00+02:00"), "2024-02-29T10:00:00.000+02:00")]
    #[case(json!({"minutes": -30}), json!("2024-01-01T00:10:00.250Z"), "2023-12-31T23:40:00.250Z")]
    #[case(json!("P1D"), json!(0), "1970-01-02T00:00:00.000Z")]
    fn test_add_to_datetimes(
        #[case] duration: Value,
        #[case] input: Value,
        #[case] expected: &str,
    ) {
        let result = remap(json!({"date.add": duration}), input).unwrap();
        assert_eq!(result, json!(expected));
    }

    #[test]
    fn test_add_rejects_bad_arguments_and_data() {
        for argument in [
            json!("1 day"),
            json!({"days": 1.5}),
            json!({}),
            json!({"duration": "P1D", "days": 1}),
        ] {
            let err = compile(&json!({"date.add": argument})).unwrap_err();
            assert!(matches!(err, RemapperError::MalformedArgument { .. }), "{err}");
        }

        let err = remap(json!({"date.add": "P1D"}), json!("yesterday")).unwrap_err();
        assert!(matches!(err, RemapperError::InvalidDate { .. }));
        let err = remap(json!({"date.add": "P1D"}), json!(true)).unwrap_err();
        assert!(matches!(err, RemapperError::TypeMismatch { .. }));
        let err = remap(json!({"date.add": {"years": 1000000}}), json!("2024-01-01")).unwrap_err();
        assert!(matches!(err, RemapperError::InvalidDate { .. }));
    }

    #[test]
    fn test_format() {
        assert_eq!(
            remap(json!({"date.format": "%d/%m/%Y"}), json!("2024-02-29")).unwrap(),
            json!("29/02/2024")
        );
        assert_eq!(
            remap(
                json!({"date.format": "%Y-%m-%d %H:%M"}),
                json!("2024-02-29T08:05:00+01:00")
            )
            .unwrap(),
            json!("2024-02-29 08:05")
        );
        assert_eq!(
            remap(json!({"date.format": null}), json!("2024-02-29")).unwrap(),
            json!("2024-02-29T00:00:00.000Z")
        );
        let err = compile(&json!({"date.format": "%Q"})).unwrap_err();
        assert!(matches!(err, RemapperError::MalformedArgument { .. }));
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            remap(json!({"date.parse": "%d/%m/%Y"}), json!("29/02/2024")).unwrap(),
            json!("2024-02-29")
        );
        assert_eq!(
            remap(json!({"date.parse": "%d/%m/%Y %H:%M"}), json!("29/02/2024 13:45")).unwrap(),
            json!("2024-02-29T13:45:00.000Z")
        );
        assert_eq!(
            remap(json!({"date.parse": null}), json!("2024-02-29T13:45:00+00:00")).unwrap(),
            json!("2024-02-29T13:45:00.000Z")
        );
        let err = remap(json!({"date.parse": "%d/%m/%Y"}), json!("30/02/2024")).unwrap_err();
        assert!(matches!(err, RemapperError::InvalidDate { .. }));
        let err = remap(json!({"date.parse": null}), json!(17)).unwrap_err();
        assert!(matches!(err, RemapperError::TypeMismatch { .. }));
    }

    #[test]
    fn test_month_clamping_on_leap_years() {
        let feb_end = DateDuration { months: 1, ..Default::default() }
            .apply(ParsedDate::Date(NaiveDate::from_ymd_opt(2000, 1, 30).unwrap()))
            .unwrap();
        assert_eq!(feb_end, ParsedDate::Date(NaiveDate::from_ymd_opt(2000, 2, 29).unwrap()));

        let feb_end = DateDuration { months: 1, ..Default::default() }
            .apply(ParsedDate::Date(NaiveDate::from_ymd_opt(1900, 1, 30).unwrap()))
            .unwrap();
        assert_eq!(feb_end, ParsedDate::Date(NaiveDate::from_ymd_opt(1900, 2, 28).unwrap()));
    }
}
