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

//! Tests for array operators

use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{Map, Value, json};

use crate::compile;
use crate::core::{RemapperError, Result};

fn remap(definition: Value, data: Value) -> Result<Value> {
    compile(&definition)?.evaluate(&data, &Map::new())
}

#[test]
fn test_map_with_string_case() {
    let result = remap(
        json!({"array.map": {"string.case": {"case": "upper", "value": {"prop": "name"}}}}),
        json!([{"name": "ada"}, {"name": "grace"}]),
    )
    .unwrap();
    assert_eq!(result, json!(["ADA", "GRACE"]));
}

#[test]
fn test_map_empty_array() {
    assert_eq!(remap(json!({"array.map": {"prop": "x"}}), json!([])).unwrap(), json!([]));
}

#[rstest]
#[case("array.map")]
#[case("array.filter")]
#[case("array.find")]
#[case("array.unique")]
#[case("array.append")]
#[case("array.omit")]
fn test_non_array_input_is_type_mismatch(#[case] operator: &str) {
    let argument = match operator {
        "array.append" | "array.omit" => json!([]),
        "array.unique" => Value::Null,
        _ => json!({"prop": "x"}),
    };
    let mut definition = Map::new();
    definition.insert(operator.to_string(), argument);

    let err = remap(Value::Object(definition), json!({"x": 1})).unwrap_err();
    assert_eq!(err, RemapperError::type_mismatch(operator, "array", &json!({})));
}

#[test]
fn test_nested_map_sees_outer_element_in_history() {
    // inner iteration: history 0 is the inner array (the outer element),
    // history 1 is the whole outer array
    let definition = json!({"array.map": {"array.map": {"array.from": [
        {"history": 0},
        {"history": 1},
        {"prop": []}
    ]}}});
    let data = json!([[1, 2], [3, 4]]);
    let result = remap(definition, data.clone()).unwrap();
    assert_eq!(
        result,
        json!([
            [[[1, 2], data, 1], [[1, 2], data, 2]],
            [[[3, 4], data, 3], [[3, 4], data, 4]]
        ])
    );
}

#[test]
fn test_history_out_of_range_is_null() {
    let result = remap(json!({"array.map": {"history": 5}}), json!([1])).unwrap();
    assert_eq!(result, json!([null]));
    assert_eq!(remap(json!({"history": 0}), json!(1)).unwrap(), json!(null));
}

#[test]
fn test_filter_and_find() {
    let data = json!([
        {"id": 1, "active": true},
        {"id": 2, "active": false},
        {"id": 3, "active": true}
    ]);
    assert_eq!(
        remap(json!({"array.filter": {"prop": "active"}}), data.clone()).unwrap(),
        json!([{"id": 1, "active": true}, {"id": 3, "active": true}])
    );
    assert_eq!(
        remap(json!({"array.find": {"equals": [{"prop": "id"}, 2]}}), data.clone()).unwrap(),
        json!({"id": 2, "active": false})
    );
    assert_eq!(
        remap(json!({"array.find": {"equals": [{"prop": "id"}, 9]}}), data).unwrap(),
        json!(null)
    );
}

#[test]
fn test_unique_first_occurrence_wins() {
    assert_eq!(
        remap(json!({"array.unique": null}), json!([1, {"a": [1]}, 1.0, 2, {"a": [1]}])).unwrap(),
        json!([1, {"a": [1]}, 2])
    );
    assert_eq!(
        remap(
            json!({"array.unique": {"prop": "k"}}),
            json!([{"k": "a", "n": 1}, {"k": "b", "n": 2}, {"k": "a", "n": 3}])
        )
        .unwrap(),
        json!([{"k": "a", "n": 1}, {"k": "b", "n": 2}])
    );
}

#[test]
fn test_from_append_omit() {
    assert_eq!(
        remap(json!({"array.from": [{"prop": "a"}, "x", [1]]}), json!({"a": 0})).unwrap(),
        json!([0, "x", [1]])
    );
    assert_eq!(
        remap(
            json!({"array.append": [{"root": {"prop": "extra"}}]}),
            json!({"extra": 9})
        )
        .unwrap_err(),
        RemapperError::type_mismatch("array.append", "array", &json!({}))
    );
    assert_eq!(
        remap(json!({"pipe": [{"prop": "items"}, {"array.append": [{"root": {"prop": "extra"}}]}]}),
            json!({"items": [1, 2], "extra": 3}))
        .unwrap(),
        json!([1, 2, 3])
    );
    assert_eq!(
        remap(json!({"array.omit": [0, -1, 10]}), json!(["a", "b", "c", "d"])).unwrap(),
        json!(["b", "c"])
    );
    let err = remap(json!({"array.omit": ["x"]}), json!([1])).unwrap_err();
    assert!(matches!(err, RemapperError::TypeMismatch { .. }));
}

#[test]
fn test_sibling_iterations_do_not_leak_history() {
    let definition = json!({
        "first": {"pipe": [{"prop": "a"}, {"array.map": {"history": 0}}]},
        "second": {"history": 0}
    });
    let result = remap(definition, json!({"a": [1]})).unwrap();
    assert_eq!(result, json!({"first": [[1]], "second": null}));
}
