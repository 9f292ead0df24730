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

//! History stack behaviour across nested and sibling evaluations

use pretty_assertions::assert_eq;
use remapper::{EvaluationContext, compile};
use rstest::rstest;
use serde_json::{Map, Value, json};

fn eval(definition: Value, data: Value) -> Value {
    compile(&definition).unwrap().evaluate(&data, &Map::new()).unwrap()
}

#[test]
fn test_nested_map_references_outer_element() {
    // each inner element is paired with the outer element it came from
    let definition = json!({"array.map": {"array.map": {"array.from": [
        {"prop": []},
        {"history": 0}
    ]}}});
    assert_eq!(
        eval(definition, json!([[1, 2], [3, 4]])),
        json!([
            [[1, [1, 2]], [2, [1, 2]]],
            [[3, [3, 4]], [4, [3, 4]]]
        ])
    );
}

#[test]
fn test_history_reaches_past_inner_pushes() {
    let definition = json!({"array.map": {"pipe": [
        {"prop": "children"},
        {"array.map": {"object.from": {
            "child": {"prop": "name"},
            "parent": {"pipe": [{"history": 2}, {"prop": "name"}]}
        }}}
    ]}});
    let data = json!([
        {"name": "a", "children": [{"name": "a1"}, {"name": "a2"}]},
        {"name": "b", "children": [{"name": "b1"}]}
    ]);
    assert_eq!(
        eval(definition, data),
        json!([
            [{"child": "a1", "parent": "a"}, {"child": "a2", "parent": "a"}],
            [{"child": "b1", "parent": "b"}]
        ])
    );
}

#[rstest]
#[case::array_map(json!({"array.map": {"history": 0}}))]
#[case::array_filter(json!({"array.filter": {"history": 0}}))]
#[case::pipe(json!({"pipe": [{"history": 0}]}))]
#[case::root(json!({"root": {"history": 0}}))]
fn test_siblings_see_the_same_history(#[case] inner: Value) {
    let definition = json!({"first": inner, "second": {"history": 0}, "third": {"history": 1}});
    let result = eval(definition, json!([1]));
    assert_eq!(result["second"], json!(null));
    assert_eq!(result["third"], json!(null));
}

#[test]
fn test_history_restored_after_failed_evaluation() {
    let mapper = compile(&json!({"array.map": {"string.case": "upper"}})).unwrap();
    let data = json!(["ok", 1]);
    let variables = Map::new();
    let mut ctx = EvaluationContext::new(&data, &variables);

    assert!(mapper.evaluate_with(&data, &mut ctx).is_err());
    assert_eq!(ctx.history_len(), 0);

    let data = json!(["a", "b"]);
    let mut ctx = EvaluationContext::new(&data, &variables);
    assert_eq!(mapper.evaluate_with(&data, &mut ctx).unwrap(), json!(["A", "B"]));
    assert_eq!(ctx.history_len(), 0);
}
