use sqlcode_testkit::{TestResult, load_cases_from_str, run_parse_case};

const CASES: &str = r#"
simple_function:
  sql: |
    create function [code].Add(@a int) returns int as begin return @a end
  creates: ["[Add]"]

constants_and_creates:
  sql: |
    declare @EnumA int = 1;
    go
    create procedure [code].P as select @EnumA
  declares: ["declare @EnumA int = 1;"]
  creates: ["[P]"]

dependencies_resolve_in_order:
  sql: |
    create procedure [code].A as exec [code].B
    go
    create procedure [code].B as select 1
  creates: ["[B]", "[A]"]
  deps:
    "[A]": ["[B]"]
    "[B]": []

two_procedures_in_one_batch:
  sql: |
    create procedure [code].A as select 1
    create procedure [code].B as select 2
  creates: ["[A]"]
  errors: ["must be alone in a batch"]

postgres_allows_adjacent_functions:
  dialect: postgres
  sql: |
    create function [code].F() returns int as $$ select 1 $$ language sql;
    create function [code].G() returns int as $$ select 2 $$ language sql;
  creates: ["[F]", "[G]"]
"#;

#[test]
fn the_yaml_cases_all_pass() {
    let cases = load_cases_from_str(CASES).expect("cases must deserialize");
    assert_eq!(cases.len(), 5);
    for (name, case) in &cases {
        match run_parse_case(case) {
            TestResult::Passed => {}
            TestResult::Failed(reason) => panic!("case {name} failed: {reason}"),
        }
    }
}

#[test]
fn failures_carry_a_reason() {
    let yaml = r#"
wrong_name:
  sql: |
    create procedure [code].Actual as select 1
  creates: ["[Expected]"]
"#;
    let cases = load_cases_from_str(yaml).expect("cases must deserialize");
    let case = cases.get("wrong_name").expect("case must exist");
    match run_parse_case(case) {
        TestResult::Failed(reason) => assert!(reason.contains("creates mismatch")),
        TestResult::Passed => panic!("mismatched expectation must fail"),
    }
}

#[test]
fn unknown_case_fields_are_rejected() {
    let yaml = "bad:\n  sql: select 1\n  unexpected: true\n";
    assert!(load_cases_from_str(yaml).is_err());
}
