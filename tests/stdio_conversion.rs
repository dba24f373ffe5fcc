use tabconv::pipeline::{ConversionRequest, Converter};
use tabconv::registry::{Registry, Stdio};
use tabconv::ConvertError;

const PEOPLE_CSV: &str = "id,name,date\n1,George,2023\n2,Steven,1950\n3,Rachel,1995";
const PEOPLE_TSV: &str = "id\tname\tdate\n1\tGeorge\t2023\n2\tSteven\t1950\n3\tRachel\t1995\n";

/// Run one conversion with `input` as stdin and return what was written to stdout.
fn convert(request: &ConversionRequest, input: &str) -> Result<String, ConvertError> {
    let registry = Registry::with_default_adapters().unwrap();
    let mut inp = input.as_bytes();
    let mut out: Vec<u8> = Vec::new();
    Converter::new(&registry).convert_with_stdio(request, &mut Stdio::new(&mut inp, &mut out))?;
    Ok(String::from_utf8(out).unwrap())
}

fn req(source: &str, destination: &str) -> ConversionRequest {
    ConversionRequest::new(source, destination).unwrap()
}

#[test]
fn csv_to_tsv_without_query() {
    let out = convert(&req("csv:-", "tsv:-"), PEOPLE_CSV).unwrap();
    assert_eq!(out, PEOPLE_TSV);
}

#[test]
fn tsv_count_query_to_json() {
    let request = req("tsv:-", "json:-").with_query("SELECT COUNT(*) AS count FROM data");
    let out = convert(&request, PEOPLE_TSV).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed, serde_json::json!([{"count": 3}]));
}

#[test]
fn list_to_json_records() {
    let out = convert(&req("list:-", "json:-"), "a\nb\nc").unwrap();
    assert_eq!(out.trim_end(), r#"[{"value":"a"},{"value":"b"},{"value":"c"}]"#);
}

#[test]
fn list_to_csa_and_back_to_list() {
    assert_eq!(convert(&req("list:-", "csa:-"), "a\nb\nc").unwrap(), "a,b,c");
    assert_eq!(convert(&req("csa:-", "list:-"), "a,b,c").unwrap(), "a\nb\nc");
    assert_eq!(convert(&req("jsonarray:-", "list:-"), r#"["a","b","c"]"#).unwrap(), "a\nb\nc");
}

#[test]
fn query_projection_to_single_column_format() {
    let request = req("csv:-", "csa:-").with_query("SELECT name from data");
    assert_eq!(convert(&request, PEOPLE_CSV).unwrap(), "George,Steven,Rachel");
}

#[test]
fn query_then_filter_both_run_against_data() {
    let request = req("csv:-", "csv:-")
        .with_query("SELECT * FROM data ORDER BY id ASC")
        .with_filter("SELECT COUNT(*) as zzzz FROM data WHERE name != 'Steven'");
    assert_eq!(convert(&request, PEOPLE_CSV).unwrap(), "zzzz\n2\n");
}

#[test]
fn filter_alone_runs_after_load() {
    let request = req("csv:-", "csv:-").with_filter("SELECT name FROM data WHERE date < 2000 ORDER BY date");
    assert_eq!(convert(&request, PEOPLE_CSV).unwrap(), "name\nSteven\nRachel\n");
}

#[test]
fn integers_survive_csv_round_trip_as_integers() {
    let request = req("csv:-", "jsonarray:-").with_query("SELECT id FROM data");
    assert_eq!(convert(&request, PEOPLE_CSV).unwrap(), "[1,2,3]\n");
}

#[test]
fn zero_row_query_result_is_not_an_error() {
    let request = req("csv:-", "csv:-").with_query("SELECT * FROM data WHERE id > 100");
    assert_eq!(convert(&request, PEOPLE_CSV).unwrap(), "id,name,date\n");
}

#[test]
fn empty_stdin_is_an_empty_source() {
    let err = convert(&req("csv:-", "json:-"), "").unwrap_err();
    assert!(err.is_empty_source(), "{err:?}");
    assert!(err.to_string().contains("empty"));
}

#[test]
fn header_only_input_is_an_empty_source() {
    let err = convert(&req("csv:-", "json:-"), "id,name\n").unwrap_err();
    assert!(err.is_empty_source(), "{err:?}");
}

#[test]
fn bad_query_is_a_query_syntax_error() {
    let request = req("csv:-", "json:-").with_query("SELEC * FROM data");
    let err = convert(&request, PEOPLE_CSV).unwrap_err();
    assert!(matches!(err, ConvertError::QuerySyntax(_)), "{err:?}");
    assert!(err.to_string().contains("SELEC * FROM data"));
}

#[test]
fn unknown_scheme_fails_before_reading() {
    let err = convert(&req("nope:-", "json:-"), PEOPLE_CSV).unwrap_err();
    assert!(matches!(err, ConvertError::UnsupportedScheme { ref scheme } if scheme == "nope"));
}

#[test]
fn write_only_scheme_cannot_be_a_source() {
    let err = convert(&req("asciibox:-", "json:-"), PEOPLE_CSV).unwrap_err();
    assert!(matches!(err, ConvertError::UnsupportedDirection { .. }));
    assert!(err.to_string().contains("source"));

    let err = convert(&req("csv:-", "xml:-"), PEOPLE_CSV).unwrap_err();
    assert!(err.to_string().contains("destination"));
}

#[test]
fn wide_table_to_array_format_is_invalid_params() {
    let err = convert(&req("csv:-", "list:-"), PEOPLE_CSV).unwrap_err();
    assert!(err.is_invalid_params(), "{err:?}");
}

#[test]
fn ascii_box_render() {
    let request = req("csv:-", "asciibox:-").with_query("SELECT id, name FROM data LIMIT 1");
    let out = convert(&request, PEOPLE_CSV).unwrap();
    assert_eq!(
        out,
        "+----+--------+\n| id |  name  |\n|----+--------|\n| 1  | George |\n+----+--------+\n"
    );
}

#[test]
fn markdown_render() {
    let request = req("csv:-", "md:-").with_query("SELECT name FROM data WHERE id = 2");
    let out = convert(&request, PEOPLE_CSV).unwrap();
    assert_eq!(out, "|  name  |\n| ------ |\n| Steven |\n");
}

#[test]
fn json_round_trip_keeps_nested_values_as_text() {
    let input = r#"[{"id":1,"tags":["a","b"]},{"id":2,"tags":null}]"#;
    let out = convert(&req("json:-", "jsonl:-"), input).unwrap();
    assert_eq!(out, "{\"id\":1,\"tags\":\"[\\\"a\\\",\\\"b\\\"]\"}\n{\"id\":2,\"tags\":null}\n");
}

#[test]
fn xml_source_explains_preprocessing() {
    let err = convert(&req("xml:-", "json:-"), "<rows/>").unwrap_err();
    assert!(err.to_string().contains("JSON array"));
}

#[test]
fn blank_query_and_filter_are_ignored() {
    let request = req("csv:-", "tsv:-").with_query("  ").with_filter("");
    assert_eq!(convert(&request, PEOPLE_CSV).unwrap(), PEOPLE_TSV);
}

#[test]
fn headers_differing_only_in_case_can_be_queried() {
    let request = req("csv:-", "csv:-").with_query("SELECT * FROM data");
    assert_eq!(convert(&request, "Name,name\nA,b\n").unwrap(), "Name,name.1\nA,b\n");
}

#[test]
fn large_integral_floats_survive_a_csv_round_trip() {
    let csv = convert(&req("csv:-", "csv:-"), "v\n1e16\n").unwrap();
    assert_eq!(csv, "v\n10000000000000000.0\n");

    let out = convert(&req("csv:-", "json:-"), &csv).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert!(parsed[0]["v"].is_f64(), "{out}");
    assert_eq!(parsed[0]["v"].as_f64(), Some(1e16));
}
